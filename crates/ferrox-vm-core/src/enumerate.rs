//! `for-in` enumeration
//!
//! EnumerateObjectProperties over the generic object operations: take the
//! own string-valued keys, read each key's descriptor (through the proxy
//! when there is one), keep the enumerable ones, deduplicate, then walk the
//! prototype chain shadow-aware. The key list is a snapshot; the enumerator
//! never iterates live object storage, so a trap that mutates the target
//! mid-enumeration cannot corrupt the walk.

use rustc_hash::FxHashSet;

use crate::context::{ImplicitCallFlags, VmContext};
use crate::error::VmResult;
use crate::object::{KeysKind, ObjectRef, PropertyKey};
use crate::operations;

/// Snapshot enumerator over the for-in keys of an object.
#[derive(Debug)]
pub struct ForInEnumerator {
    keys: std::vec::IntoIter<PropertyKey>,
}

impl ForInEnumerator {
    fn new(keys: Vec<PropertyKey>) -> Self {
        Self {
            keys: keys.into_iter(),
        }
    }

    /// Remaining key count
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when no keys remain
    pub fn is_empty(&self) -> bool {
        self.keys.len() == 0
    }
}

impl Iterator for ForInEnumerator {
    type Item = PropertyKey;

    fn next(&mut self) -> Option<PropertyKey> {
        self.keys.next()
    }
}

/// Build a for-in enumerator for any object, proxies included.
///
/// Every proxy level resolves its keys through `ownKeys` and filters them
/// through `getOwnPropertyDescriptor`, so a handler observes exactly the
/// reads EnumerateObjectProperties prescribes. Under "implicit calls disabled" the
/// enumeration is declined with an empty enumerator after recording the
/// `External` flag.
pub fn enumerate(cx: &mut VmContext, obj: &ObjectRef) -> VmResult<ForInEnumerator> {
    if obj.as_proxy().is_some() && cx.implicit_calls_disabled() {
        cx.add_implicit_call_flags(ImplicitCallFlags::EXTERNAL);
        return Ok(ForInEnumerator::new(Vec::new()));
    }

    let mut visited: FxHashSet<PropertyKey> = FxHashSet::default();
    let mut keys = Vec::new();
    let mut current = Some(obj.clone());
    while let Some(link) = current {
        collect_level(cx, &link, &mut visited, &mut keys)?;
        current = operations::get_prototype_of(cx, &link)?.as_object().cloned();
    }
    Ok(ForInEnumerator::new(keys))
}

/// One prototype-chain level: own string keys, descriptor-filtered.
///
/// A key seen at an earlier level shadows this one even when the earlier
/// occurrence was non-enumerable.
fn collect_level(
    cx: &mut VmContext,
    obj: &ObjectRef,
    visited: &mut FxHashSet<PropertyKey>,
    out: &mut Vec<PropertyKey>,
) -> VmResult<()> {
    let names = operations::own_property_keys(cx, obj, KeysKind::StringsOnly)?;
    for key in names {
        if let Some(desc) = operations::get_own_property_descriptor(cx, obj, &key)? {
            if visited.insert(key.clone()) && desc.is_enumerable() {
                out.push(key);
            }
        }
    }
    Ok(())
}
