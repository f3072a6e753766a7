//! Integrity-level protocols: `Object.seal` / `Object.freeze` and their
//! tests, built entirely on the generic object operations so proxies observe
//! every step through their traps (ES §7.3.14 / §7.3.15).

use crate::context::VmContext;
use crate::error::VmResult;
use crate::object::{KeysKind, ObjectRef, PropertyDescriptor};
use crate::operations;

/// The two integrity levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntegrityLevel {
    /// Non-extensible, all properties non-configurable
    Sealed,
    /// Sealed, and every data property non-writable
    Frozen,
}

/// SetIntegrityLevel: prevent extensions, then clamp every own property.
///
/// Returns false when `[[PreventExtensions]]` declines (a proxy trap may).
pub fn set_integrity_level(
    cx: &mut VmContext,
    obj: &ObjectRef,
    level: IntegrityLevel,
) -> VmResult<bool> {
    if !operations::prevent_extensions(cx, obj)? {
        return Ok(false);
    }
    let keys = operations::own_property_keys(cx, obj, KeysKind::Keys)?;
    match level {
        IntegrityLevel::Sealed => {
            let clamp = PropertyDescriptor {
                configurable: Some(false),
                ..Default::default()
            };
            for key in keys {
                operations::define_own_property(cx, obj, &key, &clamp, true)?;
            }
        }
        IntegrityLevel::Frozen => {
            for key in keys {
                let Some(current) = operations::get_own_property_descriptor(cx, obj, &key)?
                else {
                    continue;
                };
                let clamp = if current.is_accessor_descriptor() {
                    PropertyDescriptor {
                        configurable: Some(false),
                        ..Default::default()
                    }
                } else {
                    PropertyDescriptor {
                        configurable: Some(false),
                        writable: Some(false),
                        ..Default::default()
                    }
                };
                operations::define_own_property(cx, obj, &key, &clamp, true)?;
            }
        }
    }
    Ok(true)
}

/// TestIntegrityLevel: an extensible object is never sealed or frozen; a
/// configurable property breaks both levels, a writable data property breaks
/// `Frozen`.
pub fn test_integrity_level(
    cx: &mut VmContext,
    obj: &ObjectRef,
    level: IntegrityLevel,
) -> VmResult<bool> {
    if operations::is_extensible(cx, obj)? {
        return Ok(false);
    }
    let keys = operations::own_property_keys(cx, obj, KeysKind::Keys)?;
    for key in keys {
        let Some(desc) = operations::get_own_property_descriptor(cx, obj, &key)? else {
            continue;
        };
        if desc.is_configurable() {
            return Ok(false);
        }
        if level == IntegrityLevel::Frozen && desc.is_data_descriptor() && desc.is_writable() {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{JsObject, PropertyKey};
    use crate::value::Value;
    use std::sync::Arc;

    fn obj_with_props() -> ObjectRef {
        let obj = Arc::new(JsObject::new(None));
        obj.set(PropertyKey::string("a"), Value::int32(1));
        obj.set(PropertyKey::string("b"), Value::int32(2));
        ObjectRef::Ordinary(obj)
    }

    #[test]
    fn test_seal() {
        let mut cx = VmContext::for_testing();
        let obj = obj_with_props();

        assert!(set_integrity_level(&mut cx, &obj, IntegrityLevel::Sealed).unwrap());
        assert!(test_integrity_level(&mut cx, &obj, IntegrityLevel::Sealed).unwrap());
        // Sealed but not frozen: values stay writable
        assert!(!test_integrity_level(&mut cx, &obj, IntegrityLevel::Frozen).unwrap());

        let backing = obj.backing().unwrap();
        assert!(backing.set(PropertyKey::string("a"), Value::int32(10)));
        assert!(!backing.delete(&PropertyKey::string("a")));
        assert!(!backing.set(PropertyKey::string("new"), Value::int32(3)));
    }

    #[test]
    fn test_freeze() {
        let mut cx = VmContext::for_testing();
        let obj = obj_with_props();

        assert!(set_integrity_level(&mut cx, &obj, IntegrityLevel::Frozen).unwrap());
        assert!(test_integrity_level(&mut cx, &obj, IntegrityLevel::Frozen).unwrap());
        assert!(test_integrity_level(&mut cx, &obj, IntegrityLevel::Sealed).unwrap());

        let backing = obj.backing().unwrap();
        assert!(!backing.set(PropertyKey::string("a"), Value::int32(10)));
        assert_eq!(
            backing.get(&PropertyKey::string("a")),
            Some(Value::int32(1))
        );
    }

    #[test]
    fn test_extensible_object_is_neither() {
        let mut cx = VmContext::for_testing();
        let obj = obj_with_props();
        assert!(!test_integrity_level(&mut cx, &obj, IntegrityLevel::Sealed).unwrap());
        assert!(!test_integrity_level(&mut cx, &obj, IntegrityLevel::Frozen).unwrap());
    }

    #[test]
    fn test_freeze_keeps_accessors_callable() {
        let mut cx = VmContext::for_testing();
        let backing = Arc::new(JsObject::new(None));
        let getter = Value::object(crate::value::NativeFunctionObject::new(Arc::new(
            |_this, _args, _ncx| Ok(Value::int32(5)),
        )));
        backing.define_own_property(
            PropertyKey::string("x"),
            &PropertyDescriptor::accessor(Some(getter), None, true, true),
        );
        let obj = ObjectRef::Ordinary(backing);

        assert!(set_integrity_level(&mut cx, &obj, IntegrityLevel::Frozen).unwrap());
        assert!(test_integrity_level(&mut cx, &obj, IntegrityLevel::Frozen).unwrap());
        // The accessor still fires after freezing
        assert_eq!(
            operations::get_value(&mut cx, &obj, &PropertyKey::string("x")).unwrap(),
            Value::int32(5)
        );
    }
}
