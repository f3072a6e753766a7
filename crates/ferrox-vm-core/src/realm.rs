//! Realm registry and cross-realm marshalling seam.
//!
//! A Realm owns its own global object; realms share the process-wide intern
//! table and symbol id space. Cross-realm value transfer funnels through
//! [`marshal`], which is the delegation point the proxy subsystem relies on:
//! every trap callable is marshalled into the caller's realm before being
//! invoked.

use parking_lot::RwLock;
use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use crate::object::JsObject;
use crate::value::Value;

/// Unique realm identifier.
pub type RealmId = u32;

/// Stored realm record.
#[derive(Clone)]
pub struct RealmRecord {
    /// Realm id
    pub id: RealmId,
    /// The realm's global object
    pub global: Arc<JsObject>,
}

/// Registry of all realms created by a runtime.
pub struct RealmRegistry {
    realms: RwLock<Vec<RealmRecord>>,
    next_id: AtomicU32,
}

impl RealmRegistry {
    /// Create an empty registry
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            realms: RwLock::new(Vec::new()),
            next_id: AtomicU32::new(0),
        })
    }

    /// Create a realm with a fresh global object and register it
    pub fn create_realm(&self) -> RealmId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.realms.write().push(RealmRecord {
            id,
            global: Arc::new(JsObject::new(None)),
        });
        id
    }

    /// Lookup a realm record by id.
    pub fn get(&self, id: RealmId) -> Option<RealmRecord> {
        self.realms.read().iter().find(|r| r.id == id).cloned()
    }
}

/// Marshal a value into `target_realm`.
///
/// In a single-realm embedding this is the identity function; a multi-realm
/// host replaces this seam with its wrapping policy. Values are `Send +
/// Sync`, so the transfer itself is always safe; what a host customizes
/// here is identity and security wrapping, not memory.
pub fn marshal(value: Value, _target_realm: RealmId) -> Value {
    value
}
