//! JavaScript Proxy exotic object
//!
//! A proxy wraps a target object and a handler object and interposes the
//! handler's traps on every fundamental object operation. This module holds
//! only the data model; the trap dispatchers live in
//! [`proxy_operations`](crate::proxy_operations).
//!
//! Revocation clears both slots at once: `target` and `handler` are either
//! both present or both absent, and once absent they stay absent for the
//! object's lifetime. The callability flag is captured from the target at
//! construction time and never changes afterwards, revocation included.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::object::ObjectRef;

/// The `[target, handler]` slot pair of a live proxy
#[derive(Clone)]
pub struct ProxySlots {
    /// The target object being proxied
    pub target: ObjectRef,
    /// The handler object containing traps
    pub handler: ObjectRef,
}

/// A JavaScript Proxy object
pub struct JsProxy {
    /// Both slots, cleared together on revocation
    slots: RwLock<Option<ProxySlots>>,
    /// Captured at creation: was the target callable?
    is_callable: bool,
}

impl std::fmt::Debug for JsProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &*self.slots.read() {
            None => write!(f, "Proxy {{ <revoked> }}"),
            Some(slots) => write!(f, "Proxy {{ target: {:?} }}", slots.target),
        }
    }
}

/// Result of creating a revocable proxy
pub struct RevocableProxy {
    /// The proxy object
    pub proxy: Arc<JsProxy>,
    /// Function that revokes the proxy; idempotent
    pub revoke: Arc<dyn Fn() + Send + Sync>,
}

impl JsProxy {
    /// Create a new proxy over `target` with `handler`
    pub fn new(target: ObjectRef, handler: ObjectRef) -> Arc<Self> {
        let is_callable = target.is_callable();
        Arc::new(Self {
            slots: RwLock::new(Some(ProxySlots { target, handler })),
            is_callable,
        })
    }

    /// Create a revocable proxy
    pub fn revocable(target: ObjectRef, handler: ObjectRef) -> RevocableProxy {
        let proxy = Self::new(target, handler);
        let proxy_for_revoke = proxy.clone();

        RevocableProxy {
            proxy,
            revoke: Arc::new(move || {
                proxy_for_revoke.revoke();
            }),
        }
    }

    /// Check if this proxy has been revoked
    pub fn is_revoked(&self) -> bool {
        self.slots.read().is_none()
    }

    /// Revoke this proxy, dropping its references to target and handler.
    ///
    /// After revocation, any operation that would resolve a trap throws a
    /// TypeError. Identity comparisons keep working.
    pub fn revoke(&self) {
        let dropped = self.slots.write().take();
        if dropped.is_some() {
            tracing::debug!("proxy revoked");
        }
    }

    /// Read both slots atomically.
    ///
    /// Dispatchers call this once at entry and again after every trap
    /// invocation: the trap runs user code that may revoke the proxy
    /// mid-flight, and the next trap resolution has to see that.
    pub fn slots(&self) -> Option<ProxySlots> {
        self.slots.read().clone()
    }

    /// Get the target object; `None` if revoked
    pub fn target(&self) -> Option<ObjectRef> {
        self.slots.read().as_ref().map(|s| s.target.clone())
    }

    /// Get the handler object; `None` if revoked
    pub fn handler(&self) -> Option<ObjectRef> {
        self.slots.read().as_ref().map(|s| s.handler.clone())
    }

    /// Was the target callable when this proxy was created?
    pub fn is_callable(&self) -> bool {
        self.is_callable
    }
}
