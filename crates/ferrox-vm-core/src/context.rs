//! VM execution context
//!
//! The context carries the per-thread state the proxy dispatchers consult:
//! the implicit-call discipline used by optimized code paths, the
//! heap-enumeration flag, a dispatch-depth guard, and the current realm.
//!
//! ## Implicit-call discipline
//!
//! Optimized code can request "no implicit calls". A trap dispatcher that
//! would run user code under that mode instead records
//! [`ImplicitCallFlags::EXTERNAL`] and returns the operation's neutral
//! sentinel; the caller bails out and retries in an unoptimized frame. After
//! every trap call the saved flag mask is restored with
//! [`ImplicitCallFlags::ACCESSOR`] ORed in.

use bitflags::bitflags;
use std::sync::Arc;

use crate::error::{VmError, VmResult};
use crate::object::JsObject;
use crate::realm::{RealmId, RealmRegistry};
use crate::value::Value;

/// Maximum nested dispatch depth (proxy chains, re-entrant traps)
const MAX_DISPATCH_DEPTH: usize = 512;

bitflags! {
    /// Flags recording which kinds of implicit script execution happened
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ImplicitCallFlags: u8 {
        /// An accessor or trap ran user code
        const ACCESSOR = 1 << 0;
        /// An operation was declined because implicit calls were disabled
        const EXTERNAL = 1 << 1;
    }
}

/// VM execution context
///
/// Holds execution state for a single thread of execution. The engine is
/// single-threaded cooperative per realm; a `&mut VmContext` threads through
/// every operation that may run user code.
pub struct VmContext {
    realm: RealmId,
    realms: Arc<RealmRegistry>,
    implicit_call_flags: ImplicitCallFlags,
    disable_implicit_calls: bool,
    heap_enum_in_progress: bool,
    dispatch_depth: usize,
}

impl VmContext {
    /// Create a context bound to a realm
    pub fn new(realms: Arc<RealmRegistry>, realm: RealmId) -> Self {
        Self {
            realm,
            realms,
            implicit_call_flags: ImplicitCallFlags::empty(),
            disable_implicit_calls: false,
            heap_enum_in_progress: false,
            dispatch_depth: 0,
        }
    }

    /// Create a context with a fresh registry and realm, for tests and
    /// single-realm embeddings
    pub fn for_testing() -> Self {
        let realms = RealmRegistry::new();
        let realm = realms.create_realm();
        Self::new(realms, realm)
    }

    /// The realm this context executes in
    pub fn realm(&self) -> RealmId {
        self.realm
    }

    /// The realm registry
    pub fn realms(&self) -> &Arc<RealmRegistry> {
        &self.realms
    }

    /// The current realm's global object, if the realm still exists
    pub fn global(&self) -> Option<Arc<JsObject>> {
        self.realms.get(self.realm).map(|r| r.global)
    }

    /// Are implicit calls currently disabled?
    pub fn implicit_calls_disabled(&self) -> bool {
        self.disable_implicit_calls
    }

    /// Enable or disable implicit calls (optimizer safepoint handshake)
    pub fn set_disable_implicit_calls(&mut self, disable: bool) {
        self.disable_implicit_calls = disable;
    }

    /// Current implicit-call flag mask
    pub fn implicit_call_flags(&self) -> ImplicitCallFlags {
        self.implicit_call_flags
    }

    /// Replace the implicit-call flag mask
    pub fn set_implicit_call_flags(&mut self, flags: ImplicitCallFlags) {
        self.implicit_call_flags = flags;
    }

    /// OR flags into the implicit-call mask
    pub fn add_implicit_call_flags(&mut self, flags: ImplicitCallFlags) {
        self.implicit_call_flags |= flags;
    }

    /// Is a heap enumeration (snapshotter) in progress?
    ///
    /// While set, descriptor and get traps must not run user code; the
    /// dispatchers forward to the target instead.
    pub fn heap_enum_in_progress(&self) -> bool {
        self.heap_enum_in_progress
    }

    /// Set the heap-enumeration flag
    pub fn set_heap_enum_in_progress(&mut self, in_progress: bool) {
        self.heap_enum_in_progress = in_progress;
    }

    /// Enter a dispatch frame; errors with stack overflow past the limit.
    ///
    /// Pathological proxy chains recurse through the dispatchers; the guard
    /// turns exhaustion into a catchable error.
    pub fn probe_stack(&mut self) -> VmResult<()> {
        if self.dispatch_depth >= MAX_DISPATCH_DEPTH {
            return Err(VmError::StackOverflow);
        }
        self.dispatch_depth += 1;
        Ok(())
    }

    /// Leave a dispatch frame entered with [`probe_stack`](Self::probe_stack)
    pub fn leave_stack(&mut self) {
        debug_assert!(self.dispatch_depth > 0);
        self.dispatch_depth = self.dispatch_depth.saturating_sub(1);
    }

    /// Current dispatch depth (diagnostics)
    pub fn dispatch_depth(&self) -> usize {
        self.dispatch_depth
    }
}

impl std::fmt::Debug for VmContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VmContext")
            .field("realm", &self.realm)
            .field("dispatch_depth", &self.dispatch_depth)
            .field("implicit_call_flags", &self.implicit_call_flags)
            .finish()
    }
}

/// Context handed to native functions.
///
/// Wraps the [`VmContext`] and carries the `new.target` of the active call
/// when the function was invoked as a constructor.
pub struct NativeContext<'a> {
    vm: &'a mut VmContext,
    new_target: Option<Value>,
}

impl<'a> NativeContext<'a> {
    pub(crate) fn new(vm: &'a mut VmContext, new_target: Option<Value>) -> Self {
        Self { vm, new_target }
    }

    /// The underlying VM context
    pub fn vm(&mut self) -> &mut VmContext {
        self.vm
    }

    /// `new.target` of the active call; `None` for plain calls
    pub fn new_target(&self) -> Option<&Value> {
        self.new_target.as_ref()
    }

    /// Call a function value from native code
    pub fn call_function(&mut self, f: &Value, this: &Value, args: &[Value]) -> VmResult<Value> {
        crate::operations::call_function(self.vm, f, this, args)
    }
}
