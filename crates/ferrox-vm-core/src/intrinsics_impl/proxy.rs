//! Proxy constructor implementation
//!
//! ## Constructor:
//! - `new Proxy(target, handler)` — call-as-function is forbidden
//!
//! ## Static methods:
//! - `Proxy.revocable(target, handler)` — returns `{ proxy, revoke }`
//!
//! The revoker is a zero-argument function carrying the proxy in an internal
//! slot; the first invocation clears the slot and revokes, later invocations
//! are no-ops.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::context::{NativeContext, VmContext};
use crate::error::{VmError, VmResult};
use crate::object::{JsObject, ObjectRef, PropertyDescriptor, PropertyKey};
use crate::proxy::JsProxy;
use crate::value::{NativeFunctionObject, Value};

/// Validate `(target, handler)` arguments and allocate the proxy.
///
/// Both arguments must be objects, and a revoked proxy is not a valid
/// target or handler.
pub fn create_proxy(args: &[Value]) -> VmResult<Arc<JsProxy>> {
    if args.len() < 2 {
        return Err(VmError::type_error(
            "Proxy constructor requires a target and a handler argument",
        ));
    }

    let target = args[0]
        .as_object()
        .ok_or_else(|| VmError::type_error("Cannot create proxy with a non-object as target"))?;
    if let ObjectRef::Proxy(p) = target {
        if p.is_revoked() {
            return Err(VmError::type_error(
                "Cannot create proxy with a revoked proxy as target",
            ));
        }
    }

    let handler = args[1]
        .as_object()
        .ok_or_else(|| VmError::type_error("Cannot create proxy with a non-object as handler"))?;
    if let ObjectRef::Proxy(p) = handler {
        if p.is_revoked() {
            return Err(VmError::type_error(
                "Cannot create proxy with a revoked proxy as handler",
            ));
        }
    }

    Ok(JsProxy::new(target.clone(), handler.clone()))
}

/// `new Proxy(target, handler)` entry point.
///
/// The construct path has already performed the `new.target.prototype`
/// lookup while synthesizing `this`; the proxy itself has no prototype slot,
/// so the synthesized object is discarded and the proxy returned.
pub fn proxy_constructor(
    _this: &Value,
    args: &[Value],
    ncx: &mut NativeContext<'_>,
) -> VmResult<Value> {
    if ncx.new_target().is_none() {
        return Err(VmError::type_error("Constructor Proxy requires 'new'"));
    }
    let proxy = create_proxy(args)?;
    Ok(Value::object(proxy))
}

/// `Proxy.revocable(target, handler)` entry point.
fn proxy_revocable(
    _this: &Value,
    args: &[Value],
    ncx: &mut NativeContext<'_>,
) -> VmResult<Value> {
    if ncx.new_target().is_some() {
        return Err(VmError::type_error("Proxy.revocable is not a constructor"));
    }
    let proxy = create_proxy(args)?;

    // Internal slot of the revoker; the first call takes the proxy out.
    let revocable_slot: Mutex<Option<Arc<JsProxy>>> = Mutex::new(Some(proxy.clone()));
    let revoke_fn = NativeFunctionObject::new(Arc::new(
        move |_this: &Value, _args: &[Value], _ncx: &mut NativeContext<'_>| {
            if let Some(proxy) = revocable_slot.lock().take() {
                proxy.revoke();
            }
            Ok(Value::undefined())
        },
    ));
    revoke_fn.object.define_own_property(
        PropertyKey::string("length"),
        &PropertyDescriptor::data_with_attrs(Value::int32(0), false, false, true),
    );
    revoke_fn.object.define_own_property(
        PropertyKey::string("name"),
        &PropertyDescriptor::data_with_attrs(Value::str("revoke"), false, false, true),
    );

    let result = Arc::new(JsObject::new(None));
    result.set(PropertyKey::string("proxy"), Value::object(proxy));
    result.set(PropertyKey::string("revoke"), Value::object(revoke_fn));
    Ok(Value::object(result))
}

/// Build the `Proxy` constructor function object with its static methods.
pub fn make_proxy_constructor() -> Arc<NativeFunctionObject> {
    let ctor = NativeFunctionObject::new(Arc::new(proxy_constructor));

    // Proxy.length = 2 (target, handler)
    ctor.object.define_own_property(
        PropertyKey::string("length"),
        &PropertyDescriptor::data_with_attrs(Value::int32(2), false, false, true),
    );
    // Proxy.name = "Proxy"
    ctor.object.define_own_property(
        PropertyKey::string("name"),
        &PropertyDescriptor::data_with_attrs(Value::str("Proxy"), false, false, true),
    );

    // Proxy.revocable(target, handler)
    let revocable = NativeFunctionObject::new(Arc::new(proxy_revocable));
    revocable.object.define_own_property(
        PropertyKey::string("length"),
        &PropertyDescriptor::data_with_attrs(Value::int32(2), false, false, true),
    );
    revocable.object.define_own_property(
        PropertyKey::string("name"),
        &PropertyDescriptor::data_with_attrs(Value::str("revocable"), false, false, true),
    );
    ctor.object.define_own_property(
        PropertyKey::string("revocable"),
        &PropertyDescriptor::data_with_attrs(Value::object(revocable), true, false, true),
    );

    ctor
}

/// Install the `Proxy` constructor on the current realm's global object.
pub fn install(cx: &VmContext) -> VmResult<()> {
    let global = cx
        .global()
        .ok_or_else(|| VmError::internal("current realm has no global object"))?;
    let ctor = make_proxy_constructor();
    global.set(PropertyKey::string("Proxy"), Value::object(ctor));
    Ok(())
}
