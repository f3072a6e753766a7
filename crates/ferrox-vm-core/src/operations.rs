//! Generic object operations
//!
//! The engine-facing entry points for every fundamental object operation.
//! Each dispatches on the [`ObjectRef`] variant: proxies route through the
//! trap dispatchers in [`proxy_operations`](crate::proxy_operations),
//! everything else through ordinary semantics on the backing [`JsObject`].
//!
//! Also home to the descriptor conversions (`ToPropertyDescriptor`,
//! `FromPropertyDescriptor`) and the calling convention for native functions.

use std::sync::Arc;

use crate::context::{NativeContext, VmContext};
use crate::error::{VmError, VmResult};
use crate::object::{
    JsObject, KeysKind, ObjectRef, PropertyDescriptor, PropertyKey, PropertyLookupCache,
};
use crate::proxy_operations as proxy_ops;
use crate::realm;
use crate::value::{Value, same_value};

/// `[[Get]]`: read property `key` off `obj` with the given receiver.
pub fn get(
    cx: &mut VmContext,
    obj: &ObjectRef,
    key: &PropertyKey,
    receiver: &Value,
) -> VmResult<Value> {
    cx.probe_stack()?;
    let result = match obj {
        ObjectRef::Proxy(p) => proxy_ops::proxy_get(cx, p, key, receiver),
        _ => ordinary_get(cx, obj, key, receiver),
    };
    cx.leave_stack();
    result
}

/// `[[Get]]` with the object itself as receiver.
pub fn get_value(cx: &mut VmContext, obj: &ObjectRef, key: &PropertyKey) -> VmResult<Value> {
    let receiver = Value::Object(obj.clone());
    get(cx, obj, key, &receiver)
}

/// `[[Get]]` with a cacheability handshake.
///
/// When the lookup is (or may be) served by a proxy, both the own-property
/// cache and the prototype-chain cache are disabled: target and handler can
/// be mutated behind the engine's back.
pub fn get_with_cache(
    cx: &mut VmContext,
    obj: &ObjectRef,
    key: &PropertyKey,
    receiver: &Value,
    cache: &mut PropertyLookupCache,
) -> VmResult<Value> {
    mark_cacheability(obj, key, cache);
    get(cx, obj, key, receiver)
}

/// Scan the resolution path of `key` from `obj`; a proxy anywhere on it
/// defeats caching.
fn mark_cacheability(obj: &ObjectRef, key: &PropertyKey, cache: &mut PropertyLookupCache) {
    let mut current = Some(obj.clone());
    let mut hops = 0;
    while let Some(link) = current {
        if link.as_proxy().is_some() {
            cache.disable_all();
            return;
        }
        let backing = match link.backing() {
            Some(b) => b.clone(),
            None => return,
        };
        if backing.has_own(key) {
            return;
        }
        current = backing.prototype();
        hops += 1;
        if hops > 128 {
            return;
        }
    }
}

fn ordinary_get(
    cx: &mut VmContext,
    obj: &ObjectRef,
    key: &PropertyKey,
    receiver: &Value,
) -> VmResult<Value> {
    let backing = obj
        .backing()
        .ok_or_else(|| VmError::internal("ordinary_get on a proxy"))?;
    match backing.get_own_property(key) {
        Some(desc) => get_value_from_descriptor(cx, receiver, &desc),
        None => match backing.prototype() {
            Some(parent) => get(cx, &parent, key, receiver),
            None => Ok(Value::undefined()),
        },
    }
}

/// Extract the value a descriptor denotes for `instance`: the stored value
/// (marshalled into the current realm when the descriptor came from a proxy
/// trap) or the getter's result.
pub fn get_value_from_descriptor(
    cx: &mut VmContext,
    instance: &Value,
    desc: &PropertyDescriptor,
) -> VmResult<Value> {
    if let Some(value) = &desc.value {
        if desc.from_proxy {
            return Ok(realm::marshal(value.clone(), cx.realm()));
        }
        return Ok(value.clone());
    }
    if let Some(getter) = &desc.get {
        if getter.is_undefined() {
            return Ok(Value::undefined());
        }
        return call_function(cx, getter, instance, &[]);
    }
    Ok(Value::undefined())
}

/// Which flavor of set operation reached the proxy; the trap-absent path
/// forwards to the matching target operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetPropertyKind {
    /// Plain property set
    Property,
    /// Indexed element set
    Item,
    /// Set with a tagged-number receiver
    PropertyOnTaggedNumber,
    /// Indexed set with a tagged-number receiver
    ItemOnTaggedNumber,
    /// Set issued from a cached (optimized) site
    PropertyWithCache,
}

/// `[[Set]]`: write `key` on `obj` with the given receiver.
pub fn set(
    cx: &mut VmContext,
    obj: &ObjectRef,
    key: &PropertyKey,
    value: Value,
    receiver: &Value,
) -> VmResult<bool> {
    cx.probe_stack()?;
    let result = match obj {
        ObjectRef::Proxy(p) => {
            proxy_ops::proxy_set(cx, p, SetPropertyKind::Property, key, value, receiver)
        }
        _ => ordinary_set(cx, obj, key, value, receiver),
    };
    cx.leave_stack();
    result
}

/// Indexed `[[Set]]` entry point.
pub fn set_item(
    cx: &mut VmContext,
    obj: &ObjectRef,
    index: u32,
    value: Value,
    receiver: &Value,
) -> VmResult<bool> {
    let key = PropertyKey::Index(index);
    match obj {
        ObjectRef::Proxy(p) => {
            cx.probe_stack()?;
            let result = proxy_ops::proxy_set(cx, p, SetPropertyKind::Item, &key, value, receiver);
            cx.leave_stack();
            result
        }
        _ => set(cx, obj, &key, value, receiver),
    }
}

/// `[[Set]]` with a cacheability handshake (optimized call sites).
pub fn set_with_cache(
    cx: &mut VmContext,
    obj: &ObjectRef,
    key: &PropertyKey,
    value: Value,
    receiver: &Value,
    cache: &mut PropertyLookupCache,
) -> VmResult<bool> {
    if let ObjectRef::Proxy(p) = obj {
        cache.disable_all();
        cx.probe_stack()?;
        let result = proxy_ops::proxy_set(
            cx,
            p,
            SetPropertyKind::PropertyWithCache,
            key,
            value,
            receiver,
        );
        cx.leave_stack();
        return result;
    }
    mark_cacheability(obj, key, cache);
    set(cx, obj, key, value, receiver)
}

fn ordinary_set(
    cx: &mut VmContext,
    obj: &ObjectRef,
    key: &PropertyKey,
    value: Value,
    receiver: &Value,
) -> VmResult<bool> {
    let backing = obj
        .backing()
        .ok_or_else(|| VmError::internal("ordinary_set on a proxy"))?;
    let own_desc = match backing.get_own_property(key) {
        Some(desc) => desc,
        None => match backing.prototype() {
            Some(parent) => return set(cx, &parent, key, value, receiver),
            None => PropertyDescriptor::data(Value::undefined()),
        },
    };

    if own_desc.is_data_descriptor() {
        if !own_desc.is_writable() {
            return Ok(false);
        }
        let Some(receiver_obj) = receiver.as_object().cloned() else {
            return Ok(false);
        };
        // A proxy receiver gets the dedicated define-through fallback
        if let ObjectRef::Proxy(rp) = &receiver_obj {
            return proxy_ops::proxy_default_set(cx, rp, key, value);
        }
        match get_own_property_descriptor(cx, &receiver_obj, key)? {
            Some(existing) => {
                if existing.is_accessor_descriptor() || !existing.is_writable() {
                    return Ok(false);
                }
                let value_desc = PropertyDescriptor {
                    value: Some(value),
                    ..Default::default()
                };
                define_own_property(cx, &receiver_obj, key, &value_desc, false)
            }
            None => {
                let fresh = PropertyDescriptor::data(value);
                define_own_property(cx, &receiver_obj, key, &fresh, false)
            }
        }
    } else {
        let setter = own_desc.set.clone().unwrap_or(Value::Undefined);
        if setter.is_undefined() {
            return Ok(false);
        }
        call_function(cx, &setter, receiver, &[value])?;
        Ok(true)
    }
}

/// Slow-path set with a primitive (tagged-number) receiver: only an accessor
/// with a setter can observe the write; data properties cannot be created on
/// a primitive.
pub fn set_property_on_tagged_number(
    cx: &mut VmContext,
    target: &ObjectRef,
    key: &PropertyKey,
    value: Value,
    receiver: &Value,
) -> VmResult<bool> {
    let mut current = Some(target.clone());
    let mut hops = 0;
    while let Some(link) = current {
        if let Some(desc) = get_own_property_descriptor(cx, &link, key)? {
            if desc.is_accessor_descriptor() {
                let setter = desc.set.clone().unwrap_or(Value::Undefined);
                if setter.is_undefined() {
                    return Ok(false);
                }
                call_function(cx, &setter, receiver, &[value])?;
                return Ok(true);
            }
            return Ok(false);
        }
        current = get_prototype_of(cx, &link)?.as_object().cloned();
        hops += 1;
        if hops > 128 {
            return Ok(false);
        }
    }
    Ok(false)
}

/// `[[HasProperty]]`: own or inherited.
pub fn has_property(cx: &mut VmContext, obj: &ObjectRef, key: &PropertyKey) -> VmResult<bool> {
    cx.probe_stack()?;
    let result = match obj {
        ObjectRef::Proxy(p) => proxy_ops::proxy_has(cx, p, key),
        _ => {
            let backing = obj
                .backing()
                .ok_or_else(|| VmError::internal("has_property on a proxy"))?;
            if backing.has_own(key) {
                Ok(true)
            } else {
                match backing.prototype() {
                    Some(parent) => has_property(cx, &parent, key),
                    None => Ok(false),
                }
            }
        }
    };
    cx.leave_stack();
    result
}

/// HasOwnProperty, always redirected through `[[GetOwnProperty]]`.
///
/// There is deliberately no direct own-property trap path: a proxy answers
/// this through its `getOwnPropertyDescriptor` dispatcher.
pub fn has_own_property(cx: &mut VmContext, obj: &ObjectRef, key: &PropertyKey) -> VmResult<bool> {
    Ok(get_own_property_descriptor(cx, obj, key)?.is_some())
}

/// `[[Delete]]`.
pub fn delete_property(cx: &mut VmContext, obj: &ObjectRef, key: &PropertyKey) -> VmResult<bool> {
    cx.probe_stack()?;
    let result = match obj {
        ObjectRef::Proxy(p) => proxy_ops::proxy_delete_property(cx, p, key),
        _ => {
            let backing = obj
                .backing()
                .ok_or_else(|| VmError::internal("delete_property on a proxy"))?;
            Ok(backing.delete(key))
        }
    };
    cx.leave_stack();
    result
}

/// `[[DefineOwnProperty]]`.
pub fn define_own_property(
    cx: &mut VmContext,
    obj: &ObjectRef,
    key: &PropertyKey,
    desc: &PropertyDescriptor,
    throw_on_error: bool,
) -> VmResult<bool> {
    cx.probe_stack()?;
    let result = match obj {
        ObjectRef::Proxy(p) => {
            proxy_ops::proxy_define_own_property(cx, p, key, desc, throw_on_error)
        }
        _ => {
            let backing = obj
                .backing()
                .ok_or_else(|| VmError::internal("define_own_property on a proxy"))?;
            let ok = backing.define_own_property(key.clone(), desc);
            if !ok && throw_on_error {
                Err(VmError::type_error("Cannot define property, object is not extensible or property is non-configurable"))
            } else {
                Ok(ok)
            }
        }
    };
    cx.leave_stack();
    result
}

/// `[[GetOwnProperty]]`.
pub fn get_own_property_descriptor(
    cx: &mut VmContext,
    obj: &ObjectRef,
    key: &PropertyKey,
) -> VmResult<Option<PropertyDescriptor>> {
    cx.probe_stack()?;
    let result = match obj {
        ObjectRef::Proxy(p) => proxy_ops::proxy_get_own_property(cx, p, key),
        _ => {
            let backing = obj
                .backing()
                .ok_or_else(|| VmError::internal("get_own_property_descriptor on a proxy"))?;
            Ok(backing.get_own_property(key))
        }
    };
    cx.leave_stack();
    result
}

/// `[[OwnPropertyKeys]]`, filtered by kind.
pub fn own_property_keys(
    cx: &mut VmContext,
    obj: &ObjectRef,
    kind: KeysKind,
) -> VmResult<Vec<PropertyKey>> {
    cx.probe_stack()?;
    let result = match obj {
        ObjectRef::Proxy(p) => proxy_ops::proxy_own_property_keys(cx, p, kind),
        _ => {
            let backing = obj
                .backing()
                .ok_or_else(|| VmError::internal("own_property_keys on a proxy"))?;
            Ok(backing.own_keys(kind))
        }
    };
    cx.leave_stack();
    result
}

/// `[[GetPrototypeOf]]`: an object value or `null`.
pub fn get_prototype_of(cx: &mut VmContext, obj: &ObjectRef) -> VmResult<Value> {
    cx.probe_stack()?;
    let result = match obj {
        ObjectRef::Proxy(p) => proxy_ops::proxy_get_prototype_of(cx, p),
        _ => {
            let backing = obj
                .backing()
                .ok_or_else(|| VmError::internal("get_prototype_of on a proxy"))?;
            Ok(match backing.prototype() {
                Some(proto) => Value::Object(proto),
                None => Value::null(),
            })
        }
    };
    cx.leave_stack();
    result
}

/// `[[SetPrototypeOf]]`. `proto` must be an object or `null`.
pub fn set_prototype_of(
    cx: &mut VmContext,
    obj: &ObjectRef,
    proto: &Value,
    should_throw: bool,
) -> VmResult<bool> {
    if !proto.is_object() && !proto.is_null() {
        return Err(VmError::type_error(
            "Object prototype may only be an Object or null",
        ));
    }
    cx.probe_stack()?;
    let result = match obj {
        ObjectRef::Proxy(p) => proxy_ops::proxy_set_prototype_of(cx, p, proto, should_throw),
        _ => {
            let backing = obj
                .backing()
                .ok_or_else(|| VmError::internal("set_prototype_of on a proxy"))?;
            let ok = backing.set_prototype(proto.as_object().cloned());
            if !ok && should_throw {
                Err(VmError::type_error("Cannot set prototype of non-extensible object"))
            } else {
                Ok(ok)
            }
        }
    };
    cx.leave_stack();
    result
}

/// `[[IsExtensible]]`.
pub fn is_extensible(cx: &mut VmContext, obj: &ObjectRef) -> VmResult<bool> {
    cx.probe_stack()?;
    let result = match obj {
        ObjectRef::Proxy(p) => proxy_ops::proxy_is_extensible(cx, p),
        _ => {
            let backing = obj
                .backing()
                .ok_or_else(|| VmError::internal("is_extensible on a proxy"))?;
            Ok(backing.is_extensible())
        }
    };
    cx.leave_stack();
    result
}

/// `[[PreventExtensions]]`.
pub fn prevent_extensions(cx: &mut VmContext, obj: &ObjectRef) -> VmResult<bool> {
    cx.probe_stack()?;
    let result = match obj {
        ObjectRef::Proxy(p) => proxy_ops::proxy_prevent_extensions(cx, p),
        _ => {
            let backing = obj
                .backing()
                .ok_or_else(|| VmError::internal("prevent_extensions on a proxy"))?;
            backing.prevent_extensions();
            Ok(true)
        }
    };
    cx.leave_stack();
    result
}

/// `[[Call]]`: invoke `f` as a function.
pub fn call_function(
    cx: &mut VmContext,
    f: &Value,
    this: &Value,
    args: &[Value],
) -> VmResult<Value> {
    let Some(obj) = f.as_object() else {
        return Err(VmError::type_error(format!(
            "{} is not a function",
            f.type_of()
        )));
    };
    match obj {
        ObjectRef::Function(nf) => {
            cx.probe_stack()?;
            let result = {
                let mut ncx = NativeContext::new(cx, None);
                (nf.func)(this, args, &mut ncx)
            };
            cx.leave_stack();
            result
        }
        ObjectRef::Proxy(p) => proxy_ops::proxy_call(cx, p, this, args),
        ObjectRef::Ordinary(_) => Err(VmError::type_error("Object is not a function")),
    }
}

/// Invoke a native function as a constructor body: `this` is pre-made and
/// `new.target` is threaded through the native context.
pub(crate) fn call_function_with_new_target(
    cx: &mut VmContext,
    f: &Value,
    this: &Value,
    args: &[Value],
    new_target: &Value,
) -> VmResult<Value> {
    let Some(obj) = f.as_object() else {
        return Err(VmError::type_error("Value is not a constructor"));
    };
    match obj {
        ObjectRef::Function(nf) => {
            cx.probe_stack()?;
            let result = {
                let mut ncx = NativeContext::new(cx, Some(new_target.clone()));
                (nf.func)(this, args, &mut ncx)
            };
            cx.leave_stack();
            result
        }
        ObjectRef::Proxy(p) => proxy_ops::proxy_construct(cx, p, args, new_target),
        ObjectRef::Ordinary(_) => Err(VmError::type_error("Object is not a constructor")),
    }
}

/// `[[Construct]]`: invoke `f` as a constructor.
///
/// `new.target` preference order: the explicit override when one is given,
/// otherwise the callee itself.
pub fn construct(
    cx: &mut VmContext,
    f: &Value,
    args: &[Value],
    new_target: Option<&Value>,
) -> VmResult<Value> {
    let Some(obj) = f.as_object() else {
        return Err(VmError::type_error(format!(
            "{} is not a constructor",
            f.type_of()
        )));
    };
    if !obj.is_callable() {
        return Err(VmError::type_error("Object is not a constructor"));
    }
    let nt = new_target.cloned().unwrap_or_else(|| f.clone());
    match obj {
        ObjectRef::Proxy(p) => proxy_ops::proxy_construct(cx, p, args, &nt),
        ObjectRef::Function(nf) => {
            cx.probe_stack()?;
            let result = (|| -> VmResult<Value> {
                let this_obj = new_object_from_constructor(cx, &nt)?;
                let this_val = Value::object(this_obj);
                let ret = {
                    let mut ncx = NativeContext::new(cx, Some(nt.clone()));
                    (nf.func)(&this_val, args, &mut ncx)?
                };
                Ok(if ret.is_object() { ret } else { this_val })
            })();
            cx.leave_stack();
            result
        }
        ObjectRef::Ordinary(_) => Err(VmError::type_error("Object is not a constructor")),
    }
}

/// Construct issued from a super-constructor call site: when no explicit
/// `new.target` override exists, the active `this` is used.
pub fn construct_super(
    cx: &mut VmContext,
    f: &Value,
    this: &Value,
    args: &[Value],
) -> VmResult<Value> {
    construct(cx, f, args, Some(this))
}

/// Allocate the `this` object for a construct call: a fresh object whose
/// prototype is the constructor's `prototype` property (when it is an
/// object).
pub fn new_object_from_constructor(
    cx: &mut VmContext,
    ctor: &Value,
) -> VmResult<Arc<JsObject>> {
    let proto_val = match ctor.as_object() {
        Some(obj) => get(cx, obj, &PropertyKey::string("prototype"), ctor)?,
        None => Value::undefined(),
    };
    Ok(Arc::new(JsObject::new(proto_val.as_object().cloned())))
}

/// OrdinaryHasInstance: `instance instanceof f`, walking the instance's
/// prototype chain against `f.prototype`. Both the `prototype` read and the
/// chain walk dispatch through proxies.
pub fn has_instance(cx: &mut VmContext, f: &ObjectRef, instance: &Value) -> VmResult<bool> {
    let f_val = Value::Object(f.clone());
    let proto_val = get(cx, f, &PropertyKey::string("prototype"), &f_val)?;
    let Some(proto_obj) = proto_val.as_object().cloned() else {
        return Err(VmError::type_error(
            "Function has non-object prototype in instanceof check",
        ));
    };
    let Some(mut current) = instance.as_object().cloned() else {
        return Ok(false);
    };
    loop {
        let parent = get_prototype_of(cx, &current)?;
        match parent.as_object() {
            None => return Ok(false),
            Some(p) => {
                if p.ptr_eq(&proto_obj) {
                    return Ok(true);
                }
                current = p.clone();
            }
        }
    }
}

/// Build an array-like object from a slice of values.
pub fn create_array_from(values: &[Value]) -> Value {
    let arr = Arc::new(JsObject::new(None));
    for (i, v) in values.iter().enumerate() {
        arr.set(PropertyKey::Index(i as u32), v.clone());
    }
    arr.define_own_property(
        PropertyKey::string("length"),
        &PropertyDescriptor::data_with_attrs(Value::number(values.len() as f64), true, false, false),
    );
    Value::object(arr)
}

/// CreateListFromArrayLike: read `length`, then each index, through the
/// generic operations (every read is observable).
pub fn create_list_from_array_like(cx: &mut VmContext, value: &Value) -> VmResult<Vec<Value>> {
    let Some(obj) = value.as_object() else {
        return Err(VmError::type_error(
            "CreateListFromArrayLike called on non-object",
        ));
    };
    let len_val = get(cx, obj, &PropertyKey::string("length"), value)?;
    let len = to_length(&len_val);
    let mut out = Vec::with_capacity(len.min(1024) as usize);
    for i in 0..len {
        let key = if i <= u32::MAX as u64 {
            PropertyKey::Index(i as u32)
        } else {
            PropertyKey::string(&i.to_string())
        };
        out.push(get(cx, obj, &key, value)?);
    }
    Ok(out)
}

/// ES ToLength, clamped to `[0, 2^53 - 1]`.
fn to_length(value: &Value) -> u64 {
    match value.as_number() {
        Some(n) if n.is_finite() && n > 0.0 => n.min(9_007_199_254_740_991.0) as u64,
        _ => 0,
    }
}

/// ToPropertyDescriptor: convert a descriptor object into the record form.
///
/// Every field read is an observable `[[HasProperty]]`/`[[Get]]` pair. The
/// resulting record keeps a back-pointer to `value` so a later
/// `defineProperty` trap can be handed the exact object the user supplied.
pub fn to_property_descriptor(cx: &mut VmContext, value: &Value) -> VmResult<PropertyDescriptor> {
    let Some(obj) = value.as_object() else {
        return Err(VmError::type_error("Property description must be an object"));
    };
    let obj = obj.clone();
    let mut desc = PropertyDescriptor::empty();

    let enumerable_key = PropertyKey::string("enumerable");
    if has_property(cx, &obj, &enumerable_key)? {
        desc.enumerable = Some(get(cx, &obj, &enumerable_key, value)?.to_boolean());
    }
    let configurable_key = PropertyKey::string("configurable");
    if has_property(cx, &obj, &configurable_key)? {
        desc.configurable = Some(get(cx, &obj, &configurable_key, value)?.to_boolean());
    }
    let value_key = PropertyKey::string("value");
    if has_property(cx, &obj, &value_key)? {
        desc.value = Some(get(cx, &obj, &value_key, value)?);
    }
    let writable_key = PropertyKey::string("writable");
    if has_property(cx, &obj, &writable_key)? {
        desc.writable = Some(get(cx, &obj, &writable_key, value)?.to_boolean());
    }
    let get_key = PropertyKey::string("get");
    if has_property(cx, &obj, &get_key)? {
        let getter = get(cx, &obj, &get_key, value)?;
        if !getter.is_callable() && !getter.is_undefined() {
            return Err(VmError::type_error("Getter must be a function"));
        }
        desc.get = Some(getter);
    }
    let set_key = PropertyKey::string("set");
    if has_property(cx, &obj, &set_key)? {
        let setter = get(cx, &obj, &set_key, value)?;
        if !setter.is_callable() && !setter.is_undefined() {
            return Err(VmError::type_error("Setter must be a function"));
        }
        desc.set = Some(setter);
    }

    if desc.is_accessor_descriptor() && desc.is_data_descriptor() {
        return Err(VmError::type_error(
            "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute",
        ));
    }

    desc.original = Some(value.clone());
    Ok(desc)
}

/// FromPropertyDescriptor: build a fresh descriptor object from the record.
pub fn from_property_descriptor(desc: &PropertyDescriptor) -> Value {
    let obj = Arc::new(JsObject::new(None));
    if let Some(v) = &desc.value {
        obj.set(PropertyKey::string("value"), v.clone());
    }
    if let Some(w) = desc.writable {
        obj.set(PropertyKey::string("writable"), Value::boolean(w));
    }
    if let Some(g) = &desc.get {
        obj.set(PropertyKey::string("get"), g.clone());
    }
    if let Some(s) = &desc.set {
        obj.set(PropertyKey::string("set"), s.clone());
    }
    if let Some(e) = desc.enumerable {
        obj.set(PropertyKey::string("enumerable"), Value::boolean(e));
    }
    if let Some(c) = desc.configurable {
        obj.set(PropertyKey::string("configurable"), Value::boolean(c));
    }
    Value::object(obj)
}

/// Strict equality between a possibly-proxy value and another value.
///
/// Proxies compare by identity only (no trap fires), but a revoked proxy
/// still refuses the comparison.
pub fn strict_equals(cx: &mut VmContext, a: &Value, b: &Value) -> VmResult<bool> {
    if let Some(ObjectRef::Proxy(p)) = a.as_object() {
        return proxy_ops::proxy_strict_equals(cx, p, b);
    }
    if let Some(ObjectRef::Proxy(p)) = b.as_object() {
        return proxy_ops::proxy_strict_equals(cx, p, a);
    }
    Ok(match (a, b) {
        // `===` on numbers: NaN is unequal to itself, -0 equals +0
        (Value::Number(x), Value::Number(y)) => x == y,
        _ => same_value(a, b),
    })
}
