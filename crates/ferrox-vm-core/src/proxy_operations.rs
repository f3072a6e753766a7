//! Proxy trap dispatch and invariant validation
//!
//! One dispatcher per internal method. Each follows the same shape: check
//! the implicit-call gate, check revocation, resolve the trap off the
//! handler, forward to the target when the trap is absent, otherwise invoke
//! the trap and validate its answer against the target's *current* state.
//!
//! Every trap call is a suspension point: arbitrary user code runs, which
//! may mutate the target, the handler, or revoke the proxy. No invariant is
//! allowed to span that boundary: post-trap checks re-read the target. The
//! target handle captured before the call stays valid through `Arc`
//! ownership even if the proxy is revoked mid-trap; the revocation is
//! observed at the next trap resolution.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::context::{ImplicitCallFlags, VmContext};
use crate::error::{VmError, VmResult};
use crate::object::{
    KeysKind, ObjectRef, PropertyDescriptor, PropertyKey, is_compatible_property_descriptor,
};
use crate::operations::{self, SetPropertyKind};
use crate::proxy::{JsProxy, ProxySlots};
use crate::realm;
use crate::value::{Value, same_value};

/// Hard ceiling on argument-list length for the call/construct paths
const MAX_ARG_LIST: usize = 65535;

fn revoked_error(op: &str) -> VmError {
    VmError::type_error(format!("Cannot perform '{}' on a revoked proxy", op))
}

fn need_function_error(name: &str) -> VmError {
    VmError::type_error(format!(
        "Proxy handler's '{}' trap must be a function",
        name
    ))
}

fn inconsistent_error(trap: &str, detail: &str) -> VmError {
    tracing::debug!(trap, detail, "proxy trap result violates target invariant");
    VmError::type_error(format!("Proxy '{}' trap {}", trap, detail))
}

/// Check the implicit-call gate: when optimized code forbids implicit calls,
/// record the `External` bit and make the caller decline the operation.
fn implicit_calls_blocked(cx: &mut VmContext) -> bool {
    if cx.implicit_calls_disabled() {
        cx.add_implicit_call_flags(ImplicitCallFlags::EXTERNAL);
        true
    } else {
        false
    }
}

/// Resolve a trap off the handler.
///
/// The lookup is a full generic get: a handler that is itself a proxy
/// answers through its own dispatchers. `undefined` and `null` mean "no
/// trap"; any other non-callable is a TypeError. The callable is marshalled
/// into the current realm before use.
fn resolve_trap(
    cx: &mut VmContext,
    proxy: &Arc<JsProxy>,
    name: &str,
) -> VmResult<Option<Value>> {
    let Some(slots) = proxy.slots() else {
        return Err(revoked_error(name));
    };
    let handler_val = Value::Object(slots.handler.clone());
    let trap = operations::get(cx, &slots.handler, &PropertyKey::string(name), &handler_val)?;
    if trap.is_null_or_undefined() {
        return Ok(None);
    }
    if !trap.is_callable() {
        return Err(need_function_error(name));
    }
    Ok(Some(realm::marshal(trap, cx.realm())))
}

/// Invoke a resolved trap with the handler as `this`.
///
/// On normal return the saved implicit-call mask is restored with the
/// `Accessor` bit ORed in; a thrown exception propagates untouched.
fn call_trap(
    cx: &mut VmContext,
    trap: &Value,
    handler: &ObjectRef,
    args: &[Value],
) -> VmResult<Value> {
    let saved = cx.implicit_call_flags();
    let handler_val = Value::Object(handler.clone());
    let result = operations::call_function(cx, trap, &handler_val, args);
    if result.is_ok() {
        cx.set_implicit_call_flags(saved | ImplicitCallFlags::ACCESSOR);
    }
    result
}

fn live_slots(proxy: &Arc<JsProxy>, op: &str) -> VmResult<ProxySlots> {
    proxy.slots().ok_or_else(|| revoked_error(op))
}

/// ES §9.5.5: `[[GetOwnProperty]]` through the `getOwnPropertyDescriptor`
/// trap.
pub fn proxy_get_own_property(
    cx: &mut VmContext,
    proxy: &Arc<JsProxy>,
    key: &PropertyKey,
) -> VmResult<Option<PropertyDescriptor>> {
    let slots = live_slots(proxy, "getOwnPropertyDescriptor")?;
    let trap = resolve_trap(cx, proxy, "getOwnPropertyDescriptor")?;
    let trap = match trap {
        Some(t) if !cx.heap_enum_in_progress() => t,
        // Trap absent, or a heap enumeration forbids running user code:
        // forward to the target unchanged.
        _ => {
            let mut desc = operations::get_own_property_descriptor(cx, &slots.target, key)?;
            if let Some(d) = desc.as_mut() {
                d.from_proxy = false;
            }
            return Ok(desc);
        }
    };
    if implicit_calls_blocked(cx) {
        return Ok(None);
    }

    let trap_result = call_trap(
        cx,
        &trap,
        &slots.handler,
        &[Value::Object(slots.target.clone()), key.to_value()],
    )?;
    if !trap_result.is_object() && !trap_result.is_undefined() {
        return Err(VmError::type_error(
            "Proxy 'getOwnPropertyDescriptor' trap must return an object or undefined",
        ));
    }

    let target_desc = operations::get_own_property_descriptor(cx, &slots.target, key)?;

    if trap_result.is_undefined() {
        let Some(target_desc) = target_desc else {
            return Ok(None);
        };
        if !target_desc.is_configurable() {
            return Err(inconsistent_error(
                "getOwnPropertyDescriptor",
                "reported a non-configurable own property as missing",
            ));
        }
        if !operations::is_extensible(cx, &slots.target)? {
            return Err(inconsistent_error(
                "getOwnPropertyDescriptor",
                "reported a property of a non-extensible target as missing",
            ));
        }
        return Ok(None);
    }

    let extensible = operations::is_extensible(cx, &slots.target)?;
    let mut result = operations::to_property_descriptor(cx, &trap_result)?;
    result.complete();
    if !is_compatible_property_descriptor(extensible, &result, target_desc.as_ref()) {
        return Err(inconsistent_error(
            "getOwnPropertyDescriptor",
            "returned a descriptor incompatible with the target's own property",
        ));
    }
    if !result.is_configurable()
        && target_desc.as_ref().is_none_or(|d| d.is_configurable())
    {
        return Err(inconsistent_error(
            "getOwnPropertyDescriptor",
            "reported a configurable or missing property as non-configurable",
        ));
    }
    result.from_proxy = true;
    Ok(Some(result))
}

/// ES §9.5.8: `[[Get]]` through the `get` trap.
pub fn proxy_get(
    cx: &mut VmContext,
    proxy: &Arc<JsProxy>,
    key: &PropertyKey,
    receiver: &Value,
) -> VmResult<Value> {
    if implicit_calls_blocked(cx) {
        return Ok(Value::undefined());
    }
    let slots = live_slots(proxy, "get")?;
    let trap = match resolve_trap(cx, proxy, "get")? {
        Some(t) if !cx.heap_enum_in_progress() => t,
        _ => return operations::get(cx, &slots.target, key, receiver),
    };

    let result = call_trap(
        cx,
        &trap,
        &slots.handler,
        &[
            Value::Object(slots.target.clone()),
            key.to_value(),
            receiver.clone(),
        ],
    )?;

    // The trap ran user code; validate against the target's state *now*.
    if let Some(target_desc) = operations::get_own_property_descriptor(cx, &slots.target, key)? {
        if let Some(stored) = &target_desc.value {
            if !target_desc.is_configurable()
                && !target_desc.is_writable()
                && !same_value(&result, stored)
            {
                return Err(inconsistent_error(
                    "get",
                    "returned a value that does not match the target's non-configurable, non-writable data property",
                ));
            }
        } else if target_desc.is_accessor_descriptor()
            && !target_desc.is_configurable()
            && matches!(&target_desc.get, Some(Value::Undefined))
            && !result.is_undefined()
        {
            return Err(inconsistent_error(
                "get",
                "must return undefined for a non-configurable accessor property without a getter",
            ));
        }
    }
    Ok(result)
}

/// ES §9.5.7: `[[HasProperty]]` through the `has` trap.
pub fn proxy_has(cx: &mut VmContext, proxy: &Arc<JsProxy>, key: &PropertyKey) -> VmResult<bool> {
    if implicit_calls_blocked(cx) {
        return Ok(false);
    }
    let slots = live_slots(proxy, "has")?;
    let trap = match resolve_trap(cx, proxy, "has")? {
        Some(t) => t,
        None => return operations::has_property(cx, &slots.target, key),
    };

    let trap_result = call_trap(
        cx,
        &trap,
        &slots.handler,
        &[Value::Object(slots.target.clone()), key.to_value()],
    )?;
    let has = trap_result.to_boolean();
    if !has {
        if let Some(target_desc) =
            operations::get_own_property_descriptor(cx, &slots.target, key)?
        {
            if !target_desc.is_configurable() || !operations::is_extensible(cx, &slots.target)? {
                return Err(inconsistent_error(
                    "has",
                    "reported an unremovable own property of the target as absent",
                ));
            }
        }
    }
    Ok(has)
}

/// ES §9.5.9: `[[Set]]` through the `set` trap.
///
/// All set entry points (plain, indexed, tagged-number receiver, cached)
/// converge here; `kind` only selects the trap-absent forwarding operation.
pub fn proxy_set(
    cx: &mut VmContext,
    proxy: &Arc<JsProxy>,
    kind: SetPropertyKind,
    key: &PropertyKey,
    value: Value,
    receiver: &Value,
) -> VmResult<bool> {
    let slots = live_slots(proxy, "set")?;
    if implicit_calls_blocked(cx) {
        return Ok(false);
    }
    let trap = match resolve_trap(cx, proxy, "set")? {
        Some(t) => t,
        None => {
            return match kind {
                SetPropertyKind::Property
                | SetPropertyKind::Item
                | SetPropertyKind::PropertyWithCache => {
                    operations::set(cx, &slots.target, key, value, receiver)
                }
                SetPropertyKind::PropertyOnTaggedNumber
                | SetPropertyKind::ItemOnTaggedNumber => {
                    operations::set_property_on_tagged_number(
                        cx,
                        &slots.target,
                        key,
                        value,
                        receiver,
                    )
                }
            };
        }
    };

    let trap_result = call_trap(
        cx,
        &trap,
        &slots.handler,
        &[
            Value::Object(slots.target.clone()),
            key.to_value(),
            value.clone(),
            receiver.clone(),
        ],
    )?;
    if !trap_result.to_boolean() {
        return Ok(false);
    }

    if let Some(target_desc) = operations::get_own_property_descriptor(cx, &slots.target, key)? {
        if let Some(stored) = &target_desc.value {
            if !target_desc.is_configurable()
                && !target_desc.is_writable()
                && !same_value(&value, stored)
            {
                return Err(inconsistent_error(
                    "set",
                    "cannot change the value of the target's non-configurable, non-writable data property",
                ));
            }
        } else if target_desc.is_accessor_descriptor()
            && !target_desc.is_configurable()
            && matches!(&target_desc.set, Some(Value::Undefined))
        {
            return Err(inconsistent_error(
                "set",
                "cannot write to a non-configurable accessor property without a setter",
            ));
        }
    }
    Ok(true)
}

/// The receiver-side set fallback: the engine's slow-path `[[Set]]` walked a
/// prototype chain and landed back on this proxy as receiver.
///
/// Performs `[[GetOwnProperty]]` on the proxy itself (through its trap),
/// then either creates a fresh data property, rejects accessor or
/// non-writable properties, or updates and redefines.
pub fn proxy_default_set(
    cx: &mut VmContext,
    proxy: &Arc<JsProxy>,
    key: &PropertyKey,
    value: Value,
) -> VmResult<bool> {
    // The write is observable through traps; optimized callers must bail.
    cx.add_implicit_call_flags(ImplicitCallFlags::ACCESSOR);
    let proxy_ref = ObjectRef::Proxy(proxy.clone());

    match operations::get_own_property_descriptor(cx, &proxy_ref, key)? {
        None => {
            let fresh = PropertyDescriptor::data(value);
            operations::define_own_property(cx, &proxy_ref, key, &fresh, true)
        }
        Some(existing) => {
            if existing.is_accessor_descriptor() {
                return Ok(false);
            }
            if existing.writable.is_some() && !existing.is_writable() {
                return Ok(false);
            }
            let mut updated = existing;
            updated.value = Some(value);
            updated.original = None;
            updated.from_proxy = false;
            operations::define_own_property(cx, &proxy_ref, key, &updated, true)
        }
    }
}

/// ES §9.5.10: `[[Delete]]` through the `deleteProperty` trap.
pub fn proxy_delete_property(
    cx: &mut VmContext,
    proxy: &Arc<JsProxy>,
    key: &PropertyKey,
) -> VmResult<bool> {
    let slots = live_slots(proxy, "deleteProperty")?;
    if implicit_calls_blocked(cx) {
        return Ok(false);
    }
    let trap = match resolve_trap(cx, proxy, "deleteProperty")? {
        Some(t) => t,
        // Numeric ids take the target's indexed delete; both shapes are the
        // same generic operation here.
        None => return operations::delete_property(cx, &slots.target, key),
    };

    let trap_result = call_trap(
        cx,
        &trap,
        &slots.handler,
        &[Value::Object(slots.target.clone()), key.to_value()],
    )?;
    if !trap_result.to_boolean() {
        return Ok(false);
    }

    if let Some(target_desc) = operations::get_own_property_descriptor(cx, &slots.target, key)? {
        if !target_desc.is_configurable() {
            return Err(inconsistent_error(
                "deleteProperty",
                "cannot report deletion of the target's non-configurable property",
            ));
        }
    }
    Ok(true)
}

/// ES §9.5.6: `[[DefineOwnProperty]]` through the `defineProperty` trap.
///
/// A trap that answers `false` under `throw_on_error` does not raise here;
/// the boolean is returned to the caller as-is.
pub fn proxy_define_own_property(
    cx: &mut VmContext,
    proxy: &Arc<JsProxy>,
    key: &PropertyKey,
    desc: &PropertyDescriptor,
    throw_on_error: bool,
) -> VmResult<bool> {
    let slots = live_slots(proxy, "defineProperty")?;
    if implicit_calls_blocked(cx) {
        return Ok(false);
    }
    let trap = match resolve_trap(cx, proxy, "defineProperty")? {
        Some(t) => t,
        None => {
            return operations::define_own_property(cx, &slots.target, key, desc, throw_on_error);
        }
    };

    // Hand the trap the same descriptor object the user originally passed,
    // when this record came from one.
    let desc_obj = desc
        .original()
        .cloned()
        .unwrap_or_else(|| operations::from_property_descriptor(desc));

    let trap_result = call_trap(
        cx,
        &trap,
        &slots.handler,
        &[
            Value::Object(slots.target.clone()),
            key.to_value(),
            desc_obj,
        ],
    )?;
    if !trap_result.to_boolean() {
        return Ok(false);
    }

    let target_desc = operations::get_own_property_descriptor(cx, &slots.target, key)?;
    let extensible = operations::is_extensible(cx, &slots.target)?;
    let setting_config_false = desc.configurable == Some(false);

    match &target_desc {
        None => {
            if !extensible || setting_config_false {
                return Err(inconsistent_error(
                    "defineProperty",
                    "reported success adding a property the target cannot hold",
                ));
            }
        }
        Some(target_desc) => {
            if !is_compatible_property_descriptor(extensible, desc, Some(target_desc)) {
                return Err(inconsistent_error(
                    "defineProperty",
                    "reported success for a define incompatible with the target's own property",
                ));
            }
            if setting_config_false && target_desc.is_configurable() {
                return Err(inconsistent_error(
                    "defineProperty",
                    "cannot report a configurable target property as defined non-configurable",
                ));
            }
        }
    }
    Ok(true)
}

/// ES §9.5.1: `[[GetPrototypeOf]]` through the `getPrototypeOf` trap.
pub fn proxy_get_prototype_of(cx: &mut VmContext, proxy: &Arc<JsProxy>) -> VmResult<Value> {
    if implicit_calls_blocked(cx) {
        return Ok(Value::undefined());
    }
    let slots = live_slots(proxy, "getPrototypeOf")?;
    let trap = match resolve_trap(cx, proxy, "getPrototypeOf")? {
        Some(t) if !cx.heap_enum_in_progress() => t,
        _ => return operations::get_prototype_of(cx, &slots.target),
    };

    let result = call_trap(
        cx,
        &trap,
        &slots.handler,
        &[Value::Object(slots.target.clone())],
    )?;
    if !result.is_object() && !result.is_null() {
        return Err(inconsistent_error(
            "getPrototypeOf",
            "must return an object or null",
        ));
    }
    if !operations::is_extensible(cx, &slots.target)? {
        let target_proto = operations::get_prototype_of(cx, &slots.target)?;
        if !same_value(&result, &target_proto) {
            return Err(inconsistent_error(
                "getPrototypeOf",
                "must report the prototype of a non-extensible target unchanged",
            ));
        }
    }
    Ok(result)
}

/// ES §9.5.2: `[[SetPrototypeOf]]` through the `setPrototypeOf` trap.
pub fn proxy_set_prototype_of(
    cx: &mut VmContext,
    proxy: &Arc<JsProxy>,
    proto: &Value,
    should_throw: bool,
) -> VmResult<bool> {
    debug_assert!(proto.is_object() || proto.is_null());
    if implicit_calls_blocked(cx) {
        return Ok(false);
    }
    let slots = live_slots(proxy, "setPrototypeOf")?;
    let trap = match resolve_trap(cx, proxy, "setPrototypeOf")? {
        Some(t) => t,
        None => return operations::set_prototype_of(cx, &slots.target, proto, should_throw),
    };

    let trap_result = call_trap(
        cx,
        &trap,
        &slots.handler,
        &[Value::Object(slots.target.clone()), proto.clone()],
    )?;
    let set_ok = trap_result.to_boolean();

    if operations::is_extensible(cx, &slots.target)? {
        if !set_ok && should_throw {
            return Err(VmError::type_error(
                "Proxy 'setPrototypeOf' trap returned false",
            ));
        }
        return Ok(set_ok);
    }
    let target_proto = operations::get_prototype_of(cx, &slots.target)?;
    if !same_value(proto, &target_proto) {
        if should_throw {
            return Err(inconsistent_error(
                "setPrototypeOf",
                "cannot change the prototype of a non-extensible target",
            ));
        }
        return Ok(false);
    }
    Ok(true)
}

/// ES §9.5.3: `[[IsExtensible]]` through the `isExtensible` trap.
pub fn proxy_is_extensible(cx: &mut VmContext, proxy: &Arc<JsProxy>) -> VmResult<bool> {
    if implicit_calls_blocked(cx) {
        return Ok(false);
    }
    let slots = live_slots(proxy, "isExtensible")?;
    let trap = match resolve_trap(cx, proxy, "isExtensible")? {
        Some(t) => t,
        None => return operations::is_extensible(cx, &slots.target),
    };

    let trap_result = call_trap(
        cx,
        &trap,
        &slots.handler,
        &[Value::Object(slots.target.clone())],
    )?;
    let reported = trap_result.to_boolean();
    let actual = operations::is_extensible(cx, &slots.target)?;
    if reported != actual {
        return Err(inconsistent_error(
            "isExtensible",
            "must agree with the target's extensibility",
        ));
    }
    Ok(reported)
}

/// ES §9.5.4: `[[PreventExtensions]]` through the `preventExtensions` trap.
pub fn proxy_prevent_extensions(cx: &mut VmContext, proxy: &Arc<JsProxy>) -> VmResult<bool> {
    if implicit_calls_blocked(cx) {
        return Ok(false);
    }
    let slots = live_slots(proxy, "preventExtensions")?;
    let trap = match resolve_trap(cx, proxy, "preventExtensions")? {
        Some(t) => t,
        None => return operations::prevent_extensions(cx, &slots.target),
    };

    let trap_result = call_trap(
        cx,
        &trap,
        &slots.handler,
        &[Value::Object(slots.target.clone())],
    )?;
    let reported = trap_result.to_boolean();
    if reported && operations::is_extensible(cx, &slots.target)? {
        return Err(inconsistent_error(
            "preventExtensions",
            "reported success while the target is still extensible",
        ));
    }
    Ok(reported)
}

/// ES §9.5.11: `[[OwnPropertyKeys]]` through the `ownKeys` trap, with the
/// full reconciliation against the target's keys.
pub fn proxy_own_property_keys(
    cx: &mut VmContext,
    proxy: &Arc<JsProxy>,
    kind: KeysKind,
) -> VmResult<Vec<PropertyKey>> {
    if implicit_calls_blocked(cx) {
        return Ok(Vec::new());
    }
    let slots = live_slots(proxy, "ownKeys")?;
    let trap = match resolve_trap(cx, proxy, "ownKeys")? {
        Some(t) => t,
        None => return operations::own_property_keys(cx, &slots.target, kind),
    };

    let trap_result = call_trap(
        cx,
        &trap,
        &slots.handler,
        &[Value::Object(slots.target.clone())],
    )?;
    if !trap_result.is_object() {
        return Err(inconsistent_error("ownKeys", "must return an object"));
    }

    // CreateListFromArrayLike, filtered to the requested key kind. Values
    // that do not carry a property id are skipped. A key may appear at most
    // once; duplicates surface while building the reconciliation map.
    let elements = operations::create_list_from_array_like(cx, &trap_result)?;
    let mut trap_keys: Vec<PropertyKey> = Vec::with_capacity(elements.len());
    let mut unmatched: FxHashMap<PropertyKey, bool> = FxHashMap::default();
    for element in &elements {
        let key = match element {
            Value::String(s) => PropertyKey::string(s.as_str()),
            Value::Symbol(sym) => PropertyKey::Symbol(sym.clone()),
            _ => continue,
        };
        if !kind.admits(&key) {
            continue;
        }
        if unmatched.insert(key.clone(), true).is_some() {
            return Err(inconsistent_error(
                "ownKeys",
                "returned the same property key twice",
            ));
        }
        trap_keys.push(key);
    }

    let extensible = operations::is_extensible(cx, &slots.target)?;
    let target_keys = operations::own_property_keys(cx, &slots.target, KeysKind::Keys)?;

    // Single pass over the target's keys, draining the map of trap-returned
    // keys as they match up.
    let mut any_nonconfigurable_target_key = false;
    let mut nonconfigurable_missing = false;
    let mut configurable_missing = false;
    for target_key in &target_keys {
        let missing_from_trap = unmatched.remove(target_key).is_none();
        let nonconfigurable = operations::get_own_property_descriptor(cx, &slots.target, target_key)?
            .is_some_and(|d| !d.is_configurable());
        if nonconfigurable {
            any_nonconfigurable_target_key = true;
            if missing_from_trap {
                nonconfigurable_missing = true;
            }
        } else if missing_from_trap {
            configurable_missing = true;
        }
    }

    if extensible && !any_nonconfigurable_target_key {
        return Ok(trap_keys);
    }
    if nonconfigurable_missing {
        return Err(inconsistent_error(
            "ownKeys",
            "result must include every non-configurable own key of the target",
        ));
    }
    if extensible {
        return Ok(trap_keys);
    }
    if configurable_missing {
        return Err(inconsistent_error(
            "ownKeys",
            "result must include every own key of the non-extensible target",
        ));
    }
    if !unmatched.is_empty() {
        return Err(inconsistent_error(
            "ownKeys",
            "result must not add keys the non-extensible target does not have",
        ));
    }
    Ok(trap_keys)
}

/// ES §9.5.13: `[[Call]]` through the `apply` trap.
pub fn proxy_call(
    cx: &mut VmContext,
    proxy: &Arc<JsProxy>,
    this: &Value,
    args: &[Value],
) -> VmResult<Value> {
    cx.probe_stack()?;
    let result = proxy_call_inner(cx, proxy, this, args);
    cx.leave_stack();
    result
}

fn proxy_call_inner(
    cx: &mut VmContext,
    proxy: &Arc<JsProxy>,
    this: &Value,
    args: &[Value],
) -> VmResult<Value> {
    let slots = live_slots(proxy, "apply")?;
    if args.len() >= MAX_ARG_LIST {
        return Err(VmError::range_error("Function argument list too large"));
    }
    let trap = resolve_trap(cx, proxy, "apply")?;
    if !slots.target.is_callable() {
        return Err(need_function_error("call"));
    }
    match trap {
        None => {
            let target_val = Value::Object(slots.target.clone());
            operations::call_function(cx, &target_val, this, args)
        }
        Some(trap) => {
            let args_array = operations::create_array_from(args);
            call_trap(
                cx,
                &trap,
                &slots.handler,
                &[
                    Value::Object(slots.target.clone()),
                    this.clone(),
                    args_array,
                ],
            )
        }
    }
}

/// ES §9.5.14: `[[Construct]]` through the `construct` trap.
///
/// `new_target` arrives already resolved by the caller: an explicit
/// override wins, then the active `this` of a super-constructor call, then
/// the proxy itself.
pub fn proxy_construct(
    cx: &mut VmContext,
    proxy: &Arc<JsProxy>,
    args: &[Value],
    new_target: &Value,
) -> VmResult<Value> {
    cx.probe_stack()?;
    let result = proxy_construct_inner(cx, proxy, args, new_target);
    cx.leave_stack();
    result
}

fn proxy_construct_inner(
    cx: &mut VmContext,
    proxy: &Arc<JsProxy>,
    args: &[Value],
    new_target: &Value,
) -> VmResult<Value> {
    let slots = live_slots(proxy, "construct")?;
    if args.len() >= MAX_ARG_LIST {
        return Err(VmError::range_error("Function argument list too large"));
    }
    let trap = resolve_trap(cx, proxy, "construct")?;
    if !slots.target.is_callable() {
        return Err(need_function_error("construct"));
    }
    match trap {
        None => {
            let target_val = Value::Object(slots.target.clone());
            if let ObjectRef::Proxy(inner) = &slots.target {
                return proxy_construct(cx, inner, args, new_target);
            }
            // Synthesize `this` from the target's own prototype, run the
            // body, and keep the synthesized object unless the body
            // returned an object of its own.
            let this_obj = operations::new_object_from_constructor(cx, &target_val)?;
            let this_val = Value::object(this_obj);
            let ret = operations::call_function_with_new_target(
                cx,
                &target_val,
                &this_val,
                args,
                new_target,
            )?;
            Ok(if ret.is_object() { ret } else { this_val })
        }
        Some(trap) => {
            let args_array = operations::create_array_from(args);
            let result = call_trap(
                cx,
                &trap,
                &slots.handler,
                &[
                    Value::Object(slots.target.clone()),
                    args_array,
                    new_target.clone(),
                ],
            )?;
            if !result.is_object() {
                return Err(inconsistent_error("construct", "must return an object"));
            }
            Ok(result)
        }
    }
}

/// Loose equality against a proxy: identity only, no trap fires, but a
/// revoked proxy refuses the comparison.
pub fn proxy_equals(cx: &mut VmContext, proxy: &Arc<JsProxy>, other: &Value) -> VmResult<bool> {
    if proxy.is_revoked() {
        return Err(revoked_error("equal"));
    }
    if implicit_calls_blocked(cx) {
        return Ok(false);
    }
    Ok(matches!(
        other.as_object(),
        Some(ObjectRef::Proxy(p)) if Arc::ptr_eq(p, proxy)
    ))
}

/// Strict equality against a proxy: identity only.
pub fn proxy_strict_equals(
    cx: &mut VmContext,
    proxy: &Arc<JsProxy>,
    other: &Value,
) -> VmResult<bool> {
    if proxy.is_revoked() {
        return Err(revoked_error("strict equal"));
    }
    if implicit_calls_blocked(cx) {
        return Ok(false);
    }
    Ok(matches!(
        other.as_object(),
        Some(ObjectRef::Proxy(p)) if Arc::ptr_eq(p, proxy)
    ))
}

/// `instanceof` against a proxy constructor: delegates through the proxy's
/// `prototype` property lookup (a trappable get) and the ordinary chain
/// walk.
pub fn proxy_has_instance(
    cx: &mut VmContext,
    proxy: &Arc<JsProxy>,
    instance: &Value,
) -> VmResult<bool> {
    let proxy_ref = ObjectRef::Proxy(proxy.clone());
    operations::has_instance(cx, &proxy_ref, instance)
}

/// Class-string computation, forwarded to the target with a revocation
/// check.
pub fn proxy_to_string(cx: &mut VmContext, proxy: &Arc<JsProxy>) -> VmResult<Value> {
    let _ = cx;
    let slots = live_slots(proxy, "toString")?;
    Ok(Value::str(if slots.target.is_callable() {
        "[object Function]"
    } else {
        "[object Object]"
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NativeContext;
    use crate::object::JsObject;
    use crate::value::NativeFunctionObject;

    fn plain() -> Arc<JsObject> {
        Arc::new(JsObject::new(None))
    }

    fn native(
        f: impl Fn(&Value, &[Value], &mut NativeContext<'_>) -> VmResult<Value>
        + Send
        + Sync
        + 'static,
    ) -> Value {
        Value::object(NativeFunctionObject::new(Arc::new(f)))
    }

    /// Handler object with a single trap installed.
    fn handler_with(
        trap_name: &str,
        f: impl Fn(&Value, &[Value], &mut NativeContext<'_>) -> VmResult<Value>
        + Send
        + Sync
        + 'static,
    ) -> ObjectRef {
        let handler = plain();
        handler.set(PropertyKey::string(trap_name), native(f));
        ObjectRef::Ordinary(handler)
    }

    fn empty_handler() -> ObjectRef {
        ObjectRef::Ordinary(plain())
    }

    fn proxy_over(target: ObjectRef, handler: ObjectRef) -> Arc<JsProxy> {
        JsProxy::new(target, handler)
    }

    #[test]
    fn test_get_forwards_without_trap() {
        let mut cx = VmContext::for_testing();
        let target = plain();
        target.set(PropertyKey::string("a"), Value::int32(1));
        let proxy = proxy_over(ObjectRef::Ordinary(target), empty_handler());

        let receiver = Value::object(proxy.clone());
        let got = proxy_get(&mut cx, &proxy, &PropertyKey::string("a"), &receiver).unwrap();
        assert_eq!(got, Value::int32(1));
    }

    #[test]
    fn test_get_trap_overrides_value() {
        let mut cx = VmContext::for_testing();
        let target = plain();
        target.set(PropertyKey::string("a"), Value::int32(1));
        let handler = handler_with("get", |_this, args, _ncx| {
            // trap(target, key, receiver)
            assert_eq!(args.len(), 3);
            assert!(args[0].is_object());
            assert_eq!(args[1], Value::str("a"));
            Ok(Value::int32(2))
        });
        let proxy = proxy_over(ObjectRef::Ordinary(target), handler);

        let receiver = Value::object(proxy.clone());
        let got = proxy_get(&mut cx, &proxy, &PropertyKey::string("a"), &receiver).unwrap();
        assert_eq!(got, Value::int32(2));
    }

    #[test]
    fn test_get_trap_value_invariant() {
        let mut cx = VmContext::for_testing();
        let target = plain();
        target.define_own_property(
            PropertyKey::string("x"),
            &PropertyDescriptor::data_with_attrs(Value::int32(1), false, true, false),
        );
        let handler = handler_with("get", |_, _, _| Ok(Value::int32(2)));
        let proxy = proxy_over(ObjectRef::Ordinary(target), handler);

        let receiver = Value::object(proxy.clone());
        let err = proxy_get(&mut cx, &proxy, &PropertyKey::string("x"), &receiver).unwrap_err();
        assert!(err.is_type_error());
    }

    #[test]
    fn test_get_trap_accessor_invariant() {
        let mut cx = VmContext::for_testing();
        let target = plain();
        // Non-configurable accessor with no getter
        target.define_own_property(
            PropertyKey::string("x"),
            &PropertyDescriptor::accessor(None, None, true, false),
        );
        let handler = handler_with("get", |_, _, _| Ok(Value::int32(2)));
        let proxy = proxy_over(ObjectRef::Ordinary(target), handler);

        let receiver = Value::object(proxy.clone());
        let err = proxy_get(&mut cx, &proxy, &PropertyKey::string("x"), &receiver).unwrap_err();
        assert!(err.is_type_error());

        // Returning undefined is the one permitted answer
        let target2 = plain();
        target2.define_own_property(
            PropertyKey::string("x"),
            &PropertyDescriptor::accessor(None, None, true, false),
        );
        let handler2 = handler_with("get", |_, _, _| Ok(Value::undefined()));
        let proxy2 = proxy_over(ObjectRef::Ordinary(target2), handler2);
        let receiver2 = Value::object(proxy2.clone());
        assert_eq!(
            proxy_get(&mut cx, &proxy2, &PropertyKey::string("x"), &receiver2).unwrap(),
            Value::undefined()
        );
    }

    #[test]
    fn test_revoked_proxy_operations_throw() {
        let mut cx = VmContext::for_testing();
        let proxy = proxy_over(ObjectRef::Ordinary(plain()), empty_handler());
        proxy.revoke();

        let receiver = Value::object(proxy.clone());
        let key = PropertyKey::string("a");
        assert!(proxy_get(&mut cx, &proxy, &key, &receiver).is_err());
        assert!(proxy_has(&mut cx, &proxy, &key).is_err());
        assert!(
            proxy_set(
                &mut cx,
                &proxy,
                SetPropertyKind::Property,
                &key,
                Value::int32(1),
                &receiver
            )
            .is_err()
        );
        assert!(proxy_delete_property(&mut cx, &proxy, &key).is_err());
        assert!(proxy_get_own_property(&mut cx, &proxy, &key).is_err());
        assert!(proxy_own_property_keys(&mut cx, &proxy, KeysKind::Keys).is_err());
        assert!(proxy_get_prototype_of(&mut cx, &proxy).is_err());
        assert!(proxy_is_extensible(&mut cx, &proxy).is_err());
        assert!(proxy_prevent_extensions(&mut cx, &proxy).is_err());
        assert!(
            proxy_set_prototype_of(&mut cx, &proxy, &Value::null(), false).is_err()
        );
    }

    #[test]
    fn test_has_trap_invariants() {
        let mut cx = VmContext::for_testing();
        let target = plain();
        target.define_own_property(
            PropertyKey::string("k"),
            &PropertyDescriptor::data_with_attrs(Value::int32(1), true, true, false),
        );
        let handler = handler_with("has", |_, _, _| Ok(Value::boolean(false)));
        let proxy = proxy_over(ObjectRef::Ordinary(target), handler);

        // Hiding a non-configurable property is an invariant violation
        let err = proxy_has(&mut cx, &proxy, &PropertyKey::string("k")).unwrap_err();
        assert!(err.is_type_error());

        // Hiding a configurable property on an extensible target is fine
        let target2 = plain();
        target2.set(PropertyKey::string("c"), Value::int32(1));
        let handler2 = handler_with("has", |_, _, _| Ok(Value::boolean(false)));
        let proxy2 = proxy_over(ObjectRef::Ordinary(target2), handler2);
        assert!(!proxy_has(&mut cx, &proxy2, &PropertyKey::string("c")).unwrap());
    }

    #[test]
    fn test_has_false_on_non_extensible_target_property() {
        let mut cx = VmContext::for_testing();
        let target = plain();
        target.set(PropertyKey::string("k"), Value::int32(1));
        target.prevent_extensions();
        let handler = handler_with("has", |_, _, _| Ok(Value::boolean(false)));
        let proxy = proxy_over(ObjectRef::Ordinary(target), handler);

        let err = proxy_has(&mut cx, &proxy, &PropertyKey::string("k")).unwrap_err();
        assert!(err.is_type_error());
    }

    #[test]
    fn test_set_trap_result_and_invariants() {
        let mut cx = VmContext::for_testing();
        let target = plain();
        let handler = handler_with("set", |_, args, _| {
            // trap(target, key, value, receiver)
            assert_eq!(args.len(), 4);
            Ok(Value::boolean(false))
        });
        let proxy = proxy_over(ObjectRef::Ordinary(target.clone()), handler);
        let receiver = Value::object(proxy.clone());

        // Trap said no; nothing lands on the target
        assert!(
            !proxy_set(
                &mut cx,
                &proxy,
                SetPropertyKind::Property,
                &PropertyKey::string("a"),
                Value::int32(1),
                &receiver
            )
            .unwrap()
        );
        assert!(!target.has_own(&PropertyKey::string("a")));

        // Lying about a frozen value is an invariant violation
        let target2 = plain();
        target2.define_own_property(
            PropertyKey::string("x"),
            &PropertyDescriptor::data_with_attrs(Value::int32(1), false, true, false),
        );
        let handler2 = handler_with("set", |_, _, _| Ok(Value::boolean(true)));
        let proxy2 = proxy_over(ObjectRef::Ordinary(target2), handler2);
        let receiver2 = Value::object(proxy2.clone());
        let err = proxy_set(
            &mut cx,
            &proxy2,
            SetPropertyKind::Property,
            &PropertyKey::string("x"),
            Value::int32(2),
            &receiver2,
        )
        .unwrap_err();
        assert!(err.is_type_error());
    }

    #[test]
    fn test_set_forwards_without_trap() {
        let mut cx = VmContext::for_testing();
        let target = plain();
        let proxy = proxy_over(ObjectRef::Ordinary(target.clone()), empty_handler());
        let receiver = Value::object(proxy.clone());

        assert!(
            proxy_set(
                &mut cx,
                &proxy,
                SetPropertyKind::Property,
                &PropertyKey::string("a"),
                Value::int32(7),
                &receiver
            )
            .unwrap()
        );
        // The write went through the target chain with the proxy as
        // receiver, so it lands back on the proxy, which defines through to
        // the target.
        assert_eq!(
            target.get(&PropertyKey::string("a")),
            Some(Value::int32(7))
        );
    }

    #[test]
    fn test_delete_trap_invariant() {
        let mut cx = VmContext::for_testing();
        let target = plain();
        target.define_own_property(
            PropertyKey::string("k"),
            &PropertyDescriptor::data_with_attrs(Value::int32(1), true, true, false),
        );
        let handler = handler_with("deleteProperty", |_, _, _| Ok(Value::boolean(true)));
        let proxy = proxy_over(ObjectRef::Ordinary(target), handler);

        let err = proxy_delete_property(&mut cx, &proxy, &PropertyKey::string("k")).unwrap_err();
        assert!(err.is_type_error());

        // Trap returning false is just a refusal
        let target2 = plain();
        target2.set(PropertyKey::string("c"), Value::int32(1));
        let handler2 = handler_with("deleteProperty", |_, _, _| Ok(Value::boolean(false)));
        let proxy2 = proxy_over(ObjectRef::Ordinary(target2.clone()), handler2);
        assert!(!proxy_delete_property(&mut cx, &proxy2, &PropertyKey::string("c")).unwrap());
        assert!(target2.has_own(&PropertyKey::string("c")));
    }

    #[test]
    fn test_define_property_trap_false_does_not_throw() {
        let mut cx = VmContext::for_testing();
        let target = plain();
        let handler = handler_with("defineProperty", |_, _, _| Ok(Value::boolean(false)));
        let proxy = proxy_over(ObjectRef::Ordinary(target), handler);

        // Even with throw_on_error the trap's false is returned, not raised
        let ok = proxy_define_own_property(
            &mut cx,
            &proxy,
            &PropertyKey::string("a"),
            &PropertyDescriptor::data(Value::int32(1)),
            true,
        )
        .unwrap();
        assert!(!ok);
    }

    #[test]
    fn test_define_property_invariants() {
        let mut cx = VmContext::for_testing();

        // Claiming success adding to a non-extensible target
        let target = plain();
        target.prevent_extensions();
        let handler = handler_with("defineProperty", |_, _, _| Ok(Value::boolean(true)));
        let proxy = proxy_over(ObjectRef::Ordinary(target), handler);
        let err = proxy_define_own_property(
            &mut cx,
            &proxy,
            &PropertyKey::string("a"),
            &PropertyDescriptor::data(Value::int32(1)),
            false,
        )
        .unwrap_err();
        assert!(err.is_type_error());

        // Claiming a configurable target property was defined non-configurable
        let target2 = plain();
        target2.set(PropertyKey::string("c"), Value::int32(1));
        let handler2 = handler_with("defineProperty", |_, _, _| Ok(Value::boolean(true)));
        let proxy2 = proxy_over(ObjectRef::Ordinary(target2), handler2);
        let err = proxy_define_own_property(
            &mut cx,
            &proxy2,
            &PropertyKey::string("c"),
            &PropertyDescriptor::data_with_attrs(Value::int32(1), true, true, false),
            false,
        )
        .unwrap_err();
        assert!(err.is_type_error());
    }

    #[test]
    fn test_define_property_trap_sees_original_descriptor_object() {
        let mut cx = VmContext::for_testing();
        let target = plain();

        let desc_obj = plain();
        desc_obj.set(PropertyKey::string("value"), Value::int32(5));
        desc_obj.set(PropertyKey::string("configurable"), Value::boolean(true));
        desc_obj.set(PropertyKey::string("writable"), Value::boolean(true));
        desc_obj.set(PropertyKey::string("enumerable"), Value::boolean(true));
        let desc_val = Value::object(desc_obj.clone());
        let desc = operations::to_property_descriptor(&mut cx, &desc_val).unwrap();

        let witnessed = Arc::new(parking_lot::Mutex::new(None::<Value>));
        let witnessed_in_trap = witnessed.clone();
        let handler = handler_with("defineProperty", move |_, args, _| {
            *witnessed_in_trap.lock() = Some(args[2].clone());
            Ok(Value::boolean(true))
        });
        let proxy = proxy_over(ObjectRef::Ordinary(target.clone()), handler);
        // Make the post-check pass by actually defining on the target first
        target.define_own_property(PropertyKey::string("p"), &desc);

        proxy_define_own_property(&mut cx, &proxy, &PropertyKey::string("p"), &desc, false)
            .unwrap();
        let seen = witnessed.lock().clone().expect("trap ran");
        assert!(same_value(&seen, &desc_val));
    }

    #[test]
    fn test_get_own_property_trap() {
        let mut cx = VmContext::for_testing();

        // undefined for a missing target property: absent
        let handler = handler_with("getOwnPropertyDescriptor", |_, _, _| Ok(Value::undefined()));
        let proxy = proxy_over(ObjectRef::Ordinary(plain()), handler);
        assert!(
            proxy_get_own_property(&mut cx, &proxy, &PropertyKey::string("a"))
                .unwrap()
                .is_none()
        );

        // undefined for a non-configurable target property: violation
        let target = plain();
        target.define_own_property(
            PropertyKey::string("k"),
            &PropertyDescriptor::data_with_attrs(Value::int32(1), true, true, false),
        );
        let handler = handler_with("getOwnPropertyDescriptor", |_, _, _| Ok(Value::undefined()));
        let proxy = proxy_over(ObjectRef::Ordinary(target), handler);
        let err = proxy_get_own_property(&mut cx, &proxy, &PropertyKey::string("k")).unwrap_err();
        assert!(err.is_type_error());

        // A real answer comes back completed and marked from_proxy
        let target = plain();
        target.set(PropertyKey::string("v"), Value::int32(3));
        let handler = handler_with("getOwnPropertyDescriptor", |_, _, ncx| {
            let desc_obj = Arc::new(JsObject::new(None));
            desc_obj.set(PropertyKey::string("value"), Value::int32(3));
            desc_obj.set(PropertyKey::string("configurable"), Value::boolean(true));
            let _ = ncx;
            Ok(Value::object(desc_obj))
        });
        let proxy = proxy_over(ObjectRef::Ordinary(target), handler);
        let desc = proxy_get_own_property(&mut cx, &proxy, &PropertyKey::string("v"))
            .unwrap()
            .expect("present");
        assert!(desc.from_proxy);
        assert_eq!(desc.value, Some(Value::int32(3)));
        assert_eq!(desc.writable, Some(false));
        assert_eq!(desc.enumerable, Some(false));
        assert_eq!(desc.configurable, Some(true));
    }

    #[test]
    fn test_get_own_property_non_object_result() {
        let mut cx = VmContext::for_testing();
        let handler = handler_with("getOwnPropertyDescriptor", |_, _, _| Ok(Value::int32(1)));
        let proxy = proxy_over(ObjectRef::Ordinary(plain()), handler);
        let err = proxy_get_own_property(&mut cx, &proxy, &PropertyKey::string("a")).unwrap_err();
        assert!(err.is_type_error());
    }

    #[test]
    fn test_prototype_traps() {
        let mut cx = VmContext::for_testing();

        // Non-extensible target: reported prototype must match
        let real_proto = Arc::new(JsObject::new(None));
        let target = Arc::new(JsObject::new(Some(ObjectRef::Ordinary(real_proto.clone()))));
        target.prevent_extensions();
        let fake_proto = Value::object(Arc::new(JsObject::new(None)));
        let handler = handler_with("getPrototypeOf", move |_, _, _| Ok(fake_proto.clone()));
        let proxy = proxy_over(ObjectRef::Ordinary(target.clone()), handler);
        let err = proxy_get_prototype_of(&mut cx, &proxy).unwrap_err();
        assert!(err.is_type_error());

        // Matching answer is fine
        let true_proto = Value::object(real_proto);
        let handler = handler_with("getPrototypeOf", move |_, _, _| Ok(true_proto.clone()));
        let proxy = proxy_over(ObjectRef::Ordinary(target), handler);
        let reported = proxy_get_prototype_of(&mut cx, &proxy).unwrap();
        assert!(reported.is_object());

        // Non-(object|null) trap result
        let handler = handler_with("getPrototypeOf", |_, _, _| Ok(Value::int32(1)));
        let proxy = proxy_over(ObjectRef::Ordinary(plain()), handler);
        assert!(proxy_get_prototype_of(&mut cx, &proxy).is_err());
    }

    #[test]
    fn test_set_prototype_trap() {
        let mut cx = VmContext::for_testing();

        // Extensible target, trap false, shouldThrow: TypeError
        let handler = handler_with("setPrototypeOf", |_, _, _| Ok(Value::boolean(false)));
        let proxy = proxy_over(ObjectRef::Ordinary(plain()), handler);
        let err = proxy_set_prototype_of(&mut cx, &proxy, &Value::null(), true).unwrap_err();
        assert!(err.is_type_error());

        // Same without shouldThrow: plain false
        let handler = handler_with("setPrototypeOf", |_, _, _| Ok(Value::boolean(false)));
        let proxy = proxy_over(ObjectRef::Ordinary(plain()), handler);
        assert!(!proxy_set_prototype_of(&mut cx, &proxy, &Value::null(), false).unwrap());

        // Non-extensible target: claiming a different prototype is a violation
        let proto = Arc::new(JsObject::new(None));
        let target = Arc::new(JsObject::new(Some(ObjectRef::Ordinary(proto))));
        target.prevent_extensions();
        let handler = handler_with("setPrototypeOf", |_, _, _| Ok(Value::boolean(true)));
        let proxy = proxy_over(ObjectRef::Ordinary(target), handler);
        let err = proxy_set_prototype_of(&mut cx, &proxy, &Value::null(), true).unwrap_err();
        assert!(err.is_type_error());
    }

    #[test]
    fn test_extensibility_traps() {
        let mut cx = VmContext::for_testing();

        // isExtensible must agree with the target
        let target = plain();
        target.prevent_extensions();
        let handler = handler_with("isExtensible", |_, _, _| Ok(Value::boolean(true)));
        let proxy = proxy_over(ObjectRef::Ordinary(target), handler);
        let err = proxy_is_extensible(&mut cx, &proxy).unwrap_err();
        assert!(err.is_type_error());

        // preventExtensions may only report success once the target complied
        let target = plain();
        let handler = handler_with("preventExtensions", |_, _, _| Ok(Value::boolean(true)));
        let proxy = proxy_over(ObjectRef::Ordinary(target.clone()), handler);
        let err = proxy_prevent_extensions(&mut cx, &proxy).unwrap_err();
        assert!(err.is_type_error());

        // A trap that actually prevents extensions passes
        let target = plain();
        let target_in_trap = target.clone();
        let handler = handler_with("preventExtensions", move |_, _, _| {
            target_in_trap.prevent_extensions();
            Ok(Value::boolean(true))
        });
        let proxy = proxy_over(ObjectRef::Ordinary(target), handler);
        assert!(proxy_prevent_extensions(&mut cx, &proxy).unwrap());
    }

    #[test]
    fn test_own_keys_missing_nonconfigurable() {
        let mut cx = VmContext::for_testing();
        let target = plain();
        target.define_own_property(
            PropertyKey::string("k"),
            &PropertyDescriptor::data_with_attrs(Value::int32(1), true, true, false),
        );
        let handler = handler_with("ownKeys", |_, _, _| Ok(operations::create_array_from(&[])));
        let proxy = proxy_over(ObjectRef::Ordinary(target), handler);

        let err = proxy_own_property_keys(&mut cx, &proxy, KeysKind::Keys).unwrap_err();
        assert!(err.is_type_error());
    }

    #[test]
    fn test_own_keys_duplicate_key() {
        let mut cx = VmContext::for_testing();
        let handler = handler_with("ownKeys", |_, _, _| {
            Ok(operations::create_array_from(&[
                Value::str("a"),
                Value::str("a"),
            ]))
        });
        let proxy = proxy_over(ObjectRef::Ordinary(plain()), handler);
        let err = proxy_own_property_keys(&mut cx, &proxy, KeysKind::Keys).unwrap_err();
        assert!(err.is_type_error());
    }

    #[test]
    fn test_own_keys_extra_key_on_non_extensible() {
        let mut cx = VmContext::for_testing();
        let target = plain();
        target.set(PropertyKey::string("a"), Value::int32(1));
        target.prevent_extensions();
        let handler = handler_with("ownKeys", |_, _, _| {
            Ok(operations::create_array_from(&[
                Value::str("a"),
                Value::str("phantom"),
            ]))
        });
        let proxy = proxy_over(ObjectRef::Ordinary(target), handler);
        let err = proxy_own_property_keys(&mut cx, &proxy, KeysKind::Keys).unwrap_err();
        assert!(err.is_type_error());
    }

    #[test]
    fn test_own_keys_exact_set_on_non_extensible() {
        let mut cx = VmContext::for_testing();
        let target = plain();
        target.set(PropertyKey::string("a"), Value::int32(1));
        target.set(PropertyKey::string("b"), Value::int32(2));
        target.prevent_extensions();
        // Order may differ from the target's; content must match
        let handler = handler_with("ownKeys", |_, _, _| {
            Ok(operations::create_array_from(&[
                Value::str("b"),
                Value::str("a"),
            ]))
        });
        let proxy = proxy_over(ObjectRef::Ordinary(target), handler);
        let keys = proxy_own_property_keys(&mut cx, &proxy, KeysKind::Keys).unwrap();
        assert_eq!(keys, vec![PropertyKey::string("b"), PropertyKey::string("a")]);
    }

    #[test]
    fn test_own_keys_free_invention_on_extensible() {
        let mut cx = VmContext::for_testing();
        let handler = handler_with("ownKeys", |_, _, _| {
            Ok(operations::create_array_from(&[
                Value::str("made"),
                Value::str("up"),
                Value::int32(42), // not a property key: skipped
            ]))
        });
        let proxy = proxy_over(ObjectRef::Ordinary(plain()), handler);
        let keys = proxy_own_property_keys(&mut cx, &proxy, KeysKind::Keys).unwrap();
        assert_eq!(
            keys,
            vec![PropertyKey::string("made"), PropertyKey::string("up")]
        );
    }

    #[test]
    fn test_own_keys_non_object_result() {
        let mut cx = VmContext::for_testing();
        let handler = handler_with("ownKeys", |_, _, _| Ok(Value::str("nope")));
        let proxy = proxy_over(ObjectRef::Ordinary(plain()), handler);
        assert!(proxy_own_property_keys(&mut cx, &proxy, KeysKind::Keys).is_err());
    }

    #[test]
    fn test_apply_trap_and_forwarding() {
        let mut cx = VmContext::for_testing();

        let target_fn = native(|this, args, _| {
            assert_eq!(*this, Value::str("receiver"));
            Ok(args.first().cloned().unwrap_or(Value::undefined()))
        });

        // No trap: forwarded straight to the target
        let proxy = proxy_over(target_fn.as_object().unwrap().clone(), empty_handler());
        let out = proxy_call(&mut cx, &proxy, &Value::str("receiver"), &[Value::int32(9)]).unwrap();
        assert_eq!(out, Value::int32(9));

        // Trap: receives (target, thisArg, argsArray)
        let handler = handler_with("apply", |_, args, ncx| {
            assert_eq!(args.len(), 3);
            assert_eq!(args[1], Value::str("receiver"));
            let args_array = args[2].as_object().unwrap().clone();
            let first = operations::get_value(ncx.vm(), &args_array, &PropertyKey::Index(0))?;
            assert_eq!(first, Value::int32(9));
            Ok(Value::str("trapped"))
        });
        let proxy = proxy_over(target_fn.as_object().unwrap().clone(), handler);
        let out = proxy_call(&mut cx, &proxy, &Value::str("receiver"), &[Value::int32(9)]).unwrap();
        assert_eq!(out, Value::str("trapped"));
    }

    #[test]
    fn test_call_requires_callable_target() {
        let mut cx = VmContext::for_testing();
        let proxy = proxy_over(ObjectRef::Ordinary(plain()), empty_handler());
        let err = proxy_call(&mut cx, &proxy, &Value::undefined(), &[]).unwrap_err();
        assert!(err.is_type_error());
    }

    #[test]
    fn test_construct_trap_must_return_object() {
        let mut cx = VmContext::for_testing();
        let target_fn = native(|_, _, _| Ok(Value::undefined()));
        let handler = handler_with("construct", |_, _, _| Ok(Value::int32(42)));
        let proxy = proxy_over(target_fn.as_object().unwrap().clone(), handler);

        let nt = Value::object(proxy.clone());
        let err = proxy_construct(&mut cx, &proxy, &[], &nt).unwrap_err();
        assert!(err.is_type_error());
    }

    #[test]
    fn test_construct_trap_new_target_threading() {
        let mut cx = VmContext::for_testing();
        let target_fn = native(|_, _, _| Ok(Value::undefined()));
        let seen = Arc::new(parking_lot::Mutex::new(None::<Value>));
        let seen_in_trap = seen.clone();
        let handler = handler_with("construct", move |_, args, _| {
            // trap(target, argsArray, newTarget)
            assert_eq!(args.len(), 3);
            *seen_in_trap.lock() = Some(args[2].clone());
            Ok(Value::object(Arc::new(JsObject::new(None))))
        });
        let proxy = proxy_over(target_fn.as_object().unwrap().clone(), handler);

        // Default: the proxy itself
        let proxy_val = Value::object(proxy.clone());
        proxy_construct(&mut cx, &proxy, &[], &proxy_val).unwrap();
        assert!(same_value(seen.lock().as_ref().unwrap(), &proxy_val));

        // Explicit override wins
        let override_nt = native(|_, _, _| Ok(Value::undefined()));
        proxy_construct(&mut cx, &proxy, &[], &override_nt).unwrap();
        assert!(same_value(seen.lock().as_ref().unwrap(), &override_nt));
    }

    #[test]
    fn test_construct_without_trap_synthesizes_this() {
        let mut cx = VmContext::for_testing();
        // Constructor body returns a primitive; caller gets the synthesized object
        let target_fn = native(|this, _, _| {
            assert!(this.is_object());
            Ok(Value::int32(5))
        });
        let proxy = proxy_over(target_fn.as_object().unwrap().clone(), empty_handler());
        let nt = Value::object(proxy.clone());
        let out = proxy_construct(&mut cx, &proxy, &[], &nt).unwrap();
        assert!(out.is_object());
    }

    #[test]
    fn test_arg_list_ceiling() {
        let mut cx = VmContext::for_testing();
        let target_fn = native(|_, _, _| Ok(Value::undefined()));
        let proxy = proxy_over(target_fn.as_object().unwrap().clone(), empty_handler());

        let args = vec![Value::undefined(); MAX_ARG_LIST];
        let err = proxy_call(&mut cx, &proxy, &Value::undefined(), &args).unwrap_err();
        assert!(err.is_range_error());

        let nt = Value::object(proxy.clone());
        let err = proxy_construct(&mut cx, &proxy, &args, &nt).unwrap_err();
        assert!(err.is_range_error());
    }

    #[test]
    fn test_non_callable_trap_rejected() {
        let mut cx = VmContext::for_testing();
        let handler = plain();
        handler.set(PropertyKey::string("get"), Value::int32(3));
        let proxy = proxy_over(ObjectRef::Ordinary(plain()), ObjectRef::Ordinary(handler));

        let receiver = Value::object(proxy.clone());
        let err = proxy_get(&mut cx, &proxy, &PropertyKey::string("a"), &receiver).unwrap_err();
        assert!(err.is_type_error());
    }

    #[test]
    fn test_null_trap_means_forward() {
        let mut cx = VmContext::for_testing();
        let target = plain();
        target.set(PropertyKey::string("a"), Value::int32(4));
        let handler = plain();
        handler.set(PropertyKey::string("get"), Value::null());
        let proxy = proxy_over(
            ObjectRef::Ordinary(target),
            ObjectRef::Ordinary(handler),
        );

        let receiver = Value::object(proxy.clone());
        assert_eq!(
            proxy_get(&mut cx, &proxy, &PropertyKey::string("a"), &receiver).unwrap(),
            Value::int32(4)
        );
    }

    #[test]
    fn test_implicit_call_gate() {
        let mut cx = VmContext::for_testing();
        let target = plain();
        target.set(PropertyKey::string("a"), Value::int32(1));
        let handler = handler_with("get", |_, _, _| Ok(Value::int32(2)));
        let proxy = proxy_over(ObjectRef::Ordinary(target), handler);
        let receiver = Value::object(proxy.clone());

        cx.set_disable_implicit_calls(true);
        // Declined with the neutral sentinel; External recorded
        let got = proxy_get(&mut cx, &proxy, &PropertyKey::string("a"), &receiver).unwrap();
        assert!(got.is_undefined());
        assert!(
            cx.implicit_call_flags()
                .contains(ImplicitCallFlags::EXTERNAL)
        );
        assert!(!proxy_has(&mut cx, &proxy, &PropertyKey::string("a")).unwrap());
        assert!(
            proxy_own_property_keys(&mut cx, &proxy, KeysKind::Keys)
                .unwrap()
                .is_empty()
        );

        // Re-enabled: the trap runs and the Accessor bit lands in the mask
        cx.set_disable_implicit_calls(false);
        cx.set_implicit_call_flags(ImplicitCallFlags::empty());
        let got = proxy_get(&mut cx, &proxy, &PropertyKey::string("a"), &receiver).unwrap();
        assert_eq!(got, Value::int32(2));
        assert!(
            cx.implicit_call_flags()
                .contains(ImplicitCallFlags::ACCESSOR)
        );
    }

    #[test]
    fn test_trap_revoking_mid_flight() {
        let mut cx = VmContext::for_testing();
        let target = plain();
        target.set(PropertyKey::string("a"), Value::int32(1));
        let handler = plain();
        let proxy = JsProxy::new(
            ObjectRef::Ordinary(target),
            ObjectRef::Ordinary(handler.clone()),
        );
        // The trap revokes the very proxy it serves
        let proxy_in_trap = proxy.clone();
        handler.set(
            PropertyKey::string("get"),
            native(move |_, _, _| {
                proxy_in_trap.revoke();
                Ok(Value::int32(99))
            }),
        );

        let receiver = Value::object(proxy.clone());
        // The in-flight operation completes with the trap's answer...
        let got = proxy_get(&mut cx, &proxy, &PropertyKey::string("a"), &receiver).unwrap();
        assert_eq!(got, Value::int32(99));
        // ...and the revocation is observed at the next trap resolution.
        let err = proxy_get(&mut cx, &proxy, &PropertyKey::string("a"), &receiver).unwrap_err();
        assert!(err.is_type_error());
    }

    #[test]
    fn test_identity_operations() {
        let mut cx = VmContext::for_testing();
        let proxy = proxy_over(ObjectRef::Ordinary(plain()), empty_handler());
        let proxy_val = Value::object(proxy.clone());
        let other = Value::object(Arc::new(JsObject::new(None)));

        assert!(proxy_strict_equals(&mut cx, &proxy, &proxy_val).unwrap());
        assert!(!proxy_strict_equals(&mut cx, &proxy, &other).unwrap());
        assert!(proxy_equals(&mut cx, &proxy, &proxy_val).unwrap());

        // Revoked: identity checks refuse, per the revoked-access discipline
        proxy.revoke();
        assert!(proxy_strict_equals(&mut cx, &proxy, &proxy_val).is_err());
        assert!(proxy_equals(&mut cx, &proxy, &proxy_val).is_err());
    }

    #[test]
    fn test_proxy_chain_dispatch() {
        let mut cx = VmContext::for_testing();
        let target = plain();
        target.set(PropertyKey::string("deep"), Value::int32(11));
        let inner = proxy_over(ObjectRef::Ordinary(target), empty_handler());
        let outer = proxy_over(ObjectRef::Proxy(inner), empty_handler());

        let receiver = Value::object(outer.clone());
        assert_eq!(
            proxy_get(&mut cx, &outer, &PropertyKey::string("deep"), &receiver).unwrap(),
            Value::int32(11)
        );
    }

    #[test]
    fn test_pathological_chain_overflows_gracefully() {
        let mut cx = VmContext::for_testing();
        let base = plain();
        base.set(PropertyKey::string("a"), Value::int32(1));
        let mut chain = JsProxy::new(ObjectRef::Ordinary(base), empty_handler());
        for _ in 0..600 {
            chain = JsProxy::new(ObjectRef::Proxy(chain), empty_handler());
        }
        let receiver = Value::object(chain.clone());
        let err = proxy_get(&mut cx, &chain, &PropertyKey::string("a"), &receiver).unwrap_err();
        assert!(matches!(err, VmError::StackOverflow));
    }

    #[test]
    fn test_heap_enum_forces_forwarding() {
        let mut cx = VmContext::for_testing();
        let target = plain();
        target.set(PropertyKey::string("a"), Value::int32(1));
        let handler = handler_with("get", |_, _, _| Ok(Value::int32(2)));
        let proxy = proxy_over(ObjectRef::Ordinary(target), handler);
        let receiver = Value::object(proxy.clone());

        cx.set_heap_enum_in_progress(true);
        assert_eq!(
            proxy_get(&mut cx, &proxy, &PropertyKey::string("a"), &receiver).unwrap(),
            Value::int32(1)
        );
        let desc = proxy_get_own_property(&mut cx, &proxy, &PropertyKey::string("a"))
            .unwrap()
            .expect("present");
        assert!(!desc.from_proxy);
        cx.set_heap_enum_in_progress(false);
    }
}
