//! JavaScript objects and the property descriptor record
//!
//! Objects keep their own properties in an insertion-ordered table so
//! `own_keys()` observes ES ordering (integer indices ascending, then string
//! keys in insertion order, then symbols). There is no hidden-class machinery
//! here: proxies defeat property caching anyway, and the
//! [`PropertyLookupCache`] handshake is how callers learn that a lookup must
//! not be cached.

use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::proxy::JsProxy;
use crate::string::JsString;
use crate::value::{NativeFunctionObject, Symbol, Value, same_value};

/// Maximum prototype chain depth to prevent stack overflow
const MAX_PROTOTYPE_CHAIN_DEPTH: usize = 100;

/// Property key (string, integer index, or symbol)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// String property key
    String(Arc<JsString>),
    /// Integer index (canonical numeric strings)
    Index(u32),
    /// Symbol property key
    Symbol(Arc<Symbol>),
}

impl PropertyKey {
    /// Create a string property key (canonicalizes numeric strings to Index)
    pub fn string(s: &str) -> Self {
        if let Ok(n) = s.parse::<u32>() {
            // Only canonical spellings map to Index (no leading zeros)
            if n.to_string() == s {
                return Self::Index(n);
            }
        }
        Self::String(JsString::intern(s))
    }

    /// Create from an interned string
    pub fn from_js_string(s: Arc<JsString>) -> Self {
        Self::String(s)
    }

    /// Create an index property key
    pub fn index(i: u32) -> Self {
        Self::Index(i)
    }

    /// Create a symbol property key
    pub fn symbol(s: Arc<Symbol>) -> Self {
        Self::Symbol(s)
    }

    /// True for string and index keys (`typeof key === "string"` after
    /// `ToPropertyKey`)
    pub fn is_string(&self) -> bool {
        matches!(self, Self::String(_) | Self::Index(_))
    }

    /// True for symbol keys
    pub fn is_symbol(&self) -> bool {
        matches!(self, Self::Symbol(_))
    }

    /// The value handed to traps as the property name: a string or a symbol
    pub fn to_value(&self) -> Value {
        match self {
            Self::String(s) => Value::string(s.clone()),
            Self::Index(i) => Value::str(&i.to_string()),
            Self::Symbol(s) => Value::symbol(s.clone()),
        }
    }

    /// Convert a primitive value to a property key (ToPropertyKey).
    ///
    /// Returns `None` for object-valued inputs; running `ToPrimitive` on
    /// those would call user code and is the caller's job.
    pub fn from_value(value: &Value) -> Option<PropertyKey> {
        match value {
            Value::String(s) => Some(Self::string(s.as_str())),
            Value::Symbol(s) => Some(Self::Symbol(s.clone())),
            Value::Number(n) => {
                if n.fract() == 0.0 && *n >= 0.0 && *n <= u32::MAX as f64 {
                    Some(Self::Index(*n as u32))
                } else {
                    Some(Self::string(&format_number(*n)))
                }
            }
            Value::Boolean(b) => Some(Self::string(if *b { "true" } else { "false" })),
            Value::Undefined => Some(Self::string("undefined")),
            Value::Null => Some(Self::string("null")),
            Value::Object(_) => None,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<u32> for PropertyKey {
    fn from(i: u32) -> Self {
        Self::Index(i)
    }
}

/// Which subset of own property keys an enumeration wants.
///
/// The `ownKeys` trap result and the trap-absent forwarding path are both
/// filtered by this kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeysKind {
    /// All own keys: indices, strings, symbols
    Keys,
    /// String-valued keys only (includes integer indices)
    StringsOnly,
    /// Symbol keys only
    SymbolsOnly,
}

impl KeysKind {
    /// Whether a key belongs to this subset
    pub fn admits(&self, key: &PropertyKey) -> bool {
        match self {
            Self::Keys => true,
            Self::StringsOnly => key.is_string(),
            Self::SymbolsOnly => key.is_symbol(),
        }
    }
}

/// Property descriptor record.
///
/// Six optional attribute fields plus two derived bits: `from_proxy` marks a
/// descriptor produced by a trap (callers must not cache it), and `original`
/// carries the user-supplied descriptor object so a later `defineProperty`
/// trap sees the same object the user passed in. `original` has no behavioral
/// field contribution.
#[derive(Clone, Debug, Default)]
pub struct PropertyDescriptor {
    /// `[[Value]]`
    pub value: Option<Value>,
    /// `[[Writable]]`
    pub writable: Option<bool>,
    /// `[[Get]]` (`Some(Value::Undefined)` is an explicitly absent getter)
    pub get: Option<Value>,
    /// `[[Set]]`
    pub set: Option<Value>,
    /// `[[Enumerable]]`
    pub enumerable: Option<bool>,
    /// `[[Configurable]]`
    pub configurable: Option<bool>,
    /// The descriptor came from a proxy trap; disables property caching
    pub from_proxy: bool,
    /// Back-pointer to the descriptor object this record was converted from
    pub(crate) original: Option<Value>,
}

impl PropertyDescriptor {
    /// Data property with default (true) attributes
    pub fn data(value: Value) -> Self {
        Self::data_with_attrs(value, true, true, true)
    }

    /// Data property with explicit attributes
    pub fn data_with_attrs(
        value: Value,
        writable: bool,
        enumerable: bool,
        configurable: bool,
    ) -> Self {
        Self {
            value: Some(value),
            writable: Some(writable),
            enumerable: Some(enumerable),
            configurable: Some(configurable),
            ..Default::default()
        }
    }

    /// Accessor property
    pub fn accessor(
        get: Option<Value>,
        set: Option<Value>,
        enumerable: bool,
        configurable: bool,
    ) -> Self {
        Self {
            get: Some(get.unwrap_or(Value::Undefined)),
            set: Some(set.unwrap_or(Value::Undefined)),
            enumerable: Some(enumerable),
            configurable: Some(configurable),
            ..Default::default()
        }
    }

    /// Descriptor with no fields specified
    pub fn empty() -> Self {
        Self::default()
    }

    /// IsDataDescriptor
    pub fn is_data_descriptor(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    /// IsAccessorDescriptor
    pub fn is_accessor_descriptor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    /// IsGenericDescriptor
    pub fn is_generic_descriptor(&self) -> bool {
        !self.is_data_descriptor() && !self.is_accessor_descriptor()
    }

    /// `[[Configurable]]` is present and true
    pub fn is_configurable(&self) -> bool {
        self.configurable == Some(true)
    }

    /// `[[Writable]]` is present and true
    pub fn is_writable(&self) -> bool {
        self.writable == Some(true)
    }

    /// `[[Enumerable]]` is present and true
    pub fn is_enumerable(&self) -> bool {
        self.enumerable == Some(true)
    }

    /// True when no field is specified at all
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
            && self.writable.is_none()
            && self.get.is_none()
            && self.set.is_none()
            && self.enumerable.is_none()
            && self.configurable.is_none()
    }

    /// CompletePropertyDescriptor: fill unspecified fields with defaults
    pub fn complete(&mut self) {
        if self.is_generic_descriptor() || self.is_data_descriptor() {
            self.value.get_or_insert(Value::Undefined);
            self.writable.get_or_insert(false);
        } else {
            self.get.get_or_insert(Value::Undefined);
            self.set.get_or_insert(Value::Undefined);
        }
        self.enumerable.get_or_insert(false);
        self.configurable.get_or_insert(false);
    }

    /// The descriptor object this record was converted from, if any
    pub fn original(&self) -> Option<&Value> {
        self.original.as_ref()
    }
}

/// IsCompatiblePropertyDescriptor: would defining `desc` over `current`
/// succeed on an object whose extensibility is `extensible`?
///
/// `current` is `None` when the property does not exist yet.
pub fn is_compatible_property_descriptor(
    extensible: bool,
    desc: &PropertyDescriptor,
    current: Option<&PropertyDescriptor>,
) -> bool {
    let Some(current) = current else {
        return extensible;
    };
    if desc.is_empty() {
        return true;
    }
    if current.is_configurable() {
        return true;
    }
    // Current is non-configurable from here on.
    if desc.configurable == Some(true) {
        return false;
    }
    if let Some(enumerable) = desc.enumerable {
        if Some(enumerable) != current.enumerable {
            return false;
        }
    }
    if desc.is_generic_descriptor() {
        return true;
    }
    if desc.is_data_descriptor() != current.is_data_descriptor() {
        return false;
    }
    if current.is_data_descriptor() {
        if !current.is_writable() {
            if desc.writable == Some(true) {
                return false;
            }
            if let (Some(v), Some(cv)) = (&desc.value, &current.value) {
                if !same_value(v, cv) {
                    return false;
                }
            }
        }
    } else {
        if let (Some(g), Some(cg)) = (&desc.get, &current.get) {
            if !same_value(g, cg) {
                return false;
            }
        }
        if let (Some(s), Some(cs)) = (&desc.set, &current.set) {
            if !same_value(s, cs) {
                return false;
            }
        }
    }
    true
}

/// Cacheability handshake between a property operation and its caller.
///
/// Both the target and the handler of a proxy can be mutated behind the
/// engine's back, so every operation served by a proxy disables both the
/// own-property cache and the prototype-chain cache.
#[derive(Debug)]
pub struct PropertyLookupCache {
    cacheable: bool,
    prototype_cacheable: bool,
}

impl PropertyLookupCache {
    /// A fresh, fully cacheable lookup
    pub fn new() -> Self {
        Self {
            cacheable: true,
            prototype_cacheable: true,
        }
    }

    /// Forbid caching this lookup entirely
    pub fn disable_all(&mut self) {
        self.cacheable = false;
        self.prototype_cacheable = false;
    }

    /// Forbid caching prototype-chain results for this lookup
    pub fn disable_prototype(&mut self) {
        self.prototype_cacheable = false;
    }

    /// May the own-property result be cached?
    pub fn is_cacheable(&self) -> bool {
        self.cacheable
    }

    /// May the prototype-chain result be cached?
    pub fn is_prototype_cacheable(&self) -> bool {
        self.prototype_cacheable
    }
}

impl Default for PropertyLookupCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Tagged handle to any object-like value.
///
/// The generic object operations dispatch on this: `Proxy` routes through the
/// trap dispatchers, the other variants through ordinary semantics. A native
/// function carries a backing [`JsObject`] for its properties.
#[derive(Clone)]
pub enum ObjectRef {
    /// Ordinary object
    Ordinary(Arc<JsObject>),
    /// Native function
    Function(Arc<NativeFunctionObject>),
    /// Proxy exotic object
    Proxy(Arc<JsProxy>),
}

impl ObjectRef {
    /// Identity comparison (pointer equality per variant)
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        match (self, other) {
            (Self::Ordinary(a), Self::Ordinary(b)) => Arc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Arc::ptr_eq(a, b),
            (Self::Proxy(a), Self::Proxy(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// True if invoking this object as a function is meaningful
    pub fn is_callable(&self) -> bool {
        match self {
            Self::Ordinary(_) => false,
            Self::Function(_) => true,
            Self::Proxy(p) => p.is_callable(),
        }
    }

    /// The ordinary property storage behind this handle, if it has one.
    ///
    /// Proxies have none; every property operation on them goes through the
    /// trap dispatchers.
    pub fn backing(&self) -> Option<&Arc<JsObject>> {
        match self {
            Self::Ordinary(o) => Some(o),
            Self::Function(f) => Some(&f.object),
            Self::Proxy(_) => None,
        }
    }

    /// The proxy behind this handle, if it is one
    pub fn as_proxy(&self) -> Option<&Arc<JsProxy>> {
        match self {
            Self::Proxy(p) => Some(p),
            _ => None,
        }
    }

    /// The ordinary object behind this handle, if it is one
    pub fn as_ordinary(&self) -> Option<&Arc<JsObject>> {
        match self {
            Self::Ordinary(o) => Some(o),
            _ => None,
        }
    }
}

impl std::fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ordinary(o) => o.fmt(f),
            Self::Function(func) => func.fmt(f),
            Self::Proxy(p) => p.fmt(f),
        }
    }
}

impl From<Arc<JsObject>> for ObjectRef {
    fn from(o: Arc<JsObject>) -> Self {
        Self::Ordinary(o)
    }
}

impl From<Arc<NativeFunctionObject>> for ObjectRef {
    fn from(f: Arc<NativeFunctionObject>) -> Self {
        Self::Function(f)
    }
}

impl From<Arc<JsProxy>> for ObjectRef {
    fn from(p: Arc<JsProxy>) -> Self {
        Self::Proxy(p)
    }
}

/// A JavaScript object
///
/// Thread-safe with interior mutability. Property records are stored
/// completed (every attribute field present).
pub struct JsObject {
    /// Own properties, insertion-ordered
    properties: RwLock<IndexMap<PropertyKey, PropertyDescriptor>>,
    /// Prototype (may be a proxy; `None` is a null prototype)
    prototype: RwLock<Option<ObjectRef>>,
    /// Extensibility flag; cleared by `prevent_extensions`, never set again
    extensible: AtomicBool,
}

impl JsObject {
    /// Create a new empty object
    pub fn new(prototype: Option<ObjectRef>) -> Self {
        Self {
            properties: RwLock::new(IndexMap::new()),
            prototype: RwLock::new(prototype),
            extensible: AtomicBool::new(true),
        }
    }

    /// Get own property descriptor (does not walk prototype chain)
    pub fn get_own_property(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        self.properties.read().get(key).cloned()
    }

    /// Check if object has own property
    pub fn has_own(&self, key: &PropertyKey) -> bool {
        self.properties.read().contains_key(key)
    }

    /// Get a data property value, walking ordinary prototype links.
    ///
    /// Convenience for intrinsics setup and tests: accessor properties and
    /// proxy prototypes are not evaluated here (use the generic operations
    /// for observable lookups).
    pub fn get(&self, key: &PropertyKey) -> Option<Value> {
        if let Some(desc) = self.get_own_property(key) {
            return desc.value;
        }
        let mut current = self.prototype();
        let mut depth = 0;
        while let Some(ObjectRef::Ordinary(proto)) = current {
            depth += 1;
            if depth > MAX_PROTOTYPE_CHAIN_DEPTH {
                break;
            }
            if let Some(desc) = proto.get_own_property(key) {
                return desc.value;
            }
            current = proto.prototype();
        }
        None
    }

    /// Set a data property.
    ///
    /// Updates a writable existing data property or creates a new one with
    /// default attributes. Returns false for accessor properties,
    /// non-writable properties, and new properties on a non-extensible
    /// object.
    pub fn set(&self, key: PropertyKey, value: Value) -> bool {
        let mut props = self.properties.write();
        if let Some(existing) = props.get_mut(&key) {
            if existing.is_accessor_descriptor() || !existing.is_writable() {
                return false;
            }
            existing.value = Some(value);
            return true;
        }
        if !self.is_extensible() {
            return false;
        }
        props.insert(key, PropertyDescriptor::data(value));
        true
    }

    /// Define a property with a (possibly partial) descriptor.
    ///
    /// Ordinary `[[DefineOwnProperty]]`: validates against the current
    /// descriptor and extensibility, then merges specified fields.
    pub fn define_own_property(&self, key: PropertyKey, desc: &PropertyDescriptor) -> bool {
        let extensible = self.is_extensible();
        let mut props = self.properties.write();
        match props.get_mut(&key) {
            None => {
                if !extensible {
                    return false;
                }
                let mut stored = desc.clone();
                stored.from_proxy = false;
                stored.original = None;
                stored.complete();
                props.insert(key, stored);
                true
            }
            Some(current) => {
                if !is_compatible_property_descriptor(true, desc, Some(current)) {
                    return false;
                }
                apply_descriptor(current, desc);
                true
            }
        }
    }

    /// Delete an own property. Non-configurable properties refuse.
    pub fn delete(&self, key: &PropertyKey) -> bool {
        let mut props = self.properties.write();
        match props.get(key) {
            None => true,
            Some(desc) => {
                if !desc.is_configurable() {
                    return false;
                }
                props.shift_remove(key);
                true
            }
        }
    }

    /// Own property keys in ES order: integer indices ascending, then string
    /// keys in insertion order, then symbols in insertion order.
    pub fn own_keys(&self, kind: KeysKind) -> Vec<PropertyKey> {
        let props = self.properties.read();
        let mut indices: Vec<u32> = Vec::new();
        let mut strings: Vec<PropertyKey> = Vec::new();
        let mut symbols: Vec<PropertyKey> = Vec::new();
        for key in props.keys() {
            match key {
                PropertyKey::Index(i) => indices.push(*i),
                PropertyKey::String(_) => strings.push(key.clone()),
                PropertyKey::Symbol(_) => symbols.push(key.clone()),
            }
        }
        indices.sort_unstable();
        let mut keys = Vec::with_capacity(props.len());
        if kind != KeysKind::SymbolsOnly {
            keys.extend(indices.into_iter().map(PropertyKey::Index));
            keys.extend(strings);
        }
        if kind != KeysKind::StringsOnly {
            keys.extend(symbols);
        }
        keys
    }

    /// Get prototype
    pub fn prototype(&self) -> Option<ObjectRef> {
        self.prototype.read().clone()
    }

    /// Set prototype.
    ///
    /// Returns false if the object is not extensible (unless the prototype
    /// is unchanged) or if the new chain would cycle back through this
    /// object. The cycle walk stops at the first non-ordinary link.
    pub fn set_prototype(self: &Arc<Self>, prototype: Option<ObjectRef>) -> bool {
        let current = self.prototype();
        let unchanged = match (&current, &prototype) {
            (None, None) => true,
            (Some(a), Some(b)) => a.ptr_eq(b),
            _ => false,
        };
        if unchanged {
            return true;
        }
        if !self.is_extensible() {
            return false;
        }
        if let Some(ref proto) = prototype {
            let mut walker = Some(proto.clone());
            let mut depth = 0;
            while let Some(ObjectRef::Ordinary(p)) = walker {
                depth += 1;
                if depth > MAX_PROTOTYPE_CHAIN_DEPTH {
                    return false;
                }
                if Arc::ptr_eq(&p, self) {
                    return false;
                }
                walker = p.prototype();
            }
        }
        *self.prototype.write() = prototype;
        true
    }

    /// Check if object is extensible
    pub fn is_extensible(&self) -> bool {
        self.extensible.load(Ordering::Acquire)
    }

    /// Prevent extensions; irreversible
    pub fn prevent_extensions(&self) {
        self.extensible.store(false, Ordering::Release);
    }
}

/// Merge the specified fields of `desc` into `current`, switching the
/// property kind first when the define changes data/accessor flavor.
fn apply_descriptor(current: &mut PropertyDescriptor, desc: &PropertyDescriptor) {
    if desc.is_data_descriptor() && current.is_accessor_descriptor() {
        current.get = None;
        current.set = None;
        current.value = Some(Value::Undefined);
        current.writable = Some(false);
    } else if desc.is_accessor_descriptor() && current.is_data_descriptor() {
        current.value = None;
        current.writable = None;
        current.get = Some(Value::Undefined);
        current.set = Some(Value::Undefined);
    }
    if let Some(v) = &desc.value {
        current.value = Some(v.clone());
    }
    if let Some(w) = desc.writable {
        current.writable = Some(w);
    }
    if let Some(g) = &desc.get {
        current.get = Some(g.clone());
    }
    if let Some(s) = &desc.set {
        current.set = Some(s.clone());
    }
    if let Some(e) = desc.enumerable {
        current.enumerable = Some(e);
    }
    if let Some(c) = desc.configurable {
        current.configurable = Some(c);
    }
}

impl std::fmt::Debug for JsObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let props = self.properties.read();
        f.debug_struct("JsObject")
            .field("properties", &props.len())
            .field("extensible", &self.is_extensible())
            .finish()
    }
}
