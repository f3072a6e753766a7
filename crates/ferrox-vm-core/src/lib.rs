//! # Ferrox VM Core
//!
//! Proxy meta-object subsystem for the Ferrox JavaScript engine: the
//! `Proxy` exotic object, one trap dispatcher per internal method with full
//! ECMA-262 invariant enforcement, the revocable pair, `ownKeys`
//! reconciliation, integrity-level protocols, and the call/construct trap
//! with `new.target` threading.
//!
//! ## Design Principles
//!
//! - **Thread-safe values**: everything heap-allocated sits behind `Arc`,
//!   so values are `Send + Sync`
//! - **Tagged object dispatch**: proxies are one [`ObjectRef`] variant
//!   alongside ordinary objects and native functions; every fundamental
//!   operation funnels through [`operations`]
//! - **No state across trap calls**: a trap runs arbitrary user code;
//!   dispatchers re-read the target (and the proxy's slots) after every
//!   invocation

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod context;
pub mod enumerate;
pub mod error;
pub mod integrity;
pub mod intrinsics_impl;
pub mod object;
pub mod operations;
pub mod proxy;
pub mod proxy_operations;
pub mod realm;
pub mod string;
pub mod value;

pub use context::{ImplicitCallFlags, NativeContext, VmContext};
pub use enumerate::ForInEnumerator;
pub use error::{ThrownValue, VmError, VmResult};
pub use integrity::IntegrityLevel;
pub use object::{
    JsObject, KeysKind, ObjectRef, PropertyDescriptor, PropertyKey, PropertyLookupCache,
};
pub use proxy::{JsProxy, ProxySlots, RevocableProxy};
pub use realm::{RealmId, RealmRecord, RealmRegistry};
pub use string::JsString;
pub use value::{NativeFn, NativeFunctionObject, Symbol, Value, same_value};
