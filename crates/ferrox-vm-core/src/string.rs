//! Interned JavaScript strings
//!
//! Property names are looked up constantly (every trap resolution reads a
//! property off the handler), so strings are interned: equal text shares one
//! allocation and comparisons outside the intern table stay cheap.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::{Arc, OnceLock};

/// An immutable JavaScript string
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsString {
    text: Box<str>,
}

static INTERN_TABLE: OnceLock<Mutex<FxHashMap<Box<str>, Arc<JsString>>>> = OnceLock::new();

impl JsString {
    /// Intern a string, returning the shared instance for its text
    pub fn intern(text: &str) -> Arc<JsString> {
        let table = INTERN_TABLE.get_or_init(|| Mutex::new(FxHashMap::default()));
        let mut table = table.lock();
        if let Some(existing) = table.get(text) {
            return existing.clone();
        }
        let interned = Arc::new(JsString {
            text: Box::from(text),
        });
        table.insert(Box::from(text), interned.clone());
        interned
    }

    /// Get the string contents
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// String length in UTF-8 bytes
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// True if the string is empty
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl std::fmt::Display for JsString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

impl AsRef<str> for JsString {
    fn as_ref(&self) -> &str {
        &self.text
    }
}
