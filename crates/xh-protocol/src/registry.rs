//! Tag-to-handler registries for open-ended frame, command, and sample
//! dispatch.
//!
//! A registry is populated once during setup, while the owner still holds
//! it mutably, and is only ever read after that. Registering a tag twice is
//! a programming error and fails loudly instead of silently shadowing the
//! earlier handler.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::ProtocolError;

/// A mapping from an enumerated tag to a handler.
#[derive(Debug)]
pub struct Registry<K, V> {
    name: &'static str,
    entries: HashMap<K, V>,
}

impl<K, V> Registry<K, V>
where
    K: Eq + Hash + Debug,
{
    /// Create an empty registry. The name only appears in diagnostics.
    pub fn new(name: &'static str) -> Self {
        Registry {
            name,
            entries: HashMap::new(),
        }
    }

    /// Bind a tag to a handler. Fails if the tag is already bound.
    pub fn register(&mut self, tag: K, handler: V) -> Result<(), ProtocolError> {
        if self.entries.contains_key(&tag) {
            return Err(ProtocolError::DuplicateRegistration {
                registry: self.name,
                tag: format!("{tag:?}"),
            });
        }
        self.entries.insert(tag, handler);
        Ok(())
    }

    /// Look up the handler bound to a tag, if any. Never fails.
    pub fn resolve(&self, tag: &K) -> Option<&V> {
        self.entries.get(tag)
    }

    /// Number of registered tags.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
