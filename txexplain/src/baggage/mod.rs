//! Typed shared state threaded through one pipeline run.
//!
//! Every slot is addressed by a [`Key<T>`], so a stage reading a slot another
//! stage wrote gets back the exact type that was stored:
//!
//! ```rust
//! use txexplain::baggage::{Baggage, Key};
//!
//! const GREETING: Key<String> = Key::new("greeting");
//!
//! let mut baggage = Baggage::new();
//! baggage.insert(&GREETING, "hello".to_string());
//! assert_eq!(baggage.get(&GREETING).map(String::as_str), Some("hello"));
//! ```
//!
//! Values must be serializable so a [`sanitized_snapshot`](Baggage::sanitized_snapshot)
//! can always be produced for diagnostics.

pub mod keys;
mod snapshot;

pub use snapshot::SnapshotPolicy;

use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// A named, typed handle to one baggage slot.
pub struct Key<T> {
    name: &'static str,
    _type: PhantomData<fn() -> T>,
}

impl<T> Key<T> {
    /// Creates a key. Two keys with the same name address the same slot.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _type: PhantomData,
        }
    }

    /// The slot name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Key").field(&self.name).finish()
    }
}

trait Slot: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    fn to_json(&self) -> serde_json::Result<serde_json::Value>;
}

impl<T> Slot for T
where
    T: Serialize + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// Shared state for one pipeline run.
///
/// Created empty per request, filled by stages in dependency order and
/// discarded once the explanation has been extracted.
#[derive(Default)]
pub struct Baggage {
    slots: HashMap<&'static str, Box<dyn Slot>>,
}

impl Baggage {
    /// Creates empty baggage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value, returning the previous value of the same type.
    pub fn insert<T>(&mut self, key: &Key<T>, value: T) -> Option<T>
    where
        T: Serialize + Send + Sync + 'static,
    {
        self.slots
            .insert(key.name, Box::new(value))
            .and_then(|old| old.into_any().downcast::<T>().ok())
            .map(|old| *old)
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with<T>(mut self, key: &Key<T>, value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        self.insert(key, value);
        self
    }

    /// Returns the value in the slot, if present with the key's type.
    #[must_use]
    pub fn get<T: 'static>(&self, key: &Key<T>) -> Option<&T> {
        self.slots.get(key.name)?.as_any().downcast_ref::<T>()
    }

    /// Returns a mutable reference to the value in the slot.
    pub fn get_mut<T: 'static>(&mut self, key: &Key<T>) -> Option<&mut T> {
        self.slots.get_mut(key.name)?.as_any_mut().downcast_mut::<T>()
    }

    /// Returns the slot's value, inserting `T::default()` first if absent.
    ///
    /// A slot holding a different type under the same name is replaced.
    pub fn get_or_insert_default<T>(&mut self, key: &Key<T>) -> &mut T
    where
        T: Default + Serialize + Send + Sync + 'static,
    {
        let slot = self
            .slots
            .entry(key.name)
            .and_modify(|slot| {
                if !slot.as_any().is::<T>() {
                    *slot = Box::new(T::default()) as Box<dyn Slot>;
                }
            })
            .or_insert_with(|| Box::new(T::default()) as Box<dyn Slot>);

        match slot.as_any_mut().downcast_mut::<T>() {
            Some(value) => value,
            None => unreachable!("slot type checked above"),
        }
    }

    /// Removes and returns the slot's value if it has the key's type.
    pub fn take<T: 'static>(&mut self, key: &Key<T>) -> Option<T> {
        if !self.slots.get(key.name)?.as_any().is::<T>() {
            return None;
        }
        self.slots
            .remove(key.name)?
            .into_any()
            .downcast::<T>()
            .ok()
            .map(|value| *value)
    }

    /// Returns true if a value of the key's type is stored.
    #[must_use]
    pub fn contains<T: 'static>(&self, key: &Key<T>) -> bool {
        self.get(key).is_some()
    }

    /// Returns the occupied slot names, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.slots.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of occupied slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if no slot is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Produces a JSON snapshot for diagnostics with large and sensitive
    /// subtrees redacted according to `policy`.
    #[must_use]
    pub fn sanitized_snapshot(&self, policy: &SnapshotPolicy) -> serde_json::Value {
        let mut out = serde_json::Map::new();
        for (name, slot) in &self.slots {
            let value = if policy.is_omitted(name) {
                serde_json::Value::String(snapshot::OMITTED.to_string())
            } else {
                match slot.to_json() {
                    Ok(json) => policy.sanitize(json),
                    Err(e) => serde_json::Value::String(format!("[unserializable: {e}]")),
                }
            };
            out.insert((*name).to_string(), value);
        }
        serde_json::Value::Object(out)
    }
}

impl fmt::Debug for Baggage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Baggage").field("keys", &self.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const COUNT: Key<u32> = Key::new("count");
    const NAMES: Key<Vec<String>> = Key::new("names");
    const COUNT_AS_TEXT: Key<String> = Key::new("count");

    #[test]
    fn test_insert_and_get() {
        let mut baggage = Baggage::new();
        assert!(baggage.insert(&COUNT, 1).is_none());
        assert_eq!(baggage.insert(&COUNT, 2), Some(1));
        assert_eq!(baggage.get(&COUNT), Some(&2));
        assert_eq!(baggage.len(), 1);
    }

    #[test]
    fn test_type_mismatch_reads_none() {
        let baggage = Baggage::new().with(&COUNT, 7);
        assert!(baggage.get(&COUNT_AS_TEXT).is_none());
        assert!(!baggage.contains(&COUNT_AS_TEXT));
    }

    #[test]
    fn test_take_keeps_mismatched_slot() {
        let mut baggage = Baggage::new().with(&COUNT, 7);
        assert!(baggage.take(&COUNT_AS_TEXT).is_none());
        assert_eq!(baggage.take(&COUNT), Some(7));
        assert!(baggage.is_empty());
    }

    #[test]
    fn test_get_mut_and_default() {
        let mut baggage = Baggage::new();
        baggage.get_or_insert_default(&NAMES).push("a".to_string());
        baggage.get_or_insert_default(&NAMES).push("b".to_string());
        if let Some(names) = baggage.get_mut(&NAMES) {
            names.push("c".to_string());
        }
        assert_eq!(baggage.get(&NAMES).unwrap(), &vec!["a", "b", "c"]);
    }

    #[test]
    fn test_keys_sorted() {
        let baggage = Baggage::new()
            .with(&NAMES, Vec::new())
            .with(&COUNT, 0);
        assert_eq!(baggage.keys(), vec!["count", "names"]);
    }
}
