// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Heterogeneous key/value [`Store`] backing every context.

use std::{any::Any, collections::HashMap};

use derive_more::with_trait::Debug;

/// Mutable key/value store of arbitrary typed values.
///
/// Used by bindings to pass state between step definitions living in
/// different modules.
#[derive(Debug, Default)]
pub struct Store {
    #[debug("{:?}", values.keys().collect::<Vec<_>>())]
    values: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Store {
    /// Creates an empty [`Store`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the `value` under the `key`, replacing any previous one.
    pub fn set<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        _ = self.values.insert(key.into(), Box::new(value));
    }

    /// Stores the `value` keyed by its type name.
    pub fn set_typed<T: Any + Send + Sync>(&mut self, value: T) {
        self.set(std::any::type_name::<T>(), value);
    }

    /// Returns the value stored under the `key`, if it has type `T`.
    #[must_use]
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key)?.downcast_ref()
    }

    /// Returns the value of type `T` stored with [`Store::set_typed()`].
    #[must_use]
    pub fn get_typed<T: Any>(&self) -> Option<&T> {
        self.get(std::any::type_name::<T>())
    }

    /// Returns the mutable value stored under the `key`, if it has type `T`.
    #[must_use]
    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.values.get_mut(key)?.downcast_mut()
    }

    /// Returns the value under the `key`, inserting `T::default()` first if
    /// there is none or it has another type.
    pub fn get_or_default<T>(&mut self, key: &str) -> &mut T
    where
        T: Any + Default + Send + Sync,
    {
        let slot = self
            .values
            .entry(key.to_owned())
            .or_insert_with(|| Box::new(T::default()));
        if !slot.is::<T>() {
            *slot = Box::new(T::default());
        }
        slot.downcast_mut()
            .unwrap_or_else(|| unreachable!("slot holds `T` after the check"))
    }

    /// Removes the value under the `key`, returning it if it has type `T`.
    pub fn remove<T: Any>(&mut self, key: &str) -> Option<T> {
        let boxed = self.values.remove(key)?;
        match boxed.downcast::<T>() {
            Ok(v) => Some(*v),
            Err(other) => {
                _ = self.values.insert(key.to_owned(), other);
                None
            }
        }
    }

    /// Indicates whether any value is stored under the `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns the number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Indicates whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drops all the stored values.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_access_checks_types() {
        let mut store = Store::new();
        store.set("count", 5_u32);

        assert_eq!(store.get::<u32>("count"), Some(&5));
        assert_eq!(store.get::<i64>("count"), None);
        assert_eq!(store.get::<u32>("missing"), None);

        *store.get_mut::<u32>("count").unwrap() += 1;
        assert_eq!(store.get::<u32>("count"), Some(&6));
    }

    #[test]
    fn remove_keeps_mistyped_values() {
        let mut store = Store::new();
        store.set("name", String::from("cuke"));

        assert_eq!(store.remove::<u32>("name"), None);
        assert!(store.contains_key("name"));
        assert_eq!(store.remove::<String>("name").as_deref(), Some("cuke"));
        assert!(store.is_empty());
    }

    #[test]
    fn get_or_default_inserts_once() {
        let mut store = Store::new();
        store.get_or_default::<Vec<u8>>("log").push(1);
        store.get_or_default::<Vec<u8>>("log").push(2);

        assert_eq!(store.get::<Vec<u8>>("log"), Some(&vec![1, 2]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn typed_keys() {
        let mut store = Store::new();
        store.set_typed(3.5_f64);

        assert_eq!(store.get_typed::<f64>(), Some(&3.5));
        store.clear();
        assert_eq!(store.get_typed::<f64>(), None);
    }
}
