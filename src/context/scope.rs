// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Nested dependency scopes: global, per-runner, per-feature and
//! per-scenario.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use derive_more::with_trait::{Debug, Display};

/// Level of a [`DependencyScope`] in the hierarchy.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ScopeLevel {
    /// Process-wide scope.
    Global,

    /// Scope of a single runner.
    Runner,

    /// Scope of a single feature.
    Feature,

    /// Scope of a single scenario.
    Scenario,
}

/// Scope of shared instances, one per type.
///
/// Lookups walk up to the parent scopes, so an instance registered in a
/// runner scope is visible to every feature and scenario of that runner,
/// but never to another runner.
#[derive(Debug)]
pub struct DependencyScope {
    /// Level of this scope.
    level: ScopeLevel,

    /// Enclosing scope, if any.
    parent: Option<Arc<DependencyScope>>,

    /// Instances owned by this scope.
    #[debug(
        "{} instance(s)",
        instances.lock().unwrap_or_else(PoisonError::into_inner).len(),
    )]
    instances: Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl DependencyScope {
    /// Creates a new process-wide root scope.
    #[must_use]
    pub fn root() -> Arc<Self> {
        Arc::new(Self {
            level: ScopeLevel::Global,
            parent: None,
            instances: Mutex::default(),
        })
    }

    /// Creates a new child scope of the given `level`.
    #[must_use]
    pub fn child(self: &Arc<Self>, level: ScopeLevel) -> Arc<Self> {
        Arc::new(Self {
            level,
            parent: Some(Arc::clone(self)),
            instances: Mutex::default(),
        })
    }

    /// Returns the level of this scope.
    #[must_use]
    pub const fn level(&self) -> ScopeLevel {
        self.level
    }

    /// Returns the enclosing scope, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Arc<Self>> {
        self.parent.as_ref()
    }

    /// Registers the `instance` in this scope, replacing any instance of the
    /// same type owned by it.
    pub fn register<T: Any + Send + Sync>(&self, instance: T) -> Arc<T> {
        let instance = Arc::new(instance);
        let erased: Arc<dyn Any + Send + Sync> = instance.clone();
        _ = self
            .instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<T>(), erased);
        instance
    }

    /// Returns the instance of type `T` from this scope or the closest
    /// enclosing one.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let own = self
            .instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<T>())
            .cloned();
        match own {
            Some(any) => any.downcast().ok(),
            None => self.parent.as_ref()?.get(),
        }
    }

    /// Returns the instance of type `T` visible from this scope, creating it
    /// in this scope if there is none.
    #[must_use]
    pub fn resolve<T: Any + Default + Send + Sync>(&self) -> Arc<T> {
        if let Some(found) = self.parent.as_ref().and_then(|p| p.get()) {
            return found;
        }
        let mut instances =
            self.instances.lock().unwrap_or_else(PoisonError::into_inner);
        let any = instances
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Arc::new(T::default()));
        Arc::clone(any)
            .downcast()
            .unwrap_or_else(|_| unreachable!("`TypeId` keys match their values"))
    }

    /// Returns the number of instances owned by this scope.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Indicates whether this scope owns no instances.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
