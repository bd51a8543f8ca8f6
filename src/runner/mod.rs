// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Runners: isolated execution units, one per concurrent worker.
//!
//! A [`RunnerPool`] hands out a single [`Runner`] per [`WorkerId`]. Each
//! [`Runner`] owns its [`ExecutionEngine`] and a private dependency scope,
//! so scenarios running on different workers never share mutable state.
//! The only things shared are the read-only [`Registry`] and
//! [`Configuration`].
//!
//! [`Configuration`]: crate::Configuration
//! [`Registry`]: crate::binding::Registry

mod gate;
mod pool;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use derive_more::with_trait::{Deref, DerefMut, Display};

use crate::{binding::ModuleId, context::DependencyScope, engine::ExecutionEngine};

pub(crate) use self::gate::RunState;
pub use self::{
    gate::RunHookGate,
    pool::{RunnerPool, SharedRunner},
};

/// Identifier of a concurrent worker.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("worker#{_0}")]
pub struct WorkerId(pub usize);

static NEXT_WORKER: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static CURRENT_WORKER: WorkerId =
        WorkerId(NEXT_WORKER.fetch_add(1, Ordering::Relaxed));
}

impl WorkerId {
    /// Returns the [`WorkerId`] of the calling thread.
    ///
    /// Stable for the lifetime of the thread, and unique across threads.
    #[must_use]
    pub fn current() -> Self {
        CURRENT_WORKER.with(|id| *id)
    }
}

/// Isolated execution unit of a single worker.
///
/// Dereferences to its [`ExecutionEngine`].
#[derive(Debug, Deref, DerefMut)]
pub struct Runner {
    /// Worker owning this [`Runner`].
    worker: WorkerId,

    /// Engine of this [`Runner`].
    #[deref]
    #[deref_mut]
    engine: ExecutionEngine,

    /// Private dependency scope, a child of the pool's global one.
    scope: Arc<DependencyScope>,
}

impl Runner {
    pub(crate) fn new(
        worker: WorkerId,
        engine: ExecutionEngine,
        scope: Arc<DependencyScope>,
    ) -> Self {
        Self { worker, engine, scope }
    }

    /// Returns the worker owning this [`Runner`].
    #[must_use]
    pub const fn worker(&self) -> WorkerId {
        self.worker
    }

    /// Returns the private dependency scope of this [`Runner`].
    #[must_use]
    pub const fn scope(&self) -> &Arc<DependencyScope> {
        &self.scope
    }

    /// Returns the [`ExecutionEngine`] of this [`Runner`].
    #[must_use]
    pub const fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    /// Returns the mutable [`ExecutionEngine`] of this [`Runner`].
    pub fn engine_mut(&mut self) -> &mut ExecutionEngine {
        &mut self.engine
    }

    /// Returns identities of the binding modules this [`Runner`] was
    /// initialized with.
    #[must_use]
    pub fn modules(&self) -> &[ModuleId] {
        self.engine.registry().modules()
    }
}
