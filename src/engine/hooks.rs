// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Firing of lifecycle hooks.

use std::{panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt as _;

use super::ExecutionEngine;
use crate::{
    binding::HookType,
    outcome::{StepError, StepFailure},
};

impl ExecutionEngine {
    /// Fires every hook of the given [`HookType`] applying to the `tags`, in
    /// priority order.
    ///
    /// The first failing `Before*` hook stops the rest, as it prevents entry
    /// into its scope. `After*` hooks all run, and the first failure is
    /// returned.
    pub(super) async fn fire_hooks(
        &mut self,
        ty: HookType,
        tags: &[String],
    ) -> Result<(), StepError> {
        let registry = Arc::clone(self.resolver.registry());
        let is_run_hook =
            matches!(ty, HookType::BeforeTestRun | HookType::AfterTestRun);
        let hooks = registry.hooks(ty).iter().filter(|h| {
            is_run_hook || h.applies_to(tags.iter().map(String::as_str))
        });

        let mut first_error = None;
        for hook in hooks {
            let fun = hook.fun;
            let contexts = &mut self.contexts;
            let result = AssertUnwindSafe(async move { fun(contexts).await })
                .catch_unwind()
                .await;

            let error = match result {
                Ok(Ok(())) => continue,
                Ok(Err(StepFailure::Pending)) => StepError::Failed(Arc::new(
                    anyhow::anyhow!("hooks cannot be pending"),
                )),
                Ok(Err(StepFailure::Failed(e))) => StepError::Failed(Arc::new(e)),
                Err(panic) => StepError::from_panic(&*panic),
            };
            let error = StepError::Hook { ty, error: Box::new(error) };
            self.tracer.hook_failed(ty, &error);

            if ty.is_before() {
                return Err(error);
            }
            _ = first_error.get_or_insert(error);
        }
        first_error.map_or(Ok(()), Err)
    }
}
