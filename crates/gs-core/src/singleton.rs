// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Lazily constructed, asynchronously initialized shared instance
//!
//! The first [`SingletonInitializer::get_instance`] call constructs the
//! instance and starts its initialization. Every caller that arrives before
//! initialization finishes awaits the same shared future, so construction
//! and initialization each run exactly once and nobody observes a
//! half-initialized instance.

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::InitError;

/// Two-phase construction: a cheap synchronous constructor followed by this
#[async_trait]
pub trait AsyncInit: Send + Sync + 'static {
    async fn initialize(&self) -> Result<(), InitError>;
}

type InitFuture<T> = Shared<BoxFuture<'static, Result<Arc<T>, InitError>>>;

enum State<T> {
    Uninitialized,
    Initializing {
        instance: Arc<T>,
        ready: InitFuture<T>,
    },
    Ready(Arc<T>),
}

/// Observable phase of a [`SingletonInitializer`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitPhase {
    Uninitialized,
    Initializing,
    Ready,
}

pub struct SingletonInitializer<T> {
    state: Mutex<State<T>>,
    factory: Box<dyn Fn() -> T + Send + Sync>,
}

impl<T: AsyncInit> SingletonInitializer<T> {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            state: Mutex::new(State::Uninitialized),
            factory: Box::new(factory),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the initialized instance, constructing it on first use
    ///
    /// An initialization failure is returned to every waiter and to every
    /// later caller; there is no retry short of [`Self::revoke_for_testing`].
    pub async fn get_instance(&self) -> Result<Arc<T>, InitError> {
        let ready = {
            let mut state = self.lock_state();
            let pending = match &*state {
                State::Ready(instance) => return Ok(instance.clone()),
                State::Initializing { ready, .. } => Some(ready.clone()),
                State::Uninitialized => None,
            };
            match pending {
                Some(ready) => ready,
                None => {
                    let instance = Arc::new((self.factory)());
                    let target = instance.clone();
                    let ready = async move {
                        target.initialize().await?;
                        Ok::<_, InitError>(target)
                    }
                    .boxed()
                    .shared();
                    tracing::debug!("singleton constructed, initialization started");
                    *state = State::Initializing {
                        instance,
                        ready: ready.clone(),
                    };
                    ready
                }
            }
        };

        let result = ready.await;
        match &result {
            Ok(instance) => {
                let mut state = self.lock_state();
                // A revoke during initialization leaves the newer state alone
                let promote = matches!(
                    &*state,
                    State::Initializing { instance: pending, .. } if Arc::ptr_eq(pending, instance)
                );
                if promote {
                    *state = State::Ready(instance.clone());
                }
            }
            Err(err) => tracing::warn!(error = %err, "singleton initialization failed"),
        }
        result
    }

    /// The constructed instance, even if initialization has not finished
    pub fn get_instance_for_debug(&self) -> Option<Arc<T>> {
        match &*self.lock_state() {
            State::Uninitialized => None,
            State::Initializing { instance, .. } | State::Ready(instance) => Some(instance.clone()),
        }
    }

    pub fn phase(&self) -> InitPhase {
        match &*self.lock_state() {
            State::Uninitialized => InitPhase::Uninitialized,
            State::Initializing { .. } => InitPhase::Initializing,
            State::Ready(_) => InitPhase::Ready,
        }
    }

    /// Drop the instance and any pending initialization. Test isolation only.
    pub fn revoke_for_testing(&self) {
        *self.lock_state() = State::Uninitialized;
    }
}
