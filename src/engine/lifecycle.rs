//! Engine Lifecycle Management
//!
//! The engine's global state must be initialized before the first document is
//! opened and torn down after the last one is closed. `EngineLifecycle` keeps
//! a reference count under a mutex; each open document holds an
//! [`EngineLease`] and gives it back when it is dropped.
//!
//! # Design
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     EngineLifecycle                      │
//! │                                                          │
//! │  acquire() → EngineLease ─────────────────► drop()       │
//! │      ↓                                        ↓          │
//! │  [ref_count++]                         [ref_count--]     │
//! │      ↓                                        ↓          │
//! │  0→1: init_library()              1→0: destroy_library() │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The count and the engine calls happen under the same lock, so an init and
//! a teardown can never interleave.

use parking_lot::Mutex;
use std::ops::Deref;
use std::sync::Arc;

use super::Engine;

#[derive(Debug, Default)]
struct Counters {
    ref_count: usize,
    inits: usize,
    teardowns: usize,
}

/// Process-wide reference-counted engine initialization
pub struct EngineLifecycle<E: Engine> {
    engine: E,
    counters: Mutex<Counters>,
}

impl<E: Engine> EngineLifecycle<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            counters: Mutex::new(Counters::default()),
        }
    }

    /// Create a lifecycle ready to be shared between cores
    pub fn shared(engine: E) -> Arc<Self> {
        Arc::new(Self::new(engine))
    }

    /// Take a reference, initializing the engine on the 0→1 transition
    pub fn acquire(self: &Arc<Self>) -> EngineLease<E> {
        let mut counters = self.counters.lock();
        if counters.ref_count == 0 {
            tracing::debug!("Init {} engine", self.engine.name());
            self.engine.init_library();
            counters.inits += 1;
        }
        counters.ref_count += 1;

        EngineLease {
            lifecycle: Some(Arc::clone(self)),
        }
    }

    fn release(&self) {
        let mut counters = self.counters.lock();
        counters.ref_count = counters.ref_count.saturating_sub(1);
        if counters.ref_count == 0 {
            tracing::debug!("Destroy {} engine", self.engine.name());
            self.engine.destroy_library();
            counters.teardowns += 1;
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Get lifecycle statistics
    pub fn stats(&self) -> LifecycleStats {
        let counters = self.counters.lock();
        LifecycleStats {
            ref_count: counters.ref_count,
            inits: counters.inits,
            teardowns: counters.teardowns,
        }
    }
}

/// RAII guard for one engine reference
///
/// Dropping the last lease tears the engine down.
pub struct EngineLease<E: Engine> {
    lifecycle: Option<Arc<EngineLifecycle<E>>>,
}

impl<E: Engine> Deref for EngineLease<E> {
    type Target = E;

    fn deref(&self) -> &E {
        match &self.lifecycle {
            Some(lifecycle) => &lifecycle.engine,
            None => unreachable!("lease used after release"),
        }
    }
}

impl<E: Engine> Drop for EngineLease<E> {
    fn drop(&mut self) {
        if let Some(lifecycle) = self.lifecycle.take() {
            lifecycle.release();
        }
    }
}

/// Lifecycle statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LifecycleStats {
    /// Documents currently holding a lease
    pub ref_count: usize,
    /// Times the engine was initialized
    pub inits: usize,
    /// Times the engine was torn down
    pub teardowns: usize,
}

impl LifecycleStats {
    /// True while the engine's global state is live
    pub fn is_initialized(&self) -> bool {
        self.ref_count > 0
    }
}
