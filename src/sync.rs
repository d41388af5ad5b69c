// src/sync.rs
//! Synchronization primitives for the producer/renderer contract.
//!
//! ## Threading Model
//! - **Producer**: any thread supplying new pixel data.
//! - **Renderer**: exactly one long-lived thread that owns the display
//!   surface and reads buffer + geometry to blit.
//!
//! One mutex serializes every buffer/geometry mutation, every tone-map
//! recomputation, and every renderer read; buffer pointer and geometry are
//! treated as one atomic unit and there is no lock-free read path.
//! Acquisition blocks indefinitely: a stalled renderer stalls producers and
//! vice versa, a deliberate simplicity-over-liveness trade.
//!
//! A separate one-shot [`ReadyLatch`] blocks the instantiating thread until
//! the renderer's surface becomes ready. It has no role after startup.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

use log::warn;

use crate::error::{Error, Result};

/// The single lock guarding the shared image state.
///
/// A poisoned lock is recovered rather than propagated: the guarded state is
/// plain data whose invariants never span a panic point, so the previous
/// value is still coherent.
#[derive(Debug, Default)]
pub struct SyncGate<T> {
    inner: Mutex<T>,
}

impl<T> SyncGate<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Blocking acquire with no timeout.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("image lock was poisoned by a panicked holder; recovering");
                poisoned.into_inner()
            }
        }
    }
}

/// One-shot startup latch.
///
/// `signal()` is called once by the renderer when its surface is up;
/// `wait()` blocks the instantiating thread until then. Waiting again after
/// the signal returns immediately.
#[derive(Debug, Default)]
pub struct ReadyLatch {
    state: Mutex<bool>,
    cond: Condvar,
}

impl ReadyLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the surface ready and wakes every waiter.
    pub fn signal(&self) {
        let mut ready = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *ready = true;
        self.cond.notify_all();
    }

    /// Blocks until the latch is signalled.
    ///
    /// `timeout` of `None` waits forever. A timed-out wait returns
    /// [`Error::Resource`]: the surface never came up, so the pane is not
    /// usable.
    pub fn wait(&self, timeout: Option<Duration>) -> Result<()> {
        let mut ready = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match timeout {
            None => {
                while !*ready {
                    ready = match self.cond.wait(ready) {
                        Ok(guard) => guard,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                }
                Ok(())
            }
            Some(limit) => {
                let (guard, result) = self
                    .cond
                    .wait_timeout_while(ready, limit, |ready| !*ready)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                drop(guard);
                if result.timed_out() {
                    warn!("surface ready latch timed out after {:?}", limit);
                    Err(Error::Resource(format!(
                        "surface not ready within {:?}",
                        limit
                    )))
                } else {
                    Ok(())
                }
            }
        }
    }
}
