//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies (unless deferred).
//!
//! 2. When any dependency changes, the runtime re-runs the effect, directly
//!    or at the end of the open batch.
//!
//! 3. Before re-running, the effect invokes its previous cleanup, clears its
//!    old dependencies and tracks new ones during execution. A branch that
//!    stops reading a signal therefore stops reacting to it.
//!
//! # Cleanup
//!
//! The effect function may return a cleanup closure. It is called before the
//! effect re-runs and when the effect is disposed.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::context::ReactiveContext;
use super::runtime::Runtime;
use super::subscriber::{Reactive, SubscriberId};

/// Cleanup returned by an effect run.
pub type Cleanup = Box<dyn FnOnce() + Send>;

type EffectFn = Box<dyn FnMut() -> Option<Cleanup> + Send>;

/// Options for [`Effect::with_options`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EffectOptions {
    /// Skip the immediate first run. The effect is queued instead and first
    /// runs at the next batch flush or `Runtime::flush`.
    pub defer: bool,
}

struct EffectInner {
    subscriber_id: SubscriberId,
    runtime: Runtime,
    run: Mutex<EffectFn>,
    cleanup: Mutex<Option<Cleanup>>,
    disposed: AtomicBool,
    running: AtomicBool,
    run_count: AtomicUsize,
}

/// Resets the running flag even if the effect body panics.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl EffectInner {
    /// Run `body` as one tracked execution of this effect.
    fn tracked<R>(&self, body: impl FnOnce() -> R) -> Option<R> {
        if self.disposed.load(Ordering::SeqCst) {
            return None;
        }
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::trace!(subscriber = ?self.subscriber_id, "skipping re-entrant effect run");
            return None;
        }
        let _running = RunningGuard(&self.running);

        if let Some(cleanup) = self.cleanup.lock().take() {
            cleanup();
        }

        // Clear old dependencies
        self.runtime.clear_dependencies(self.subscriber_id);

        let result = {
            let _ctx = ReactiveContext::enter(&self.runtime, self.subscriber_id);
            body()
        };

        self.run_count.fetch_add(1, Ordering::SeqCst);
        Some(result)
    }

    fn execute(&self) {
        let cleanup = self.tracked(|| {
            let mut run = self.run.lock();
            (&mut **run)()
        });

        if let Some(cleanup) = cleanup.flatten() {
            if self.disposed.load(Ordering::SeqCst) {
                // Disposed from inside its own run
                cleanup();
            } else {
                *self.cleanup.lock() = Some(cleanup);
            }
        }
    }
}

impl Reactive for EffectInner {
    fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }

    fn schedule(&self) {
        self.execute();
    }
}

/// A side-effecting computation that runs when dependencies change.
///
/// # Example
///
/// ```rust,ignore
/// let runtime = Runtime::new();
/// let count = Signal::new(&runtime, 0);
///
/// let c = count.clone();
/// let effect = Effect::new(&runtime, move || {
///     println!("Count is: {}", c.get());
/// });
///
/// count.set(5);  // Prints: "Count is: 5"
/// effect.dispose();
/// ```
#[derive(Clone)]
pub struct Effect {
    inner: Arc<EffectInner>,
}

impl Effect {
    /// Create a new effect with the given function.
    ///
    /// The function runs immediately to establish initial dependencies.
    pub fn new<F>(runtime: &Runtime, mut run: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        Self::with_options(
            runtime,
            move || {
                run();
                None
            },
            EffectOptions::default(),
        )
    }

    /// Create an effect whose function may return a cleanup closure.
    pub fn with_cleanup<F>(runtime: &Runtime, run: F) -> Self
    where
        F: FnMut() -> Option<Cleanup> + Send + 'static,
    {
        Self::with_options(runtime, run, EffectOptions::default())
    }

    /// Create an effect with explicit options.
    pub fn with_options<F>(runtime: &Runtime, run: F, options: EffectOptions) -> Self
    where
        F: FnMut() -> Option<Cleanup> + Send + 'static,
    {
        let effect = Self::build(runtime, Box::new(run));
        runtime.register(effect.inner.clone());

        if options.defer {
            runtime.queue(effect.inner.subscriber_id);
        } else {
            effect.inner.execute();
        }
        effect
    }

    /// Create an effect whose first execution is `first` instead of `run`.
    ///
    /// `first` runs tracked, exactly like a normal run, and its result is
    /// returned with the handle. Later re-runs call `run`. Memos use this to
    /// capture their initial value.
    pub(crate) fn with_first_run<F, R>(
        runtime: &Runtime,
        run: F,
        first: impl FnOnce() -> R,
    ) -> (Self, Option<R>)
    where
        F: FnMut() -> Option<Cleanup> + Send + 'static,
    {
        let effect = Self::build(runtime, Box::new(run));
        runtime.register(effect.inner.clone());
        let result = effect.inner.tracked(first);
        (effect, result)
    }

    fn build(runtime: &Runtime, run: EffectFn) -> Self {
        Self {
            inner: Arc::new(EffectInner {
                subscriber_id: SubscriberId::new(),
                runtime: runtime.clone(),
                run: Mutex::new(run),
                cleanup: Mutex::new(None),
                disposed: AtomicBool::new(false),
                running: AtomicBool::new(false),
                run_count: AtomicUsize::new(0),
            }),
        }
    }

    /// Get the subscriber ID for this effect.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.subscriber_id
    }

    /// Execute the effect function now.
    pub fn execute(&self) {
        self.inner.execute();
    }

    /// Dispose of the effect.
    ///
    /// Runs the pending cleanup, drops all dependencies and unregisters the
    /// effect. After disposal, the effect will not run again.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(cleanup) = self.inner.cleanup.lock().take() {
            cleanup();
        }
        self.inner.runtime.unregister(self.inner.subscriber_id);
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Get the number of sources read by the last run.
    pub fn dependency_count(&self) -> usize {
        self.inner.runtime.dependency_count(self.inner.subscriber_id)
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("subscriber_id", &self.inner.subscriber_id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Signal;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn effect_runs_on_creation() {
        let runtime = Runtime::new();
        let run_count = Arc::new(AtomicI32::new(0));
        let run_count_clone = run_count.clone();

        let _effect = Effect::new(&runtime, move || {
            run_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        // Effect should have run once on creation
        assert_eq!(run_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn deferred_effect_runs_on_flush() {
        let runtime = Runtime::new();
        let run_count = Arc::new(AtomicI32::new(0));
        let run_count_clone = run_count.clone();

        let effect = Effect::with_options(
            &runtime,
            move || {
                run_count_clone.fetch_add(1, Ordering::SeqCst);
                None
            },
            EffectOptions { defer: true },
        );

        // Effect should not have run
        assert_eq!(run_count.load(Ordering::SeqCst), 0);
        assert_eq!(effect.run_count(), 0);

        runtime.flush();
        assert_eq!(run_count.load(Ordering::SeqCst), 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn deferred_effect_inside_batch_runs_when_batch_closes() {
        let runtime = Runtime::new();
        let run_count = Arc::new(AtomicI32::new(0));
        let run_count_clone = run_count.clone();

        runtime.batch(|| {
            let _effect = Effect::with_options(
                &runtime,
                move || {
                    run_count_clone.fetch_add(1, Ordering::SeqCst);
                    None
                },
                EffectOptions { defer: true },
            );
            assert_eq!(run_count.load(Ordering::SeqCst), 0);
        });

        assert_eq!(run_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn effect_reruns_when_dependency_changes() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 1);

        let s = signal.clone();
        let effect = Effect::new(&runtime, move || {
            s.get();
        });
        assert_eq!(effect.dependency_count(), 1);

        signal.set(2);
        signal.set(3);
        assert_eq!(effect.run_count(), 3);
    }

    #[test]
    fn cleanup_runs_before_rerun_and_on_dispose() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 0);
        let cleanups = Arc::new(AtomicI32::new(0));

        let s = signal.clone();
        let c = cleanups.clone();
        let effect = Effect::with_cleanup(&runtime, move || {
            s.get();
            let c = c.clone();
            Some(Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }) as Cleanup)
        });
        assert_eq!(cleanups.load(Ordering::SeqCst), 0);

        signal.set(1);
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);

        effect.dispose();
        assert_eq!(cleanups.load(Ordering::SeqCst), 2);

        // Disposing twice does not run cleanup again
        effect.dispose();
        assert_eq!(cleanups.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn effect_does_not_run_after_disposal() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 0);
        let run_count = Arc::new(AtomicI32::new(0));

        let s = signal.clone();
        let run_count_clone = run_count.clone();
        let effect = Effect::new(&runtime, move || {
            s.get();
            run_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        // Ran once on creation
        assert_eq!(run_count.load(Ordering::SeqCst), 1);

        effect.dispose();
        assert!(effect.is_disposed());
        assert_eq!(signal.subscriber_count(), 0);

        signal.set(5);
        effect.execute();
        assert_eq!(run_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn effect_writing_its_own_dependency_does_not_recurse() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 0);

        let s = signal.clone();
        let effect = Effect::new(&runtime, move || {
            let v = s.get();
            if v < 10 {
                s.set(v + 1);
            }
        });

        // The write inside the run is not re-entered
        assert_eq!(effect.run_count(), 1);
        assert_eq!(signal.get(), 1);
    }

    #[test]
    fn effect_clone_shares_state() {
        let runtime = Runtime::new();
        let effect1 = Effect::new(&runtime, || {});
        let effect2 = effect1.clone();

        assert_eq!(effect1.subscriber_id(), effect2.subscriber_id());

        effect1.execute();
        assert_eq!(effect2.run_count(), 2);

        // Shared disposal state
        effect1.dispose();
        assert!(effect2.is_disposed());
    }
}
