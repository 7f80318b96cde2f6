//! Memo Implementation
//!
//! A Memo is a derived value kept current by an internal effect.
//!
//! # How Memos Work
//!
//! 1. On creation, the internal effect computes the value (tracking whatever
//!    it reads) and stores it in an internal signal.
//!
//! 2. When a dependency changes, the internal effect recomputes and writes
//!    the result into the internal signal.
//!
//! 3. The internal signal compares the result with the previous value. Only
//!    a real change notifies the memo's own dependents.
//!
//! Because the value lives in a signal, memos are themselves observable and
//! can be chained: a memo over a memo only recomputes when the inner memo's
//! output actually changed. Inside a batch the internal effect is queued
//! like any other subscriber, so a memo over several signals written in one
//! batch recomputes once.

use std::fmt::{self, Debug};
use std::sync::{Arc, OnceLock};

use super::effect::Effect;
use super::runtime::Runtime;
use super::signal::{ReadSignal, Signal};
use super::subscriber::SourceId;

/// A derived, observable value.
pub struct Memo<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    signal: Signal<T>,
    effect: Effect,
}

impl<T> Memo<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a new memo with the given computation function.
    ///
    /// The computation runs immediately.
    pub fn new<F>(runtime: &Runtime, compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let compute = Arc::new(compute);
        let cell: Arc<OnceLock<Signal<T>>> = Arc::new(OnceLock::new());

        let rerun = {
            let compute = compute.clone();
            let cell = cell.clone();
            move || {
                let value = compute();
                if let Some(signal) = cell.get() {
                    signal.set(value);
                }
                None
            }
        };

        let (effect, initial) = Effect::with_first_run(runtime, rerun, || compute());
        // `None` means the effect was busy, which a fresh effect never is
        let initial = match initial {
            Some(value) => value,
            None => runtime.untrack(|| compute()),
        };

        let signal = Signal::new(runtime, initial);
        let _ = cell.set(signal.clone());

        Self { signal, effect }
    }

    /// Get the current value, tracking the read.
    pub fn get(&self) -> T {
        self.signal.get()
    }

    /// Get the current value without tracking.
    pub fn get_untracked(&self) -> T {
        self.signal.get_untracked()
    }

    /// Borrow the value, tracking the read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.signal.with(f)
    }

    /// The source ID dependents subscribe to.
    pub fn id(&self) -> SourceId {
        self.signal.id()
    }

    /// Read-only signal view of the memo.
    pub fn signal(&self) -> ReadSignal<T> {
        self.signal.read_only()
    }

    /// Number of times the computation has run.
    pub fn compute_count(&self) -> usize {
        self.effect.run_count()
    }

    /// Get the number of dependents.
    pub fn dependent_count(&self) -> usize {
        self.signal.subscriber_count()
    }

    /// Stop recomputing. The last value stays readable.
    pub fn dispose(&self) {
        self.effect.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.effect.is_disposed()
    }
}

impl<T> Clone for Memo<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
            effect: self.effect.clone(),
        }
    }
}

impl<T> Debug for Memo<T>
where
    T: Clone + PartialEq + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("value", &self.get_untracked())
            .field("compute_count", &self.compute_count())
            .field("dependent_count", &self.dependent_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn memo_computes_on_creation() {
        let runtime = Runtime::new();
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let memo = Memo::new(&runtime, move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
            42
        });

        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert_eq!(memo.get(), 42);
        assert_eq!(memo.get(), 42);
        // Reads use the cached value
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn memo_recomputes_when_dependency_changes() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 10);

        let s = signal.clone();
        let doubled = Memo::new(&runtime, move || s.get() * 2);
        assert_eq!(doubled.get(), 20);

        signal.set(5);
        assert_eq!(doubled.get(), 10);
        assert_eq!(doubled.compute_count(), 2);
    }

    #[test]
    fn memo_depends_on_memo() {
        let runtime = Runtime::new();
        let base = Signal::new(&runtime, 5);

        let b = base.clone();
        let doubled = Memo::new(&runtime, move || b.get() * 2);
        let d = doubled.clone();
        let plus_ten = Memo::new(&runtime, move || d.get() + 10);

        assert_eq!(plus_ten.get(), 20);

        base.set(10);
        assert_eq!(doubled.get(), 20);
        assert_eq!(plus_ten.get(), 30);
    }

    #[test]
    fn unchanged_output_does_not_propagate() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 3);

        let s = signal.clone();
        let parity = Memo::new(&runtime, move || s.get() % 2);
        let p = parity.clone();
        let downstream_runs = Arc::new(AtomicI32::new(0));
        let runs = downstream_runs.clone();
        let downstream = Memo::new(&runtime, move || {
            runs.fetch_add(1, Ordering::SeqCst);
            p.get() == 1
        });

        // 3 -> 5 keeps parity odd
        signal.set(5);
        assert_eq!(parity.compute_count(), 2);
        assert_eq!(downstream_runs.load(Ordering::SeqCst), 1);
        assert!(downstream.get());
    }

    #[test]
    fn disposed_memo_keeps_last_value() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 1);

        let s = signal.clone();
        let memo = Memo::new(&runtime, move || s.get() + 1);
        memo.dispose();

        signal.set(10);
        assert_eq!(memo.get(), 2);
        assert!(memo.is_disposed());
    }

    #[test]
    fn memo_clone_shares_state() {
        let runtime = Runtime::new();
        let memo1 = Memo::new(&runtime, || 42);
        let memo2 = memo1.clone();

        assert_eq!(memo1.id(), memo2.id());
        assert_eq!(memo2.get(), 42);
    }
}
