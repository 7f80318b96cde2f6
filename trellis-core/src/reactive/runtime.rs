//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals, memos, and
//! effects. It owns the tracking stack, the dependency graph, the batch
//! queue, and the registry of live computations.
//!
//! # How It Works
//!
//! 1. When an effect (or a memo's internal effect) runs, it pushes itself on
//!    the tracking stack and clears the edges left by its previous run.
//!
//! 2. When a signal is read, the runtime records an edge from the signal to
//!    whichever computation is on top of the stack.
//!
//! 3. When a signal's value changes, the runtime:
//!    a. Looks up the subscribers of that signal, in registration order
//!    b. Inside a batch, queues them (deduplicated) for the batch flush
//!    c. Outside a batch, re-runs them before `set` returns
//!
//! # Ownership
//!
//! There is no process-wide tracking state. Every primitive is created
//! against a `Runtime` handle, and two runtimes never observe each other.
//! The handle is cheap to clone.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::context::{ReactiveContext, TrackingStack};
use super::effect::Effect;
use super::memo::Memo;
use super::resource::Resource;
use super::signal::{ReadSignal, Signal, WriteSignal};
use super::subscriber::{Reactive, SourceId, SubscriberId};
use crate::graph::{BatchScheduler, DependencyGraph};

struct RuntimeInner {
    tracking: TrackingStack,
    graph: Mutex<DependencyGraph>,
    scheduler: Mutex<BatchScheduler>,
    registry: RwLock<HashMap<SubscriberId, Arc<dyn Reactive>>>,
}

/// Handle to a reactive runtime.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Runtime {
    /// Create a new, empty runtime.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                tracking: TrackingStack::new(),
                graph: Mutex::new(DependencyGraph::new()),
                scheduler: Mutex::new(BatchScheduler::new()),
                registry: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub(crate) fn tracking(&self) -> &TrackingStack {
        &self.inner.tracking
    }

    // ------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------

    /// Register a computation so the runtime can re-run it.
    pub fn register(&self, reactive: Arc<dyn Reactive>) {
        let id = reactive.subscriber_id();
        self.inner.registry.write().insert(id, reactive);
    }

    /// Unregister a computation and drop its edges.
    pub fn unregister(&self, id: SubscriberId) {
        self.inner.registry.write().remove(&id);
        self.inner.graph.lock().clear_dependencies(id);
    }

    /// Number of live computations.
    pub fn subscriber_count(&self) -> usize {
        self.inner.registry.read().len()
    }

    // ------------------------------------------------------------------
    // Dependency tracking
    // ------------------------------------------------------------------

    /// Record a read of `source` by the current computation, if any.
    pub fn track(&self, source: SourceId) {
        if let Some(subscriber) = self.inner.tracking.current() {
            self.inner.graph.lock().add_edge(source, subscriber);
        }
    }

    /// Remove all edges for a subscriber.
    ///
    /// Called before re-running a computation to clear stale dependencies.
    pub fn clear_dependencies(&self, subscriber: SubscriberId) {
        self.inner.graph.lock().clear_dependencies(subscriber);
    }

    pub(crate) fn remove_source(&self, source: SourceId) {
        self.inner.graph.lock().remove_source(source);
    }

    /// Run `f` without registering any dependencies.
    pub fn untrack<R>(&self, f: impl FnOnce() -> R) -> R {
        let _ctx = ReactiveContext::untracked(self);
        f()
    }

    /// Number of sources a subscriber currently depends on.
    pub fn dependency_count(&self, subscriber: SubscriberId) -> usize {
        self.inner.graph.lock().dependency_count(subscriber)
    }

    /// Number of subscribers currently reading a source.
    pub fn dependent_count(&self, source: SourceId) -> usize {
        self.inner.graph.lock().dependent_count(source)
    }

    // ------------------------------------------------------------------
    // Notification and batching
    // ------------------------------------------------------------------

    /// Notify all subscribers that `source` changed.
    ///
    /// This is the core update propagation mechanism.
    pub fn notify(&self, source: SourceId) {
        let subscribers = self.inner.graph.lock().dependents(source);
        if subscribers.is_empty() {
            return;
        }

        {
            let mut scheduler = self.inner.scheduler.lock();
            if scheduler.is_batching() {
                tracing::trace!(
                    source = source.raw(),
                    count = subscribers.len(),
                    "queueing subscribers for batch flush"
                );
                scheduler.enqueue(subscribers);
                return;
            }
        }

        tracing::trace!(
            source = source.raw(),
            count = subscribers.len(),
            "notifying subscribers"
        );
        self.run_subscribers(subscribers);
    }

    /// Run `f` as one batch.
    ///
    /// Notifications raised inside `f` are queued. When the outermost batch
    /// returns, every queued subscriber runs exactly once, in
    /// first-registration order.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        self.inner.scheduler.lock().enter();
        let guard = BatchGuard { runtime: self };
        let result = f();
        drop(guard);
        result
    }

    /// Whether a batch is currently open.
    pub fn is_batching(&self) -> bool {
        self.inner.scheduler.lock().is_batching()
    }

    /// Queue a subscriber for the next flush.
    pub fn queue(&self, subscriber: SubscriberId) {
        self.inner.scheduler.lock().enqueue([subscriber]);
    }

    /// Run queued subscribers now, unless a batch is open.
    pub fn flush(&self) {
        let pending = {
            let mut scheduler = self.inner.scheduler.lock();
            if scheduler.is_batching() {
                return;
            }
            scheduler.drain()
        };
        self.run_subscribers(pending);
    }

    fn run_subscribers(&self, subscribers: Vec<SubscriberId>) {
        for id in subscribers {
            // Look up each one individually: an earlier subscriber may have
            // disposed a later one.
            let reactive = self.inner.registry.read().get(&id).cloned();
            if let Some(reactive) = reactive {
                reactive.schedule();
            }
        }
    }

    // ------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------

    /// Create a signal and split it into read and write halves.
    pub fn create_signal<T>(&self, initial: T) -> (ReadSignal<T>, WriteSignal<T>)
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        Signal::new(self, initial).split()
    }

    /// Create an effect that runs now and whenever its dependencies change.
    pub fn create_effect<F>(&self, run: F) -> Effect
    where
        F: FnMut() + Send + 'static,
    {
        Effect::new(self, run)
    }

    /// Create a memo.
    pub fn create_memo<T, F>(&self, compute: F) -> Memo<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Memo::new(self, compute)
    }

    /// Create a resource driven by an async fetcher.
    pub fn create_resource<T, F, Fut, E>(&self, fetcher: F) -> Resource<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: fmt::Display + 'static,
    {
        Resource::new(self, fetcher)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("subscribers", &self.subscriber_count())
            .field("tracking_depth", &self.inner.tracking.depth())
            .field("batching", &self.is_batching())
            .finish()
    }
}

/// Closes the batch when dropped, flushing if it was the outermost one.
struct BatchGuard<'a> {
    runtime: &'a Runtime,
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        let pending = self.runtime.inner.scheduler.lock().exit();
        if std::thread::panicking() {
            return;
        }
        self.runtime.run_subscribers(pending);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockReactive {
        id: SubscriberId,
        scheduled: AtomicUsize,
    }

    impl MockReactive {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                id: SubscriberId::new(),
                scheduled: AtomicUsize::new(0),
            })
        }
    }

    impl Reactive for MockReactive {
        fn subscriber_id(&self) -> SubscriberId {
            self.id
        }

        fn schedule(&self) {
            self.scheduled.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn runtime_registers_and_unregisters() {
        let runtime = Runtime::new();
        let reactive = MockReactive::new();
        let id = reactive.id;

        runtime.register(reactive);
        assert_eq!(runtime.subscriber_count(), 1);

        runtime.unregister(id);
        assert_eq!(runtime.subscriber_count(), 0);
    }

    #[test]
    fn runtime_notifies_subscribers() {
        let runtime = Runtime::new();
        let reactive = MockReactive::new();
        runtime.register(reactive.clone());

        let source = SourceId::new();
        {
            let _ctx = ReactiveContext::enter(&runtime, reactive.id);
            runtime.track(source);
        }

        runtime.notify(source);
        assert_eq!(reactive.scheduled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reads_outside_a_computation_are_not_tracked() {
        let runtime = Runtime::new();
        let source = SourceId::new();

        runtime.track(source);
        assert_eq!(runtime.dependent_count(source), 0);
    }

    #[test]
    fn batch_defers_and_deduplicates() {
        let runtime = Runtime::new();
        let reactive = MockReactive::new();
        runtime.register(reactive.clone());

        let a = SourceId::new();
        let b = SourceId::new();
        {
            let _ctx = ReactiveContext::enter(&runtime, reactive.id);
            runtime.track(a);
            runtime.track(b);
        }

        runtime.batch(|| {
            runtime.notify(a);
            runtime.notify(b);
            runtime.notify(a);
            // Nothing runs until the batch closes
            assert_eq!(reactive.scheduled.load(Ordering::SeqCst), 0);
        });

        assert_eq!(reactive.scheduled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn runtime_clears_dependencies() {
        let runtime = Runtime::new();
        let reactive = MockReactive::new();
        runtime.register(reactive.clone());

        let source = SourceId::new();
        {
            let _ctx = ReactiveContext::enter(&runtime, reactive.id);
            runtime.track(source);
        }
        assert_eq!(runtime.dependency_count(reactive.id), 1);

        runtime.clear_dependencies(reactive.id);
        assert_eq!(runtime.dependency_count(reactive.id), 0);

        runtime.notify(source);
        assert_eq!(reactive.scheduled.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn flush_runs_queued_subscribers() {
        let runtime = Runtime::new();
        let reactive = MockReactive::new();
        runtime.register(reactive.clone());

        runtime.queue(reactive.id);
        assert_eq!(reactive.scheduled.load(Ordering::SeqCst), 0);

        runtime.flush();
        assert_eq!(reactive.scheduled.load(Ordering::SeqCst), 1);
    }
}
