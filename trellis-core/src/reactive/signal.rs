//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a reactive context (memo/effect), the
//!    signal registers that context as a subscriber.
//!
//! 2. When a signal is written, the new value is compared with the old one
//!    using the signal's equality. Equal writes are dropped silently.
//!
//! 3. On a real change the value is persisted (if configured) and every
//!    subscriber is notified, immediately or at the end of the open batch.
//!
//! # Memory Layout
//!
//! Each signal consists of:
//! - A unique source ID
//! - The value, behind a RwLock
//! - The equality and optional persistence hook
//!
//! Subscriber sets live in the runtime's dependency graph, not in the signal.

use std::fmt::{self, Debug};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::runtime::Runtime;
use super::subscriber::SourceId;
use crate::storage::{self, Storage};

type Comparator<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;
type Persister<T> = Box<dyn Fn(&T) + Send + Sync>;

/// How a signal decides whether a write is a change.
pub enum Equality<T> {
    /// Compare with `PartialEq`.
    PartialEq,
    /// Every write notifies.
    Never,
    /// Custom comparator; `true` means "equal, do not notify".
    Custom(Comparator<T>),
}

impl<T: PartialEq> Equality<T> {
    fn equal(&self, a: &T, b: &T) -> bool {
        match self {
            Equality::PartialEq => a == b,
            Equality::Never => false,
            Equality::Custom(f) => f(a, b),
        }
    }
}

/// Options for [`Signal::with_options`].
pub struct SignalOptions<T> {
    equality: Equality<T>,
    persist: Option<Persister<T>>,
}

impl<T> Default for SignalOptions<T> {
    fn default() -> Self {
        Self {
            equality: Equality::PartialEq,
            persist: None,
        }
    }
}

impl<T> SignalOptions<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Notify on every write, even when the value did not change.
    pub fn always_notify(mut self) -> Self {
        self.equality = Equality::Never;
        self
    }

    /// Use a custom equality.
    pub fn equals<F>(mut self, f: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        self.equality = Equality::Custom(Arc::new(f));
        self
    }
}

impl<T> SignalOptions<T>
where
    T: Clone + PartialEq + Serialize + Send + Sync + 'static,
{
    /// Write every changed value to `storage` under `key`.
    pub fn persist(mut self, key: impl Into<String>, storage: Arc<dyn Storage>) -> Self {
        let key = key.into();
        self.persist = Some(Box::new(move |value: &T| {
            storage::save_json(storage.as_ref(), &key, value);
        }));
        self
    }
}

struct SignalInner<T> {
    id: SourceId,
    runtime: Runtime,
    value: RwLock<T>,
    equality: Equality<T>,
    persist: Option<Persister<T>>,
}

impl<T> Drop for SignalInner<T> {
    fn drop(&mut self) {
        self.runtime.remove_source(self.id);
    }
}

/// A reactive signal holding a value of type T.
///
/// # Example
///
/// ```rust,ignore
/// let runtime = Runtime::new();
/// let count = Signal::new(&runtime, 0);
///
/// // Read the value
/// let value = count.get();
///
/// // Update the value (notifies subscribers)
/// count.set(5);
/// ```
pub struct Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    inner: Arc<SignalInner<T>>,
}

impl<T> Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(runtime: &Runtime, value: T) -> Self {
        Self::with_options(runtime, value, SignalOptions::default())
    }

    /// Create a new signal with explicit equality/persistence options.
    pub fn with_options(runtime: &Runtime, value: T, options: SignalOptions<T>) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                id: SourceId::new(),
                runtime: runtime.clone(),
                value: RwLock::new(value),
                equality: options.equality,
                persist: options.persist,
            }),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    /// The runtime this signal belongs to.
    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    /// Get the current value.
    ///
    /// If called within a reactive context, this also registers the
    /// current computation as a subscriber.
    pub fn get(&self) -> T {
        self.inner.runtime.track(self.inner.id);
        self.inner.value.read().clone()
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Borrow the value for the duration of `f`, tracking the read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.runtime.track(self.inner.id);
        let guard = self.inner.value.read();
        f(&*guard)
    }

    /// Set a new value and notify subscribers if it changed.
    pub fn set(&self, value: T) {
        let changed = {
            let mut guard = self.inner.value.write();
            if self.inner.equality.equal(&*guard, &value) {
                false
            } else {
                *guard = value;
                true
            }
        };

        if !changed {
            return;
        }

        if let Some(persist) = &self.inner.persist {
            let guard = self.inner.value.read();
            persist(&*guard);
        }

        self.inner.runtime.notify(self.inner.id);
    }

    /// Update the value using a function of the current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let new_value = {
            let guard = self.inner.value.read();
            f(&*guard)
        };
        self.set(new_value);
    }

    /// Get the number of computations currently subscribed.
    pub fn subscriber_count(&self) -> usize {
        self.inner.runtime.dependent_count(self.inner.id)
    }

    /// Split into read and write halves.
    pub fn split(self) -> (ReadSignal<T>, WriteSignal<T>) {
        (ReadSignal(self.clone()), WriteSignal(self))
    }

    /// Read-only view of this signal.
    pub fn read_only(&self) -> ReadSignal<T> {
        ReadSignal(self.clone())
    }
}

impl<T> Signal<T>
where
    T: Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Create a signal backed by `storage`.
    ///
    /// A stored value replaces `initial`. A corrupt stored value is
    /// discarded with a warning and `initial` is used instead.
    pub fn persisted(
        runtime: &Runtime,
        key: impl Into<String>,
        initial: T,
        storage: Arc<dyn Storage>,
    ) -> Self {
        let key = key.into();
        let value = storage::load_json(storage.as_ref(), &key).unwrap_or(initial);
        Self::with_options(runtime, value, SignalOptions::new().persist(key, storage))
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + PartialEq + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("value", &self.get_untracked())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Read half of a signal.
pub struct ReadSignal<T: Clone + PartialEq + Send + Sync + 'static>(Signal<T>);

impl<T: Clone + PartialEq + Send + Sync + 'static> ReadSignal<T> {
    pub fn get(&self) -> T {
        self.0.get()
    }

    pub fn get_untracked(&self) -> T {
        self.0.get_untracked()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.0.with(f)
    }

    pub fn id(&self) -> SourceId {
        self.0.id()
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

/// Write half of a signal.
pub struct WriteSignal<T: Clone + PartialEq + Send + Sync + 'static>(Signal<T>);

impl<T: Clone + PartialEq + Send + Sync + 'static> WriteSignal<T> {
    pub fn set(&self, value: T) {
        self.0.set(value)
    }

    pub fn update<F: FnOnce(&T) -> T>(&self, f: F) {
        self.0.update(f)
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Clone for WriteSignal<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
