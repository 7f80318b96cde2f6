//! Async resources.
//!
//! A [`Resource`] wraps an async fetcher and exposes its state as three
//! signals (`data`, `loading`, `error`). Loading is driven by
//! [`Resource::refetch`]; there is no automatic retry.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use super::runtime::Runtime;
use super::signal::{ReadSignal, Signal};

type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, String>> + Send + Sync>;

/// Reactive view of an async value.
pub struct Resource<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    runtime: Runtime,
    data: Signal<Option<T>>,
    loading: Signal<bool>,
    error: Signal<Option<String>>,
    fetcher: Fetcher<T>,
}

impl<T> Resource<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new<F, Fut, E>(runtime: &Runtime, fetcher: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: fmt::Display + 'static,
    {
        let fetcher: Fetcher<T> = Arc::new(move || {
            fetcher()
                .map(|result| result.map_err(|e| e.to_string()))
                .boxed()
        });

        Self {
            runtime: runtime.clone(),
            data: Signal::new(runtime, None),
            loading: Signal::new(runtime, false),
            error: Signal::new(runtime, None),
            fetcher,
        }
    }

    /// Latest successfully fetched value.
    pub fn data(&self) -> ReadSignal<Option<T>> {
        self.data.read_only()
    }

    pub fn loading(&self) -> ReadSignal<bool> {
        self.loading.read_only()
    }

    /// Message of the last failure, cleared when a new fetch starts.
    pub fn error(&self) -> ReadSignal<Option<String>> {
        self.error.read_only()
    }

    /// Run the fetcher once.
    ///
    /// On failure the previous data stays in place.
    pub async fn refetch(&self) {
        self.runtime.batch(|| {
            self.loading.set(true);
            self.error.set(None);
        });

        let result = (self.fetcher)().await;

        self.runtime.batch(|| {
            match result {
                Ok(value) => self.data.set(Some(value)),
                Err(message) => {
                    tracing::debug!(%message, "resource fetch failed");
                    self.error.set(Some(message));
                }
            }
            self.loading.set(false);
        });
    }
}

impl<T> Clone for Resource<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
            data: self.data.clone(),
            loading: self.loading.clone(),
            error: self.error.clone(),
            fetcher: self.fetcher.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Effect;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn refetch_populates_data() {
        let runtime = Runtime::new();
        let resource = Resource::new(&runtime, || async { Ok::<_, String>(vec![1, 2, 3]) });

        assert_eq!(resource.data().get(), None);
        resource.refetch().await;

        assert_eq!(resource.data().get(), Some(vec![1, 2, 3]));
        assert!(!resource.loading().get());
        assert_eq!(resource.error().get(), None);
    }

    #[tokio::test]
    async fn failure_keeps_previous_data() {
        let runtime = Runtime::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let resource = Resource::new(&runtime, move || {
            let n = c.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Ok(7)
                } else {
                    Err("offline")
                }
            }
        });

        resource.refetch().await;
        resource.refetch().await;

        assert_eq!(resource.data().get(), Some(7));
        assert_eq!(resource.error().get().as_deref(), Some("offline"));
        assert!(!resource.loading().get());
    }

    #[tokio::test]
    async fn loading_is_observable() {
        let runtime = Runtime::new();
        let resource = Resource::new(&runtime, || async { Ok::<_, String>(1) });

        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let s = seen.clone();
        let loading = resource.loading();
        let _effect = Effect::new(&runtime, move || s.lock().push(loading.get()));

        resource.refetch().await;
        assert_eq!(*seen.lock(), vec![false, true, false]);
    }
}
