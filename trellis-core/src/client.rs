//! The assembled client runtime.
//!
//! [`ClientRuntime`] wires one reactive [`Runtime`], the [`Store`], the
//! component registry, the [`Renderer`] and the [`Dispatcher`] together from a
//! [`RuntimeConfig`]. Everything it hands out is a cheap clone sharing the
//! same state.

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::action::{Action, ApiClient, ApiResult, DispatchConfig, Dispatcher, Method};
use crate::config::RuntimeConfig;
use crate::context::Context;
use crate::devtools::{Devtools, RecordingApiClient};
use crate::error::StorageError;
use crate::reactive::{Memo, Runtime};
use crate::state::Store;
use crate::storage::{FileStorage, MemoryStorage, Storage};
use crate::view::{Component, ComponentRegistry, Node, Renderer, ViewNode};

/// Prepends the configured API base to every request path.
struct Prefixed {
    base: String,
    inner: Arc<dyn ApiClient>,
}

impl ApiClient for Prefixed {
    fn request(&self, method: Method, path: String, body: Option<Value>) -> BoxFuture<'_, ApiResult> {
        let path = format!("{}{}", self.base, path);
        self.inner.request(method, path, body)
    }
}

pub struct ClientBuilder {
    config: RuntimeConfig,
    api: Arc<dyn ApiClient>,
    storage: Option<Arc<dyn Storage>>,
    registry: Option<Arc<ComponentRegistry>>,
}

impl ClientBuilder {
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Use this storage instead of the one `storage_dir` selects.
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn registry(mut self, registry: Arc<ComponentRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> Result<ClientRuntime, StorageError> {
        let ClientBuilder {
            config,
            api,
            storage,
            registry,
        } = self;

        let storage: Arc<dyn Storage> = match (storage, &config.storage_dir) {
            (Some(storage), _) => storage,
            (None, Some(dir)) => Arc::new(FileStorage::open(dir)?),
            (None, None) => Arc::new(MemoryStorage::new()),
        };
        Ok(ClientRuntime::assemble(config, api, storage, registry))
    }
}

impl ClientRuntime {
    fn assemble(
        config: RuntimeConfig,
        api: Arc<dyn ApiClient>,
        storage: Arc<dyn Storage>,
        registry: Option<Arc<ComponentRegistry>>,
    ) -> Self {
        let runtime = Runtime::new();
        let store = Store::new(&runtime, storage);
        let registry = registry.unwrap_or_default();
        let renderer = Renderer::new(store.clone(), registry.clone());

        let mut api: Arc<dyn ApiClient> = api;
        if !config.api_base.is_empty() {
            api = Arc::new(Prefixed {
                base: config.api_base.trim_end_matches('/').to_string(),
                inner: api,
            });
        }

        let devtools = config
            .devtools
            .enabled
            .then(|| Devtools::new(&config.devtools));
        if let Some(devtools) = &devtools {
            api = Arc::new(RecordingApiClient::new(api, devtools.network().clone()));
        }

        let dispatcher = Dispatcher::with_config(
            store.clone(),
            api,
            DispatchConfig {
                toast_duration_ms: config.toast_duration_ms,
                fetch_fencing: config.fetch_fencing,
            },
        );
        if let Some(devtools) = &devtools {
            dispatcher.set_observer(devtools.actions().clone());
        }

        tracing::debug!(
            api_base = %config.api_base,
            persistent = config.storage_dir.is_some(),
            devtools = devtools.is_some(),
            "client runtime ready"
        );

        ClientRuntime {
            config,
            runtime,
            store,
            registry,
            renderer,
            dispatcher,
            devtools,
        }
    }
}

#[derive(Clone)]
pub struct ClientRuntime {
    config: RuntimeConfig,
    runtime: Runtime,
    store: Store,
    registry: Arc<ComponentRegistry>,
    renderer: Renderer,
    dispatcher: Dispatcher,
    devtools: Option<Devtools>,
}

impl ClientRuntime {
    pub fn builder(api: Arc<dyn ApiClient>) -> ClientBuilder {
        ClientBuilder {
            config: RuntimeConfig::default(),
            api,
            storage: None,
            registry: None,
        }
    }

    /// Default configuration, in-memory storage.
    pub fn new(api: Arc<dyn ApiClient>) -> Self {
        Self::assemble(
            RuntimeConfig::default(),
            api,
            Arc::new(MemoryStorage::new()),
            None,
        )
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Present when `devtools.enabled` is set.
    pub fn devtools(&self) -> Option<&Devtools> {
        self.devtools.as_ref()
    }

    pub fn register_component(&self, name: impl Into<String>, component: impl Component + 'static) {
        self.registry.register(name, component);
    }

    pub fn register_action(&self, action: Action) {
        self.dispatcher.register(action);
    }

    /// Register every action of a JSON array of action descriptors.
    pub fn load_actions(&self, json: &str) -> Result<usize, serde_json::Error> {
        let actions: Vec<Action> = serde_json::from_str(json)?;
        let count = actions.len();
        self.dispatcher.register_all(actions);
        Ok(count)
    }

    pub fn render(&self, node: &ViewNode, ctx: &Context) -> Node {
        self.renderer.render(node, ctx)
    }

    pub fn mount(&self, node: ViewNode, ctx: Context) -> Memo<Node> {
        self.renderer.mount(node, ctx)
    }

    pub fn dispatch<'a>(&'a self, name: &'a str, ctx: &'a Context) -> BoxFuture<'a, Option<Value>> {
        self.dispatcher.dispatch(name, ctx)
    }
}

impl fmt::Debug for ClientRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRuntime")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}
