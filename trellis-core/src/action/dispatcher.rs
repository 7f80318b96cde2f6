//! The action dispatcher.
//!
//! # How Dispatch Works
//!
//! Every dispatched action goes through three phases:
//!
//! 1. **Transitions.** Every transition's patch value is resolved first. If
//!    any resolution fails the action is aborted before anything is written,
//!    so a failed action never leaves partial state behind. The patches are
//!    then applied inside one batch, so dependents run once.
//!
//! 2. **Effect.** At most one declared side effect runs: fetch, navigate,
//!    log, toast or custom.
//!
//! 3. **Completion.** The effect's result is returned: the decoded response
//!    for a fetch, `None` for everything else.
//!
//! Lookup goes through the context's own action lookup, then the registry,
//! then the built-in reducers. Nothing in here returns an error: unknown
//! actions, failed bindings and failed requests are logged and degrade.
//!
//! # Concurrency
//!
//! Separate dispatches are not serialized. Two fetches of the same action
//! can be in flight at once; with [`FetchFencing::None`] both responses are
//! applied in resolution order, with [`FetchFencing::LatestPerAction`] only
//! the most recently started one is.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Map, Value};

use super::api::ApiClient;
use super::builtins::Builtin;
use super::events::{HostEvent, HostEvents};
use super::fetch::{entity_name, Operation};
use super::model::{
    Action, CustomEffect, FetchEffect, LogEffect, LogLevel, NavigateEffect, Patch, PatchOp,
    SideEffect, ToastEffect,
};
use super::navigate::{self, History, HistoryEntry};
use super::patch;
use crate::binding::expr::{self, to_display_string, truthy, Expr};
use crate::binding::{resolve_binding, try_resolve_binding, Binding};
use crate::config::FetchFencing;
use crate::context::Context;
use crate::error::{ApiError, BindingError};
use crate::state::{Globals, NotificationKind, StateScope, Store};

/// Handler for `custom` effects.
pub trait EffectHandler: Send + Sync {
    fn handle(&self, args: &Map<String, Value>, ctx: &Context) -> Option<Value>;
}

impl<F> EffectHandler for F
where
    F: Fn(&Map<String, Value>, &Context) -> Option<Value> + Send + Sync,
{
    fn handle(&self, args: &Map<String, Value>, ctx: &Context) -> Option<Value> {
        self(args, ctx)
    }
}

/// Summary of one completed dispatch, handed to the observer.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRecord {
    pub action: String,
    pub payload: Value,
    pub before: Value,
    pub after: Value,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    /// Transitions failed to resolve and nothing was applied.
    pub aborted: bool,
}

/// Receives a record of every dispatch (devtools hook).
pub trait DispatchObserver: Send + Sync {
    fn on_dispatch(&self, record: DispatchRecord);
}

/// Dispatcher settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchConfig {
    pub toast_duration_ms: u64,
    pub fetch_fencing: FetchFencing,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            toast_duration_ms: 4000,
            fetch_fencing: FetchFencing::None,
        }
    }
}

struct DispatcherInner {
    store: Store,
    api: Arc<dyn ApiClient>,
    config: DispatchConfig,
    actions: RwLock<IndexMap<String, Arc<Action>>>,
    handlers: RwLock<HashMap<String, Arc<dyn EffectHandler>>>,
    observer: RwLock<Option<Arc<dyn DispatchObserver>>>,
    events: HostEvents,
    history: History,
    fences: Mutex<HashMap<String, u64>>,
    in_flight: AtomicUsize,
}

/// Registry of named actions plus the machinery to run them.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

/// A transition whose value has been resolved and is ready to apply.
struct ResolvedTransition {
    scope: StateScope,
    path: String,
    op: PatchOp,
    value: Value,
    predicate: Option<Expr>,
}

impl Dispatcher {
    pub fn new(store: Store, api: Arc<dyn ApiClient>) -> Self {
        Self::with_config(store, api, DispatchConfig::default())
    }

    pub fn with_config(store: Store, api: Arc<dyn ApiClient>, config: DispatchConfig) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                store,
                api,
                config,
                actions: RwLock::new(IndexMap::new()),
                handlers: RwLock::new(HashMap::new()),
                observer: RwLock::new(None),
                events: HostEvents::new(),
                history: History::new(),
                fences: Mutex::new(HashMap::new()),
                in_flight: AtomicUsize::new(0),
            }),
        }
    }

    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    pub fn api(&self) -> &Arc<dyn ApiClient> {
        &self.inner.api
    }

    pub fn events(&self) -> &HostEvents {
        &self.inner.events
    }

    pub fn history(&self) -> &History {
        &self.inner.history
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.inner.config
    }

    fn globals(&self) -> &Globals {
        self.inner.store.globals()
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register (or replace) an action under its name.
    pub fn register(&self, action: Action) {
        let name = action.name.clone();
        if self
            .inner
            .actions
            .write()
            .insert(name.clone(), Arc::new(action))
            .is_some()
        {
            tracing::debug!(action = %name, "replaced registered action");
        }
    }

    pub fn register_all(&self, actions: impl IntoIterator<Item = Action>) {
        for action in actions {
            self.register(action);
        }
    }

    /// Register the handler for `custom` effects named `name`.
    pub fn register_handler(&self, name: impl Into<String>, handler: impl EffectHandler + 'static) {
        self.inner
            .handlers
            .write()
            .insert(name.into(), Arc::new(handler));
    }

    pub fn set_observer(&self, observer: Arc<dyn DispatchObserver>) {
        *self.inner.observer.write() = Some(observer);
    }

    pub fn action(&self, name: &str) -> Option<Arc<Action>> {
        self.inner.actions.read().get(name).cloned()
    }

    /// Registered action names, in registration order.
    pub fn action_names(&self) -> Vec<String> {
        self.inner.actions.read().keys().cloned().collect()
    }

    /// Fetch effects currently awaiting a response.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Dispatch an action by name.
    ///
    /// Unknown names log a warning and return `None`.
    pub fn dispatch<'a>(&'a self, name: &'a str, ctx: &'a Context) -> BoxFuture<'a, Option<Value>> {
        Box::pin(async move {
            if let Some(action) = ctx.lookup_action(name).or_else(|| self.action(name)) {
                return self.run(&action, ctx).await;
            }
            if let Some(builtin) = Builtin::from_name(name) {
                let started = self.begin();
                builtin.run(ctx, &self.inner.store);
                self.finish(name, ctx, started, false);
                return None;
            }
            tracing::warn!(action = name, "no such action");
            None
        })
    }

    /// Run an action value directly.
    pub fn run<'a>(&'a self, action: &'a Action, ctx: &'a Context) -> BoxFuture<'a, Option<Value>> {
        Box::pin(async move {
            tracing::debug!(action = %action.name, transitions = action.transitions.len(), "dispatching");
            let started = self.begin();

            let resolved = match self.resolve_transitions(action, ctx) {
                Ok(resolved) => resolved,
                Err(err) => {
                    tracing::warn!(action = %action.name, error = %err, "transition failed to resolve, action aborted");
                    self.finish(&action.name, ctx, started, true);
                    return None;
                }
            };
            self.apply_transitions(resolved, ctx);

            let result = match &action.effect {
                None => None,
                Some(effect) => self.run_effect(&action.name, effect, ctx).await,
            };

            self.finish(&action.name, ctx, started, false);
            result
        })
    }

    fn resolve_transitions(
        &self,
        action: &Action,
        ctx: &Context,
    ) -> Result<Vec<ResolvedTransition>, BindingError> {
        let store = &self.inner.store;
        store.runtime().untrack(|| {
            action
                .transitions
                .iter()
                .map(|transition| -> Result<ResolvedTransition, BindingError> {
                    let Patch {
                        op,
                        value,
                        predicate,
                    } = &transition.update;
                    let value = try_resolve_binding(value, ctx, store)?;
                    let predicate = predicate
                        .as_deref()
                        .map(|source| {
                            Expr::parse(source).map_err(|err| BindingError::Derived {
                                expr: source.to_string(),
                                source: err,
                            })
                        })
                        .transpose()?;
                    Ok(ResolvedTransition {
                        scope: transition.scope,
                        path: transition.target_path.clone(),
                        op: *op,
                        value,
                        predicate,
                    })
                })
                .collect()
        })
    }

    fn apply_transitions(&self, resolved: Vec<ResolvedTransition>, ctx: &Context) {
        if resolved.is_empty() {
            return;
        }
        let store = &self.inner.store;
        store.runtime().batch(|| {
            for transition in resolved {
                let ResolvedTransition {
                    scope,
                    path,
                    op,
                    value,
                    predicate,
                } = transition;

                let matches = |item: &Value, index: usize| -> bool {
                    let Some(expr) = &predicate else {
                        return false;
                    };
                    let item_ctx = ctx
                        .with_prop("item", item.clone())
                        .with_prop("index", Value::from(index));
                    truthy(&store.runtime().untrack(|| expr::evaluate_expr(expr, &item_ctx, store)))
                };
                let predicate_fn: Option<patch::Predicate<'_>> =
                    predicate.as_ref().map(|_| &matches as patch::Predicate<'_>);

                store.update(scope, &path, |current| patch::apply(op, current, value, predicate_fn));
                tracing::trace!(%scope, path = %path, ?op, "applied patch");
            }
        });
    }

    fn run_effect<'a>(
        &'a self,
        action_name: &'a str,
        effect: &'a SideEffect,
        ctx: &'a Context,
    ) -> BoxFuture<'a, Option<Value>> {
        Box::pin(async move {
            match effect {
                SideEffect::Fetch(fetch) => self.run_fetch(action_name, fetch, ctx).await,
                SideEffect::Navigate(navigate) => {
                    self.run_navigate(navigate, ctx);
                    None
                }
                SideEffect::Log(log) => {
                    self.run_log(action_name, log, ctx);
                    None
                }
                SideEffect::Toast(toast) => {
                    self.run_toast(toast, ctx);
                    None
                }
                SideEffect::Custom(custom) => self.run_custom(custom, ctx),
            }
        })
    }

    // ------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------

    fn resolve_map(&self, bindings: &IndexMap<String, Binding>, ctx: &Context) -> Map<String, Value> {
        let store = &self.inner.store;
        store.runtime().untrack(|| {
            bindings
                .iter()
                .map(|(name, binding)| (name.clone(), resolve_binding(binding, ctx, store)))
                .collect()
        })
    }

    fn resolve_value(&self, binding: &Binding, ctx: &Context) -> Value {
        let store = &self.inner.store;
        store.runtime().untrack(|| resolve_binding(binding, ctx, store))
    }

    async fn run_fetch(&self, action_name: &str, fetch: &FetchEffect, ctx: &Context) -> Option<Value> {
        let payload = Value::Object(self.resolve_map(&fetch.inputs, ctx));
        let entity = fetch
            .entity
            .clone()
            .unwrap_or_else(|| entity_name(&fetch.service));
        let operation = Operation::resolve(fetch.operation.as_deref(), fetch.method, &payload);
        let token = self.fence(action_name);

        tracing::debug!(action = action_name, %entity, %operation, "fetch started");
        let result = {
            let _loading = LoadingGuard::start(self);
            operation
                .perform(self.inner.api.as_ref(), &entity, payload)
                .await
        };

        if !self.is_latest(action_name, token) {
            tracing::debug!(action = action_name, "superseded fetch response dropped");
            return None;
        }

        match result {
            Ok(data) => {
                tracing::debug!(action = action_name, %entity, "fetch succeeded");
                if let Some(next) = &fetch.on_success {
                    let next_ctx = ctx
                        .with_prop("data", data.clone())
                        .with_prop("result", data.clone());
                    self.dispatch(next, &next_ctx).await;
                }
                Some(data)
            }
            Err(err) => {
                self.fetch_failed(action_name, fetch.on_error.as_deref(), &err, ctx)
                    .await;
                None
            }
        }
    }

    async fn fetch_failed(&self, action_name: &str, on_error: Option<&str>, err: &ApiError, ctx: &Context) {
        let message = err.to_string();
        tracing::warn!(action = action_name, error = %message, "fetch failed");
        self.globals().error().set(Some(message.clone()));

        match on_error {
            Some(handler) => {
                let error = json!({"message": message, "status": err.status()});
                let err_ctx = ctx.with_prop("error", error);
                self.dispatch(handler, &err_ctx).await;
            }
            None => {
                self.globals().notify(
                    NotificationKind::Error,
                    message,
                    self.inner.config.toast_duration_ms,
                );
            }
        }
    }

    /// Start a fetch for `action`, returning its fencing token.
    fn fence(&self, action: &str) -> u64 {
        match self.inner.config.fetch_fencing {
            FetchFencing::None => 0,
            FetchFencing::LatestPerAction => {
                let mut fences = self.inner.fences.lock();
                let token = fences.entry(action.to_string()).or_insert(0);
                *token += 1;
                *token
            }
        }
    }

    fn is_latest(&self, action: &str, token: u64) -> bool {
        match self.inner.config.fetch_fencing {
            FetchFencing::None => true,
            FetchFencing::LatestPerAction => {
                self.inner.fences.lock().get(action).copied() == Some(token)
            }
        }
    }

    fn run_navigate(&self, navigate: &NavigateEffect, ctx: &Context) {
        let params = self.resolve_map(&navigate.params, ctx);
        let url = navigate::substitute(&navigate.to, &params);
        self.go(url, params);
    }

    fn go(&self, url: String, params: Map<String, Value>) {
        tracing::debug!(%url, "navigating");
        self.inner.history.push(HistoryEntry {
            url: url.clone(),
            params: params.clone(),
        });
        self.globals().route().set(url.clone());
        self.inner.events.emit(HostEvent::Navigate { url, params });
    }

    /// Return to the previous history entry, if there is one.
    pub fn back(&self) -> Option<String> {
        let entry = self.inner.history.back()?;
        self.globals().route().set(entry.url.clone());
        self.inner.events.emit(HostEvent::Navigate {
            url: entry.url.clone(),
            params: entry.params,
        });
        Some(entry.url)
    }

    fn run_log(&self, action_name: &str, log: &LogEffect, ctx: &Context) {
        let message = to_display_string(&self.resolve_value(&log.message, ctx));
        let data = log
            .data
            .as_ref()
            .map(|binding| self.resolve_value(binding, ctx))
            .unwrap_or(Value::Null);

        match log.level {
            LogLevel::Trace => tracing::trace!(target: "trellis::action", action = action_name, %data, "{message}"),
            LogLevel::Debug => tracing::debug!(target: "trellis::action", action = action_name, %data, "{message}"),
            LogLevel::Info => tracing::info!(target: "trellis::action", action = action_name, %data, "{message}"),
            LogLevel::Warn => tracing::warn!(target: "trellis::action", action = action_name, %data, "{message}"),
            LogLevel::Error => tracing::error!(target: "trellis::action", action = action_name, %data, "{message}"),
        }
    }

    fn run_toast(&self, toast: &ToastEffect, ctx: &Context) {
        let message = to_display_string(&self.resolve_value(&toast.message, ctx));
        let duration = toast
            .duration_ms
            .unwrap_or(self.inner.config.toast_duration_ms);
        self.globals().notify(toast.kind, message, duration);
    }

    fn run_custom(&self, custom: &CustomEffect, ctx: &Context) -> Option<Value> {
        let handler = self.inner.handlers.read().get(&custom.name).cloned();
        let Some(handler) = handler else {
            tracing::warn!(handler = %custom.name, "no custom effect handler registered");
            return None;
        };
        let args = self.resolve_map(&custom.args, ctx);
        handler.handle(&args, ctx)
    }

    // ------------------------------------------------------------------
    // Delete requests
    // ------------------------------------------------------------------

    /// Ask listening views to delete an entity.
    pub fn request_delete(&self, entity: impl Into<String>, id: Value) -> usize {
        self.inner.events.emit(HostEvent::DeleteRequest {
            entity: entity.into(),
            id,
        })
    }

    /// Service a delete request: remove the entity through the API, drop it
    /// from the workspace list of the same name, then dispatch `refetch`.
    ///
    /// Returns whether the removal succeeded.
    pub async fn handle_delete_request(
        &self,
        entity: &str,
        id: &Value,
        refetch: Option<&str>,
        ctx: &Context,
    ) -> bool {
        let result = {
            let _loading = LoadingGuard::start(self);
            self.inner.api.remove(entity, id).await
        };

        match result {
            Ok(_) => {
                let store = &self.inner.store;
                if store.contains(StateScope::Workspace, entity) {
                    store.update(StateScope::Workspace, entity, |current| {
                        patch::apply(PatchOp::Remove, current, json!({ "id": id }), None)
                    });
                }
                if let Some(action) = refetch {
                    self.dispatch(action, ctx).await;
                }
                true
            }
            Err(err) => {
                self.fetch_failed("delete", None, &err, ctx).await;
                false
            }
        }
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    fn begin(&self) -> Option<(Value, DateTime<Utc>, Instant)> {
        self.inner
            .observer
            .read()
            .as_ref()
            .map(|_| (self.inner.store.snapshot(), Utc::now(), Instant::now()))
    }

    fn finish(
        &self,
        action: &str,
        ctx: &Context,
        started: Option<(Value, DateTime<Utc>, Instant)>,
        aborted: bool,
    ) {
        let Some((before, started_at, instant)) = started else {
            return;
        };
        let observer = self.inner.observer.read().clone();
        if let Some(observer) = observer {
            observer.on_dispatch(DispatchRecord {
                action: action.to_string(),
                payload: ctx.props_value(),
                before,
                after: self.inner.store.snapshot(),
                started_at,
                duration: instant.elapsed(),
                aborted,
            });
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("actions", &self.action_names())
            .field("in_flight", &self.in_flight())
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Holds the global loading flag up while at least one request is in flight.
///
/// Released on drop, so success, failure, panic and cancellation of the
/// surrounding future all clear it.
struct LoadingGuard<'a> {
    dispatcher: &'a Dispatcher,
}

impl<'a> LoadingGuard<'a> {
    fn start(dispatcher: &'a Dispatcher) -> Self {
        dispatcher.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        let globals = dispatcher.globals();
        dispatcher.inner.store.runtime().batch(|| {
            globals.loading().set(true);
            globals.error().set(None);
        });
        Self { dispatcher }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.dispatcher.inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.dispatcher.globals().loading().set(false);
        }
    }
}

// ----- Tests -----
