//! The scoped state store.
//!
//! # Layout
//!
//! Each of the four scopes is an insertion-ordered map from a root key to a
//! `Signal<Value>`. A path such as `form.title` addresses the entry `form`
//! and navigates into its JSON value, so writing a nested field notifies
//! everything that reads any part of `form`.
//!
//! # Entry lifecycle
//!
//! - Reads never create entries. A read of a missing entry tracks the scope's
//!   version signal instead, so the reader re-runs once the entry appears.
//! - `set` on a missing entry creates it with the written value as initial
//!   value.
//! - `register` creates an entry explicitly, optionally persisted. Registering
//!   an existing key is a no-op and keeps the current value.
//! - `session` entries are always persisted, under `session_<key>`. A
//!   session key that has not been created yet in this store reads from, and
//!   writes on top of, whatever storage already holds for it.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::{Map, Value};

use super::globals::Globals;
use super::path::{self, Segments};
use super::scope::StateScope;
use crate::reactive::{Runtime, Signal, SignalOptions};
use crate::storage::{self, MemoryStorage, Storage};

#[derive(Clone)]
struct StateEntry {
    signal: Signal<Value>,
    initial: Value,
    persistent: bool,
}

struct ScopeTable {
    entries: RwLock<IndexMap<String, StateEntry>>,
    /// Bumped whenever an entry is created.
    version: Signal<u64>,
}

impl ScopeTable {
    fn new(runtime: &Runtime) -> Self {
        Self {
            entries: RwLock::new(IndexMap::new()),
            version: Signal::new(runtime, 0),
        }
    }

    fn entry(&self, key: &str) -> Option<StateEntry> {
        self.entries.read().get(key).cloned()
    }
}

struct StoreInner {
    runtime: Runtime,
    storage: Arc<dyn Storage>,
    scopes: [ScopeTable; 4],
    globals: Globals,
}

/// Handle to the four state scopes plus the global signals.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    pub fn new(runtime: &Runtime, storage: Arc<dyn Storage>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                runtime: runtime.clone(),
                storage,
                scopes: [
                    ScopeTable::new(runtime),
                    ScopeTable::new(runtime),
                    ScopeTable::new(runtime),
                    ScopeTable::new(runtime),
                ],
                globals: Globals::new(runtime),
            }),
        }
    }

    /// A store whose persistence lives in memory only.
    pub fn in_memory(runtime: &Runtime) -> Self {
        Self::new(runtime, Arc::new(MemoryStorage::new()))
    }

    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.inner.storage
    }

    pub fn globals(&self) -> &Globals {
        &self.inner.globals
    }

    fn table(&self, scope: StateScope) -> &ScopeTable {
        &self.inner.scopes[scope.index()]
    }

    // ------------------------------------------------------------------
    // Entries
    // ------------------------------------------------------------------

    /// Register an entry explicitly.
    ///
    /// Persisted entries (and every `session` entry) start from the stored
    /// value when one exists. Re-registering returns the existing signal
    /// unchanged.
    pub fn register(
        &self,
        scope: StateScope,
        key: &str,
        initial: Value,
        persist: bool,
    ) -> Signal<Value> {
        self.get_or_create(scope, key, initial, persist, true)
    }

    /// The signal behind an entry, if it exists.
    pub fn signal(&self, scope: StateScope, key: &str) -> Option<Signal<Value>> {
        self.table(scope).entry(key).map(|entry| entry.signal)
    }

    /// Whether the entry (first path segment) exists.
    pub fn contains(&self, scope: StateScope, path: &str) -> bool {
        let segments = path::split(path);
        match segments.first() {
            Some(root) => self.table(scope).entries.read().contains_key(root.as_str()),
            None => false,
        }
    }

    /// Whether an entry is persisted.
    pub fn is_persistent(&self, scope: StateScope, key: &str) -> bool {
        self.table(scope)
            .entry(key)
            .map(|entry| entry.persistent)
            .unwrap_or(false)
    }

    /// Root keys of a scope, in creation order.
    pub fn keys(&self, scope: StateScope) -> Vec<String> {
        self.table(scope).entries.read().keys().cloned().collect()
    }

    fn get_or_create(
        &self,
        scope: StateScope,
        key: &str,
        initial: Value,
        persist: bool,
        restore: bool,
    ) -> Signal<Value> {
        let table = self.table(scope);
        if let Some(entry) = table.entry(key) {
            return entry.signal;
        }

        let persistent = persist || scope.always_persists();
        let signal = {
            let mut entries = table.entries.write();
            if let Some(entry) = entries.get(key) {
                return entry.signal.clone();
            }

            let signal = if persistent {
                self.persisted_signal(scope, key, initial.clone(), restore)
            } else {
                Signal::new(&self.inner.runtime, initial.clone())
            };
            entries.insert(
                key.to_string(),
                StateEntry {
                    signal: signal.clone(),
                    initial,
                    persistent,
                },
            );
            signal
        };

        tracing::trace!(%scope, key, persistent, "created state entry");
        table.version.update(|v| v + 1);
        signal
    }

    fn persisted_signal(
        &self,
        scope: StateScope,
        key: &str,
        initial: Value,
        restore: bool,
    ) -> Signal<Value> {
        let storage_key = scope.storage_key(key);
        let storage = self.inner.storage.clone();
        let value = if restore {
            storage::load_json(storage.as_ref(), &storage_key).unwrap_or(initial)
        } else {
            storage::save_json(storage.as_ref(), &storage_key, &initial);
            initial
        };
        Signal::with_options(
            &self.inner.runtime,
            value,
            SignalOptions::new().persist(storage_key, storage),
        )
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Read a path, tracking the read. Missing paths read as `null`.
    pub fn get(&self, scope: StateScope, path: &str) -> Value {
        self.read(scope, path, true)
    }

    /// Read a path without tracking.
    pub fn get_untracked(&self, scope: StateScope, path: &str) -> Value {
        self.read(scope, path, false)
    }

    fn read(&self, scope: StateScope, path: &str, tracked: bool) -> Value {
        let segments = path::split(path);
        let table = self.table(scope);

        let Some((root, rest)) = segments.split_first() else {
            return self.scope_value(scope, tracked);
        };

        match table.entry(root) {
            Some(entry) if tracked => entry.signal.with(|value| path::lookup(value, rest)),
            Some(entry) => path::lookup(&entry.signal.get_untracked(), rest),
            None => {
                if tracked {
                    table.version.get();
                }
                self.stored(scope, root)
                    .map(|stored| path::lookup(&stored, rest))
                    .unwrap_or(Value::Null)
            }
        }
    }

    /// The persisted value of an entry not yet created in this store, for
    /// scopes that always persist.
    fn stored(&self, scope: StateScope, key: &str) -> Option<Value> {
        if !scope.always_persists() {
            return None;
        }
        storage::load_json(self.inner.storage.as_ref(), &scope.storage_key(key))
    }

    fn scope_value(&self, scope: StateScope, tracked: bool) -> Value {
        let table = self.table(scope);
        if tracked {
            table.version.get();
        }
        let entries: Vec<(String, Signal<Value>)> = table
            .entries
            .read()
            .iter()
            .map(|(key, entry)| (key.clone(), entry.signal.clone()))
            .collect();

        let map: Map<String, Value> = entries
            .into_iter()
            .map(|(key, signal)| {
                let value = if tracked {
                    signal.get()
                } else {
                    signal.get_untracked()
                };
                (key, value)
            })
            .collect();
        Value::Object(map)
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Write a path. A missing entry is created with the written value.
    pub fn set(&self, scope: StateScope, path: &str, value: Value) {
        let segments = path::split(path);
        let Some((root, rest)) = segments.split_first() else {
            tracing::warn!(%scope, "ignoring write to an empty state path");
            return;
        };

        match self.table(scope).entry(root) {
            Some(entry) => {
                if rest.is_empty() {
                    entry.signal.set(value);
                } else {
                    entry.signal.update(|current| {
                        let mut next = current.clone();
                        path::assign(&mut next, rest, value);
                        next
                    });
                }
            }
            None => {
                let initial = match self.stored(scope, root) {
                    Some(mut stored) => {
                        path::assign(&mut stored, rest, value);
                        stored
                    }
                    None => path::build(rest, value),
                };
                self.get_or_create(scope, root, initial, false, false);
            }
        }
    }

    /// Replace the value at a path with a function of its current value.
    pub fn update<F>(&self, scope: StateScope, path: &str, f: F)
    where
        F: FnOnce(&Value) -> Value,
    {
        let current = self.get_untracked(scope, path);
        self.set(scope, path, f(&current));
    }

    /// Restore a path to the entry's initial value.
    ///
    /// Returns `false` if the entry does not exist.
    pub fn reset(&self, scope: StateScope, path: &str) -> bool {
        let segments: Segments = path::split(path);
        let Some((root, rest)) = segments.split_first() else {
            return false;
        };
        let Some(entry) = self.table(scope).entry(root) else {
            return false;
        };
        let initial = path::lookup(&entry.initial, rest);
        self.set(scope, path, initial);
        true
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Untracked snapshot of one scope as a JSON object.
    pub fn scope_snapshot(&self, scope: StateScope) -> Value {
        self.scope_value(scope, false)
    }

    /// Untracked snapshot of every scope: `{local, workspace, app, session}`.
    pub fn snapshot(&self) -> Value {
        let map: Map<String, Value> = StateScope::ALL
            .iter()
            .map(|scope| (scope.as_str().to_string(), self.scope_snapshot(*scope)))
            .collect();
        Value::Object(map)
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Store");
        for scope in StateScope::ALL {
            s.field(scope.as_str(), &self.keys(scope));
        }
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Effect;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn store() -> Store {
        Store::in_memory(&Runtime::new())
    }

    #[test]
    fn set_creates_missing_entry() {
        let store = store();
        assert!(!store.contains(StateScope::Workspace, "count"));

        store.set(StateScope::Workspace, "count", json!(1));
        assert!(store.contains(StateScope::Workspace, "count"));
        assert_eq!(store.get(StateScope::Workspace, "count"), json!(1));
    }

    #[test]
    fn reading_never_creates_entries() {
        let store = store();
        assert_eq!(store.get(StateScope::App, "missing.deep"), Value::Null);
        assert!(store.keys(StateScope::App).is_empty());
    }

    #[test]
    fn scopes_are_independent() {
        let store = store();
        store.set(StateScope::Local, "x", json!("local"));
        store.set(StateScope::App, "x", json!("app"));

        assert_eq!(store.get(StateScope::Local, "x"), json!("local"));
        assert_eq!(store.get(StateScope::App, "x"), json!("app"));
        assert_eq!(store.get(StateScope::Workspace, "x"), Value::Null);
    }

    #[test]
    fn register_is_idempotent() {
        let store = store();
        store.register(StateScope::Workspace, "filter", json!("all"), false);
        store.set(StateScope::Workspace, "filter", json!("done"));

        // Re-registering keeps the current value
        let signal = store.register(StateScope::Workspace, "filter", json!("all"), false);
        assert_eq!(signal.get(), json!("done"));
    }

    #[test]
    fn nested_paths_read_and_write() {
        let store = store();
        store.set(StateScope::Workspace, "form.title", json!("draft"));
        assert_eq!(store.get(StateScope::Workspace, "form"), json!({"title": "draft"}));

        store.set(StateScope::Workspace, "form.done", json!(false));
        assert_eq!(
            store.get(StateScope::Workspace, "form"),
            json!({"title": "draft", "done": false})
        );
        assert_eq!(store.get(StateScope::Workspace, "form.title"), json!("draft"));
    }

    #[test]
    fn reset_restores_initial_value() {
        let store = store();
        store.register(StateScope::App, "page", json!(1), false);
        store.set(StateScope::App, "page", json!(4));

        assert!(store.reset(StateScope::App, "page"));
        assert_eq!(store.get(StateScope::App, "page"), json!(1));
        assert!(!store.reset(StateScope::App, "unknown"));
    }

    #[test]
    fn session_entries_persist() {
        let runtime = Runtime::new();
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let store = Store::new(&runtime, storage.clone());

        store.set(StateScope::Session, "user", json!({"name": "ada"}));
        assert!(store.is_persistent(StateScope::Session, "user"));
        assert_eq!(
            storage.get("session_user").as_deref(),
            Some(r#"{"name":"ada"}"#)
        );

        // A new store over the same storage restores it on registration
        let restored = Store::new(&runtime, storage);
        let signal = restored.register(StateScope::Session, "user", Value::Null, false);
        assert_eq!(signal.get(), json!({"name": "ada"}));
    }

    #[test]
    fn session_writes_after_reload_keep_stored_fields() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let first = Store::new(&Runtime::new(), storage.clone());
        first.set(StateScope::Session, "user", json!({"name": "ada", "role": "admin"}));

        let second = Store::new(&Runtime::new(), storage.clone());
        assert_eq!(second.get(StateScope::Session, "user.role"), json!("admin"));
        assert!(!second.contains(StateScope::Session, "user"));

        second.set(StateScope::Session, "user.name", json!("grace"));
        assert_eq!(
            second.get(StateScope::Session, "user"),
            json!({"name": "grace", "role": "admin"})
        );

        let third = Store::new(&Runtime::new(), storage);
        assert_eq!(
            third.get_untracked(StateScope::Session, "user"),
            json!({"name": "grace", "role": "admin"})
        );
    }

    #[test]
    fn non_session_entries_persist_only_when_flagged() {
        let runtime = Runtime::new();
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let store = Store::new(&runtime, storage.clone());

        store.set(StateScope::Workspace, "draft", json!("x"));
        store.register(StateScope::App, "theme", json!("light"), true);
        store.set(StateScope::App, "theme", json!("dark"));

        assert!(storage.get("workspace_draft").is_none());
        assert_eq!(storage.get("app_theme").as_deref(), Some("\"dark\""));
    }

    #[test]
    fn corrupt_persisted_value_falls_back_to_initial() {
        let runtime = Runtime::new();
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        storage.set("session_cart", "{broken".to_string()).unwrap();

        let store = Store::new(&runtime, storage);
        let signal = store.register(StateScope::Session, "cart", json!([]), false);
        assert_eq!(signal.get(), json!([]));
    }

    #[test]
    fn reader_of_missing_entry_reruns_when_created() {
        let runtime = Runtime::new();
        let store = Store::in_memory(&runtime);
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let s = store.clone();
        let log = seen.clone();
        let _effect = Effect::new(&runtime, move || {
            log.lock().push(s.get(StateScope::Workspace, "count"));
        });

        store.set(StateScope::Workspace, "count", json!(1));
        store.set(StateScope::Workspace, "count", json!(2));
        assert_eq!(*seen.lock(), vec![Value::Null, json!(1), json!(2)]);
    }

    #[test]
    fn unrelated_entries_do_not_notify() {
        let runtime = Runtime::new();
        let store = Store::in_memory(&runtime);
        store.set(StateScope::Workspace, "a", json!(1));
        store.set(StateScope::Workspace, "b", json!(1));

        let runs = Arc::new(AtomicUsize::new(0));
        let s = store.clone();
        let r = runs.clone();
        let _effect = Effect::new(&runtime, move || {
            s.get(StateScope::Workspace, "a");
            r.fetch_add(1, Ordering::SeqCst);
        });

        store.set(StateScope::Workspace, "b", json!(2));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn snapshot_covers_all_scopes() {
        let store = store();
        store.set(StateScope::Workspace, "count", json!(3));
        store.set(StateScope::Session, "token", json!("t"));

        assert_eq!(
            store.snapshot(),
            json!({
                "local": {},
                "workspace": {"count": 3},
                "app": {},
                "session": {"token": "t"}
            })
        );
    }
}
