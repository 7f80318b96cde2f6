//! Trellis Core
//!
//! This crate provides the client runtime for Trellis generated applications.
//! It implements:
//!
//! - Reactive primitives (signals, memos, effects, resources) with batching
//! - Four scoped state stores with optional persistence
//! - Declarative bindings and a restricted expression language
//! - A view renderer for compiler-produced trees
//! - An action dispatcher for state transitions and side effects
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Signals, effects, memos and the runtime that tracks them
//! - `graph`: Dependency edges and the batch scheduler
//! - `state`: The `local`/`workspace`/`app`/`session` store and global signals
//! - `binding`: Binding descriptors and derived expressions
//! - `view`: View trees, the component registry and the renderer
//! - `action`: Action descriptors, patches, effects and the dispatcher
//! - `devtools`: Bounded network and action logs
//! - `client`: `ClientRuntime`, which wires all of the above together
//!
//! # Example
//!
//! ```rust
//! use trellis_core::reactive::{Effect, Memo, Runtime, Signal};
//!
//! let rt = Runtime::new();
//! let count = Signal::new(&rt, 0);
//!
//! let c = count.clone();
//! let doubled = Memo::new(&rt, move || c.get() * 2);
//!
//! let d = doubled.clone();
//! let _effect = Effect::new(&rt, move || {
//!     println!("doubled: {}", d.get());
//! });
//!
//! count.set(5);
//! assert_eq!(doubled.get(), 10);
//! ```

pub mod action;
pub mod binding;
pub mod client;
pub mod config;
pub mod context;
pub mod devtools;
pub mod error;
pub mod graph;
pub mod reactive;
pub mod state;
pub mod storage;
pub mod view;

pub use action::{Action, ApiClient, Dispatcher, Patch, SideEffect};
pub use binding::Binding;
pub use client::{ClientBuilder, ClientRuntime};
pub use config::RuntimeConfig;
pub use context::Context;
pub use reactive::{Effect, Memo, Runtime, Signal};
pub use state::{StateScope, Store};
pub use view::{Node, Renderer, ViewNode};
