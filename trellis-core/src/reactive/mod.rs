//! Reactive Primitives
//!
//! This module implements the core reactive system: signals, memos, effects,
//! batches, and async resources. These primitives form the foundation of
//! Trellis' fine-grained reactivity.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! within a tracking context (such as a memo or effect), the signal
//! registers that context as a dependent. When the signal's value changes,
//! all dependents are notified.
//!
//! ## Memos
//!
//! A Memo is a derived value, itself a signal, kept current by an internal
//! effect. Dependents of a memo only re-run when its output changes.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change, such as re-rendering a mounted view tree.
//!
//! ## Batches
//!
//! `Runtime::batch` coalesces the notifications of several writes so each
//! affected computation runs once, after the batch body returns.
//!
//! # Implementation Notes
//!
//! All tracking state lives in an explicit [`Runtime`]. When a signal is
//! read, the runtime checks for a running computation on its tracking stack
//! and, if there is one, records the dependency.

mod context;
mod effect;
mod memo;
mod resource;
mod runtime;
mod signal;
mod subscriber;

pub use context::ReactiveContext;
pub use effect::{Cleanup, Effect, EffectOptions};
pub use memo::Memo;
pub use resource::Resource;
pub use runtime::Runtime;
pub use signal::{Equality, ReadSignal, Signal, SignalOptions, WriteSignal};
pub use subscriber::{Reactive, SourceId, SubscriberId};
