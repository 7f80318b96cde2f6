//! Actions: named state transitions plus side effects.
//!
//! An [`Action`] is data. The [`Dispatcher`] looks actions up by name,
//! resolves their transition values against a [`Context`](crate::Context),
//! applies the resulting patches atomically and then runs the declared
//! [`SideEffect`].

mod api;
mod builtins;
mod dispatcher;
mod events;
mod fetch;
mod model;
mod navigate;
pub mod patch;

pub use api::{encode_component, ApiClient, ApiResult, Method};
pub use builtins::Builtin;
pub use dispatcher::{DispatchConfig, DispatchObserver, DispatchRecord, Dispatcher, EffectHandler};
pub use events::{HostEvent, HostEvents};
pub use fetch::{entity_name, Operation};
pub use model::{
    Action, CustomEffect, FetchEffect, LogEffect, LogLevel, NavigateEffect, Patch, PatchOp,
    SideEffect, StateTransition, ToastEffect,
};
pub use navigate::{substitute, History, HistoryEntry};
