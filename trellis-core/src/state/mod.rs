//! State Store
//!
//! Four independent scopes of lazily created, optionally persisted signals,
//! keyed by path, plus the process-wide signals (loading, error,
//! notifications, route).

mod globals;
pub mod path;
mod scope;
mod store;

pub use globals::{Globals, Notification, NotificationKind};
pub use scope::{ScopedPath, StateScope, UnknownScope};
pub use store::Store;
