//! Single-threaded runtime primitives: scopes, the event bus and the
//! ordered async loop.

mod bus;
mod main_loop;
mod scope;

pub use bus::{EventBus, Subscription};
pub use main_loop::{LoopHandle, TaskHandle, UiLoop};
pub use scope::{Scope, Teardown, WeakScope};
