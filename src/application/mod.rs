//! Application layer: the UI-loop runtime, session state, services and
//! use cases.

/// Observer bindings.
mod bindings;
/// Data transfer objects.
pub mod dto;
/// Dispatch loop, scopes and the event bus.
pub mod runtime;
/// Services built on the session state.
pub mod services;
/// The session orchestrator.
pub mod session;
/// Cache and derived state.
pub mod state;
/// Use case implementations.
pub mod use_cases;

pub use dto::{LoginRequest, LoginResponse, TokenSource};
pub use runtime::{EventBus, LoopHandle, Scope, Subscription, TaskHandle, UiLoop};
pub use session::{Session, SessionDeps};
pub use use_cases::{LoginUseCase, ResolveTokenUseCase, ResolvedToken};
