//! cordsync - state synchronization and view invalidation core for a
//! desktop Discord client.
//!
//! The crate keeps a cache of the account's guilds, channels and users in
//! sync with decoded gateway events, derives unread indicators and
//! navigation from it, and tells views exactly what to redraw.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Runtime primitives, session wiring and services.
pub mod application;
/// Entities, events, errors and port definitions.
pub mod domain;
/// Adapters for configuration, storage, media and transports.
pub mod infrastructure;
/// Log-backed observers used by the headless binary.
pub mod presentation;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "cordsync";
