//! Session state owned by the UI loop: the domain cache and the engines
//! derived from it.

pub mod cache;
pub mod connection;
pub mod navigation;
pub mod unread;

pub use cache::DomainCache;
pub use connection::{ConnectionMonitor, DEFAULT_RECONNECT_GRACE};
pub use navigation::{Navigator, PendingSelection};
pub use unread::UnreadEngine;
