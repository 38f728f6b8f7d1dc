//! Domain layer with core entities, events, observer contracts and ports.

/// Connection status definitions.
pub mod connection;
/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Gateway events and derived invalidations.
pub mod events;
/// Port and observer definitions.
pub mod ports;
/// Quick switcher rows.
pub mod search;
/// Navigation selection.
pub mod selection;
/// Serde utilities.
pub mod serde_utils;
/// Unread indicator values.
pub mod unread;

pub use connection::{CloseDisposition, ConnectionStatus};
pub use entities::{AuthToken, Channel, ChannelId, Guild, GuildId, MessageId, User, UserId};
pub use errors::{AuthError, HandlerError};
pub use events::{CoreEvent, Event, EventKinds, GatewayEvent};
pub use selection::{Selection, SelectionTarget};
pub use unread::{Indicator, UnreadSummary, UnreadTarget};
