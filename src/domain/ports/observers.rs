//! Interfaces a view implements to receive invalidations.
//!
//! Observers are driven from the UI loop only. They hold IDs, never
//! entities, and re-resolve through the cache when invalidated.

#[cfg(test)]
use mockall::automock;

use crate::domain::connection::ConnectionStatus;
use crate::domain::entities::{EmbedFailureStyle, Status};
use crate::domain::unread::Indicator;

/// Pill and badge of a channel, guild or folder row.
#[cfg_attr(test, automock)]
pub trait UnreadObserver {
    fn set_indicator(&self, indicator: Indicator);
    fn set_mentions(&self, count: u32);
}

/// Channel list of one guild or of the DM pane.
#[cfg_attr(test, automock)]
pub trait ChannelListObserver {
    /// Rebuild the list from the cache.
    fn invalidate(&self);
    /// Re-sort without rebuilding rows.
    fn invalidate_sort(&self);
}

/// Row that can be highlighted by navigation.
#[cfg_attr(test, automock)]
pub trait SelectionObserver {
    fn set_selected(&self, selected: bool);
    /// Drop the highlight without animating.
    fn unselect(&self);
}

/// Avatar status dot.
#[cfg_attr(test, automock)]
pub trait PresenceObserver {
    fn set_status(&self, status: Status);
}

/// Window-level page switcher (loading, login, main).
#[cfg_attr(test, automock)]
pub trait ConnectionObserver {
    fn set_connection(&self, status: ConnectionStatus);
}

/// Shared surface of every media embed kind.
#[cfg_attr(test, automock)]
pub trait EmbedPlayer {
    /// Points the player at a local file.
    fn set_url(&self, path: &str);
    fn play(&self);
    fn pause(&self);
    /// Renders a failed fetch; `tooltip` carries the error text.
    fn on_error(&self, style: EmbedFailureStyle, tooltip: &str);
}
