//! Unread indicator values shared by the engine and its observers.

use serde::{Deserialize, Serialize};

use super::entities::{ChannelId, FolderId, GuildId};

/// Three-valued unread summary. Ordered so that `max` picks the loudest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum Indicator {
    #[default]
    Read,
    Unread,
    Mentioned,
}

/// Indicator plus mention total for one node of the sidebar tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnreadSummary {
    pub indicator: Indicator,
    pub mentions: u32,
}

impl UnreadSummary {
    pub const READ: Self = Self {
        indicator: Indicator::Read,
        mentions: 0,
    };

    /// Folds a child summary into an aggregate.
    #[must_use]
    pub fn combine(self, child: Self) -> Self {
        Self {
            indicator: self.indicator.max(child.indicator),
            mentions: self.mentions.saturating_add(child.mentions),
        }
    }
}

/// Node of the sidebar tree whose unread summary changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnreadTarget {
    Channel(ChannelId),
    Guild(GuildId),
    Folder(FolderId),
}
