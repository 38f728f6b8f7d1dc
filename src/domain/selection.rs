//! Navigation selection value.

use super::entities::{ChannelId, GuildId};

/// What the main view currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    /// Nothing selected; the view shows a placeholder.
    #[default]
    Placeholder,
    /// The direct-message pane, optionally with a conversation open.
    Dm(Option<ChannelId>),
    /// A guild, optionally with a channel open.
    Guild(GuildId, Option<ChannelId>),
}

impl Selection {
    /// Returns the selected guild.
    #[must_use]
    pub const fn guild(self) -> Option<GuildId> {
        match self {
            Self::Guild(id, _) => Some(id),
            _ => None,
        }
    }

    /// Returns the selected channel.
    #[must_use]
    pub const fn channel(self) -> Option<ChannelId> {
        match self {
            Self::Dm(ch) | Self::Guild(_, ch) => ch,
            Self::Placeholder => None,
        }
    }

    /// Returns true if the selection points at `channel`.
    #[must_use]
    pub fn is_channel(self, channel: ChannelId) -> bool {
        self.channel() == Some(channel)
    }
}

/// Sidebar row a selection observer stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionTarget {
    /// The direct-messages button.
    Dms,
    Guild(GuildId),
    Channel(ChannelId),
}

impl SelectionTarget {
    /// Returns true if `selection` highlights this row.
    #[must_use]
    pub fn is_selected_by(self, selection: Selection) -> bool {
        match (self, selection) {
            (Self::Dms, Selection::Dm(_)) => true,
            (Self::Guild(g), Selection::Guild(sel, _)) => g == sel,
            (Self::Channel(c), sel) => sel.is_channel(c),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(SelectionTarget::Dms, Selection::Dm(None), true; "dm pane")]
    #[test_case(SelectionTarget::Dms, Selection::Placeholder, false; "placeholder")]
    #[test_case(SelectionTarget::Guild(GuildId(1)), Selection::Guild(GuildId(1), None), true; "guild")]
    #[test_case(SelectionTarget::Guild(GuildId(2)), Selection::Guild(GuildId(1), None), false; "other guild")]
    #[test_case(SelectionTarget::Channel(ChannelId(5)), Selection::Guild(GuildId(1), Some(ChannelId(5))), true; "guild channel")]
    #[test_case(SelectionTarget::Channel(ChannelId(5)), Selection::Dm(Some(ChannelId(5))), true; "dm channel")]
    fn test_target_matching(target: SelectionTarget, selection: Selection, expected: bool) {
        assert_eq!(target.is_selected_by(selection), expected);
    }
}
