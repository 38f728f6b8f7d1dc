use std::fmt;

use super::entities::{ChannelId, GuildId};

/// What a quick-switcher row opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchKind {
    Dm,
    Channel,
    Voice,
    Thread,
    Guild,
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dm => write!(f, "DM"),
            Self::Channel => write!(f, "Channel"),
            Self::Voice => write!(f, "Voice"),
            Self::Thread => write!(f, "Thread"),
            Self::Guild => write!(f, "Guild"),
        }
    }
}

/// Target of a quick-switcher row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchTarget {
    Channel(ChannelId),
    Guild(GuildId),
}

/// Searchable row, built from a cache snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchItem {
    pub target: SearchTarget,
    pub kind: SearchKind,
    /// Text shown to the user.
    pub label: String,
    /// Text the scorer matches against.
    pub haystack: String,
}

impl SearchItem {
    /// Row for a channel. `display` is what the row shows, `name` the bare
    /// channel name; guild channels match on `"{guild} {name}"`.
    #[must_use]
    pub fn channel(
        id: ChannelId,
        kind: SearchKind,
        display: &str,
        name: &str,
        guild_name: Option<&str>,
    ) -> Self {
        let (label, haystack) = match guild_name {
            Some(guild) => (format!("{display} ({guild})"), format!("{guild} {name}")),
            None => (display.to_string(), name.to_string()),
        };
        Self {
            target: SearchTarget::Channel(id),
            kind,
            label,
            haystack,
        }
    }

    /// Row for a guild.
    #[must_use]
    pub fn guild(id: GuildId, name: &str) -> Self {
        Self {
            target: SearchTarget::Guild(id),
            kind: SearchKind::Guild,
            label: name.to_string(),
            haystack: name.to_string(),
        }
    }
}

/// Ranked row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub item: SearchItem,
    pub score: i64,
}

/// Fuzzy scoring backend. Higher is better; `None` means no match.
pub trait FuzzyScorer: Send + Sync {
    fn score(&self, choice: &str, pattern: &str) -> Option<i64>;
}
