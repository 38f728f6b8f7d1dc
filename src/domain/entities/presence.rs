//! Presence entity.

use serde::{Deserialize, Serialize};

use super::{GuildId, UserId};

/// Online status of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Online,
    Idle,
    #[serde(rename = "dnd")]
    DoNotDisturb,
    Invisible,
    Offline,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Status {
    /// Parses the wire name of a status.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "online" => Self::Online,
            "idle" => Self::Idle,
            "dnd" => Self::DoNotDisturb,
            "invisible" => Self::Invisible,
            "offline" => Self::Offline,
            _ => Self::Unknown,
        }
    }

    /// Returns the wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Idle => "idle",
            Self::DoNotDisturb => "dnd",
            Self::Invisible => "invisible",
            Self::Offline => "offline",
            Self::Unknown => "unknown",
        }
    }

    /// Statuses the local user may pick.
    #[must_use]
    pub const fn is_selectable(self) -> bool {
        matches!(
            self,
            Self::Online | Self::Idle | Self::DoNotDisturb | Self::Invisible
        )
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Status of one user, either inside a guild or globally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    /// User the presence belongs to.
    pub user_id: UserId,
    /// Guild scope; `None` for the global presence.
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    /// Current status.
    #[serde(default)]
    pub status: Status,
}

impl Presence {
    /// Creates a presence record.
    #[must_use]
    pub const fn new(user_id: UserId, guild_id: Option<GuildId>, status: Status) -> Self {
        Self {
            user_id,
            guild_id,
            status,
        }
    }
}
