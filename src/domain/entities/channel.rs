//! Channel entity.

use serde::{Deserialize, Serialize};

use super::{ChannelId, GuildId, MessageId, User};

/// Channel type as numbered on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
#[repr(u8)]
pub enum ChannelKind {
    /// Text channel.
    #[default]
    Text = 0,
    /// Direct message channel.
    Dm = 1,
    /// Voice channel.
    Voice = 2,
    /// Group direct message channel.
    GroupDm = 3,
    /// Category channel.
    Category = 4,
    /// Announcement channel.
    Announcement = 5,
    /// Announcement thread channel.
    AnnouncementThread = 10,
    /// Public thread channel.
    PublicThread = 11,
    /// Private thread channel.
    PrivateThread = 12,
    /// Stage voice channel.
    StageVoice = 13,
    /// Directory channel.
    Directory = 14,
    /// Forum channel.
    Forum = 15,
    /// Media channel.
    Media = 16,
}

impl ChannelKind {
    /// Kinds that contribute to guild and folder unread rollups.
    pub const UNREAD_ROLLUP: [Self; 5] = [
        Self::Text,
        Self::Announcement,
        Self::AnnouncementThread,
        Self::PublicThread,
        Self::PrivateThread,
    ];

    /// Returns true if this channel type supports text messages.
    #[must_use]
    pub fn is_text_based(self) -> bool {
        matches!(
            self,
            Self::Text
                | Self::Dm
                | Self::GroupDm
                | Self::Announcement
                | Self::AnnouncementThread
                | Self::PublicThread
                | Self::PrivateThread
        )
    }

    /// Returns true for the three thread kinds.
    #[must_use]
    pub fn is_thread(self) -> bool {
        matches!(
            self,
            Self::AnnouncementThread | Self::PublicThread | Self::PrivateThread
        )
    }

    /// Returns true for private conversations.
    #[must_use]
    pub fn is_private(self) -> bool {
        matches!(self, Self::Dm | Self::GroupDm)
    }

    /// Returns true if this is a voice channel.
    #[must_use]
    pub fn is_voice(self) -> bool {
        matches!(self, Self::Voice | Self::StageVoice)
    }

    /// Returns true if the kind is counted in unread rollups.
    #[must_use]
    pub fn counts_toward_unread(self) -> bool {
        Self::UNREAD_ROLLUP.contains(&self)
    }

    /// Returns true if a thread of this kind may hang under `parent`.
    #[must_use]
    pub fn accepts_parent(self, parent: Self) -> bool {
        match self {
            Self::AnnouncementThread => {
                matches!(parent, Self::Text | Self::Forum | Self::Announcement)
            }
            Self::PublicThread | Self::PrivateThread => matches!(parent, Self::Text | Self::Forum),
            _ => true,
        }
    }
}

impl From<u8> for ChannelKind {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Dm,
            2 => Self::Voice,
            3 => Self::GroupDm,
            4 => Self::Category,
            5 => Self::Announcement,
            10 => Self::AnnouncementThread,
            11 => Self::PublicThread,
            12 => Self::PrivateThread,
            13 => Self::StageVoice,
            14 => Self::Directory,
            15 => Self::Forum,
            16 => Self::Media,
            _ => Self::Text,
        }
    }
}

impl From<ChannelKind> for u8 {
    fn from(kind: ChannelKind) -> Self {
        kind as Self
    }
}

/// Guild channel, thread or private conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    id: ChannelId,
    #[serde(default)]
    guild_id: Option<GuildId>,
    #[serde(rename = "type", default)]
    kind: ChannelKind,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    parent_id: Option<ChannelId>,
    #[serde(default)]
    recipients: Vec<User>,
    #[serde(default)]
    last_message_id: Option<MessageId>,
    #[serde(default)]
    position: i32,
    #[serde(default)]
    nsfw: bool,
}

impl Channel {
    /// Creates a new channel with the given ID, name, and type.
    #[must_use]
    pub fn new(id: impl Into<ChannelId>, name: impl Into<String>, kind: ChannelKind) -> Self {
        Self {
            id: id.into(),
            guild_id: None,
            kind,
            name: Some(name.into()),
            parent_id: None,
            recipients: Vec::new(),
            last_message_id: None,
            position: 0,
            nsfw: false,
        }
    }

    /// Creates a one-to-one conversation with `recipient`.
    #[must_use]
    pub fn direct(id: impl Into<ChannelId>, recipient: User) -> Self {
        Self {
            id: id.into(),
            guild_id: None,
            kind: ChannelKind::Dm,
            name: None,
            parent_id: None,
            recipients: vec![recipient],
            last_message_id: None,
            position: 0,
            nsfw: false,
        }
    }

    /// Sets the guild ID for this channel.
    #[must_use]
    pub fn with_guild(mut self, guild_id: impl Into<GuildId>) -> Self {
        self.guild_id = Some(guild_id.into());
        self
    }

    /// Sets the parent (category or thread parent) ID.
    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<ChannelId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Sets the position of this channel in the channel list.
    #[must_use]
    pub const fn with_position(mut self, position: i32) -> Self {
        self.position = position;
        self
    }

    /// Sets the newest message ID.
    #[must_use]
    pub fn with_last_message(mut self, id: impl Into<MessageId>) -> Self {
        self.last_message_id = Some(id.into());
        self
    }

    /// Adds private-conversation recipients.
    #[must_use]
    pub fn with_recipients(mut self, recipients: Vec<User>) -> Self {
        self.recipients = recipients;
        self
    }

    /// Marks the channel age-restricted.
    #[must_use]
    pub const fn with_nsfw(mut self, nsfw: bool) -> Self {
        self.nsfw = nsfw;
        self
    }

    /// Returns the channel ID.
    #[must_use]
    pub const fn id(&self) -> ChannelId {
        self.id
    }

    /// Returns the guild ID when it names a real guild.
    #[must_use]
    pub fn guild_id(&self) -> Option<GuildId> {
        self.guild_id.filter(|id| id.is_valid())
    }

    /// Returns the channel type.
    #[must_use]
    pub const fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Returns the raw channel name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    /// Returns the parent ID, if any.
    #[must_use]
    pub fn parent_id(&self) -> Option<ChannelId> {
        self.parent_id.filter(|id| id.is_valid())
    }

    /// Returns the recipients of a private conversation.
    #[must_use]
    pub fn recipients(&self) -> &[User] {
        &self.recipients
    }

    /// Returns the newest message ID when valid.
    #[must_use]
    pub fn last_message_id(&self) -> Option<MessageId> {
        self.last_message_id.filter(|id| id.is_valid())
    }

    /// Returns the channel position in the channel list.
    #[must_use]
    pub const fn position(&self) -> i32 {
        self.position
    }

    /// Returns whether the channel is age-restricted.
    #[must_use]
    pub const fn is_nsfw(&self) -> bool {
        self.nsfw
    }

    /// Returns true when the channel lives outside any guild.
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.guild_id().is_none()
    }

    /// Advances the newest message ID; older IDs are ignored.
    ///
    /// Returns true if the stored value moved forward.
    pub fn advance_last_message(&mut self, id: MessageId) -> bool {
        if self.last_message_id().is_some_and(|last| last >= id) {
            return false;
        }
        self.last_message_id = Some(id);
        true
    }

    /// Applies an update from the gateway, keeping the newest message ID.
    pub fn merge(&mut self, update: Self) {
        let last = match (self.last_message_id(), update.last_message_id()) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        *self = update;
        self.last_message_id = last;
    }

    /// Plain-text name as shown in titles and notifications.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.kind {
            ChannelKind::Dm => self
                .recipients
                .first()
                .map_or_else(|| recipient_names(&self.recipients), |u| u.display_name().to_string()),
            ChannelKind::GroupDm => self
                .name()
                .map_or_else(|| recipient_names(&self.recipients), str::to_string),
            ChannelKind::PublicThread | ChannelKind::PrivateThread => {
                self.name().unwrap_or_default().to_string()
            }
            _ => format!("#{}", self.name().unwrap_or_default()),
        }
    }
}

fn recipient_names(recipients: &[User]) -> String {
    match recipients {
        [] => "Empty channel".to_string(),
        [one] => one.display_name().to_string(),
        [a, b] => format!("{} and {}", a.display_name(), b.display_name()),
        [init @ .., last] => {
            let head = init
                .iter()
                .map(User::display_name)
                .collect::<Vec<_>>()
                .join(", ");
            format!("{head} and {}", last.display_name())
        }
    }
}
