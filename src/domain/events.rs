//! Decoded gateway events and the invalidations derived from them.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::connection::ConnectionStatus;
use super::entities::{
    Channel, ChannelId, Folder, Guild, GuildId, Member, Message, Presence, ReadState, Status, User,
    UserId,
};
use super::selection::Selection;
use super::unread::UnreadTarget;

/// Guild with the channels it carries on creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuildPayload {
    #[serde(flatten)]
    pub guild: Guild,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub threads: Vec<Channel>,
    /// Members sent with the guild. The local user's entry carries its roles.
    #[serde(default)]
    pub members: Vec<Member>,
}

impl GuildPayload {
    /// Wraps a guild with its channels.
    #[must_use]
    pub fn new(guild: Guild, channels: Vec<Channel>) -> Self {
        Self {
            guild,
            channels,
            threads: Vec::new(),
            members: Vec::new(),
        }
    }

    /// Adds member entries.
    #[must_use]
    pub fn with_members(mut self, members: Vec<Member>) -> Self {
        self.members = members;
        self
    }
}

/// A member's roles or nickname changed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberUpdate {
    pub guild_id: GuildId,
    #[serde(flatten)]
    pub member: Member,
}

/// Initial state delivered on a fresh session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadyPayload {
    /// The local user. Absent only in hand-built fixtures.
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub guilds: Vec<GuildPayload>,
    #[serde(default)]
    pub private_channels: Vec<Channel>,
    #[serde(default)]
    pub guild_folders: Vec<Folder>,
    #[serde(default)]
    pub read_states: Vec<ReadState>,
    #[serde(default)]
    pub presences: Vec<Presence>,
    #[serde(default)]
    pub status: Status,
}

/// Partial settings update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SettingsPayload {
    #[serde(default)]
    pub guild_folders: Option<Vec<Folder>>,
    #[serde(default)]
    pub status: Option<Status>,
}

/// Event as decoded by the transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "t", content = "d", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayEvent {
    Ready(Box<ReadyPayload>),
    Resumed,
    GuildCreate(Box<GuildPayload>),
    GuildUpdate(Guild),
    GuildDelete {
        id: GuildId,
        #[serde(default)]
        unavailable: bool,
    },
    ChannelCreate(Channel),
    ChannelUpdate(Channel),
    ChannelDelete(Channel),
    GuildMemberUpdate(MemberUpdate),
    MessageCreate(Box<Message>),
    ReadStateUpdate(ReadState),
    PresenceUpdate(Presence),
    UserUpdate(User),
    UserSettingsUpdate(SettingsPayload),
    /// The transport lost its socket. Not a wire event.
    TransportClosed {
        #[serde(default)]
        code: Option<u16>,
    },
}

impl GatewayEvent {
    /// Returns the wire name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ready(_) => "READY",
            Self::Resumed => "RESUMED",
            Self::GuildCreate(_) => "GUILD_CREATE",
            Self::GuildUpdate(_) => "GUILD_UPDATE",
            Self::GuildDelete { .. } => "GUILD_DELETE",
            Self::ChannelCreate(_) => "CHANNEL_CREATE",
            Self::ChannelUpdate(_) => "CHANNEL_UPDATE",
            Self::ChannelDelete(_) => "CHANNEL_DELETE",
            Self::GuildMemberUpdate(_) => "GUILD_MEMBER_UPDATE",
            Self::MessageCreate(_) => "MESSAGE_CREATE",
            Self::ReadStateUpdate(_) => "READ_STATE_UPDATE",
            Self::PresenceUpdate(_) => "PRESENCE_UPDATE",
            Self::UserUpdate(_) => "USER_UPDATE",
            Self::UserSettingsUpdate(_) => "USER_SETTINGS_UPDATE",
            Self::TransportClosed { .. } => "TRANSPORT_CLOSED",
        }
    }

    /// Returns the kind bit used for subscription filters.
    #[must_use]
    pub const fn kind(&self) -> EventKinds {
        match self {
            Self::Ready(_) => EventKinds::READY,
            Self::Resumed => EventKinds::RESUMED,
            Self::GuildCreate(_) => EventKinds::GUILD_CREATE,
            Self::GuildUpdate(_) => EventKinds::GUILD_UPDATE,
            Self::GuildDelete { .. } => EventKinds::GUILD_DELETE,
            Self::ChannelCreate(_) => EventKinds::CHANNEL_CREATE,
            Self::ChannelUpdate(_) => EventKinds::CHANNEL_UPDATE,
            Self::ChannelDelete(_) => EventKinds::CHANNEL_DELETE,
            Self::GuildMemberUpdate(_) => EventKinds::GUILD_MEMBER_UPDATE,
            Self::MessageCreate(_) => EventKinds::MESSAGE_CREATE,
            Self::ReadStateUpdate(_) => EventKinds::READ_STATE_UPDATE,
            Self::PresenceUpdate(_) => EventKinds::PRESENCE_UPDATE,
            Self::UserUpdate(_) => EventKinds::USER_UPDATE,
            Self::UserSettingsUpdate(_) => EventKinds::USER_SETTINGS_UPDATE,
            Self::TransportClosed { .. } => EventKinds::TRANSPORT_CLOSED,
        }
    }
}

/// Higher-level invalidations published by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    /// The cache was rebuilt from a fresh `Ready`; all rendered state is stale.
    CacheReset,
    GuildInvalidated(GuildId),
    GuildUnavailable(GuildId),
    GuildRemoved(GuildId),
    /// The folder layout or the set of unfoldered guilds changed.
    FoldersChanged,
    /// A guild's channel list (or the DM list for `None`) changed shape.
    ChannelListInvalidated(Option<GuildId>),
    ChannelInvalidated {
        channel_id: ChannelId,
        guild_id: Option<GuildId>,
    },
    ChannelRemoved {
        channel_id: ChannelId,
        guild_id: Option<GuildId>,
    },
    /// A new message moved the channel's newest message ID.
    ChannelActivity {
        channel_id: ChannelId,
        guild_id: Option<GuildId>,
    },
    ChannelReadChanged {
        channel_id: ChannelId,
        guild_id: Option<GuildId>,
    },
    PresenceChanged {
        user_id: UserId,
        guild_id: Option<GuildId>,
    },
    UserChanged(UserId),
    UnreadChanged(UnreadTarget),
    SelectionChanged(Selection),
    ConnectionChanged(ConnectionStatus),
}

impl CoreEvent {
    /// Returns the kind bit used for subscription filters.
    #[must_use]
    pub const fn kind(&self) -> EventKinds {
        match self {
            Self::CacheReset => EventKinds::CACHE_RESET,
            Self::GuildInvalidated(_) => EventKinds::GUILD_INVALIDATED,
            Self::GuildUnavailable(_) => EventKinds::GUILD_UNAVAILABLE,
            Self::GuildRemoved(_) => EventKinds::GUILD_REMOVED,
            Self::FoldersChanged => EventKinds::FOLDERS_CHANGED,
            Self::ChannelListInvalidated(_) => EventKinds::CHANNEL_LIST_INVALIDATED,
            Self::ChannelInvalidated { .. } => EventKinds::CHANNEL_INVALIDATED,
            Self::ChannelRemoved { .. } => EventKinds::CHANNEL_REMOVED,
            Self::ChannelActivity { .. } => EventKinds::CHANNEL_ACTIVITY,
            Self::ChannelReadChanged { .. } => EventKinds::CHANNEL_READ_CHANGED,
            Self::PresenceChanged { .. } => EventKinds::PRESENCE_CHANGED,
            Self::UserChanged(_) => EventKinds::USER_CHANGED,
            Self::UnreadChanged(_) => EventKinds::UNREAD_CHANGED,
            Self::SelectionChanged(_) => EventKinds::SELECTION_CHANGED,
            Self::ConnectionChanged(_) => EventKinds::CONNECTION_CHANGED,
        }
    }
}

/// Anything the bus carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Gateway(GatewayEvent),
    Core(CoreEvent),
}

impl Event {
    #[must_use]
    pub const fn kind(&self) -> EventKinds {
        match self {
            Self::Gateway(ev) => ev.kind(),
            Self::Core(ev) => ev.kind(),
        }
    }

    /// Returns the derived event, if this is one.
    #[must_use]
    pub const fn as_core(&self) -> Option<&CoreEvent> {
        match self {
            Self::Core(ev) => Some(ev),
            Self::Gateway(_) => None,
        }
    }

    /// Returns the gateway event, if this is one.
    #[must_use]
    pub const fn as_gateway(&self) -> Option<&GatewayEvent> {
        match self {
            Self::Gateway(ev) => Some(ev),
            Self::Core(_) => None,
        }
    }
}

impl From<GatewayEvent> for Event {
    fn from(ev: GatewayEvent) -> Self {
        Self::Gateway(ev)
    }
}

impl From<CoreEvent> for Event {
    fn from(ev: CoreEvent) -> Self {
        Self::Core(ev)
    }
}

bitflags! {
    /// Set of event kinds a subscriber listens to. The empty set means all.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EventKinds: u64 {
        const READY = 1 << 0;
        const RESUMED = 1 << 1;
        const GUILD_CREATE = 1 << 2;
        const GUILD_UPDATE = 1 << 3;
        const GUILD_DELETE = 1 << 4;
        const CHANNEL_CREATE = 1 << 5;
        const CHANNEL_UPDATE = 1 << 6;
        const CHANNEL_DELETE = 1 << 7;
        const MESSAGE_CREATE = 1 << 8;
        const READ_STATE_UPDATE = 1 << 9;
        const PRESENCE_UPDATE = 1 << 10;
        const USER_UPDATE = 1 << 11;
        const USER_SETTINGS_UPDATE = 1 << 12;
        const TRANSPORT_CLOSED = 1 << 13;
        const GUILD_MEMBER_UPDATE = 1 << 14;

        const CACHE_RESET = 1 << 32;
        const GUILD_INVALIDATED = 1 << 33;
        const GUILD_UNAVAILABLE = 1 << 34;
        const GUILD_REMOVED = 1 << 35;
        const FOLDERS_CHANGED = 1 << 36;
        const CHANNEL_LIST_INVALIDATED = 1 << 37;
        const CHANNEL_INVALIDATED = 1 << 38;
        const CHANNEL_REMOVED = 1 << 39;
        const CHANNEL_ACTIVITY = 1 << 40;
        const CHANNEL_READ_CHANGED = 1 << 41;
        const PRESENCE_CHANGED = 1 << 42;
        const USER_CHANGED = 1 << 43;
        const UNREAD_CHANGED = 1 << 44;
        const SELECTION_CHANGED = 1 << 45;
        const CONNECTION_CHANGED = 1 << 46;

        const SESSION_START = Self::READY.bits() | Self::RESUMED.bits();
    }
}

impl EventKinds {
    /// Returns true if a subscriber with this filter receives `kind`.
    #[must_use]
    pub fn accepts(self, kind: Self) -> bool {
        self.is_empty() || self.intersects(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{ChannelKind, MessageId, RoleId};

    #[test]
    fn test_filter_accepts() {
        assert!(EventKinds::empty().accepts(EventKinds::READY));
        assert!(EventKinds::SESSION_START.accepts(EventKinds::RESUMED));
        assert!(!EventKinds::MESSAGE_CREATE.accepts(EventKinds::READY));
    }

    #[test]
    fn test_decode_message_create() {
        let json = r#"{
            "t": "MESSAGE_CREATE",
            "d": {
                "id": "600",
                "channel_id": "200",
                "guild_id": "100",
                "author": {"id": "9", "username": "bob"},
                "content": "hey @me",
                "mentions": [{"id": "1", "username": "me"}]
            }
        }"#;

        let event: GatewayEvent = serde_json::from_str(json).unwrap();
        let GatewayEvent::MessageCreate(msg) = &event else {
            panic!("unexpected event {event:?}");
        };
        assert_eq!(msg.id(), MessageId(600));
        assert!(msg.mentions_user(UserId(1), &[]));
        assert_eq!(event.name(), "MESSAGE_CREATE");
    }

    #[test]
    fn test_decode_role_mention_and_member_update() {
        let json = r#"{
            "t": "MESSAGE_CREATE",
            "d": {
                "id": "601",
                "channel_id": "200",
                "author": {"id": "9", "username": "bob"},
                "content": "@mods",
                "mention_roles": ["7"]
            }
        }"#;
        let event: GatewayEvent = serde_json::from_str(json).unwrap();
        let GatewayEvent::MessageCreate(msg) = &event else {
            panic!("unexpected event {event:?}");
        };
        assert_eq!(msg.mention_roles(), [RoleId(7)]);

        let json = r#"{
            "t": "GUILD_MEMBER_UPDATE",
            "d": {
                "guild_id": "100",
                "user": {"id": "1", "username": "me"},
                "roles": ["7", "8"]
            }
        }"#;
        let event: GatewayEvent = serde_json::from_str(json).unwrap();
        let GatewayEvent::GuildMemberUpdate(update) = &event else {
            panic!("unexpected event {event:?}");
        };
        assert_eq!(update.guild_id, GuildId(100));
        assert_eq!(update.member.user_id(), UserId(1));
        assert_eq!(update.member.roles(), [RoleId(7), RoleId(8)]);
        assert_eq!(event.kind(), EventKinds::GUILD_MEMBER_UPDATE);
    }

    #[test]
    fn test_decode_guild_create_with_channels() {
        let json = r#"{
            "t": "GUILD_CREATE",
            "d": {
                "id": "100",
                "name": "Rust",
                "channels": [{"id": "200", "guild_id": "100", "type": 0, "name": "general"}]
            }
        }"#;

        let event: GatewayEvent = serde_json::from_str(json).unwrap();
        let GatewayEvent::GuildCreate(payload) = event else {
            panic!("expected guild create");
        };
        assert_eq!(payload.guild.id(), GuildId(100));
        assert!(payload.guild.is_available());
        assert_eq!(payload.channels[0].kind(), ChannelKind::Text);
    }

    #[test]
    fn test_decode_unit_and_struct_variants() {
        let resumed: GatewayEvent = serde_json::from_str(r#"{"t":"RESUMED"}"#).unwrap();
        assert_eq!(resumed, GatewayEvent::Resumed);

        let delete: GatewayEvent =
            serde_json::from_str(r#"{"t":"GUILD_DELETE","d":{"id":"100","unavailable":true}}"#)
                .unwrap();
        assert_eq!(
            delete,
            GatewayEvent::GuildDelete {
                id: GuildId(100),
                unavailable: true
            }
        );
    }
}
