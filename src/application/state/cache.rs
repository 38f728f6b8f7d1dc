//! Local mirror of guilds, channels, read states and presences.
//!
//! The cache is the single mutator of domain entities. It is only written
//! by [`DomainCache::apply`], which returns the invalidations the change
//! implies; everything else reads through the query methods.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::domain::entities::{
    Channel, ChannelId, ChannelKind, Folder, Guild, GuildId, Message, MessageId, Presence,
    ReadState, RoleId, Status, User, UserId,
};
use crate::domain::events::{
    CoreEvent, GatewayEvent, GuildPayload, MemberUpdate, ReadyPayload, SettingsPayload,
};

#[derive(Debug, Default)]
pub struct DomainCache {
    me: Option<User>,
    self_status: Status,
    guilds: HashMap<GuildId, Guild>,
    channels: HashMap<ChannelId, Channel>,
    guild_channels: HashMap<GuildId, HashSet<ChannelId>>,
    private_channels: HashSet<ChannelId>,
    folders: Vec<Folder>,
    read_states: HashMap<ChannelId, ReadState>,
    presences: HashMap<(UserId, Option<GuildId>), Status>,
    users: HashMap<UserId, User>,
    my_roles: HashMap<GuildId, Vec<RoleId>>,
}

impl DomainCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a decoded event and returns the invalidations it implies,
    /// in the order observers should see them.
    pub fn apply(&mut self, event: &GatewayEvent) -> Vec<CoreEvent> {
        trace!(event = event.name(), "applying event to cache");
        match event {
            GatewayEvent::Ready(payload) => self.apply_ready(payload),
            // backlog is replayed by the transport
            GatewayEvent::Resumed | GatewayEvent::TransportClosed { .. } => Vec::new(),
            GatewayEvent::GuildCreate(payload) => self.apply_guild_create(payload),
            GatewayEvent::GuildUpdate(guild) => self.apply_guild_update(guild),
            GatewayEvent::GuildDelete { id, unavailable } => {
                self.apply_guild_delete(*id, *unavailable)
            }
            GatewayEvent::ChannelCreate(channel) => self.apply_channel_upsert(channel, false),
            GatewayEvent::ChannelUpdate(channel) => self.apply_channel_upsert(channel, true),
            GatewayEvent::ChannelDelete(channel) => self.apply_channel_delete(channel.id()),
            GatewayEvent::GuildMemberUpdate(update) => self.apply_member_update(update),
            GatewayEvent::MessageCreate(message) => self.apply_message(message),
            GatewayEvent::ReadStateUpdate(state) => self.apply_read_state(state),
            GatewayEvent::PresenceUpdate(presence) => self.apply_presence(presence),
            GatewayEvent::UserUpdate(user) => self.apply_user(user),
            GatewayEvent::UserSettingsUpdate(settings) => self.apply_settings(settings),
        }
    }

    /// Drops every entity, as on logout.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn apply_ready(&mut self, payload: &ReadyPayload) -> Vec<CoreEvent> {
        self.clear();

        if let Some(user) = &payload.user {
            self.users.insert(user.id(), user.clone());
            self.me = Some(user.clone());
        }
        self.self_status = payload.status;

        for guild in &payload.guilds {
            self.insert_guild(guild);
        }
        for channel in &payload.private_channels {
            self.insert_channel(channel.clone());
        }
        for state in &payload.read_states {
            self.read_states.insert(state.channel_id, state.clone());
        }
        for presence in &payload.presences {
            self.presences
                .insert((presence.user_id, presence.guild_id), presence.status);
        }
        self.folders.clone_from(&payload.guild_folders);

        debug!(
            guilds = self.guilds.len(),
            channels = self.channels.len(),
            read_states = self.read_states.len(),
            "cache reset from ready"
        );
        vec![CoreEvent::CacheReset]
    }

    fn apply_guild_create(&mut self, payload: &GuildPayload) -> Vec<CoreEvent> {
        let id = payload.guild.id();
        let was_listed = self.guilds.contains_key(&id);
        let mut events = self.drop_missing_channels(payload);
        self.insert_guild(payload);

        events.extend([
            CoreEvent::GuildInvalidated(id),
            CoreEvent::ChannelListInvalidated(Some(id)),
        ]);
        if !was_listed {
            events.push(CoreEvent::FoldersChanged);
        }
        events
    }

    /// A guild payload carries the full channel list, so anything cached
    /// for that guild and absent from it was deleted while the guild was
    /// out of reach.
    fn drop_missing_channels(&mut self, payload: &GuildPayload) -> Vec<CoreEvent> {
        let id = payload.guild.id();
        let present: HashSet<ChannelId> = payload
            .channels
            .iter()
            .chain(&payload.threads)
            .map(Channel::id)
            .collect();
        let mut stale: Vec<ChannelId> = self
            .guild_channels
            .get(&id)
            .into_iter()
            .flatten()
            .filter(|channel| !present.contains(channel))
            .copied()
            .collect();
        stale.sort_unstable();

        let mut events = Vec::with_capacity(stale.len());
        for channel_id in stale {
            self.remove_channel(channel_id);
            self.read_states.remove(&channel_id);
            debug!(guild = %id, channel = %channel_id, "channel gone after guild resync");
            events.push(CoreEvent::ChannelRemoved {
                channel_id,
                guild_id: Some(id),
            });
        }
        events
    }

    fn apply_guild_update(&mut self, update: &Guild) -> Vec<CoreEvent> {
        let id = update.id();
        match self.guilds.get_mut(&id) {
            Some(guild) => guild.merge(update.clone()),
            None => {
                self.guilds.insert(id, update.clone());
                return vec![CoreEvent::GuildInvalidated(id), CoreEvent::FoldersChanged];
            }
        }
        vec![CoreEvent::GuildInvalidated(id)]
    }

    fn apply_guild_delete(&mut self, id: GuildId, unavailable: bool) -> Vec<CoreEvent> {
        if unavailable {
            let Some(guild) = self.guilds.get_mut(&id) else {
                return Vec::new();
            };
            guild.mark_unavailable();
            debug!(%id, "guild unavailable");
            return vec![CoreEvent::GuildUnavailable(id), CoreEvent::GuildInvalidated(id)];
        }

        if self.guilds.remove(&id).is_none() {
            return Vec::new();
        }
        self.my_roles.remove(&id);
        for channel_id in self.guild_channels.remove(&id).unwrap_or_default() {
            self.channels.remove(&channel_id);
            self.read_states.remove(&channel_id);
        }
        debug!(%id, "guild removed");
        vec![CoreEvent::GuildRemoved(id), CoreEvent::FoldersChanged]
    }

    fn apply_channel_upsert(&mut self, channel: &Channel, update: bool) -> Vec<CoreEvent> {
        let channel_id = channel.id();
        let guild_id = channel.guild_id();
        let previous_guild = self.channels.get(&channel_id).map(Channel::guild_id);

        self.insert_channel(channel.clone());

        let mut events = Vec::new();
        if let Some(old) = previous_guild
            && old != guild_id
        {
            events.push(CoreEvent::ChannelListInvalidated(old));
        }
        if update {
            events.push(CoreEvent::ChannelInvalidated {
                channel_id,
                guild_id,
            });
        }
        events.push(CoreEvent::ChannelListInvalidated(guild_id));
        events
    }

    fn apply_channel_delete(&mut self, id: ChannelId) -> Vec<CoreEvent> {
        let Some(channel) = self.remove_channel(id) else {
            return Vec::new();
        };
        self.read_states.remove(&id);

        let guild_id = channel.guild_id();
        debug!(channel = %id, "channel removed");
        vec![
            CoreEvent::ChannelRemoved {
                channel_id: id,
                guild_id,
            },
            CoreEvent::ChannelListInvalidated(guild_id),
        ]
    }

    fn apply_message(&mut self, message: &Message) -> Vec<CoreEvent> {
        let channel_id = message.channel_id();
        let Some(channel) = self.channels.get_mut(&channel_id) else {
            trace!(channel = %channel_id, "message for unknown channel");
            return Vec::new();
        };
        if !channel.advance_last_message(message.id()) {
            trace!(channel = %channel_id, message = %message.id(), "stale or replayed message");
            return Vec::new();
        }
        let guild_id = channel.guild_id();

        let mut events = vec![CoreEvent::ChannelActivity {
            channel_id,
            guild_id,
        }];

        if self.is_me(message.author().id()) {
            self.read_states
                .entry(channel_id)
                .or_insert_with(|| ReadState::new(channel_id, None))
                .mark_read(message.id());
            events.push(CoreEvent::ChannelReadChanged {
                channel_id,
                guild_id,
            });
        } else if self.mentions_me(message) {
            let state = self
                .read_states
                .entry(channel_id)
                .or_insert_with(|| ReadState::new(channel_id, None));
            state.mention_count = state.mention_count.saturating_add(1);
        }

        events
    }

    fn apply_read_state(&mut self, state: &ReadState) -> Vec<CoreEvent> {
        let channel_id = state.channel_id;
        if self.read_states.get(&channel_id) == Some(state) {
            return Vec::new();
        }
        self.read_states.insert(channel_id, state.clone());

        let guild_id = self.channels.get(&channel_id).and_then(Channel::guild_id);
        vec![CoreEvent::ChannelReadChanged {
            channel_id,
            guild_id,
        }]
    }

    fn apply_member_update(&mut self, update: &MemberUpdate) -> Vec<CoreEvent> {
        if !self.is_me(update.member.user_id()) {
            return Vec::new();
        }
        debug!(guild = %update.guild_id, roles = update.member.roles().len(), "own roles updated");
        self.my_roles
            .insert(update.guild_id, update.member.roles().to_vec());
        Vec::new()
    }

    fn apply_presence(&mut self, presence: &Presence) -> Vec<CoreEvent> {
        let key = (presence.user_id, presence.guild_id);
        if self.presences.insert(key, presence.status) == Some(presence.status) {
            return Vec::new();
        }
        if presence.guild_id.is_none() && self.is_me(presence.user_id) {
            self.self_status = presence.status;
        }
        vec![CoreEvent::PresenceChanged {
            user_id: presence.user_id,
            guild_id: presence.guild_id,
        }]
    }

    fn apply_user(&mut self, user: &User) -> Vec<CoreEvent> {
        let id = user.id();
        if self.is_me(id) {
            self.me = Some(user.clone());
        }
        self.users.insert(id, user.clone());
        vec![CoreEvent::UserChanged(id)]
    }

    fn apply_settings(&mut self, settings: &SettingsPayload) -> Vec<CoreEvent> {
        let mut events = Vec::new();

        if let Some(folders) = &settings.guild_folders {
            self.folders.clone_from(folders);
            events.push(CoreEvent::FoldersChanged);
        }

        if let Some(status) = settings.status
            && status != self.self_status
        {
            self.self_status = status;
            if let Some(me) = self.me.as_ref().map(User::id) {
                self.presences.insert((me, None), status);
                events.push(CoreEvent::PresenceChanged {
                    user_id: me,
                    guild_id: None,
                });
            }
        }

        events
    }

    /// Sets the local status ahead of the server echo.
    ///
    /// Returns the invalidation to publish, if the status changed.
    pub fn set_self_status(&mut self, status: Status) -> Option<CoreEvent> {
        self.apply_settings(&SettingsPayload {
            guild_folders: None,
            status: Some(status),
        })
        .into_iter()
        .next()
    }

    fn insert_guild(&mut self, payload: &GuildPayload) {
        let id = payload.guild.id();
        match self.guilds.get_mut(&id) {
            Some(guild) => guild.merge(payload.guild.clone()),
            None => {
                self.guilds.insert(id, payload.guild.clone());
            }
        }

        if let Some(me) = self.me.as_ref().map(User::id)
            && let Some(member) = payload.members.iter().find(|m| m.user_id() == me)
        {
            self.my_roles.insert(id, member.roles().to_vec());
        }

        for channel in payload.channels.iter().chain(&payload.threads) {
            let channel = match channel.guild_id() {
                Some(_) => channel.clone(),
                None => channel.clone().with_guild(id),
            };
            self.insert_channel(channel);
        }
    }

    fn insert_channel(&mut self, channel: Channel) {
        let id = channel.id();
        if let Some(existing) = self.channels.get(&id)
            && existing.guild_id() != channel.guild_id()
        {
            self.remove_channel(id);
        }

        match channel.guild_id() {
            Some(guild) => {
                self.guild_channels.entry(guild).or_default().insert(id);
            }
            None => {
                self.private_channels.insert(id);
            }
        }

        match self.channels.get_mut(&id) {
            Some(existing) => existing.merge(channel),
            None => {
                self.channels.insert(id, channel);
            }
        }
    }

    fn remove_channel(&mut self, id: ChannelId) -> Option<Channel> {
        let channel = self.channels.remove(&id)?;
        match channel.guild_id() {
            Some(guild) => {
                if let Some(ids) = self.guild_channels.get_mut(&guild) {
                    ids.remove(&id);
                }
            }
            None => {
                self.private_channels.remove(&id);
            }
        }
        Some(channel)
    }

    fn is_me(&self, id: UserId) -> bool {
        self.me.as_ref().is_some_and(|me| me.id() == id)
    }

    #[must_use]
    pub fn guild(&self, id: GuildId) -> Option<&Guild> {
        self.guilds.get(&id)
    }

    pub fn guilds(&self) -> impl Iterator<Item = &Guild> {
        self.guilds.values()
    }

    /// Returns a channel, hidden or not.
    #[must_use]
    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(&id)
    }

    /// Returns a channel only if views may show it.
    #[must_use]
    pub fn visible_channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(&id).filter(|c| self.is_shown(c))
    }

    #[must_use]
    pub fn is_visible(&self, id: ChannelId) -> bool {
        self.visible_channel(id).is_some()
    }

    /// A guild channel needs its guild in the cache; a thread needs a
    /// parent of a kind that may hold it.
    fn is_shown(&self, channel: &Channel) -> bool {
        if let Some(guild) = channel.guild_id()
            && !self.guilds.contains_key(&guild)
        {
            return false;
        }
        if !channel.kind().is_thread() {
            return true;
        }
        channel
            .parent_id()
            .and_then(|parent| self.channels.get(&parent))
            .is_some_and(|parent| channel.kind().accepts_parent(parent.kind()))
    }

    /// Every channel ID filed under `guild`, hidden ones included.
    #[must_use]
    pub fn guild_channel_ids(&self, guild: GuildId) -> Vec<ChannelId> {
        self.guild_channels
            .get(&guild)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Visible channels of a guild ordered by position then ID. An empty
    /// `allowed` slice admits every kind.
    #[must_use]
    pub fn channels_in(&self, guild: GuildId, allowed: &[ChannelKind]) -> Vec<&Channel> {
        let mut channels: Vec<&Channel> = self
            .guild_channels
            .get(&guild)
            .into_iter()
            .flatten()
            .filter_map(|id| self.channels.get(id))
            .filter(|c| allowed.is_empty() || allowed.contains(&c.kind()))
            .filter(|c| self.is_shown(c))
            .collect();
        channels.sort_by_key(|c| (c.position(), c.id()));
        channels
    }

    /// Private conversations, newest activity first. Channels without any
    /// message sort last; ties break on the higher ID.
    #[must_use]
    pub fn private_channels(&self) -> Vec<&Channel> {
        let mut channels: Vec<&Channel> = self
            .private_channels
            .iter()
            .filter_map(|id| self.channels.get(id))
            .collect();
        channels.sort_by_key(|c| dm_sort_key(c));
        channels
    }

    #[must_use]
    pub fn last_message(&self, channel: ChannelId) -> Option<MessageId> {
        self.channels.get(&channel).and_then(Channel::last_message_id)
    }

    #[must_use]
    pub fn read_state(&self, channel: ChannelId) -> Option<&ReadState> {
        self.read_states.get(&channel)
    }

    #[must_use]
    pub fn joined_at(&self, guild: GuildId) -> Option<DateTime<Utc>> {
        self.guilds.get(&guild).and_then(Guild::joined_at)
    }

    /// Raw folder list as last sent by the server.
    #[must_use]
    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    /// Sidebar entries: guilds outside any folder first, most recently
    /// joined first, then the user's folders with unknown guilds dropped.
    #[must_use]
    pub fn sidebar(&self) -> Vec<Folder> {
        let foldered: HashSet<GuildId> = self
            .folders
            .iter()
            .flat_map(|f| f.guild_ids.iter().copied())
            .collect();

        let mut loose: Vec<&Guild> = self
            .guilds
            .values()
            .filter(|g| !foldered.contains(&g.id()))
            .collect();
        loose.sort_by_key(|g| (g.joined_at().is_none(), Reverse(g.joined_at()), g.id()));

        let mut entries: Vec<Folder> = loose.iter().map(|g| Folder::single(g.id())).collect();
        entries.extend(self.folders.iter().filter_map(|folder| {
            let mut folder = folder.clone();
            folder.guild_ids.retain(|id| self.guilds.contains_key(id));
            (!folder.guild_ids.is_empty()).then_some(folder)
        }));
        entries
    }

    /// Roles the local user holds in `guild`.
    #[must_use]
    pub fn my_roles(&self, guild: GuildId) -> &[RoleId] {
        self.my_roles.get(&guild).map_or(&[][..], Vec::as_slice)
    }

    /// Returns true if `message` addresses the local user by name, by one
    /// of their roles in the message's guild, or via `@everyone`.
    #[must_use]
    pub fn mentions_me(&self, message: &Message) -> bool {
        let Some(me) = self.me.as_ref().map(User::id) else {
            return false;
        };
        let guild = message
            .guild_id()
            .or_else(|| self.channels.get(&message.channel_id()).and_then(Channel::guild_id));
        let roles = guild.map_or(&[][..], |guild| self.my_roles(guild));
        message.mentions_user(me, roles)
    }

    /// The local user, once `Ready` named it.
    #[must_use]
    pub fn me(&self) -> Option<&User> {
        self.me.as_ref()
    }

    #[must_use]
    pub const fn self_status(&self) -> Status {
        self.self_status
    }

    #[must_use]
    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    /// Status of `user` within `guild`, falling back to the global one.
    #[must_use]
    pub fn presence(&self, user: UserId, guild: Option<GuildId>) -> Status {
        if guild.is_none() && self.is_me(user) {
            return self.self_status;
        }
        self.presences
            .get(&(user, guild))
            .or_else(|| self.presences.get(&(user, None)))
            .copied()
            .unwrap_or_default()
    }

    /// Sum of mention counts over every visible channel.
    #[must_use]
    pub fn total_mentions(&self) -> u32 {
        self.read_states
            .values()
            .filter(|state| self.is_visible(state.channel_id))
            .fold(0_u32, |acc, state| acc.saturating_add(state.mention_count))
    }
}

fn dm_sort_key(channel: &Channel) -> (bool, Reverse<Option<MessageId>>, Reverse<ChannelId>) {
    let last = channel.last_message_id();
    (last.is_none(), Reverse(last), Reverse(channel.id()))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    pub const ME: UserId = UserId(1);

    pub fn me() -> User {
        User::new(ME, "me")
    }

    pub fn joined(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    pub fn text(id: u64, guild: u64, name: &str) -> Channel {
        Channel::new(id, name, ChannelKind::Text).with_guild(guild)
    }

    /// Guild 100 "Rust" with channel 200 `#general` read up to 500.
    pub fn ready() -> GatewayEvent {
        GatewayEvent::Ready(Box::new(ReadyPayload {
            user: Some(me()),
            guilds: vec![GuildPayload::new(
                Guild::new(100_u64, "Rust").with_joined_at(joined(1)),
                vec![text(200, 100, "general").with_last_message(500_u64)],
            )],
            read_states: vec![ReadState::new(ChannelId(200), Some(MessageId(500)))],
            ..ReadyPayload::default()
        }))
    }

    pub fn message(id: u64, channel: u64, author: User) -> GatewayEvent {
        GatewayEvent::MessageCreate(Box::new(Message::new(id, channel, author, "hi")))
    }

    pub fn mention(id: u64, channel: u64) -> GatewayEvent {
        GatewayEvent::MessageCreate(Box::new(
            Message::new(id, channel, User::new(9_u64, "bob"), "hey").with_mention(me()),
        ))
    }
}
