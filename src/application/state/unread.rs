//! Unread and mention aggregation.
//!
//! Values are memoised per channel, guild and folder. Entries equal to
//! [`UnreadSummary::READ`] are not stored, so a missing entry reads as
//! read. Updates only touch the changed channel and the guild and folder
//! above it.

use std::collections::HashMap;
use std::hash::Hash;

use tracing::trace;

use super::cache::DomainCache;
use crate::domain::entities::{ChannelId, ChannelKind, FolderId, GuildId};
use crate::domain::events::CoreEvent;
use crate::domain::unread::{Indicator, UnreadSummary, UnreadTarget};

#[derive(Debug, Default)]
pub struct UnreadEngine {
    channels: HashMap<ChannelId, UnreadSummary>,
    guilds: HashMap<GuildId, UnreadSummary>,
    folders: HashMap<FolderId, UnreadSummary>,
    folder_of: HashMap<GuildId, FolderId>,
    folder_members: HashMap<FolderId, Vec<GuildId>>,
}

impl UnreadEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, target: UnreadTarget) -> UnreadSummary {
        let value = match target {
            UnreadTarget::Channel(id) => self.channels.get(&id),
            UnreadTarget::Guild(id) => self.guilds.get(&id),
            UnreadTarget::Folder(id) => self.folders.get(&id),
        };
        value.copied().unwrap_or(UnreadSummary::READ)
    }

    #[must_use]
    pub fn channel(&self, id: ChannelId) -> UnreadSummary {
        self.get(UnreadTarget::Channel(id))
    }

    #[must_use]
    pub fn guild(&self, id: GuildId) -> UnreadSummary {
        self.get(UnreadTarget::Guild(id))
    }

    #[must_use]
    pub fn folder(&self, id: FolderId) -> UnreadSummary {
        self.get(UnreadTarget::Folder(id))
    }

    /// Folder that holds `guild`, if it sits in a real folder.
    #[must_use]
    pub fn folder_of(&self, guild: GuildId) -> Option<FolderId> {
        self.folder_of.get(&guild).copied()
    }

    /// Reacts to a derived event. Returns every target whose value changed.
    pub fn on_event(&mut self, cache: &DomainCache, event: &CoreEvent) -> Vec<UnreadTarget> {
        let mut changed = Vec::new();
        match event {
            CoreEvent::CacheReset => return self.rebuild(cache),
            CoreEvent::ChannelActivity {
                channel_id,
                guild_id,
            }
            | CoreEvent::ChannelReadChanged {
                channel_id,
                guild_id,
            }
            | CoreEvent::ChannelInvalidated {
                channel_id,
                guild_id,
            }
            | CoreEvent::ChannelRemoved {
                channel_id,
                guild_id,
            } => {
                self.recompute_channel(cache, *channel_id, &mut changed);
                if let Some(guild) = guild_id {
                    self.recompute_guild(cache, *guild, &mut changed);
                }
            }
            CoreEvent::GuildInvalidated(guild) | CoreEvent::ChannelListInvalidated(Some(guild)) => {
                // hidden channels included, so their stale entries clear
                for channel in cache.guild_channel_ids(*guild) {
                    self.recompute_channel(cache, channel, &mut changed);
                }
                self.recompute_guild(cache, *guild, &mut changed);
            }
            CoreEvent::GuildRemoved(guild) => {
                self.channels
                    .retain(|id, _| cache.channel(*id).is_some());
                self.recompute_guild(cache, *guild, &mut changed);
            }
            CoreEvent::FoldersChanged => self.reindex_folders(cache, &mut changed),
            _ => {}
        }
        changed
    }

    /// Recomputes everything from the cache.
    pub fn rebuild(&mut self, cache: &DomainCache) -> Vec<UnreadTarget> {
        let mut channels = HashMap::new();
        let mut guilds = HashMap::new();

        for channel in cache.private_channels() {
            insert_sparse(&mut channels, channel.id(), channel_summary(cache, channel.id()));
        }
        for guild in cache.guilds() {
            for channel in cache.channels_in(guild.id(), &[]) {
                insert_sparse(&mut channels, channel.id(), channel_summary(cache, channel.id()));
            }
            insert_sparse(&mut guilds, guild.id(), guild_summary(cache, guild.id()));
        }

        let mut changed = Vec::new();
        diff_into(&self.channels, &channels, UnreadTarget::Channel, &mut changed);
        diff_into(&self.guilds, &guilds, UnreadTarget::Guild, &mut changed);
        self.channels = channels;
        self.guilds = guilds;

        self.reindex_folders(cache, &mut changed);
        trace!(changed = changed.len(), "unread state rebuilt");
        changed
    }

    fn recompute_channel(
        &mut self,
        cache: &DomainCache,
        id: ChannelId,
        changed: &mut Vec<UnreadTarget>,
    ) {
        let value = channel_summary(cache, id);
        if store(&mut self.channels, id, value) {
            changed.push(UnreadTarget::Channel(id));
        }
    }

    fn recompute_guild(&mut self, cache: &DomainCache, id: GuildId, changed: &mut Vec<UnreadTarget>) {
        let value = guild_summary(cache, id);
        if store(&mut self.guilds, id, value) {
            changed.push(UnreadTarget::Guild(id));
            if let Some(folder) = self.folder_of(id) {
                self.recompute_folder(folder, changed);
            }
        }
    }

    fn recompute_folder(&mut self, id: FolderId, changed: &mut Vec<UnreadTarget>) {
        let value = self
            .folder_members
            .get(&id)
            .into_iter()
            .flatten()
            .fold(UnreadSummary::READ, |acc, guild| acc.combine(self.guild(*guild)));
        if store(&mut self.folders, id, value) {
            changed.push(UnreadTarget::Folder(id));
        }
    }

    fn reindex_folders(&mut self, cache: &DomainCache, changed: &mut Vec<UnreadTarget>) {
        self.folder_of.clear();
        self.folder_members.clear();
        for folder in cache.sidebar() {
            let Some(id) = folder.id.filter(|_| !folder.is_synthetic()) else {
                continue;
            };
            for guild in &folder.guild_ids {
                self.folder_of.insert(*guild, id);
            }
            self.folder_members.insert(id, folder.guild_ids);
        }

        let gone: Vec<FolderId> = self
            .folders
            .keys()
            .filter(|id| !self.folder_members.contains_key(id))
            .copied()
            .collect();
        for id in gone {
            self.folders.remove(&id);
            changed.push(UnreadTarget::Folder(id));
        }

        let ids: Vec<FolderId> = self.folder_members.keys().copied().collect();
        for id in ids {
            self.recompute_folder(id, changed);
        }
    }
}

/// Unread value of a single channel. Hidden and unknown channels read as
/// read.
#[must_use]
pub fn channel_summary(cache: &DomainCache, id: ChannelId) -> UnreadSummary {
    let Some(channel) = cache.visible_channel(id) else {
        return UnreadSummary::READ;
    };
    let last = channel.last_message_id();
    let state = cache.read_state(id);

    let mentions = state.map_or(0, |s| s.mention_count);
    let indicator = if mentions > 0 {
        Indicator::Mentioned
    } else if state.map_or(last.is_some(), |s| s.is_behind(last)) {
        Indicator::Unread
    } else {
        Indicator::Read
    };

    UnreadSummary {
        indicator,
        mentions,
    }
}

/// Rollup over the guild's visible channels of the counted kinds.
#[must_use]
pub fn guild_summary(cache: &DomainCache, id: GuildId) -> UnreadSummary {
    cache
        .channels_in(id, &ChannelKind::UNREAD_ROLLUP)
        .iter()
        .fold(UnreadSummary::READ, |acc, channel| {
            acc.combine(channel_summary(cache, channel.id()))
        })
}

/// Stores `value` and returns true if it differs from what was stored.
fn store<K: Eq + Hash>(map: &mut HashMap<K, UnreadSummary>, key: K, value: UnreadSummary) -> bool {
    let previous = if value == UnreadSummary::READ {
        map.remove(&key)
    } else {
        map.insert(key, value)
    };
    previous.unwrap_or(UnreadSummary::READ) != value
}

fn insert_sparse<K: Eq + Hash>(map: &mut HashMap<K, UnreadSummary>, key: K, value: UnreadSummary) {
    if value != UnreadSummary::READ {
        map.insert(key, value);
    }
}

fn diff_into<K: Eq + Hash + Copy>(
    old: &HashMap<K, UnreadSummary>,
    new: &HashMap<K, UnreadSummary>,
    target: fn(K) -> UnreadTarget,
    changed: &mut Vec<UnreadTarget>,
) {
    for (key, value) in new {
        if old.get(key) != Some(value) {
            changed.push(target(*key));
        }
    }
    for key in old.keys() {
        if !new.contains_key(key) {
            changed.push(target(*key));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::state::cache::fixtures::*;
    use crate::domain::entities::{Channel, Folder, Guild, MessageId, ReadState, User};
    use crate::domain::events::{GatewayEvent, GuildPayload, ReadyPayload};

    struct Harness {
        cache: DomainCache,
        engine: UnreadEngine,
    }

    impl Harness {
        fn new(ready: GatewayEvent) -> Self {
            let mut harness = Self {
                cache: DomainCache::new(),
                engine: UnreadEngine::new(),
            };
            harness.feed(ready);
            harness
        }

        fn feed(&mut self, event: GatewayEvent) -> Vec<UnreadTarget> {
            let mut changed = Vec::new();
            for derived in self.cache.apply(&event) {
                changed.extend(self.engine.on_event(&self.cache, &derived));
            }
            changed
        }
    }

    fn foldered_ready() -> GatewayEvent {
        GatewayEvent::Ready(Box::new(ReadyPayload {
            user: Some(me()),
            guilds: vec![
                GuildPayload::new(
                    Guild::new(100_u64, "Rust"),
                    vec![
                        text(200, 100, "general").with_last_message(500_u64),
                        Channel::new(210_u64, "voice", ChannelKind::Voice)
                            .with_guild(100_u64)
                            .with_last_message(900_u64),
                    ],
                ),
                GuildPayload::new(
                    Guild::new(101_u64, "Go"),
                    vec![text(300, 101, "general").with_last_message(50_u64)],
                ),
            ],
            guild_folders: vec![Folder::new(7_u64, vec![GuildId(100), GuildId(101)])],
            read_states: vec![
                ReadState::new(ChannelId(200), Some(MessageId(500))),
                ReadState::new(ChannelId(300), Some(MessageId(50))),
            ],
            ..ReadyPayload::default()
        }))
    }

    fn read_update(channel: u64, last: u64, mentions: u32) -> GatewayEvent {
        GatewayEvent::ReadStateUpdate(
            ReadState::new(ChannelId(channel), Some(MessageId(last))).with_mention_count(mentions),
        )
    }

    #[test]
    fn test_channel_without_read_state_is_unread() {
        let mut h = Harness::new(ready());
        h.feed(GatewayEvent::ChannelCreate(
            text(201, 100, "new").with_last_message(10_u64),
        ));

        assert_eq!(h.engine.channel(ChannelId(201)).indicator, Indicator::Unread);
        assert_eq!(h.engine.guild(GuildId(100)).indicator, Indicator::Unread);
    }

    #[test]
    fn test_mention_then_read_catches_up() {
        let mut h = Harness::new(foldered_ready());
        assert_eq!(h.engine.folder(FolderId(7)), UnreadSummary::READ);

        h.feed(mention(600, 200));
        h.feed(read_update(200, 500, 1));

        let channel = h.engine.channel(ChannelId(200));
        assert_eq!(channel.indicator, Indicator::Mentioned);
        assert_eq!(channel.mentions, 1);
        assert_eq!(h.engine.guild(GuildId(100)).mentions, 1);
        assert_eq!(h.engine.folder(FolderId(7)).indicator, Indicator::Mentioned);

        h.feed(read_update(200, 600, 0));

        assert_eq!(h.engine.channel(ChannelId(200)), UnreadSummary::READ);
        assert_eq!(h.engine.guild(GuildId(100)).mentions, 0);
        assert_eq!(h.engine.folder(FolderId(7)).indicator, Indicator::Read);
    }

    #[test]
    fn test_voice_channels_do_not_roll_up() {
        let h = Harness::new(foldered_ready());

        assert_eq!(h.engine.channel(ChannelId(210)).indicator, Indicator::Unread);
        assert_eq!(h.engine.guild(GuildId(100)), UnreadSummary::READ);
    }

    #[test]
    fn test_only_changed_targets_are_reported() {
        let mut h = Harness::new(foldered_ready());

        let changed = h.feed(GatewayEvent::MessageCreate(Box::new(
            crate::domain::entities::Message::new(501_u64, 200_u64, User::new(9_u64, "bob"), "x"),
        )));
        assert_eq!(
            changed,
            [
                UnreadTarget::Channel(ChannelId(200)),
                UnreadTarget::Guild(GuildId(100)),
                UnreadTarget::Folder(FolderId(7)),
            ]
        );

        let changed = h.feed(GatewayEvent::MessageCreate(Box::new(
            crate::domain::entities::Message::new(502_u64, 200_u64, User::new(9_u64, "bob"), "y"),
        )));
        assert!(changed.is_empty());
    }

    #[test]
    fn test_folder_is_max_of_guilds() {
        let mut h = Harness::new(foldered_ready());
        let events = [
            mention(600, 200),
            read_update(300, 40, 0),
            read_update(200, 600, 0),
            mention(610, 300),
            read_update(300, 610, 0),
        ];

        for event in events {
            h.feed(event);
            let expected = [GuildId(100), GuildId(101)]
                .iter()
                .map(|g| h.engine.guild(*g).indicator)
                .max()
                .unwrap_or_default();
            assert_eq!(h.engine.folder(FolderId(7)).indicator, expected);

            let mentions: u32 = [GuildId(100), GuildId(101)]
                .iter()
                .map(|g| h.engine.guild(*g).mentions)
                .sum();
            assert_eq!(h.engine.folder(FolderId(7)).mentions, mentions);
        }
    }

    #[test]
    fn test_removed_channel_resets_values() {
        let mut h = Harness::new(ready());
        h.feed(mention(600, 200));
        assert_eq!(h.engine.guild(GuildId(100)).indicator, Indicator::Mentioned);

        let changed = h.feed(GatewayEvent::ChannelDelete(text(200, 100, "general")));

        assert!(changed.contains(&UnreadTarget::Channel(ChannelId(200))));
        assert_eq!(h.engine.guild(GuildId(100)), UnreadSummary::READ);
    }

    #[test]
    fn test_orphaned_thread_clears_its_pill() {
        let mut h = Harness::new(ready());
        h.feed(GatewayEvent::ChannelCreate(
            Channel::new(250_u64, "help", ChannelKind::PublicThread)
                .with_guild(100_u64)
                .with_parent(200_u64)
                .with_last_message(700_u64),
        ));
        assert_eq!(h.engine.channel(ChannelId(250)).indicator, Indicator::Unread);

        let changed = h.feed(GatewayEvent::ChannelDelete(text(200, 100, "general")));

        assert!(h.cache.channel(ChannelId(250)).is_some());
        assert!(changed.contains(&UnreadTarget::Channel(ChannelId(250))));
        assert_eq!(h.engine.channel(ChannelId(250)), UnreadSummary::READ);
        assert_eq!(h.engine.guild(GuildId(100)), UnreadSummary::READ);
    }

    #[test]
    fn test_folders_changed_reindexes() {
        let mut h = Harness::new(foldered_ready());
        h.feed(mention(600, 200));
        assert_eq!(h.engine.folder_of(GuildId(100)), Some(FolderId(7)));

        let changed = h.feed(GatewayEvent::UserSettingsUpdate(
            crate::domain::events::SettingsPayload {
                guild_folders: Some(vec![Folder::new(8_u64, vec![GuildId(100)])]),
                status: None,
            },
        ));

        assert!(changed.contains(&UnreadTarget::Folder(FolderId(7))));
        assert!(changed.contains(&UnreadTarget::Folder(FolderId(8))));
        assert_eq!(h.engine.folder(FolderId(7)), UnreadSummary::READ);
        assert_eq!(h.engine.folder(FolderId(8)).indicator, Indicator::Mentioned);
        assert_eq!(h.engine.folder_of(GuildId(101)), None);
    }

    #[test]
    fn test_rebuild_reports_differences_only() {
        let mut h = Harness::new(ready());
        assert!(h.engine.rebuild(&h.cache).is_empty());

        h.feed(mention(600, 200));
        let mut fresh = UnreadEngine::new();
        let changed = fresh.rebuild(&h.cache);
        assert_eq!(changed.len(), 2);
    }
}
