//! Navigation state machine.
//!
//! Commands return the new [`Selection`] when it changed and `None` when
//! the command reproduced the current state; only changes are persisted
//! and published.

use std::rc::Rc;

use tracing::{debug, warn};

use super::cache::DomainCache;
use crate::domain::entities::{ChannelId, GuildId};
use crate::domain::events::CoreEvent;
use crate::domain::ports::{KeyValueStore, LAST_DM_KEY, LAST_GUILD_KEY, last_channel_key};
use crate::domain::selection::Selection;

/// Target that was requested before the cache knew about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingSelection {
    Channel(ChannelId),
    Guild(GuildId),
}

pub struct Navigator {
    selection: Selection,
    pending: Option<PendingSelection>,
    restored: bool,
    store: Rc<dyn KeyValueStore>,
}

impl Navigator {
    #[must_use]
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        Self {
            selection: Selection::Placeholder,
            pending: None,
            restored: false,
            store,
        }
    }

    #[must_use]
    pub const fn selection(&self) -> Selection {
        self.selection
    }

    #[must_use]
    pub const fn pending(&self) -> Option<PendingSelection> {
        self.pending
    }

    pub fn open_placeholder(&mut self) -> Option<Selection> {
        self.pending = None;
        let changed = self.select(Selection::Placeholder)?;
        self.persist(LAST_GUILD_KEY, None);
        Some(changed)
    }

    pub fn open_dms(&mut self) -> Option<Selection> {
        self.pending = None;
        let changed = self.select(Selection::Dm(None))?;
        self.persist(LAST_GUILD_KEY, Some(0));
        Some(changed)
    }

    /// Opens a channel. An ID the cache does not know yet is kept pending.
    pub fn open_channel(&mut self, cache: &DomainCache, id: ChannelId) -> Option<Selection> {
        let Some(channel) = cache.visible_channel(id) else {
            debug!(channel = %id, "channel not cached yet, selection pending");
            self.pending = Some(PendingSelection::Channel(id));
            return None;
        };
        self.pending = None;

        match channel.guild_id() {
            None => {
                let changed = self.select(Selection::Dm(Some(id)))?;
                self.persist(LAST_DM_KEY, Some(id.as_u64()));
                Some(changed)
            }
            Some(guild) => {
                let changed = self.select(Selection::Guild(guild, Some(id)))?;
                self.persist(LAST_GUILD_KEY, Some(guild.as_u64()));
                self.persist(&last_channel_key(guild.as_u64()), Some(id.as_u64()));
                Some(changed)
            }
        }
    }

    /// Opens a guild on the channel last opened in it.
    pub fn open_guild(&mut self, cache: &DomainCache, id: GuildId) -> Option<Selection> {
        if cache.guild(id).is_none() {
            debug!(guild = %id, "guild not cached yet, selection pending");
            self.pending = Some(PendingSelection::Guild(id));
            return None;
        }
        self.pending = None;

        let changed = self.select(Selection::Guild(id, self.last_channel(cache, id)))?;
        self.persist(LAST_GUILD_KEY, Some(id.as_u64()));
        Some(changed)
    }

    /// Falls back to the placeholder if `id` is selected. Not persisted.
    pub fn channel_removed(&mut self, id: ChannelId) -> Option<Selection> {
        if self.pending == Some(PendingSelection::Channel(id)) {
            self.pending = None;
        }
        if !self.selection.is_channel(id) {
            return None;
        }
        self.select(Selection::Placeholder)
    }

    /// Falls back to the placeholder if `id` is selected. Not persisted.
    pub fn guild_unavailable(&mut self, id: GuildId) -> Option<Selection> {
        if self.selection.guild() != Some(id) {
            return None;
        }
        self.select(Selection::Placeholder)
    }

    /// Restores the persisted selection once, after the first `Ready`.
    pub fn restore(&mut self, cache: &DomainCache) -> Option<Selection> {
        if std::mem::replace(&mut self.restored, true) {
            return None;
        }

        match self.stored_id(LAST_GUILD_KEY) {
            None | Some(0) => {
                let last_dm = self.stored_id(LAST_DM_KEY).map(ChannelId);
                let channel = match last_dm {
                    Some(dm) if cache.is_visible(dm) => Some(dm),
                    Some(dm) => {
                        self.pending = Some(PendingSelection::Channel(dm));
                        None
                    }
                    None => None,
                };
                debug!(?channel, "restoring direct messages");
                self.select(Selection::Dm(channel))
            }
            Some(raw) => {
                let guild = GuildId(raw);
                if cache.guild(guild).is_none() {
                    debug!(%guild, "restored guild not cached yet");
                    self.pending = Some(PendingSelection::Guild(guild));
                    return None;
                }
                debug!(%guild, "restoring guild");
                self.select(Selection::Guild(guild, self.last_channel(cache, guild)))
            }
        }
    }

    /// Returns to the placeholder after a logout and re-arms `restore` for
    /// the next session. Persisted keys are left alone.
    pub fn reset(&mut self) -> Option<Selection> {
        self.pending = None;
        self.restored = false;
        self.select(Selection::Placeholder)
    }

    /// Forgets an unresolved selection, as when the session scope ends.
    pub fn drop_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!(?pending, "dropping unresolved selection");
        }
    }

    /// Reacts to a derived event.
    pub fn on_event(&mut self, cache: &DomainCache, event: &CoreEvent) -> Option<Selection> {
        match event {
            CoreEvent::CacheReset => {
                let restored = self.restore(cache).is_some();
                let resolved = self.resolve_pending(cache).is_some();
                let dropped = self.drop_stale(cache).is_some();
                (restored || resolved || dropped).then_some(self.selection)
            }
            CoreEvent::ChannelListInvalidated(_) | CoreEvent::GuildInvalidated(_) => {
                self.resolve_pending(cache)
            }
            CoreEvent::ChannelRemoved { channel_id, .. } => self.channel_removed(*channel_id),
            CoreEvent::GuildUnavailable(guild) | CoreEvent::GuildRemoved(guild) => {
                self.guild_unavailable(*guild)
            }
            _ => None,
        }
    }

    fn resolve_pending(&mut self, cache: &DomainCache) -> Option<Selection> {
        match self.pending? {
            PendingSelection::Channel(id) if cache.is_visible(id) => self.open_channel(cache, id),
            PendingSelection::Guild(id) if cache.guild(id).is_some() => self.open_guild(cache, id),
            _ => None,
        }
    }

    /// After a fresh `Ready` the selected channel may be gone.
    fn drop_stale(&mut self, cache: &DomainCache) -> Option<Selection> {
        let channel_gone = self
            .selection
            .channel()
            .is_some_and(|id| !cache.is_visible(id));
        let guild_gone = self
            .selection
            .guild()
            .is_some_and(|id| cache.guild(id).is_none());

        if channel_gone || guild_gone {
            self.select(Selection::Placeholder)
        } else {
            None
        }
    }

    fn select(&mut self, next: Selection) -> Option<Selection> {
        if self.selection == next {
            return None;
        }
        debug!(from = ?self.selection, to = ?next, "selection changed");
        self.selection = next;
        Some(next)
    }

    fn last_channel(&self, cache: &DomainCache, guild: GuildId) -> Option<ChannelId> {
        self.stored_id(&last_channel_key(guild.as_u64()))
            .map(ChannelId)
            .filter(|id| {
                cache
                    .visible_channel(*id)
                    .is_some_and(|c| c.guild_id() == Some(guild))
            })
    }

    fn stored_id(&self, key: &str) -> Option<u64> {
        let raw = self.store.get(key)?;
        match raw.parse() {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(key, value = %raw, error = %e, "ignoring malformed stored id");
                None
            }
        }
    }

    fn persist(&self, key: &str, value: Option<u64>) {
        let value = value.map(|v| v.to_string());
        if let Err(e) = self.store.set(key, value.as_deref()) {
            warn!(key, error = %e, "failed to persist navigation state");
        }
    }
}
