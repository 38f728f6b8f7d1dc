//! Quick switcher: fuzzy jump to any channel, DM or guild.

use std::cmp::Reverse;
use std::sync::Arc;

use tracing::debug;

use crate::application::runtime::{LoopHandle, Scope, TaskHandle};
use crate::application::state::DomainCache;
use crate::domain::entities::{Channel, ChannelKind};
use crate::domain::search::{FuzzyScorer, SearchItem, SearchKind, SearchResult, SearchTarget};

/// Result caps per section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitcherLimits {
    pub channels: usize,
    pub guilds: usize,
}

impl Default for SwitcherLimits {
    fn default() -> Self {
        Self {
            channels: 15,
            guilds: 10,
        }
    }
}

/// Ranked matches, best first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwitcherResults {
    pub channels: Vec<SearchResult>,
    pub guilds: Vec<SearchResult>,
}

impl SwitcherResults {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() && self.guilds.is_empty()
    }

    /// Best match overall, channels first.
    #[must_use]
    pub fn first(&self) -> Option<&SearchResult> {
        self.channels.first().or_else(|| self.guilds.first())
    }
}

/// Snapshot of everything the switcher can open. Built on the UI loop,
/// searched off it.
#[derive(Debug, Clone, Default)]
pub struct SwitcherIndex {
    items: Vec<SearchItem>,
}

impl SwitcherIndex {
    #[must_use]
    pub fn build(cache: &DomainCache) -> Self {
        let mut items: Vec<SearchItem> = cache
            .private_channels()
            .into_iter()
            .map(|c| {
                let name = c.display_name();
                SearchItem::channel(c.id(), SearchKind::Dm, &name, &name, None)
            })
            .collect();

        let mut guilds: Vec<_> = cache.guilds().collect();
        guilds.sort_by_key(|g| g.id());

        for guild in guilds {
            for channel in cache.channels_in(guild.id(), &[]) {
                if matches!(channel.kind(), ChannelKind::Category | ChannelKind::Forum) {
                    continue;
                }
                let display = channel.display_name();
                items.push(SearchItem::channel(
                    channel.id(),
                    search_kind(channel),
                    &display,
                    channel.name().unwrap_or(display.as_str()),
                    Some(guild.display_name()),
                ));
            }
            items.push(SearchItem::guild(guild.id(), guild.display_name()));
        }

        Self { items }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Scores every row against `query`. A blank query matches nothing.
    #[must_use]
    pub fn search(
        &self,
        scorer: &dyn FuzzyScorer,
        query: &str,
        limits: SwitcherLimits,
    ) -> SwitcherResults {
        let query = query.trim();
        if query.is_empty() {
            return SwitcherResults::default();
        }

        let mut channels = Vec::new();
        let mut guilds = Vec::new();
        for item in &self.items {
            let Some(score) = scorer.score(&item.haystack, query) else {
                continue;
            };
            let result = SearchResult {
                item: item.clone(),
                score,
            };
            match item.target {
                SearchTarget::Channel(_) => channels.push(result),
                SearchTarget::Guild(_) => guilds.push(result),
            }
        }

        // stable: equal scores keep index order
        channels.sort_by_key(|r| Reverse(r.score));
        guilds.sort_by_key(|r| Reverse(r.score));
        channels.truncate(limits.channels);
        guilds.truncate(limits.guilds);

        SwitcherResults { channels, guilds }
    }
}

fn search_kind(channel: &Channel) -> SearchKind {
    let kind = channel.kind();
    if kind.is_private() {
        SearchKind::Dm
    } else if kind.is_thread() {
        SearchKind::Thread
    } else if kind.is_voice() {
        SearchKind::Voice
    } else {
        SearchKind::Channel
    }
}

/// Switcher service shared by the session and the binary.
#[derive(Clone)]
pub struct QuickSwitcher {
    scorer: Arc<dyn FuzzyScorer>,
    limits: SwitcherLimits,
}

impl QuickSwitcher {
    #[must_use]
    pub fn new(scorer: Arc<dyn FuzzyScorer>, limits: SwitcherLimits) -> Self {
        Self { scorer, limits }
    }

    #[must_use]
    pub const fn limits(&self) -> SwitcherLimits {
        self.limits
    }

    /// Searches synchronously.
    #[must_use]
    pub fn search(&self, index: &SwitcherIndex, query: &str) -> SwitcherResults {
        index.search(self.scorer.as_ref(), query, self.limits)
    }

    /// Searches on a blocking worker and hands the results to `apply` on the
    /// UI loop, if `scope` is still live.
    pub fn search_in_background<A>(
        &self,
        handle: &LoopHandle,
        scope: &Scope,
        index: SwitcherIndex,
        query: String,
        apply: A,
    ) -> TaskHandle
    where
        A: FnOnce(SwitcherResults) + 'static,
    {
        let scorer = Arc::clone(&self.scorer);
        let limits = self.limits;
        debug!(rows = index.len(), %query, "quick switcher search");
        handle.run_blocking(
            scope,
            move || index.search(scorer.as_ref(), &query, limits),
            apply,
        )
    }
}
