//! Fuzzy scoring for the quick switcher.

use std::sync::Arc;

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::domain::search::FuzzyScorer;

/// Scorer using the Skim algorithm; smart case, so lowercase patterns
/// match case-insensitively.
#[derive(Clone)]
pub struct FuzzySearcher {
    matcher: Arc<SkimMatcherV2>,
}

impl Default for FuzzySearcher {
    fn default() -> Self {
        Self {
            matcher: Arc::new(SkimMatcherV2::default()),
        }
    }
}

impl FuzzySearcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl FuzzyScorer for FuzzySearcher {
    fn score(&self, choice: &str, pattern: &str) -> Option<i64> {
        self.matcher.fuzzy_match(choice, pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::{SwitcherIndex, SwitcherLimits};
    use crate::application::state::DomainCache;
    use crate::domain::entities::{Channel, ChannelId, ChannelKind, Guild, GuildId};
    use crate::domain::events::{GatewayEvent, GuildPayload, ReadyPayload};
    use crate::domain::search::SearchTarget;

    fn text(id: u64, guild: u64, name: &str) -> Channel {
        Channel::new(id, name, ChannelKind::Text).with_guild(guild)
    }

    fn cache() -> DomainCache {
        let mut rust_channels = vec![text(10, 1, "general")];
        rust_channels.extend((0..200).map(|i| text(1000 + i, 1, &format!("cargo-{i}"))));

        let mut cache = DomainCache::new();
        cache.apply(&GatewayEvent::Ready(Box::new(ReadyPayload {
            guilds: vec![
                GuildPayload::new(Guild::new(1_u64, "Rust"), rust_channels),
                GuildPayload::new(Guild::new(2_u64, "Go"), vec![text(20, 2, "general")]),
            ],
            ..ReadyPayload::default()
        })));
        cache
    }

    #[test]
    fn test_guild_prefix_wins() {
        let index = SwitcherIndex::build(&cache());
        let results = index.search(&FuzzySearcher::new(), "rust gen", SwitcherLimits::default());

        let targets: Vec<_> = results.channels.iter().map(|r| r.item.target).collect();
        let rust = targets.iter().position(|t| *t == SearchTarget::Channel(ChannelId(10)));
        let go = targets.iter().position(|t| *t == SearchTarget::Channel(ChannelId(20)));

        assert_eq!(rust, Some(0));
        assert!(go.is_none_or(|go| go > 0));
    }

    #[test]
    fn test_result_caps() {
        let index = SwitcherIndex::build(&cache());
        let results = index.search(&FuzzySearcher::new(), "go", SwitcherLimits::default());

        assert_eq!(results.channels.len(), 15);
        assert!(results.guilds.len() <= 10);
        assert!(
            results
                .guilds
                .iter()
                .any(|r| r.item.target == SearchTarget::Guild(GuildId(2)))
        );
    }

    #[test]
    fn test_no_match() {
        assert_eq!(FuzzySearcher::new().score("general", "xyz"), None);
        assert!(FuzzySearcher::new().score("Rust #general", "rgen").is_some());
    }
}
