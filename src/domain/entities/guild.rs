//! Guild and sidebar folder entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{FolderId, GuildId};

const FOLDER_NAME_LIMIT: usize = 40;

/// Guild (server) as mirrored from the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Guild {
    id: GuildId,
    name: String,
    #[serde(default)]
    icon_url: Option<String>,
    #[serde(default)]
    joined_at: Option<DateTime<Utc>>,
    #[serde(default = "available_by_default")]
    available: bool,
}

fn available_by_default() -> bool {
    true
}

impl Guild {
    /// Creates a new available guild with the given ID and name.
    #[must_use]
    pub fn new(id: impl Into<GuildId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            icon_url: None,
            joined_at: None,
            available: true,
        }
    }

    /// Sets the guild icon URL.
    #[must_use]
    pub fn with_icon_url(mut self, url: impl Into<String>) -> Self {
        self.icon_url = Some(url.into());
        self
    }

    /// Sets when the local user joined the guild.
    #[must_use]
    pub const fn with_joined_at(mut self, joined_at: DateTime<Utc>) -> Self {
        self.joined_at = Some(joined_at);
        self
    }

    /// Returns the guild ID.
    #[must_use]
    pub const fn id(&self) -> GuildId {
        self.id
    }

    /// Returns the guild name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name shown in lists, replaced while the guild is in an outage.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.available {
            &self.name
        } else {
            "(guild unavailable)"
        }
    }

    /// Returns the icon URL, if any.
    #[must_use]
    pub fn icon_url(&self) -> Option<&str> {
        self.icon_url.as_deref()
    }

    /// Returns the join timestamp, if known.
    #[must_use]
    pub const fn joined_at(&self) -> Option<DateTime<Utc>> {
        self.joined_at
    }

    /// Returns whether the guild is currently reachable.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.available
    }

    /// Marks the guild as unavailable, keeping its row.
    pub fn mark_unavailable(&mut self) {
        self.available = false;
    }

    /// Applies an update, keeping fields the update does not carry.
    pub fn merge(&mut self, update: Self) {
        self.name = update.name;
        self.icon_url = update.icon_url.or(self.icon_url.take());
        self.joined_at = update.joined_at.or(self.joined_at);
        self.available = true;
    }
}

/// User-ordered group of guilds in the sidebar.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Folder {
    /// Folder ID; absent or zero for single-guild wrappers.
    #[serde(default)]
    pub id: Option<FolderId>,
    /// User-assigned name.
    #[serde(default)]
    pub name: Option<String>,
    /// RGB color.
    #[serde(default)]
    pub color: Option<u32>,
    /// Guilds in display order.
    #[serde(default)]
    pub guild_ids: Vec<GuildId>,
}

impl Folder {
    /// Creates a real folder with the given guilds.
    #[must_use]
    pub fn new(id: impl Into<FolderId>, guild_ids: Vec<GuildId>) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
            color: None,
            guild_ids,
        }
    }

    /// Creates the wrapper the protocol uses for an unfoldered guild.
    #[must_use]
    pub fn single(guild_id: GuildId) -> Self {
        Self {
            id: None,
            name: None,
            color: None,
            guild_ids: vec![guild_id],
        }
    }

    /// Sets the folder name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns true for protocol wrappers that render as a bare guild.
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.id.is_none_or(|id| !id.is_valid())
    }

    /// Returns the folder name, falling back to its guilds' names.
    pub fn display_name<'a, F>(&self, guild_name: F) -> String
    where
        F: Fn(GuildId) -> Option<&'a str>,
    {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }

        let joined = self
            .guild_ids
            .iter()
            .filter_map(|id| guild_name(*id))
            .collect::<Vec<_>>()
            .join(", ");

        if joined.chars().count() > FOLDER_NAME_LIMIT {
            let truncated: String = joined.chars().take(FOLDER_NAME_LIMIT).collect();
            format!("{truncated}...")
        } else {
            joined
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_unavailable_display_name() {
        let mut guild = Guild::new(100_u64, "Rust");
        assert_eq!(guild.display_name(), "Rust");

        guild.mark_unavailable();
        assert!(!guild.is_available());
        assert_eq!(guild.display_name(), "(guild unavailable)");
        assert_eq!(guild.name(), "Rust");
    }

    #[test]
    fn test_merge_keeps_join_time() {
        let joined = Utc::now();
        let mut guild = Guild::new(1_u64, "Old").with_joined_at(joined);
        guild.mark_unavailable();

        guild.merge(Guild::new(1_u64, "New"));

        assert_eq!(guild.name(), "New");
        assert_eq!(guild.joined_at(), Some(joined));
        assert!(guild.is_available());
    }

    #[test]
    fn test_synthetic_folders() {
        assert!(Folder::single(GuildId(1)).is_synthetic());
        assert!(Folder::new(0_u64, vec![GuildId(1)]).is_synthetic());
        assert!(!Folder::new(7_u64, vec![GuildId(1)]).is_synthetic());
    }

    #[test]
    fn test_folder_name_fallback() {
        let names: HashMap<GuildId, &str> = [
            (GuildId(1), "Rustaceans United"),
            (GuildId(2), "Gophers"),
            (GuildId(3), "The Functional Programming Guild"),
        ]
        .into_iter()
        .collect();

        let folder = Folder::new(9_u64, vec![GuildId(1), GuildId(2)]);
        assert_eq!(
            folder.display_name(|id| names.get(&id).copied()),
            "Rustaceans United, Gophers"
        );

        let long = Folder::new(9_u64, vec![GuildId(1), GuildId(2), GuildId(3)]);
        let name = long.display_name(|id| names.get(&id).copied());
        assert!(name.ends_with("..."));
        assert_eq!(name.chars().count(), 43);

        let named = Folder::new(9_u64, vec![GuildId(1)]).with_name("Work");
        assert_eq!(named.display_name(|_| None), "Work");
    }
}
