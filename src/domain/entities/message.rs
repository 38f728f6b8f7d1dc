//! Message entity.

use serde::{Deserialize, Serialize};

use super::{ChannelId, GuildId, MediaEmbed, MessageId, RoleId, User, UserId};

/// File attached to a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    /// Original file name.
    pub filename: String,
    /// Download URL.
    pub url: String,
}

/// Message as delivered by `MessageCreate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    id: MessageId,
    channel_id: ChannelId,
    #[serde(default)]
    guild_id: Option<GuildId>,
    author: User,
    #[serde(default)]
    content: String,
    #[serde(default)]
    mentions: Vec<User>,
    #[serde(default)]
    mention_roles: Vec<RoleId>,
    #[serde(default)]
    mention_everyone: bool,
    #[serde(default)]
    attachments: Vec<Attachment>,
    #[serde(default)]
    embeds: Vec<MediaEmbed>,
}

impl Message {
    /// Creates a plain text message.
    #[must_use]
    pub fn new(
        id: impl Into<MessageId>,
        channel_id: impl Into<ChannelId>,
        author: User,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            channel_id: channel_id.into(),
            guild_id: None,
            author,
            content: content.into(),
            mentions: Vec::new(),
            mention_roles: Vec::new(),
            mention_everyone: false,
            attachments: Vec::new(),
            embeds: Vec::new(),
        }
    }

    /// Sets the guild the message was sent in.
    #[must_use]
    pub fn with_guild(mut self, guild_id: impl Into<GuildId>) -> Self {
        self.guild_id = Some(guild_id.into());
        self
    }

    /// Adds a mentioned user.
    #[must_use]
    pub fn with_mention(mut self, user: User) -> Self {
        self.mentions.push(user);
        self
    }

    /// Adds a mentioned role.
    #[must_use]
    pub fn with_mention_role(mut self, role: impl Into<RoleId>) -> Self {
        self.mention_roles.push(role.into());
        self
    }

    /// Sets the `@everyone` flag.
    #[must_use]
    pub const fn with_mention_everyone(mut self, everyone: bool) -> Self {
        self.mention_everyone = everyone;
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Adds a media embed.
    #[must_use]
    pub fn with_embed(mut self, embed: MediaEmbed) -> Self {
        self.embeds.push(embed);
        self
    }

    #[must_use]
    pub const fn id(&self) -> MessageId {
        self.id
    }

    #[must_use]
    pub const fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    #[must_use]
    pub fn guild_id(&self) -> Option<GuildId> {
        self.guild_id.filter(|id| id.is_valid())
    }

    #[must_use]
    pub const fn author(&self) -> &User {
        &self.author
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    #[must_use]
    pub fn embeds(&self) -> &[MediaEmbed] {
        &self.embeds
    }

    #[must_use]
    pub fn mention_roles(&self) -> &[RoleId] {
        &self.mention_roles
    }

    /// Returns true if the message addresses `user` directly, through one
    /// of `roles` (the user's roles in the message's guild), or via
    /// `@everyone`.
    #[must_use]
    pub fn mentions_user(&self, user: UserId, roles: &[RoleId]) -> bool {
        self.mention_everyone
            || self.mentions.iter().any(|u| u.id() == user)
            || self.mention_roles.iter().any(|r| roles.contains(r))
    }

    /// Short plain-text summary used in notifications.
    #[must_use]
    pub fn preview(&self) -> String {
        let content = self.content.trim_end_matches('\n');
        if !content.is_empty() {
            return content.to_string();
        }

        if !self.attachments.is_empty() {
            return self
                .attachments
                .iter()
                .map(|a| a.filename.as_str())
                .collect::<Vec<_>>()
                .join(", ");
        }

        if self.embeds.is_empty() {
            String::new()
        } else {
            "[embed]".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::EmbedKind;

    fn author() -> User {
        User::new(9_u64, "author")
    }

    #[test]
    fn test_mentions_user() {
        let me = User::new(1_u64, "me");
        let msg = Message::new(600_u64, 200_u64, author(), "hi").with_mention(me.clone());
        assert!(msg.mentions_user(me.id(), &[]));
        assert!(!msg.mentions_user(UserId(2), &[]));

        let everyone = Message::new(601_u64, 200_u64, author(), "all").with_mention_everyone(true);
        assert!(everyone.mentions_user(UserId(2), &[]));
    }

    #[test]
    fn test_mentions_through_role() {
        let msg = Message::new(600_u64, 200_u64, author(), "@mods").with_mention_role(7_u64);

        assert!(msg.mentions_user(UserId(1), &[RoleId(3), RoleId(7)]));
        assert!(!msg.mentions_user(UserId(1), &[RoleId(3)]));
        assert!(!msg.mentions_user(UserId(1), &[]));
    }

    #[test]
    fn test_preview_fallbacks() {
        let text = Message::new(1_u64, 2_u64, author(), "hello\n");
        assert_eq!(text.preview(), "hello");

        let files = Message::new(1_u64, 2_u64, author(), "")
            .with_attachment(Attachment {
                filename: "a.png".into(),
                url: "https://cdn/a.png".into(),
            })
            .with_attachment(Attachment {
                filename: "b.txt".into(),
                url: "https://cdn/b.txt".into(),
            });
        assert_eq!(files.preview(), "a.png, b.txt");

        let embed = Message::new(1_u64, 2_u64, author(), "")
            .with_embed(MediaEmbed::new(EmbedKind::Image, "https://x/y.png"));
        assert_eq!(embed.preview(), "[embed]");

        assert_eq!(Message::new(1_u64, 2_u64, author(), "").preview(), "");
    }
}
