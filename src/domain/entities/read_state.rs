//! Read state entity.

use serde::{Deserialize, Serialize};

use super::{ChannelId, MessageId};

/// Per-channel read marker and mention counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadState {
    /// Channel ID.
    #[serde(alias = "id")]
    pub channel_id: ChannelId,
    /// ID of the last read message.
    #[serde(default)]
    pub last_read_message_id: Option<MessageId>,
    /// Number of mentions since the last read message.
    #[serde(default)]
    pub mention_count: u32,
}

impl ReadState {
    /// Creates a new read state.
    #[must_use]
    pub fn new(channel_id: ChannelId, last_read_message_id: Option<MessageId>) -> Self {
        Self {
            channel_id,
            last_read_message_id,
            mention_count: 0,
        }
    }

    /// Sets the mention count.
    #[must_use]
    pub const fn with_mention_count(mut self, count: u32) -> Self {
        self.mention_count = count;
        self
    }

    /// Returns the last read message when it is a valid ID.
    #[must_use]
    pub fn last_read(&self) -> Option<MessageId> {
        self.last_read_message_id.filter(|id| id.is_valid())
    }

    /// Returns true if `last_message` is newer than the read marker.
    #[must_use]
    pub fn is_behind(&self, last_message: Option<MessageId>) -> bool {
        match (last_message.filter(|id| id.is_valid()), self.last_read()) {
            (Some(last), Some(read)) => last > read,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// Moves the read marker to `id` and clears mentions.
    pub fn mark_read(&mut self, id: MessageId) {
        if self.last_read().is_none_or(|read| read < id) {
            self.last_read_message_id = Some(id);
        }
        self.mention_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_behind() {
        let state = ReadState::new(ChannelId(1), Some(MessageId(500)));
        assert!(state.is_behind(Some(MessageId(600))));
        assert!(!state.is_behind(Some(MessageId(500))));
        assert!(!state.is_behind(None));

        let empty = ReadState::new(ChannelId(1), None);
        assert!(empty.is_behind(Some(MessageId(1))));
        assert!(!empty.is_behind(None));
    }

    #[test]
    fn test_mark_read_never_moves_back() {
        let mut state = ReadState::new(ChannelId(1), Some(MessageId(500))).with_mention_count(2);
        state.mark_read(MessageId(400));
        assert_eq!(state.last_read(), Some(MessageId(500)));
        assert_eq!(state.mention_count, 0);

        state.mark_read(MessageId(700));
        assert_eq!(state.last_read(), Some(MessageId(700)));
    }
}
