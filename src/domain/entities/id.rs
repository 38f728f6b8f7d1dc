//! Snowflake identifiers.

use chrono::{DateTime, TimeZone, Utc};

/// Milliseconds between the Unix epoch and the first second of 2015.
pub const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;

/// Extracts the creation time embedded in a snowflake.
#[must_use]
pub fn snowflake_time(raw: u64) -> Option<DateTime<Utc>> {
    let millis = (raw >> 22).checked_add(DISCORD_EPOCH_MS)?;
    let millis = i64::try_from(millis).ok()?;
    Utc.timestamp_millis_opt(millis).single()
}

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(#[serde(with = "crate::domain::serde_utils::snowflake")] pub u64);

        impl $name {
            /// Returns the underlying u64 value.
            #[must_use]
            pub const fn as_u64(self) -> u64 {
                self.0
            }

            /// Zero is the null snowflake and never names an entity.
            #[must_use]
            pub const fn is_valid(self) -> bool {
                self.0 != 0
            }

            /// Returns the creation time embedded in the ID.
            #[must_use]
            pub fn created_at(self) -> Option<chrono::DateTime<chrono::Utc>> {
                snowflake_time(self.0)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }
    };
}

snowflake_id!(
    /// Unique identifier for a guild (server).
    GuildId
);
snowflake_id!(
    /// Unique identifier for a channel, thread or private conversation.
    ChannelId
);
snowflake_id!(
    /// Unique identifier for a message. Ordering follows creation time.
    MessageId
);
snowflake_id!(
    /// Unique identifier for a user.
    UserId
);
snowflake_id!(
    /// Unique identifier for a guild role.
    RoleId
);
snowflake_id!(
    /// Unique identifier for a sidebar folder. Zero marks a synthetic folder.
    FolderId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_extraction() {
        // 175928847299117063 was created 2016-04-30 11:18:25.796 UTC.
        let id = MessageId(175_928_847_299_117_063);
        let time = id.created_at().unwrap();
        assert_eq!(time.timestamp_millis(), 1_462_015_105_796);
    }

    #[test]
    fn test_ordering_follows_value() {
        assert!(MessageId(600) > MessageId(500));
        assert!(!ChannelId(0).is_valid());
        assert!(ChannelId(1).is_valid());
    }

    #[test]
    fn test_parse_and_display() {
        let id: GuildId = "100".parse().unwrap();
        assert_eq!(id, GuildId(100));
        assert_eq!(id.to_string(), "100");
        assert!("x".parse::<GuildId>().is_err());
    }

    #[test]
    fn test_serde_accepts_both_forms() {
        let a: ChannelId = serde_json::from_str("\"200\"").unwrap();
        let b: ChannelId = serde_json::from_str("200").unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"200\"");
    }
}
