//! Media embeds attached to messages.

use serde::{Deserialize, Serialize};

/// Kind of media an embed carries. Each kind loads and plays differently
/// but they share a single player surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedKind {
    Image,
    Gif,
    Gifv,
    Video,
    Audio,
}

impl EmbedKind {
    /// Cache directory the downloaded blob lives in.
    #[must_use]
    pub const fn cache_dir(self) -> &'static str {
        match self {
            Self::Image | Self::Gif => "images",
            Self::Gifv | Self::Video => "videos",
            Self::Audio => "audio",
        }
    }

    /// Kinds that start playing as soon as they are visible.
    #[must_use]
    pub const fn autoplays(self) -> bool {
        matches!(self, Self::Gif | Self::Gifv)
    }

    /// Kinds with a play/pause lifecycle.
    #[must_use]
    pub const fn is_playable(self) -> bool {
        !matches!(self, Self::Image)
    }
}

/// Embed reference as delivered in a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaEmbed {
    /// Media kind.
    #[serde(rename = "type")]
    pub kind: EmbedKind,
    /// Source URL.
    pub url: String,
}

impl MediaEmbed {
    /// Creates an embed reference.
    #[must_use]
    pub fn new(kind: EmbedKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
        }
    }
}

/// Where an embed sits in the message layout; decides how a failed fetch
/// is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EmbedPlacement {
    /// Decorative embed (link preview thumbnail and similar).
    pub can_hide: bool,
    /// The embed is the message body itself.
    pub primary: bool,
}

/// Rendering chosen for a failed media fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedFailureStyle {
    /// Remove the embed from the layout.
    Hide,
    /// Replace the media with an inline error label.
    InlineLabel,
    /// Show the generic missing-image icon.
    MissingIcon,
}

impl EmbedPlacement {
    /// Picks the failure rendering for this placement.
    #[must_use]
    pub const fn failure_style(self) -> EmbedFailureStyle {
        if self.can_hide {
            EmbedFailureStyle::Hide
        } else if self.primary {
            EmbedFailureStyle::InlineLabel
        } else {
            EmbedFailureStyle::MissingIcon
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(true, false, EmbedFailureStyle::Hide; "decorative")]
    #[test_case(true, true, EmbedFailureStyle::Hide; "decorative wins")]
    #[test_case(false, true, EmbedFailureStyle::InlineLabel; "primary body")]
    #[test_case(false, false, EmbedFailureStyle::MissingIcon; "other")]
    fn test_failure_style(can_hide: bool, primary: bool, expected: EmbedFailureStyle) {
        let placement = EmbedPlacement { can_hide, primary };
        assert_eq!(placement.failure_style(), expected);
    }

    #[test]
    fn test_cache_dirs() {
        assert_eq!(EmbedKind::Image.cache_dir(), "images");
        assert_eq!(EmbedKind::Video.cache_dir(), "videos");
        assert_eq!(EmbedKind::Audio.cache_dir(), "audio");
        assert!(EmbedKind::Gifv.autoplays());
        assert!(!EmbedKind::Image.is_playable());
    }
}
