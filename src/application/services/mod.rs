//! Services built on top of the session state.

pub mod embed_loader;
pub mod mention_notifier;
pub mod quick_switcher;

pub use embed_loader::{EmbedLoad, EmbedLoader, bind_playback};
pub use mention_notifier::{MentionNotifier, NotificationSettings};
pub use quick_switcher::{QuickSwitcher, SwitcherIndex, SwitcherLimits, SwitcherResults};
