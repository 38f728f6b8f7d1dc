mod gateway_port;
mod media_port;
mod notification_port;
mod observers;
mod state_store_port;
mod token_storage_port;

pub use gateway_port::{GatewayCommand, GatewayPort};
pub use media_port::{MediaSource, Progress};
pub use notification_port::{Notification, NotificationPort, OpenChannelAction};
pub use observers::{
    ChannelListObserver, ConnectionObserver, EmbedPlayer, PresenceObserver, SelectionObserver,
    UnreadObserver,
};
pub use state_store_port::{KeyValueStore, LAST_DM_KEY, LAST_GUILD_KEY, last_channel_key};
pub use token_storage_port::TokenStoragePort;

#[cfg(test)]
pub mod mocks {
    pub use super::notification_port::mock::MockNotificationPort;
    pub use super::observers::{
        MockChannelListObserver, MockConnectionObserver, MockEmbedPlayer, MockPresenceObserver,
        MockSelectionObserver, MockUnreadObserver,
    };
    pub use super::state_store_port::mock::MemoryStore;
    pub use super::token_storage_port::mock::MockTokenStorage;
}
