//! Transport port.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::entities::{AuthToken, Status};
use crate::domain::errors::AuthError;
use crate::domain::events::GatewayEvent;

/// Request the core hands to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCommand {
    /// Publish a new status for the local user.
    UpdateStatus(Status),
    /// Close the session for good.
    Logout,
}

/// Library that owns the socket, decodes events and retries on its own.
#[async_trait]
pub trait GatewayPort: Send {
    /// Opens a session and returns the stream of decoded events.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the session cannot be started.
    async fn connect(
        &mut self,
        token: &AuthToken,
    ) -> Result<mpsc::UnboundedReceiver<GatewayEvent>, AuthError>;

    /// Forwards a command to the remote side.
    async fn send(&mut self, command: GatewayCommand);

    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;
}
