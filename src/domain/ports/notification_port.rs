use serde::{Deserialize, Serialize};

use crate::domain::entities::{ChannelId, MessageId};
use crate::domain::errors::NotifyError;

/// Payload carried by a notification's default action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenChannelAction {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

/// Desktop notification for a mention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon_url: Option<String>,
    pub action: OpenChannelAction,
}

/// Port for system notifications.
pub trait NotificationPort {
    /// Shows a system notification.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError` if the desktop rejects it.
    fn send(&self, notification: Notification) -> Result<(), NotifyError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default, Clone)]
    pub struct MockNotificationPort {
        pub sent: Rc<RefCell<Vec<Notification>>>,
    }

    impl MockNotificationPort {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl NotificationPort for MockNotificationPort {
        fn send(&self, notification: Notification) -> Result<(), NotifyError> {
            self.sent.borrow_mut().push(notification);
            Ok(())
        }
    }
}
