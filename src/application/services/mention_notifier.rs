use std::rc::Rc;

use tracing::{debug, warn};

use crate::application::state::DomainCache;
use crate::domain::entities::{Message, Status};
use crate::domain::ports::{Notification, NotificationPort, OpenChannelAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationSettings {
    pub enabled: bool,
    pub suppress_in_dnd: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            suppress_in_dnd: true,
        }
    }
}

/// Turns incoming mentions into desktop notifications.
pub struct MentionNotifier {
    port: Rc<dyn NotificationPort>,
    settings: NotificationSettings,
}

impl MentionNotifier {
    #[must_use]
    pub fn new(port: Rc<dyn NotificationPort>, settings: NotificationSettings) -> Self {
        Self { port, settings }
    }

    /// Builds the notification for `message`, if it warrants one.
    #[must_use]
    pub fn notification_for(&self, cache: &DomainCache, message: &Message) -> Option<Notification> {
        if !self.settings.enabled {
            return None;
        }
        let me = cache.me()?.id();
        if message.author().id() == me || !cache.mentions_me(message) {
            return None;
        }
        if self.settings.suppress_in_dnd && cache.self_status() == Status::DoNotDisturb {
            debug!(message = %message.id(), "mention suppressed by do not disturb");
            return None;
        }
        let channel = cache.channel(message.channel_id())?;

        Some(Notification {
            title: format!(
                "{} ({})",
                message.author().display_name(),
                channel.display_name()
            ),
            body: message.preview(),
            icon_url: message.author().avatar_url().map(str::to_string),
            action: OpenChannelAction {
                channel_id: message.channel_id(),
                message_id: message.id(),
            },
        })
    }

    /// Sends the notification for `message`. Returns true if one was shown.
    pub fn on_message(&self, cache: &DomainCache, message: &Message) -> bool {
        let Some(notification) = self.notification_for(cache, message) else {
            return false;
        };
        match self.port.send(notification) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to show notification");
                false
            }
        }
    }
}
