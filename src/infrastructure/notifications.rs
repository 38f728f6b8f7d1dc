//! System notifications with conditional compilation.

use tokio::sync::mpsc;

use crate::domain::ports::OpenChannelAction;

/// Sender for notification clicks; the receiving end opens the channel.
pub type ClickSender = mpsc::UnboundedSender<OpenChannelAction>;

/// Desktop notification service.
#[cfg(feature = "notify")]
mod notify_impl {
    use super::ClickSender;
    use crate::domain::errors::NotifyError;
    use crate::domain::ports::{Notification, NotificationPort};
    use tracing::{debug, warn};

    #[derive(Debug, Clone, Default)]
    pub struct DesktopNotifier {
        clicks: Option<ClickSender>,
    }

    impl DesktopNotifier {
        #[must_use]
        pub fn new(clicks: Option<ClickSender>) -> Self {
            Self { clicks }
        }
    }

    impl NotificationPort for DesktopNotifier {
        fn send(&self, notification: Notification) -> Result<(), NotifyError> {
            let runtime = tokio::runtime::Handle::try_current()
                .map_err(|e| NotifyError(e.to_string()))?;
            let clicks = self.clicks.clone();
            debug!(title = %notification.title, "showing notification");
            runtime.spawn_blocking(move || show(&notification, clicks));
            Ok(())
        }
    }

    fn show(notification: &Notification, clicks: Option<ClickSender>) {
        let mut desktop = notify_rust::Notification::new();
        desktop
            .summary(&notification.title)
            .body(&notification.body)
            .appname("cordsync");
        #[cfg(all(unix, not(target_os = "macos")))]
        desktop.action("default", "Open");

        match desktop.show() {
            #[cfg(all(unix, not(target_os = "macos")))]
            Ok(handle) => {
                let Some(clicks) = clicks else {
                    return;
                };
                let action = notification.action;
                handle.wait_for_action(|id| {
                    if id == "default" {
                        let _ = clicks.send(action);
                    }
                });
            }
            #[cfg(not(all(unix, not(target_os = "macos"))))]
            Ok(_) => drop(clicks),
            Err(e) => warn!("Failed to show notification: {}", e),
        }
    }
}

/// Stub notification service when notify feature is disabled.
#[cfg(not(feature = "notify"))]
mod stub_impl {
    use super::ClickSender;
    use crate::domain::errors::NotifyError;
    use crate::domain::ports::{Notification, NotificationPort};

    #[derive(Debug, Clone, Default)]
    pub struct DesktopNotifier;

    impl DesktopNotifier {
        #[must_use]
        pub fn new(_clicks: Option<ClickSender>) -> Self {
            Self
        }
    }

    impl NotificationPort for DesktopNotifier {
        fn send(&self, notification: Notification) -> Result<(), NotifyError> {
            tracing::debug!(title = %notification.title, "notifications disabled at build time");
            Ok(())
        }
    }
}

#[cfg(feature = "notify")]
pub use notify_impl::DesktopNotifier;
#[cfg(not(feature = "notify"))]
pub use stub_impl::DesktopNotifier;
