//! Externally visible connection lifecycle with the reconnect grace period.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::{debug, info};

use crate::application::runtime::{EventBus, LoopHandle, TaskHandle};
use crate::domain::connection::{CloseDisposition, ConnectionStatus};
use crate::domain::events::{CoreEvent, GatewayEvent};

/// Delay before a dropped connection is shown as reconnecting.
pub const DEFAULT_RECONNECT_GRACE: Duration = Duration::from_secs(3);

struct MonitorInner {
    status: Cell<ConnectionStatus>,
    grace: Duration,
    timer: RefCell<Option<TaskHandle>>,
    bus: EventBus,
    handle: LoopHandle,
}

/// Tracks the session state the window shows and publishes
/// `ConnectionChanged` on every transition.
#[derive(Clone)]
pub struct ConnectionMonitor {
    inner: Rc<MonitorInner>,
}

impl ConnectionMonitor {
    #[must_use]
    pub fn new(bus: EventBus, handle: LoopHandle, grace: Duration) -> Self {
        Self {
            inner: Rc::new(MonitorInner {
                status: Cell::new(ConnectionStatus::Disconnected),
                grace,
                timer: RefCell::new(None),
                bus,
                handle,
            }),
        }
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.inner.status.get()
    }

    /// Returns true while the grace timer is armed.
    #[must_use]
    pub fn grace_pending(&self) -> bool {
        self.inner
            .timer
            .borrow()
            .as_ref()
            .is_some_and(TaskHandle::is_pending)
    }

    /// Login or start-up with a stored token.
    pub fn begin_connecting(&self) {
        if matches!(
            self.status(),
            ConnectionStatus::Disconnected | ConnectionStatus::LoggedOut
        ) {
            set_status(&self.inner, ConnectionStatus::Connecting);
        }
    }

    /// Reacts to a gateway event. Returns how a transport close was
    /// classified, so the caller can clear the session on logout.
    pub fn on_gateway(&self, event: &GatewayEvent) -> Option<CloseDisposition> {
        match event {
            GatewayEvent::Ready(_) | GatewayEvent::Resumed => {
                self.cancel_grace();
                set_status(&self.inner, ConnectionStatus::Connected);
                None
            }
            GatewayEvent::TransportClosed { code } => {
                let disposition = CloseDisposition::from_code(*code);
                if disposition.is_logout() {
                    info!(?code, ?disposition, "session closed by server");
                    self.cancel_grace();
                    set_status(&self.inner, ConnectionStatus::LoggedOut);
                } else {
                    self.on_transient_close(*code);
                }
                Some(disposition)
            }
            _ => None,
        }
    }

    /// Local logout.
    pub fn logout(&self) {
        self.cancel_grace();
        set_status(&self.inner, ConnectionStatus::LoggedOut);
    }

    fn on_transient_close(&self, code: Option<u16>) {
        if self.status() != ConnectionStatus::Connected {
            debug!(?code, status = %self.status(), "close while not connected");
            return;
        }
        if self.grace_pending() {
            debug!(?code, "close during grace period, keeping timer");
            return;
        }

        debug!(?code, grace = ?self.inner.grace, "transport closed, starting grace timer");
        let weak: Weak<MonitorInner> = Rc::downgrade(&self.inner);
        let timer = self.inner.handle.timeout(self.inner.grace, move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            inner.timer.borrow_mut().take();
            if inner.status.get() == ConnectionStatus::Connected {
                set_status(&inner, ConnectionStatus::Reconnecting);
            }
        });
        *self.inner.timer.borrow_mut() = Some(timer);
    }

    fn cancel_grace(&self) {
        let timer = self.inner.timer.borrow_mut().take();
        if let Some(timer) = timer {
            timer.cancel();
            debug!("grace timer cancelled");
        }
    }
}

fn set_status(inner: &MonitorInner, status: ConnectionStatus) {
    let previous = inner.status.replace(status);
    if previous == status {
        return;
    }
    info!(from = %previous, to = %status, "connection state changed");
    inner.bus.publish(CoreEvent::ConnectionChanged(status));
}
