//! Event bus and dispatcher.
//!
//! Delivery is synchronous on the UI loop. Events published while a
//! dispatch is running are queued and delivered after it, so every
//! subscriber observes the same total order.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe, Location};
use std::rc::{Rc, Weak};

use tracing::{error, trace, warn};

use super::scope::{Scope, Teardown};
use crate::domain::errors::HandlerError;
use crate::domain::events::{Event, EventKinds};

type Handler = Box<dyn FnMut(&Event) -> Result<(), HandlerError>>;

struct Subscriber {
    id: u64,
    kinds: EventKinds,
    origin: &'static Location<'static>,
    active: Cell<bool>,
    handler: Rc<RefCell<Handler>>,
}

#[derive(Default)]
struct BusInner {
    subscribers: RefCell<Vec<Rc<Subscriber>>>,
    queue: RefCell<VecDeque<Event>>,
    dispatching: Cell<bool>,
    next_id: Cell<u64>,
}

impl BusInner {
    fn attach(
        &self,
        kinds: EventKinds,
        origin: &'static Location<'static>,
        handler: Rc<RefCell<Handler>>,
    ) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.subscribers.borrow_mut().push(Rc::new(Subscriber {
            id,
            kinds,
            origin,
            active: Cell::new(true),
            handler,
        }));
        trace!(id, %origin, "subscriber attached");
        id
    }

    fn detach(&self, id: u64) {
        self.subscribers.borrow_mut().retain(|sub| {
            if sub.id == id {
                sub.active.set(false);
                false
            } else {
                true
            }
        });
        trace!(id, "subscriber detached");
    }

    fn deliver(&self, event: &Event) {
        let kind = event.kind();
        let targets: Vec<Rc<Subscriber>> = self
            .subscribers
            .borrow()
            .iter()
            .filter(|sub| sub.kinds.accepts(kind))
            .cloned()
            .collect();

        trace!(?kind, subscribers = targets.len(), "dispatching event");

        for sub in targets {
            // detached by an earlier handler of this same event
            if !sub.active.get() {
                continue;
            }

            let Ok(mut handler) = sub.handler.try_borrow_mut() else {
                error!(origin = %sub.origin, ?kind, "handler re-entered, skipping");
                continue;
            };

            match panic::catch_unwind(AssertUnwindSafe(|| (&mut **handler)(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(origin = %sub.origin, ?kind, error = %e, "event handler failed");
                }
                Err(payload) => {
                    error!(
                        origin = %sub.origin,
                        ?kind,
                        panic = %panic_message(payload.as_ref()),
                        "event handler panicked"
                    );
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

struct DispatchGuard<'a>(&'a Cell<bool>);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Fan-out of events to scope-bound, kind-filtered handlers.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<BusInner>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `handler` for as long as `scope` is live.
    ///
    /// The handler is attached each time the scope is renewed and detached
    /// when it goes dormant. An empty `kinds` set receives every event.
    /// Dropping the returned handle does not unsubscribe; the scope owns
    /// the subscription.
    #[track_caller]
    pub fn subscribe<F>(&self, scope: &Scope, kinds: EventKinds, handler: F) -> Subscription
    where
        F: FnMut(&Event) -> Result<(), HandlerError> + 'static,
    {
        let origin = Location::caller();
        let handler: Rc<RefCell<Handler>> = Rc::new(RefCell::new(Box::new(handler)));
        let revoked = Rc::new(Cell::new(false));
        let attached = Rc::new(Cell::new(None));

        let bus = Rc::downgrade(&self.inner);
        let setup_revoked = Rc::clone(&revoked);
        let setup_attached = Rc::clone(&attached);

        scope.on_renew(move || -> Teardown {
            let Some(inner) = bus.upgrade() else {
                return Box::new(|| {});
            };
            if setup_revoked.get() {
                return Box::new(|| {});
            }

            let id = inner.attach(kinds, origin, Rc::clone(&handler));
            setup_attached.set(Some(id));

            let bus = Weak::clone(&bus);
            let attached = Rc::clone(&setup_attached);
            Box::new(move || {
                if let Some(inner) = bus.upgrade() {
                    inner.detach(id);
                }
                attached.set(None);
            })
        });

        Subscription {
            bus: Rc::downgrade(&self.inner),
            revoked,
            attached,
        }
    }

    /// Publishes an event to every live subscriber whose filter matches.
    pub fn publish(&self, event: impl Into<Event>) {
        self.inner.queue.borrow_mut().push_back(event.into());

        if self.inner.dispatching.replace(true) {
            return;
        }
        let _guard = DispatchGuard(&self.inner.dispatching);

        loop {
            let next = self.inner.queue.borrow_mut().pop_front();
            let Some(event) = next else {
                break;
            };
            self.inner.deliver(&event);
        }
    }

    /// Returns true while a dispatch is running.
    #[must_use]
    pub fn is_dispatching(&self) -> bool {
        self.inner.dispatching.get()
    }

    /// Number of currently attached handlers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }
}

/// Handle to a scope-bound subscription.
pub struct Subscription {
    bus: Weak<BusInner>,
    revoked: Rc<Cell<bool>>,
    attached: Rc<Cell<Option<u64>>>,
}

impl Subscription {
    /// Detaches the handler and prevents the scope from re-attaching it.
    pub fn unsubscribe(&self) {
        self.revoked.set(true);
        if let (Some(id), Some(inner)) = (self.attached.take(), self.bus.upgrade()) {
            inner.detach(id);
        }
    }

    /// Returns true while the handler receives events.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::GuildId;
    use crate::domain::events::{CoreEvent, GatewayEvent};

    fn recorder(log: &Rc<RefCell<Vec<String>>>, tag: &'static str) -> impl FnMut(&Event) -> Result<(), HandlerError> + 'static {
        let log = Rc::clone(log);
        move |event: &Event| {
            log.borrow_mut().push(format!("{tag}:{:?}", event.kind()));
            Ok(())
        }
    }

    #[test]
    fn test_filter_and_order() {
        let bus = EventBus::new();
        let scope = Scope::visible();
        let log = Rc::new(RefCell::new(Vec::new()));

        bus.subscribe(&scope, EventKinds::READY, recorder(&log, "a"));
        bus.subscribe(&scope, EventKinds::empty(), recorder(&log, "b"));

        bus.publish(GatewayEvent::Resumed);
        bus.publish(GatewayEvent::Ready(Box::default()));

        assert_eq!(
            *log.borrow(),
            ["b:EventKinds(RESUMED)", "a:EventKinds(READY)", "b:EventKinds(READY)"]
        );
    }

    #[test]
    fn test_dormant_scope_receives_nothing() {
        let bus = EventBus::new();
        let scope = Scope::visible();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        bus.subscribe(&scope, EventKinds::CACHE_RESET, move |_| {
            c.set(c.get() + 1);
            Ok(())
        });

        bus.publish(CoreEvent::CacheReset);
        scope.set_visible(false);
        bus.publish(CoreEvent::CacheReset);
        assert_eq!(bus.subscriber_count(), 0);

        scope.set_visible(true);
        bus.publish(CoreEvent::CacheReset);
        assert_eq!(count.get(), 2);

        scope.cancel();
        bus.publish(CoreEvent::CacheReset);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_reentrant_publish_is_queued() {
        let bus = EventBus::new();
        let scope = Scope::visible();
        let log = Rc::new(RefCell::new(Vec::new()));

        let inner_bus = bus.clone();
        let first_log = Rc::clone(&log);
        bus.subscribe(&scope, EventKinds::empty(), move |event| {
            first_log.borrow_mut().push(format!("first:{:?}", event.kind()));
            if event.kind() == EventKinds::GUILD_CREATE {
                inner_bus.publish(CoreEvent::GuildInvalidated(GuildId(1)));
            }
            Ok(())
        });
        bus.subscribe(&scope, EventKinds::empty(), recorder(&log, "second"));

        bus.publish(GatewayEvent::GuildCreate(Box::new(
            crate::domain::events::GuildPayload::new(
                crate::domain::entities::Guild::new(1_u64, "g"),
                Vec::new(),
            ),
        )));

        assert_eq!(
            *log.borrow(),
            [
                "first:EventKinds(GUILD_CREATE)",
                "second:EventKinds(GUILD_CREATE)",
                "first:EventKinds(GUILD_INVALIDATED)",
                "second:EventKinds(GUILD_INVALIDATED)",
            ]
        );
        assert!(!bus.is_dispatching());
    }

    #[test]
    fn test_faults_do_not_stop_dispatch() {
        let bus = EventBus::new();
        let scope = Scope::visible();
        let log = Rc::new(RefCell::new(Vec::new()));

        bus.subscribe(&scope, EventKinds::empty(), |_| {
            Err(HandlerError::Failed("boom".into()))
        });
        bus.subscribe(&scope, EventKinds::empty(), |_| panic!("handler bug"));
        bus.subscribe(&scope, EventKinds::empty(), recorder(&log, "ok"));

        bus.publish(CoreEvent::FoldersChanged);
        bus.publish(CoreEvent::FoldersChanged);

        assert_eq!(log.borrow().len(), 2);
        assert_eq!(bus.subscriber_count(), 3);
    }

    #[test]
    fn test_unsubscribe_survives_renewal() {
        let bus = EventBus::new();
        let scope = Scope::visible();
        let log = Rc::new(RefCell::new(Vec::new()));

        let sub = bus.subscribe(&scope, EventKinds::empty(), recorder(&log, "x"));
        assert!(sub.is_attached());

        sub.unsubscribe();
        scope.set_visible(false);
        scope.set_visible(true);
        bus.publish(CoreEvent::CacheReset);

        assert!(!sub.is_attached());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_handler_detaching_peer_mid_dispatch() {
        let bus = EventBus::new();
        let first = Scope::visible();
        let second = Scope::visible();
        let log = Rc::new(RefCell::new(Vec::new()));

        let victim = second.clone();
        bus.subscribe(&first, EventKinds::empty(), move |_| {
            victim.set_visible(false);
            Ok(())
        });
        bus.subscribe(&second, EventKinds::empty(), recorder(&log, "victim"));

        bus.publish(CoreEvent::CacheReset);
        assert!(log.borrow().is_empty());
    }
}
