//! The session: owns the state, feeds it decoded events and exposes the
//! user-visible commands.
//!
//! Every call happens on the UI loop. Each ingested event is applied to the
//! cache first; the navigator and the unread engine then react to the
//! derived invalidations, and only after all state is settled does the bus
//! deliver the raw event, its derived events, the unread changes and the
//! selection change, in that order.

use std::cell::{Ref, RefCell};
use std::collections::HashSet;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, debug_span, info, warn};

use super::runtime::{EventBus, LoopHandle, Scope, TaskHandle, Teardown};
use super::services::{
    MentionNotifier, NotificationSettings, QuickSwitcher, SwitcherIndex, SwitcherLimits,
    SwitcherResults,
};
use super::state::{ConnectionMonitor, DEFAULT_RECONNECT_GRACE, DomainCache, Navigator, UnreadEngine};
use super::use_cases::LoginUseCase;
use crate::domain::connection::{CloseDisposition, ConnectionStatus};
use crate::domain::entities::{ChannelId, GuildId, Status};
use crate::domain::events::{CoreEvent, GatewayEvent};
use crate::domain::ports::{GatewayCommand, KeyValueStore, NotificationPort, OpenChannelAction};
use crate::domain::search::{FuzzyScorer, SearchTarget};
use crate::domain::selection::Selection;
use crate::domain::unread::{UnreadSummary, UnreadTarget};

/// Collaborators a session is built from.
pub struct SessionDeps {
    pub store: Rc<dyn KeyValueStore>,
    pub notifications: Rc<dyn NotificationPort>,
    pub notification_settings: NotificationSettings,
    pub scorer: Arc<dyn FuzzyScorer>,
    pub switcher_limits: SwitcherLimits,
    pub reconnect_grace: Duration,
    /// Secret store access; `None` runs without remember-me.
    pub login: Option<LoginUseCase>,
}

impl SessionDeps {
    /// Defaults for everything but the ports.
    #[must_use]
    pub fn new(
        store: Rc<dyn KeyValueStore>,
        notifications: Rc<dyn NotificationPort>,
        scorer: Arc<dyn FuzzyScorer>,
    ) -> Self {
        Self {
            store,
            notifications,
            notification_settings: NotificationSettings::default(),
            scorer,
            switcher_limits: SwitcherLimits::default(),
            reconnect_grace: DEFAULT_RECONNECT_GRACE,
            login: None,
        }
    }
}

pub(super) struct SessionState {
    pub(super) cache: DomainCache,
    pub(super) unread: UnreadEngine,
    pub(super) navigator: Navigator,
}

pub(super) struct SessionInner {
    pub(super) bus: EventBus,
    pub(super) handle: LoopHandle,
    pub(super) scope: Scope,
    pub(super) state: RefCell<SessionState>,
    pub(super) connection: ConnectionMonitor,
    notifier: MentionNotifier,
    switcher: QuickSwitcher,
    login: Option<LoginUseCase>,
    outbox: mpsc::UnboundedSender<GatewayCommand>,
}

/// Handle to the single long-lived session of a window. Clones share it.
#[derive(Clone)]
pub struct Session {
    pub(super) inner: Rc<SessionInner>,
}

impl Session {
    /// Builds a session. The receiver yields the commands to forward to the
    /// transport.
    #[must_use]
    pub fn new(
        handle: LoopHandle,
        deps: SessionDeps,
    ) -> (Self, mpsc::UnboundedReceiver<GatewayCommand>) {
        let (outbox, commands) = mpsc::unbounded_channel();
        let bus = EventBus::new();
        let scope = Scope::visible();
        let connection = ConnectionMonitor::new(bus.clone(), handle.clone(), deps.reconnect_grace);

        let inner = Rc::new(SessionInner {
            bus,
            handle,
            scope,
            state: RefCell::new(SessionState {
                cache: DomainCache::new(),
                unread: UnreadEngine::new(),
                navigator: Navigator::new(deps.store),
            }),
            connection,
            notifier: MentionNotifier::new(deps.notifications, deps.notification_settings),
            switcher: QuickSwitcher::new(deps.scorer, deps.switcher_limits),
            login: deps.login,
            outbox,
        });

        let weak: Weak<SessionInner> = Rc::downgrade(&inner);
        inner.scope.on_renew(move || -> Teardown {
            let weak = Weak::clone(&weak);
            Box::new(move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if let Ok(mut state) = inner.state.try_borrow_mut() {
                    state.navigator.drop_pending();
                }
            })
        });

        (Self { inner }, commands)
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    #[must_use]
    pub fn handle(&self) -> &LoopHandle {
        &self.inner.handle
    }

    /// Scope of the session itself; cancelled by [`Session::shutdown`].
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.inner.scope
    }

    /// Read access to the cache. Do not hold across a command call.
    #[must_use]
    pub fn cache(&self) -> Ref<'_, DomainCache> {
        Ref::map(self.inner.state.borrow(), |state| &state.cache)
    }

    #[must_use]
    pub fn selection(&self) -> Selection {
        self.inner.state.borrow().navigator.selection()
    }

    #[must_use]
    pub fn connection_status(&self) -> ConnectionStatus {
        self.inner.connection.status()
    }

    #[must_use]
    pub fn unread(&self, target: UnreadTarget) -> UnreadSummary {
        self.inner.state.borrow().unread.get(target)
    }

    /// Sum of mention counts over every visible channel.
    #[must_use]
    pub fn total_mentions(&self) -> u32 {
        self.inner.state.borrow().cache.total_mentions()
    }

    /// App start with a stored token, or a login.
    pub fn begin_connecting(&self) {
        self.inner.connection.begin_connecting();
    }

    /// Applies one decoded event and publishes everything it caused.
    pub fn ingest(&self, event: GatewayEvent) {
        let _span = debug_span!("ingest", event = event.name()).entered();

        let (derived, unread_changed, selection) = {
            let mut state = self.inner.state.borrow_mut();
            let SessionState {
                cache,
                unread,
                navigator,
            } = &mut *state;

            let derived = cache.apply(&event);
            let mut seen = HashSet::new();
            let mut unread_changed = Vec::new();
            let mut selection = None;
            for ev in &derived {
                if let Some(next) = navigator.on_event(cache, ev) {
                    selection = Some(next);
                }
                for target in unread.on_event(cache, ev) {
                    if seen.insert(target) {
                        unread_changed.push(target);
                    }
                }
            }
            (derived, unread_changed, selection)
        };

        let activity = derived
            .iter()
            .any(|ev| matches!(ev, CoreEvent::ChannelActivity { .. }));

        self.inner.bus.publish(event.clone());
        self.publish_changes(derived, unread_changed, selection);

        match self.inner.connection.on_gateway(&event) {
            Some(CloseDisposition::Revoked) => {
                self.forget_token();
                self.end_session();
            }
            Some(CloseDisposition::LoggedOut) => self.end_session(),
            Some(CloseDisposition::Transient) | None => {}
        }

        if let GatewayEvent::MessageCreate(message) = &event
            && activity
        {
            let state = self.inner.state.borrow();
            self.inner.notifier.on_message(&state.cache, message);
        }
    }

    pub fn open_placeholder(&self) {
        self.navigate(|nav, _| nav.open_placeholder());
    }

    pub fn open_dms(&self) {
        self.navigate(|nav, _| nav.open_dms());
    }

    /// Opens a channel; an ID not yet cached is resolved once it arrives.
    pub fn open_channel(&self, id: ChannelId) {
        self.navigate(|nav, cache| nav.open_channel(cache, id));
    }

    pub fn open_guild(&self, id: GuildId) {
        self.navigate(|nav, cache| nav.open_guild(cache, id));
    }

    /// Follows a notification click.
    pub fn open_notification(&self, action: OpenChannelAction) {
        debug!(channel = %action.channel_id, message = %action.message_id, "opening from notification");
        self.open_channel(action.channel_id);
    }

    /// Opens the row picked in the quick switcher.
    pub fn open_search_result(&self, target: SearchTarget) {
        match target {
            SearchTarget::Channel(id) => self.open_channel(id),
            SearchTarget::Guild(id) => self.open_guild(id),
        }
    }

    /// Changes the local status optimistically and forwards it.
    pub fn set_status(&self, status: Status) {
        if !status.is_selectable() {
            warn!(%status, "ignoring non-selectable status");
            return;
        }
        let changed = self.inner.state.borrow_mut().cache.set_self_status(status);
        if let Some(ev) = changed {
            info!(%status, "status changed");
            self.inner.bus.publish(ev);
        }
        self.send(GatewayCommand::UpdateStatus(status));
    }

    /// Runs the quick switcher off the loop; `apply` receives the ranked
    /// results if `scope` is still live.
    pub fn show_quick_switcher<A>(&self, scope: &Scope, query: &str, apply: A) -> TaskHandle
    where
        A: FnOnce(SwitcherResults) + 'static,
    {
        let index = SwitcherIndex::build(&self.cache());
        self.inner.switcher.search_in_background(
            &self.inner.handle,
            scope,
            index,
            query.to_string(),
            apply,
        )
    }

    /// Quick switcher on the calling thread.
    #[must_use]
    pub fn quick_switch(&self, query: &str) -> SwitcherResults {
        let index = SwitcherIndex::build(&self.cache());
        self.inner.switcher.search(&index, query)
    }

    /// Local logout: forgets the stored token and clears the session.
    pub fn logout(&self) {
        info!("logging out");
        self.send(GatewayCommand::Logout);
        self.inner.connection.logout();
        self.forget_token();
        self.end_session();
    }

    /// Ends the session scope. Pending async work and unresolved
    /// navigation are dropped.
    pub fn shutdown(&self) {
        self.inner.scope.cancel();
    }

    fn navigate<F>(&self, command: F)
    where
        F: FnOnce(&mut Navigator, &DomainCache) -> Option<Selection>,
    {
        let changed = {
            let mut state = self.inner.state.borrow_mut();
            let SessionState {
                cache, navigator, ..
            } = &mut *state;
            command(navigator, cache)
        };
        if let Some(selection) = changed {
            self.inner.bus.publish(CoreEvent::SelectionChanged(selection));
        }
    }

    fn publish_changes(
        &self,
        derived: Vec<CoreEvent>,
        unread: Vec<UnreadTarget>,
        selection: Option<Selection>,
    ) {
        let bus = &self.inner.bus;
        for ev in derived {
            bus.publish(ev);
        }
        for target in unread {
            bus.publish(CoreEvent::UnreadChanged(target));
        }
        if let Some(selection) = selection {
            bus.publish(CoreEvent::SelectionChanged(selection));
        }
    }

    /// Clears the cache after the server or the user ended the session.
    fn end_session(&self) {
        let (unread, selection) = {
            let mut state = self.inner.state.borrow_mut();
            let SessionState {
                cache,
                unread,
                navigator,
            } = &mut *state;
            cache.clear();
            (unread.rebuild(cache), navigator.reset())
        };
        debug!(unread = unread.len(), "session state cleared");
        self.publish_changes(vec![CoreEvent::CacheReset], unread, selection);
    }

    fn forget_token(&self) {
        let Some(login) = self.inner.login.clone() else {
            return;
        };
        self.inner.handle.run_async(
            &self.inner.scope,
            async move { login.forget().await },
            |result| {
                if let Err(e) = result {
                    warn!(error = %e, "stored token could not be removed");
                }
            },
        );
    }

    fn send(&self, command: GatewayCommand) {
        if self.inner.outbox.send(command).is_err() {
            debug!("transport gone, command dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::runtime::UiLoop;
    use crate::application::state::cache::fixtures::*;
    use crate::domain::entities::{MessageId, ReadState};
    use crate::domain::events::SettingsPayload;
    use crate::domain::ports::mocks::{MemoryStore, MockNotificationPort, MockTokenStorage};
    use crate::domain::unread::Indicator;
    use crate::domain::{AuthToken, EventKinds};
    use std::cell::RefCell;

    struct NoScorer;

    impl FuzzyScorer for NoScorer {
        fn score(&self, choice: &str, pattern: &str) -> Option<i64> {
            choice.contains(pattern).then_some(1)
        }
    }

    struct Fixture {
        ui: UiLoop,
        session: Session,
        commands: mpsc::UnboundedReceiver<GatewayCommand>,
        store: Rc<MemoryStore>,
        notifications: MockNotificationPort,
    }

    fn fixture(login: Option<LoginUseCase>) -> Fixture {
        let ui = UiLoop::new();
        let store = Rc::new(MemoryStore::default());
        let notifications = MockNotificationPort::new();
        let mut deps = SessionDeps::new(
            Rc::clone(&store) as Rc<dyn KeyValueStore>,
            Rc::new(notifications.clone()),
            Arc::new(NoScorer),
        );
        deps.login = login;
        let (session, commands) = Session::new(ui.handle(), deps);
        Fixture {
            ui,
            session,
            commands,
            store,
            notifications,
        }
    }

    fn record(session: &Session, scope: &Scope, kinds: EventKinds) -> Rc<RefCell<Vec<String>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        session.bus().subscribe(scope, kinds, move |ev| {
            sink.borrow_mut().push(format!("{ev:?}"));
            Ok(())
        });
        log
    }

    #[tokio::test]
    async fn test_raw_event_precedes_derived_events() {
        let f = fixture(None);
        let scope = Scope::visible();
        let log = record(&f.session, &scope, EventKinds::empty());

        f.session.ingest(ready());

        let log = log.borrow();
        assert!(log[0].starts_with("Gateway(Ready"));
        assert_eq!(log[1], "Core(CacheReset)");
        let selection_at = log.iter().position(|l| l.contains("SelectionChanged"));
        let connection_at = log.iter().position(|l| l.contains("ConnectionChanged"));
        assert!(selection_at.is_some());
        assert!(selection_at < connection_at);
        assert_eq!(f.session.connection_status(), ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn test_handler_reads_post_event_state() {
        let f = fixture(None);
        let scope = Scope::visible();
        let seen = Rc::new(RefCell::new(None));

        let session = f.session.clone();
        let sink = Rc::clone(&seen);
        f.session.bus().subscribe(&scope, EventKinds::MESSAGE_CREATE, move |_| {
            *sink.borrow_mut() = session.cache().last_message(ChannelId(200));
            Ok(())
        });

        f.session.ingest(ready());
        f.session.ingest(message(600, 200, me()));

        assert_eq!(*seen.borrow(), Some(MessageId(600)));
    }

    #[tokio::test]
    async fn test_mention_notifies_once() {
        let f = fixture(None);
        f.session.ingest(ready());

        f.session.ingest(mention(600, 200));
        f.session.ingest(mention(600, 200));

        assert_eq!(f.notifications.sent.borrow().len(), 1);
        assert_eq!(
            f.session.unread(UnreadTarget::Channel(ChannelId(200))).indicator,
            Indicator::Mentioned
        );
        assert_eq!(f.session.total_mentions(), 1);
    }

    #[tokio::test]
    async fn test_notification_action_opens_channel() {
        let f = fixture(None);
        f.session.ingest(ready());
        f.session.ingest(mention(600, 200));

        let action = f.notifications.sent.borrow()[0].action;
        f.session.open_notification(action);

        assert_eq!(
            f.session.selection(),
            Selection::Guild(GuildId(100), Some(ChannelId(200)))
        );
    }

    #[tokio::test]
    async fn test_set_status_is_forwarded() {
        let mut f = fixture(None);
        f.session.ingest(ready());

        f.session.set_status(Status::DoNotDisturb);
        f.session.set_status(Status::Offline);

        assert_eq!(f.session.cache().self_status(), Status::DoNotDisturb);
        assert_eq!(
            f.commands.try_recv().ok(),
            Some(GatewayCommand::UpdateStatus(Status::DoNotDisturb))
        );
        assert!(f.commands.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_pending_channel_resolves_and_drops_on_shutdown() {
        let f = fixture(None);
        f.session.open_channel(ChannelId(200));
        assert_eq!(f.session.selection(), Selection::Placeholder);

        f.session.ingest(ready());
        assert_eq!(
            f.session.selection(),
            Selection::Guild(GuildId(100), Some(ChannelId(200)))
        );

        f.session.open_channel(ChannelId(999));
        f.session.shutdown();
        assert_eq!(f.session.inner.state.borrow().navigator.pending(), None);
    }

    #[tokio::test]
    async fn test_revoked_token_is_forgotten() {
        let storage = MockTokenStorage::with_token(AuthToken::new_unchecked("secret"));
        let mut f = fixture(Some(LoginUseCase::new(Arc::new(storage.clone()))));
        f.session.ingest(ready());

        f.session.ingest(GatewayEvent::TransportClosed { code: Some(4004) });
        assert!(f.ui.turn().await);

        assert_eq!(f.session.connection_status(), ConnectionStatus::LoggedOut);
        assert!(f.session.cache().guild(GuildId(100)).is_none());
        assert_eq!(f.session.selection(), Selection::Placeholder);
        assert!(storage.current().is_none());
    }

    #[tokio::test]
    async fn test_not_authenticated_keeps_token() {
        let storage = MockTokenStorage::with_token(AuthToken::new_unchecked("secret"));
        let f = fixture(Some(LoginUseCase::new(Arc::new(storage.clone()))));
        f.session.ingest(ready());

        f.session.ingest(GatewayEvent::TransportClosed { code: Some(4003) });

        assert_eq!(f.session.connection_status(), ConnectionStatus::LoggedOut);
        assert_eq!(f.session.handle().pending(), 0);
        assert!(storage.current().is_some());
    }

    #[tokio::test]
    async fn test_logout_clears_unread_and_keeps_navigation_keys() {
        let mut f = fixture(None);
        f.session.ingest(ready());
        f.session.open_channel(ChannelId(200));
        f.session.ingest(GatewayEvent::ReadStateUpdate(
            ReadState::new(ChannelId(200), Some(MessageId(500))).with_mention_count(2),
        ));

        f.session.logout();

        assert_eq!(f.commands.try_recv().ok(), Some(GatewayCommand::Logout));
        assert_eq!(f.session.total_mentions(), 0);
        assert_eq!(
            f.session.unread(UnreadTarget::Guild(GuildId(100))),
            UnreadSummary::READ
        );
        assert_eq!(f.store.get("last-channel-100").as_deref(), Some("200"));

        f.session.ingest(ready());
        assert_eq!(
            f.session.selection(),
            Selection::Guild(GuildId(100), Some(ChannelId(200)))
        );
    }

    #[tokio::test]
    async fn test_dnd_from_settings_silences_mentions() {
        let f = fixture(None);
        f.session.ingest(ready());
        f.session.ingest(GatewayEvent::UserSettingsUpdate(SettingsPayload {
            guild_folders: None,
            status: Some(Status::DoNotDisturb),
        }));

        f.session.ingest(mention(600, 200));

        assert!(f.notifications.sent.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_quick_switch_opens_result() {
        let f = fixture(None);
        f.session.ingest(ready());

        let results = f.session.quick_switch("general");
        let target = results.first().map(|r| r.item.target);
        assert_eq!(target, Some(SearchTarget::Channel(ChannelId(200))));

        if let Some(target) = target {
            f.session.open_search_result(target);
        }
        assert_eq!(f.session.selection().channel(), Some(ChannelId(200)));
    }
}
