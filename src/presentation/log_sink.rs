//! Headless view layer: observers that render into the log.

use std::cell::{Cell, RefCell};
use std::fmt::Write as _;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::application::{Scope, Session, Subscription};
use crate::domain::connection::ConnectionStatus;
use crate::domain::entities::{EmbedFailureStyle, Guild, Status};
use crate::domain::errors::NotifyError;
use crate::domain::events::{Event, EventKinds};
use crate::domain::ports::{
    ChannelListObserver, ConnectionObserver, EmbedPlayer, Notification, NotificationPort,
    PresenceObserver, SelectionObserver, UnreadObserver,
};
use crate::domain::selection::{Selection, SelectionTarget};
use crate::domain::unread::{Indicator, UnreadSummary, UnreadTarget};

/// Observer standing in for one widget. Every update is logged under its
/// label and counted.
#[derive(Debug)]
pub struct LogObserver {
    label: String,
    updates: Cell<usize>,
}

impl LogObserver {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            label: label.into(),
            updates: Cell::new(0),
        })
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of updates received so far.
    #[must_use]
    pub fn updates(&self) -> usize {
        self.updates.get()
    }

    fn bump(&self) {
        self.updates.set(self.updates.get() + 1);
    }
}

impl UnreadObserver for LogObserver {
    fn set_indicator(&self, indicator: Indicator) {
        self.bump();
        info!(widget = %self.label, ?indicator, "unread indicator");
    }

    fn set_mentions(&self, count: u32) {
        self.bump();
        info!(widget = %self.label, count, "mention badge");
    }
}

impl ChannelListObserver for LogObserver {
    fn invalidate(&self) {
        self.bump();
        info!(widget = %self.label, "channel list rebuilt");
    }

    fn invalidate_sort(&self) {
        self.bump();
        info!(widget = %self.label, "channel list re-sorted");
    }
}

impl SelectionObserver for LogObserver {
    fn set_selected(&self, selected: bool) {
        self.bump();
        info!(widget = %self.label, selected, "selection");
    }

    fn unselect(&self) {
        self.bump();
        info!(widget = %self.label, "unselected");
    }
}

impl PresenceObserver for LogObserver {
    fn set_status(&self, status: Status) {
        self.bump();
        info!(widget = %self.label, %status, "presence");
    }
}

impl ConnectionObserver for LogObserver {
    fn set_connection(&self, status: ConnectionStatus) {
        self.bump();
        info!(widget = %self.label, %status, "page");
    }
}

/// Notification port that logs every mention and optionally hands it on
/// to a real desktop notifier.
#[derive(Default)]
pub struct LogNotifier {
    shown: RefCell<Vec<Notification>>,
    forward: Option<Rc<dyn NotificationPort>>,
}

impl LogNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn forwarding(port: Rc<dyn NotificationPort>) -> Self {
        Self {
            shown: RefCell::default(),
            forward: Some(port),
        }
    }

    #[must_use]
    pub fn shown(&self) -> Vec<Notification> {
        self.shown.borrow().clone()
    }
}

impl NotificationPort for LogNotifier {
    fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        info!(
            title = %notification.title,
            body = %notification.body,
            channel = %notification.action.channel_id,
            "notification"
        );
        self.shown.borrow_mut().push(notification.clone());
        match &self.forward {
            Some(port) => port.send(notification),
            None => Ok(()),
        }
    }
}

/// Embed player that logs what a media widget would do.
#[derive(Debug, Default)]
pub struct LogPlayer {
    source: RefCell<Option<String>>,
    playing: Cell<bool>,
    failure: Cell<Option<EmbedFailureStyle>>,
}

impl LogPlayer {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    #[must_use]
    pub fn source(&self) -> Option<String> {
        self.source.borrow().clone()
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playing.get()
    }

    #[must_use]
    pub fn failure(&self) -> Option<EmbedFailureStyle> {
        self.failure.get()
    }
}

impl EmbedPlayer for LogPlayer {
    fn set_url(&self, path: &str) {
        info!(path, "media ready");
        *self.source.borrow_mut() = Some(path.to_string());
        self.failure.set(None);
    }

    fn play(&self) {
        self.playing.set(true);
    }

    fn pause(&self) {
        self.playing.set(false);
    }

    fn on_error(&self, style: EmbedFailureStyle, tooltip: &str) {
        warn!(?style, tooltip, "media failed");
        self.failure.set(Some(style));
    }
}

/// Window skeleton bound to a session: the page switcher, the DM button and
/// list, and a tap that traces every event on the bus.
pub struct LogSink {
    pub window: Rc<LogObserver>,
    pub dm_button: Rc<LogObserver>,
    pub dm_list: Rc<LogObserver>,
    events: Rc<Cell<usize>>,
    subscriptions: Vec<Subscription>,
}

impl LogSink {
    pub fn attach(session: &Session, scope: &Scope) -> Self {
        let window = LogObserver::new("window");
        let dm_button = LogObserver::new("dm-button");
        let dm_list = LogObserver::new("dm-list");
        let events = Rc::new(Cell::new(0));

        let as_connection: Rc<dyn ConnectionObserver> = window.clone();
        let as_selection: Rc<dyn SelectionObserver> = dm_button.clone();
        let as_list: Rc<dyn ChannelListObserver> = dm_list.clone();

        let counter = Rc::clone(&events);
        let subscriptions = vec![
            session.bind_connection(scope, &as_connection),
            session.bind_selection(scope, SelectionTarget::Dms, &as_selection),
            session.bind_channel_list(scope, None, &as_list),
            session
                .bus()
                .subscribe(scope, EventKinds::empty(), move |event: &Event| {
                    counter.set(counter.get() + 1);
                    debug!(kind = ?event.kind(), "bus event");
                    Ok(())
                }),
        ];

        Self {
            window,
            dm_button,
            dm_list,
            events,
            subscriptions,
        }
    }

    /// Events seen on the bus since attaching.
    #[must_use]
    pub fn events_seen(&self) -> usize {
        self.events.get()
    }

    pub fn detach(&self) {
        for subscription in &self.subscriptions {
            subscription.unsubscribe();
        }
    }
}

/// Plain-text summary of the sidebar as the session currently sees it.
#[must_use]
pub fn render_summary(session: &Session) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "connection: {}", session.connection_status());
    let _ = writeln!(out, "selection: {}", describe(session.selection()));
    let _ = writeln!(out, "mentions: {}", session.total_mentions());

    let cache = session.cache();
    for folder in cache.sidebar() {
        let name = folder.display_name(|id| cache.guild(id).map(Guild::display_name));
        let summary = match (folder.is_synthetic(), folder.id, folder.guild_ids.first()) {
            (false, Some(id), _) => session.unread(UnreadTarget::Folder(id)),
            (_, _, Some(guild)) => session.unread(UnreadTarget::Guild(*guild)),
            _ => UnreadSummary::READ,
        };
        let _ = writeln!(
            out,
            "  {name}: {:?} ({} mentions)",
            summary.indicator, summary.mentions
        );
    }
    out
}

fn describe(selection: Selection) -> String {
    match selection {
        Selection::Placeholder => "nothing".to_string(),
        Selection::Dm(None) => "direct messages".to_string(),
        Selection::Dm(Some(ch)) => format!("direct message {ch}"),
        Selection::Guild(g, None) => format!("guild {g}"),
        Selection::Guild(g, Some(ch)) => format!("guild {g} channel {ch}"),
    }
}
