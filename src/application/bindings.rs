//! Glue between the bus and the observer contracts.
//!
//! Each binding pushes the current value when its scope becomes live, then
//! forwards matching invalidations while it stays live. Observers are held
//! weakly and always re-resolved through the session state.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use super::runtime::{Scope, Subscription, Teardown};
use super::session::{Session, SessionInner};
use crate::domain::entities::{GuildId, UserId};
use crate::domain::errors::HandlerError;
use crate::domain::events::{CoreEvent, EventKinds};
use crate::domain::ports::{
    ChannelListObserver, ConnectionObserver, PresenceObserver, SelectionObserver, UnreadObserver,
};
use crate::domain::selection::{Selection, SelectionTarget};
use crate::domain::unread::{UnreadSummary, UnreadTarget};

fn push_unread(observer: &dyn UnreadObserver, summary: UnreadSummary) {
    observer.set_indicator(summary.indicator);
    observer.set_mentions(summary.mentions);
}

fn live_session(session: &Weak<SessionInner>) -> Result<Rc<SessionInner>, HandlerError> {
    session.upgrade().ok_or_else(|| HandlerError::stale("session"))
}

/// Runs `push` on every renewal of `scope` while both ends are alive.
fn on_renew_push<O: ?Sized + 'static>(
    scope: &Scope,
    session: &Weak<SessionInner>,
    observer: &Weak<O>,
    mut push: impl FnMut(&SessionInner, &O) + 'static,
) {
    let session = Weak::clone(session);
    let observer = Weak::clone(observer);
    scope.on_renew(move || -> Teardown {
        if let (Some(session), Some(observer)) = (session.upgrade(), observer.upgrade()) {
            push(&session, &observer);
        }
        Box::new(|| {})
    });
}

impl Session {
    /// Keeps an unread pill and badge in sync with `target`.
    #[track_caller]
    pub fn bind_unread(
        &self,
        scope: &Scope,
        target: UnreadTarget,
        observer: &Rc<dyn UnreadObserver>,
    ) -> Subscription {
        let session = Rc::downgrade(&self.inner);
        let observer = Rc::downgrade(observer);

        on_renew_push(scope, &session, &observer, move |session, observer| {
            push_unread(observer, session.state.borrow().unread.get(target));
        });

        self.inner
            .bus
            .subscribe(scope, EventKinds::UNREAD_CHANGED, move |event| {
                let Some(CoreEvent::UnreadChanged(changed)) = event.as_core() else {
                    return Ok(());
                };
                if *changed != target {
                    return Ok(());
                }
                let session = live_session(&session)?;
                if let Some(observer) = observer.upgrade() {
                    push_unread(observer.as_ref(), session.state.borrow().unread.get(target));
                }
                Ok(())
            })
    }

    /// Rebuilds a guild's channel list, or the DM list for `None`, when
    /// its shape changes. New DM activity only re-sorts.
    #[track_caller]
    pub fn bind_channel_list(
        &self,
        scope: &Scope,
        guild: Option<GuildId>,
        observer: &Rc<dyn ChannelListObserver>,
    ) -> Subscription {
        let session = Rc::downgrade(&self.inner);
        let observer = Rc::downgrade(observer);

        on_renew_push(scope, &session, &observer, |_, observer| observer.invalidate());

        let kinds = EventKinds::CACHE_RESET
            | EventKinds::CHANNEL_LIST_INVALIDATED
            | EventKinds::GUILD_INVALIDATED
            | EventKinds::CHANNEL_ACTIVITY;
        self.inner.bus.subscribe(scope, kinds, move |event| {
            let Some(observer) = observer.upgrade() else {
                return Ok(());
            };
            match event.as_core() {
                Some(CoreEvent::CacheReset) => observer.invalidate(),
                Some(CoreEvent::ChannelListInvalidated(g)) if *g == guild => observer.invalidate(),
                Some(CoreEvent::GuildInvalidated(g)) if Some(*g) == guild => observer.invalidate(),
                Some(CoreEvent::ChannelActivity { guild_id: None, .. }) if guild.is_none() => {
                    observer.invalidate_sort();
                }
                _ => {}
            }
            Ok(())
        })
    }

    /// Highlights a sidebar row while the selection points at it.
    #[track_caller]
    pub fn bind_selection(
        &self,
        scope: &Scope,
        target: SelectionTarget,
        observer: &Rc<dyn SelectionObserver>,
    ) -> Subscription {
        let session = Rc::downgrade(&self.inner);
        let observer = Rc::downgrade(observer);
        let shown = Rc::new(Cell::new(false));

        let renew_shown = Rc::clone(&shown);
        on_renew_push(scope, &session, &observer, move |session, observer| {
            let selected =
                target.is_selected_by(session.state.borrow().navigator.selection());
            renew_shown.set(selected);
            observer.set_selected(selected);
        });

        self.inner
            .bus
            .subscribe(scope, EventKinds::SELECTION_CHANGED, move |event| {
                let Some(CoreEvent::SelectionChanged(selection)) = event.as_core() else {
                    return Ok(());
                };
                let Some(observer) = observer.upgrade() else {
                    return Ok(());
                };
                let selected = target.is_selected_by(*selection);
                if selected == shown.replace(selected) {
                    return Ok(());
                }
                if selected {
                    observer.set_selected(true);
                } else if *selection == Selection::Placeholder {
                    observer.unselect();
                } else {
                    observer.set_selected(false);
                }
                Ok(())
            })
    }

    /// Keeps a status dot in sync with a user's presence, as seen from
    /// `guild` (or globally for `None`).
    #[track_caller]
    pub fn bind_presence(
        &self,
        scope: &Scope,
        user: UserId,
        guild: Option<GuildId>,
        observer: &Rc<dyn PresenceObserver>,
    ) -> Subscription {
        let session = Rc::downgrade(&self.inner);
        let observer = Rc::downgrade(observer);

        on_renew_push(scope, &session, &observer, move |session, observer| {
            observer.set_status(session.state.borrow().cache.presence(user, guild));
        });

        let kinds = EventKinds::PRESENCE_CHANGED | EventKinds::CACHE_RESET;
        self.inner.bus.subscribe(scope, kinds, move |event| {
            let relevant = match event.as_core() {
                Some(CoreEvent::CacheReset) => true,
                Some(CoreEvent::PresenceChanged { user_id, guild_id }) => {
                    *user_id == user && (guild_id.is_none() || *guild_id == guild)
                }
                _ => false,
            };
            if !relevant {
                return Ok(());
            }
            let session = live_session(&session)?;
            if let Some(observer) = observer.upgrade() {
                observer.set_status(session.state.borrow().cache.presence(user, guild));
            }
            Ok(())
        })
    }

    /// Drives the window-level page switcher.
    #[track_caller]
    pub fn bind_connection(
        &self,
        scope: &Scope,
        observer: &Rc<dyn ConnectionObserver>,
    ) -> Subscription {
        let session = Rc::downgrade(&self.inner);
        let observer = Rc::downgrade(observer);

        on_renew_push(scope, &session, &observer, |session, observer| {
            observer.set_connection(session.connection.status());
        });

        self.inner
            .bus
            .subscribe(scope, EventKinds::CONNECTION_CHANGED, move |event| {
                if let (Some(CoreEvent::ConnectionChanged(status)), Some(observer)) =
                    (event.as_core(), observer.upgrade())
                {
                    observer.set_connection(*status);
                }
                Ok(())
            })
    }
}
