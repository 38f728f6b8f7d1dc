//! Visibility-scoped cancellation.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

/// Undo action returned by a renew setup.
pub type Teardown = Box<dyn FnOnce()>;

type Setup = Rc<RefCell<dyn FnMut() -> Teardown>>;

#[derive(Default)]
struct ScopeInner {
    visible: Cell<bool>,
    cancelled: Cell<bool>,
    setups: RefCell<Vec<Setup>>,
    teardowns: RefCell<Vec<Teardown>>,
}

/// Cancellable handle tied to a view node's lifetime and visibility.
///
/// Setups registered with [`Scope::on_renew`] run every time the node
/// becomes visible; the teardown each returns runs when it is hidden or
/// the scope is cancelled. Clones share the same state.
#[derive(Clone, Default)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

impl Scope {
    /// Creates a dormant scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scope that is already visible.
    #[must_use]
    pub fn visible() -> Self {
        let scope = Self::new();
        scope.inner.visible.set(true);
        scope
    }

    /// Registers `setup` to run on every renewal, and right away if live.
    pub fn on_renew<F>(&self, setup: F)
    where
        F: FnMut() -> Teardown + 'static,
    {
        if self.inner.cancelled.get() {
            return;
        }

        let setup: Setup = Rc::new(RefCell::new(setup));
        self.inner.setups.borrow_mut().push(Rc::clone(&setup));

        if self.is_live() {
            self.run_setup(&setup);
        }
    }

    /// Maps or unmaps the owning node.
    pub fn set_visible(&self, visible: bool) {
        if self.inner.cancelled.get() || self.inner.visible.get() == visible {
            return;
        }
        self.inner.visible.set(visible);

        if visible {
            trace!("scope renewed");
            let setups = self.inner.setups.borrow().clone();
            for setup in &setups {
                if !self.is_live() {
                    break;
                }
                self.run_setup(setup);
            }
        } else {
            trace!("scope dormant");
            self.run_teardowns();
        }
    }

    /// Returns true while the node is visible and not cancelled.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.inner.visible.get() && !self.inner.cancelled.get()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.get()
    }

    /// Ends the scope for good. Idempotent.
    pub fn cancel(&self) {
        if self.inner.cancelled.replace(true) {
            return;
        }
        self.inner.visible.set(false);
        self.run_teardowns();
        self.inner.setups.borrow_mut().clear();
    }

    /// Returns a handle that does not keep the scope alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakScope {
        WeakScope {
            inner: Rc::downgrade(&self.inner),
        }
    }

    fn run_setup(&self, setup: &Setup) {
        let teardown = {
            let mut setup = setup.borrow_mut();
            (&mut *setup)()
        };

        if self.is_live() {
            self.inner.teardowns.borrow_mut().push(teardown);
        } else {
            // the setup itself hid or cancelled the scope
            teardown();
        }
    }

    fn run_teardowns(&self) {
        let teardowns = std::mem::take(&mut *self.inner.teardowns.borrow_mut());
        for teardown in teardowns.into_iter().rev() {
            teardown();
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("visible", &self.inner.visible.get())
            .field("cancelled", &self.inner.cancelled.get())
            .field("setups", &self.inner.setups.borrow().len())
            .finish()
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        for teardown in std::mem::take(self.teardowns.get_mut()).into_iter().rev() {
            teardown();
        }
    }
}

/// Non-owning scope handle.
#[derive(Clone, Default)]
pub struct WeakScope {
    inner: Weak<ScopeInner>,
}

impl WeakScope {
    #[must_use]
    pub fn upgrade(&self) -> Option<Scope> {
        self.inner.upgrade().map(|inner| Scope { inner })
    }

    /// A dropped scope is never live.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.upgrade().is_some_and(|scope| scope.is_live())
    }
}
