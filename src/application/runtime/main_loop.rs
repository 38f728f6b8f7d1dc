//! Ordered async primitive.
//!
//! Work runs on tokio workers and sends its output back over a channel;
//! the continuation that consumes it runs on the UI loop, in the order the
//! work finished, and only while the submitting scope is live.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, error, trace};

use super::scope::{Scope, WeakScope};

type Output = Box<dyn Any + Send>;
type Continuation = Box<dyn FnOnce(Output)>;

struct Completion {
    id: u64,
    output: Output,
}

struct Pending {
    scope: Option<WeakScope>,
    apply: Continuation,
}

struct LoopShared {
    tx: mpsc::UnboundedSender<Completion>,
    pending: RefCell<HashMap<u64, Pending>>,
    next_id: Cell<u64>,
}

/// Cloneable handle used to submit work to the UI loop.
#[derive(Clone)]
pub struct LoopHandle {
    shared: Rc<LoopShared>,
}

impl LoopHandle {
    /// Runs `work` on a tokio worker and `apply` on the UI loop with its
    /// output, if `scope` is still live by then.
    pub fn run_async<T, W, A>(&self, scope: &Scope, work: W, apply: A) -> TaskHandle
    where
        T: Send + 'static,
        W: Future<Output = T> + Send + 'static,
        A: FnOnce(T) + 'static,
    {
        let id = self.register(Some(scope.downgrade()), apply);
        let tx = self.shared.tx.clone();
        let task = tokio::spawn(async move {
            let output = work.await;
            let _ = tx.send(Completion {
                id,
                output: Box::new(output),
            });
        });
        self.task_handle(id, task.abort_handle())
    }

    /// Like [`LoopHandle::run_async`] for blocking work such as file I/O
    /// or index construction.
    pub fn run_blocking<T, W, A>(&self, scope: &Scope, work: W, apply: A) -> TaskHandle
    where
        T: Send + 'static,
        W: FnOnce() -> T + Send + 'static,
        A: FnOnce(T) + 'static,
    {
        let id = self.register(Some(scope.downgrade()), apply);
        let tx = self.shared.tx.clone();
        let task = tokio::task::spawn_blocking(move || {
            let output = work();
            let _ = tx.send(Completion {
                id,
                output: Box::new(output),
            });
        });
        self.task_handle(id, task.abort_handle())
    }

    /// Runs `f` on the UI loop after `after`, unless cancelled first.
    pub fn timeout<F>(&self, after: Duration, f: F) -> TaskHandle
    where
        F: FnOnce() + 'static,
    {
        let id = self.register(None, move |()| f());
        let tx = self.shared.tx.clone();
        let deadline = tokio::time::Instant::now() + after;
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = tx.send(Completion {
                id,
                output: Box::new(()),
            });
        });
        self.task_handle(id, task.abort_handle())
    }

    /// Number of submitted continuations not yet applied or dropped.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.pending.borrow().len()
    }

    fn register<T, A>(&self, scope: Option<WeakScope>, apply: A) -> u64
    where
        T: Send + 'static,
        A: FnOnce(T) + 'static,
    {
        let id = self.shared.next_id.get() + 1;
        self.shared.next_id.set(id);

        let apply: Continuation = Box::new(move |output: Output| match output.downcast::<T>() {
            Ok(value) => apply(*value),
            Err(_) => error!(
                id,
                expected = std::any::type_name::<T>(),
                "async result has unexpected type"
            ),
        });

        self.shared
            .pending
            .borrow_mut()
            .insert(id, Pending { scope, apply });
        id
    }

    fn task_handle(&self, id: u64, abort: AbortHandle) -> TaskHandle {
        TaskHandle {
            id,
            abort,
            shared: Rc::downgrade(&self.shared),
        }
    }

    fn complete(&self, completion: Completion) -> bool {
        let pending = self.shared.pending.borrow_mut().remove(&completion.id);
        let Some(pending) = pending else {
            trace!(id = completion.id, "completion for cancelled task");
            return false;
        };

        if let Some(scope) = &pending.scope
            && !scope.is_live()
        {
            debug!(id = completion.id, "scope no longer live, dropping result");
            return false;
        }

        (pending.apply)(completion.output);
        true
    }
}

/// Handle to submitted work or a timer.
#[derive(Debug)]
pub struct TaskHandle {
    id: u64,
    abort: AbortHandle,
    shared: Weak<LoopShared>,
}

impl TaskHandle {
    /// Aborts the task and discards its continuation.
    pub fn cancel(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.pending.borrow_mut().remove(&self.id);
        }
        self.abort.abort();
    }

    /// Returns true until the continuation has run or been discarded.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.shared
            .upgrade()
            .is_some_and(|shared| shared.pending.borrow().contains_key(&self.id))
    }
}

impl std::fmt::Debug for LoopShared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopShared")
            .field("pending", &self.pending.borrow().len())
            .finish_non_exhaustive()
    }
}

/// Receiving end of the UI loop, owned by whoever drives it.
pub struct UiLoop {
    handle: LoopHandle,
    rx: mpsc::UnboundedReceiver<Completion>,
}

impl Default for UiLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl UiLoop {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            handle: LoopHandle {
                shared: Rc::new(LoopShared {
                    tx,
                    pending: RefCell::new(HashMap::new()),
                    next_id: Cell::new(0),
                }),
            },
            rx,
        }
    }

    #[must_use]
    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    /// Waits for the next finished task and applies it.
    ///
    /// Returns true if a continuation ran. Cancel-safe.
    pub async fn turn(&mut self) -> bool {
        match self.rx.recv().await {
            Some(completion) => self.handle.complete(completion),
            None => false,
        }
    }

    /// Applies one finished task without waiting.
    pub fn try_turn(&mut self) -> bool {
        match self.rx.try_recv() {
            Ok(completion) => {
                self.handle.complete(completion);
                true
            }
            Err(_) => false,
        }
    }

    /// Applies every task that has already finished.
    pub fn drain(&mut self) -> usize {
        let mut count = 0;
        while self.try_turn() {
            count += 1;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_results_apply_in_completion_order() {
        let mut ui = UiLoop::new();
        let handle = ui.handle();
        let scope = Scope::visible();
        let log = Rc::new(RefCell::new(Vec::new()));

        for (name, millis) in [("slow", 30_u64), ("fast", 10), ("mid", 20)] {
            let log = Rc::clone(&log);
            handle.run_async(
                &scope,
                async move {
                    tokio::time::sleep(Duration::from_millis(millis)).await;
                    name
                },
                move |name| log.borrow_mut().push(name),
            );
        }

        for _ in 0..3 {
            assert!(ui.turn().await);
        }
        assert_eq!(*log.borrow(), ["fast", "mid", "slow"]);
        assert_eq!(handle.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dead_scope_drops_result() {
        let mut ui = UiLoop::new();
        let handle = ui.handle();
        let scope = Scope::visible();
        let applied = Rc::new(Cell::new(false));

        let flag = Rc::clone(&applied);
        handle.run_async(&scope, async { 7_u32 }, move |_| flag.set(true));
        scope.cancel();

        assert!(!ui.turn().await);
        assert!(!applied.get());
        assert_eq!(handle.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dormant_scope_drops_result() {
        let mut ui = UiLoop::new();
        let handle = ui.handle();
        let scope = Scope::visible();
        let applied = Rc::new(Cell::new(false));

        let flag = Rc::clone(&applied);
        handle.run_async(&scope, async {}, move |()| flag.set(true));
        scope.set_visible(false);

        assert!(!ui.turn().await);
        assert!(!applied.get());
    }

    #[tokio::test]
    async fn test_blocking_work() {
        let mut ui = UiLoop::new();
        let handle = ui.handle();
        let scope = Scope::visible();
        let result = Rc::new(Cell::new(0));

        let out = Rc::clone(&result);
        handle.run_blocking(&scope, || (1..=10).sum::<u32>(), move |sum| out.set(sum));

        assert!(ui.turn().await);
        assert_eq!(result.get(), 55);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_and_cancels() {
        let mut ui = UiLoop::new();
        let handle = ui.handle();
        let fired = Rc::new(Cell::new(0));

        let f = Rc::clone(&fired);
        let cancelled = handle.timeout(Duration::from_secs(1), move || f.set(f.get() + 1));
        let f = Rc::clone(&fired);
        let kept = handle.timeout(Duration::from_secs(2), move || f.set(f.get() + 10));

        assert!(cancelled.is_pending());
        cancelled.cancel();
        assert!(!cancelled.is_pending());

        assert!(ui.turn().await);
        assert_eq!(fired.get(), 10);
        assert!(!kept.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_turn_does_not_wait() {
        let mut ui = UiLoop::new();
        let handle = ui.handle();
        let _timer = handle.timeout(Duration::from_secs(5), || {});

        assert!(!ui.try_turn());
        assert_eq!(ui.drain(), 0);
        assert_eq!(handle.pending(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_turn_waits_for_completion() {
        let mut ui = UiLoop::new();
        let handle = ui.handle();
        let scope = Scope::visible();
        let _task = handle.run_async(&scope, std::future::pending::<()>(), |()| {});

        let mut turn = tokio_test::task::spawn(ui.turn());
        tokio_test::assert_pending!(turn.poll());
        drop(turn);

        assert_eq!(handle.pending(), 1);
    }
}
