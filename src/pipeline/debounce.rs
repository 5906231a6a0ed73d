// Debounce timer - coalesces edits into one call after a quiet period
//
// Only a timer that has not fired yet can be cancelled. `flush_now` (and
// dropping the debouncer) runs the pending call immediately instead of
// losing it. Timers run on the tokio runtime when there is one, otherwise on
// a short-lived thread.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

type Callback<A> = Arc<dyn Fn(A) + Send + Sync>;

struct Pending<A> {
    generation: u64,
    args: A,
    cancel: CancellationToken,
}

pub struct Debouncer<A: Send + 'static> {
    delay: Duration,
    callback: Callback<A>,
    pending: Arc<Mutex<Option<Pending<A>>>>,
    /// Wakes timer threads when the pending call is replaced or taken
    changed: Arc<Condvar>,
    generation: AtomicU64,
}

/// Take the pending call if it is still the one scheduled as `generation`
fn take_generation<A>(pending: &Mutex<Option<Pending<A>>>, generation: u64) -> Option<A> {
    let mut slot = pending.lock();
    if slot.as_ref().is_some_and(|p| p.generation == generation) {
        slot.take().map(|p| p.args)
    } else {
        None
    }
}

impl<A: Send + 'static> Debouncer<A> {
    pub fn new(delay: Duration, callback: impl Fn(A) + Send + Sync + 'static) -> Self {
        Self {
            delay,
            callback: Arc::new(callback),
            pending: Arc::new(Mutex::new(None)),
            changed: Arc::new(Condvar::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)start the quiet period with `args` as the arguments of the call
    pub fn schedule(&self, args: A) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        if let Some(previous) = self.pending.lock().replace(Pending {
            generation,
            args,
            cancel: cancel.clone(),
        }) {
            previous.cancel.cancel();
        }
        self.changed.notify_all();

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => self.spawn_task(&runtime, generation, cancel),
            Err(_) => self.spawn_thread(generation),
        }
    }

    fn spawn_task(&self, runtime: &tokio::runtime::Handle, generation: u64, cancel: CancellationToken) {
        let pending = Arc::clone(&self.pending);
        let callback = Arc::clone(&self.callback);
        let delay = self.delay;
        runtime.spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    if let Some(args) = take_generation(&pending, generation) {
                        if let Err(e) = tokio::task::spawn_blocking(move || callback(args)).await {
                            tracing::error!("[Debouncer] scheduled call panicked: {}", e);
                        }
                    }
                }
            }
        });
    }

    /// Timer for callers outside a runtime. The thread exits as soon as its
    /// call is replaced, flushed or cancelled.
    fn spawn_thread(&self, generation: u64) {
        let pending = Arc::clone(&self.pending);
        let changed = Arc::clone(&self.changed);
        let callback = Arc::clone(&self.callback);
        let deadline = Instant::now() + self.delay;

        let spawned = thread::Builder::new()
            .name("debounce".to_string())
            .spawn(move || {
                let mut slot = pending.lock();
                loop {
                    if !slot.as_ref().is_some_and(|p| p.generation == generation) {
                        return;
                    }
                    if Instant::now() >= deadline {
                        break;
                    }
                    changed.wait_until(&mut slot, deadline);
                }
                let Some(due) = slot.take() else {
                    return;
                };
                drop(slot);
                callback(due.args);
            });

        if let Err(e) = spawned {
            tracing::warn!("[Debouncer::schedule] no timer thread ({}), calling now", e);
            self.flush_now();
        }
    }

    /// Run the pending call now. Returns false when nothing was pending.
    pub fn flush_now(&self) -> bool {
        let Some(pending) = self.pending.lock().take() else {
            return false;
        };
        self.changed.notify_all();
        pending.cancel.cancel();
        (self.callback)(pending.args);
        true
    }

    /// Drop the pending call without running it
    pub fn cancel(&self) -> bool {
        let taken = self.pending.lock().take();
        self.changed.notify_all();
        match taken {
            Some(pending) => {
                pending.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.lock().is_some()
    }
}

impl<A: Send + 'static> Drop for Debouncer<A> {
    fn drop(&mut self) {
        if self.flush_now() {
            tracing::debug!("[Debouncer::drop] flushed pending call");
        }
    }
}
