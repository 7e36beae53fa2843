use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

/// Boxed tick callback armed on a [`TickScheduler`].
pub type Tick = Box<dyn FnOnce() + Send>;

/// Delayed-callback capability driving the coalescing loop.
///
/// Arming a new tick replaces any pending one.
pub trait TickScheduler: Send + Sync {
    fn schedule(&self, delay: Duration, tick: Tick);
    fn cancel(&self);
}

/// Timer backed by one dedicated thread.
///
/// The armed tick runs on that thread with the timer lock released, making
/// it the single background worker that executes every drain/merge/publish
/// pass.
pub struct ThreadTimer {
    shared: Arc<TimerShared>,
    worker: Option<thread::JoinHandle<()>>,
}

struct TimerShared {
    slot: Mutex<TimerSlot>,
    wakeup: Condvar,
}

struct TimerSlot {
    pending: Option<(Instant, Tick)>,
    shutdown: bool,
}

impl TimerShared {
    fn lock(&self) -> MutexGuard<'_, TimerSlot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ThreadTimer {
    pub fn new() -> Self {
        let shared = Arc::new(TimerShared {
            slot: Mutex::new(TimerSlot {
                pending: None,
                shutdown: false,
            }),
            wakeup: Condvar::new(),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("progress-timer".to_string())
            .spawn(move || run_timer(&worker_shared))
            .expect("spawn timer thread");
        Self {
            shared,
            worker: Some(worker),
        }
    }
}

impl Default for ThreadTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl TickScheduler for ThreadTimer {
    fn schedule(&self, delay: Duration, tick: Tick) {
        let mut slot = self.shared.lock();
        slot.pending = Some((Instant::now() + delay, tick));
        self.shared.wakeup.notify_one();
    }

    fn cancel(&self) {
        let mut slot = self.shared.lock();
        slot.pending = None;
        self.shared.wakeup.notify_one();
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        {
            let mut slot = self.shared.lock();
            slot.shutdown = true;
            slot.pending = None;
            self.shared.wakeup.notify_one();
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_timer(shared: &TimerShared) {
    let mut slot = shared.lock();
    loop {
        if slot.shutdown {
            return;
        }
        match slot.pending.as_ref().map(|(deadline, _)| *deadline) {
            None => {
                slot = shared
                    .wakeup
                    .wait(slot)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
            }
            Some(deadline) => {
                let now = Instant::now();
                if now < deadline {
                    // Re-checked on wake: the slot may have been re-armed or
                    // cancelled while waiting.
                    slot = shared
                        .wakeup
                        .wait_timeout(slot, deadline - now)
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .0;
                } else if let Some((_, tick)) = slot.pending.take() {
                    drop(slot);
                    tick();
                    slot = shared.lock();
                }
            }
        }
    }
}
