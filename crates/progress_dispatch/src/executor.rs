use std::sync::mpsc;
use std::thread;

use progress_core::NotifyExecutor;

type Work = Box<dyn FnOnce() + Send>;

/// Single background worker draining queued observer notifications.
pub struct WorkerExecutor {
    tx: Option<mpsc::Sender<Work>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl WorkerExecutor {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel::<Work>();
        let worker = thread::Builder::new()
            .name("progress-notify".to_string())
            .spawn(move || {
                while let Ok(work) = rx.recv() {
                    work();
                }
            })
            .expect("spawn notify worker");
        Self {
            tx: Some(tx),
            worker: Some(worker),
        }
    }
}

impl Default for WorkerExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyExecutor for WorkerExecutor {
    fn execute(&self, work: Work) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(work);
        }
    }
}

impl Drop for WorkerExecutor {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain what is queued and exit.
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
