// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Single-worker task queue with bounded drain-then-cancel shutdown

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::DispatchError;
use crate::DIAGNOSTICS_TARGET;

/// How long `shutdown` waits for queued work before cancelling
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Maximum number of queued, not yet started tasks
pub const DEFAULT_QUEUE_CAPACITY: usize = 8192;

/// How a shutdown ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every queued task ran before the grace period elapsed
    Drained,
    /// The grace period elapsed; tasks not yet started were discarded
    Cancelled,
}

/// Runs submitted items through one handler on a dedicated thread
///
/// Items are handled strictly in submission order, one at a time. Submission
/// never blocks: when the queue is full the item is handed back as an error.
pub struct AsyncDispatcher<T> {
    name: String,
    sender: Mutex<Option<SyncSender<T>>>,
    done: Mutex<Option<Receiver<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    cancelled: Arc<AtomicBool>,
    outcome: Mutex<Option<ShutdownOutcome>>,
}

impl<T: Send + 'static> AsyncDispatcher<T> {
    /// Spawn the worker thread
    ///
    /// # Errors
    ///
    /// Fails only if the operating system refuses to create the thread.
    pub fn spawn<F>(name: impl Into<String>, capacity: usize, mut handler: F) -> std::io::Result<Self>
    where
        F: FnMut(T) + Send + 'static,
    {
        let name = name.into();
        let (sender, receiver) = mpsc::sync_channel::<T>(capacity.max(1));
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let cancelled = Arc::new(AtomicBool::new(false));

        let worker_cancelled = Arc::clone(&cancelled);
        let worker_name = name.clone();
        let worker = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                while let Ok(item) = receiver.recv() {
                    if worker_cancelled.load(Ordering::Acquire) {
                        break;
                    }
                    if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(item))) {
                        tracing::error!(
                            target: DIAGNOSTICS_TARGET,
                            dispatcher = %worker_name,
                            panic = panic_message(panic.as_ref()),
                            "Export task panicked"
                        );
                    }
                }
                let _ = done_tx.send(());
            })?;

        Ok(Self {
            name,
            sender: Mutex::new(Some(sender)),
            done: Mutex::new(Some(done_rx)),
            worker: Mutex::new(Some(worker)),
            cancelled,
            outcome: Mutex::new(None),
        })
    }

    /// Queue an item without blocking
    ///
    /// # Errors
    ///
    /// [`DispatchError::QueueFull`] when the queue is at capacity, and
    /// [`DispatchError::Stopped`] once shutdown has begun.
    pub fn dispatch(&self, item: T) -> Result<(), DispatchError> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = sender.as_ref().ok_or(DispatchError::Stopped)?;
        sender.try_send(item).map_err(|e| match e {
            TrySendError::Full(_) => DispatchError::QueueFull,
            TrySendError::Disconnected(_) => DispatchError::Stopped,
        })
    }

    pub fn is_running(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Stop accepting work, drain for up to `grace`, then cancel
    ///
    /// After cancellation no further task starts; a task already running is
    /// left to finish on its own. Later calls return the first outcome.
    pub fn shutdown(&self, grace: Duration) -> ShutdownOutcome {
        // Held for the whole shutdown so concurrent callers see one outcome
        let mut outcome = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(outcome) = *outcome {
            return outcome;
        }

        // Dropping the sender lets the worker exit once the queue is empty
        drop(
            self.sender
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );

        let done = self
            .done
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let result = match done.map(|done| done.recv_timeout(grace)) {
            None | Some(Ok(())) | Some(Err(RecvTimeoutError::Disconnected)) => {
                if let Some(worker) = worker {
                    let _ = worker.join();
                }
                tracing::debug!(target: DIAGNOSTICS_TARGET, dispatcher = %self.name, "Dispatcher drained");
                ShutdownOutcome::Drained
            }
            Some(Err(RecvTimeoutError::Timeout)) => {
                self.cancelled.store(true, Ordering::Release);
                tracing::warn!(
                    target: DIAGNOSTICS_TARGET,
                    dispatcher = %self.name,
                    grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
                    "Dispatcher did not drain in time, discarding queued tasks"
                );
                ShutdownOutcome::Cancelled
            }
        };
        *outcome = Some(result);
        result
    }
}

impl<T> std::fmt::Debug for AsyncDispatcher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncDispatcher")
            .field("name", &self.name)
            .field("cancelled", &self.cancelled.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn test_fifo_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let dispatcher =
            AsyncDispatcher::spawn("test-fifo", 64, move |n: u32| sink.lock().unwrap().push(n))
                .unwrap();

        for n in 0..50 {
            dispatcher.dispatch(n).unwrap();
        }
        assert_eq!(dispatcher.shutdown(DEFAULT_GRACE_PERIOD), ShutdownOutcome::Drained);
        assert_eq!(*seen.lock().unwrap(), (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_dispatch_after_shutdown_is_rejected() {
        let dispatcher = AsyncDispatcher::spawn("test-stopped", 4, |_: u32| {}).unwrap();
        assert!(dispatcher.is_running());
        dispatcher.shutdown(DEFAULT_GRACE_PERIOD);

        assert!(!dispatcher.is_running());
        assert_eq!(dispatcher.dispatch(1), Err(DispatchError::Stopped));
        // Idempotent
        assert_eq!(dispatcher.shutdown(DEFAULT_GRACE_PERIOD), ShutdownOutcome::Drained);
    }

    #[test]
    fn test_full_queue_rejects_without_blocking() {
        let (release_tx, release_rx) = channel::<()>();
        let (started_tx, started_rx) = channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let dispatcher = AsyncDispatcher::spawn("test-full", 1, move |_: u32| {
            let _ = started_tx.send(());
            let _ = release_rx.lock().unwrap().recv();
        })
        .unwrap();

        dispatcher.dispatch(1).unwrap();
        started_rx.recv().unwrap();
        dispatcher.dispatch(2).unwrap();
        assert_eq!(dispatcher.dispatch(3), Err(DispatchError::QueueFull));

        release_tx.send(()).unwrap();
        release_tx.send(()).unwrap();
        assert_eq!(dispatcher.shutdown(DEFAULT_GRACE_PERIOD), ShutdownOutcome::Drained);
    }

    #[test]
    fn test_panicking_task_does_not_stop_worker() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let dispatcher = AsyncDispatcher::spawn("test-panic", 8, move |n: u32| {
            if n == 2 {
                panic!("task {} failed", n);
            }
            sink.lock().unwrap().push(n);
        })
        .unwrap();

        for n in 1..=3 {
            dispatcher.dispatch(n).unwrap();
        }
        assert_eq!(dispatcher.shutdown(DEFAULT_GRACE_PERIOD), ShutdownOutcome::Drained);
        assert_eq!(*seen.lock().unwrap(), vec![1, 3]);
    }

    #[test]
    fn test_slow_queue_is_cancelled_after_grace() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let dispatcher = AsyncDispatcher::spawn("test-cancel", 16, move |n: u32| {
            std::thread::sleep(Duration::from_millis(100));
            sink.lock().unwrap().push(n);
        })
        .unwrap();

        for n in 0..10 {
            dispatcher.dispatch(n).unwrap();
        }
        assert_eq!(
            dispatcher.shutdown(Duration::from_millis(150)),
            ShutdownOutcome::Cancelled
        );
        // A repeated shutdown reports how the first one ended
        assert_eq!(dispatcher.shutdown(DEFAULT_GRACE_PERIOD), ShutdownOutcome::Cancelled);

        // Let the in-flight task finish; nothing queued may start afterwards
        std::thread::sleep(Duration::from_millis(400));
        let after_cancel = seen.lock().unwrap().len();
        assert!(after_cancel < 10);
        std::thread::sleep(Duration::from_millis(300));
        assert_eq!(seen.lock().unwrap().len(), after_cancel);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
