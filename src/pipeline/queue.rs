use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

/// What a worker pulls off a stage queue.
#[derive(Debug, PartialEq, Eq)]
pub enum Job<T> {
    Work(T),
    /// Exit the worker loop. Consumed by exactly one worker.
    Stop,
}

/// Unbounded handoff queue that tracks unacknowledged work.
///
/// Every `put` must be matched by one `task_done` once the item is handled;
/// `join` blocks until that balance reaches zero. Stop sentinels are not
/// counted.
pub struct StageQueue<T> {
    tx: Sender<Job<T>>,
    rx: Receiver<Job<T>>,
    unfinished: Mutex<usize>,
    all_done: Condvar,
}

impl<T> Default for StageQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> StageQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            unfinished: Mutex::new(0),
            all_done: Condvar::new(),
        }
    }

    pub fn put(&self, item: T) {
        *self.unfinished.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        // The receiver lives in `self`, so the channel cannot be disconnected.
        let _ = self.tx.send(Job::Work(item));
    }

    pub fn stop(&self) {
        let _ = self.tx.send(Job::Stop);
    }

    /// Next job, or `None` if nothing arrived within `timeout`.
    pub fn get(&self, timeout: Duration) -> Option<Job<T>> {
        match self.rx.recv_timeout(timeout) {
            Ok(job) => Some(job),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Acknowledge one item taken with `get`.
    pub fn task_done(&self) {
        let mut unfinished = self.unfinished.lock().unwrap_or_else(PoisonError::into_inner);
        *unfinished = unfinished.saturating_sub(1);
        if *unfinished == 0 {
            self.all_done.notify_all();
        }
    }

    pub fn unfinished(&self) -> usize {
        *self.unfinished.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until every item put so far has been acknowledged.
    pub fn join(&self) {
        let mut unfinished = self.unfinished.lock().unwrap_or_else(PoisonError::into_inner);
        while *unfinished > 0 {
            unfinished = self
                .all_done
                .wait(unfinished)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}
