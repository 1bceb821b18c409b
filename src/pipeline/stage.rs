use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use threadpool::ThreadPool;

use super::queue::{Job, StageQueue};

/// How long an idle worker waits on its queue before polling again.
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// A fixed set of long-lived workers draining one queue.
pub struct Stage<T> {
    name: String,
    queue: Arc<StageQueue<T>>,
    pool: ThreadPool,
    workers: usize,
}

impl<T: Send + 'static> Stage<T> {
    /// Start `workers` threads, each running `handler` on every item it pulls.
    pub fn spawn<F>(name: &str, workers: usize, handler: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let workers = workers.max(1);
        let queue = Arc::new(StageQueue::new());
        let pool = ThreadPool::with_name(name.to_string(), workers);
        let handler = Arc::new(handler);

        tracing::debug!("Starting {} threads of {}", workers, name);
        for _ in 0..workers {
            let queue = Arc::clone(&queue);
            let handler = Arc::clone(&handler);
            let stage = name.to_string();
            pool.execute(move || worker_loop(&stage, &queue, &*handler));
        }

        Self {
            name: name.to_string(),
            queue,
            pool,
            workers,
        }
    }

    pub fn queue(&self) -> Arc<StageQueue<T>> {
        Arc::clone(&self.queue)
    }

    pub fn submit(&self, item: T) {
        self.queue.put(item);
    }

    /// Wait for every submitted item to be handled, then send one stop per
    /// worker and wait for all of them to exit.
    pub fn finish(self) {
        tracing::debug!("Waiting on {} unfinished {} items", self.queue.unfinished(), self.name);
        self.queue.join();
        for _ in 0..self.workers {
            self.queue.stop();
        }
        self.pool.join();
        tracing::debug!("{} queue and threads finished", self.name);
    }
}

fn worker_loop<T>(stage: &str, queue: &StageQueue<T>, handler: &dyn Fn(T)) {
    loop {
        match queue.get(POLL_INTERVAL) {
            Some(Job::Work(item)) => {
                // A panicking item must still be acknowledged or `finish` never returns.
                if panic::catch_unwind(AssertUnwindSafe(|| handler(item))).is_err() {
                    tracing::error!("{} worker panicked while handling an item", stage);
                }
                queue.task_done();
            }
            Some(Job::Stop) => break,
            None => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn every_item_is_handled_exactly_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handled = Arc::new(AtomicUsize::new(0));

        let stage = {
            let seen = Arc::clone(&seen);
            let handled = Arc::clone(&handled);
            Stage::spawn("test-stage", 4, move |item: usize| {
                seen.lock().unwrap().push(item);
                handled.fetch_add(1, Ordering::SeqCst);
            })
        };
        let queue = stage.queue();
        for i in 0..100 {
            stage.submit(i);
        }
        stage.finish();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 100);
        assert_eq!(seen.iter().copied().collect::<HashSet<_>>().len(), 100);
        assert_eq!(handled.load(Ordering::SeqCst), 100);
        assert_eq!(queue.unfinished(), 0);
        // Every stop was consumed by a worker.
        assert_eq!(queue.get(Duration::from_millis(10)), None);
    }

    #[test]
    fn finish_with_no_work_returns() {
        let stage = Stage::spawn("idle-stage", 3, |_: u8| {});
        stage.finish();
    }

    #[test]
    fn panicking_item_does_not_stall_the_stage() {
        let handled = Arc::new(AtomicUsize::new(0));
        let stage = {
            let handled = Arc::clone(&handled);
            Stage::spawn("panicky-stage", 2, move |item: u32| {
                if item == 3 {
                    panic!("bad item");
                }
                handled.fetch_add(1, Ordering::SeqCst);
            })
        };
        for i in 0..6 {
            stage.submit(i);
        }
        stage.finish();

        assert_eq!(handled.load(Ordering::SeqCst), 5);
    }
}
