//! Bounded fan-out over a fixed number of worker threads.
//!
//! One producer hands items over a rendezvous channel, so an item only
//! leaves the producer when a worker takes it and at most `workers` items
//! are ever in flight. After an abort every item still handed over is
//! skipped without calling `work`.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc, Mutex, PoisonError,
};

use indicatif::ProgressBar;

/// What happened to one submitted item.
#[derive(Debug)]
pub enum Outcome<R, E> {
    Done(R),
    Failed(E),
    /// Received after an abort and never processed
    Skipped,
}

#[derive(Debug)]
pub struct FanOutResult<R, E> {
    /// Outcomes tagged with their submission sequence number, in completion order
    pub outcomes: Vec<(usize, Outcome<R, E>)>,
    /// Items taken by a worker, skipped ones included
    pub submitted: usize,
    pub aborted: bool,
}

pub struct WorkerPool {
    workers: usize,
    abort_on_error: bool,
    progress: ProgressBar,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        WorkerPool {
            workers: workers.max(1),
            abort_on_error: true,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn abort_on_error(mut self, abort: bool) -> Self {
        self.abort_on_error = abort;
        self
    }

    /// Ticked once per submitted item.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `work` over `items` and returns once every worker has exited.
    pub fn run<I, T, R, E, F>(&self, items: I, work: F) -> FanOutResult<R, E>
    where
        I: IntoIterator<Item = T>,
        T: Send,
        R: Send,
        E: Send,
        F: Fn(T) -> Result<R, E> + Sync,
    {
        let (task_tx, task_rx) = mpsc::sync_channel::<(usize, T)>(0);
        let task_rx = Mutex::new(task_rx);
        let outcomes = Mutex::new(Vec::new());
        let aborted = AtomicBool::new(false);
        let abort_on_error = self.abort_on_error;
        let mut submitted = 0;

        std::thread::scope(|scope| {
            for worker in 0..self.workers {
                let task_rx = &task_rx;
                let outcomes = &outcomes;
                let aborted = &aborted;
                let work = &work;

                scope.spawn(move || loop {
                    let received = task_rx
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .recv();

                    let Ok((seq, item)) = received else {
                        log::trace!("worker {worker}: queue closed");
                        return;
                    };

                    // checked after taking the item, so nothing handed over
                    // once a failure is known reaches `work`
                    let outcome = if aborted.load(Ordering::SeqCst) {
                        Outcome::Skipped
                    } else {
                        match work(item) {
                            Ok(value) => Outcome::Done(value),
                            Err(err) => {
                                if abort_on_error {
                                    aborted.store(true, Ordering::SeqCst);
                                }
                                Outcome::Failed(err)
                            }
                        }
                    };

                    outcomes
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push((seq, outcome));
                });
            }

            for (seq, item) in items.into_iter().enumerate() {
                if aborted.load(Ordering::SeqCst) {
                    log::debug!("stopped feeding workers after {seq} items");
                    break;
                }
                // blocks until a worker takes the item
                if task_tx.send((seq, item)).is_err() {
                    break;
                }
                submitted += 1;
                self.progress.inc(1);
            }

            // closing the queue lets idle workers exit
            drop(task_tx);
        });

        FanOutResult {
            outcomes: outcomes.into_inner().unwrap_or_else(PoisonError::into_inner),
            submitted,
            aborted: aborted.load(Ordering::SeqCst),
        }
    }
}
