//! Shared blocking work queue with completion tracking.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Outcome of one bounded poll.
#[derive(Debug, PartialEq, Eq)]
pub enum Poll<T> {
    Item(T),
    /// Nothing arrived within the poll window; more work may still come.
    Empty,
    /// The queue is closed and drained.
    Closed,
}

/// FIFO queue shared by the worker pool.
///
/// Tracks outstanding work: an item counts from [`push`](Self::push) until the
/// worker that took it calls [`task_done`](Self::task_done). The queue closes
/// itself when nothing is outstanding, since only in-flight items can produce
/// new ones.
pub struct WorkQueue<T> {
    inner: Mutex<Inner<T>>,
    available: Condvar,
}

struct Inner<T> {
    items: VecDeque<T>,
    outstanding: usize,
    closed: bool,
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                outstanding: 0,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue an item. Returns false if the queue is already closed.
    pub fn push(&self, item: T) -> bool {
        let mut inner = self.lock();
        if inner.closed {
            return false;
        }
        inner.items.push_back(item);
        inner.outstanding += 1;
        drop(inner);
        self.available.notify_one();
        true
    }

    /// Take the next item, waiting at most `timeout`.
    pub fn poll(&self, timeout: Duration) -> Poll<T> {
        let mut inner = self.lock();
        if inner.items.is_empty() && !inner.closed {
            inner = self
                .available
                .wait_timeout(inner, timeout)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        match inner.items.pop_front() {
            Some(item) => Poll::Item(item),
            None if inner.closed => Poll::Closed,
            None => Poll::Empty,
        }
    }

    /// Mark one taken item as fully processed, closing the queue if it was the last.
    pub fn task_done(&self) {
        let mut inner = self.lock();
        inner.outstanding = inner.outstanding.saturating_sub(1);
        if inner.outstanding == 0 {
            inner.closed = true;
            drop(inner);
            self.available.notify_all();
        }
    }

    /// Close the queue if nothing was ever enqueued or everything is done.
    pub fn close_if_idle(&self) -> bool {
        let mut inner = self.lock();
        if inner.outstanding == 0 {
            inner.closed = true;
            drop(inner);
            self.available.notify_all();
            return true;
        }
        false
    }

    /// Close immediately and drop pending items.
    pub fn abort(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        inner.items.clear();
        drop(inner);
        self.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items pushed and not yet marked done.
    pub fn outstanding(&self) -> usize {
        self.lock().outstanding
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    const TICK: Duration = Duration::from_millis(10);

    #[test]
    fn test_fifo_order() {
        let q = WorkQueue::new();
        q.push(1);
        q.push(2);
        assert_eq!(q.poll(TICK), Poll::Item(1));
        assert_eq!(q.poll(TICK), Poll::Item(2));
        assert_eq!(q.poll(TICK), Poll::Empty);
    }

    #[test]
    fn test_closes_when_last_task_done() {
        let q = WorkQueue::new();
        q.push("a");
        let Poll::Item(_) = q.poll(TICK) else {
            panic!("expected item");
        };
        assert!(!q.is_closed());
        q.task_done();
        assert!(q.is_closed());
        assert_eq!(q.poll(TICK), Poll::Closed);
        assert!(!q.push("late"));
    }

    #[test]
    fn test_follow_up_work_keeps_queue_open() {
        let q = WorkQueue::new();
        q.push(1);
        let Poll::Item(n) = q.poll(TICK) else {
            panic!("expected item");
        };
        q.push(n + 1);
        q.task_done();
        assert!(!q.is_closed());
        assert_eq!(q.poll(TICK), Poll::Item(2));
        q.task_done();
        assert_eq!(q.poll(TICK), Poll::Closed);
    }

    #[test]
    fn test_close_if_idle() {
        let q: WorkQueue<u8> = WorkQueue::new();
        assert!(q.close_if_idle());
        assert_eq!(q.poll(TICK), Poll::Closed);

        let q = WorkQueue::new();
        q.push(1u8);
        assert!(!q.close_if_idle());
    }

    #[test]
    fn test_abort_drops_pending_items() {
        let q = WorkQueue::new();
        q.push(1);
        q.push(2);
        q.abort();
        assert!(q.is_empty());
        assert_eq!(q.poll(TICK), Poll::Closed);
    }

    #[test]
    fn test_every_item_taken_exactly_once() {
        let q = Arc::new(WorkQueue::new());
        for i in 0..200 {
            q.push(i);
        }
        let taken = Arc::new(AtomicUsize::new(0));
        let sum = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let (q, taken, sum) = (Arc::clone(&q), Arc::clone(&taken), Arc::clone(&sum));
                thread::spawn(move || loop {
                    match q.poll(TICK) {
                        Poll::Item(i) => {
                            taken.fetch_add(1, Ordering::Relaxed);
                            sum.fetch_add(i, Ordering::Relaxed);
                            q.task_done();
                        }
                        Poll::Empty => continue,
                        Poll::Closed => break,
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(taken.load(Ordering::Relaxed), 200);
        assert_eq!(sum.load(Ordering::Relaxed), (0..200).sum::<usize>());
        assert_eq!(q.outstanding(), 0);
    }

    proptest! {
        #[test]
        fn prop_closes_exactly_when_work_runs_out(fanout in prop::collection::vec(0usize..4, 1..32)) {
            let q = WorkQueue::new();
            q.push(0usize);
            let mut pushed = 1;
            let mut processed = 0;
            loop {
                match q.poll(Duration::ZERO) {
                    Poll::Item(i) => {
                        for _ in 0..fanout[i % fanout.len()] {
                            if pushed < 64 {
                                q.push(pushed);
                                pushed += 1;
                            }
                        }
                        q.task_done();
                        processed += 1;
                        prop_assert_eq!(q.is_closed(), processed == pushed);
                    }
                    Poll::Empty => prop_assert!(false, "open queue with nothing queued"),
                    Poll::Closed => break,
                }
            }
            prop_assert_eq!(processed, pushed);
            prop_assert_eq!(q.outstanding(), 0);
        }
    }
}
