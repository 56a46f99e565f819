use std::fmt;
use std::ptr::{self, NonNull};
use std::sync::Arc;

use crossbeam_utils::CachePadded;
use tracing::{debug, trace, warn};

use crate::config::QueueConfig;
use crate::error::PushError;
use crate::node::Node;
use crate::stats::{Counters, QueueStats};
use crate::sync::{AtomicUsize, Condvar, Mutex, Ordering};

/// Unbounded multi-producer multi-consumer FIFO queue.
///
/// The chain always keeps one empty node at the tail, so producers (tail
/// lock) and consumers (head lock) work on different nodes and only meet
/// when a consumer briefly takes the tail lock to test for emptiness.
///
/// - Lock order is head → tail. `push` never holds both locks.
/// - The condition variable is always paired with the head lock.
/// - Blocking pops have no timeout; push a sentinel value to release
///   consumers on shutdown.
pub struct ConcurrentQueue<T> {
    // Owns the whole chain; nodes are reclaimed with `Box::from_raw` as they
    // are detached.
    head: CachePadded<Mutex<NonNull<Node<T>>>>,
    tail: CachePadded<Mutex<NonNull<Node<T>>>>,
    data_ready: Condvar,
    // Consumers registered for a wake-up; read by producers without the head lock.
    waiters: AtomicUsize,
    counters: Counters,
    config: QueueConfig,
}

// SAFETY: nodes are only reached through the head and tail locks, and values
// move in and out whole, so `T: Send` is enough for both.
unsafe impl<T: Send> Send for ConcurrentQueue<T> {}
unsafe impl<T: Send> Sync for ConcurrentQueue<T> {}

impl<T> ConcurrentQueue<T> {
    /// Create an empty queue with the default configuration.
    pub fn new() -> Self {
        Self::with_config(QueueConfig::default())
    }

    /// Create an empty queue labelled and instrumented per `config`.
    pub fn with_config(config: QueueConfig) -> Self {
        let sentinel = Node::alloc();
        debug!(queue = %config.label, metrics = config.metrics, "queue created");
        Self {
            head: CachePadded::new(Mutex::new(sentinel)),
            tail: CachePadded::new(Mutex::new(sentinel)),
            data_ready: Condvar::new(),
            waiters: AtomicUsize::new(0),
            counters: Counters::new(&config),
            config,
        }
    }

    /// Configuration the queue was built with.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Label used in log events and metric labels.
    pub fn label(&self) -> &str {
        &self.config.label
    }

    /// Snapshot of the push/pop/park counters.
    pub fn stats(&self) -> QueueStats {
        self.counters.snapshot()
    }

    /// Append `value` and wake one blocked consumer, if any.
    pub fn push(&self, value: T) {
        self.link(Node::alloc(), value);
    }

    /// Append `value`, handing it back if the new node cannot be allocated.
    /// The queue is unchanged on failure.
    pub fn try_push(&self, value: T) -> Result<(), PushError<T>> {
        match Node::try_alloc() {
            Some(node) => {
                self.link(node, value);
                Ok(())
            }
            None => {
                warn!(queue = %self.config.label, "node allocation failed");
                Err(PushError::AllocationFailed(value))
            }
        }
    }

    /// Pop the front value without blocking; `None` when empty.
    pub fn try_pop(&self) -> Option<T> {
        let mut head = self.head.lock();
        self.detach_front(&mut head)
    }

    /// [`try_pop`](Self::try_pop) returning a shareable handle.
    pub fn try_pop_shared(&self) -> Option<Arc<T>> {
        self.try_pop().map(Arc::new)
    }

    /// Moves the front value into `out`. Returns `false` and leaves `out`
    /// untouched when the queue is empty; a successful pop and the move are
    /// the same event.
    pub fn try_pop_into(&self, out: &mut T) -> bool {
        match self.try_pop() {
            Some(value) => {
                *out = value;
                true
            }
            None => false,
        }
    }

    /// Blocks until a value is available and returns it.
    pub fn wait_and_pop(&self) -> T {
        let mut head = self.head.lock();
        loop {
            if let Some(value) = self.detach_front(&mut head) {
                return value;
            }

            // Register before the final emptiness check so that any push
            // completing after it sees a non-zero waiter count.
            self.waiters.fetch_add(1, Ordering::SeqCst);
            if self.is_tail(*head) {
                self.counters.record_park();
                debug!(queue = %self.config.label, "consumer parked");
                self.data_ready.wait(&mut head);
                debug!(queue = %self.config.label, "consumer woke");
            }
            self.waiters.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// [`wait_and_pop`](Self::wait_and_pop) returning a shareable handle.
    pub fn wait_and_pop_shared(&self) -> Arc<T> {
        Arc::new(self.wait_and_pop())
    }

    /// Blocks until a value is available and moves it into `out`.
    pub fn wait_and_pop_into(&self, out: &mut T) {
        *out = self.wait_and_pop();
    }

    /// Snapshot emptiness test. The answer may be stale as soon as it returns.
    pub fn is_empty(&self) -> bool {
        let head = self.head.lock();
        self.is_tail(*head)
    }

    fn link(&self, node: NonNull<Node<T>>, value: T) {
        {
            let mut tail = self.tail.lock();
            let current = tail.as_ptr();
            // SAFETY: the tail node is alive (it is reachable from the head and
            // only freed once it stops being the tail) and its fields are only
            // written under the tail lock. Consumers never read the fields of
            // the node that is currently the tail.
            unsafe {
                ptr::addr_of_mut!((*current).value).write(Some(value));
                ptr::addr_of_mut!((*current).next).write(node.as_ptr());
            }
            *tail = node;
        }
        self.counters.record_push();
        trace!(queue = %self.config.label, "pushed");
        self.wake_one();
    }

    fn wake_one(&self) {
        if self.waiters.load(Ordering::SeqCst) == 0 {
            return;
        }
        // A registered consumer holds the head lock from its last emptiness
        // check until it parks; passing through the lock orders this
        // notification after the park.
        drop(self.head.lock());
        self.data_ready.notify_one();
    }

    // Caller holds the head lock.
    fn detach_front(&self, head: &mut NonNull<Node<T>>) -> Option<T> {
        if self.is_tail(*head) {
            return None;
        }
        let front = *head;
        // SAFETY: `front` is not the tail, so the producer that filled it
        // released the tail lock before our `is_tail` acquired it, and no
        // producer touches it again.
        let next = unsafe { (*front.as_ptr()).next };
        *head = NonNull::new(next)?;
        // SAFETY: `front` is now unreachable from both the head and the tail.
        let mut detached = unsafe { Node::into_box(front) };
        let value = detached.value.take();
        debug_assert!(value.is_some(), "non-tail node without a value");
        self.counters.record_pop();
        trace!(queue = %self.config.label, "popped");
        value
    }

    // Caller holds the head lock; takes the tail lock only for the comparison.
    fn is_tail(&self, node: NonNull<Node<T>>) -> bool {
        *self.tail.lock() == node
    }
}

impl<T> Drop for ConcurrentQueue<T> {
    // Walk the chain iteratively; recursion would blow the stack on long queues.
    fn drop(&mut self) {
        let mut next = self.head.lock().as_ptr();
        while let Some(node) = NonNull::new(next) {
            // SAFETY: `&mut self` excludes every other user of the chain, and
            // each node is reclaimed exactly once as the walk moves past it.
            let node = unsafe { Node::into_box(node) };
            next = node.next;
        }
    }
}

impl<T> Default for ConcurrentQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ConcurrentQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentQueue")
            .field("label", &self.config.label)
            .field("is_empty", &self.is_empty())
            .finish()
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize as StdAtomicUsize, Ordering as StdOrdering};
    use std::thread;

    #[test]
    fn fresh_queue_is_empty() {
        let q = ConcurrentQueue::<u32>::new();
        assert!(q.is_empty());
        assert_eq!(q.try_pop(), None);
        let mut out = 9;
        assert!(!q.try_pop_into(&mut out));
        assert_eq!(out, 9);
    }

    #[test]
    fn pops_in_push_order() {
        let q = ConcurrentQueue::new();
        q.push(1);
        q.push(2);
        q.push(3);
        assert!(!q.is_empty());
        assert_eq!(q.try_pop(), Some(1));
        assert_eq!(q.try_pop(), Some(2));
        assert_eq!(q.try_pop(), Some(3));
        assert_eq!(q.try_pop(), None);
        assert!(q.is_empty());
    }

    #[test]
    fn queue_reusable_after_draining() {
        let q = ConcurrentQueue::new();
        for round in 0..3 {
            q.push(round);
            assert_eq!(q.try_pop(), Some(round));
            assert!(q.is_empty());
        }
    }

    #[test]
    fn pop_into_moves_value() {
        let q = ConcurrentQueue::new();
        q.push(String::from("a"));
        q.push(String::from("b"));
        let mut out = String::new();
        assert!(q.try_pop_into(&mut out));
        assert_eq!(out, "a");
        q.wait_and_pop_into(&mut out);
        assert_eq!(out, "b");
        assert!(!q.try_pop_into(&mut out));
        assert_eq!(out, "b");
    }

    #[test]
    fn shared_handles() {
        let q = ConcurrentQueue::new();
        q.push(vec![1u8, 2]);
        q.push(vec![3u8]);
        let first = q.try_pop_shared().unwrap();
        let reader = Arc::clone(&first);
        assert_eq!(*reader, vec![1, 2]);
        assert_eq!(*q.wait_and_pop_shared(), vec![3]);
        assert!(q.try_pop_shared().is_none());
    }

    #[test]
    fn try_push_enqueues() {
        let q = ConcurrentQueue::new();
        q.try_push("x").unwrap();
        assert_eq!(q.try_pop(), Some("x"));
    }

    #[test]
    fn wait_and_pop_blocks_until_push() {
        let q = Arc::new(ConcurrentQueue::new());
        let consumer = {
            let q = Arc::clone(&q);
            thread::spawn(move || q.wait_and_pop())
        };
        while q.stats().parked < 1 {
            thread::yield_now();
        }
        assert!(!consumer.is_finished());
        q.push(42u64);
        assert_eq!(consumer.join().unwrap(), 42);
        assert!(q.is_empty());
    }

    // Single-threaded walk over every chain transition; cheap enough to run
    // under Miri.
    #[test]
    fn chain_survives_drain_and_refill() {
        let q = ConcurrentQueue::new();
        q.push(String::from("one"));
        q.push(String::from("two"));
        assert_eq!(q.try_pop().as_deref(), Some("one"));
        assert_eq!(q.try_pop().as_deref(), Some("two"));
        assert!(q.is_empty());
        assert_eq!(q.try_pop(), None);
        q.push(String::from("three"));
        q.try_push(String::from("four")).unwrap();
        assert_eq!(q.wait_and_pop(), "three");
        q.push(String::from("left behind"));
        assert_eq!(q.stats().in_flight(), 2);
        drop(q);
    }

    #[test]
    fn wait_and_pop_returns_immediately_when_data_present() {
        let q = ConcurrentQueue::new();
        q.push(5);
        assert_eq!(q.wait_and_pop(), 5);
        assert_eq!(q.stats().parked, 0);
    }

    #[test]
    fn stats_track_operations() {
        let q = ConcurrentQueue::with_config(QueueConfig::new("stats").with_metrics(true));
        for i in 0..10 {
            q.push(i);
        }
        for _ in 0..4 {
            q.try_pop();
        }
        q.try_pop();
        let stats = q.stats();
        assert_eq!(stats.pushed, 10);
        assert_eq!(stats.popped, 5);
        assert_eq!(stats.in_flight(), 5);
    }

    #[test]
    fn debug_reports_label_and_emptiness() {
        let q = ConcurrentQueue::<u8>::with_config(QueueConfig::new("jobs"));
        assert_eq!(
            format!("{q:?}"),
            r#"ConcurrentQueue { label: "jobs", is_empty: true }"#
        );
        assert_eq!(q.label(), "jobs");
        assert_eq!(q.config(), &QueueConfig::new("jobs"));
    }

    struct DropCounter(Arc<StdAtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, StdOrdering::SeqCst);
        }
    }

    #[test]
    fn drop_releases_remaining_values_once() {
        let drops = Arc::new(StdAtomicUsize::new(0));
        let q = ConcurrentQueue::new();
        for _ in 0..8 {
            q.push(DropCounter(Arc::clone(&drops)));
        }
        drop(q.try_pop());
        assert_eq!(drops.load(StdOrdering::SeqCst), 1);
        drop(q);
        assert_eq!(drops.load(StdOrdering::SeqCst), 8);
    }

    #[test]
    fn drop_long_queue() {
        let q = ConcurrentQueue::new();
        for i in 0..1_000_000u32 {
            q.push(i);
        }
        drop(q);
    }

    #[test]
    fn queue_is_send_and_sync() {
        fn assert_send_sync<S: Send + Sync>() {}
        assert_send_sync::<ConcurrentQueue<String>>();
    }
}
