//! Deferred deletion of expensive resources.
//!
//! Components that own GPU objects (or anything else whose release may block)
//! hand them to the [`DeletionQueue`] instead of dropping them inline. Entries
//! wait in *pending* until the render loop calls [`DeletionQueue::trigger_stage`]
//! after a frame is fully drawn. That call moves every pending entry into
//! *staged* in one step, and a worker thread releases the staged entries off
//! the render path.

use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use crate::error::LoopError;

/// Release operation of a type-erased resource
pub trait Release: Send {
    fn release(self: Box<Self>);
}

struct Deferred<T, F> {
    resource: T,
    release: F,
}

impl<T, F> Release for Deferred<T, F>
where
    T: Send,
    F: FnOnce(T) + Send,
{
    fn release(self: Box<Self>) {
        let Deferred { resource, release } = *self;
        release(resource);
    }
}

/// One resource waiting for deferred release
pub struct DeletionEntry {
    label: &'static str,
    inner: Box<dyn Release>,
}

impl DeletionEntry {
    /// Release by dropping `resource`
    pub fn new<T: Send + 'static>(label: &'static str, resource: T) -> Self {
        Self::with_release(label, resource, drop)
    }

    /// Release by calling `release(resource)`
    pub fn with_release<T, F>(label: &'static str, resource: T, release: F) -> Self
    where
        T: Send + 'static,
        F: FnOnce(T) + Send + 'static,
    {
        Self {
            label,
            inner: Box::new(Deferred { resource, release }),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    fn release(self) {
        self.inner.release();
    }
}

impl std::fmt::Debug for DeletionEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeletionEntry").field("label", &self.label).finish()
    }
}

/// Result of [`DeletionQueue::drain`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    Drained,
    /// Entries still queued when the timeout hit; they are leaked
    TimedOut { remaining: usize },
}

#[derive(Default)]
struct Lists {
    pending: Vec<DeletionEntry>,
    staged: Vec<DeletionEntry>,
    /// Entries taken off `staged` by the worker and not yet released
    releasing: usize,
}

impl Lists {
    fn staged_empty(&self) -> bool {
        self.staged.is_empty() && self.releasing == 0
    }

    fn remaining(&self) -> usize {
        self.pending.len() + self.staged.len() + self.releasing
    }
}

#[derive(Default)]
struct Shared {
    lists: Mutex<Lists>,
    released: Condvar,
    released_total: AtomicU64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Lists> {
        self.lists.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Worker side: release everything currently staged
    fn release_staged(&self) {
        let batch = {
            let mut lists = self.lock();
            let batch = mem::take(&mut lists.staged);
            lists.releasing += batch.len();
            batch
        };

        if batch.is_empty() {
            return;
        }

        let count = batch.len();
        for entry in batch {
            let label = entry.label;
            // Release failures are terminal: log and treat the entry as handled
            if panic::catch_unwind(AssertUnwindSafe(|| entry.release())).is_err() {
                log::warn!("release of `{label}` panicked; entry dropped");
            }
        }

        {
            let mut lists = self.lock();
            self.released_total.fetch_add(count as u64, Ordering::AcqRel);
            lists.releasing -= count;
        }
        self.released.notify_all();
        log::trace!("released {count} deferred entries");
    }
}

enum Command {
    Release,
    Shutdown,
}

/// Two-stage deferred deletion queue with its own release worker
pub struct DeletionQueue {
    shared: Arc<Shared>,
    commands: Sender<Command>,
    worker: Option<JoinHandle<()>>,
    /// Set while the last drain gave up on a release that never finished
    abandoned: AtomicBool,
}

impl DeletionQueue {
    /// Create the queue and spawn its release worker
    pub fn new() -> Result<Self, LoopError> {
        let shared = Arc::new(Shared::default());
        let (commands, receiver) = crossbeam_channel::unbounded();

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("deletion-worker".to_string())
            .spawn(move || run_worker(&worker_shared, &receiver))
            .map_err(|source| LoopError::SpawnThread {
                name: "deletion-worker",
                source,
            })?;

        Ok(Self {
            shared,
            commands,
            worker: Some(worker),
            abandoned: AtomicBool::new(false),
        })
    }

    /// Queue a resource for deferred release. Callable from any thread.
    pub fn register(&self, entry: DeletionEntry) {
        log::trace!("deferring release of `{}`", entry.label);
        self.shared.lock().pending.push(entry);
    }

    /// Move every pending entry to staged and wake the worker.
    ///
    /// Only the move happens on the calling thread. Returns the number of
    /// entries moved.
    pub fn trigger_stage(&self) -> usize {
        let moved = {
            let mut lists = self.shared.lock();
            let moved = lists.pending.len();
            let pending = mem::take(&mut lists.pending);
            lists.staged.extend(pending);
            moved
        };

        if moved > 0 && self.commands.send(Command::Release).is_err() {
            log::warn!("deletion worker is gone; {moved} entries stay staged");
        }
        moved
    }

    pub fn is_pending_empty(&self) -> bool {
        self.shared.lock().pending.is_empty()
    }

    /// True once nothing is staged and no release is in flight
    pub fn is_staged_empty(&self) -> bool {
        self.shared.lock().staged_empty()
    }

    /// Total number of entries released since creation
    pub fn released_count(&self) -> u64 {
        self.shared.released_total.load(Ordering::Acquire)
    }

    /// Stage and wait until both collections are empty.
    ///
    /// Each round triggers staging, then sleeps on the release signal for at
    /// most `poll`. With `timeout == None` this only returns once everything
    /// registered has been released.
    pub fn drain(&self, poll: Duration, timeout: Option<Duration>) -> DrainOutcome {
        let started = Instant::now();

        loop {
            self.trigger_stage();

            let lists = self.shared.lock();
            let (lists, _) = self
                .shared
                .released
                .wait_timeout_while(lists, poll, |lists| !lists.staged_empty())
                .unwrap_or_else(PoisonError::into_inner);

            if lists.pending.is_empty() && lists.staged_empty() {
                self.abandoned.store(false, Ordering::Release);
                return DrainOutcome::Drained;
            }

            if let Some(limit) = timeout {
                if started.elapsed() >= limit {
                    self.abandoned.store(true, Ordering::Release);
                    return DrainOutcome::TimedOut {
                        remaining: lists.remaining(),
                    };
                }
            }
        }
    }
}

impl Drop for DeletionQueue {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);

        // After a timed-out drain the worker may be stuck in a release forever.
        // Detach it and leak whatever is left instead of blocking on join.
        if self.abandoned.load(Ordering::Acquire) {
            let leaked = {
                let mut lists = self.shared.lock();
                let leaked = lists.remaining();
                mem::forget(mem::take(&mut lists.pending));
                mem::forget(mem::take(&mut lists.staged));
                leaked
            };
            drop(self.worker.take());
            log::warn!("deletion worker detached at shutdown; leaking {leaked} entries");
            return;
        }

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("deletion worker panicked during shutdown");
            }
        }

        // Whatever is left was never staged; release it here so nothing leaks
        let leftovers = {
            let mut lists = self.shared.lock();
            let mut leftovers = mem::take(&mut lists.staged);
            leftovers.append(&mut lists.pending);
            leftovers
        };
        if !leftovers.is_empty() {
            log::debug!("releasing {} entries left at shutdown", leftovers.len());
            let mut lists = self.shared.lock();
            lists.staged = leftovers;
            drop(lists);
            self.shared.release_staged();
        }
    }
}

fn run_worker(shared: &Shared, commands: &Receiver<Command>) {
    while let Ok(command) = commands.recv() {
        match command {
            Command::Release => shared.release_staged(),
            Command::Shutdown => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    const POLL: Duration = Duration::from_millis(1);

    fn counting_entry(counter: &Arc<AtomicUsize>) -> DeletionEntry {
        let counter = Arc::clone(counter);
        DeletionEntry::with_release("counter", (), move |()| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn register_only_touches_pending() {
        let queue = DeletionQueue::new().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        queue.register(counting_entry(&counter));

        assert!(!queue.is_pending_empty());
        assert!(queue.is_staged_empty());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn trigger_moves_everything_pending() {
        let queue = DeletionQueue::new().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        queue.register(counting_entry(&counter));
        queue.register(counting_entry(&counter));

        assert_eq!(queue.trigger_stage(), 2);
        assert!(queue.is_pending_empty());
        assert_eq!(queue.drain(POLL, None), DrainOutcome::Drained);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(queue.released_count(), 2);
    }

    #[test]
    fn trigger_on_empty_queue_is_noop() {
        let queue = DeletionQueue::new().unwrap();
        assert_eq!(queue.trigger_stage(), 0);
        assert!(queue.is_staged_empty());
    }

    #[test]
    fn panicking_release_is_not_retried() {
        let queue = DeletionQueue::new().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        queue.register(DeletionEntry::with_release("boom", (), |()| panic!("release failed")));
        queue.register(counting_entry(&counter));

        assert_eq!(queue.drain(POLL, None), DrainOutcome::Drained);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(queue.released_count(), 2);
    }

    #[test]
    fn drain_times_out_on_blocked_release() {
        let queue = DeletionQueue::new().unwrap();
        let (unblock, blocked) = crossbeam_channel::bounded::<()>(0);

        queue.register(DeletionEntry::with_release("blocked", blocked, |rx| {
            let _ = rx.recv();
        }));

        let outcome = queue.drain(POLL, Some(Duration::from_millis(20)));
        assert_eq!(outcome, DrainOutcome::TimedOut { remaining: 1 });

        drop(unblock);
        assert_eq!(queue.drain(POLL, None), DrainOutcome::Drained);
        assert!(!queue.abandoned.load(Ordering::Acquire));
    }

    #[test]
    fn drop_releases_unstaged_entries() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let queue = DeletionQueue::new().unwrap();
            queue.register(counting_entry(&counter));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn entry_debug_shows_label() {
        let entry = DeletionEntry::new("texture", vec![0u8; 4]);
        assert_eq!(entry.label(), "texture");
        assert!(format!("{entry:?}").contains("texture"));
    }
}
