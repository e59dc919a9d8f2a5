//! Keyed, time-bounded store for live conversation sessions.
//!
//! Events for one conversation must observe the session in arrival order, so
//! every read-modify-write runs under that conversation's own lock. A
//! background sweeper evicts sessions idle past the TTL.

use std::collections::HashMap;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use tracing::info;

/// Conversation identifier from the messaging channel.
pub type ConversationId = i64;

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct Entry<S> {
    state: Option<S>,
    last_activity: Instant,
    /// Set once the entry is unlinked from the map; waiters must retry.
    evicted: bool,
}

pub struct SessionStore<S> {
    entries: Mutex<HashMap<ConversationId, Arc<Mutex<Entry<S>>>>>,
    ttl: Duration,
}

impl<S> SessionStore<S> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Run `f` against the session for `key` under that key's lock.
    ///
    /// The closure sees `None` when no live session exists (never created,
    /// ended, or idle past the TTL) and may install one by writing `Some`.
    /// Leaving `None` behind removes the entry.
    pub fn update<T>(&self, key: ConversationId, f: impl FnOnce(&mut Option<S>) -> T) -> T {
        let mut f = Some(f);
        loop {
            let entry = {
                let mut entries = lock(&self.entries);
                entries
                    .entry(key)
                    .or_insert_with(|| {
                        Arc::new(Mutex::new(Entry {
                            state: None,
                            last_activity: Instant::now(),
                            evicted: false,
                        }))
                    })
                    .clone()
            };

            let mut guard = lock(&entry);
            if guard.evicted {
                // raced with the sweeper; take a fresh entry
                continue;
            }

            if guard.state.is_some() && guard.last_activity.elapsed() > self.ttl {
                guard.state = None;
            }

            // take() cannot miss: the closure is consumed only on the
            // iteration that returns
            let f = f.take().unwrap();
            let result = f(&mut guard.state);
            guard.last_activity = Instant::now();

            if guard.state.is_none() {
                guard.evicted = true;
                lock(&self.entries).remove(&key);
            }
            return result;
        }
    }

    /// Whether a live (non-expired) session exists for `key`.
    pub fn is_active(&self, key: ConversationId) -> bool {
        let entry = lock(&self.entries).get(&key).cloned();
        match entry {
            Some(entry) => {
                let guard = lock(&entry);
                guard.state.is_some() && guard.last_activity.elapsed() <= self.ttl
            }
            None => false,
        }
    }

    pub fn remove(&self, key: ConversationId) {
        self.update(key, |state| {
            *state = None;
        });
    }

    /// Evict sessions idle past the TTL.
    ///
    /// Entries whose lock is held by an in-flight update are skipped; that
    /// update refreshes their activity anyway.
    pub fn sweep(&self) -> usize {
        let snapshot: Vec<(ConversationId, Arc<Mutex<Entry<S>>>)> = lock(&self.entries)
            .iter()
            .map(|(key, entry)| (*key, entry.clone()))
            .collect();

        let mut evicted = 0;
        for (key, entry) in snapshot {
            let Ok(mut guard) = entry.try_lock() else {
                continue;
            };
            if guard.evicted || guard.state.is_none() {
                continue;
            }
            if guard.last_activity.elapsed() > self.ttl {
                guard.state = None;
                guard.evicted = true;
                lock(&self.entries).remove(&key);
                evicted += 1;
            }
        }

        if evicted > 0 {
            info!(evicted, "swept expired sessions");
        }
        evicted
    }
}

/// A poisoned session lock only means a handler panicked mid-event; the map
/// and entries are still structurally sound.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Periodic TTL sweep on a background thread. Stops and joins on drop.
pub struct Sweeper {
    stop: mpsc::Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Sweeper {
    pub fn spawn<S>(store: Arc<SessionStore<S>>, interval: Duration) -> Self
    where
        S: Send + 'static,
    {
        let (stop, wake) = mpsc::channel::<()>();
        let handle = thread::spawn(move || {
            loop {
                match wake.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        store.sweep();
                    }
                    _ => break,
                }
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        let _ = self.stop.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
