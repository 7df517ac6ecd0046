//! In-memory cache with expiring entries.
//!
//! Every entry carries its own time-to-live. Expired entries are reclaimed
//! two ways: a read that finds one deletes it on the spot (so stale values
//! are never observable), and an optional background sweep started with
//! [`Cache::start_gc`] clears out the ones nobody ever reads again.
//!
//! ```rust
//! use plinth::Cache;
//!
//! let cache = Cache::new(0);
//! cache.set("greeting", "hello", 60);
//! assert_eq!(cache.get("greeting").as_deref(), Some("hello"));
//! ```

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::oneshot;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Capacity used when [`Cache::new`] gets a zero size hint. First prime
/// past 1000.
const DEFAULT_CAPACITY: usize = 1009;

/// Lifetime in seconds used when [`Cache::set`] gets a TTL below 1.
const DEFAULT_TTL: i64 = 3600;

/// Sweep interval used when [`Cache::start_gc`] gets a zero interval.
const DEFAULT_SWEEP: Duration = Duration::from_secs(10);

struct Entry {
    value: String,
    expires_at: i64,
}

/// A concurrency-safe key/value store where every entry has a bounded
/// lifetime.
///
/// One reader/writer lock guards the whole table. Reads take the read lock;
/// writes, deletes and sweeps take the write lock. All lock sections are
/// O(1) except the sweep, which holds the write lock for a full pass over
/// the table; a sweep of a very large cache briefly blocks every caller.
pub struct Cache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl Cache {
    /// Creates a cache preallocated for roughly `size_hint` entries, or a
    /// default capacity when the hint is zero.
    pub fn new(size_hint: usize) -> Self {
        let capacity = if size_hint < 1 { DEFAULT_CAPACITY } else { size_hint };
        Self {
            entries: RwLock::new(HashMap::with_capacity(capacity)),
        }
    }

    /// Number of physically stored entries.
    ///
    /// Expired entries linger until a read or a sweep removes them, so this
    /// can overcount the live ones in between.
    pub fn len(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up `key`, returning its value while the entry is still live.
    ///
    /// An entry found past its expiry is deleted here and reported absent,
    /// whether or not a background sweep is running.
    pub fn get(&self, key: &str) -> Option<String> {
        {
            let entries = self.entries.read().expect("cache lock poisoned");
            match entries.get(key) {
                None => return None,
                Some(entry) if now_unix() < entry.expires_at => {
                    return Some(entry.value.clone());
                }
                Some(_) => {} // expired; fall through to the delete below
            }
        }
        // The read lock is released before the delete takes the write lock;
        // there is no lock upgrade. Two readers can race to delete the same
        // expired key, and the loser's delete is a no-op.
        self.del(key);
        None
    }

    /// Stores `value` under `key` for `ttl_secs` seconds, unconditionally
    /// overwriting any previous entry. A TTL below 1 substitutes the
    /// default.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>, ttl_secs: i64) {
        let ttl = if ttl_secs < 1 { DEFAULT_TTL } else { ttl_secs };
        let entry = Entry {
            value: value.into(),
            expires_at: now_unix() + ttl,
        };
        self.entries
            .write()
            .expect("cache lock poisoned")
            .insert(key.into(), entry);
    }

    /// Removes `key`. Absent keys are a no-op.
    pub fn del(&self, key: &str) {
        self.entries.write().expect("cache lock poisoned").remove(key);
    }

    fn clear_expired(&self) {
        let now = now_unix();
        self.entries
            .write()
            .expect("cache lock poisoned")
            .retain(|_, entry| now < entry.expires_at);
    }

    /// Starts a background task that clears expired entries every `every`
    /// (or a default interval when `every` is zero).
    ///
    /// The returned [`CancelSweep`] stops the task: no further ticks run,
    /// though a sweep already in progress finishes first. Dropping the
    /// handle without calling [`cancel`](CancelSweep::cancel) stops the
    /// sweep too. Each call starts an independent sweep with its own
    /// handle.
    ///
    /// Must be called from within a tokio runtime. The task keeps the cache
    /// alive until it is stopped.
    pub fn start_gc(self: &Arc<Self>, every: Duration) -> CancelSweep {
        let every = if every.is_zero() { DEFAULT_SWEEP } else { every };
        let cache = Arc::clone(self);
        let (stop, mut stopped) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let mut tick = time::interval_at(Instant::now() + every, every);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;

                    _ = &mut stopped => break,
                    _ = tick.tick() => cache.clear_expired(),
                }
            }
        });

        CancelSweep { stop }
    }
}

/// Stops a background sweep started by [`Cache::start_gc`].
///
/// [`cancel`](Self::cancel) consumes the handle, so cancelling twice is
/// impossible by construction.
pub struct CancelSweep {
    stop: oneshot::Sender<()>,
}

impl CancelSweep {
    /// Stops the sweep.
    pub fn cancel(self) {
        // A closed receiver means the task is already gone.
        let _ = self.stop.send(());
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is set before the unix epoch")
        .as_secs() as i64
}
