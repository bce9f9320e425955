//! Short-lived memory of successful binds. A directory client that has just
//! bound will usually issue a search within moments; the cache covers that
//! window and nothing more. Entries die a fixed time after insertion - reads
//! never extend the deadline.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};

use flowbind_proto::v1::FlowUser;

/// How long a successful bind stays usable for follow-up searches.
pub const BIND_SESSION_TTL: Duration = Duration::from_secs(30);

const SWEEP_FREQUENCY: Duration = Duration::from_secs(1);

/// What a successful bind leaves behind: the resolved identity and whether
/// it may search. Created only when authentication and the access check both
/// passed.
#[derive(Debug, Clone)]
pub struct BoundSession {
    pub user: FlowUser,
    pub can_search: bool,
}

#[derive(Debug)]
struct CacheEntry {
    session: BoundSession,
    expires_at: Instant,
}

/// Bind-DN keyed session cache. One lock guards the map for inserts, reads,
/// deletes and the expiry sweep alike.
#[derive(Debug)]
pub struct BoundSessionCache {
    inner: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl BoundSessionCache {
    pub fn new(ttl: Duration) -> Arc<Self> {
        Arc::new(BoundSessionCache {
            inner: Mutex::new(HashMap::new()),
            ttl,
        })
    }

    /// Insert or overwrite the session for a bind DN. An overwrite replaces
    /// the previous entry together with its deadline, so the newest bind
    /// gets the full window.
    pub async fn put(&self, bind_dn: &str, session: BoundSession) {
        let expires_at = Instant::now() + self.ttl;
        let mut inner = self.inner.lock().await;
        inner.insert(bind_dn.to_string(), CacheEntry {
            session,
            expires_at,
        });
    }

    /// Fetch a live session. Entries past their deadline are dropped here
    /// even when the sweeper has not reached them yet, so expiry is exact
    /// rather than sweep-granular.
    pub async fn get(&self, bind_dn: &str) -> Option<BoundSession> {
        let mut inner = self.inner.lock().await;
        match inner.get(bind_dn) {
            Some(entry) if entry.expires_at <= Instant::now() => {
                inner.remove(bind_dn);
                None
            }
            Some(entry) => Some(entry.session.clone()),
            None => None,
        }
    }

    /// Remove the session for a bind DN. Removing an absent key is a no-op.
    pub async fn delete(&self, bind_dn: &str) {
        let mut inner = self.inner.lock().await;
        inner.remove(bind_dn);
    }

    async fn remove_expired(&self, now: Instant) {
        let mut inner = self.inner.lock().await;
        inner.retain(|bind_dn, entry| {
            let live = entry.expires_at > now;
            if !live {
                trace!(%bind_dn, "expiring bound session");
            }
            live
        });
    }

    /// Start the background sweeper servicing this cache's deadlines: one
    /// task per cache, not one per insertion. It holds only a weak handle,
    /// so it winds down once the cache itself is gone, and it is unbothered
    /// by entries that were already deleted out from under it.
    pub fn start_expiry_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut inter = interval(SWEEP_FREQUENCY);
            inter.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                inter.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                cache.remove_expired(Instant::now()).await;
            }
            debug!("stopped bound session sweeper");
        })
    }
}
