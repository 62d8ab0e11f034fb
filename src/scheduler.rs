use crate::unixtime::Unixtime;
use crate::user::User;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// Which users a run has to (re-)fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchSet {
    /// Seen on the ledger, not yet in the user store
    pub new_users: BTreeSet<String>,

    /// In the user store, last fetched more than a TTL ago
    pub stale_users: BTreeSet<String>,
}

impl FetchSet {
    /// New and stale users together, in username order
    pub fn to_fetch(&self) -> BTreeSet<String> {
        self.new_users.union(&self.stale_users).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.new_users.len() + self.stale_users.difference(&self.new_users).count()
    }

    pub fn is_empty(&self) -> bool {
        self.new_users.is_empty() && self.stale_users.is_empty()
    }
}

/// Decides which records need re-fetching. Pure: the clock reading is an
/// input.
#[derive(Debug, Clone, Copy)]
pub struct RefreshScheduler {
    ttl: Duration,
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_TTL)
    }
}

impl RefreshScheduler {
    pub fn new(ttl: Duration) -> RefreshScheduler {
        RefreshScheduler { ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn select(
        &self,
        known: &BTreeMap<String, User>,
        crawled: &BTreeSet<String>,
        now: Unixtime,
    ) -> FetchSet {
        let new_users = crawled
            .iter()
            .filter(|u| !known.contains_key(*u))
            .cloned()
            .collect();

        let stale_users = known
            .values()
            .filter(|u| u.is_stale(now, self.ttl))
            .map(|u| u.username.clone())
            .collect();

        FetchSet {
            new_users,
            stale_users,
        }
    }
}
