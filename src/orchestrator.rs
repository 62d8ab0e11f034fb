use crate::db::Storage;
use crate::enricher::ProfileEnricher;
use crate::error::Error;
use crate::geo::{GeoLocationCache, GeoLookup};
use crate::ledger::{LedgerCrawler, LedgerRpc};
use crate::scheduler::RefreshScheduler;
use crate::unixtime::Unixtime;
use crate::user::User;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// What one run did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Distinct usernames on the ledger
    pub crawled: usize,

    /// Users enriched successfully
    pub fetched: usize,

    /// Users whose enrichment failed, and why
    pub failed: Vec<(String, String)>,

    pub geolocated: usize,
    pub geo_unresolved: usize,
    pub geo_skipped_quota: usize,
    pub checkpoints: usize,
}

impl RunReport {
    fn log(&self) {
        tracing::info!(
            "Crawl done: {} usernames, {} fetched, {} failed, {} geolocated, {} unresolved, {} skipped for quota, {} checkpoints",
            self.crawled,
            self.fetched,
            self.failed.len(),
            self.geolocated,
            self.geo_unresolved,
            self.geo_skipped_quota,
            self.checkpoints
        );
        for (username, reason) in self.failed.iter() {
            tracing::debug!("  {} failed: {}", username, reason);
        }
    }
}

/// Per-run geolocation bookkeeping
struct GeoPass {
    quota_exhausted: bool,
    unresolved: HashSet<String>,
}

/// One incremental run: crawl, schedule, enrich, geolocate, persist
pub struct CrawlOrchestrator {
    storage: Storage,
    rpc: Arc<dyn LedgerRpc>,
    geo: Arc<GeoLocationCache>,
    scheduler: RefreshScheduler,
    checkpoint_every: usize,
}

impl CrawlOrchestrator {
    pub fn new(
        storage: Storage,
        rpc: Arc<dyn LedgerRpc>,
        geo: Arc<GeoLocationCache>,
        ttl: Duration,
        checkpoint_every: usize,
    ) -> CrawlOrchestrator {
        CrawlOrchestrator {
            storage,
            rpc,
            geo,
            scheduler: RefreshScheduler::new(ttl),
            checkpoint_every: checkpoint_every.max(1),
        }
    }

    /// Run once.
    ///
    /// A ledger failure during the walk is returned and nothing is written.
    /// Failures of a single user's enrichment or geolocation are logged and
    /// counted in the report; the run carries on with the next user.
    pub async fn run(&self) -> Result<RunReport, Error> {
        let mut report = RunReport::default();

        let crawl = LedgerCrawler::new(self.rpc.clone()).crawl().await?;
        report.crawled = crawl.usernames.len();

        let mut known = self.storage.read_all_users().await?;
        let fetch = self
            .scheduler
            .select(&known, &crawl.usernames, Unixtime::now());
        tracing::info!(
            "{} new users, {} stale users",
            fetch.new_users.len(),
            fetch.stale_users.len()
        );

        let blanks: Vec<User> = fetch
            .new_users
            .iter()
            .map(|u| User::blank(u, self.scheduler.ttl()))
            .collect();
        self.storage
            .record_crawl(&crawl.last_block_hash, blanks.clone())
            .await?;
        for user in blanks {
            known.insert(user.username.clone(), user);
        }

        let enricher = ProfileEnricher::new(self.rpc.clone());
        let mut geo = GeoPass {
            quota_exhausted: false,
            unresolved: HashSet::new(),
        };
        let mut dirty: Vec<User> = Vec::new();

        let to_fetch = fetch.to_fetch();
        let total = to_fetch.len();
        for (n, username) in to_fetch.iter().enumerate() {
            let prior = match known.get(username) {
                Some(user) => user.clone(),
                None => User::blank(username, self.scheduler.ttl()),
            };

            let mut user = match enricher.enrich(&prior).await {
                Ok(user) => user,
                Err(e) => {
                    tracing::warn!("Failed to fetch {}: {}", username, e);
                    report.failed.push((username.clone(), e.to_string()));
                    continue;
                }
            };

            self.geolocate(&mut user, &mut geo, &mut report).await;

            tracing::info!("({} of {}) Fetched {}", n + 1, total, username);
            report.fetched += 1;
            known.insert(username.clone(), user.clone());
            dirty.push(user);

            if dirty.len() >= self.checkpoint_every {
                self.checkpoint(&mut dirty, &mut report).await?;
            }
        }

        // Users fetched earlier whose location could not be placed at the time
        let backfill: Vec<User> = known
            .values()
            .filter(|u| u.has_location() && u.coords.is_none())
            .filter(|u| !to_fetch.contains(&u.username))
            .cloned()
            .collect();
        for mut user in backfill {
            if geo.quota_exhausted {
                break;
            }
            self.geolocate(&mut user, &mut geo, &mut report).await;
            if user.coords.is_some() {
                dirty.push(user);
                if dirty.len() >= self.checkpoint_every {
                    self.checkpoint(&mut dirty, &mut report).await?;
                }
            }
        }

        if !dirty.is_empty() {
            self.checkpoint(&mut dirty, &mut report).await?;
        }

        report.log();
        Ok(report)
    }

    async fn geolocate(&self, user: &mut User, geo: &mut GeoPass, report: &mut RunReport) {
        if !user.has_location() || user.coords.is_some() {
            return;
        }
        if geo.quota_exhausted {
            report.geo_skipped_quota += 1;
            return;
        }
        if geo.unresolved.contains(&user.location) {
            report.geo_unresolved += 1;
            return;
        }

        match self.geo.locate(&user.location).await {
            Ok(GeoLookup::Found(coords)) => {
                user.coords = Some(coords);
                report.geolocated += 1;
            }
            Ok(GeoLookup::Empty) => {}
            Ok(GeoLookup::NotFound) => {
                geo.unresolved.insert(user.location.clone());
                report.geo_unresolved += 1;
            }
            Ok(GeoLookup::QuotaExceeded { retry_in }) => {
                tracing::warn!(
                    "Geolocation quota used up, skipping geolocation for the rest of this run (retry in {}s)",
                    retry_in.as_secs()
                );
                geo.quota_exhausted = true;
                report.geo_skipped_quota += 1;
            }
            Err(e) => {
                tracing::warn!("Failed to geolocate \"{}\": {}", user.location, e);
                geo.unresolved.insert(user.location.clone());
                report.geo_unresolved += 1;
            }
        }
    }

    async fn checkpoint(&self, dirty: &mut Vec<User>, report: &mut RunReport) -> Result<(), Error> {
        let users = std::mem::take(dirty);
        tracing::debug!("Saving {} users", users.len());
        self.storage.write_users(users).await?;
        report.checkpoints += 1;
        Ok(())
    }
}
