use super::{Coordinates, Geocoder, RateLimiter};
use crate::db::Storage;
use crate::error::Error;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// What a location lookup came to
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeoLookup {
    /// Resolved, either from the cache or from the provider
    Found(Coordinates),

    /// The location text was empty; nothing was looked up
    Empty,

    /// The provider had nothing acceptable. Not remembered, so it will be
    /// asked again on a later run.
    NotFound,

    /// The hourly quota is used up. Try again on a later run.
    QuotaExceeded { retry_in: Duration },
}

struct GeoState {
    db: HashMap<String, Coordinates>,
    limiter: RateLimiter,
}

/// Persistent location-name -> coordinates cache in front of a rate limited
/// geocoding provider.
///
/// One instance serves the whole process. Lookups are serialised: the
/// quota counter, the in-memory cache and the pacing delay are all behind a
/// single lock.
pub struct GeoLocationCache {
    state: Mutex<GeoState>,
    geocoder: Arc<dyn Geocoder>,
    storage: Storage,
    pacing: Duration,
}

impl GeoLocationCache {
    /// Load the persisted cache and set up a fresh quota window
    pub async fn load(
        storage: Storage,
        geocoder: Arc<dyn Geocoder>,
        limiter: RateLimiter,
        pacing: Duration,
    ) -> Result<GeoLocationCache, Error> {
        let db = storage.read_geocache().await?;
        tracing::debug!("Loaded {} cached locations", db.len());
        Ok(GeoLocationCache {
            state: Mutex::new(GeoState { db, limiter }),
            geocoder,
            storage,
            pacing,
        })
    }

    /// Resolve a location to coordinates.
    ///
    /// Cache hits consume no quota. A live lookup caches and persists what it
    /// finds, counts against the quota, and is followed by the pacing delay
    /// before this returns. Provider errors are returned but not cached.
    pub async fn locate(&self, location: &str) -> Result<GeoLookup, Error> {
        if location.trim().is_empty() {
            return Ok(GeoLookup::Empty);
        }

        let mut state = self.state.lock().await;

        if let Some(coords) = state.db.get(location) {
            return Ok(GeoLookup::Found(*coords));
        }

        if !state.limiter.can_ask() {
            let retry_in = state.limiter.remaining();
            tracing::info!(
                "Reached max amount of geolocation requests ({} used, window restarts in {}s)",
                state.limiter.used(),
                retry_in.as_secs()
            );
            return Ok(GeoLookup::QuotaExceeded { retry_in });
        }

        tracing::info!("Looking up \"{}\"", location);
        state.limiter.record();

        let outcome = match self.geocoder.search(location).await {
            Ok(candidates) => match candidates.into_iter().find(|c| c.is_place()) {
                Some(candidate) => {
                    let coords = candidate.coords;
                    match self.storage.write_geocode(location, coords).await {
                        Ok(()) => {
                            state.db.insert(location.to_owned(), coords);
                            Ok(GeoLookup::Found(coords))
                        }
                        Err(e) => Err(e),
                    }
                }
                None => {
                    tracing::debug!("No place found for \"{}\"", location);
                    Ok(GeoLookup::NotFound)
                }
            },
            Err(e) => Err(e),
        };

        // Nominatim usage policy: no more than one request per second
        tokio::time::sleep(self.pacing).await;

        outcome
    }

    /// Cached coordinates for a location, without any lookup
    pub async fn cached(&self, location: &str) -> Option<Coordinates> {
        self.state.lock().await.db.get(location).copied()
    }

    /// Number of resolved locations
    pub async fn len(&self) -> usize {
        self.state.lock().await.db.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::FakeGeocoder;
    use std::sync::atomic::Ordering;

    async fn make_cache(
        storage: &Storage,
        geocoder: Arc<FakeGeocoder>,
        quota: u32,
    ) -> GeoLocationCache {
        GeoLocationCache::load(
            storage.clone(),
            geocoder,
            RateLimiter::new(quota, Duration::from_secs(3600)),
            Duration::from_secs(1),
        )
        .await
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_locate_is_idempotent() {
        let storage = Storage::open_in_memory().unwrap();
        let geocoder = Arc::new(FakeGeocoder::default());
        let cache = make_cache(&storage, geocoder.clone(), 10).await;

        let first = cache.locate("41.9,12.5").await.unwrap();
        let second = cache.locate("41.9,12.5").await.unwrap();
        assert_eq!(first, GeoLookup::Found(Coordinates { lat: 41.9, lon: 12.5 }));
        assert_eq!(first, second);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);

        // It was persisted, so a fresh instance also knows it
        let cache2 = make_cache(&storage, geocoder.clone(), 10).await;
        assert_eq!(cache2.locate("41.9,12.5").await.unwrap(), first);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_location_is_not_looked_up() {
        let storage = Storage::open_in_memory().unwrap();
        let geocoder = Arc::new(FakeGeocoder::default());
        let cache = make_cache(&storage, geocoder.clone(), 10).await;

        assert_eq!(cache.locate("").await.unwrap(), GeoLookup::Empty);
        assert_eq!(cache.locate("   ").await.unwrap(), GeoLookup::Empty);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_exhaustion_and_window_reset() {
        let storage = Storage::open_in_memory().unwrap();
        let geocoder = Arc::new(FakeGeocoder::default());
        let cache = make_cache(&storage, geocoder.clone(), 3).await;

        for i in 0..3 {
            let query = format!("{},{}", i, i);
            assert!(matches!(
                cache.locate(&query).await.unwrap(),
                GeoLookup::Found(_)
            ));
        }
        assert!(matches!(
            cache.locate("3,3").await.unwrap(),
            GeoLookup::QuotaExceeded { .. }
        ));
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 3);

        // Cache hits still work while the quota is exhausted
        assert!(matches!(
            cache.locate("0,0").await.unwrap(),
            GeoLookup::Found(_)
        ));

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert_eq!(
            cache.locate("3,3").await.unwrap(),
            GeoLookup::Found(Coordinates { lat: 3.0, lon: 3.0 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_not_cached() {
        let storage = Storage::open_in_memory().unwrap();
        let geocoder = Arc::new(FakeGeocoder::default());
        let cache = make_cache(&storage, geocoder.clone(), 10).await;

        assert_eq!(cache.locate("nowhere").await.unwrap(), GeoLookup::NotFound);
        assert_eq!(cache.locate("nowhere").await.unwrap(), GeoLookup::NotFound);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty().await);
        assert!(cache.cached("nowhere").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_failure_is_not_cached() {
        let storage = Storage::open_in_memory().unwrap();
        let geocoder = Arc::new(FakeGeocoder::default());
        let cache = make_cache(&storage, geocoder.clone(), 10).await;

        assert!(cache.locate("broken").await.is_err());
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_persist_is_not_cached() {
        let storage = Storage::open_in_memory().unwrap();
        let geocoder = Arc::new(FakeGeocoder::default());
        let cache = make_cache(&storage, geocoder.clone(), 10).await;

        storage
            .with_db(|db| {
                db.execute_batch("DROP TABLE geocode")?;
                Ok(())
            })
            .await
            .unwrap();

        assert!(cache.locate("1,1").await.is_err());
        assert!(cache.cached("1,1").await.is_none());
        assert!(cache.is_empty().await);

        // Asked again, not answered from memory
        assert!(cache.locate("1,1").await.is_err());
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_place_candidates_are_skipped() {
        let storage = Storage::open_in_memory().unwrap();
        let geocoder = Arc::new(FakeGeocoder::default());
        let cache = make_cache(&storage, geocoder.clone(), 10).await;

        assert_eq!(
            cache.locate("Main Street").await.unwrap(),
            GeoLookup::Found(Coordinates { lat: 2.0, lon: 2.0 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_lookup_is_paced() {
        let storage = Storage::open_in_memory().unwrap();
        let geocoder = Arc::new(FakeGeocoder::default());
        let cache = make_cache(&storage, geocoder.clone(), 10).await;

        let start = tokio::time::Instant::now();
        let _ = cache.locate("1,1").await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(1));

        let start = tokio::time::Instant::now();
        let _ = cache.locate("1,1").await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
