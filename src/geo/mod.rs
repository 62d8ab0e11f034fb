mod cache;
mod nominatim;
mod rate_limiter;

pub use cache::{GeoLocationCache, GeoLookup};
pub use nominatim::{Nominatim, DEFAULT_NOMINATIM_URL};
pub use rate_limiter::RateLimiter;

use crate::error::Error;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    /// A key with exact equality semantics, usable for grouping and ordering
    pub fn key(&self) -> (u64, u64) {
        (self.lat.to_bits(), self.lon.to_bits())
    }
}

/// One candidate result from a geocoding search
#[derive(Debug, Clone, PartialEq)]
pub struct GeoCandidate {
    pub coords: Coordinates,

    /// Provider classification of the result (e.g. "city", "route")
    pub tags: Vec<String>,
}

/// Candidates carrying any of these tags describe a street, a building or a
/// business rather than a place name.
const REJECTED_TAGS: [&str; 3] = ["premise", "route", "establishment"];

impl GeoCandidate {
    pub fn is_place(&self) -> bool {
        !self
            .tags
            .iter()
            .any(|t| REJECTED_TAGS.contains(&t.as_str()))
    }
}

/// An external free-text geocoding service
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Search for a free-text location. Candidates come back in the
    /// provider's ranking order.
    async fn search(&self, query: &str) -> Result<Vec<GeoCandidate>, Error>;
}
