use super::{Coordinates, GeoCandidate, Geocoder};
use crate::error::Error;
use crate::USER_AGENT;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    addresstype: Option<String>,
}

impl NominatimPlace {
    fn into_candidate(self) -> Option<GeoCandidate> {
        let (lat, lon) = match (self.lat.parse::<f64>(), self.lon.parse::<f64>()) {
            (Ok(lat), Ok(lon)) => (lat, lon),
            _ => {
                tracing::debug!("Skipping place with bad coordinates {}/{}", self.lat, self.lon);
                return None;
            }
        };
        let policy = self.category.as_deref().and_then(policy_tag);
        let mut tags: Vec<String> = [self.category, self.kind, self.addresstype]
            .into_iter()
            .flatten()
            .collect();
        if let Some(tag) = policy {
            tags.push(tag.to_owned());
        }
        Some(GeoCandidate {
            coords: Coordinates { lat, lon },
            tags,
        })
    }
}

/// Nominatim reports OSM classes. Streets, buildings and businesses get the
/// generic tag the candidate filter rejects.
fn policy_tag(category: &str) -> Option<&'static str> {
    match category {
        "highway" | "railway" => Some("route"),
        "building" => Some("premise"),
        "shop" | "amenity" | "office" | "craft" | "tourism" | "leisure" => Some("establishment"),
        _ => None,
    }
}

/// OpenStreetMap Nominatim search (jsonv2 output)
pub struct Nominatim {
    client: Client,
    url: Url,
    set_user_agent: bool,
}

impl Nominatim {
    pub fn new(url: &str, set_user_agent: bool) -> Result<Nominatim, Error> {
        let client = Client::builder()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .connect_timeout(Duration::new(10, 0))
            .timeout(Duration::new(15, 0))
            .build()?;

        Ok(Nominatim {
            client,
            url: Url::parse(url)?,
            set_user_agent,
        })
    }

    fn search_url(&self, query: &str) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair("format", "jsonv2")
            .append_pair("q", query);
        url
    }
}

fn parse_places(places: Vec<NominatimPlace>) -> Vec<GeoCandidate> {
    places
        .into_iter()
        .filter_map(NominatimPlace::into_candidate)
        .collect()
}

#[async_trait]
impl Geocoder for Nominatim {
    async fn search(&self, query: &str) -> Result<Vec<GeoCandidate>, Error> {
        let url = self.search_url(query);
        tracing::debug!("GET {}", url);

        let mut req = self.client.get(url);
        // Nominatim rejects requests that do not identify the application
        if self.set_user_agent {
            req = req.header("User-Agent", USER_AGENT);
        }

        let places: Vec<NominatimPlace> = req.send().await?.error_for_status()?.json().await?;
        Ok(parse_places(places))
    }
}
