use crate::geo::Coordinates;
use crate::unixtime::Unixtime;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A twister user as persisted in the user store.
///
/// This record never holds a handle to the geolocation service. Whoever
/// needs coordinates resolved passes the `GeoLocationCache` explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique, never changes once observed on the ledger
    pub username: String,

    /// Avatar reference as published in the DHT (usually a data: URI)
    pub avatar: String,

    pub fullname: String,

    /// Free text, may be empty
    pub location: String,

    /// Derived from `location`
    pub coords: Option<Coordinates>,

    pub bio: String,

    /// Homepage
    pub url: String,

    /// When the profile was last fetched successfully
    pub last_update: Unixtime,

    /// Usernames this user follows, in the order the node reports them
    pub following: Vec<String>,
}

impl User {
    pub fn new(username: &str) -> User {
        User {
            username: username.to_owned(),
            avatar: String::new(),
            fullname: String::new(),
            location: String::new(),
            coords: None,
            bio: String::new(),
            url: String::new(),
            last_update: Unixtime(0),
            following: Vec::new(),
        }
    }

    /// A user first seen on the ledger. It is stamped "epoch minus TTL" so it
    /// is eligible for enrichment right away.
    pub fn blank(username: &str, ttl: Duration) -> User {
        let mut user = User::new(username);
        user.last_update = Unixtime(0) - ttl;
        user
    }

    /// Stale means `last_update + ttl < now`. Exactly at the boundary the
    /// record is still fresh.
    pub fn is_stale(&self, now: Unixtime, ttl: Duration) -> bool {
        self.last_update + ttl < now
    }

    pub fn has_location(&self) -> bool {
        !self.location.trim().is_empty()
    }
}
