use crate::db::Storage;
use crate::error::{Error, ErrorKind};
use crate::geo::DEFAULT_NOMINATIM_URL;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_RPC_URL: &str = "http://localhost:28332";
pub const DEFAULT_RPC_USER: &str = "user";
pub const DEFAULT_RPC_PASSWORD: &str = "pwd";
pub const DEFAULT_REFRESH_TTL_SECS: u64 = 7 * 24 * 3600; // 7 days
pub const DEFAULT_CHECKPOINT_EVERY: u64 = 5;
pub const DEFAULT_GEO_MAX_REQUESTS: u32 = 60 * 60; // 1 per second on average
pub const DEFAULT_GEO_WINDOW_SECS: u64 = 60 * 60;
pub const DEFAULT_GEO_PACING_MILLIS: u64 = 1000;
pub const DEFAULT_SET_USER_AGENT: bool = true;

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    // Node settings
    pub rpc_url: String,
    pub rpc_user: String,
    pub rpc_password: String,

    // Crawl settings
    pub refresh_ttl_secs: u64,
    pub checkpoint_every: u64,

    // Geolocation settings
    pub geo_max_requests: u32,
    pub geo_window_secs: u64,
    pub geo_pacing_millis: u64,
    pub geocoder_url: String,
    pub set_user_agent: bool,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            rpc_url: DEFAULT_RPC_URL.to_owned(),
            rpc_user: DEFAULT_RPC_USER.to_owned(),
            rpc_password: DEFAULT_RPC_PASSWORD.to_owned(),
            refresh_ttl_secs: DEFAULT_REFRESH_TTL_SECS,
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            geo_max_requests: DEFAULT_GEO_MAX_REQUESTS,
            geo_window_secs: DEFAULT_GEO_WINDOW_SECS,
            geo_pacing_millis: DEFAULT_GEO_PACING_MILLIS,
            geocoder_url: DEFAULT_NOMINATIM_URL.to_owned(),
            set_user_agent: DEFAULT_SET_USER_AGENT,
        }
    }
}

impl Settings {
    pub async fn load(storage: &Storage) -> Result<Settings, Error> {
        let d = Settings::default();
        Ok(Settings {
            rpc_url: storage.fetch_setting_or_default("rpc_url", d.rpc_url).await?,
            rpc_user: storage.fetch_setting_or_default("rpc_user", d.rpc_user).await?,
            rpc_password: storage
                .fetch_setting_or_default("rpc_password", d.rpc_password)
                .await?,
            refresh_ttl_secs: storage
                .fetch_setting_or_default("refresh_ttl_secs", d.refresh_ttl_secs)
                .await?,
            checkpoint_every: storage
                .fetch_setting_or_default("checkpoint_every", d.checkpoint_every)
                .await?,
            geo_max_requests: storage
                .fetch_setting_or_default("geo_max_requests", d.geo_max_requests)
                .await?,
            geo_window_secs: storage
                .fetch_setting_or_default("geo_window_secs", d.geo_window_secs)
                .await?,
            geo_pacing_millis: storage
                .fetch_setting_or_default("geo_pacing_millis", d.geo_pacing_millis)
                .await?,
            geocoder_url: storage
                .fetch_setting_or_default("geocoder_url", d.geocoder_url)
                .await?,
            set_user_agent: storage
                .fetch_setting_or_default("set_user_agent", d.set_user_agent)
                .await?,
        })
    }

    pub async fn save(&self, storage: &Storage) -> Result<(), Error> {
        storage
            .write_settings(vec![
                ("rpc_url", self.rpc_url.clone()),
                ("rpc_user", self.rpc_user.clone()),
                ("rpc_password", self.rpc_password.clone()),
                ("refresh_ttl_secs", self.refresh_ttl_secs.to_string()),
                ("checkpoint_every", self.checkpoint_every.to_string()),
                ("geo_max_requests", self.geo_max_requests.to_string()),
                ("geo_window_secs", self.geo_window_secs.to_string()),
                ("geo_pacing_millis", self.geo_pacing_millis.to_string()),
                ("geocoder_url", self.geocoder_url.clone()),
                ("set_user_agent", self.set_user_agent.to_string()),
            ])
            .await
    }

    /// Change one setting from its text form. Unknown keys and values that
    /// do not parse are usage errors.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), Error> {
        match key {
            "rpc_url" => self.rpc_url = value.to_owned(),
            "rpc_user" => self.rpc_user = value.to_owned(),
            "rpc_password" => self.rpc_password = value.to_owned(),
            "refresh_ttl_secs" => self.refresh_ttl_secs = parse_value(key, value)?,
            "checkpoint_every" => self.checkpoint_every = parse_value(key, value)?,
            "geo_max_requests" => self.geo_max_requests = parse_value(key, value)?,
            "geo_window_secs" => self.geo_window_secs = parse_value(key, value)?,
            "geo_pacing_millis" => self.geo_pacing_millis = parse_value(key, value)?,
            "geocoder_url" => self.geocoder_url = value.to_owned(),
            "set_user_agent" => self.set_user_agent = parse_value(key, value)?,
            other => {
                return Err(ErrorKind::Usage(
                    format!("Unknown setting {}", other),
                    "set <key> <value>".to_owned(),
                )
                .into())
            }
        }
        Ok(())
    }

    /// Each setting as (key, text), with the password hidden
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        vec![
            ("rpc_url", self.rpc_url.clone()),
            ("rpc_user", self.rpc_user.clone()),
            ("rpc_password", "********".to_owned()),
            ("refresh_ttl_secs", self.refresh_ttl_secs.to_string()),
            ("checkpoint_every", self.checkpoint_every.to_string()),
            ("geo_max_requests", self.geo_max_requests.to_string()),
            ("geo_window_secs", self.geo_window_secs.to_string()),
            ("geo_pacing_millis", self.geo_pacing_millis.to_string()),
            ("geocoder_url", self.geocoder_url.clone()),
            ("set_user_agent", self.set_user_agent.to_string()),
        ]
    }

    /// Node connection overrides from TWISTMAP_RPC_URL, TWISTMAP_RPC_USER and
    /// TWISTMAP_RPC_PASSWORD. These are not saved.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var("TWISTMAP_RPC_URL") {
            tracing::info!("Using TWISTMAP_RPC_URL: {}", url);
            self.rpc_url = url;
        }
        if let Ok(user) = env::var("TWISTMAP_RPC_USER") {
            self.rpc_user = user;
        }
        if let Ok(password) = env::var("TWISTMAP_RPC_PASSWORD") {
            self.rpc_password = password;
        }
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_secs)
    }

    pub fn geo_window(&self) -> Duration {
        Duration::from_secs(self.geo_window_secs)
    }

    pub fn geo_pacing(&self) -> Duration {
        Duration::from_millis(self.geo_pacing_millis)
    }

    /// Never zero; a zero checkpoint interval would mean "never save"
    pub fn checkpoint_every(&self) -> usize {
        self.checkpoint_every.max(1) as usize
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, Error>
where
    T: FromStr,
    T::Err: Display,
{
    value.parse::<T>().map_err(|e| {
        ErrorKind::Usage(
            format!("Bad value {} for {}: {}", value, key, e),
            "set <key> <value>".to_owned(),
        )
        .into()
    })
}
