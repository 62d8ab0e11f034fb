use crate::error::Error;
use std::env;
use std::fs;
use std::path::PathBuf;

const DATABASE_FILE: &str = "twistmap.sqlite";

///
/// Where twistmap keeps its data
///
#[derive(Clone, Debug, PartialEq)]
pub struct Profile {
    /// The base directory for all twistmap data
    pub base_dir: PathBuf,
}

impl Profile {
    pub fn new() -> Result<Profile, Error> {
        // By default it's what `dirs::data_dir()` gives, but we allow overriding the base directory via env vars
        let base_dir = match env::var("TWISTMAP_DIR") {
            Ok(dir) => {
                tracing::info!("Using TWISTMAP_DIR: {}", dir);
                PathBuf::from(dir)
            }
            Err(_) => {
                let mut base_dir = dirs::data_dir()
                    .ok_or::<Error>("Cannot find a directory to store application data.".into())?;
                base_dir.push("twistmap");
                base_dir
            }
        };

        fs::create_dir_all(&base_dir)?;

        Ok(Profile { base_dir })
    }

    pub fn database_path(&self) -> PathBuf {
        self.base_dir.join(DATABASE_FILE)
    }
}
