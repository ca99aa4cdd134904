use std::env;
use std::path::PathBuf;

use lazy_static::lazy_static;

use crate::deck::IdPolicy;

lazy_static! {
    // Base directory
    pub static ref BASE_DIR: PathBuf = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    // Per-artist document folders live under here
    pub static ref DATA_DIR: PathBuf = BASE_DIR.join("data");
}

// Document names inside an artist folder
pub const COVERS_FILE: &str = "covers.json";
pub const ASSETS_FILE: &str = "assets.json";

pub const MAX_ARTIST_LEN: usize = 64;

pub const DATA_DIR_VAR: &str = "COVERFLOW_DATA_DIR";
pub const ID_POLICY_VAR: &str = "COVERFLOW_ID_POLICY";

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub id_policy: IdPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: DATA_DIR.clone(),
            id_policy: IdPolicy::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let data_dir = env::var_os(DATA_DIR_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let id_policy = match env::var(ID_POLICY_VAR) {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                log::warn!("{}: {}, using {:?}", ID_POLICY_VAR, e, defaults.id_policy);
                defaults.id_policy
            }),
            Err(_) => defaults.id_policy,
        };

        Self {
            data_dir,
            id_policy,
        }
    }

    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }
}
