use std::path::PathBuf;

use crate::constants::{DEFAULT_BEST_TIME_PATH, DEFAULT_PORT};
use crate::server_utils::parse_grid_size;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub best_time_path: PathBuf,
    pub static_dir: Option<PathBuf>,
    pub grid_size: usize,
}

impl ServerConfig {
    /// Reads `PORT`, `BEST_TIME_PATH`, `STATIC_DIR` and `MAZE_SIZE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        let best_time_path = lookup("BEST_TIME_PATH")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BEST_TIME_PATH));
        let static_dir = lookup("STATIC_DIR").map(PathBuf::from);
        let grid_size = parse_grid_size(lookup("MAZE_SIZE").as_deref());

        Self {
            port,
            best_time_path,
            static_dir,
            grid_size,
        }
    }
}
