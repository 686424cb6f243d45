pub const TICK_RATE: u32 = 20;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const DEFAULT_GRID_SIZE: usize = 17;
pub const MAX_GRID_SIZE: usize = 64;

/// Minimum pointer travel (in px) before a swipe counts as a move.
pub const SWIPE_THRESHOLD_PX: f64 = 22.0;

pub const BEST_TIME_KEY: &str = "maze_best_ms";
pub const BEST_TIME_STORE_VERSION: u8 = 1;
pub const DEFAULT_BEST_TIME_PATH: &str = ".data/best_time.json";

pub const DEFAULT_PORT: u16 = 8080;
pub const OUTBOUND_QUEUE_DEPTH: usize = 64;
