pub mod best_time_store;
pub mod config;
pub mod constants;
pub mod error;
pub mod input;
pub mod maze;
pub mod protocol;
pub mod rng;
pub mod server_utils;
pub mod session;
pub mod types;

pub use best_time_store::{BestTimeStore, FileBestTimeStore, MemoryBestTimeStore};
pub use error::MazeError;
pub use maze::{generate_maze, Maze};
pub use rng::Rng;
pub use session::{MoveOutcome, Session};
pub use types::{Direction, SessionStatus, Vec2};
