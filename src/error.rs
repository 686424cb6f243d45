#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MazeError {
    #[error("maze size must be positive, got {size}")]
    InvalidSize { size: usize },
}
