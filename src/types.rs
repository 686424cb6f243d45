use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Neighbor scan order used by the generator.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn parse_move(value: &str) -> Option<Self> {
        match value {
            "north" | "up" => Some(Self::North),
            "south" | "down" => Some(Self::South),
            "east" | "right" => Some(Self::East),
            "west" | "left" => Some(Self::West),
            _ => None,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

impl Vec2 {
    pub const ORIGIN: Vec2 = Vec2 { x: 0, y: 0 };

    pub fn step(self, dir: Direction) -> Vec2 {
        let (dx, dy) = dir.delta();
        Vec2 {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Running,
    Paused,
    Won,
}

/// Wall edge in corner coordinates: a cell (x, y) spans corners (x, y)..(x + 1, y + 1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct WallSegment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CellWallsView {
    pub north: bool,
    pub south: bool,
    pub east: bool,
    pub west: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct MazeInit {
    pub size: usize,
    pub origin: Vec2,
    pub goal: Vec2,
    /// Row-major, `size * size` entries.
    pub cells: Vec<CellWallsView>,
    #[serde(rename = "interiorWalls")]
    pub interior_walls: Vec<WallSegment>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub status: SessionStatus,
    #[serde(rename = "statusLabel")]
    pub status_label: String,
    pub player: Vec2,
    pub goal: Vec2,
    pub moves: u32,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
    #[serde(rename = "elapsedText")]
    pub elapsed_text: String,
    #[serde(rename = "bestMs")]
    pub best_ms: Option<u64>,
    #[serde(rename = "bestText")]
    pub best_text: String,
    #[serde(rename = "hintVisible")]
    pub hint_visible: bool,
}
