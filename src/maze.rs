use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::error::MazeError;
use crate::rng::Rng;
use crate::types::{CellWallsView, Direction, MazeInit, Vec2, WallSegment};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Walls {
    pub north: bool,
    pub south: bool,
    pub east: bool,
    pub west: bool,
}

impl Walls {
    pub const CLOSED: Walls = Walls {
        north: true,
        south: true,
        east: true,
        west: true,
    };

    pub fn has(&self, dir: Direction) -> bool {
        match dir {
            Direction::North => self.north,
            Direction::South => self.south,
            Direction::East => self.east,
            Direction::West => self.west,
        }
    }

    fn clear(&mut self, dir: Direction) {
        match dir {
            Direction::North => self.north = false,
            Direction::South => self.south = false,
            Direction::East => self.east = false,
            Direction::West => self.west = false,
        }
    }
}

/// Square grid of cells with per-side walls. Once returned from
/// [`generate_maze`] the passages form a spanning tree over all cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Maze {
    size: usize,
    cells: Vec<Walls>,
}

/// Randomized iterative depth-first backtracker starting at the origin.
pub fn generate_maze(size: usize, rng: &mut Rng) -> Result<Maze, MazeError> {
    let mut maze = Maze::closed(size)?;
    let mut visited = vec![false; size * size];
    let mut stack = vec![Vec2::ORIGIN];
    visited[0] = true;

    let mut candidates: Vec<(Direction, Vec2, usize)> = Vec::with_capacity(4);
    while let Some(&current) = stack.last() {
        candidates.clear();
        for dir in Direction::ALL {
            let next = current.step(dir);
            if let Some(idx) = maze.index_of(next) {
                if !visited[idx] {
                    candidates.push((dir, next, idx));
                }
            }
        }

        if candidates.is_empty() {
            stack.pop();
            continue;
        }

        let (dir, next, idx) = candidates[rng.pick_index(candidates.len())];
        maze.carve(current, dir);
        visited[idx] = true;
        stack.push(next);
    }

    debug_assert!(visited.iter().all(|seen| *seen));
    Ok(maze)
}

impl Maze {
    /// Grid with every wall present and no passages.
    pub(crate) fn closed(size: usize) -> Result<Self, MazeError> {
        if size == 0 {
            return Err(MazeError::InvalidSize { size });
        }
        Ok(Self {
            size,
            cells: vec![Walls::CLOSED; size * size],
        })
    }

    /// Removes the wall between `pos` and its neighbor in `dir` on both sides.
    /// Boundary walls have no neighbor and are never removed.
    pub(crate) fn carve(&mut self, pos: Vec2, dir: Direction) -> bool {
        let (Some(from), Some(to)) = (self.index_of(pos), self.index_of(pos.step(dir))) else {
            return false;
        };
        self.cells[from].clear(dir);
        self.cells[to].clear(dir.opposite());
        true
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn origin(&self) -> Vec2 {
        Vec2::ORIGIN
    }

    pub fn goal(&self) -> Vec2 {
        let last = self.size as i32 - 1;
        Vec2 { x: last, y: last }
    }

    pub fn in_bounds(&self, pos: Vec2) -> bool {
        let size = self.size as i32;
        pos.x >= 0 && pos.y >= 0 && pos.x < size && pos.y < size
    }

    fn index_of(&self, pos: Vec2) -> Option<usize> {
        if !self.in_bounds(pos) {
            return None;
        }
        Some(pos.y as usize * self.size + pos.x as usize)
    }

    pub fn walls(&self, pos: Vec2) -> Option<Walls> {
        self.index_of(pos).map(|idx| self.cells[idx])
    }

    /// Out-of-bounds positions report every wall as present.
    pub fn has_wall(&self, pos: Vec2, dir: Direction) -> bool {
        self.walls(pos).map(|walls| walls.has(dir)).unwrap_or(true)
    }

    pub fn can_move(&self, pos: Vec2, dir: Direction) -> bool {
        !self.has_wall(pos, dir) && self.in_bounds(pos.step(dir))
    }

    /// Number of open passages; `size * size - 1` for a perfect maze.
    pub fn passage_count(&self) -> usize {
        let mut count = 0;
        for y in 0..self.size as i32 {
            for x in 0..self.size as i32 {
                let pos = Vec2 { x, y };
                if self.can_move(pos, Direction::East) {
                    count += 1;
                }
                if self.can_move(pos, Direction::South) {
                    count += 1;
                }
            }
        }
        count
    }

    pub fn open_directions(&self, pos: Vec2) -> impl Iterator<Item = Direction> + '_ {
        Direction::ALL
            .into_iter()
            .filter(move |dir| self.can_move(pos, *dir))
    }

    pub fn reachable_from(&self, start: Vec2) -> HashSet<Vec2> {
        let mut out = HashSet::new();
        if !self.in_bounds(start) {
            return out;
        }

        let mut queue = VecDeque::new();
        out.insert(start);
        queue.push_back(start);

        while let Some(pos) = queue.pop_front() {
            for dir in self.open_directions(pos) {
                let next = pos.step(dir);
                if out.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        out
    }

    /// Shortest route from origin to goal, as the moves a player would make.
    pub fn solve(&self) -> Option<Vec<Direction>> {
        let start = self.origin();
        let goal = self.goal();
        let mut came_from: HashMap<Vec2, (Vec2, Direction)> = HashMap::new();
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(pos) = queue.pop_front() {
            if pos == goal {
                break;
            }
            for dir in self.open_directions(pos) {
                let next = pos.step(dir);
                if seen.insert(next) {
                    came_from.insert(next, (pos, dir));
                    queue.push_back(next);
                }
            }
        }

        if !seen.contains(&goal) {
            return None;
        }

        let mut path = Vec::new();
        let mut cursor = goal;
        while let Some(&(prev, dir)) = came_from.get(&cursor) {
            path.push(dir);
            cursor = prev;
        }
        path.reverse();
        Some(path)
    }

    /// Walls between cells, deduplicated, without the outer frame.
    pub fn interior_walls(&self) -> Vec<WallSegment> {
        let last = self.size as i32 - 1;
        let mut segments = BTreeSet::new();
        for y in 0..self.size as i32 {
            for x in 0..self.size as i32 {
                let walls = self.cells[y as usize * self.size + x as usize];
                if walls.north && y != 0 {
                    segments.insert(segment(x, y, x + 1, y));
                }
                if walls.south && y != last {
                    segments.insert(segment(x, y + 1, x + 1, y + 1));
                }
                if walls.west && x != 0 {
                    segments.insert(segment(x, y, x, y + 1));
                }
                if walls.east && x != last {
                    segments.insert(segment(x + 1, y, x + 1, y + 1));
                }
            }
        }
        segments.into_iter().collect()
    }

    pub fn to_ascii(&self) -> String {
        self.render_ascii(None)
    }

    /// Text picture of the maze: `S` origin, `G` goal, `@` player.
    pub fn render_ascii(&self, player: Option<Vec2>) -> String {
        let size = self.size as i32;
        let mut lines = Vec::with_capacity(self.size * 2 + 1);

        let mut top = String::from("+");
        for x in 0..size {
            let walled = self.has_wall(Vec2 { x, y: 0 }, Direction::North);
            top.push_str(if walled { "---+" } else { "   +" });
        }
        lines.push(top);

        for y in 0..size {
            let mut row = String::new();
            let mut floor = String::from("+");
            row.push(if self.has_wall(Vec2 { x: 0, y }, Direction::West) {
                '|'
            } else {
                ' '
            });
            for x in 0..size {
                let pos = Vec2 { x, y };
                let mark = if player == Some(pos) {
                    '@'
                } else if pos == self.origin() {
                    'S'
                } else if pos == self.goal() {
                    'G'
                } else {
                    ' '
                };
                row.push(' ');
                row.push(mark);
                row.push(' ');
                row.push(if self.has_wall(pos, Direction::East) {
                    '|'
                } else {
                    ' '
                });
                floor.push_str(if self.has_wall(pos, Direction::South) {
                    "---+"
                } else {
                    "   +"
                });
            }
            lines.push(row);
            lines.push(floor);
        }

        lines.join("\n")
    }

    pub fn to_maze_init(&self) -> MazeInit {
        MazeInit {
            size: self.size,
            origin: self.origin(),
            goal: self.goal(),
            cells: self
                .cells
                .iter()
                .map(|walls| CellWallsView {
                    north: walls.north,
                    south: walls.south,
                    east: walls.east,
                    west: walls.west,
                })
                .collect(),
            interior_walls: self.interior_walls(),
        }
    }
}

fn segment(x1: i32, y1: i32, x2: i32, y2: i32) -> WallSegment {
    WallSegment { x1, y1, x2, y2 }
}
