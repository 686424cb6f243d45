use crate::best_time_store::BestTimeStore;
use crate::maze::Maze;
use crate::server_utils::{format_best, format_elapsed, status_label};
use crate::types::{Direction, SessionStatus, Snapshot, Vec2};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    /// Wall or grid edge in the way. Hosts may play a "bump" effect.
    Blocked,
    /// Paused or already solved.
    Ignored,
    Won { elapsed_ms: u64, new_record: bool },
}

impl MoveOutcome {
    pub fn accepted(self) -> bool {
        matches!(self, MoveOutcome::Moved | MoveOutcome::Won { .. })
    }
}

/// One play-through of a maze: player position, clock, move counter and the
/// best time shared with `store`.
#[derive(Debug)]
pub struct Session<S> {
    maze: Maze,
    store: S,
    status: SessionStatus,
    player: Vec2,
    pending_move: Option<Direction>,
    elapsed_ms: u64,
    moves: u32,
    best_ms: Option<u64>,
    hint_visible: bool,
}

impl<S: BestTimeStore> Session<S> {
    pub fn new(maze: Maze, store: S) -> Self {
        let best_ms = stored_best(&store);
        let mut session = Self {
            maze,
            store,
            status: SessionStatus::Idle,
            player: Vec2::ORIGIN,
            pending_move: None,
            elapsed_ms: 0,
            moves: 0,
            best_ms,
            hint_visible: true,
        };
        session.reset();
        session
    }

    /// Back to the origin with a stopped clock. A maze whose origin is its
    /// goal has nothing to play and is reported as won straight away.
    pub fn reset(&mut self) {
        self.best_ms = stored_best(&self.store);
        self.player = self.maze.origin();
        self.pending_move = None;
        self.elapsed_ms = 0;
        self.moves = 0;
        self.hint_visible = true;
        self.status = if self.player == self.maze.goal() {
            SessionStatus::Won
        } else {
            SessionStatus::Idle
        };
    }

    pub fn regenerate(&mut self, maze: Maze) {
        self.maze = maze;
        self.reset();
    }

    pub fn start(&mut self) -> bool {
        if self.status != SessionStatus::Idle {
            return false;
        }
        self.status = SessionStatus::Running;
        true
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.status = match self.status {
            SessionStatus::Running => SessionStatus::Paused,
            SessionStatus::Paused => SessionStatus::Running,
            SessionStatus::Idle | SessionStatus::Won => return false,
        };
        true
    }

    pub fn tick(&mut self, dt_ms: u64) {
        if self.status == SessionStatus::Running {
            self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);
        }
    }

    /// Buffers one move for the next [`Session::step`]; a newer move replaces it.
    pub fn queue_move(&mut self, dir: Direction) {
        self.pending_move = Some(dir);
    }

    pub fn step(&mut self, dt_ms: u64) -> Option<MoveOutcome> {
        self.tick(dt_ms);
        let dir = self.pending_move.take()?;
        Some(self.request_move(dir))
    }

    pub fn request_move(&mut self, dir: Direction) -> MoveOutcome {
        match self.status {
            SessionStatus::Paused | SessionStatus::Won => return MoveOutcome::Ignored,
            SessionStatus::Idle => self.status = SessionStatus::Running,
            SessionStatus::Running => {}
        }

        let next = self.player.step(dir);
        if !self.maze.in_bounds(next) || self.maze.has_wall(self.player, dir) {
            return MoveOutcome::Blocked;
        }

        self.player = next;
        self.moves += 1;
        self.hint_visible = false;

        if self.player != self.maze.goal() {
            return MoveOutcome::Moved;
        }

        self.status = SessionStatus::Won;
        self.pending_move = None;
        let new_record = self.record_win();
        MoveOutcome::Won {
            elapsed_ms: self.elapsed_ms,
            new_record,
        }
    }

    /// The store may be shared with other sessions, so the comparison is made
    /// against its current value rather than the one read at reset. A zero
    /// clock is never recorded: zero reads back as "no best time".
    fn record_win(&mut self) -> bool {
        let previous_best_ms = stored_best(&self.store);
        let improved = self.elapsed_ms > 0
            && previous_best_ms
                .map(|best| self.elapsed_ms < best)
                .unwrap_or(true);
        if improved {
            self.store.save(self.elapsed_ms);
        }
        // Another session may have stored a lower time in between.
        self.best_ms = stored_best(&self.store);
        let new_record = improved && self.best_ms == Some(self.elapsed_ms);
        tracing::info!(
            elapsed_ms = self.elapsed_ms,
            moves = self.moves,
            previous_best_ms = ?previous_best_ms,
            new_record,
            "maze solved"
        );
        new_record
    }

    pub fn maze(&self) -> &Maze {
        &self.maze
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn player(&self) -> Vec2 {
        self.player
    }

    pub fn pending_move(&self) -> Option<Direction> {
        self.pending_move
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn best_ms(&self) -> Option<u64> {
        self.best_ms
    }

    pub fn hint_visible(&self) -> bool {
        self.hint_visible
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            status: self.status,
            status_label: status_label(self.status).to_string(),
            player: self.player,
            goal: self.maze.goal(),
            moves: self.moves,
            elapsed_ms: self.elapsed_ms,
            elapsed_text: format_elapsed(self.elapsed_ms),
            best_ms: self.best_ms,
            best_text: format_best(self.best_ms),
            hint_visible: self.hint_visible,
        }
    }
}

/// Stored best time, with zero meaning unset.
fn stored_best<S: BestTimeStore>(store: &S) -> Option<u64> {
    store.load().filter(|best| *best > 0)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use crate::best_time_store::{BestTimeStore, MemoryBestTimeStore};
    use crate::constants::DEFAULT_GRID_SIZE;
    use crate::maze::{generate_maze, Maze};
    use crate::rng::Rng;
    use crate::types::{Direction, SessionStatus, Vec2};

    use super::{MoveOutcome, Session};

    /// (0,0) opens only east; the route to the goal is East, South.
    fn two_by_two() -> Maze {
        let mut maze = Maze::closed(2).expect("valid size");
        maze.carve(Vec2::ORIGIN, Direction::East);
        maze.carve(Vec2 { x: 1, y: 0 }, Direction::South);
        maze.carve(Vec2 { x: 1, y: 1 }, Direction::West);
        maze
    }

    fn play_to_goal<S: BestTimeStore>(session: &mut Session<S>, tick_ms: u64) -> MoveOutcome {
        let path = session.maze().solve().expect("solvable");
        let mut last = MoveOutcome::Ignored;
        for dir in path {
            session.tick(tick_ms);
            last = session.request_move(dir);
            assert!(last.accepted());
        }
        last
    }

    #[test]
    fn new_session_starts_idle_at_origin() {
        let session = Session::new(two_by_two(), MemoryBestTimeStore::default());
        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(session.player(), Vec2::ORIGIN);
        assert_eq!(session.moves(), 0);
        assert_eq!(session.elapsed_ms(), 0);
        assert_eq!(session.best_ms(), None);
        assert!(session.hint_visible());
    }

    #[test]
    fn walls_and_edges_reject_moves_without_counting() {
        let mut session = Session::new(two_by_two(), MemoryBestTimeStore::default());

        assert_eq!(session.request_move(Direction::North), MoveOutcome::Blocked);
        assert_eq!(session.request_move(Direction::West), MoveOutcome::Blocked);
        assert_eq!(session.request_move(Direction::South), MoveOutcome::Blocked);
        assert_eq!(session.player(), Vec2::ORIGIN);
        assert_eq!(session.moves(), 0);
        // A rejected first move still starts the clock.
        assert_eq!(session.status(), SessionStatus::Running);

        assert_eq!(session.request_move(Direction::East), MoveOutcome::Moved);
        assert_eq!(session.player(), Vec2 { x: 1, y: 0 });
        assert_eq!(session.moves(), 1);
        assert!(!session.hint_visible());
    }

    #[test]
    fn reversal_is_allowed_in_the_maze() {
        let mut session = Session::new(two_by_two(), MemoryBestTimeStore::default());
        assert_eq!(session.request_move(Direction::East), MoveOutcome::Moved);
        assert_eq!(session.request_move(Direction::West), MoveOutcome::Moved);
        assert_eq!(session.player(), Vec2::ORIGIN);
        assert_eq!(session.moves(), 2);
    }

    #[test]
    fn reaching_goal_wins_and_freezes_the_session() {
        let mut session = Session::new(two_by_two(), MemoryBestTimeStore::default());
        session.request_move(Direction::East);
        session.tick(1_200);
        let outcome = session.request_move(Direction::South);
        assert_eq!(
            outcome,
            MoveOutcome::Won {
                elapsed_ms: 1_200,
                new_record: true
            }
        );
        assert_eq!(session.status(), SessionStatus::Won);
        assert_eq!(session.best_ms(), Some(1_200));
        assert_eq!(session.store().best_ms(), Some(1_200));

        assert_eq!(session.request_move(Direction::North), MoveOutcome::Ignored);
        assert_eq!(session.player(), Vec2 { x: 1, y: 1 });
        assert_eq!(session.moves(), 2);

        session.tick(5_000);
        assert_eq!(session.elapsed_ms(), 1_200);
        assert!(!session.toggle_pause());
        assert!(!session.start());
    }

    #[test]
    fn best_time_only_ever_decreases_across_resets() {
        let maze = generate_maze(DEFAULT_GRID_SIZE, &mut Rng::new(77)).expect("valid size");
        let mut session = Session::new(maze, MemoryBestTimeStore::default());
        let mut previous: Option<u64> = None;
        let mut records = 0;

        for tick_ms in [40u64, 25, 60, 25, 10, 90] {
            session.reset();
            let outcome = play_to_goal(&mut session, tick_ms);
            let MoveOutcome::Won {
                elapsed_ms,
                new_record,
            } = outcome
            else {
                panic!("expected a win, got {outcome:?}");
            };

            let best = session.best_ms().expect("best recorded after a win");
            match previous {
                Some(prev) => {
                    assert!(best <= prev);
                    assert_eq!(new_record, elapsed_ms < prev);
                    assert_eq!(best, prev.min(elapsed_ms));
                }
                None => assert!(new_record),
            }
            if new_record {
                records += 1;
            }
            previous = Some(best);
        }

        assert_eq!(session.store().write_count(), records);
    }

    #[test]
    fn best_time_is_loaded_from_the_store() {
        let store = MemoryBestTimeStore::with_best(500);
        let mut session = Session::new(two_by_two(), store);
        assert_eq!(session.best_ms(), Some(500));

        session.request_move(Direction::East);
        session.tick(800);
        let outcome = session.request_move(Direction::South);
        assert_eq!(
            outcome,
            MoveOutcome::Won {
                elapsed_ms: 800,
                new_record: false
            }
        );
        assert_eq!(session.best_ms(), Some(500));
        assert_eq!(session.store().write_count(), 0);
    }

    #[test]
    fn equal_time_is_not_a_new_record() {
        let mut session = Session::new(two_by_two(), MemoryBestTimeStore::with_best(300));
        session.request_move(Direction::East);
        session.tick(300);
        assert_eq!(
            session.request_move(Direction::South),
            MoveOutcome::Won {
                elapsed_ms: 300,
                new_record: false
            }
        );
        assert_eq!(session.store().write_count(), 0);
    }

    #[test]
    fn sessions_sharing_a_store_never_raise_its_best_time() {
        let shared = Arc::new(Mutex::new(MemoryBestTimeStore::default()));
        let mut fast = Session::new(two_by_two(), shared.clone());
        let mut slow = Session::new(two_by_two(), shared.clone());

        fast.request_move(Direction::East);
        fast.tick(1_000);
        fast.request_move(Direction::South);
        assert_eq!(shared.load(), Some(1_000));

        slow.request_move(Direction::East);
        slow.tick(5_000);
        assert_eq!(
            slow.request_move(Direction::South),
            MoveOutcome::Won {
                elapsed_ms: 5_000,
                new_record: false
            }
        );
        assert_eq!(slow.best_ms(), Some(1_000));
        assert_eq!(shared.load(), Some(1_000));
        assert_eq!(shared.lock().expect("not poisoned").write_count(), 1);
    }

    #[test]
    fn reset_picks_up_a_record_set_by_another_session() {
        let shared = Arc::new(Mutex::new(MemoryBestTimeStore::default()));
        let mut watcher = Session::new(two_by_two(), shared.clone());
        let mut player = Session::new(two_by_two(), shared.clone());

        player.request_move(Direction::East);
        player.tick(700);
        player.request_move(Direction::South);
        assert_eq!(watcher.best_ms(), None);

        watcher.reset();
        assert_eq!(watcher.best_ms(), Some(700));
        assert_eq!(watcher.snapshot().best_text, "0s");
    }

    #[test]
    fn stored_zero_counts_as_no_best_time() {
        let mut session = Session::new(two_by_two(), MemoryBestTimeStore::with_best(0));
        assert_eq!(session.best_ms(), None);

        session.request_move(Direction::East);
        session.tick(700);
        assert_eq!(
            session.request_move(Direction::South),
            MoveOutcome::Won {
                elapsed_ms: 700,
                new_record: true
            }
        );
        assert_eq!(session.best_ms(), Some(700));
        assert_eq!(session.store().best_ms(), Some(700));
    }

    #[test]
    fn win_without_elapsed_time_is_not_recorded() {
        let mut session = Session::new(two_by_two(), MemoryBestTimeStore::default());
        session.request_move(Direction::East);
        assert_eq!(
            session.request_move(Direction::South),
            MoveOutcome::Won {
                elapsed_ms: 0,
                new_record: false
            }
        );
        assert_eq!(session.best_ms(), None);
        assert_eq!(session.store().write_count(), 0);
    }

    #[test]
    fn reset_keeps_best_time_and_clears_progress() {
        let mut session = Session::new(two_by_two(), MemoryBestTimeStore::default());
        session.request_move(Direction::East);
        session.tick(250);
        session.request_move(Direction::South);
        session.reset();

        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(session.player(), Vec2::ORIGIN);
        assert_eq!(session.moves(), 0);
        assert_eq!(session.elapsed_ms(), 0);
        assert_eq!(session.best_ms(), Some(250));
        assert!(session.hint_visible());
    }

    #[test]
    fn paused_clock_does_not_advance_and_moves_are_ignored() {
        let mut session = Session::new(two_by_two(), MemoryBestTimeStore::default());
        assert!(session.start());
        session.tick(100);

        assert!(session.toggle_pause());
        assert_eq!(session.status(), SessionStatus::Paused);
        session.tick(500);
        assert_eq!(session.request_move(Direction::East), MoveOutcome::Ignored);
        assert_eq!(session.player(), Vec2::ORIGIN);

        assert!(session.toggle_pause());
        assert_eq!(session.status(), SessionStatus::Running);
        session.tick(50);
        assert_eq!(session.elapsed_ms(), 150);
    }

    #[test]
    fn idle_session_ignores_ticks_and_pause() {
        let mut session = Session::new(two_by_two(), MemoryBestTimeStore::default());
        session.tick(1_000);
        assert_eq!(session.elapsed_ms(), 0);
        assert!(!session.toggle_pause());
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[test]
    fn buffered_move_keeps_only_the_latest_input() {
        let mut session = Session::new(two_by_two(), MemoryBestTimeStore::default());
        session.queue_move(Direction::North);
        session.queue_move(Direction::West);
        session.queue_move(Direction::East);
        assert_eq!(session.pending_move(), Some(Direction::East));

        assert_eq!(session.step(50), Some(MoveOutcome::Moved));
        assert_eq!(session.moves(), 1);
        assert_eq!(session.pending_move(), None);
        assert_eq!(session.step(50), None);
        assert_eq!(session.elapsed_ms(), 50);
    }

    #[test]
    fn single_cell_session_is_won_from_the_start() {
        let maze = generate_maze(1, &mut Rng::new(1)).expect("valid size");
        let mut session = Session::new(maze, MemoryBestTimeStore::default());
        assert_eq!(session.status(), SessionStatus::Won);
        assert_eq!(session.request_move(Direction::East), MoveOutcome::Ignored);
        assert_eq!(session.best_ms(), None);

        session.reset();
        assert_eq!(session.status(), SessionStatus::Won);
        assert_eq!(session.store().write_count(), 0);
    }

    #[test]
    fn regenerate_swaps_maze_and_resets_progress() {
        let mut session = Session::new(two_by_two(), MemoryBestTimeStore::default());
        session.request_move(Direction::East);
        let maze = generate_maze(5, &mut Rng::new(8)).expect("valid size");
        session.regenerate(maze.clone());

        assert_eq!(session.maze(), &maze);
        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(session.moves(), 0);
        assert_eq!(session.snapshot().goal, Vec2 { x: 4, y: 4 });
    }

    #[test]
    fn snapshot_reports_readable_status() {
        let mut session = Session::new(two_by_two(), MemoryBestTimeStore::with_best(65_000));
        session.request_move(Direction::East);
        session.tick(4_300);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.status, SessionStatus::Running);
        assert_eq!(snapshot.status_label, "Running");
        assert_eq!(snapshot.elapsed_text, "4s");
        assert_eq!(snapshot.best_text, "1:05");
        assert_eq!(snapshot.moves, 1);
    }
}
