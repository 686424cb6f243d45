use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use maze_escape::best_time_store::{BestTimeStore, FileBestTimeStore, MemoryBestTimeStore};
use maze_escape::constants::{DEFAULT_GRID_SIZE, MAX_GRID_SIZE, TICK_MS};
use maze_escape::maze::{generate_maze, Maze};
use maze_escape::rng::Rng;
use maze_escape::session::{MoveOutcome, Session};
use maze_escape::types::{Direction, SessionStatus, Vec2};
use serde::Serialize;
use serde_json::{json, Value};

/// Generates mazes, checks their structure and auto-plays each one to the goal.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// First seed; consecutive mazes use seed, seed + 1, ...
    #[arg(long)]
    seed: Option<u32>,
    #[arg(long, default_value_t = 20)]
    count: u32,
    #[arg(long, default_value_t = DEFAULT_GRID_SIZE)]
    size: usize,
    /// Print each maze as text on stderr.
    #[arg(long)]
    render: bool,
    /// Persist best times to this JSON file instead of memory.
    #[arg(long)]
    best_time_path: Option<PathBuf>,
    #[arg(long)]
    run_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct MazeResultLine {
    seed: u32,
    size: usize,
    passages: usize,
    #[serde(rename = "deadEnds")]
    dead_ends: usize,
    #[serde(rename = "pathLength")]
    path_length: usize,
    #[serde(rename = "blockedProbes")]
    blocked_probes: usize,
    moves: u32,
    #[serde(rename = "elapsedMs")]
    elapsed_ms: u64,
    #[serde(rename = "newRecord")]
    new_record: bool,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct LongestPath {
    seed: u32,
    length: usize,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    size: usize,
    #[serde(rename = "mazeCount")]
    maze_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averagePathLength")]
    average_path_length: f64,
    #[serde(rename = "longestPath")]
    longest_path: Option<LongestPath>,
    #[serde(rename = "bestMs")]
    best_ms: Option<u64>,
    mazes: Vec<MazeResultLine>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    #[serde(rename = "timestampMs")]
    timestamp_ms: u64,
    level: String,
    event: String,
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    details: Value,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let exit_code = match cli.best_time_path.clone() {
        Some(path) => run(&cli, Arc::new(Mutex::new(FileBestTimeStore::new(path)))),
        None => run(&cli, Arc::new(Mutex::new(MemoryBestTimeStore::default()))),
    };
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run<S: BestTimeStore>(cli: &Cli, store: Arc<Mutex<S>>) -> i32 {
    let started_at_ms = now_ms();
    let first_seed = cli.seed.unwrap_or_else(rand::random::<u32>);
    let run_id = cli
        .run_id
        .clone()
        .unwrap_or_else(|| default_run_id(first_seed, started_at_ms));

    if cli.size == 0 || cli.size > MAX_GRID_SIZE {
        emit_log(
            "error",
            "invalid_size",
            &run_id,
            None,
            json!({ "size": cli.size, "max": MAX_GRID_SIZE }),
        );
        return 2;
    }

    emit_log(
        "info",
        "run_started",
        &run_id,
        Some(first_seed),
        json!({ "count": cli.count, "size": cli.size }),
    );

    let mut results = Vec::new();
    for offset in 0..cli.count {
        let seed = first_seed.wrapping_add(offset);
        let maze = match generate_maze(cli.size, &mut Rng::new(seed)) {
            Ok(maze) => maze,
            Err(error) => {
                emit_log(
                    "error",
                    "generation_failed",
                    &run_id,
                    Some(seed),
                    json!({ "error": error.to_string() }),
                );
                return 2;
            }
        };
        if cli.render {
            eprintln!("seed {seed}\n{}", maze.to_ascii());
        }

        let result = run_maze(seed, maze, store.clone());
        for anomaly in &result.anomalies {
            emit_log(
                "warn",
                "anomaly_detected",
                &run_id,
                Some(seed),
                json!({ "message": anomaly }),
            );
        }
        match serde_json::to_string(&result) {
            Ok(line) => println!("{line}"),
            Err(error) => emit_log(
                "error",
                "result_serialize_failed",
                &run_id,
                Some(seed),
                json!({ "error": error.to_string() }),
            ),
        }
        results.push(result);
    }

    let summary = build_run_summary(
        run_id.clone(),
        started_at_ms,
        now_ms(),
        cli.size,
        store.load(),
        results,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &run_id,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            return 2;
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "info",
        "run_finished",
        &run_id,
        None,
        json!({
            "mazeCount": summary.maze_count,
            "anomalyCount": summary.anomaly_count,
            "averagePathLength": summary.average_path_length,
            "bestMs": summary.best_ms,
            "summaryOut": summary_out_written,
        }),
    );

    if summary.anomaly_count > 0 {
        1
    } else {
        0
    }
}

fn run_maze<S: BestTimeStore>(seed: u32, maze: Maze, store: S) -> MazeResultLine {
    let mut anomalies = collect_maze_anomalies(&maze);
    let size = maze.size();
    let passages = maze.passage_count();
    let dead_ends = count_dead_ends(&maze);
    let path = maze.solve().unwrap_or_else(|| {
        anomalies.push("goal is unreachable from origin".to_string());
        Vec::new()
    });

    let mut session = Session::new(maze, store);
    let mut blocked_probes = 0;
    let mut new_record = false;

    if session.status() != SessionStatus::Won {
        for dir in Direction::ALL {
            if session.maze().can_move(session.player(), dir) {
                continue;
            }
            blocked_probes += 1;
            if session.request_move(dir) != MoveOutcome::Blocked {
                anomalies.push(format!("walled move {dir:?} at origin was not blocked"));
            }
        }
        if session.moves() != 0 || session.player() != Vec2::ORIGIN {
            anomalies.push("blocked probes changed the session".to_string());
        }

        for dir in &path {
            // A stale input is queued first; the buffer must keep only the newest.
            session.queue_move(dir.opposite());
            session.queue_move(*dir);
            match session.step(TICK_MS) {
                Some(MoveOutcome::Won {
                    new_record: record, ..
                }) => new_record = record,
                Some(MoveOutcome::Moved) => {}
                other => anomalies.push(format!("step along solution returned {other:?}")),
            }
        }
    }

    if session.status() != SessionStatus::Won {
        anomalies.push(format!("session ended as {:?}", session.status()));
    }
    if session.moves() as usize != path.len() {
        anomalies.push(format!(
            "move count {} differs from path length {}",
            session.moves(),
            path.len()
        ));
    }
    let expected_elapsed = TICK_MS * path.len() as u64;
    if blocked_probes > 0 && session.elapsed_ms() != expected_elapsed {
        anomalies.push(format!(
            "elapsed {}ms, expected {expected_elapsed}ms",
            session.elapsed_ms()
        ));
    }
    if session.request_move(Direction::North) != MoveOutcome::Ignored {
        anomalies.push("move after win was not ignored".to_string());
    }

    MazeResultLine {
        seed,
        size,
        passages,
        dead_ends,
        path_length: path.len(),
        blocked_probes,
        moves: session.moves(),
        elapsed_ms: session.elapsed_ms(),
        new_record,
        anomalies,
    }
}

fn collect_maze_anomalies(maze: &Maze) -> Vec<String> {
    let mut anomalies = Vec::new();
    let cell_count = maze.size() * maze.size();
    if maze.passage_count() != cell_count - 1 {
        anomalies.push(format!(
            "passage count {} is not {}",
            maze.passage_count(),
            cell_count - 1
        ));
    }
    let reachable = maze.reachable_from(maze.origin());
    if reachable.len() != cell_count {
        anomalies.push(format!(
            "only {} of {cell_count} cells reachable",
            reachable.len()
        ));
    }

    let size = maze.size() as i32;
    let mut asymmetric = HashSet::new();
    for y in 0..size {
        for x in 0..size {
            let pos = Vec2 { x, y };
            for dir in Direction::ALL {
                let next = pos.step(dir);
                if maze.in_bounds(next)
                    && maze.has_wall(pos, dir) != maze.has_wall(next, dir.opposite())
                {
                    asymmetric.insert((pos.min(next), pos.max(next)));
                }
            }
        }
    }
    for (a, b) in asymmetric {
        anomalies.push(format!(
            "asymmetric wall between ({},{}) and ({},{})",
            a.x, a.y, b.x, b.y
        ));
    }
    anomalies
}

fn count_dead_ends(maze: &Maze) -> usize {
    let size = maze.size() as i32;
    (0..size)
        .flat_map(|y| (0..size).map(move |x| Vec2 { x, y }))
        .filter(|pos| maze.open_directions(*pos).count() == 1)
        .count()
}

fn default_run_id(seed: u32, timestamp_ms: u64) -> String {
    format!("maze-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    run_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    size: usize,
    best_ms: Option<u64>,
    mazes: Vec<MazeResultLine>,
) -> RunSummary {
    let maze_count = mazes.len();
    let anomaly_count = mazes.iter().map(|maze| maze.anomalies.len()).sum();
    let total_path: usize = mazes.iter().map(|maze| maze.path_length).sum();
    let average_path_length = if maze_count == 0 {
        0.0
    } else {
        total_path as f64 / maze_count as f64
    };
    let longest_path = mazes
        .iter()
        .max_by_key(|maze| maze.path_length)
        .map(|maze| LongestPath {
            seed: maze.seed,
            length: maze.path_length,
        });

    RunSummary {
        run_id,
        started_at_ms,
        finished_at_ms,
        size,
        maze_count,
        anomaly_count,
        average_path_length,
        longest_path,
        best_ms,
        mazes,
    }
}

fn emit_log(level: &str, event: &str, run_id: &str, seed: Option<u32>, details: Value) {
    let log_line = StructuredLogLine {
        timestamp_ms: now_ms(),
        level: level.to_string(),
        event: event.to_string(),
        run_id: run_id.to_string(),
        seed,
        details,
    };
    match serde_json::to_string(&log_line) {
        Ok(text) => eprintln!("{text}"),
        Err(error) => tracing::error!(%error, event, "structured log failed to serialize"),
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}
