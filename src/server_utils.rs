use crate::constants::{DEFAULT_GRID_SIZE, MAX_GRID_SIZE};
use crate::types::SessionStatus;

/// `"42s"` under a minute, `"M:SS"` from then on.
pub fn format_elapsed(ms: u64) -> String {
    let seconds = ms / 1000;
    let minutes = seconds / 60;
    let rest = seconds % 60;
    if minutes > 0 {
        format!("{minutes}:{rest:02}")
    } else {
        format!("{rest}s")
    }
}

pub fn format_best(best_ms: Option<u64>) -> String {
    best_ms
        .map(format_elapsed)
        .unwrap_or_else(|| "--".to_string())
}

pub fn status_label(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Idle => "Idle",
        SessionStatus::Running => "Running",
        SessionStatus::Paused => "Paused",
        SessionStatus::Won => "Solved",
    }
}

pub fn normalize_grid_size(value: Option<i64>) -> usize {
    value
        .map(|size| size.clamp(1, MAX_GRID_SIZE as i64) as usize)
        .unwrap_or(DEFAULT_GRID_SIZE)
}

pub fn parse_grid_size(raw: Option<&str>) -> usize {
    normalize_grid_size(raw.and_then(|value| value.trim().parse::<i64>().ok()))
}
