//! Maps raw host input (key names, swipe vectors) onto session commands.

use crate::constants::SWIPE_THRESHOLD_PX;
use crate::types::Direction;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Move(Direction),
    TogglePause,
    Start,
    Reset,
    Regenerate,
    Close,
}

/// Key names follow the DOM `KeyboardEvent.key` values.
pub fn command_for_key(key: &str) -> Option<Command> {
    match key {
        "ArrowUp" => return Some(Command::Move(Direction::North)),
        "ArrowDown" => return Some(Command::Move(Direction::South)),
        "ArrowLeft" => return Some(Command::Move(Direction::West)),
        "ArrowRight" => return Some(Command::Move(Direction::East)),
        " " | "Space" | "Spacebar" => return Some(Command::TogglePause),
        "Escape" => return Some(Command::Close),
        _ => {}
    }

    match key.to_ascii_lowercase().as_str() {
        "w" => Some(Command::Move(Direction::North)),
        "s" => Some(Command::Move(Direction::South)),
        "a" => Some(Command::Move(Direction::West)),
        "d" => Some(Command::Move(Direction::East)),
        "r" => Some(Command::Reset),
        "g" => Some(Command::Regenerate),
        _ => None,
    }
}

/// One move per swipe along the dominant axis; short drags are ignored.
pub fn classify_swipe(dx: f64, dy: f64) -> Option<Direction> {
    if !dx.is_finite() || !dy.is_finite() {
        return None;
    }
    if dx.abs() < SWIPE_THRESHOLD_PX && dy.abs() < SWIPE_THRESHOLD_PX {
        return None;
    }
    if dx.abs() > dy.abs() {
        Some(if dx > 0.0 {
            Direction::East
        } else {
            Direction::West
        })
    } else {
        Some(if dy > 0.0 {
            Direction::South
        } else {
            Direction::North
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrows_and_wasd_map_to_the_same_moves() {
        let pairs = [
            ("ArrowUp", "w", Direction::North),
            ("ArrowDown", "s", Direction::South),
            ("ArrowLeft", "a", Direction::West),
            ("ArrowRight", "d", Direction::East),
        ];
        for (arrow, letter, dir) in pairs {
            assert_eq!(command_for_key(arrow), Some(Command::Move(dir)));
            assert_eq!(command_for_key(letter), Some(Command::Move(dir)));
            assert_eq!(
                command_for_key(&letter.to_ascii_uppercase()),
                Some(Command::Move(dir))
            );
        }
    }

    #[test]
    fn control_keys_map_to_commands() {
        assert_eq!(command_for_key(" "), Some(Command::TogglePause));
        assert_eq!(command_for_key("R"), Some(Command::Reset));
        assert_eq!(command_for_key("g"), Some(Command::Regenerate));
        assert_eq!(command_for_key("Escape"), Some(Command::Close));
        assert_eq!(command_for_key("arrowup"), None);
        assert_eq!(command_for_key("x"), None);
    }

    #[test]
    fn short_swipes_are_ignored() {
        assert_eq!(classify_swipe(0.0, 0.0), None);
        assert_eq!(classify_swipe(21.9, -21.9), None);
        assert_eq!(classify_swipe(f64::NAN, 100.0), None);
    }

    #[test]
    fn swipe_follows_the_dominant_axis() {
        assert_eq!(classify_swipe(40.0, 10.0), Some(Direction::East));
        assert_eq!(classify_swipe(-40.0, 30.0), Some(Direction::West));
        assert_eq!(classify_swipe(5.0, 22.0), Some(Direction::South));
        assert_eq!(classify_swipe(0.0, -80.0), Some(Direction::North));
        assert_eq!(classify_swipe(30.0, 30.0), Some(Direction::South));
    }
}
