use serde_json::Value;

use crate::input::{command_for_key, Command};
use crate::types::Direction;

#[derive(Debug, PartialEq)]
pub enum ParsedClientMessage {
    Command(Command),
    Swipe {
        dx: f64,
        dy: f64,
    },
    Regenerate {
        seed: Option<u32>,
    },
    Ping {
        t: f64,
    },
}

pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "move" => {
            let dir = Direction::parse_move(object.get("dir")?.as_str()?)?;
            Some(ParsedClientMessage::Command(Command::Move(dir)))
        }
        "key" => {
            let command = command_for_key(object.get("key")?.as_str()?)?;
            if command == Command::Regenerate {
                return Some(ParsedClientMessage::Regenerate { seed: None });
            }
            Some(ParsedClientMessage::Command(command))
        }
        "swipe" => {
            let dx = parse_finite(object.get("dx")?)?;
            let dy = parse_finite(object.get("dy")?)?;
            Some(ParsedClientMessage::Swipe { dx, dy })
        }
        "pause" => Some(ParsedClientMessage::Command(Command::TogglePause)),
        "start" => Some(ParsedClientMessage::Command(Command::Start)),
        "reset" => Some(ParsedClientMessage::Command(Command::Reset)),
        "regenerate" => {
            let seed = match parse_optional_i64(object.get("seed"))? {
                None => None,
                Some(seed) => Some(u32::try_from(seed).ok()?),
            };
            Some(ParsedClientMessage::Regenerate { seed })
        }
        "ping" => {
            let t = parse_finite(object.get("t")?)?;
            Some(ParsedClientMessage::Ping { t })
        }
        _ => None,
    }
}

fn parse_finite(value: &Value) -> Option<f64> {
    let number = value.as_f64()?;
    number.is_finite().then_some(number)
}

fn parse_optional_i64(value: Option<&Value>) -> Option<Option<i64>> {
    const MAX_SAFE_INTEGER_F64: f64 = 9_007_199_254_740_991.0;

    let Some(value) = value else {
        return Some(None);
    };
    if value.is_null() {
        return Some(None);
    }
    if let Some(number) = value.as_i64() {
        return Some(Some(number));
    }
    if let Some(number) = value.as_u64() {
        return i64::try_from(number).ok().map(Some);
    }
    let number = value.as_f64()?;
    if !number.is_finite() {
        return None;
    }
    let floored = number.floor();
    if floored.abs() > MAX_SAFE_INTEGER_F64 {
        return None;
    }
    Some(Some(floored as i64))
}
