//! Line commands for the headless participant.
//!
//! Each stdin line parses into a [`Command`]; board commands become an
//! [`Intent`] for the session driver. Coordinates are always `lng lat`.

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;

use crate::model::{LngLat, NewPin, PinPatch};
use crate::signal::Intent;

pub const HELP: &str = "\
commands:
  pin <lng> <lat> [title...]      add a pin
  title <id> <text...>            rename a pin
  move <id> <lng> <lat>           move a pin
  color <id> <#rrggbb>            recolor a pin
  delete <id>                     delete a pin
  select <id>|none                select or deselect a pin
  route start|cancel|last|clear   route selection shortcuts
  route <lng> <lat> <lng> <lat>   route between two points
  clear pins|route                clear pins or the route
  cursor <lng> <lat>              move the local cursor
  jump <session-id>               show a participant's cursor
  help                            show this text
  quit                            leave the board and exit";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CommandError {
    #[error("unknown command `{0}`; try `help`")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("invalid coordinate `{0}`")]
    InvalidCoordinate(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Intent(Intent),
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
///
/// # Errors
///
/// Returns a [`CommandError`] for unknown verbs, missing arguments, or
/// coordinates that are not finite numbers.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&verb, args)) = words.split_first() else {
        return Ok(None);
    };

    let intent = match (verb, args) {
        ("help" | "?", _) => return Ok(Some(Command::Help)),
        ("quit" | "exit", _) => return Ok(Some(Command::Quit)),

        ("pin", [lng, lat, title @ ..]) => {
            let pin = NewPin::at(coordinate(lng, lat)?);
            if title.is_empty() { Intent::AddPin(pin) } else { Intent::AddPin(pin.with_title(title.join(" "))) }
        }
        ("pin", _) => return Err(CommandError::Usage("pin <lng> <lat> [title...]")),

        ("title", [id, text @ ..]) if !text.is_empty() => Intent::UpdatePin {
            id: (*id).to_owned(),
            patch: PinPatch { title: Some(text.join(" ")), ..PinPatch::default() },
        },
        ("title", _) => return Err(CommandError::Usage("title <id> <text...>")),

        ("move", [id, lng, lat]) => Intent::UpdatePin {
            id: (*id).to_owned(),
            patch: PinPatch { coordinates: Some(coordinate(lng, lat)?), ..PinPatch::default() },
        },
        ("move", _) => return Err(CommandError::Usage("move <id> <lng> <lat>")),

        ("color", [id, color]) => Intent::UpdatePin {
            id: (*id).to_owned(),
            patch: PinPatch { color: Some((*color).to_owned()), ..PinPatch::default() },
        },
        ("color", _) => return Err(CommandError::Usage("color <id> <#rrggbb>")),

        ("delete", [id]) => Intent::DeletePin { id: (*id).to_owned() },
        ("delete", _) => return Err(CommandError::Usage("delete <id>")),

        ("select", ["none"]) => Intent::SelectPin { id: None },
        ("select", [id]) => Intent::SelectPin { id: Some((*id).to_owned()) },
        ("select", _) => return Err(CommandError::Usage("select <id>|none")),

        ("route", ["start"]) => Intent::StartRouteSelection,
        ("route", ["cancel"]) => Intent::CancelRouteSelection,
        ("route", ["last"]) => Intent::RouteLastTwo,
        ("route", ["clear"]) => Intent::ClearRoute,
        ("route", [from_lng, from_lat, to_lng, to_lat]) => Intent::RequestRoute {
            from: coordinate(from_lng, from_lat)?,
            to: coordinate(to_lng, to_lat)?,
            from_id: None,
            to_id: None,
        },
        ("route", _) => return Err(CommandError::Usage("route start|cancel|last|clear | route <lng> <lat> <lng> <lat>")),

        ("clear", ["pins"]) => Intent::ClearPins,
        ("clear", ["route"]) => Intent::ClearRoute,
        ("clear", _) => return Err(CommandError::Usage("clear pins|route")),

        ("cursor", [lng, lat]) => Intent::MoveCursor { position: coordinate(lng, lat)? },
        ("cursor", _) => return Err(CommandError::Usage("cursor <lng> <lat>")),

        ("jump", [session_id]) => Intent::JumpTo { session_id: (*session_id).to_owned() },
        ("jump", _) => return Err(CommandError::Usage("jump <session-id>")),

        (other, _) => return Err(CommandError::Unknown(other.to_owned())),
    };
    Ok(Some(Command::Intent(intent)))
}

fn coordinate(lng: &str, lat: &str) -> Result<LngLat, CommandError> {
    Ok([number(lng)?, number(lat)?])
}

fn number(raw: &str) -> Result<f64, CommandError> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(CommandError::InvalidCoordinate(raw.to_owned())),
    }
}
