//! ---
//! ldhrs_section: "01-core-functionality"
//! ldhrs_subsection: "binary"
//! ldhrs_type: "source"
//! ldhrs_scope: "code"
//! ldhrs_description: "Line-oriented operator console commands."
//! ldhrs_version: "v0.0.0-prealpha"
//! ldhrs_owner: "tbd"
//! ---
use std::str::FromStr;

use ldhrs_core::Axis;
use thiserror::Error;

pub const HELP: &str =
    "commands: angle x|y DEG, lock, auto, shutdown, audit, status, help, quit";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Angle { axis: Axis, degrees: f64 },
    Lock,
    Auto,
    Shutdown,
    Audit,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsoleError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`, try `help`")]
    Unknown(String),
    #[error("usage: angle x|y DEG")]
    AngleUsage,
}

impl FromStr for ConsoleCommand {
    type Err = ConsoleError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(ConsoleError::Empty);
        };
        let command = match verb.to_lowercase().as_str() {
            "angle" => {
                let axis = words
                    .next()
                    .and_then(|word| word.parse::<Axis>().ok())
                    .ok_or(ConsoleError::AngleUsage)?;
                let degrees = words
                    .next()
                    .and_then(|word| word.parse::<f64>().ok())
                    .filter(|value| value.is_finite())
                    .ok_or(ConsoleError::AngleUsage)?;
                ConsoleCommand::Angle { axis, degrees }
            }
            "lock" => ConsoleCommand::Lock,
            "auto" => ConsoleCommand::Auto,
            "shutdown" | "resume" => ConsoleCommand::Shutdown,
            "audit" => ConsoleCommand::Audit,
            "status" => ConsoleCommand::Status,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            other => return Err(ConsoleError::Unknown(other.to_owned())),
        };
        if words.next().is_some() && !matches!(command, ConsoleCommand::Angle { .. }) {
            return Err(ConsoleError::Unknown(line.trim().to_owned()));
        }
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_angle() {
        assert_eq!(
            "angle Y 42.5".parse::<ConsoleCommand>(),
            Ok(ConsoleCommand::Angle {
                axis: Axis::Y,
                degrees: 42.5
            })
        );
        assert_eq!(
            "angle z 10".parse::<ConsoleCommand>(),
            Err(ConsoleError::AngleUsage)
        );
        assert_eq!(
            "angle x NaN".parse::<ConsoleCommand>(),
            Err(ConsoleError::AngleUsage)
        );
    }

    #[test]
    fn parses_toggles_and_aliases() {
        assert_eq!("LOCK".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Lock));
        assert_eq!("resume".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Shutdown));
        assert_eq!(" quit ".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Quit));
    }

    #[test]
    fn rejects_blank_and_unknown() {
        assert_eq!("   ".parse::<ConsoleCommand>(), Err(ConsoleError::Empty));
        assert!(matches!(
            "dance".parse::<ConsoleCommand>(),
            Err(ConsoleError::Unknown(_))
        ));
        assert!(matches!(
            "lock now".parse::<ConsoleCommand>(),
            Err(ConsoleError::Unknown(_))
        ));
    }
}
