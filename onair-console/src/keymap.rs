//! Operator key bindings
//!
//! The console reads one line per key press or typed command. Key names
//! follow the switcher panel:
//!
//! | Input          | Command                         |
//! |----------------|---------------------------------|
//! | `space`        | cut                             |
//! | `enter`, blank | auto                            |
//! | `1`..`8`       | preview source N (list order)   |
//! | `f1`..`f8`     | program source N (list order)   |
//! | `ctrl+r`       | toggle recording                |
//! | `ctrl+s`       | toggle streaming                |
//!
//! Longer commands take arguments: `macro <id>`, `countdown <minutes>`,
//! `mute <channel>`, `solo <channel>`, `pfl <channel>`,
//! `level <channel> <level>`, `overlay <id> [on|off]`,
//! `transition <MIX|DIP|WIPE> <ms>`, `status`, `quit`.

use onair_core::{ControlCommand, TransitionKind};
use thiserror::Error;

/// Number of sources reachable from the number and function keys
pub const SOURCE_KEYS: usize = 8;

/// What an input line asks for
#[derive(Debug)]
pub enum Input {
    /// Forward to the control actor
    Command(ControlCommand),
    /// Print a state summary
    Status,
    /// Leave the console
    Quit,
}

/// Input that does not map to a command
#[derive(Debug, Error, PartialEq)]
pub enum KeymapError {
    #[error("Unknown key or command: {0}")]
    Unknown(String),

    #[error("'{command}' needs {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },

    #[error("Invalid {what}: {value}")]
    InvalidArgument { what: &'static str, value: String },
}

/// Map one input line
pub fn parse_line(line: &str) -> Result<Input, KeymapError> {
    let trimmed = line.trim();
    let lowered = trimmed.to_ascii_lowercase();
    let mut words = trimmed.split_whitespace();
    let head = words.next().map(str::to_ascii_lowercase).unwrap_or_default();
    let args: Vec<&str> = words.collect();

    // A line holding only spaces is the space bar
    if trimmed.is_empty() && !line.trim_end_matches(['\r', '\n']).is_empty() {
        return Ok(Input::Command(ControlCommand::Cut));
    }

    let cmd = match lowered.as_str() {
        "" | "enter" | "return" | "auto" => ControlCommand::Auto,
        "space" | "cut" => ControlCommand::Cut,
        "ctrl+r" | "cmd+r" => ControlCommand::ToggleRecord,
        "ctrl+s" | "cmd+s" => ControlCommand::ToggleStream,
        "status" => return Ok(Input::Status),
        "quit" | "exit" | "q" => return Ok(Input::Quit),
        key => {
            if let Some(index) = source_key(key, "") {
                ControlCommand::PreviewByIndex { index }
            } else if let Some(index) = source_key(key, "f") {
                ControlCommand::ProgramByIndex { index }
            } else {
                return parse_command(&head, &args, trimmed);
            }
        }
    };
    Ok(Input::Command(cmd))
}

/// Zero-based source index of a number or function key
fn source_key(key: &str, prefix: &str) -> Option<usize> {
    let digits = key.strip_prefix(prefix)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: usize = digits.parse().ok()?;
    (1..=SOURCE_KEYS).contains(&n).then(|| n - 1)
}

fn parse_command(head: &str, args: &[&str], line: &str) -> Result<Input, KeymapError> {
    let cmd = match head {
        "macro" => ControlCommand::TriggerMacroById {
            id: arg(args, 0, "macro", "a macro id")?.into(),
        },
        "countdown" => ControlCommand::StartCountdown {
            minutes: number(arg(args, 0, "countdown", "minutes")?, "minutes")?,
        },
        "mute" => ControlCommand::ToggleMute {
            id: arg(args, 0, "mute", "a channel id")?.into(),
        },
        "solo" => ControlCommand::ToggleSolo {
            id: arg(args, 0, "solo", "a channel id")?.into(),
        },
        "pfl" => ControlCommand::TogglePfl {
            id: arg(args, 0, "pfl", "a channel id")?.into(),
        },
        "level" => ControlCommand::SetLevel {
            id: arg(args, 0, "level", "a channel id and a level")?.into(),
            level: number(arg(args, 1, "level", "a channel id and a level")?, "level")?,
        },
        "overlay" => {
            let id = arg(args, 0, "overlay", "an overlay id")?.to_string();
            match args.get(1).map(|s| s.to_ascii_lowercase()).as_deref() {
                None => ControlCommand::ToggleOverlay { id },
                Some("on") => ControlCommand::SetOverlay { id, active: true },
                Some("off") => ControlCommand::SetOverlay { id, active: false },
                Some(other) => {
                    return Err(KeymapError::InvalidArgument {
                        what: "overlay state",
                        value: other.to_string(),
                    })
                }
            }
        }
        "transition" => {
            let expected = "a kind (MIX, DIP, WIPE) and a duration";
            let kind = transition_kind(arg(args, 0, "transition", expected)?)?;
            let duration_ms = number(arg(args, 1, "transition", expected)?, "duration")?;
            ControlCommand::SetTransition { kind, duration_ms }
        }
        _ => return Err(KeymapError::Unknown(line.to_string())),
    };
    Ok(Input::Command(cmd))
}

fn arg<'a>(
    args: &[&'a str],
    index: usize,
    command: &'static str,
    expected: &'static str,
) -> Result<&'a str, KeymapError> {
    args.get(index)
        .copied()
        .ok_or(KeymapError::MissingArgument { command, expected })
}

fn number<T: std::str::FromStr>(value: &str, what: &'static str) -> Result<T, KeymapError> {
    value.parse().map_err(|_| KeymapError::InvalidArgument {
        what,
        value: value.to_string(),
    })
}

fn transition_kind(value: &str) -> Result<TransitionKind, KeymapError> {
    match value.to_ascii_uppercase().as_str() {
        "MIX" => Ok(TransitionKind::Mix),
        "DIP" => Ok(TransitionKind::Dip),
        "WIPE" => Ok(TransitionKind::Wipe),
        _ => Err(KeymapError::InvalidArgument {
            what: "transition kind",
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn command(line: &str) -> ControlCommand {
        match parse_line(line) {
            Ok(Input::Command(cmd)) => cmd,
            other => panic!("expected a command for {:?}, got {:?}", line, other),
        }
    }

    #[test]
    fn test_switcher_keys() {
        assert!(matches!(command("space"), ControlCommand::Cut));
        assert!(matches!(command(" "), ControlCommand::Cut));
        assert!(matches!(command(""), ControlCommand::Auto));
        assert!(matches!(command("enter"), ControlCommand::Auto));
        assert!(matches!(command("3"), ControlCommand::PreviewByIndex { index: 2 }));
        assert!(matches!(command("F1"), ControlCommand::ProgramByIndex { index: 0 }));
        assert!(matches!(command("f8"), ControlCommand::ProgramByIndex { index: 7 }));
    }

    #[test]
    fn test_output_keys() {
        assert!(matches!(command("ctrl+r"), ControlCommand::ToggleRecord));
        assert!(matches!(command("Ctrl+S"), ControlCommand::ToggleStream));
    }

    #[test]
    fn test_keys_outside_bank_rejected() {
        assert!(matches!(parse_line("9"), Err(KeymapError::Unknown(_))));
        assert!(matches!(parse_line("0"), Err(KeymapError::Unknown(_))));
        assert!(matches!(parse_line("f9"), Err(KeymapError::Unknown(_))));
    }

    #[test]
    fn test_signed_keys_rejected() {
        assert!(matches!(parse_line("+3"), Err(KeymapError::Unknown(_))));
        assert!(matches!(parse_line("f+3"), Err(KeymapError::Unknown(_))));
        assert!(matches!(parse_line("-1"), Err(KeymapError::Unknown(_))));
    }

    #[test]
    fn test_argument_commands() {
        match command("macro show-open") {
            ControlCommand::TriggerMacroById { id } => assert_eq!(id.as_str(), "show-open"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            command("countdown 5"),
            ControlCommand::StartCountdown { minutes: 5 }
        ));
        match command("level host 0.5") {
            ControlCommand::SetLevel { id, level } => {
                assert_eq!(id.as_str(), "host");
                assert_eq!(level, 0.5);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            command("overlay score on"),
            ControlCommand::SetOverlay { active: true, .. }
        ));
        assert!(matches!(
            command("overlay score"),
            ControlCommand::ToggleOverlay { .. }
        ));
        assert!(matches!(
            command("transition wipe 750"),
            ControlCommand::SetTransition {
                kind: TransitionKind::Wipe,
                duration_ms: 750
            }
        ));
    }

    #[test]
    fn test_argument_errors() {
        assert_eq!(
            parse_line("countdown").unwrap_err(),
            KeymapError::MissingArgument {
                command: "countdown",
                expected: "minutes"
            }
        );
        assert!(matches!(
            parse_line("countdown soon"),
            Err(KeymapError::InvalidArgument { what: "minutes", .. })
        ));
        assert!(matches!(
            parse_line("transition slide 500"),
            Err(KeymapError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_console_controls() {
        assert!(matches!(parse_line("status"), Ok(Input::Status)));
        assert!(matches!(parse_line("quit"), Ok(Input::Quit)));
    }

    proptest! {
        #[test]
        fn number_keys_map_in_order(n in 1usize..=SOURCE_KEYS) {
            let preview = matches!(
                parse_line(&n.to_string()),
                Ok(Input::Command(ControlCommand::PreviewByIndex { index })) if index == n - 1
            );
            let program = matches!(
                parse_line(&format!("f{}", n)),
                Ok(Input::Command(ControlCommand::ProgramByIndex { index })) if index == n - 1
            );
            prop_assert!(preview);
            prop_assert!(program);
        }

        #[test]
        fn parse_never_panics(line in ".{0,40}") {
            let _ = parse_line(&line);
        }
    }
}
