//! Go Text Protocol (GTP) implementation.
//!
//! GTP is a text-based protocol for communicating with Go-playing programs.
//! This module implements GTP version 2, allowing the engine to be used
//! with graphical Go interfaces like Sabaki, GoGui, or Lizzie.
//!
//! ## Supported Commands
//!
//! - `name`, `version`, `protocol_version`
//! - `list_commands`, `known_command <cmd>`
//! - `quit`
//! - `boardsize <size>` - Only the compiled board size is accepted
//! - `clear_board`, `komi <value>`
//! - `play <color> <vertex>`, `genmove <color>`, `undo`
//! - `set_free_handicap <vertex>...`
//! - `showboard`, `final_score`
//! - `param [<name> <value>]` - List or set engine parameters
//!
//! ## Example
//!
//! ```ignore
//! use michi_engine::gtp::GtpEngine;
//! let mut gtp = GtpEngine::default();
//! gtp.run()?;
//! ```

use std::io::{self, BufRead, Write};
use std::time::Duration;

use thiserror::Error;

use crate::config::ParamError;
use crate::constants::N;
use crate::engine::{Engine, NothingToUndo};
use crate::position::{Color, IllegalMove, Point, parse_coord, str_coord};

/// The list of known GTP commands.
const KNOWN_COMMANDS: &[&str] = &[
    "boardsize",
    "clear_board",
    "final_score",
    "genmove",
    "known_command",
    "komi",
    "list_commands",
    "name",
    "param",
    "play",
    "protocol_version",
    "quit",
    "set_free_handicap",
    "showboard",
    "undo",
    "version",
];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GtpError {
    #[error("missing argument")]
    MissingArgument,
    #[error("invalid color {0}")]
    InvalidColor(String),
    #[error("invalid vertex {0}")]
    InvalidVertex(String),
    #[error("invalid value {0}")]
    InvalidValue(String),
    #[error("unacceptable size {0}, only {n} is supported", n = N)]
    UnacceptableSize(usize),
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("illegal move: {0}")]
    IllegalMove(#[from] IllegalMove),
    #[error("cannot undo")]
    CannotUndo(#[from] NothingToUndo),
    #[error(transparent)]
    Param(#[from] ParamError),
}

/// GTP front end over an [`Engine`].
pub struct GtpEngine {
    engine: Engine,
    /// Optional thinking time per generated move
    time_budget: Option<Duration>,
}

impl Default for GtpEngine {
    fn default() -> Self {
        Self::new(Engine::default(), None)
    }
}

impl GtpEngine {
    pub fn new(engine: Engine, time_budget: Option<Duration>) -> Self {
        Self { engine, time_budget }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Run the GTP command loop on stdin and stdout.
    pub fn run(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        self.run_with(stdin.lock(), io::stdout())
    }

    /// Run the GTP command loop until `quit` or end of input.
    pub fn run_with<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        for line in input.lines() {
            let line = line?;

            // Skip empty lines and comments
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (id, command_line) = Self::parse_id(line);

            let parts: Vec<&str> = command_line.split_whitespace().collect();
            let Some((command, args)) = parts.split_first() else {
                continue;
            };
            let command = command.to_lowercase();

            let response = self.execute(&command, args);

            let id_str = id.map(|i| i.to_string()).unwrap_or_default();
            match &response {
                Ok(message) => write!(output, "={id_str} {message}\n\n")?,
                Err(e) => {
                    log::warn!("{command}: {e}");
                    write!(output, "?{id_str} {e}\n\n")?
                }
            }
            output.flush()?;

            if command == "quit" {
                break;
            }
        }
        Ok(())
    }

    /// Parse an optional numeric command ID from the beginning of the line.
    fn parse_id(line: &str) -> (Option<u32>, &str) {
        let trimmed = line.trim();
        let end = trimmed
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map_or(trimmed.len(), |(i, _)| i);
        match trimmed[..end].parse::<u32>() {
            Ok(id) => (Some(id), trimmed[end..].trim()),
            Err(_) => (None, trimmed),
        }
    }

    /// Execute a GTP command and return the response text.
    pub fn execute(&mut self, command: &str, args: &[&str]) -> Result<String, GtpError> {
        match command {
            "name" => Ok("michi".to_string()),

            "version" => Ok(env!("CARGO_PKG_VERSION").to_string()),

            "protocol_version" => Ok("2".to_string()),

            "list_commands" => Ok(KNOWN_COMMANDS.join("\n")),

            "known_command" => {
                let name = arg(args, 0)?.to_lowercase();
                Ok(KNOWN_COMMANDS.contains(&name.as_str()).to_string())
            }

            "quit" => Ok(String::new()),

            "boardsize" => {
                let value = arg(args, 0)?;
                match value.parse::<usize>() {
                    Ok(size) if size == N => {
                        self.engine.clear();
                        Ok(String::new())
                    }
                    Ok(size) => Err(GtpError::UnacceptableSize(size)),
                    Err(_) => Err(GtpError::InvalidValue(value.to_string())),
                }
            }

            "clear_board" => {
                self.engine.clear();
                Ok(String::new())
            }

            "komi" => {
                let value = arg(args, 0)?;
                let komi = value
                    .parse::<f32>()
                    .map_err(|_| GtpError::InvalidValue(value.to_string()))?;
                self.engine.set_komi(komi);
                Ok(String::new())
            }

            "play" => {
                let color = parse_color(arg(args, 0)?)?;
                let pt = parse_vertex(arg(args, 1)?)?;
                self.engine.play_as(color, pt)?;
                Ok(String::new())
            }

            "genmove" => {
                let color = parse_color(arg(args, 0)?)?;
                self.engine.set_to_play(color);
                let mv = self.engine.genmove(self.time_budget);
                log::debug!("\n{}", self.engine.position());
                Ok(str_coord(mv))
            }

            "undo" => {
                self.engine.undo()?;
                Ok(String::new())
            }

            "set_free_handicap" => {
                if args.is_empty() {
                    return Err(GtpError::MissingArgument);
                }
                let stones = args.iter().map(|v| parse_vertex(v)).collect::<Result<Vec<Point>, _>>()?;
                self.engine.set_free_handicap(&stones)?;
                Ok(String::new())
            }

            "showboard" => Ok(format!("\n{}", self.engine.position())),

            "final_score" => {
                let score = self.engine.final_score();
                Ok(format_score(score.raw))
            }

            "param" => {
                if args.is_empty() {
                    let entries = self.engine.params().entries();
                    let lines: Vec<String> = entries.into_iter().map(|(name, value)| format!("{name} {value}")).collect();
                    return Ok(lines.join("\n"));
                }
                let value = arg(args, 1)?;
                self.engine.params_mut().set(args[0], value)?;
                Ok(String::new())
            }

            _ => Err(GtpError::UnknownCommand(command.to_string())),
        }
    }
}

fn arg<'a>(args: &[&'a str], i: usize) -> Result<&'a str, GtpError> {
    args.get(i).copied().ok_or(GtpError::MissingArgument)
}

fn parse_color(s: &str) -> Result<Color, GtpError> {
    match s.to_lowercase().as_str() {
        "b" | "black" => Ok(Color::Black),
        "w" | "white" => Ok(Color::White),
        _ => Err(GtpError::InvalidColor(s.to_string())),
    }
}

fn parse_vertex(s: &str) -> Result<Point, GtpError> {
    parse_coord(s).ok_or_else(|| GtpError::InvalidVertex(s.to_string()))
}

/// GTP result notation: `B+3.5`, `W+0.5` or `0`.
fn format_score(score: f64) -> String {
    if score > 0.0 {
        format!("B+{score:.1}")
    } else if score < 0.0 {
        format!("W+{:.1}", -score)
    } else {
        "0".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Params;

    fn gtp(n_sims: usize) -> GtpEngine {
        GtpEngine::new(
            Engine::new(Params {
                n_sims,
                ..Params::default()
            }),
            None,
        )
    }

    #[test]
    fn test_parse_id_with_id() {
        let (id, cmd) = GtpEngine::parse_id("123 name");
        assert_eq!(id, Some(123));
        assert_eq!(cmd, "name");
    }

    #[test]
    fn test_parse_id_without_id() {
        let (id, cmd) = GtpEngine::parse_id("name");
        assert_eq!(id, None);
        assert_eq!(cmd, "name");
    }

    #[test]
    fn test_name_and_protocol_version() {
        let mut gtp = gtp(10);
        assert_eq!(gtp.execute("name", &[]), Ok("michi".to_string()));
        assert_eq!(gtp.execute("protocol_version", &[]), Ok("2".to_string()));
    }

    #[test]
    fn test_known_command() {
        let mut gtp = gtp(10);
        assert_eq!(gtp.execute("known_command", &["undo"]), Ok("true".to_string()));
        assert_eq!(gtp.execute("known_command", &["unknown_cmd"]), Ok("false".to_string()));
        assert_eq!(gtp.execute("known_command", &[]), Err(GtpError::MissingArgument));
    }

    #[test]
    fn test_boardsize() {
        let mut gtp = gtp(10);
        assert!(gtp.execute("boardsize", &[&N.to_string()]).is_ok());
        assert_eq!(gtp.execute("boardsize", &["25"]), Err(GtpError::UnacceptableSize(25)));
        assert_eq!(
            GtpError::UnacceptableSize(25).to_string(),
            format!("unacceptable size 25, only {N} is supported")
        );
    }

    #[test]
    fn test_play_undo_and_clear() {
        let mut gtp = gtp(10);
        assert!(gtp.execute("play", &["black", "D4"]).is_ok());
        assert!(matches!(
            gtp.execute("play", &["white", "D4"]),
            Err(GtpError::IllegalMove(IllegalMove::Occupied))
        ));
        assert!(matches!(gtp.execute("play", &["red", "D4"]), Err(GtpError::InvalidColor(_))));
        assert!(matches!(gtp.execute("play", &["w", "Z99"]), Err(GtpError::InvalidVertex(_))));
        assert!(gtp.execute("play", &["w", "pass"]).is_ok());
        assert!(gtp.execute("undo", &[]).is_ok());
        assert!(gtp.execute("undo", &[]).is_ok());
        assert_eq!(gtp.execute("undo", &[]), Err(GtpError::CannotUndo(NothingToUndo)));
        assert!(gtp.execute("play", &["b", "E5"]).is_ok());
        assert!(gtp.execute("clear_board", &[]).is_ok());
        assert_eq!(gtp.engine().position().n, 0);
    }

    #[test]
    fn test_param_command() {
        let mut gtp = gtp(10);
        assert!(gtp.execute("param", &["n_sims", "42"]).is_ok());
        assert_eq!(gtp.engine().params().n_sims, 42);
        let listing = gtp.execute("param", &[]).unwrap();
        assert!(listing.lines().any(|l| l == "N_SIMS 42"));
        assert!(matches!(gtp.execute("param", &["bogus", "1"]), Err(GtpError::Param(_))));
    }

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(3.5), "B+3.5");
        assert_eq!(format_score(-0.5), "W+0.5");
        assert_eq!(format_score(0.0), "0");
    }

    #[test]
    fn test_run_with_session() {
        let mut gtp = gtp(10);
        let input = "1 name\nbogus\n# comment\n2 play b C3\nquit\nname\n";
        let mut output = Vec::new();
        gtp.run_with(input.as_bytes(), &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert_eq!(text, "=1 michi\n\n? unknown command: bogus\n\n=2 \n\n= \n\n");
    }
}
