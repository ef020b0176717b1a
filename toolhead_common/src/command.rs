//! G/M command word parsing.
//!
//! Only the part actuators care about: the category letter, the numeric
//! code with its optional `.N` subcode, and lettered arguments.
//!
//! ```rust
//! use toolhead_common::command::{Command, CommandLetter};
//!
//! let cmd: Command = "M106.2 S128".parse().unwrap();
//! assert_eq!(cmd.letter, CommandLetter::M);
//! assert_eq!(cmd.code, 106);
//! assert_eq!(cmd.subcode, 2);
//! assert_eq!(cmd.arg('S'), Some(128.0));
//! ```

use core::fmt;
use core::str::FromStr;
use thiserror::Error;

/// Command line parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    #[error("no G or M word in {0:?}")]
    NoCommandWord(String),
    #[error("word '{letter}' in {input:?} has no valid number")]
    InvalidNumber { input: String, letter: char },
}

/// Command category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandLetter {
    /// Motion/preparatory words.
    G,
    /// Machine/miscellaneous words.
    M,
}

impl fmt::Display for CommandLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::G => write!(f, "G"),
            Self::M => write!(f, "M"),
        }
    }
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub letter: CommandLetter,
    pub code: u16,
    /// Digits after the `.` of the command word, `0` when absent.
    pub subcode: u8,
    args: Vec<(char, f32)>,
}

impl Command {
    /// Build a command without arguments.
    pub fn new(letter: CommandLetter, code: u16) -> Self {
        Self {
            letter,
            code,
            subcode: 0,
            args: Vec::new(),
        }
    }

    /// Builder-style subcode.
    pub fn with_subcode(mut self, subcode: u8) -> Self {
        self.subcode = subcode;
        self
    }

    /// Builder-style argument.
    pub fn with_arg(mut self, letter: char, value: f32) -> Self {
        self.args.push((letter.to_ascii_uppercase(), value));
        self
    }

    /// Value of the first argument with `letter`.
    pub fn arg(&self, letter: char) -> Option<f32> {
        let letter = letter.to_ascii_uppercase();
        self.args
            .iter()
            .find(|(l, _)| *l == letter)
            .map(|(_, v)| *v)
    }
}

impl FromStr for Command {
    type Err = CommandParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Strip trailing ';' comments.
        let line = s.split(';').next().unwrap_or_default();

        let mut head: Option<(CommandLetter, u16, u8)> = None;
        let mut args = Vec::new();

        let mut chars = line.char_indices().peekable();
        while let Some((_, c)) = chars.next() {
            if c.is_whitespace() {
                continue;
            }
            if c == '(' {
                // Inline comment.
                for (_, c) in chars.by_ref() {
                    if c == ')' {
                        break;
                    }
                }
                continue;
            }
            if !c.is_ascii_alphabetic() {
                continue;
            }
            let letter = c.to_ascii_uppercase();

            let mut number = String::new();
            while let Some(&(_, n)) = chars.peek() {
                if n.is_ascii_digit() || n == '.' || ((n == '-' || n == '+') && number.is_empty()) {
                    number.push(n);
                    chars.next();
                } else {
                    break;
                }
            }

            let invalid = || CommandParseError::InvalidNumber {
                input: s.to_string(),
                letter,
            };

            match letter {
                'G' | 'M' if head.is_none() => {
                    let (code_str, sub_str) = number.split_once('.').unwrap_or((number.as_str(), ""));
                    let code = code_str.parse::<u16>().map_err(|_| invalid())?;
                    let subcode = if sub_str.is_empty() {
                        0
                    } else {
                        sub_str.parse::<u8>().map_err(|_| invalid())?
                    };
                    let category = if letter == 'G' {
                        CommandLetter::G
                    } else {
                        CommandLetter::M
                    };
                    head = Some((category, code, subcode));
                }
                _ => {
                    let value = number.parse::<f32>().map_err(|_| invalid())?;
                    args.push((letter, value));
                }
            }
        }

        let (letter, code, subcode) =
            head.ok_or_else(|| CommandParseError::NoCommandWord(s.to_string()))?;
        Ok(Self {
            letter,
            code,
            subcode,
            args,
        })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter, self.code)?;
        if self.subcode != 0 {
            write!(f, ".{}", self.subcode)?;
        }
        for (letter, value) in &self.args {
            write!(f, " {letter}{value}")?;
        }
        Ok(())
    }
}

// ─── TriggerCode ────────────────────────────────────────────────────

/// Letter + code pair an actuator reacts to, parsed from a configured
/// command string such as `"M106"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriggerCode {
    pub letter: CommandLetter,
    pub code: u16,
}

impl TriggerCode {
    pub const fn new(letter: CommandLetter, code: u16) -> Self {
        Self { letter, code }
    }

    /// Parse a configured trigger. Empty text or text without a G/M word
    /// yields `None` (trigger unset).
    pub fn from_config(text: &str) -> Option<Self> {
        if text.trim().is_empty() {
            return None;
        }
        match text.parse::<Command>() {
            Ok(cmd) => Some(Self::new(cmd.letter, cmd.code)),
            Err(e) => {
                tracing::warn!("ignoring trigger command: {e}");
                None
            }
        }
    }
}

impl fmt::Display for TriggerCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter, self.code)
    }
}
