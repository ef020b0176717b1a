//! Pin descriptor types.
//!
//! A pin descriptor names a physical pin as `"<port>.<pin>"` followed by
//! optional modifier characters, or `"nc"` for not connected:
//!
//! | modifier | meaning |
//! |---|---|
//! | `!` | inverted logic |
//! | `^` | pull-up |
//! | `v` | pull-down |
//! | `-` | no pull |
//! | `o` | open-drain |
//!
//! Modifiers are carried to the board; the actuator core only sees
//! logical levels.

use core::fmt;
use core::str::FromStr;
use thiserror::Error;

/// Pin descriptor parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PinParseError {
    #[error("pin descriptor {0:?} is missing the '.' between port and pin")]
    MissingSeparator(String),
    #[error("pin descriptor {0:?} has a non-numeric port or pin")]
    InvalidNumber(String),
    #[error("pin descriptor {input:?} has unknown modifier {modifier:?}")]
    UnknownModifier { input: String, modifier: char },
}

// ─── PinPull ────────────────────────────────────────────────────────

/// Input bias resistor selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PinPull {
    /// Board default (no modifier given).
    #[default]
    Default,
    Up,
    Down,
    None,
}

// ─── PinSpec ────────────────────────────────────────────────────────

/// Parsed pin descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PinSpec {
    /// `"nc"` or empty.
    #[default]
    NotConnected,
    /// A physical GPIO.
    Gpio {
        port: u8,
        pin: u8,
        inverted: bool,
        pull: PinPull,
        open_drain: bool,
    },
}

impl PinSpec {
    /// Convenience constructor for a plain, non-inverted pin.
    pub const fn gpio(port: u8, pin: u8) -> Self {
        Self::Gpio {
            port,
            pin,
            inverted: false,
            pull: PinPull::Default,
            open_drain: false,
        }
    }

    /// Whether this descriptor refers to a physical pin.
    #[inline]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Gpio { .. })
    }

    /// `(port, pin)` address, ignoring modifiers.
    #[inline]
    pub const fn address(&self) -> Option<(u8, u8)> {
        match self {
            Self::Gpio { port, pin, .. } => Some((*port, *pin)),
            Self::NotConnected => None,
        }
    }

    /// Whether the logical level is inverted at the pin.
    #[inline]
    pub const fn is_inverted(&self) -> bool {
        matches!(self, Self::Gpio { inverted: true, .. })
    }

    /// Parse leniently: anything unparsable is logged and becomes
    /// [`PinSpec::NotConnected`].
    pub fn parse_or_nc(s: &str) -> Self {
        match s.parse() {
            Ok(spec) => spec,
            Err(e) => {
                tracing::warn!("{e}; treating pin as not connected");
                Self::NotConnected
            }
        }
    }
}

impl FromStr for PinSpec {
    type Err = PinParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nc") {
            return Ok(Self::NotConnected);
        }

        let (port_str, rest) = trimmed
            .split_once('.')
            .ok_or_else(|| PinParseError::MissingSeparator(s.to_string()))?;

        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let (pin_str, modifiers) = rest.split_at(digits_end);

        let port = port_str
            .parse::<u8>()
            .map_err(|_| PinParseError::InvalidNumber(s.to_string()))?;
        let pin = pin_str
            .parse::<u8>()
            .map_err(|_| PinParseError::InvalidNumber(s.to_string()))?;

        let mut inverted = false;
        let mut pull = PinPull::Default;
        let mut open_drain = false;
        for c in modifiers.chars() {
            match c {
                '!' => inverted = true,
                '^' => pull = PinPull::Up,
                'v' => pull = PinPull::Down,
                '-' => pull = PinPull::None,
                'o' => open_drain = true,
                other => {
                    return Err(PinParseError::UnknownModifier {
                        input: s.to_string(),
                        modifier: other,
                    });
                }
            }
        }

        Ok(Self::Gpio {
            port,
            pin,
            inverted,
            pull,
            open_drain,
        })
    }
}

impl fmt::Display for PinSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "nc"),
            Self::Gpio {
                port,
                pin,
                inverted,
                pull,
                open_drain,
            } => {
                write!(f, "{port}.{pin}")?;
                if *inverted {
                    write!(f, "!")?;
                }
                match pull {
                    PinPull::Default => {}
                    PinPull::Up => write!(f, "^")?,
                    PinPull::Down => write!(f, "v")?,
                    PinPull::None => write!(f, "-")?,
                }
                if *open_drain {
                    write!(f, "o")?;
                }
                Ok(())
            }
        }
    }
}
