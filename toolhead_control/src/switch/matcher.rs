//! Trigger matching of inbound commands.

use toolhead_common::command::{Command, TriggerCode};

/// Which configured trigger a command hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    On,
    Off,
}

/// On/off triggers plus the subcode filter of one switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandMatcher {
    pub on: Option<TriggerCode>,
    pub off: Option<TriggerCode>,
    pub subcode: u8,
}

impl CommandMatcher {
    pub const fn new(on: Option<TriggerCode>, off: Option<TriggerCode>, subcode: u8) -> Self {
        Self { on, off, subcode }
    }

    /// Classify `cmd`. The on-trigger wins if both triggers name the same
    /// code.
    pub fn classify(&self, cmd: &Command) -> Option<Trigger> {
        if cmd.subcode != self.subcode {
            return None;
        }
        let hits = |t: Option<TriggerCode>| {
            t.is_some_and(|t| t.letter == cmd.letter && t.code == cmd.code)
        };
        if hits(self.on) {
            Some(Trigger::On)
        } else if hits(self.off) {
            Some(Trigger::Off)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolhead_common::command::CommandLetter;

    fn fan() -> CommandMatcher {
        CommandMatcher::new(
            Some(TriggerCode::new(CommandLetter::M, 106)),
            Some(TriggerCode::new(CommandLetter::M, 107)),
            0,
        )
    }

    fn cmd(s: &str) -> Command {
        s.parse().unwrap()
    }

    #[test]
    fn letter_code_and_subcode_must_match() {
        let m = fan();
        assert_eq!(m.classify(&cmd("M106 S200")), Some(Trigger::On));
        assert_eq!(m.classify(&cmd("M107")), Some(Trigger::Off));
        assert_eq!(m.classify(&cmd("G106")), None);
        assert_eq!(m.classify(&cmd("M106.1")), None);
        assert_eq!(m.classify(&cmd("M105")), None);
    }

    #[test]
    fn subcode_filter_selects_instance() {
        let m = CommandMatcher { subcode: 2, ..fan() };
        assert_eq!(m.classify(&cmd("M106.2 S10")), Some(Trigger::On));
        assert_eq!(m.classify(&cmd("M106")), None);
    }

    #[test]
    fn unset_triggers_never_match() {
        let m = CommandMatcher::default();
        for line in ["M106", "M107", "G0 X1", "M0"] {
            assert_eq!(m.classify(&cmd(line)), None);
        }
    }
}
