use serde::{Deserialize, Serialize};
use std::fmt;

/// OSC introducer: ESC ]
pub const OSC_INTRODUCER: &str = "\x1b]";

/// BEL terminates every marker we write.
pub const OSC_TERMINATOR: &str = "\x07";

/// The semantic-prompt OSC number.
pub const OSC_SEMANTIC_PROMPT: &str = "133";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerKind {
    /// 133;A  a new prompt begins
    PromptStart,
    /// 133;B  prompt text ended, user input begins
    SecondaryPrompt,
    /// 133;C  command is about to run, output follows
    OutputStart,
    /// 133;D  command output ended (optionally with exit status)
    OutputEnd,
}

impl MarkerKind {
    pub fn code(self) -> char {
        match self {
            MarkerKind::PromptStart => 'A',
            MarkerKind::SecondaryPrompt => 'B',
            MarkerKind::OutputStart => 'C',
            MarkerKind::OutputEnd => 'D',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'A' => Some(MarkerKind::PromptStart),
            'B' => Some(MarkerKind::SecondaryPrompt),
            'C' => Some(MarkerKind::OutputStart),
            'D' => Some(MarkerKind::OutputEnd),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub kind: MarkerKind,
    /// Exit status. Only meaningful for `OutputEnd`.
    pub payload: Option<i32>,
}

impl Marker {
    pub fn prompt_start() -> Self {
        Self { kind: MarkerKind::PromptStart, payload: None }
    }

    pub fn secondary_prompt() -> Self {
        Self { kind: MarkerKind::SecondaryPrompt, payload: None }
    }

    pub fn output_start() -> Self {
        Self { kind: MarkerKind::OutputStart, payload: None }
    }

    /// `None` is the defensive form used when no exit status is known.
    pub fn output_end(status: Option<i32>) -> Self {
        Self { kind: MarkerKind::OutputEnd, payload: status }
    }

    /// The bytes that go on the wire.
    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{OSC_INTRODUCER}{OSC_SEMANTIC_PROMPT};{}", self.kind.code())?;
        if let Some(status) = self.payload {
            write!(f, ";{status}")?;
        }
        f.write_str(OSC_TERMINATOR)
    }
}
