use crate::marker::{Marker, MarkerKind};
use serde::Serialize;
use std::borrow::Cow;

/// What the decoder pulls out of a byte stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum OscEvent {
    /// OSC 133;<code>[;payload]
    Marker(Marker),

    /// Anything else (payload string, without terminator)
    Unknown(String),
}

/// Streaming OSC parser (handles BEL or ST terminators, chunk-safe).
///
/// Non-OSC bytes (prompt text, command output) are skipped.
#[derive(Debug, Default, Clone)]
pub struct OscParser {
    in_osc: bool,
    saw_esc: bool,
    buf: Vec<u8>,
}

impl OscParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes; returns parsed OSC events.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<OscEvent> {
        let mut out = Vec::new();

        for &b in bytes {
            if !self.in_osc {
                // OSC introducer: ESC ]  or single-byte 0x9d
                if self.saw_esc {
                    self.saw_esc = false;
                    if b == b']' {
                        self.in_osc = true;
                        self.buf.clear();
                        continue;
                    }
                }

                if b == 0x1b {
                    self.saw_esc = true;
                } else if b == 0x9d {
                    self.in_osc = true;
                    self.buf.clear();
                }
                continue;
            }

            // Inside OSC. Terminators: BEL, or ST (ESC \)
            if self.saw_esc {
                self.saw_esc = false;
                if b == b'\\' {
                    if let Some(ev) = self.finish_event() {
                        out.push(ev);
                    }
                    self.in_osc = false;
                    continue;
                }
                self.buf.push(0x1b);
                self.buf.push(b);
                continue;
            }

            if b == 0x1b {
                self.saw_esc = true;
                continue;
            }

            if b == 0x07 {
                if let Some(ev) = self.finish_event() {
                    out.push(ev);
                }
                self.in_osc = false;
                continue;
            }

            self.buf.push(b);
        }

        out
    }

    fn finish_event(&mut self) -> Option<OscEvent> {
        if self.buf.is_empty() {
            return None;
        }

        let payload = String::from_utf8_lossy(&self.buf);
        Some(parse_osc_payload(payload))
    }
}

/// Decode a complete byte stream and keep only the prompt markers.
pub fn decode_markers(bytes: &[u8]) -> Vec<Marker> {
    OscParser::new()
        .feed(bytes)
        .into_iter()
        .filter_map(|ev| match ev {
            OscEvent::Marker(m) => Some(m),
            OscEvent::Unknown(_) => None,
        })
        .collect()
}

fn parse_osc_payload(payload: Cow<'_, str>) -> OscEvent {
    let s = payload.trim_matches('\0').trim();

    // 133;A   133;B   133;C   133;D   133;D;0
    if let Some(rest) = s.strip_prefix("133;") {
        let mut parts = rest.split(';');
        let kind = parts
            .next()
            .and_then(|code| {
                let mut chars = code.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => MarkerKind::from_code(c),
                    _ => None,
                }
            });

        if let Some(kind) = kind {
            let payload = match kind {
                MarkerKind::OutputEnd => parts.next().and_then(|x| x.parse::<i32>().ok()),
                _ => None,
            };
            return OscEvent::Marker(Marker { kind, payload });
        }
    }

    OscEvent::Unknown(s.to_string())
}
