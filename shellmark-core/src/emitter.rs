use crate::marker::Marker;
use std::io::Write;

/// Writes single markers to the terminal.
///
/// Emission never fails from the caller's point of view: a closed pipe or a
/// stream that is not a terminal simply drops the marker. It is not retried,
/// since a late marker would land after prompt text it was meant to precede.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerEmitter;

impl MarkerEmitter {
    pub fn new() -> Self {
        Self
    }

    pub fn emit(&self, out: &mut dyn Write, marker: Marker) {
        tracing::trace!(%marker, kind = ?marker.kind, "emit");

        let result = out.write_all(&marker.encode()).and_then(|()| out.flush());
        if let Err(e) = result {
            tracing::trace!(error = %e, kind = ?marker.kind, "marker dropped");
        }
    }
}
