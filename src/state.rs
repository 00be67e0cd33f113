//! Finite state of one tool pipeline.

use serde::Serialize;
use std::fmt;

/// Where a pipeline instance currently is.
///
/// ```text
/// Idle ──acquire──▶ Previewing ──submit──▶ Submitting ──▶ Succeeded
///   ▲                   ▲                       │
///   │                   └──────retry────── Failed ◀──┘
///   └───────────── reset (from any state) ─────────────
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    Idle,
    Previewing,
    Submitting,
    Succeeded,
    Failed,
}

impl PipelineState {
    /// Whether a resolved result is on display.
    pub fn is_resolved(self) -> bool {
        matches!(self, PipelineState::Succeeded | PipelineState::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Idle => "idle",
            PipelineState::Previewing => "previewing",
            PipelineState::Submitting => "submitting",
            PipelineState::Succeeded => "succeeded",
            PipelineState::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_idle() {
        assert_eq!(PipelineState::default(), PipelineState::Idle);
    }

    #[test]
    fn display_and_serde_agree() {
        for s in [
            PipelineState::Idle,
            PipelineState::Previewing,
            PipelineState::Submitting,
            PipelineState::Succeeded,
            PipelineState::Failed,
        ] {
            let json = serde_json::to_string(&s).unwrap();
            assert_eq!(json, format!("\"{s}\""));
        }
    }
}
