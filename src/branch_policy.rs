//! BranchPolicy (C9, §4.9) — classifies a ContextPacket into a branch.

use crate::config::{Mode, ThresholdsConfig};
use crate::contracts::{ActionTaken, ContextPacket};

pub struct BranchPolicy;

impl BranchPolicy {
    /// Pure function of the packet, mode and thresholds — same inputs
    /// always yield the same branch (§8 property 5: branch determinism).
    /// `force_branch` lets tests and the Planner's forced-branch API (§4.9)
    /// bypass classification entirely.
    pub fn classify(
        packet: &ContextPacket,
        mode: Mode,
        thresholds: &ThresholdsConfig,
        force_branch: Option<ActionTaken>,
    ) -> ActionTaken {
        if let Some(forced) = force_branch {
            return forced;
        }

        let has_candidates = !packet.candidates.is_empty();
        let has_failures = !packet.summary.providers_failed.is_empty();
        let top_confidence = packet.summary.top_confidence;

        let base = if has_candidates && top_confidence >= thresholds.proceed {
            ActionTaken::Proceed
        } else if has_candidates && top_confidence >= thresholds.low_confidence {
            ActionTaken::LowConfidence
        } else if !has_candidates && !has_failures {
            ActionTaken::Empty
        } else if !has_candidates && has_failures {
            ActionTaken::Error
        } else {
            // Candidates present but below `low_confidence`: the spec's
            // boundary table (§8 property 6) treats this the same as the
            // no-candidates case, keyed on whether a provider failed.
            if has_failures {
                ActionTaken::Error
            } else {
                ActionTaken::Empty
            }
        };

        if mode == Mode::Accurate && matches!(base, ActionTaken::LowConfidence | ActionTaken::Empty) {
            ActionTaken::Escalate
        } else {
            base
        }
    }
}
