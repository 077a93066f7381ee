//! Lifecycle state machine
//!
//! Every create or delete call starts at `Idle` and walks these phases. Only
//! the edges listed in [`LifecyclePhase::can_transition_to`] are legal; any
//! phase may abort to `Failed`.

use tracing::debug;

use tkgs_common::{Error, Result};

/// Phase of a single lifecycle call
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    /// Nothing has happened yet
    Idle,
    /// Determining the cluster spec shape
    Classifying,
    /// Checking the shape's feature gate
    GateChecking,
    /// Producing the manifest
    Rendering,
    /// Writing the manifest to the output sink
    DryRunEmit,
    /// Submitting the manifest to the management plane
    Applying,
    /// Create finished (or would have, for a dry run)
    Applied,
    /// Deleting the cluster object
    Deleting,
    /// Delete finished
    Deleted,
    /// Aborted with an error
    Failed,
}

impl LifecyclePhase {
    /// Whether `next` is a legal successor of this phase
    pub fn can_transition_to(self, next: LifecyclePhase) -> bool {
        use LifecyclePhase::*;

        if next == Failed {
            return !matches!(self, Failed);
        }
        matches!(
            (self, next),
            (Idle, Classifying)
                | (Idle, Deleting)
                | (Classifying, GateChecking)
                | (GateChecking, Rendering)
                | (Rendering, DryRunEmit)
                | (Rendering, Applying)
                | (DryRunEmit, Applied)
                | (Applying, Applied)
                | (Applied, Idle)
                | (Applied, Deleting)
                | (Deleting, Deleted)
                | (Deleted, Idle)
                | (Failed, Idle)
        )
    }

    /// Whether a call ends in this phase
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Applied | Self::Deleted | Self::Failed)
    }
}

impl std::fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "Idle",
            Self::Classifying => "Classifying",
            Self::GateChecking => "GateChecking",
            Self::Rendering => "Rendering",
            Self::DryRunEmit => "DryRunEmit",
            Self::Applying => "Applying",
            Self::Applied => "Applied",
            Self::Deleting => "Deleting",
            Self::Deleted => "Deleted",
            Self::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// Tracks the phase of one call and logs each transition
#[derive(Debug)]
pub(crate) struct PhaseTracker<'a> {
    phase: LifecyclePhase,
    cluster: &'a str,
    namespace: &'a str,
}

impl<'a> PhaseTracker<'a> {
    pub(crate) fn new(cluster: &'a str, namespace: &'a str) -> Self {
        Self {
            phase: LifecyclePhase::Idle,
            cluster,
            namespace,
        }
    }

    pub(crate) fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub(crate) fn advance(&mut self, next: LifecyclePhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(Error::internal_with_context(
                "lifecycle",
                format!("illegal phase transition {} -> {}", self.phase, next),
            ));
        }
        debug!(
            cluster = %self.cluster,
            namespace = %self.namespace,
            from = %self.phase,
            to = %next,
            "phase transition"
        );
        self.phase = next;
        Ok(())
    }

    /// Move to `Failed`, recording the error
    pub(crate) fn fail(&mut self, error: &Error) {
        debug!(
            cluster = %self.cluster,
            namespace = %self.namespace,
            from = %self.phase,
            error = %error,
            "phase transition to Failed"
        );
        self.phase = LifecyclePhase::Failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecyclePhase::*;

    const ALL: [LifecyclePhase; 10] = [
        Idle,
        Classifying,
        GateChecking,
        Rendering,
        DryRunEmit,
        Applying,
        Applied,
        Deleting,
        Deleted,
        Failed,
    ];

    #[test]
    fn create_paths_are_legal() {
        let apply = [Idle, Classifying, GateChecking, Rendering, Applying, Applied, Idle];
        let dry_run = [Idle, Classifying, GateChecking, Rendering, DryRunEmit, Applied];
        for path in [&apply[..], &dry_run[..]] {
            for pair in path.windows(2) {
                assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
            }
        }
    }

    #[test]
    fn delete_paths_are_legal() {
        assert!(Idle.can_transition_to(Deleting));
        assert!(Applied.can_transition_to(Deleting));
        assert!(Deleting.can_transition_to(Deleted));
        assert!(Deleted.can_transition_to(Idle));
    }

    #[test]
    fn every_active_phase_can_fail() {
        for phase in ALL {
            assert_eq!(phase.can_transition_to(Failed), phase != Failed, "{phase}");
        }
        assert!(Failed.can_transition_to(Idle));
    }

    #[test]
    fn gate_check_cannot_be_skipped() {
        assert!(!Classifying.can_transition_to(Rendering));
        assert!(!Idle.can_transition_to(Applying));
        assert!(!GateChecking.can_transition_to(Applying));
        assert!(!DryRunEmit.can_transition_to(Applying));
        assert!(!Deleted.can_transition_to(Applied));
    }

    #[test]
    fn terminal_phases() {
        let terminal: Vec<_> = ALL.into_iter().filter(|p| p.is_terminal()).collect();
        assert_eq!(terminal, vec![Applied, Deleted, Failed]);
    }

    #[test]
    fn tracker_rejects_illegal_transitions() {
        let mut tracker = PhaseTracker::new("c1", "ns1");
        tracker.advance(Classifying).unwrap();
        let err = tracker.advance(Applying).unwrap_err();
        assert_eq!(err.context(), Some("lifecycle"));
        assert_eq!(tracker.phase(), Classifying);

        tracker.fail(&err);
        assert_eq!(tracker.phase(), Failed);
    }
}
