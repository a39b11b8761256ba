//! Scan checkpoint and cutoff policy

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version of the tag extraction logic. Bump when extraction or matching
/// changes in a way that makes previously recorded scan times meaningless;
/// the next run will then revisit every item.
pub const CURRENT_SCANNER_VERSION: i64 = 1;

/// Progress marker persisted between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCheckpoint {
    pub scanner_version: i64,
    pub last_complete_scan_at: DateTime<Utc>,
}

impl ScanCheckpoint {
    /// Checkpoint for a catalog that has never been scanned.
    pub fn initial() -> Self {
        Self {
            scanner_version: 0,
            last_complete_scan_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// Checkpoint to persist after a run completes at `completed_at`.
    ///
    /// The timestamp never moves backwards, even if the wall clock did.
    pub fn advanced(&self, current_version: i64, completed_at: DateTime<Utc>) -> Self {
        Self {
            scanner_version: current_version,
            last_complete_scan_at: self.last_complete_scan_at.max(completed_at),
        }
    }
}

impl Default for ScanCheckpoint {
    fn default() -> Self {
        Self::initial()
    }
}

/// Which items a run should visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cutoff {
    /// Items last scanned before this instant (or never) are eligible.
    pub timestamp: DateTime<Utc>,
    pub forcing_full_rescan: bool,
}

/// Decide the selection cutoff for a run.
pub fn compute_cutoff(current_version: i64, checkpoint: &ScanCheckpoint) -> Cutoff {
    if checkpoint.scanner_version != current_version {
        Cutoff {
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            forcing_full_rescan: true,
        }
    } else {
        Cutoff {
            timestamp: checkpoint.last_complete_scan_at,
            forcing_full_rescan: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn checkpoint(version: i64, millis: i64) -> ScanCheckpoint {
        ScanCheckpoint {
            scanner_version: version,
            last_complete_scan_at: Utc.timestamp_millis_opt(millis).unwrap(),
        }
    }

    #[test]
    fn test_matching_version_uses_last_scan_time() {
        let cp = checkpoint(3, 1_000);
        let cutoff = compute_cutoff(3, &cp);
        assert_eq!(cutoff.timestamp, cp.last_complete_scan_at);
        assert!(!cutoff.forcing_full_rescan);
    }

    #[test]
    fn test_version_bump_forces_full_rescan() {
        let cutoff = compute_cutoff(2, &checkpoint(1, 1_000));
        assert_eq!(cutoff.timestamp, DateTime::<Utc>::UNIX_EPOCH);
        assert!(cutoff.forcing_full_rescan);
    }

    #[test]
    fn test_downgrade_also_forces_full_rescan() {
        let cutoff = compute_cutoff(1, &checkpoint(2, 1_000));
        assert!(cutoff.forcing_full_rescan);
    }

    #[test]
    fn test_initial_checkpoint_forces_full_rescan() {
        let cutoff = compute_cutoff(CURRENT_SCANNER_VERSION, &ScanCheckpoint::initial());
        assert!(cutoff.forcing_full_rescan);
        assert_eq!(cutoff.timestamp, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_advanced_never_moves_backwards() {
        let cp = checkpoint(1, 5_000);
        let earlier = Utc.timestamp_millis_opt(4_000).unwrap();
        let later = Utc.timestamp_millis_opt(6_000).unwrap();

        assert_eq!(cp.advanced(2, earlier).last_complete_scan_at, cp.last_complete_scan_at);
        assert_eq!(cp.advanced(2, earlier).scanner_version, 2);
        assert_eq!(cp.advanced(1, later).last_complete_scan_at, later);
    }
}
