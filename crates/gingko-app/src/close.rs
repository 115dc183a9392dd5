// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::fmt;

use tracing::{debug, info, warn};

use crate::{CloseDecision, EditorError, EditorResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosePhase {
    Idle,
    AwaitingDecision,
    Closing,
    Aborted,
}

impl ClosePhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingDecision => "awaiting_decision",
            Self::Closing => "closing",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for ClosePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseRequest {
    /// Nothing to lose; the process may exit.
    Closing,
    /// A decision surface must be presented.
    AwaitingDecision,
    /// A close is already pending or under way.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Closing { saved: bool },
    Aborted,
}

/// Gates process exit behind a save/discard/cancel decision when the
/// document is dirty. `Closing` is terminal. `Aborted` is reported until
/// the next command settles it back to `Idle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseCoordinator {
    phase: ClosePhase,
}

impl Default for CloseCoordinator {
    fn default() -> Self {
        Self {
            phase: ClosePhase::Idle,
        }
    }
}

impl CloseCoordinator {
    pub const fn phase(&self) -> ClosePhase {
        self.phase
    }

    pub fn is_closing(&self) -> bool {
        self.phase == ClosePhase::Closing
    }

    pub fn is_awaiting_decision(&self) -> bool {
        self.phase == ClosePhase::AwaitingDecision
    }

    /// Moves a canceled close back to `Idle`.
    pub fn settle(&mut self) {
        if self.phase == ClosePhase::Aborted {
            self.phase = ClosePhase::Idle;
            debug!("canceled close settled");
        }
    }

    pub fn request_close(&mut self, dirty: bool) -> CloseRequest {
        match self.phase {
            ClosePhase::Idle | ClosePhase::Aborted => {
                if dirty {
                    self.phase = ClosePhase::AwaitingDecision;
                    debug!("close requested with unsaved changes; awaiting decision");
                    CloseRequest::AwaitingDecision
                } else {
                    self.phase = ClosePhase::Closing;
                    info!("close requested on clean document; closing");
                    CloseRequest::Closing
                }
            }
            ClosePhase::AwaitingDecision | ClosePhase::Closing => {
                debug!(phase = %self.phase, "close request ignored");
                CloseRequest::Ignored
            }
        }
    }

    /// Applies the user's decision. `save` runs only for
    /// [`CloseDecision::Save`]; its error message becomes the
    /// `PersistenceFailure` reason and the coordinator falls back to `Idle`.
    pub fn resolve<F>(&mut self, decision: CloseDecision, save: F) -> EditorResult<Resolution>
    where
        F: FnOnce() -> Result<(), String>,
    {
        if self.phase != ClosePhase::AwaitingDecision {
            warn!(phase = %self.phase, decision = decision.as_str(), "stray close decision");
            return Err(EditorError::InvalidTransition {
                phase: self.phase,
                action: "close decision",
            });
        }

        match decision {
            CloseDecision::Discard => {
                self.phase = ClosePhase::Closing;
                info!("closing without saving");
                Ok(Resolution::Closing { saved: false })
            }
            CloseDecision::Cancel => {
                self.phase = ClosePhase::Aborted;
                info!("close canceled");
                Ok(Resolution::Aborted)
            }
            CloseDecision::Save => match save() {
                Ok(()) => {
                    self.phase = ClosePhase::Closing;
                    info!("saved; closing");
                    Ok(Resolution::Closing { saved: true })
                }
                Err(reason) => {
                    self.phase = ClosePhase::Idle;
                    warn!(%reason, "save before close failed; staying open");
                    Err(EditorError::PersistenceFailure { reason })
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CloseCoordinator, ClosePhase, CloseRequest, Resolution};
    use crate::{CloseDecision, EditorError};
    use std::cell::Cell;

    fn awaiting() -> CloseCoordinator {
        let mut coordinator = CloseCoordinator::default();
        assert_eq!(
            coordinator.request_close(true),
            CloseRequest::AwaitingDecision
        );
        coordinator
    }

    #[test]
    fn clean_close_goes_straight_to_closing() {
        let mut coordinator = CloseCoordinator::default();
        assert_eq!(coordinator.request_close(false), CloseRequest::Closing);
        assert!(coordinator.is_closing());
        assert_eq!(coordinator.request_close(true), CloseRequest::Ignored);
        assert!(coordinator.is_closing());
    }

    #[test]
    fn re_entrant_requests_are_ignored_while_awaiting() {
        let mut coordinator = awaiting();
        assert_eq!(coordinator.request_close(true), CloseRequest::Ignored);
        assert_eq!(coordinator.request_close(false), CloseRequest::Ignored);
        assert_eq!(coordinator.phase(), ClosePhase::AwaitingDecision);
    }

    #[test]
    fn discard_never_calls_save() {
        let mut coordinator = awaiting();
        let called = Cell::new(false);
        let resolution = coordinator.resolve(CloseDecision::Discard, || {
            called.set(true);
            Err("disk full".to_owned())
        });
        assert_eq!(resolution, Ok(Resolution::Closing { saved: false }));
        assert!(!called.get());
        assert!(coordinator.is_closing());
    }

    #[test]
    fn cancel_aborts_and_allows_another_attempt() {
        let mut coordinator = awaiting();
        assert_eq!(
            coordinator.resolve(CloseDecision::Cancel, || Ok(())),
            Ok(Resolution::Aborted)
        );
        assert_eq!(coordinator.phase(), ClosePhase::Aborted);
        assert_eq!(
            coordinator.request_close(true),
            CloseRequest::AwaitingDecision
        );
    }

    #[test]
    fn settle_only_leaves_aborted() {
        let mut coordinator = awaiting();
        coordinator.settle();
        assert_eq!(coordinator.phase(), ClosePhase::AwaitingDecision);

        coordinator
            .resolve(CloseDecision::Cancel, || Ok(()))
            .unwrap();
        coordinator.settle();
        assert_eq!(coordinator.phase(), ClosePhase::Idle);
    }

    #[test]
    fn save_success_closes() {
        let mut coordinator = awaiting();
        assert_eq!(
            coordinator.resolve(CloseDecision::Save, || Ok(())),
            Ok(Resolution::Closing { saved: true })
        );
        assert!(coordinator.is_closing());
    }

    #[test]
    fn save_failure_returns_to_idle() {
        let mut coordinator = awaiting();
        assert_eq!(
            coordinator.resolve(CloseDecision::Save, || Err("disk full".to_owned())),
            Err(EditorError::PersistenceFailure {
                reason: "disk full".to_owned(),
            })
        );
        assert_eq!(coordinator.phase(), ClosePhase::Idle);
    }

    #[test]
    fn decision_without_pending_close_is_invalid() {
        let mut coordinator = CloseCoordinator::default();
        assert_eq!(
            coordinator.resolve(CloseDecision::Discard, || Ok(())),
            Err(EditorError::InvalidTransition {
                phase: ClosePhase::Idle,
                action: "close decision",
            })
        );
        assert_eq!(coordinator.phase(), ClosePhase::Idle);
    }

    #[test]
    fn a_decision_resumes_the_coordinator_exactly_once() {
        let mut coordinator = awaiting();
        coordinator
            .resolve(CloseDecision::Cancel, || Ok(()))
            .unwrap();
        assert!(
            coordinator
                .resolve(CloseDecision::Discard, || Ok(()))
                .is_err()
        );
        assert!(!coordinator.is_closing());
    }
}
