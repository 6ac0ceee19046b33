//! Explicit state machine for custom-domain monitoring.
//!
//! The `businesses` row stores the state as a status column plus an attempt
//! counter. `DomainState` is the typed view of those two columns; transitions
//! are pure so they can be exercised without a database.

use serde::Serialize;

use crate::domain::entities::business::{Business, BusinessStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DomainState {
    Pending,
    Monitoring { attempts: i32 },
    Active,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainEvent {
    MonitoringStarted,
    CheckCompleted { verified: bool },
    MonitoringStopped,
}

impl DomainState {
    pub fn from_business(business: &Business) -> Self {
        match business.status {
            BusinessStatus::CnameMonitoring => DomainState::Monitoring {
                attempts: business.cname_check_attempts,
            },
            BusinessStatus::CnameActive | BusinessStatus::Active => DomainState::Active,
            BusinessStatus::CnameTimeout => DomainState::Failed,
            BusinessStatus::Pending
            | BusinessStatus::Inactive
            | BusinessStatus::Suspended
            | BusinessStatus::CnamePending => DomainState::Pending,
        }
    }

    pub fn transition(self, event: DomainEvent, max_attempts: i32) -> Self {
        match (self, event) {
            (_, DomainEvent::MonitoringStarted) => DomainState::Monitoring { attempts: 0 },
            (DomainState::Monitoring { .. }, DomainEvent::CheckCompleted { verified: true }) => {
                DomainState::Active
            }
            (DomainState::Monitoring { attempts }, DomainEvent::CheckCompleted { verified: false }) => {
                let attempts = attempts.saturating_add(1);
                if attempts >= max_attempts {
                    DomainState::Failed
                } else {
                    DomainState::Monitoring { attempts }
                }
            }
            (state, _) => state,
        }
    }

    /// Status column value for this state.
    pub fn status(&self) -> BusinessStatus {
        match self {
            DomainState::Pending => BusinessStatus::CnamePending,
            DomainState::Monitoring { .. } => BusinessStatus::CnameMonitoring,
            DomainState::Active => BusinessStatus::CnameActive,
            DomainState::Failed => BusinessStatus::CnameTimeout,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DomainState::Active | DomainState::Failed)
    }
}
