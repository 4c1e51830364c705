//! Consultant assignment and application lifecycle engine.
//!
//! Four cooperating components sit behind the [`IntakeService`] facade:
//! the [`matcher::ConsultantMatcher`] picks the least-loaded eligible
//! consultant for a sector, the [`ledger::AssignmentLedger`] keeps the
//! append-only record of who holds which application, the
//! [`lifecycle::ApplicationStateMachine`] validates status transitions,
//! and the [`room::RoomLifecycleManager`] keeps the per-application
//! collaboration room in step with both.

pub mod config;
pub mod domain;
pub mod ledger;
pub mod lifecycle;
pub mod matcher;
pub mod repository;
pub mod room;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use config::IntakeConfig;
pub use domain::{
    ActivityKind, ActivityMeta, ActorId, Application, ApplicationDraft, ApplicationId,
    ApplicationPriority, ApplicationRoom, ApplicationStatus, AssignmentEntryId,
    AssignmentLogEntry, AssignmentType, Consultant, ConsultantId, RoomId, RoomNote, RoomSettings,
    RoomStats, RoomStatus, SectorId, UserProfile, UserRole,
};
pub use ledger::{AssignmentLedger, LedgerError};
pub use lifecycle::{ApplicationStateMachine, TransitionError};
pub use matcher::{CandidateScore, ConsultantMatcher, MatchError, MatchOutcome};
pub use repository::{
    ApplicationStatusView, ApplicationStore, AssignmentCommit, ConsultantDirectory,
    DirectoryError, EntryClosure, NotificationDispatcher, NotificationEvent, NotifyError,
    RoomRepository, StoreError,
};
pub use room::{RoomError, RoomLifecycleManager};
pub use router::intake_router;
pub use service::{IntakeOutcome, IntakeService, IntakeServiceError};
