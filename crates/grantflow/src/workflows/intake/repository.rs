use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    Application, ApplicationId, ApplicationRoom, ApplicationStatus, AssignmentEntryId,
    AssignmentLogEntry, AssignmentType, ActorId, Consultant, ConsultantId, SectorId, UserProfile,
};

/// Error enumeration for persistent-store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Duplicate insert, or a compare-and-swap commit lost the race.
    #[error("store conflict")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Closure stamp applied to the currently open ledger entry inside a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryClosure {
    /// The entry the caller observed as open; the commit fails with
    /// [`StoreError::Conflict`] if it is no longer the open one.
    pub entry_id: AssignmentEntryId,
    pub unassigned_at: DateTime<Utc>,
    pub unassigned_by: Option<ActorId>,
    pub reason: String,
}

/// One atomic close-then-open unit of work against the assignment ledger.
///
/// The store must apply all three parts indivisibly: verify and close the
/// expected open entry (`close`), append the new entry (`open`), and write
/// the application projection. `close: None` asserts that no entry is
/// currently open; `open: None` is a release.
#[derive(Debug, Clone)]
pub struct AssignmentCommit {
    pub application_id: ApplicationId,
    pub close: Option<EntryClosure>,
    pub open: Option<AssignmentLogEntry>,
    pub application: Application,
}

/// Transactional storage for applications and their assignment ledger.
pub trait ApplicationStore: Send + Sync {
    fn insert_application(&self, application: Application) -> Result<Application, StoreError>;
    fn update_application(&self, application: Application) -> Result<(), StoreError>;
    fn fetch_application(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError>;
    /// Derived load: open-status applications currently assigned to the consultant.
    fn count_open_assigned(&self, consultant: &ConsultantId) -> Result<u32, StoreError>;
    fn open_assignment(&self, id: &ApplicationId)
        -> Result<Option<AssignmentLogEntry>, StoreError>;
    fn assignment_history(
        &self,
        id: &ApplicationId,
    ) -> Result<Vec<AssignmentLogEntry>, StoreError>;
    /// Apply a close-then-open ledger commit atomically, returning the
    /// newly opened entry when one was part of the commit.
    fn commit_assignment(
        &self,
        commit: AssignmentCommit,
    ) -> Result<Option<AssignmentLogEntry>, StoreError>;
}

/// Storage for collaboration rooms, keyed by their application.
pub trait RoomRepository: Send + Sync {
    fn insert_room(&self, room: ApplicationRoom) -> Result<ApplicationRoom, StoreError>;
    fn fetch_room(&self, application_id: &ApplicationId)
        -> Result<Option<ApplicationRoom>, StoreError>;
    fn update_room(&self, room: ApplicationRoom) -> Result<(), StoreError>;
    /// Rooms eligible for the auto-archive sweep.
    fn completed_rooms(&self) -> Result<Vec<ApplicationRoom>, StoreError>;
}

/// Error enumeration for consultant-directory failures.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Read-only view of the platform's user and consultant registry.
pub trait ConsultantDirectory: Send + Sync {
    fn list_consultants(
        &self,
        sector: &SectorId,
        active_only: bool,
    ) -> Result<Vec<Consultant>, DirectoryError>;
    fn get_user(&self, user: &ActorId) -> Result<Option<UserProfile>, DirectoryError>;
}

/// Error enumeration for the notification side-channel.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Events handed to the external notification dispatcher.
///
/// Delivery is fire-and-forget: a failed dispatch never rolls back the
/// state change that produced the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotificationEvent {
    ConsultantAssigned {
        application_id: ApplicationId,
        consultant_id: ConsultantId,
        assignment_type: AssignmentType,
    },
    ConsultantReassigned {
        application_id: ApplicationId,
        previous_consultant: ConsultantId,
        consultant_id: ConsultantId,
    },
    ConsultantReleased {
        application_id: ApplicationId,
        consultant_id: ConsultantId,
    },
    ApplicationStatusChanged {
        application_id: ApplicationId,
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
}

/// Trait describing the outbound notification hook (e-mail, in-app, ...).
pub trait NotificationDispatcher: Send + Sync {
    fn notify(&self, event: NotificationEvent) -> Result<(), NotifyError>;
}

/// Sanitized representation of an application's exposed state.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub status: &'static str,
    pub priority: &'static str,
    pub sector: SectorId,
    pub assigned_consultant: Option<ConsultantId>,
    pub assignment_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_status: Option<&'static str>,
}

impl ApplicationStatusView {
    pub fn from_parts(application: &Application, room: Option<&ApplicationRoom>) -> Self {
        Self {
            application_id: application.id.clone(),
            status: application.status.label(),
            priority: application.priority.label(),
            sector: application.sector.clone(),
            assigned_consultant: application.assigned_consultant.clone(),
            assignment_type: application
                .consultant_assignment_type
                .map(AssignmentType::label),
            room_status: room.map(|room| room.status.label()),
        }
    }
}
