use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::config::IntakeConfig;
use super::domain::{
    ActivityKind, ActivityMeta, ActorId, Application, ApplicationDraft, ApplicationId,
    ApplicationPriority, ApplicationRoom, ApplicationStatus, AssignmentLogEntry, AssignmentType,
    ConsultantId,
};
use super::ledger::{AssignmentLedger, LedgerError};
use super::lifecycle::{ApplicationStateMachine, TransitionError};
use super::matcher::{ConsultantMatcher, MatchError, MatchOutcome};
use super::repository::{
    ApplicationStatusView, ApplicationStore, ConsultantDirectory, DirectoryError,
    NotificationDispatcher, RoomRepository, StoreError,
};
use super::room::{RoomError, RoomLifecycleManager};

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

/// Result of the combined create-and-assign entry point.
#[derive(Debug, Clone)]
pub struct IntakeOutcome {
    pub application: Application,
    pub room: ApplicationRoom,
    pub assignment: Option<AssignmentLogEntry>,
    pub no_match_reason: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum IntakeServiceError {
    #[error("owner {owner:?} is not a registered user")]
    UnknownOwner { owner: ActorId },
    #[error("application {application_id:?} not found")]
    ApplicationNotFound { application_id: ApplicationId },
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Room(#[from] RoomError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Facade composing the matcher, ledger, state machine, and room manager.
///
/// This is the only surface the surrounding request layer calls; the
/// components behind it never reach around each other.
pub struct IntakeService<S, R, D, N> {
    store: Arc<S>,
    directory: Arc<D>,
    matcher: ConsultantMatcher<D, S>,
    ledger: AssignmentLedger<S, N>,
    lifecycle: ApplicationStateMachine<S, R, N>,
    rooms: Arc<RoomLifecycleManager<R>>,
}

impl<S, R, D, N> IntakeService<S, R, D, N>
where
    S: ApplicationStore + 'static,
    R: RoomRepository + 'static,
    D: ConsultantDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    pub fn new(
        store: Arc<S>,
        rooms: Arc<R>,
        directory: Arc<D>,
        notifier: Arc<N>,
        config: IntakeConfig,
    ) -> Self {
        let room_manager = Arc::new(RoomLifecycleManager::new(rooms, config.room_settings()));
        Self {
            matcher: ConsultantMatcher::new(
                directory.clone(),
                store.clone(),
                config.default_consultant_capacity,
            ),
            ledger: AssignmentLedger::new(store.clone(), notifier.clone()),
            lifecycle: ApplicationStateMachine::new(store.clone(), room_manager.clone(), notifier),
            rooms: room_manager,
            store,
            directory,
        }
    }

    /// Create an application, open its room, and auto-assign a consultant
    /// from the owner's sector. A sector without eligible consultants
    /// leaves the application unassigned for manual routing; it never
    /// fails the intake.
    pub fn create_application(
        &self,
        owner: ActorId,
        draft: ApplicationDraft,
    ) -> Result<IntakeOutcome, IntakeServiceError> {
        let profile = self
            .directory
            .get_user(&owner)?
            .ok_or_else(|| IntakeServiceError::UnknownOwner {
                owner: owner.clone(),
            })?;

        let now = Utc::now();
        let application = Application {
            id: next_application_id(),
            owner,
            sector: profile.sector,
            title: draft.title,
            summary: draft.summary,
            requested_amount: draft.requested_amount,
            status: ApplicationStatus::Pending,
            priority: draft.priority.unwrap_or_default(),
            assigned_consultant: None,
            consultant_assigned_at: None,
            consultant_assignment_type: None,
            consultant_rating: None,
            consultant_notes: None,
            submitted_at: now,
            reviewed_at: None,
            reviewed_by: None,
            approved_at: None,
            approved_by: None,
            rejected_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        };

        let application = self.store.insert_application(application)?;
        let room = self.rooms.create_for_application(&application)?;

        let (assignment, no_match_reason) =
            match self.matcher.match_consultant(&application.sector)? {
                MatchOutcome::Selected { consultant, .. } => {
                    let entry = self.ledger.assign(
                        &application.id,
                        consultant.id,
                        None,
                        AssignmentType::Automatic,
                        "matched by load-balanced sector assignment",
                    )?;
                    (Some(entry), None)
                }
                MatchOutcome::NoMatch { reason } => {
                    warn!(
                        application = application.id.0.as_str(),
                        sector = application.sector.0.as_str(),
                        reason = reason.as_str(),
                        "application left unassigned"
                    );
                    (None, Some(reason))
                }
            };

        let application = self
            .store
            .fetch_application(&application.id)?
            .ok_or(StoreError::NotFound)?;

        info!(
            application = application.id.0.as_str(),
            assigned = assignment.is_some(),
            "application submitted"
        );

        Ok(IntakeOutcome {
            application,
            room,
            assignment,
            no_match_reason,
        })
    }

    pub fn transition_application(
        &self,
        application_id: &ApplicationId,
        to: ApplicationStatus,
        actor: &ActorId,
    ) -> Result<Application, IntakeServiceError> {
        Ok(self.lifecycle.transition(application_id, to, actor)?)
    }

    pub fn reassign_consultant(
        &self,
        application_id: &ApplicationId,
        new_consultant: ConsultantId,
        actor: ActorId,
        reason: &str,
    ) -> Result<AssignmentLogEntry, IntakeServiceError> {
        Ok(self
            .ledger
            .reassign(application_id, new_consultant, actor, reason)?)
    }

    pub fn release_consultant(
        &self,
        application_id: &ApplicationId,
        actor: ActorId,
        reason: &str,
    ) -> Result<(), IntakeServiceError> {
        Ok(self.ledger.release(application_id, actor, reason)?)
    }

    pub fn record_room_activity(
        &self,
        application_id: &ApplicationId,
        kind: ActivityKind,
        meta: ActivityMeta,
    ) -> Result<ApplicationRoom, IntakeServiceError> {
        Ok(self.rooms.record_activity(application_id, kind, meta)?)
    }

    pub fn set_room_priority(
        &self,
        application_id: &ApplicationId,
        priority: ApplicationPriority,
        reason: &str,
    ) -> Result<ApplicationRoom, IntakeServiceError> {
        Ok(self.rooms.set_priority(application_id, priority, reason)?)
    }

    pub fn add_consultant_note(
        &self,
        application_id: &ApplicationId,
        note: &str,
        actor: ActorId,
    ) -> Result<ApplicationRoom, IntakeServiceError> {
        Ok(self.rooms.add_consultant_note(application_id, note, actor)?)
    }

    /// Consultant feedback stored on the application itself.
    pub fn set_consultant_feedback(
        &self,
        application_id: &ApplicationId,
        rating: Option<u8>,
        notes: Option<String>,
    ) -> Result<Application, IntakeServiceError> {
        let mut application = self.fetch_required(application_id)?;
        application.consultant_rating = rating;
        application.consultant_notes = notes;
        application.updated_at = Utc::now();
        self.store.update_application(application.clone())?;
        Ok(application)
    }

    /// Archive completed rooms past their inactivity horizon.
    pub fn archive_idle_rooms(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ApplicationId>, IntakeServiceError> {
        Ok(self.rooms.sweep_auto_archive(now)?)
    }

    pub fn application_status(
        &self,
        application_id: &ApplicationId,
    ) -> Result<ApplicationStatusView, IntakeServiceError> {
        let application = self.fetch_required(application_id)?;
        let room = self.rooms.fetch(application_id)?;
        Ok(ApplicationStatusView::from_parts(&application, room.as_ref()))
    }

    pub fn assignment_history(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<AssignmentLogEntry>, IntakeServiceError> {
        Ok(self.ledger.history(application_id)?)
    }

    pub fn current_assignee(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<ConsultantId>, IntakeServiceError> {
        Ok(self.ledger.current_assignee(application_id)?)
    }

    fn fetch_required(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Application, IntakeServiceError> {
        self.store
            .fetch_application(application_id)?
            .ok_or_else(|| IntakeServiceError::ApplicationNotFound {
                application_id: application_id.clone(),
            })
    }
}
