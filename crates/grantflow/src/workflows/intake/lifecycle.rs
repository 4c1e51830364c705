use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use super::domain::{ActorId, Application, ApplicationId, ApplicationStatus};
use super::repository::{ApplicationStore, NotificationDispatcher, NotificationEvent, StoreError};
use super::room::{RoomError, RoomLifecycleManager};

#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("application {application_id:?} not found")]
    ApplicationNotFound { application_id: ApplicationId },
    #[error("invalid transition from {} to {}", from.label(), to.label())]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error(transparent)]
    Room(#[from] RoomError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Validates and applies application status transitions.
///
/// Invalid transitions are rejected before any write, so a rejection
/// leaves the stored application untouched. A request equal to the
/// current status is an idempotent no-op success. Every applied
/// transition cascades synchronously into the room manager and emits a
/// status-changed notification.
pub struct ApplicationStateMachine<S, R, N> {
    store: Arc<S>,
    rooms: Arc<RoomLifecycleManager<R>>,
    notifier: Arc<N>,
}

impl<S, R, N> ApplicationStateMachine<S, R, N>
where
    S: ApplicationStore,
    R: super::repository::RoomRepository,
    N: NotificationDispatcher,
{
    pub fn new(store: Arc<S>, rooms: Arc<RoomLifecycleManager<R>>, notifier: Arc<N>) -> Self {
        Self {
            store,
            rooms,
            notifier,
        }
    }

    pub fn transition(
        &self,
        application_id: &ApplicationId,
        to: ApplicationStatus,
        actor: &ActorId,
    ) -> Result<Application, TransitionError> {
        let mut application = self
            .store
            .fetch_application(application_id)?
            .ok_or_else(|| TransitionError::ApplicationNotFound {
                application_id: application_id.clone(),
            })?;

        let from = application.status;
        if from == to {
            return Ok(application);
        }
        if !allowed(from, to) {
            return Err(TransitionError::InvalidTransition { from, to });
        }

        let now = Utc::now();
        application.status = to;
        application.updated_at = now;
        match to {
            ApplicationStatus::UnderReview => {
                application.reviewed_at = Some(now);
                application.reviewed_by = Some(actor.clone());
            }
            ApplicationStatus::Approved => {
                application.approved_at = Some(now);
                application.approved_by = Some(actor.clone());
            }
            ApplicationStatus::Rejected => {
                application.rejected_at = Some(now);
            }
            ApplicationStatus::Cancelled => {
                application.cancelled_at = Some(now);
            }
            _ => {}
        }

        self.store.update_application(application.clone())?;
        self.rooms.on_application_status_changed(&application)?;
        if let Err(err) = self.notifier.notify(NotificationEvent::ApplicationStatusChanged {
            application_id: application_id.clone(),
            from,
            to,
        }) {
            warn!(error = %err, "notification dispatch failed");
        }

        Ok(application)
    }
}

/// The transition table.
///
/// `cancelled` is reachable from every non-terminal status; `completed`
/// only closes out an approved application administratively.
fn allowed(from: ApplicationStatus, to: ApplicationStatus) -> bool {
    use ApplicationStatus::*;

    if to == Cancelled {
        return !from.is_terminal();
    }

    matches!(
        (from, to),
        (Draft, Submitted)
            | (Submitted, Pending)
            | (Pending, UnderReview)
            | (Pending, AdditionalInfoRequired)
            | (UnderReview, Approved)
            | (UnderReview, Rejected)
            | (UnderReview, AdditionalInfoRequired)
            | (AdditionalInfoRequired, UnderReview)
            | (Approved, Completed)
    )
}
