use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{
    ActorId, ApplicationId, AssignmentEntryId, AssignmentLogEntry, AssignmentType, ConsultantId,
};
use super::repository::{
    ApplicationStore, AssignmentCommit, EntryClosure, NotificationDispatcher, NotificationEvent,
    StoreError,
};

static ENTRY_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_entry_id() -> AssignmentEntryId {
    let id = ENTRY_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AssignmentEntryId(format!("asg-{id:06}"))
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("application {application_id:?} not found")]
    ApplicationNotFound { application_id: ApplicationId },
    #[error("application {application_id:?} is closed and cannot be assigned")]
    ApplicationClosed { application_id: ApplicationId },
    #[error("no consultant is assigned to application {application_id:?}")]
    NothingAssigned { application_id: ApplicationId },
    #[error("concurrent assignment detected for application {application_id:?}")]
    ConcurrentAssignment { application_id: ApplicationId },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Append-only record of who holds which application.
///
/// Every mutation runs as one close-then-open commit against the store so
/// the at-most-one-open-entry invariant survives concurrent writers. A
/// commit that loses the race is retried once with fresh state; the second
/// loss surfaces as [`LedgerError::ConcurrentAssignment`]
/// (first-committer-wins).
pub struct AssignmentLedger<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
}

impl<S, N> AssignmentLedger<S, N>
where
    S: ApplicationStore,
    N: NotificationDispatcher,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>) -> Self {
        Self { store, notifier }
    }

    /// Assign a consultant. An existing open entry makes this a
    /// reassignment: the old entry is closed in the same commit and
    /// recorded as `previous_consultant` on the new one.
    pub fn assign(
        &self,
        application_id: &ApplicationId,
        consultant_id: ConsultantId,
        assigned_by: Option<ActorId>,
        assignment_type: AssignmentType,
        reason: &str,
    ) -> Result<AssignmentLogEntry, LedgerError> {
        let entry = self.commit_with_retry(
            application_id,
            Some((consultant_id, assignment_type)),
            assigned_by,
            reason,
        )?;
        // commit_with_retry always returns an entry on the assign path
        entry.ok_or(LedgerError::Store(StoreError::NotFound))
    }

    pub fn reassign(
        &self,
        application_id: &ApplicationId,
        new_consultant: ConsultantId,
        actor: ActorId,
        reason: &str,
    ) -> Result<AssignmentLogEntry, LedgerError> {
        self.assign(
            application_id,
            new_consultant,
            Some(actor),
            AssignmentType::Manual,
            reason,
        )
    }

    /// Close the open entry without opening a new one.
    pub fn release(
        &self,
        application_id: &ApplicationId,
        actor: ActorId,
        reason: &str,
    ) -> Result<(), LedgerError> {
        self.commit_with_retry(application_id, None, Some(actor), reason)?;
        Ok(())
    }

    /// The consultant named by the ledger's open entry, if any.
    pub fn current_assignee(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<ConsultantId>, LedgerError> {
        Ok(self
            .store
            .open_assignment(application_id)?
            .map(|entry| entry.consultant_id))
    }

    pub fn history(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<AssignmentLogEntry>, LedgerError> {
        Ok(self.store.assignment_history(application_id)?)
    }

    fn commit_with_retry(
        &self,
        application_id: &ApplicationId,
        next: Option<(ConsultantId, AssignmentType)>,
        actor: Option<ActorId>,
        reason: &str,
    ) -> Result<Option<AssignmentLogEntry>, LedgerError> {
        for attempt in 0..2 {
            match self.try_commit(application_id, next.clone(), actor.clone(), reason) {
                Err(LedgerError::Store(StoreError::Conflict)) => {
                    if attempt == 0 {
                        warn!(
                            application = application_id.0.as_str(),
                            "assignment commit lost the race, retrying with fresh state"
                        );
                        continue;
                    }
                    return Err(LedgerError::ConcurrentAssignment {
                        application_id: application_id.clone(),
                    });
                }
                other => return other,
            }
        }
        Err(LedgerError::ConcurrentAssignment {
            application_id: application_id.clone(),
        })
    }

    fn try_commit(
        &self,
        application_id: &ApplicationId,
        next: Option<(ConsultantId, AssignmentType)>,
        actor: Option<ActorId>,
        reason: &str,
    ) -> Result<Option<AssignmentLogEntry>, LedgerError> {
        let mut application = self
            .store
            .fetch_application(application_id)?
            .ok_or_else(|| LedgerError::ApplicationNotFound {
                application_id: application_id.clone(),
            })?;

        if next.is_some() && application.status.is_terminal() {
            return Err(LedgerError::ApplicationClosed {
                application_id: application_id.clone(),
            });
        }

        let open = self.store.open_assignment(application_id)?;
        if next.is_none() && open.is_none() {
            return Err(LedgerError::NothingAssigned {
                application_id: application_id.clone(),
            });
        }

        let now = Utc::now();
        let close = open.as_ref().map(|entry| EntryClosure {
            entry_id: entry.id.clone(),
            unassigned_at: now,
            unassigned_by: actor.clone(),
            reason: reason.to_string(),
        });
        let previous = open.as_ref().map(|entry| entry.consultant_id.clone());

        let new_entry = next.map(|(consultant_id, assignment_type)| AssignmentLogEntry {
            id: next_entry_id(),
            application_id: application_id.clone(),
            consultant_id,
            assigned_by: actor.clone(),
            assignment_type,
            reason: reason.to_string(),
            sector_at_assignment: application.sector.clone(),
            previous_consultant: previous.clone(),
            assigned_at: now,
            unassigned_at: None,
            unassigned_by: None,
            unassignment_reason: None,
        });

        match &new_entry {
            Some(entry) => {
                application.assigned_consultant = Some(entry.consultant_id.clone());
                application.consultant_assigned_at = Some(now);
                application.consultant_assignment_type = Some(entry.assignment_type);
            }
            None => {
                application.assigned_consultant = None;
                application.consultant_assigned_at = None;
                application.consultant_assignment_type = None;
            }
        }
        application.updated_at = now;

        let committed = self.store.commit_assignment(AssignmentCommit {
            application_id: application_id.clone(),
            close,
            open: new_entry,
            application,
        })?;

        match (&committed, previous) {
            (Some(entry), Some(previous_consultant)) => {
                info!(
                    application = application_id.0.as_str(),
                    consultant = entry.consultant_id.0.as_str(),
                    "consultant reassigned"
                );
                self.dispatch(NotificationEvent::ConsultantReassigned {
                    application_id: application_id.clone(),
                    previous_consultant,
                    consultant_id: entry.consultant_id.clone(),
                });
            }
            (Some(entry), None) => {
                info!(
                    application = application_id.0.as_str(),
                    consultant = entry.consultant_id.0.as_str(),
                    "consultant assigned"
                );
                self.dispatch(NotificationEvent::ConsultantAssigned {
                    application_id: application_id.clone(),
                    consultant_id: entry.consultant_id.clone(),
                    assignment_type: entry.assignment_type,
                });
            }
            (None, Some(previous_consultant)) => {
                info!(
                    application = application_id.0.as_str(),
                    consultant = previous_consultant.0.as_str(),
                    "consultant released"
                );
                self.dispatch(NotificationEvent::ConsultantReleased {
                    application_id: application_id.clone(),
                    consultant_id: previous_consultant,
                });
            }
            (None, None) => {}
        }

        Ok(committed)
    }

    fn dispatch(&self, event: NotificationEvent) {
        if let Err(err) = self.notifier.notify(event) {
            warn!(error = %err, "notification dispatch failed");
        }
    }
}
