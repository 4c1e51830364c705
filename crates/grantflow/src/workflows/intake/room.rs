use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use super::domain::{
    ActivityKind, ActivityMeta, ActorId, Application, ApplicationId, ApplicationPriority,
    ApplicationRoom, ApplicationStatus, RoomId, RoomNote, RoomSettings, RoomStats, RoomStatus,
};
use super::repository::{RoomRepository, StoreError};

static ROOM_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_room_id() -> RoomId {
    let id = ROOM_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RoomId(format!("room-{id:06}"))
}

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("no room exists for application {application_id:?}")]
    NotFound { application_id: ApplicationId },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Owns the one-to-one collaboration room per application.
///
/// Rooms are created only from the intake path (directly or through the
/// status cascade when an application first reaches submitted/pending);
/// every other operation on a missing room reports [`RoomError::NotFound`]
/// rather than creating one.
pub struct RoomLifecycleManager<R> {
    rooms: Arc<R>,
    defaults: RoomSettings,
}

impl<R> RoomLifecycleManager<R>
where
    R: RoomRepository,
{
    pub fn new(rooms: Arc<R>, defaults: RoomSettings) -> Self {
        Self { rooms, defaults }
    }

    /// Create (or return the already existing) room for an application.
    pub fn create_for_application(
        &self,
        application: &Application,
    ) -> Result<ApplicationRoom, RoomError> {
        if let Some(existing) = self.rooms.fetch_room(&application.id)? {
            return Ok(existing);
        }

        let room = ApplicationRoom {
            id: next_room_id(),
            application_id: application.id.clone(),
            status: RoomStatus::Active,
            priority: application.priority,
            last_activity_at: Utc::now(),
            settings: self.defaults.clone(),
            stats: RoomStats::default(),
            notes: Vec::new(),
        };
        Ok(self.rooms.insert_room(room)?)
    }

    /// Mirror an application status change into the room.
    ///
    /// `under_review` maps to `under_review`; approval, rejection, and
    /// cancellation map to `completed`; every other status leaves the room
    /// status untouched. Activity is stamped either way, so the mapping is
    /// idempotent under redelivery.
    pub fn on_application_status_changed(
        &self,
        application: &Application,
    ) -> Result<ApplicationRoom, RoomError> {
        let mut room = match self.rooms.fetch_room(&application.id)? {
            Some(room) => room,
            None if matches!(
                application.status,
                ApplicationStatus::Submitted | ApplicationStatus::Pending
            ) =>
            {
                return self.create_for_application(application);
            }
            None => {
                return Err(RoomError::NotFound {
                    application_id: application.id.clone(),
                })
            }
        };

        match application.status {
            ApplicationStatus::UnderReview => room.status = RoomStatus::UnderReview,
            ApplicationStatus::Approved
            | ApplicationStatus::Rejected
            | ApplicationStatus::Cancelled => room.status = RoomStatus::Completed,
            _ => {}
        }
        room.last_activity_at = Utc::now();

        self.rooms.update_room(room.clone())?;
        Ok(room)
    }

    /// Record a message or document event and refresh the activity stats.
    pub fn record_activity(
        &self,
        application_id: &ApplicationId,
        kind: ActivityKind,
        meta: ActivityMeta,
    ) -> Result<ApplicationRoom, RoomError> {
        let mut room = self.fetch_required(application_id)?;
        let at = meta.occurred_at.unwrap_or_else(Utc::now);

        match kind {
            ActivityKind::Message => room.stats.message_count += 1,
            ActivityKind::Document => room.stats.document_count += 1,
        }

        let opposite = if meta.is_consultant {
            room.stats.last_user_activity
        } else {
            room.stats.last_consultant_activity
        };
        if let Some(previous) = opposite {
            let delta = (at - previous).num_seconds();
            room.stats.response_time_seconds = Some(delta.max(0));
        }

        if meta.is_consultant {
            room.stats.last_consultant_activity = Some(at);
        } else {
            room.stats.last_user_activity = Some(at);
        }
        room.last_activity_at = at;

        self.rooms.update_room(room.clone())?;
        Ok(room)
    }

    /// Unconditional priority write; the reason only feeds the audit log.
    pub fn set_priority(
        &self,
        application_id: &ApplicationId,
        priority: ApplicationPriority,
        reason: &str,
    ) -> Result<ApplicationRoom, RoomError> {
        let mut room = self.fetch_required(application_id)?;
        info!(
            application = application_id.0.as_str(),
            priority = priority.label(),
            reason = reason,
            "room priority updated"
        );
        room.priority = priority;
        room.last_activity_at = Utc::now();
        self.rooms.update_room(room.clone())?;
        Ok(room)
    }

    /// Append a consultant note; status is untouched.
    pub fn add_consultant_note(
        &self,
        application_id: &ApplicationId,
        note: &str,
        actor: ActorId,
    ) -> Result<ApplicationRoom, RoomError> {
        let mut room = self.fetch_required(application_id)?;
        room.notes.push(RoomNote {
            note: note.to_string(),
            actor,
            recorded_at: Utc::now(),
        });
        self.rooms.update_room(room.clone())?;
        Ok(room)
    }

    /// Manual archive.
    pub fn archive(&self, application_id: &ApplicationId) -> Result<ApplicationRoom, RoomError> {
        let mut room = self.fetch_required(application_id)?;
        room.status = RoomStatus::Archived;
        room.last_activity_at = Utc::now();
        self.rooms.update_room(room.clone())?;
        Ok(room)
    }

    /// Archive completed rooms whose last activity is older than their
    /// auto-archive horizon. Invoked by the external scheduler; there is
    /// no sweep loop in-process.
    pub fn sweep_auto_archive(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ApplicationId>, RoomError> {
        let mut archived = Vec::new();
        for mut room in self.rooms.completed_rooms()? {
            let horizon = Duration::days(i64::from(room.settings.auto_archive_after_days));
            if now - room.last_activity_at >= horizon {
                room.status = RoomStatus::Archived;
                self.rooms.update_room(room.clone())?;
                archived.push(room.application_id);
            }
        }
        Ok(archived)
    }

    pub fn fetch(&self, application_id: &ApplicationId) -> Result<Option<ApplicationRoom>, RoomError> {
        Ok(self.rooms.fetch_room(application_id)?)
    }

    fn fetch_required(&self, application_id: &ApplicationId) -> Result<ApplicationRoom, RoomError> {
        self.rooms
            .fetch_room(application_id)?
            .ok_or_else(|| RoomError::NotFound {
                application_id: application_id.clone(),
            })
    }
}
