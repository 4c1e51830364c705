use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use metrics_exporter_prometheus::PrometheusHandle;

use grantflow::workflows::intake::{
    ActorId, Application, ApplicationId, ApplicationRoom, ApplicationStore, AssignmentCommit,
    AssignmentLogEntry, Consultant, ConsultantDirectory, ConsultantId, DirectoryError,
    IntakeConfig, NotificationDispatcher, NotificationEvent, NotifyError, RoomRepository,
    RoomStatus, SectorId, StoreError, UserProfile, UserRole,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct StoreInner {
    applications: HashMap<ApplicationId, Application>,
    entries: Vec<AssignmentLogEntry>,
}

/// Process-local store. The single mutex makes the ledger's
/// close-then-open commit genuinely atomic, which is all the engine asks
/// of a real database transaction.
#[derive(Default, Clone)]
pub(crate) struct InMemoryIntakeStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl ApplicationStore for InMemoryIntakeStore {
    fn insert_application(&self, application: Application) -> Result<Application, StoreError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        if inner.applications.contains_key(&application.id) {
            return Err(StoreError::Conflict);
        }
        inner
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn update_application(&self, application: Application) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        if !inner.applications.contains_key(&application.id) {
            return Err(StoreError::NotFound);
        }
        inner.applications.insert(application.id.clone(), application);
        Ok(())
    }

    fn fetch_application(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.applications.get(id).cloned())
    }

    fn count_open_assigned(&self, consultant: &ConsultantId) -> Result<u32, StoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        let count = inner
            .applications
            .values()
            .filter(|application| {
                application.assigned_consultant.as_ref() == Some(consultant)
                    && application.status.counts_against_load()
            })
            .count();
        Ok(count as u32)
    }

    fn open_assignment(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<AssignmentLogEntry>, StoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .entries
            .iter()
            .find(|entry| entry.application_id == *id && entry.is_open())
            .cloned())
    }

    fn assignment_history(
        &self,
        id: &ApplicationId,
    ) -> Result<Vec<AssignmentLogEntry>, StoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .entries
            .iter()
            .filter(|entry| entry.application_id == *id)
            .cloned()
            .collect())
    }

    fn commit_assignment(
        &self,
        commit: AssignmentCommit,
    ) -> Result<Option<AssignmentLogEntry>, StoreError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        if !inner.applications.contains_key(&commit.application_id) {
            return Err(StoreError::NotFound);
        }

        let open_index = inner
            .entries
            .iter()
            .position(|entry| entry.application_id == commit.application_id && entry.is_open());

        match (&commit.close, open_index) {
            (Some(close), Some(index)) if inner.entries[index].id == close.entry_id => {
                let entry = &mut inner.entries[index];
                entry.unassigned_at = Some(close.unassigned_at);
                entry.unassigned_by = close.unassigned_by.clone();
                entry.unassignment_reason = Some(close.reason.clone());
            }
            (None, None) => {}
            _ => return Err(StoreError::Conflict),
        }

        if let Some(entry) = &commit.open {
            inner.entries.push(entry.clone());
        }
        inner
            .applications
            .insert(commit.application_id.clone(), commit.application);
        Ok(commit.open)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryRoomRepository {
    rooms: Arc<Mutex<HashMap<ApplicationId, ApplicationRoom>>>,
}

impl RoomRepository for InMemoryRoomRepository {
    fn insert_room(&self, room: ApplicationRoom) -> Result<ApplicationRoom, StoreError> {
        let mut rooms = self.rooms.lock().expect("room mutex poisoned");
        if rooms.contains_key(&room.application_id) {
            return Err(StoreError::Conflict);
        }
        rooms.insert(room.application_id.clone(), room.clone());
        Ok(room)
    }

    fn fetch_room(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<ApplicationRoom>, StoreError> {
        let rooms = self.rooms.lock().expect("room mutex poisoned");
        Ok(rooms.get(application_id).cloned())
    }

    fn update_room(&self, room: ApplicationRoom) -> Result<(), StoreError> {
        let mut rooms = self.rooms.lock().expect("room mutex poisoned");
        if !rooms.contains_key(&room.application_id) {
            return Err(StoreError::NotFound);
        }
        rooms.insert(room.application_id.clone(), room);
        Ok(())
    }

    fn completed_rooms(&self) -> Result<Vec<ApplicationRoom>, StoreError> {
        let rooms = self.rooms.lock().expect("room mutex poisoned");
        Ok(rooms
            .values()
            .filter(|room| room.status == RoomStatus::Completed)
            .cloned()
            .collect())
    }
}

/// Static directory standing in for the platform's user registry until the
/// real directory service is wired up.
#[derive(Default, Clone)]
pub(crate) struct StaticDirectory {
    consultants: Vec<Consultant>,
    users: HashMap<ActorId, UserProfile>,
}

impl StaticDirectory {
    pub(crate) fn with_user(mut self, id: &str, sector: &str, role: UserRole) -> Self {
        self.users.insert(
            ActorId(id.to_string()),
            UserProfile {
                sector: SectorId(sector.to_string()),
                role,
            },
        );
        self
    }

    pub(crate) fn with_consultant(
        mut self,
        id: &str,
        sector: &str,
        capacity: u32,
        seniority_days: i64,
    ) -> Self {
        self.consultants.push(Consultant {
            id: ConsultantId(id.to_string()),
            sector: SectorId(sector.to_string()),
            active: true,
            approved: true,
            max_concurrent_applications: Some(capacity),
            created_at: Utc::now() - Duration::days(seniority_days),
        });
        self
    }
}

impl ConsultantDirectory for StaticDirectory {
    fn list_consultants(
        &self,
        sector: &SectorId,
        active_only: bool,
    ) -> Result<Vec<Consultant>, DirectoryError> {
        Ok(self
            .consultants
            .iter()
            .filter(|consultant| consultant.sector == *sector)
            .filter(|consultant| !active_only || consultant.active)
            .cloned()
            .collect())
    }

    fn get_user(&self, user: &ActorId) -> Result<Option<UserProfile>, DirectoryError> {
        Ok(self.users.get(user).cloned())
    }
}

/// Dispatcher that records events as tracing output; the real transport
/// lives behind the platform's notification service.
#[derive(Default, Clone)]
pub(crate) struct LoggingNotifier {
    events: Arc<Mutex<Vec<NotificationEvent>>>,
}

impl LoggingNotifier {
    pub(crate) fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl NotificationDispatcher for LoggingNotifier {
    fn notify(&self, event: NotificationEvent) -> Result<(), NotifyError> {
        tracing::info!(?event, "notification dispatched");
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(event);
        Ok(())
    }
}

pub(crate) fn intake_config_from_env(env: &grantflow::config::IntakeEnvConfig) -> IntakeConfig {
    IntakeConfig {
        default_consultant_capacity: env.default_consultant_capacity,
        room_allowed_extensions: env.room_allowed_extensions.clone(),
        room_max_file_size_bytes: u64::from(env.room_max_file_mb) * 1024 * 1024,
        room_auto_archive_after_days: env.room_auto_archive_days,
    }
}

/// Seed directory used by `serve` and the CLI demo until the platform
/// directory is reachable.
pub(crate) fn seed_directory() -> StaticDirectory {
    StaticDirectory::default()
        .with_user("owner-ada", "health", UserRole::Applicant)
        .with_user("owner-bjorn", "export", UserRole::Applicant)
        .with_user("owner-chiara", "health", UserRole::Applicant)
        .with_consultant("cons-ingrid", "health", 10, 900)
        .with_consultant("cons-jonas", "health", 8, 400)
        .with_consultant("cons-karin", "export", 10, 700)
}
