use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};

use crate::workflows::intake::config::IntakeConfig;
use crate::workflows::intake::domain::{
    ActorId, Application, ApplicationDraft, ApplicationId, ApplicationPriority, ApplicationRoom,
    ApplicationStatus, AssignmentLogEntry, Consultant, ConsultantId, RoomStatus, SectorId,
    UserProfile, UserRole,
};
use crate::workflows::intake::repository::{
    ApplicationStore, AssignmentCommit, ConsultantDirectory, DirectoryError,
    NotificationDispatcher, NotificationEvent, NotifyError, RoomRepository, StoreError,
};
use crate::workflows::intake::service::IntakeService;

#[derive(Default)]
struct StoreInner {
    applications: HashMap<ApplicationId, Application>,
    entries: Vec<AssignmentLogEntry>,
}

/// Mutex-guarded store so the ledger's compare-and-swap commit is atomic.
#[derive(Default)]
pub(super) struct MemoryStore {
    inner: Mutex<StoreInner>,
}

impl ApplicationStore for MemoryStore {
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

impl MemoryStore {
    pub(super) fn open_entry_count(&self, id: &ApplicationId) -> usize {
        let inner = self.inner.lock().expect("store mutex poisoned");
        inner
            .entries
            .iter()
            .filter(|entry| entry.application_id == *id && entry.is_open())
            .count()
    }
}

/// Store wrapper that loses the commit race a fixed number of times.
pub(super) struct ConflictingStore {
    inner: MemoryStore,
    conflicts_left: AtomicUsize,
}

impl ConflictingStore {
    pub(super) fn new(conflicts: usize) -> Self {
        Self {
            inner: MemoryStore::default(),
            conflicts_left: AtomicUsize::new(conflicts),
        }
    }

    pub(super) fn store(&self) -> &MemoryStore {
        &self.inner
    }
}

impl ApplicationStore for ConflictingStore {
    fn insert_application(&self, application: Application) -> Result<Application, StoreError> {
        self.inner.insert_application(application)
    }

    fn update_application(&self, application: Application) -> Result<(), StoreError> {
        self.inner.update_application(application)
    }

    fn fetch_application(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        self.inner.fetch_application(id)
    }

    fn count_open_assigned(&self, consultant: &ConsultantId) -> Result<u32, StoreError> {
        self.inner.count_open_assigned(consultant)
    }

    fn open_assignment(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<AssignmentLogEntry>, StoreError> {
        self.inner.open_assignment(id)
    }

    fn assignment_history(
        &self,
        id: &ApplicationId,
    ) -> Result<Vec<AssignmentLogEntry>, StoreError> {
        self.inner.assignment_history(id)
    }

    fn commit_assignment(
        &self,
        commit: AssignmentCommit,
    ) -> Result<Option<AssignmentLogEntry>, StoreError> {
        let remaining = self.conflicts_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.conflicts_left.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Conflict);
        }
        self.inner.commit_assignment(commit)
    }
}

/// Store whose every operation reports the database as offline.
pub(super) struct UnavailableStore;

impl ApplicationStore for UnavailableStore {
    fn insert_application(&self, _application: Application) -> Result<Application, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn update_application(&self, _application: Application) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn fetch_application(&self, _id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn count_open_assigned(&self, _consultant: &ConsultantId) -> Result<u32, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn open_assignment(
        &self,
        _id: &ApplicationId,
    ) -> Result<Option<AssignmentLogEntry>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn assignment_history(
        &self,
        _id: &ApplicationId,
    ) -> Result<Vec<AssignmentLogEntry>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn commit_assignment(
        &self,
        _commit: AssignmentCommit,
    ) -> Result<Option<AssignmentLogEntry>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryRooms {
    rooms: Mutex<HashMap<ApplicationId, ApplicationRoom>>,
}

impl RoomRepository for MemoryRooms {
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

#[derive(Default, Clone)]
pub(super) struct MemoryDirectory {
    consultants: Vec<Consultant>,
    users: HashMap<ActorId, UserProfile>,
}

impl MemoryDirectory {
    pub(super) fn with_user(mut self, id: &str, sector: &str, role: UserRole) -> Self {
        self.users.insert(
            ActorId(id.to_string()),
            UserProfile {
                sector: SectorId(sector.to_string()),
                role,
            },
        );
        self
    }

    pub(super) fn with_consultant(mut self, consultant: Consultant) -> Self {
        self.consultants.push(consultant);
        self
    }
}

impl ConsultantDirectory for MemoryDirectory {
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

#[derive(Default)]
pub(super) struct MemoryNotifier {
    events: Mutex<Vec<NotificationEvent>>,
}

impl MemoryNotifier {
    pub(super) fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl NotificationDispatcher for MemoryNotifier {
    fn notify(&self, event: NotificationEvent) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(event);
        Ok(())
    }
}

pub(super) struct FailingNotifier;

impl NotificationDispatcher for FailingNotifier {
    fn notify(&self, _event: NotificationEvent) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp relay unreachable".to_string()))
    }
}

pub(super) fn consultant(
    id: &str,
    sector: &str,
    capacity: Option<u32>,
    seniority_days: i64,
) -> Consultant {
    Consultant {
        id: ConsultantId(id.to_string()),
        sector: SectorId(sector.to_string()),
        active: true,
        approved: true,
        max_concurrent_applications: capacity,
        created_at: Utc::now() - Duration::days(seniority_days),
    }
}

pub(super) fn pending_application(id: &str, owner: &str, sector: &str) -> Application {
    let now = Utc::now();
    Application {
        id: ApplicationId(id.to_string()),
        owner: ActorId(owner.to_string()),
        sector: SectorId(sector.to_string()),
        title: "Export readiness program".to_string(),
        summary: "Support for entering the Nordic market".to_string(),
        requested_amount: Some(25_000),
        status: ApplicationStatus::Pending,
        priority: ApplicationPriority::Normal,
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
    }
}

/// Seed `count` open applications already assigned to a consultant so the
/// derived load query sees them.
pub(super) fn seed_assigned(store: &MemoryStore, consultant_id: &str, sector: &str, count: usize) {
    for index in 0..count {
        let mut application = pending_application(
            &format!("seed-{consultant_id}-{index}"),
            "seed-owner",
            sector,
        );
        application.assigned_consultant = Some(ConsultantId(consultant_id.to_string()));
        store
            .insert_application(application)
            .expect("seed application inserts");
    }
}

pub(super) fn draft(title: &str) -> ApplicationDraft {
    ApplicationDraft {
        title: title.to_string(),
        summary: "Machine park modernization".to_string(),
        requested_amount: Some(80_000),
        priority: None,
    }
}

pub(super) fn health_directory() -> MemoryDirectory {
    MemoryDirectory::default()
        .with_user("owner-1", "health", UserRole::Applicant)
        .with_consultant(consultant("cons-1", "health", Some(10), 400))
        .with_consultant(consultant("cons-2", "health", Some(10), 200))
}

pub(super) type TestService = IntakeService<MemoryStore, MemoryRooms, MemoryDirectory, MemoryNotifier>;

pub(super) fn build_service(
    directory: MemoryDirectory,
) -> (
    Arc<TestService>,
    Arc<MemoryStore>,
    Arc<MemoryRooms>,
    Arc<MemoryNotifier>,
) {
    let store = Arc::new(MemoryStore::default());
    let rooms = Arc::new(MemoryRooms::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = Arc::new(IntakeService::new(
        store.clone(),
        rooms.clone(),
        Arc::new(directory),
        notifier.clone(),
        IntakeConfig::default(),
    ));
    (service, store, rooms, notifier)
}
