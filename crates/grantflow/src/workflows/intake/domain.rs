use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for business sectors (e.g. health, export).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectorId(pub String);

/// Identifier wrapper for consultants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConsultantId(pub String);

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for any acting user (applicant, consultant, admin).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

/// Identifier wrapper for assignment ledger entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentEntryId(pub String);

/// Identifier wrapper for collaboration rooms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(pub String);

/// Directory view of a sector consultant.
///
/// Load is never stored here; it is derived at match time from the count of
/// open applications assigned to the consultant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consultant {
    pub id: ConsultantId,
    pub sector: SectorId,
    pub active: bool,
    pub approved: bool,
    /// Soft capacity target. `None` falls back to the configured default.
    pub max_concurrent_applications: Option<u32>,
    pub created_at: DateTime<Utc>,
}

/// Directory view of a registered platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub sector: SectorId,
    pub role: UserRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Applicant,
    Consultant,
    Admin,
}

/// Lifecycle states of a grant application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    Pending,
    UnderReview,
    AdditionalInfoRequired,
    Approved,
    Rejected,
    Cancelled,
    Completed,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Pending => "pending",
            Self::UnderReview => "under_review",
            Self::AdditionalInfoRequired => "additional_info_required",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// No further consultant-facing transition is permitted from these.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Approved | Self::Rejected | Self::Cancelled | Self::Completed
        )
    }

    /// Statuses that count against a consultant's derived load.
    pub const fn counts_against_load(self) -> bool {
        matches!(
            self,
            Self::Pending | Self::UnderReview | Self::AdditionalInfoRequired
        )
    }
}

/// Advisory priority shared by applications and their rooms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl ApplicationPriority {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

/// How the current consultant assignment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentType {
    Manual,
    Automatic,
}

impl AssignmentType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Automatic => "automatic",
        }
    }
}

/// Applicant-provided payload captured at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationDraft {
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub requested_amount: Option<u32>,
    #[serde(default)]
    pub priority: Option<ApplicationPriority>,
}

/// A grant application and its lifecycle bookkeeping.
///
/// `assigned_consultant` is a read-optimized projection of the ledger's
/// open entry; the two are only ever updated inside the same store commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub owner: ActorId,
    pub sector: SectorId,
    pub title: String,
    pub summary: String,
    pub requested_amount: Option<u32>,
    pub status: ApplicationStatus,
    pub priority: ApplicationPriority,
    pub assigned_consultant: Option<ConsultantId>,
    pub consultant_assigned_at: Option<DateTime<Utc>>,
    pub consultant_assignment_type: Option<AssignmentType>,
    pub consultant_rating: Option<u8>,
    pub consultant_notes: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<ActorId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<ActorId>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only audit record of one consultant holding one application.
///
/// The entry with `unassigned_at == None` defines the current assignee;
/// per application at most one such entry exists at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentLogEntry {
    pub id: AssignmentEntryId,
    pub application_id: ApplicationId,
    pub consultant_id: ConsultantId,
    /// `None` means the assignment was made automatically by the matcher.
    pub assigned_by: Option<ActorId>,
    pub assignment_type: AssignmentType,
    pub reason: String,
    pub sector_at_assignment: SectorId,
    pub previous_consultant: Option<ConsultantId>,
    pub assigned_at: DateTime<Utc>,
    pub unassigned_at: Option<DateTime<Utc>>,
    pub unassigned_by: Option<ActorId>,
    pub unassignment_reason: Option<String>,
}

impl AssignmentLogEntry {
    pub fn is_open(&self) -> bool {
        self.unassigned_at.is_none()
    }
}

/// Lifecycle states of a collaboration room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Active,
    WaitingDocuments,
    UnderReview,
    Completed,
    Archived,
}

impl RoomStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::WaitingDocuments => "waiting_documents",
            Self::UnderReview => "under_review",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }
}

/// Upload and retention policy attached to a room at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSettings {
    pub allowed_extensions: Vec<String>,
    pub max_file_size_bytes: u64,
    pub auto_archive_after_days: u32,
}

/// Rolling activity counters for one room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomStats {
    pub message_count: u64,
    pub document_count: u64,
    pub last_consultant_activity: Option<DateTime<Utc>>,
    pub last_user_activity: Option<DateTime<Utc>>,
    /// Delta between the most recent activity on one side and the next
    /// activity on the other, once both sides have acted.
    pub response_time_seconds: Option<i64>,
}

/// Free-form consultant note recorded against a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomNote {
    pub note: String,
    pub actor: ActorId,
    pub recorded_at: DateTime<Utc>,
}

/// The per-application collaboration context (1:1 with the application).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRoom {
    pub id: RoomId,
    pub application_id: ApplicationId,
    pub status: RoomStatus,
    pub priority: ApplicationPriority,
    pub last_activity_at: DateTime<Utc>,
    pub settings: RoomSettings,
    pub stats: RoomStats,
    pub notes: Vec<RoomNote>,
}

/// Activity event kinds mirrored into room stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Message,
    Document,
}

/// Metadata accompanying a room activity event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityMeta {
    pub is_consultant: bool,
    /// Overridable so callers replaying events keep their own clock.
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
}
