use serde::{Deserialize, Serialize};

use super::domain::RoomSettings;

/// Engine configuration: matcher capacity fallback and room defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeConfig {
    /// Capacity assumed for consultants without an explicit
    /// `max_concurrent_applications`.
    pub default_consultant_capacity: u32,
    pub room_allowed_extensions: Vec<String>,
    pub room_max_file_size_bytes: u64,
    pub room_auto_archive_after_days: u32,
}

impl IntakeConfig {
    pub fn room_settings(&self) -> RoomSettings {
        RoomSettings {
            allowed_extensions: self.room_allowed_extensions.clone(),
            max_file_size_bytes: self.room_max_file_size_bytes,
            auto_archive_after_days: self.room_auto_archive_after_days,
        }
    }
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            default_consultant_capacity: 10,
            room_allowed_extensions: ["pdf", "docx", "xlsx", "png", "jpg"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            room_max_file_size_bytes: 25 * 1024 * 1024,
            room_auto_archive_after_days: 30,
        }
    }
}
