// common/src/models/detection.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upload accepted by the crack-detection demo
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionRequest {
    /// Base64 image, optionally as a `data:` URL
    pub image: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionStatus {
    Completed,
}

/// Synthetic analysis result kept by the demo store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRecord {
    pub id: Uuid,
    pub filename: String,
    pub status: DetectionStatus,
    pub crack_count: u32,
    /// 0 when no cracks were found
    pub confidence: f64,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl DetectionRecord {
    pub fn new(filename: String, crack_count: u32, confidence: f64) -> Self {
        let message = match crack_count {
            0 => "No cracks detected".to_string(),
            1 => "Detected 1 crack".to_string(),
            n => format!("Detected {} cracks", n),
        };
        Self {
            id: Uuid::new_v4(),
            filename,
            status: DetectionStatus::Completed,
            crack_count,
            confidence,
            message,
            created_at: Utc::now(),
        }
    }
}
