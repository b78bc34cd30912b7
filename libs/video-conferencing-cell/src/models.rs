// libs/video-conferencing-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Where a call stands. One session per online appointment, coordinated
/// server-side; `ended` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CallPhase {
    PreRoom,
    Joining,
    Connected,
    Ended,
}

impl fmt::Display for CallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallPhase::PreRoom => write!(f, "pre_room"),
            CallPhase::Joining => write!(f, "joining"),
            CallPhase::Connected => write!(f, "connected"),
            CallPhase::Ended => write!(f, "ended"),
        }
    }
}

/// Coordinator-held call session, keyed by appointment id. Ending the call
/// never touches the appointment's own status.
#[derive(Debug, Clone, Serialize)]
pub struct CallSession {
    pub appointment_id: Uuid,
    pub identity: String,
    pub phase: CallPhase,
    pub consent_given: bool,
    pub camera_enabled: bool,
    pub microphone_enabled: bool,
    /// Provider-side session id, set once connected.
    pub room_session_id: Option<String>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub connected_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewRequest {
    #[serde(default = "default_true")]
    pub camera: bool,
    #[serde(default = "default_true")]
    pub microphone: bool,
}

fn default_true() -> bool {
    true
}

/// Camera/microphone toggles; omitted fields are left unchanged.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackToggleRequest {
    pub camera: Option<bool>,
    pub microphone: Option<bool>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum VideoError {
    #[error("No call session for this appointment")]
    SessionNotFound,

    #[error("Consent is required before joining")]
    ConsentRequired,

    #[error("Operation not allowed in phase {phase}")]
    InvalidPhase { phase: CallPhase },

    #[error("Failed to connect to the video room: {0}")]
    ConnectFailed(String),

    #[error("Video provider error: {0}")]
    Provider(String),

    #[error("Video conferencing not configured")]
    NotConfigured,
}
