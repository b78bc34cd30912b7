// libs/video-conferencing-cell/src/services/session.rs
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{CallPhase, CallSession, VideoError};
use crate::services::provider::{RoomHandle, VideoRoomProvider};

/// Upper bound on a single room connect attempt. A provider that hangs
/// leaves the session in `joining` with `last_error` set, retryable.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Server-side call coordinator, one session per online appointment.
/// `pre_room -> joining -> connected -> ended`; join is gated on recorded
/// consent, and teardown runs exactly once on every exit path.
pub struct VideoSessionCoordinator {
    provider: Arc<dyn VideoRoomProvider>,
    sessions: RwLock<HashMap<Uuid, CallSession>>,
    handles: RwLock<HashMap<Uuid, Arc<dyn RoomHandle>>>,
}

impl VideoSessionCoordinator {
    pub fn new(provider: Arc<dyn VideoRoomProvider>) -> Self {
        Self {
            provider,
            sessions: RwLock::new(HashMap::new()),
            handles: RwLock::new(HashMap::new()),
        }
    }

    /// Enter (or refresh) the pre-room with local preview flags. No provider
    /// traffic happens here.
    pub async fn enter_pre_room(
        &self,
        appointment_id: Uuid,
        identity: &str,
        camera: bool,
        microphone: bool,
    ) -> Result<CallSession, VideoError> {
        let mut sessions = self.sessions.write().await;

        match sessions.get_mut(&appointment_id) {
            Some(session) if session.phase == CallPhase::PreRoom => {
                session.camera_enabled = camera;
                session.microphone_enabled = microphone;
                Ok(session.clone())
            }
            Some(session) if session.phase != CallPhase::Ended => Err(VideoError::InvalidPhase {
                phase: session.phase,
            }),
            _ => {
                // Fresh session, also after a previous call ended.
                let session = CallSession {
                    appointment_id,
                    identity: identity.to_string(),
                    phase: CallPhase::PreRoom,
                    consent_given: false,
                    camera_enabled: camera,
                    microphone_enabled: microphone,
                    room_session_id: None,
                    last_error: None,
                    created_at: Utc::now(),
                    connected_at: None,
                    ended_at: None,
                };
                sessions.insert(appointment_id, session.clone());
                Ok(session)
            }
        }
    }

    /// Record explicit consent; required before `join` succeeds.
    pub async fn record_consent(&self, appointment_id: Uuid) -> Result<CallSession, VideoError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&appointment_id)
            .ok_or(VideoError::SessionNotFound)?;

        match session.phase {
            CallPhase::PreRoom | CallPhase::Joining => {
                session.consent_given = true;
                Ok(session.clone())
            }
            phase => Err(VideoError::InvalidPhase { phase }),
        }
    }

    /// Connect to the provider room. On failure (including timeout) the
    /// session stays in `joining` and may be retried.
    pub async fn join(&self, appointment_id: Uuid) -> Result<CallSession, VideoError> {
        let identity = {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get_mut(&appointment_id)
                .ok_or(VideoError::SessionNotFound)?;

            match session.phase {
                CallPhase::PreRoom | CallPhase::Joining => {}
                phase => return Err(VideoError::InvalidPhase { phase }),
            }
            if !session.consent_given {
                return Err(VideoError::ConsentRequired);
            }

            session.phase = CallPhase::Joining;
            session.identity.clone()
        };

        let room_name = appointment_id.to_string();
        let connect = self.provider.connect(&room_name, &identity);
        let handle = match tokio::time::timeout(CONNECT_TIMEOUT, connect).await {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => return self.fail_join(appointment_id, e.to_string()).await,
            Err(_) => {
                return self
                    .fail_join(appointment_id, "connect timed out".to_string())
                    .await
            }
        };

        // Apply the pre-room preview flags to the live tracks. A failure
        // here must not leak the freshly opened room.
        let (camera, microphone) = {
            let sessions = self.sessions.read().await;
            match sessions.get(&appointment_id) {
                Some(session) => (session.camera_enabled, session.microphone_enabled),
                None => {
                    Self::discard_handle(appointment_id, &handle).await;
                    return Err(VideoError::SessionNotFound);
                }
            }
        };
        if let Err(e) = handle.set_camera(camera).await {
            Self::discard_handle(appointment_id, &handle).await;
            return self.fail_join(appointment_id, e.to_string()).await;
        }
        if let Err(e) = handle.set_microphone(microphone).await {
            Self::discard_handle(appointment_id, &handle).await;
            return self.fail_join(appointment_id, e.to_string()).await;
        }

        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(&appointment_id) else {
            drop(sessions);
            Self::discard_handle(appointment_id, &handle).await;
            return Err(VideoError::SessionNotFound);
        };
        // A leave racing the connect has already ended the call; the late
        // room goes down instead of resurrecting the session.
        if session.phase != CallPhase::Joining {
            let phase = session.phase;
            drop(sessions);
            Self::discard_handle(appointment_id, &handle).await;
            return Err(VideoError::InvalidPhase { phase });
        }
        session.phase = CallPhase::Connected;
        session.room_session_id = Some(handle.session_id().to_string());
        session.last_error = None;
        session.connected_at = Some(Utc::now());
        let snapshot = session.clone();
        // Installed while the session lock is held, so `leave` can never
        // slip between the phase change and the handle becoming visible.
        self.handles.write().await.insert(appointment_id, handle);
        drop(sessions);

        info!(%appointment_id, "call connected");
        Ok(snapshot)
    }

    /// Stop tracks and disconnect a room that never made it into (or just
    /// left) the handle map. Errors are logged, not surfaced.
    async fn discard_handle(appointment_id: Uuid, handle: &Arc<dyn RoomHandle>) {
        if let Err(e) = handle.stop_tracks().await {
            warn!(%appointment_id, error = %e, "track stop failed during teardown");
        }
        if let Err(e) = handle.disconnect().await {
            warn!(%appointment_id, error = %e, "room disconnect failed during teardown");
        }
    }

    async fn fail_join(
        &self,
        appointment_id: Uuid,
        reason: String,
    ) -> Result<CallSession, VideoError> {
        warn!(%appointment_id, %reason, "room connect failed");
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(&appointment_id) {
            session.last_error = Some(reason.clone());
        }
        Err(VideoError::ConnectFailed(reason))
    }

    /// Toggle camera/microphone on the live room. Connected phase only.
    pub async fn set_tracks(
        &self,
        appointment_id: Uuid,
        camera: Option<bool>,
        microphone: Option<bool>,
    ) -> Result<CallSession, VideoError> {
        {
            let sessions = self.sessions.read().await;
            let session = sessions
                .get(&appointment_id)
                .ok_or(VideoError::SessionNotFound)?;
            if session.phase != CallPhase::Connected {
                return Err(VideoError::InvalidPhase {
                    phase: session.phase,
                });
            }
        }

        let handle = {
            let handles = self.handles.read().await;
            handles
                .get(&appointment_id)
                .cloned()
                .ok_or(VideoError::SessionNotFound)?
        };
        if let Some(enabled) = camera {
            handle.set_camera(enabled).await?;
        }
        if let Some(enabled) = microphone {
            handle.set_microphone(enabled).await?;
        }

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&appointment_id)
            .ok_or(VideoError::SessionNotFound)?;
        if let Some(enabled) = camera {
            session.camera_enabled = enabled;
        }
        if let Some(enabled) = microphone {
            session.microphone_enabled = enabled;
        }
        Ok(session.clone())
    }

    /// End the call. Stops tracks and disconnects the room exactly once;
    /// calling again (or on a never-connected session) is a no-op on the
    /// provider side. Never touches the appointment's own status.
    pub async fn leave(&self, appointment_id: Uuid) -> Result<CallSession, VideoError> {
        // Phase change and handle removal happen under the session lock, so
        // only one caller ever holds the handle, and a join finishing after
        // this sees the ended phase and discards its own room.
        let (snapshot, handle) = {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get_mut(&appointment_id)
                .ok_or(VideoError::SessionNotFound)?;
            if session.phase != CallPhase::Ended {
                session.phase = CallPhase::Ended;
                session.ended_at = Some(Utc::now());
                info!(%appointment_id, "call ended");
            }
            let handle = self.handles.write().await.remove(&appointment_id);
            (session.clone(), handle)
        };

        if let Some(handle) = handle {
            Self::discard_handle(appointment_id, &handle).await;
        }
        Ok(snapshot)
    }

    pub async fn session_state(&self, appointment_id: Uuid) -> Result<CallSession, VideoError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&appointment_id)
            .cloned()
            .ok_or(VideoError::SessionNotFound)
    }

    pub async fn provider_health(&self) -> Result<bool, VideoError> {
        self.provider.health_check().await
    }
}
