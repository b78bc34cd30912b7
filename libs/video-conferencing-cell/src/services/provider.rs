// libs/video-conferencing-cell/src/services/provider.rs
use async_trait::async_trait;
use std::sync::Arc;

use crate::models::VideoError;

/// Live connection to a provider-side room. The coordinator owns the only
/// reference and drops it on teardown.
#[async_trait]
pub trait RoomHandle: Send + Sync {
    fn session_id(&self) -> &str;

    async fn set_camera(&self, enabled: bool) -> Result<(), VideoError>;

    async fn set_microphone(&self, enabled: bool) -> Result<(), VideoError>;

    /// Stop all local tracks. Called exactly once per session, before
    /// `disconnect`.
    async fn stop_tracks(&self) -> Result<(), VideoError>;

    async fn disconnect(&self) -> Result<(), VideoError>;
}

/// Provider seam for the coordinator; production is Cloudflare Realtime,
/// tests substitute counting fakes.
#[async_trait]
pub trait VideoRoomProvider: Send + Sync {
    /// Open a room connection. Room name is the appointment id; identity is
    /// the joining user.
    async fn connect(
        &self,
        room_name: &str,
        identity: &str,
    ) -> Result<Arc<dyn RoomHandle>, VideoError>;

    async fn health_check(&self) -> Result<bool, VideoError>;
}
