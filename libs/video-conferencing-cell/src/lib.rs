// libs/video-conferencing-cell/src/lib.rs
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{CallPhase, CallSession, VideoError};
pub use router::{video_routes, video_routes_with_coordinator};
pub use services::{CloudflareRealtimeClient, VideoRoomProvider, VideoSessionCoordinator};
