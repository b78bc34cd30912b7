// libs/video-conferencing-cell/src/services/mod.rs
pub mod cloudflare;
pub mod provider;
pub mod session;

pub use cloudflare::CloudflareRealtimeClient;
pub use provider::{RoomHandle, VideoRoomProvider};
pub use session::VideoSessionCoordinator;
