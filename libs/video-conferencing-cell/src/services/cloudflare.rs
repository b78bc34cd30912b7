// libs/video-conferencing-cell/src/services/cloudflare.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use shared_config::AppConfig;

use crate::models::VideoError;
use crate::services::provider::{RoomHandle, VideoRoomProvider};

/// Cloudflare Realtime API client.
/// Based on: https://developers.cloudflare.com/realtime/
pub struct CloudflareRealtimeClient {
    client: Client,
    app_id: String,
    api_token: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct SessionRequest {
    #[serde(rename = "roomName")]
    room_name: String,
    identity: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    #[serde(rename = "sessionId")]
    session_id: String,
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
    #[serde(rename = "errorDescription")]
    error_description: Option<String>,
}

impl CloudflareRealtimeClient {
    pub fn new(config: &AppConfig) -> Result<Self, VideoError> {
        if !config.is_video_conferencing_configured() {
            return Err(VideoError::NotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            app_id: config.cloudflare_realtime_app_id.clone(),
            api_token: config.cloudflare_realtime_api_token.clone(),
            base_url: config.cloudflare_realtime_base_url.clone(),
        })
    }

    fn session_url(&self, suffix: &str) -> String {
        format!("{}/apps/{}/sessions/{}", self.base_url, self.app_id, suffix)
    }

    async fn post_json(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> Result<String, VideoError> {
        debug!("Cloudflare request: {}", url);

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| VideoError::Provider(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| VideoError::Provider(e.to_string()))?;

        if !status.is_success() {
            error!("Cloudflare request failed: {} - {}", status, text);
            return Err(VideoError::Provider(format!("HTTP {}: {}", status, text)));
        }

        Ok(text)
    }
}

#[async_trait]
impl VideoRoomProvider for CloudflareRealtimeClient {
    async fn connect(
        &self,
        room_name: &str,
        identity: &str,
    ) -> Result<Arc<dyn RoomHandle>, VideoError> {
        info!("Opening Cloudflare Realtime session for room {}", room_name);

        let url = self.session_url("new");
        let body = serde_json::to_value(SessionRequest {
            room_name: room_name.to_string(),
            identity: identity.to_string(),
        })
        .map_err(|e| VideoError::Provider(e.to_string()))?;

        let text = self.post_json(&url, body).await?;
        let session: SessionResponse = serde_json::from_str(&text)
            .map_err(|e| VideoError::Provider(format!("Failed to parse session response: {}", e)))?;

        if let Some(code) = session.error_code {
            let message = session.error_description.as_deref().unwrap_or("Unknown error");
            error!("Cloudflare session error: {} - {}", code, message);
            return Err(VideoError::Provider(format!("{}: {}", code, message)));
        }

        info!("Cloudflare session created: {}", session.session_id);
        Ok(Arc::new(CloudflareRoomHandle {
            client: self.client.clone(),
            api_token: self.api_token.clone(),
            session_id: session.session_id,
            base_url: self.base_url.clone(),
            app_id: self.app_id.clone(),
        }))
    }

    async fn health_check(&self) -> Result<bool, VideoError> {
        debug!("Cloudflare Realtime health check");

        let url = format!("{}/apps/{}", self.base_url, self.app_id);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .send()
            .await
            .map_err(|e| VideoError::Provider(e.to_string()))?;

        // 404 is expected for the app info endpoint.
        let healthy = response.status().is_success() || response.status() == 404;
        if !healthy {
            warn!("Cloudflare health check failed: {}", response.status());
        }
        Ok(healthy)
    }
}

/// One provider-side session. Track toggles are state updates on the
/// existing session, never a renegotiation.
pub struct CloudflareRoomHandle {
    client: Client,
    api_token: String,
    session_id: String,
    base_url: String,
    app_id: String,
}

impl CloudflareRoomHandle {
    async fn update_track(&self, kind: &str, enabled: bool) -> Result<(), VideoError> {
        let url = format!(
            "{}/apps/{}/sessions/{}/tracks/update",
            self.base_url, self.app_id, self.session_id
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .json(&json!({ "kind": kind, "enabled": enabled }))
            .send()
            .await
            .map_err(|e| VideoError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            return Err(VideoError::Provider(format!(
                "Track update failed: HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RoomHandle for CloudflareRoomHandle {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn set_camera(&self, enabled: bool) -> Result<(), VideoError> {
        self.update_track("video", enabled).await
    }

    async fn set_microphone(&self, enabled: bool) -> Result<(), VideoError> {
        self.update_track("audio", enabled).await
    }

    async fn stop_tracks(&self) -> Result<(), VideoError> {
        self.update_track("video", false).await?;
        self.update_track("audio", false).await
    }

    async fn disconnect(&self) -> Result<(), VideoError> {
        let url = format!(
            "{}/apps/{}/sessions/{}/close",
            self.base_url, self.app_id, self.session_id
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .send()
            .await
            .map_err(|e| VideoError::Provider(e.to_string()))?;

        // Sessions also auto-expire server-side, so a 404 here is fine.
        if !response.status().is_success() && response.status() != 404 {
            return Err(VideoError::Provider(format!(
                "Session close failed: HTTP {}",
                response.status()
            )));
        }

        info!("Cloudflare session closed: {}", self.session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_utils::test_utils::TestConfig;

    #[test]
    fn client_creation_succeeds_with_full_config() {
        let config = TestConfig::default().to_app_config();
        assert!(CloudflareRealtimeClient::new(&config).is_ok());
    }

    #[test]
    fn client_creation_fails_without_config() {
        let mut config = TestConfig::default().to_app_config();
        config.cloudflare_realtime_app_id = String::new();

        let client = CloudflareRealtimeClient::new(&config);
        assert!(matches!(client, Err(VideoError::NotConfigured)));
    }

    #[test]
    fn session_urls_are_scoped_to_the_app() {
        let config = TestConfig::default().to_app_config();
        let client = CloudflareRealtimeClient::new(&config).unwrap();

        assert_eq!(
            client.session_url("new"),
            format!(
                "{}/apps/{}/sessions/new",
                config.cloudflare_realtime_base_url, config.cloudflare_realtime_app_id
            )
        );
    }
}
