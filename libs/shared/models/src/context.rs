use crate::auth::User;

/// Per-request context threaded explicitly through every core operation.
/// Carries the authenticated caller and the bearer token forwarded to the
/// persistence layer (row-level security applies downstream).
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: User,
    pub auth_token: String,
}

impl RequestContext {
    pub fn new(user: User, auth_token: impl Into<String>) -> Self {
        Self {
            user,
            auth_token: auth_token.into(),
        }
    }

    /// Context for system-initiated work (cron sweeps). The persistence layer
    /// authenticates with the service role token instead of a user session.
    pub fn system(service_token: impl Into<String>) -> Self {
        Self {
            user: User {
                id: "system".to_string(),
                email: None,
                role: Some("service".to_string()),
                metadata: None,
                created_at: None,
            },
            auth_token: service_token.into(),
        }
    }
}
