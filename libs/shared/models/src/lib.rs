pub mod auth;
pub mod context;
pub mod error;

pub use auth::{JwtClaims, User};
pub use context::RequestContext;
pub use error::AppError;
