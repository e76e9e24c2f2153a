pub mod auth;
pub mod guard;
pub mod response;

pub use auth::{authenticate_jwt, CurrentUser};
pub use guard::{authorize, AuthzError, Chain, Interceptor, RouteParams};
pub use response::{ApiResponse, ApiResult};
