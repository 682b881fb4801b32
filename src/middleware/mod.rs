pub mod auth;
pub mod errors;
pub mod extract;
pub mod response;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use errors::expose_error_details;
pub use extract::{ApiJson, ApiPath, ApiQuery};
pub use response::{message, ApiResponse, ApiResult, Page, Pagination};
