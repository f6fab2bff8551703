pub mod analytics;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use extract::ApiQuery;
pub use handlers::AppState;
pub use routes::create_api_router;
