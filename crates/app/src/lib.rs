mod error;
mod reconcile;
mod state;
mod tokens;
mod validate;

pub use error::{ApiError, AppError, Result};
pub use reconcile::ReconcileService;
pub use state::{AppConfig, AppServices, AppState, setup_db};
pub use tokens::{TokenService, generate_token};
pub use validate::{payload_warnings, validate_payload};
