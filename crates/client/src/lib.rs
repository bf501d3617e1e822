mod api;
mod engine;
mod error;

pub use api::SyncApi;
pub use engine::{SyncOutcome, sync};
pub use error::{ClientError, Result};
