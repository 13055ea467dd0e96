pub mod error;
pub mod types;
pub mod convert;
pub mod schema;
pub mod store;
pub mod context;
pub mod config;
pub mod dialect;

pub use error::{Error, Result, StoreError};
pub use types::*;
pub use context::{CallContext, CancelHandle};
pub use config::DriverConfig;
pub use store::StoreClient;
