/// DynamoDB store client for dynoql
///
/// Implements the driver's `StoreClient` over the AWS SDK. Build one with
/// [`DynamoStore::connect`] from a `DriverConfig` and hand it to a
/// `dynoql_api::Connection`.

#[cfg(feature = "dynamodb")]
pub mod convert;
#[cfg(feature = "dynamodb")]
pub mod error;
#[cfg(feature = "dynamodb")]
pub mod store;

#[cfg(feature = "dynamodb")]
pub use store::DynamoStore;

pub use dynoql_core::{DriverConfig, StoreClient, StoreError};
