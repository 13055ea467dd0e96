/// Mapping SDK failures onto store errors
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use dynoql_core::StoreError;

/// Converts an SDK error into a [`StoreError`].
///
/// Service errors keep their exception name so callers can match on it
/// (`ResourceInUseException`, `ConditionalCheckFailedException`...).
/// Anything that never reached the service is a transport error.
pub fn store_error<E, R>(err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + 'static,
{
    if let SdkError::ServiceError(ctx) = &err {
        let service = ctx.err();
        if let Some(code) = service.code() {
            return StoreError::from_code(code, service.message().unwrap_or_default());
        }
    }
    StoreError::Transport(DisplayErrorContext(&err).to_string())
}
