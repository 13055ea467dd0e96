use std::time::Duration;
use thiserror::Error;

/// Failure reported by a store client.
///
/// Variants mirror the service exception names the store reports; `code()`
/// returns that name so callers can match on it the same way regardless of
/// which client produced the error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("conditional check failed: {0}")]
    ConditionalCheckFailed(String),

    #[error("resource in use: {0}")]
    ResourceInUse(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("transaction canceled: {0}")]
    TransactionCanceled(String),

    #[error("request throttled: {0}")]
    Throttled(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request canceled")]
    Canceled,

    #[error("{code}: {message}")]
    Service { code: String, message: String },

    #[error("transport error: {0}")]
    Transport(String),
}

impl StoreError {
    /// Service exception name for this error.
    pub fn code(&self) -> &str {
        match self {
            StoreError::ConditionalCheckFailed(_) => "ConditionalCheckFailedException",
            StoreError::ResourceInUse(_) => "ResourceInUseException",
            StoreError::ResourceNotFound(_) => "ResourceNotFoundException",
            StoreError::TransactionCanceled(_) => "TransactionCanceledException",
            StoreError::Throttled(_) => "ThrottlingException",
            StoreError::AccessDenied(_) => "AccessDeniedException",
            StoreError::Validation(_) => "ValidationException",
            StoreError::Timeout(_) => "RequestTimeout",
            StoreError::Canceled => "RequestCanceled",
            StoreError::Service { code, .. } => code,
            StoreError::Transport(_) => "TransportError",
        }
    }

    /// Message carried by the error, without the exception name.
    pub fn message(&self) -> String {
        match self {
            StoreError::ConditionalCheckFailed(m)
            | StoreError::ResourceInUse(m)
            | StoreError::ResourceNotFound(m)
            | StoreError::TransactionCanceled(m)
            | StoreError::Throttled(m)
            | StoreError::AccessDenied(m)
            | StoreError::Validation(m)
            | StoreError::Transport(m) => m.clone(),
            StoreError::Service { message, .. } => message.clone(),
            StoreError::Timeout(d) => format!("timed out after {:?}", d),
            StoreError::Canceled => "canceled".to_string(),
        }
    }

    /// Builds the most specific variant for a service exception name.
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            "ConditionalCheckFailedException" => StoreError::ConditionalCheckFailed(message),
            "ResourceInUseException" => StoreError::ResourceInUse(message),
            "ResourceNotFoundException" => StoreError::ResourceNotFound(message),
            "TransactionCanceledException" => StoreError::TransactionCanceled(message),
            "ThrottlingException"
            | "ProvisionedThroughputExceededException"
            | "RequestLimitExceeded" => StoreError::Throttled(message),
            "AccessDeniedException" | "UnrecognizedClientException" => {
                StoreError::AccessDenied(message)
            }
            "ValidationException" => StoreError::Validation(message),
            _ => StoreError::Service {
                code: code.to_string(),
                message,
            },
        }
    }

    pub fn is_conditional_check_failed(&self) -> bool {
        matches!(self, StoreError::ConditionalCheckFailed(_))
    }

    pub fn is_resource_in_use(&self) -> bool {
        matches!(self, StoreError::ResourceInUse(_))
    }

    pub fn is_resource_not_found(&self) -> bool {
        matches!(self, StoreError::ResourceNotFound(_))
    }

    /// Returns true if retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Throttled(_) | StoreError::Timeout(_) | StoreError::Transport(_)
        )
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid query: {0}")]
    Syntax(String),

    #[error("there is an ongoing transaction, new transaction/statement or fetching result is not allowed")]
    InTransaction,

    #[error("invalid transaction stage")]
    InvalidTxStage,

    #[error("no transaction is in progress")]
    NoTransaction,

    #[error("transaction is being committed")]
    TxCommitting,

    #[error("no result available, the transaction was rolled back or failed")]
    NoResult,

    #[error("this operation is not supported: {0}")]
    Unsupported(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("error marshalling parameter {position}-th for statement <{statement}>: {message}")]
    Marshal {
        statement: String,
        position: usize,
        message: String,
    },

    #[error("number of fields and values mismatch")]
    FieldsAndValuesMismatch,

    #[error("input is not a valid INSERT statement")]
    NotInsertStatement,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    /// Returns a stable error code for this error variant.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Syntax(_) => "SYNTAX_ERROR",
            Error::InTransaction => "IN_TRANSACTION",
            Error::InvalidTxStage => "INVALID_TX_STAGE",
            Error::NoTransaction => "NO_TRANSACTION",
            Error::TxCommitting => "TX_COMMITTING",
            Error::NoResult => "NO_RESULT",
            Error::Unsupported(_) => "UNSUPPORTED",
            Error::InvalidArgument(_) => "INVALID_ARGUMENT",
            Error::Marshal { .. } => "MARSHAL_ERROR",
            Error::FieldsAndValuesMismatch => "FIELDS_VALUES_MISMATCH",
            Error::NotInsertStatement => "NOT_INSERT_STATEMENT",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
            Error::Store(_) => "STORE_ERROR",
        }
    }

    /// Returns true if this error is potentially retryable.
    ///
    /// Only store faults can be transient; everything raised locally is
    /// deterministic for the same input.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Store(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// The store error behind this error, if any.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Error::Store(e) => Some(e),
            _ => None,
        }
    }

    pub(crate) fn syntax(msg: impl Into<String>) -> Self {
        Error::Syntax(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
