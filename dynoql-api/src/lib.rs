//! Session layer of the dynoql driver: connections, prepared statements,
//! transaction batching, paged reads and result cursors.

pub mod connection;
pub mod transaction;
pub mod pagination;
pub mod rows;
pub mod result;
pub mod wait;
mod execute;

pub use connection::{Connection, PreparedStatement};
pub use transaction::{Transaction, TxOutput, TxSlot};
pub use pagination::{merge_pages, PageFailure};
pub use rows::{Column, Row, Rows};
pub use result::{ExecResult, ExecStatus};
pub use wait::{wait_for_gsi_status, wait_for_table_status};

pub use dynoql_core::{CallContext, CancelHandle, DriverConfig, Error, Result, StoreClient, Value};
