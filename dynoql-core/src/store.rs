/// Store client abstraction
///
/// Everything that talks to the document store goes through [`StoreClient`].
/// Transport, authentication and retries live behind this trait.

use crate::error::StoreError;
use crate::schema::{
    AlterGsiRequest, AlterTableRequest, CreateGsiRequest, CreateTableRequest, DropGsiRequest,
    IndexDescriptor, IndexScope, TableDescriptor,
};
use crate::types::{AttributeValue, Item};
use async_trait::async_trait;
use std::collections::HashMap;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Capacity consumed by one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsumedCapacity {
    pub table_name: Option<String>,
    pub capacity_units: Option<f64>,
    pub read_capacity_units: Option<f64>,
    pub write_capacity_units: Option<f64>,
}

/// Response metadata attached by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseMetadata {
    pub request_id: Option<String>,
    pub extras: HashMap<String, String>,
}

/// Single item-language statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecuteStatementRequest {
    pub statement: String,
    pub parameters: Vec<AttributeValue>,
    /// Page size hint; the store may return fewer items
    pub limit: Option<i32>,
    pub consistent_read: Option<bool>,
    pub next_token: Option<String>,
}

impl ExecuteStatementRequest {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            ..Default::default()
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<AttributeValue>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_limit(mut self, limit: Option<i32>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_consistent_read(mut self, consistent_read: Option<bool>) -> Self {
        self.consistent_read = consistent_read;
        self
    }
}

/// One page of statement output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecuteStatementOutput {
    pub items: Vec<Item>,
    pub next_token: Option<String>,
    pub last_evaluated_key: Option<Item>,
    pub consumed_capacity: Option<ConsumedCapacity>,
    pub metadata: ResponseMetadata,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterizedStatement {
    pub statement: String,
    pub parameters: Vec<AttributeValue>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemResponse {
    pub item: Option<Item>,
}

/// Output of an atomic multi-statement submission.
///
/// `responses` and `consumed_capacity` are positional: entry n belongs to
/// statement n when present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecuteTransactionOutput {
    pub responses: Vec<ItemResponse>,
    pub consumed_capacity: Vec<ConsumedCapacity>,
    pub metadata: ResponseMetadata,
}

#[async_trait]
pub trait StoreClient: Send + Sync {
    async fn execute_statement(
        &self,
        request: ExecuteStatementRequest,
    ) -> StoreResult<ExecuteStatementOutput>;

    /// Submits all statements atomically; either all apply or none do.
    async fn execute_transaction(
        &self,
        statements: Vec<ParameterizedStatement>,
    ) -> StoreResult<ExecuteTransactionOutput>;

    async fn create_table(&self, request: CreateTableRequest) -> StoreResult<()>;

    async fn alter_table(&self, request: AlterTableRequest) -> StoreResult<()>;

    async fn drop_table(&self, table_name: &str) -> StoreResult<()>;

    async fn describe_table(&self, table_name: &str) -> StoreResult<TableDescriptor>;

    async fn list_tables(&self) -> StoreResult<Vec<String>>;

    async fn create_index(&self, request: CreateGsiRequest) -> StoreResult<()>;

    async fn alter_index(&self, request: AlterGsiRequest) -> StoreResult<()>;

    async fn drop_index(&self, request: DropGsiRequest) -> StoreResult<()>;

    /// Looks an index up in the table description. `Ok(None)` means the
    /// table exists but has no such index.
    async fn describe_index(
        &self,
        table_name: &str,
        index_name: &str,
        scope: IndexScope,
    ) -> StoreResult<Option<IndexDescriptor>> {
        let table = self.describe_table(table_name).await?;
        Ok(table.find_index(scope, index_name).cloned())
    }
}
