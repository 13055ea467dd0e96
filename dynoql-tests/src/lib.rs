/// Test utilities and helpers for dynoql testing
///
/// [`MockStore`] is a scripted, in-memory [`StoreClient`]: item statements
/// and transactions answer from queues the test fills, schema calls keep a
/// small table catalog, and every call is recorded for inspection.

use async_trait::async_trait;
use dynoql_api::Connection;
use dynoql_core::schema::{
    AlterGsiRequest, AlterTableRequest, BillingModeSummary, CreateGsiRequest, CreateTableRequest,
    DropGsiRequest, IndexDescriptor, ProvisionedThroughput, TableDescriptor,
};
use dynoql_core::store::{
    ExecuteStatementOutput, ExecuteStatementRequest, ExecuteTransactionOutput, ItemResponse,
    ParameterizedStatement, StoreClient, StoreResult,
};
use dynoql_core::{AttributeValue, Item, StoreError};
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// A recorded store call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ExecuteStatement(ExecuteStatementRequest),
    ExecuteTransaction(Vec<ParameterizedStatement>),
    CreateTable(CreateTableRequest),
    AlterTable(AlterTableRequest),
    DropTable(String),
    DescribeTable(String),
    ListTables,
    CreateIndex(CreateGsiRequest),
    AlterIndex(AlterGsiRequest),
    DropIndex(DropGsiRequest),
}

#[derive(Default)]
pub struct MockStore {
    statement_results: Mutex<VecDeque<StoreResult<ExecuteStatementOutput>>>,
    transaction_results: Mutex<VecDeque<StoreResult<ExecuteTransactionOutput>>>,
    schema_errors: Mutex<VecDeque<StoreError>>,
    tables: Mutex<BTreeMap<String, TableDescriptor>>,
    calls: Mutex<Vec<Call>>,
    delay: Mutex<Option<Duration>>,
}

impl MockStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Connection over this store.
    pub fn connection(self: &Arc<Self>) -> Connection {
        Connection::new(self.clone())
    }

    /// Delays every response, for timeout and cancellation tests.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn push_statement_result(&self, result: StoreResult<ExecuteStatementOutput>) {
        self.statement_results.lock().push_back(result);
    }

    /// Queues one page of statement output.
    pub fn push_page(&self, items: Vec<Item>, next_token: Option<&str>) {
        self.push_statement_result(Ok(ExecuteStatementOutput {
            items,
            next_token: next_token.map(String::from),
            ..Default::default()
        }));
    }

    pub fn push_statement_error(&self, err: StoreError) {
        self.push_statement_result(Err(err));
    }

    pub fn push_transaction_result(&self, result: StoreResult<ExecuteTransactionOutput>) {
        self.transaction_results.lock().push_back(result);
    }

    /// Makes the next schema call fail with `err`.
    pub fn push_schema_error(&self, err: StoreError) {
        self.schema_errors.lock().push_back(err);
    }

    pub fn add_table(&self, table: TableDescriptor) {
        self.tables.lock().insert(table.table_name.clone(), table);
    }

    pub fn table(&self, name: &str) -> Option<TableDescriptor> {
        self.tables.lock().get(name).cloned()
    }

    pub fn set_table_status(&self, name: &str, status: &str) {
        if let Some(table) = self.tables.lock().get_mut(name) {
            table.table_status = Some(status.to_string());
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn statement_calls(&self) -> Vec<ExecuteStatementRequest> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::ExecuteStatement(req) => Some(req.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn transaction_calls(&self) -> Vec<Vec<ParameterizedStatement>> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::ExecuteTransaction(stmts) => Some(stmts.clone()),
                _ => None,
            })
            .collect()
    }

    async fn enter(&self, call: Call) {
        self.calls.lock().push(call);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn schema_error(&self) -> StoreResult<()> {
        match self.schema_errors.lock().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn missing_table(name: &str) -> StoreError {
        StoreError::ResourceNotFound(format!("Requested resource not found: Table: {} not found", name))
    }
}

#[async_trait]
impl StoreClient for MockStore {
    async fn execute_statement(
        &self,
        request: ExecuteStatementRequest,
    ) -> StoreResult<ExecuteStatementOutput> {
        self.enter(Call::ExecuteStatement(request)).await;
        self.statement_results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(ExecuteStatementOutput::default()))
    }

    async fn execute_transaction(
        &self,
        statements: Vec<ParameterizedStatement>,
    ) -> StoreResult<ExecuteTransactionOutput> {
        let count = statements.len();
        self.enter(Call::ExecuteTransaction(statements)).await;
        self.transaction_results.lock().pop_front().unwrap_or_else(|| {
            Ok(ExecuteTransactionOutput {
                responses: vec![ItemResponse::default(); count],
                ..Default::default()
            })
        })
    }

    async fn create_table(&self, request: CreateTableRequest) -> StoreResult<()> {
        self.enter(Call::CreateTable(request.clone())).await;
        self.schema_error()?;
        let mut tables = self.tables.lock();
        if tables.contains_key(&request.table_name) {
            return Err(StoreError::ResourceInUse(format!(
                "Table already exists: {}",
                request.table_name
            )));
        }
        tables.insert(
            request.table_name.clone(),
            TableDescriptor {
                table_name: request.table_name.clone(),
                table_status: Some("CREATING".to_string()),
                attribute_definitions: request.attribute_definitions,
                key_schema: request.key_schema,
                billing_mode_summary: Some(BillingModeSummary {
                    billing_mode: request.billing_mode,
                }),
                provisioned_throughput: request.provisioned_throughput,
                item_count: Some(0),
                ..Default::default()
            },
        );
        Ok(())
    }

    async fn alter_table(&self, request: AlterTableRequest) -> StoreResult<()> {
        self.enter(Call::AlterTable(request.clone())).await;
        self.schema_error()?;
        let mut tables = self.tables.lock();
        let table = tables
            .get_mut(&request.table_name)
            .ok_or_else(|| Self::missing_table(&request.table_name))?;
        if let Some(mode) = request.billing_mode {
            table.billing_mode_summary = Some(BillingModeSummary { billing_mode: mode });
        }
        if let Some(update) = request.provisioned_throughput {
            let current = table.provisioned_throughput.unwrap_or(ProvisionedThroughput {
                read_capacity_units: 0,
                write_capacity_units: 0,
            });
            table.provisioned_throughput = Some(ProvisionedThroughput {
                read_capacity_units: update.read_capacity_units.unwrap_or(current.read_capacity_units),
                write_capacity_units: update.write_capacity_units.unwrap_or(current.write_capacity_units),
            });
        }
        Ok(())
    }

    async fn drop_table(&self, table_name: &str) -> StoreResult<()> {
        self.enter(Call::DropTable(table_name.to_string())).await;
        self.schema_error()?;
        self.tables
            .lock()
            .remove(table_name)
            .map(|_| ())
            .ok_or_else(|| Self::missing_table(table_name))
    }

    async fn describe_table(&self, table_name: &str) -> StoreResult<TableDescriptor> {
        self.enter(Call::DescribeTable(table_name.to_string())).await;
        self.schema_error()?;
        self.table(table_name)
            .ok_or_else(|| Self::missing_table(table_name))
    }

    async fn list_tables(&self) -> StoreResult<Vec<String>> {
        self.enter(Call::ListTables).await;
        self.schema_error()?;
        Ok(self.tables.lock().keys().rev().cloned().collect())
    }

    async fn create_index(&self, request: CreateGsiRequest) -> StoreResult<()> {
        self.enter(Call::CreateIndex(request.clone())).await;
        self.schema_error()?;
        let mut tables = self.tables.lock();
        let table = tables
            .get_mut(&request.table_name)
            .ok_or_else(|| Self::missing_table(&request.table_name))?;
        if table
            .global_secondary_indexes
            .iter()
            .any(|idx| idx.index_name == request.index_name)
        {
            return Err(StoreError::Validation(
                "Attempting to create an index which already exists".to_string(),
            ));
        }
        table.global_secondary_indexes.push(IndexDescriptor {
            index_name: request.index_name.clone(),
            index_status: Some("CREATING".to_string()),
            key_schema: request.key_schema,
            projection: Some(request.projection),
            provisioned_throughput: request.provisioned_throughput,
            backfilling: Some(true),
            ..Default::default()
        });
        Ok(())
    }

    async fn alter_index(&self, request: AlterGsiRequest) -> StoreResult<()> {
        self.enter(Call::AlterIndex(request.clone())).await;
        self.schema_error()?;
        let mut tables = self.tables.lock();
        let table = tables
            .get_mut(&request.table_name)
            .ok_or_else(|| Self::missing_table(&request.table_name))?;
        let index = table
            .global_secondary_indexes
            .iter_mut()
            .find(|idx| idx.index_name == request.index_name)
            .ok_or_else(|| {
                StoreError::ResourceNotFound(format!("index {} not found", request.index_name))
            })?;
        index.provisioned_throughput = Some(request.provisioned_throughput);
        Ok(())
    }

    async fn drop_index(&self, request: DropGsiRequest) -> StoreResult<()> {
        self.enter(Call::DropIndex(request.clone())).await;
        self.schema_error()?;
        let mut tables = self.tables.lock();
        let table = tables
            .get_mut(&request.table_name)
            .ok_or_else(|| Self::missing_table(&request.table_name))?;
        let before = table.global_secondary_indexes.len();
        table
            .global_secondary_indexes
            .retain(|idx| idx.index_name != request.index_name);
        if table.global_secondary_indexes.len() == before {
            return Err(StoreError::ResourceNotFound(format!(
                "index {} not found",
                request.index_name
            )));
        }
        Ok(())
    }
}

/// Builds an item from attribute pairs.
pub fn item(pairs: &[(&str, AttributeValue)]) -> Item {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

/// `count` items with a string `id` of the form `{prefix}{n}` and a
/// numeric `n`.
pub fn numbered_items(prefix: &str, count: usize) -> Vec<Item> {
    (0..count)
        .map(|n| {
            item(&[
                ("id", AttributeValue::string(format!("{}{}", prefix, n))),
                ("n", AttributeValue::number(n)),
            ])
        })
        .collect()
}

/// Table description with a single string partition key.
pub fn simple_table(name: &str, status: &str) -> TableDescriptor {
    TableDescriptor {
        table_name: name.to_string(),
        table_status: Some(status.to_string()),
        key_schema: vec![dynoql_core::schema::KeySchemaElement::hash("id")],
        ..Default::default()
    }
}
