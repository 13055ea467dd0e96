/// Connection handle and prepared statements

use crate::execute;
use crate::result::ExecResult;
use crate::rows::Rows;
use crate::transaction::{Coordinator, Transaction};
use dynoql_core::dialect::{parse, Statement, StatementKind};
use dynoql_core::{CallContext, Error, Result, StoreClient, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

struct Shared {
    client: Arc<dyn StoreClient>,
    coordinator: Coordinator,
}

/// A session against the store.
///
/// Cloning is cheap; clones share the store client and the transaction
/// state, so a transaction begun on one clone is visible to the others.
#[derive(Clone)]
pub struct Connection {
    shared: Arc<Shared>,
    timeout: Option<Duration>,
}

impl Connection {
    pub fn new(client: Arc<dyn StoreClient>) -> Self {
        Self {
            shared: Arc::new(Shared {
                client,
                coordinator: Coordinator::new(),
            }),
            timeout: None,
        }
    }

    /// Bounds every call made without an explicit [`CallContext`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn client(&self) -> &Arc<dyn StoreClient> {
        &self.shared.client
    }

    pub(crate) fn coordinator(&self) -> &Coordinator {
        &self.shared.coordinator
    }

    /// Fresh context carrying this connection's default timeout.
    pub fn call_context(&self) -> CallContext {
        match self.timeout {
            Some(timeout) => CallContext::new().with_timeout(timeout),
            None => CallContext::new(),
        }
    }

    /// Parses and validates `query` without touching the store.
    ///
    /// The result can run inside or outside a transaction; UPDATE/DELETE only
    /// carry the implicit `RETURNING ALL OLD *` when run on their own.
    pub fn prepare(&self, query: &str) -> Result<PreparedStatement> {
        let statement = parse(query)?;
        Ok(PreparedStatement {
            conn: self.clone(),
            query: query.to_string(),
            statement,
        })
    }

    pub async fn execute(&self, query: &str, params: &[Value]) -> Result<ExecResult> {
        self.execute_with(&self.call_context(), query, params).await
    }

    pub async fn execute_with(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<ExecResult> {
        self.prepare(query)?.execute_with(ctx, params).await
    }

    pub async fn query(&self, query: &str, params: &[Value]) -> Result<Rows> {
        self.query_with(&self.call_context(), query, params).await
    }

    pub async fn query_with(
        &self,
        ctx: &CallContext,
        query: &str,
        params: &[Value],
    ) -> Result<Rows> {
        self.prepare(query)?.query_with(ctx, params).await
    }

    /// Opens a transaction. Only one can be open per connection; while it
    /// is, this fails with [`Error::InTransaction`] and the open one is
    /// available from [`Connection::current_transaction`].
    pub fn begin(&self) -> Result<Transaction> {
        let id = self.coordinator().begin()?;
        Ok(Transaction::new(self.clone(), id))
    }

    pub fn current_transaction(&self) -> Option<Transaction> {
        self.coordinator()
            .current()
            .map(|id| Transaction::new(self.clone(), id))
    }

    pub fn in_transaction(&self) -> bool {
        self.coordinator().is_active()
    }

    /// Rolls back any open transaction.
    pub fn close(&self) {
        if let Some(tx) = self.current_transaction() {
            if let Err(e) = tx.rollback() {
                warn!(tx = tx.id(), "rollback on close failed: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("timeout", &self.timeout)
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}

/// A parsed statement bound to a connection, reusable with different
/// parameters.
#[derive(Debug, Clone)]
pub struct PreparedStatement {
    conn: Connection,
    query: String,
    statement: Statement,
}

impl PreparedStatement {
    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    pub fn kind(&self) -> StatementKind {
        self.statement.kind()
    }

    /// Query text as given to [`Connection::prepare`].
    pub fn query_text(&self) -> &str {
        &self.query
    }

    pub fn num_input(&self) -> usize {
        self.statement.num_input()
    }

    pub async fn execute(&self, params: &[Value]) -> Result<ExecResult> {
        self.execute_with(&self.conn.call_context(), params).await
    }

    pub async fn execute_with(&self, ctx: &CallContext, params: &[Value]) -> Result<ExecResult> {
        self.check_params(params)?;
        execute::execute(&self.conn, ctx, &self.statement, params).await
    }

    pub async fn query(&self, params: &[Value]) -> Result<Rows> {
        self.query_with(&self.conn.call_context(), params).await
    }

    pub async fn query_with(&self, ctx: &CallContext, params: &[Value]) -> Result<Rows> {
        self.check_params(params)?;
        execute::query(&self.conn, ctx, &self.statement, params).await
    }

    fn check_params(&self, params: &[Value]) -> Result<()> {
        let expected = self.num_input();
        if params.len() != expected {
            return Err(Error::InvalidArgument(format!(
                "expected {} parameters, got {}",
                expected,
                params.len()
            )));
        }
        Ok(())
    }
}
