/// Statement execution in its two modes
///
/// `execute` reports an affected-row count, `query` returns a cursor. Each
/// statement kind supports one mode or both; using the other one is an
/// [`Error::Unsupported`].

use crate::connection::Connection;
use crate::pagination::merge_pages;
use crate::result::ExecResult;
use crate::rows::Rows;
use crate::transaction::Admission;
use dynoql_core::convert::marshal_params;
use dynoql_core::dialect::{Dml, DmlKind, ExecMode, Statement};
use dynoql_core::store::{ExecuteStatementOutput, ExecuteStatementRequest, StoreResult};
use dynoql_core::{CallContext, Error, Result, StoreError, Value};
use tracing::debug;

pub(crate) async fn execute(
    conn: &Connection,
    ctx: &CallContext,
    stmt: &Statement,
    params: &[Value],
) -> Result<ExecResult> {
    if stmt.mode() == ExecMode::QueryOnly {
        return Err(Error::Unsupported(format!(
            "{} does not report affected rows, please use Query",
            stmt.kind()
        )));
    }
    debug!(kind = %stmt.kind(), "executing statement");

    let client = conn.client();
    match stmt {
        Statement::CreateTable(s) => ddl_outcome(
            ctx.run(client.create_table(s.request.clone())).await,
            s.if_not_exists,
            StoreError::is_resource_in_use,
        ),
        Statement::AlterTable(s) => {
            ddl_outcome(ctx.run(client.alter_table(s.request.clone())).await, false, never)
        }
        Statement::DropTable(s) => ddl_outcome(
            ctx.run(client.drop_table(&s.table_name)).await,
            s.if_exists,
            StoreError::is_resource_not_found,
        ),
        Statement::CreateGsi(s) => ddl_outcome(
            ctx.run(client.create_index(s.request.clone())).await,
            s.if_not_exists,
            |e| e.is_resource_in_use() || e.message().contains("already exist"),
        ),
        Statement::AlterGsi(s) => {
            ddl_outcome(ctx.run(client.alter_index(s.request.clone())).await, false, never)
        }
        Statement::DropGsi(s) => ddl_outcome(
            ctx.run(client.drop_index(s.request.clone())).await,
            s.if_exists,
            StoreError::is_resource_not_found,
        ),
        Statement::Dml(dml) => execute_dml(conn, ctx, dml, params).await,
        Statement::ListTables
        | Statement::DescribeTable(_)
        | Statement::DescribeLsi(_)
        | Statement::DescribeGsi(_) => Err(Error::Unsupported(format!(
            "{} does not report affected rows, please use Query",
            stmt.kind()
        ))),
    }
}

pub(crate) async fn query(
    conn: &Connection,
    ctx: &CallContext,
    stmt: &Statement,
    params: &[Value],
) -> Result<Rows> {
    if stmt.mode() == ExecMode::ExecOnly {
        return Err(Error::Unsupported(format!(
            "{} does not return rows, please use Exec",
            stmt.kind()
        )));
    }
    debug!(kind = %stmt.kind(), "querying statement");

    let client = conn.client();
    match stmt {
        Statement::ListTables => {
            let names = ctx.run(client.list_tables()).await?;
            Ok(Rows::from_table_names(names))
        }
        Statement::DescribeTable(s) => match ctx.run(client.describe_table(&s.table_name)).await {
            Ok(desc) => Rows::from_descriptor(&desc),
            Err(e) if e.is_resource_not_found() => Ok(Rows::empty()),
            Err(e) => Err(e.into()),
        },
        Statement::DescribeLsi(s) | Statement::DescribeGsi(s) => {
            let index = ctx
                .run(client.describe_index(&s.table_name, &s.index_name, s.scope))
                .await?;
            match index {
                Some(desc) => Rows::from_descriptor(&desc),
                None => Ok(Rows::empty()),
            }
        }
        Statement::Dml(dml) => query_dml(conn, ctx, dml, params).await,
        _ => Err(Error::Unsupported(format!(
            "{} does not return rows, please use Exec",
            stmt.kind()
        ))),
    }
}

fn never(_: &StoreError) -> bool {
    false
}

/// One row for a completed schema change, zero when an existence conflict
/// is tolerated by IF [NOT] EXISTS.
fn ddl_outcome(
    res: StoreResult<()>,
    tolerate: bool,
    is_conflict: fn(&StoreError) -> bool,
) -> Result<ExecResult> {
    match res {
        Ok(()) => Ok(ExecResult::affected(1)),
        Err(e) if tolerate && is_conflict(&e) => {
            debug!(code = e.code(), "existence conflict ignored");
            Ok(ExecResult::affected(0))
        }
        Err(e) => Err(e.into()),
    }
}

fn statement_request(dml: &Dml, params: &[Value]) -> Result<ExecuteStatementRequest> {
    let parameters = marshal_params(&dml.text, params)?;
    Ok(ExecuteStatementRequest::new(dml.text.clone())
        .with_parameters(parameters)
        .with_consistent_read(dml.consistent_read()))
}

/// Sends an UPDATE/DELETE; a failed condition means no row matched.
async fn send_change(
    conn: &Connection,
    ctx: &CallContext,
    request: ExecuteStatementRequest,
) -> Result<ExecuteStatementOutput> {
    match ctx.run(conn.client().execute_statement(request)).await {
        Ok(output) => Ok(output),
        Err(e) if e.is_conditional_check_failed() => {
            debug!("conditional check failed, no rows affected");
            Ok(ExecuteStatementOutput::default())
        }
        Err(e) => Err(e.into()),
    }
}

async fn execute_dml(
    conn: &Connection,
    ctx: &CallContext,
    dml: &Dml,
    params: &[Value],
) -> Result<ExecResult> {
    if let Admission::Queued(slot) = conn.coordinator().admit(dml, params)? {
        return Ok(ExecResult::queued(slot));
    }

    let request = statement_request(dml, params)?;
    match dml.kind {
        DmlKind::Insert => {
            ctx.run(conn.client().execute_statement(request)).await?;
            Ok(ExecResult::affected(1))
        }
        DmlKind::Update | DmlKind::Delete => {
            let output = send_change(conn, ctx, request).await?;
            Ok(ExecResult::affected(output.items.len() as i64))
        }
        DmlKind::Select => Err(Error::Unsupported(
            "SELECT does not report affected rows, please use Query".to_string(),
        )),
    }
}

async fn query_dml(
    conn: &Connection,
    ctx: &CallContext,
    dml: &Dml,
    params: &[Value],
) -> Result<Rows> {
    if let Admission::Queued(slot) = conn.coordinator().admit(dml, params)? {
        return Ok(Rows::pending(slot));
    }

    let request = statement_request(dml, params)?;
    match dml.kind {
        DmlKind::Select => {
            let output = merge_pages(conn.client().as_ref(), ctx, request, dml.limit)
                .await
                .map_err(|failure| failure.error)?;
            Ok(Rows::from_items(output.items))
        }
        DmlKind::Update | DmlKind::Delete => {
            let output = send_change(conn, ctx, request).await?;
            Ok(Rows::from_items(output.items))
        }
        DmlKind::Insert => Err(Error::Unsupported(
            "INSERT does not return rows, please use Exec".to_string(),
        )),
    }
}
