/// Polling until a table or index reaches a status
///
/// Schema changes complete asynchronously in the store. These helpers poll
/// the description until the status is one of the wanted values. A missing
/// table or index reports the empty status `""`, so waiting for deletion
/// means waiting for `""`.

use crate::connection::Connection;
use dynoql_core::schema::IndexScope;
use dynoql_core::{CallContext, Result};
use std::time::Duration;
use tracing::debug;

fn is_wanted(status: &str, wanted: &[&str]) -> bool {
    wanted.iter().any(|w| w.eq_ignore_ascii_case(status))
}

/// Waits until `table` has one of the `wanted` statuses and returns it.
///
/// Bounded only by `ctx`; without a deadline or cancel signal this polls
/// until the status matches.
pub async fn wait_for_table_status(
    conn: &Connection,
    ctx: &CallContext,
    table: &str,
    wanted: &[&str],
    poll: Duration,
) -> Result<String> {
    loop {
        let status = match ctx.run(conn.client().describe_table(table)).await {
            Ok(desc) => desc.table_status.unwrap_or_default(),
            Err(e) if e.is_resource_not_found() => String::new(),
            Err(e) => return Err(e.into()),
        };
        if is_wanted(&status, wanted) {
            return Ok(status);
        }
        debug!(table, status = %status, "waiting for table status");
        ctx.sleep(poll).await?;
    }
}

/// Waits until global secondary index `index` on `table` has one of the
/// `wanted` statuses and returns it.
pub async fn wait_for_gsi_status(
    conn: &Connection,
    ctx: &CallContext,
    table: &str,
    index: &str,
    wanted: &[&str],
    poll: Duration,
) -> Result<String> {
    loop {
        let status = match ctx
            .run(conn.client().describe_index(table, index, IndexScope::Global))
            .await
        {
            Ok(Some(desc)) => desc.index_status.unwrap_or_default(),
            Ok(None) => String::new(),
            Err(e) if e.is_resource_not_found() => String::new(),
            Err(e) => return Err(e.into()),
        };
        if is_wanted(&status, wanted) {
            return Ok(status);
        }
        debug!(table, index, status = %status, "waiting for index status");
        ctx.sleep(poll).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_match_ignores_case() {
        assert!(is_wanted("ACTIVE", &["active"]));
        assert!(is_wanted("", &["", "DELETING"]));
        assert!(!is_wanted("CREATING", &["ACTIVE"]));
    }
}
