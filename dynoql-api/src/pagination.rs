/// Merges paged SELECT output into one result

use dynoql_core::store::{ExecuteStatementOutput, ExecuteStatementRequest};
use dynoql_core::{CallContext, Error, StoreClient};
use tracing::debug;

/// A page request failed part way through.
#[derive(thiserror::Error, Debug)]
#[error("{error}")]
pub struct PageFailure {
    /// Pages merged before the failure
    pub partial: ExecuteStatementOutput,
    #[source]
    pub error: Error,
}

/// Fetches pages until the store stops returning a continuation token or
/// `limit` items have been collected.
///
/// The first page is the accumulator; later pages append their items and
/// replace its continuation token, last evaluated key, consumed capacity
/// and metadata. With a limit, each request asks for no more than the
/// remaining count and the result is truncated to exactly `limit`.
pub async fn merge_pages(
    client: &dyn StoreClient,
    ctx: &CallContext,
    mut request: ExecuteStatementRequest,
    limit: Option<i32>,
) -> Result<ExecuteStatementOutput, PageFailure> {
    let limit = limit.and_then(|l| usize::try_from(l).ok()).filter(|l| *l > 0);
    if let Some(limit) = limit {
        request.limit = Some(clamp(limit));
    }

    let mut merged: Option<ExecuteStatementOutput> = None;
    let mut pages = 0usize;

    loop {
        let page = match ctx.run(client.execute_statement(request.clone())).await {
            Ok(page) => page,
            Err(e) => {
                debug!(pages, "page request failed: {}", e);
                return Err(PageFailure {
                    partial: merged.unwrap_or_default(),
                    error: e.into(),
                });
            }
        };
        pages += 1;

        let mut acc = match merged.take() {
            None => page,
            Some(mut acc) => {
                acc.items.extend(page.items);
                acc.next_token = page.next_token;
                acc.last_evaluated_key = page.last_evaluated_key;
                acc.consumed_capacity = page.consumed_capacity;
                acc.metadata = page.metadata;
                acc
            }
        };

        if let Some(limit) = limit {
            if acc.items.len() >= limit {
                acc.items.truncate(limit);
                debug!(pages, items = acc.items.len(), "row limit reached");
                return Ok(acc);
            }
            request.limit = Some(clamp(limit - acc.items.len()));
        }

        match acc.next_token.clone() {
            Some(token) if !token.is_empty() => {
                request.next_token = Some(token);
                merged = Some(acc);
            }
            _ => {
                debug!(pages, items = acc.items.len(), "all pages fetched");
                return Ok(acc);
            }
        }
    }
}

fn clamp(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}
