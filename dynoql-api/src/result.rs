/// Outcome of executing a statement for its affected-row count

use crate::transaction::{TxOutput, TxSlot};
use dynoql_core::{Error, Result};
use std::sync::Arc;

/// Where an [`ExecResult`] stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStatus {
    /// Ran immediately
    Done,
    /// Queued in a transaction that has not finished yet
    Queued,
    /// Queued, and its transaction committed
    Committed,
    /// Queued, and its transaction was rolled back or failed
    Discarded,
}

#[derive(Debug, Clone)]
enum Outcome {
    Done(i64),
    Queued(Arc<TxSlot>),
}

#[derive(Debug, Clone)]
pub struct ExecResult {
    outcome: Outcome,
}

impl ExecResult {
    pub(crate) fn affected(rows: i64) -> Self {
        Self {
            outcome: Outcome::Done(rows),
        }
    }

    pub(crate) fn queued(slot: Arc<TxSlot>) -> Self {
        Self {
            outcome: Outcome::Queued(slot),
        }
    }

    pub fn status(&self) -> ExecStatus {
        match &self.outcome {
            Outcome::Done(_) => ExecStatus::Done,
            Outcome::Queued(slot) if slot.is_waiting() => ExecStatus::Queued,
            Outcome::Queued(slot) if slot.is_discarded() => ExecStatus::Discarded,
            Outcome::Queued(_) => ExecStatus::Committed,
        }
    }

    pub fn is_queued(&self) -> bool {
        matches!(self.outcome, Outcome::Queued(_))
    }

    /// Number of rows the statement affected.
    ///
    /// A statement queued in a transaction counts as one row once the
    /// transaction commits.
    pub fn rows_affected(&self) -> Result<i64> {
        match &self.outcome {
            Outcome::Done(rows) => Ok(*rows),
            Outcome::Queued(slot) => slot.output().map(|_| 1),
        }
    }

    /// The store has no generated numeric ids.
    pub fn last_insert_id(&self) -> Result<i64> {
        Err(Error::Unsupported("last insert id".to_string()))
    }

    /// Per-statement output of a committed transaction.
    pub fn tx_output(&self) -> Result<Option<TxOutput>> {
        match &self.outcome {
            Outcome::Done(_) => Ok(None),
            Outcome::Queued(slot) => slot.output().map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_result() {
        let res = ExecResult::affected(0);
        assert_eq!(res.status(), ExecStatus::Done);
        assert_eq!(res.rows_affected().unwrap(), 0);
        assert!(res.tx_output().unwrap().is_none());
        assert!(matches!(res.last_insert_id(), Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_queued_result_follows_slot() {
        let slot = TxSlot::new();
        let res = ExecResult::queued(slot.clone());
        assert!(res.is_queued());
        assert_eq!(res.status(), ExecStatus::Queued);
        assert!(matches!(res.rows_affected(), Err(Error::InTransaction)));

        slot.fill(TxOutput::default());
        assert_eq!(res.status(), ExecStatus::Committed);
        assert_eq!(res.rows_affected().unwrap(), 1);

        let slot = TxSlot::new();
        let res = ExecResult::queued(slot.clone());
        slot.discard();
        assert_eq!(res.status(), ExecStatus::Discarded);
        assert!(matches!(res.rows_affected(), Err(Error::NoResult)));
    }
}
