/// Session-scoped transaction batching
///
/// While a transaction is open, item statements are not sent: each one is
/// captured with its parameters and a result slot, and the whole list is
/// submitted as one atomic request at commit. Results are handed back
/// through the slots, positionally.

use crate::connection::Connection;
use dynoql_core::convert::marshal_params;
use dynoql_core::dialect::{Dml, DmlKind};
use dynoql_core::store::{ConsumedCapacity, ParameterizedStatement, ResponseMetadata};
use dynoql_core::{CallContext, Error, Item, Result, StoreClient, Value};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the store returned for one statement of a committed transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TxOutput {
    /// Item returned for this statement, if any
    pub item: Option<Item>,
    pub consumed_capacity: Option<ConsumedCapacity>,
    pub metadata: ResponseMetadata,
}

#[derive(Debug)]
enum SlotState {
    Waiting,
    Filled(TxOutput),
    Discarded,
}

/// Result holder shared between a queued statement and the commit.
#[derive(Debug)]
pub struct TxSlot {
    state: Mutex<SlotState>,
}

impl TxSlot {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SlotState::Waiting),
        })
    }

    /// Stores the output. A slot is filled or discarded at most once.
    pub(crate) fn fill(&self, output: TxOutput) {
        let mut state = self.state.lock();
        if matches!(*state, SlotState::Waiting) {
            *state = SlotState::Filled(output);
        }
    }

    pub(crate) fn discard(&self) {
        let mut state = self.state.lock();
        if matches!(*state, SlotState::Waiting) {
            *state = SlotState::Discarded;
        }
    }

    pub fn is_waiting(&self) -> bool {
        matches!(*self.state.lock(), SlotState::Waiting)
    }

    pub fn is_discarded(&self) -> bool {
        matches!(*self.state.lock(), SlotState::Discarded)
    }

    /// Output of the statement once its transaction has committed.
    ///
    /// Fails with [`Error::InTransaction`] while the transaction is still
    /// pending and with [`Error::NoResult`] after a rollback or failed commit.
    pub fn output(&self) -> Result<TxOutput> {
        match &*self.state.lock() {
            SlotState::Waiting => Err(Error::InTransaction),
            SlotState::Filled(output) => Ok(output.clone()),
            SlotState::Discarded => Err(Error::NoResult),
        }
    }
}

struct PendingEntry {
    statement: String,
    params: Vec<Value>,
    slot: Arc<TxSlot>,
}

enum TxState {
    Idle,
    Open { id: u64, pending: Vec<PendingEntry> },
    Committing { id: u64 },
}

/// How an item statement should run given the transaction state.
pub(crate) enum Admission {
    /// No transaction: send it now
    Direct,
    /// Captured into the open transaction
    Queued(Arc<TxSlot>),
}

/// Per-connection transaction state machine.
pub(crate) struct Coordinator {
    state: Mutex<TxState>,
    next_id: AtomicU64,
}

impl Coordinator {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(TxState::Idle),
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn begin(&self) -> Result<u64> {
        let mut state = self.state.lock();
        match &*state {
            TxState::Idle => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                *state = TxState::Open {
                    id,
                    pending: Vec::new(),
                };
                debug!(tx = id, "transaction started");
                Ok(id)
            }
            TxState::Open { .. } | TxState::Committing { .. } => Err(Error::InTransaction),
        }
    }

    /// Id of the open transaction, if any.
    pub(crate) fn current(&self) -> Option<u64> {
        match &*self.state.lock() {
            TxState::Open { id, .. } => Some(*id),
            _ => None,
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        !matches!(*self.state.lock(), TxState::Idle)
    }

    /// Decides whether `dml` runs now or is queued. Queuing happens under the
    /// same lock as the state check.
    pub(crate) fn admit(&self, dml: &Dml, params: &[Value]) -> Result<Admission> {
        let mut state = self.state.lock();
        match &mut *state {
            TxState::Idle => Ok(Admission::Direct),
            TxState::Committing { .. } => Err(Error::InvalidTxStage),
            TxState::Open { .. } if dml.kind == DmlKind::Select => Err(Error::Unsupported(
                "SELECT inside a transaction".to_string(),
            )),
            TxState::Open { id, pending } => {
                let slot = TxSlot::new();
                pending.push(PendingEntry {
                    statement: dml.tx_text.clone(),
                    params: params.to_vec(),
                    slot: slot.clone(),
                });
                debug!(tx = *id, position = pending.len(), "statement queued");
                Ok(Admission::Queued(slot))
            }
        }
    }

    /// Moves transaction `id` to Committing and hands over its pending list.
    fn start_commit(&self, id: u64) -> Result<Vec<PendingEntry>> {
        let mut state = self.state.lock();
        match &mut *state {
            TxState::Open { id: current, pending } if *current == id => {
                let pending = std::mem::take(pending);
                *state = TxState::Committing { id };
                Ok(pending)
            }
            TxState::Committing { id: current } if *current == id => Err(Error::TxCommitting),
            _ => Err(Error::NoTransaction),
        }
    }

    fn finish(&self) {
        *self.state.lock() = TxState::Idle;
    }

    pub(crate) async fn commit(
        &self,
        client: &dyn StoreClient,
        ctx: &CallContext,
        id: u64,
    ) -> Result<()> {
        let pending = self.start_commit(id)?;
        // Resets the state and discards unfilled slots on every exit path,
        // including the future being dropped mid-request.
        let _guard = CommitGuard {
            coordinator: self,
            slots: pending.iter().map(|e| e.slot.clone()).collect(),
        };

        if pending.is_empty() {
            debug!(tx = id, "empty transaction committed");
            return Ok(());
        }

        let mut statements = Vec::with_capacity(pending.len());
        for entry in &pending {
            let parameters = marshal_params(&entry.statement, &entry.params)?;
            statements.push(ParameterizedStatement {
                statement: entry.statement.clone(),
                parameters,
            });
        }

        let output = match ctx.run(client.execute_transaction(statements)).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tx = id, code = e.code(), "transaction failed: {}", e);
                return Err(e.into());
            }
        };

        for (i, entry) in pending.iter().enumerate() {
            entry.slot.fill(TxOutput {
                item: output.responses.get(i).and_then(|r| r.item.clone()),
                consumed_capacity: output.consumed_capacity.get(i).cloned(),
                metadata: output.metadata.clone(),
            });
        }

        info!(tx = id, statements = pending.len(), "transaction committed");
        Ok(())
    }

    pub(crate) fn rollback(&self, id: u64) -> Result<()> {
        let pending = {
            let mut state = self.state.lock();
            match &mut *state {
                TxState::Open { id: current, pending } if *current == id => {
                    let pending = std::mem::take(pending);
                    *state = TxState::Idle;
                    pending
                }
                TxState::Committing { id: current } if *current == id => {
                    return Err(Error::TxCommitting)
                }
                _ => return Err(Error::NoTransaction),
            }
        };

        for entry in &pending {
            entry.slot.discard();
        }
        debug!(tx = id, discarded = pending.len(), "transaction rolled back");
        Ok(())
    }
}

struct CommitGuard<'a> {
    coordinator: &'a Coordinator,
    slots: Vec<Arc<TxSlot>>,
}

impl Drop for CommitGuard<'_> {
    fn drop(&mut self) {
        for slot in &self.slots {
            slot.discard();
        }
        self.coordinator.finish();
    }
}

/// Handle to the transaction open on a connection.
///
/// Cloned handles refer to the same transaction. Once it is committed or
/// rolled back every handle is stale and further calls fail with
/// [`Error::NoTransaction`].
#[derive(Clone)]
pub struct Transaction {
    conn: Connection,
    id: u64,
}

impl Transaction {
    pub(crate) fn new(conn: Connection, id: u64) -> Self {
        Self { conn, id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Submits every queued statement as one atomic request.
    pub async fn commit(&self) -> Result<()> {
        self.commit_with(&self.conn.call_context()).await
    }

    pub async fn commit_with(&self, ctx: &CallContext) -> Result<()> {
        let client = self.conn.client().clone();
        self.conn
            .coordinator()
            .commit(client.as_ref(), ctx, self.id)
            .await
    }

    /// Drops every queued statement. Never contacts the store.
    pub fn rollback(&self) -> Result<()> {
        self.conn.coordinator().rollback(self.id)
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynoql_core::dialect::{parse, Statement};

    fn dml(text: &str) -> Dml {
        match parse(text).unwrap() {
            Statement::Dml(dml) => dml,
            other => panic!("not an item statement: {:?}", other),
        }
    }

    #[test]
    fn test_slot_states() {
        let slot = TxSlot::new();
        assert!(matches!(slot.output(), Err(Error::InTransaction)));

        slot.fill(TxOutput::default());
        assert_eq!(slot.output().unwrap(), TxOutput::default());

        // filled slots are final
        slot.discard();
        assert!(slot.output().is_ok());

        let slot = TxSlot::new();
        slot.discard();
        assert!(matches!(slot.output(), Err(Error::NoResult)));
    }

    #[test]
    fn test_begin_twice_fails() {
        let coord = Coordinator::new();
        let id = coord.begin().unwrap();
        assert_eq!(coord.current(), Some(id));
        assert!(matches!(coord.begin(), Err(Error::InTransaction)));
    }

    #[test]
    fn test_admit_queues_while_open() {
        let coord = Coordinator::new();
        let insert = dml(r#"INSERT INTO "t" VALUE {'id': ?}"#);
        assert!(matches!(coord.admit(&insert, &[Value::from(1)]), Ok(Admission::Direct)));

        coord.begin().unwrap();
        let slot = match coord.admit(&insert, &[Value::from(1)]).unwrap() {
            Admission::Queued(slot) => slot,
            Admission::Direct => panic!("expected the statement to be queued"),
        };
        assert!(slot.is_waiting());

        let select = dml(r#"SELECT * FROM "t""#);
        assert!(matches!(coord.admit(&select, &[]), Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_rollback_discards_slots() {
        let coord = Coordinator::new();
        let id = coord.begin().unwrap();
        let slot = match coord.admit(&dml(r#"DELETE FROM "t" WHERE id=1"#), &[]).unwrap() {
            Admission::Queued(slot) => slot,
            Admission::Direct => panic!("expected the statement to be queued"),
        };

        coord.rollback(id).unwrap();
        assert!(slot.is_discarded());
        assert!(!coord.is_active());
        assert!(matches!(coord.rollback(id), Err(Error::NoTransaction)));
    }

    #[test]
    fn test_stale_id_is_rejected() {
        let coord = Coordinator::new();
        let old = coord.begin().unwrap();
        coord.rollback(old).unwrap();
        let new = coord.begin().unwrap();
        assert_ne!(old, new);
        assert!(matches!(coord.rollback(old), Err(Error::NoTransaction)));
        assert_eq!(coord.current(), Some(new));
    }

    #[test]
    fn test_committing_stage_rules() {
        let coord = Coordinator::new();
        let id = coord.begin().unwrap();
        let pending = coord.start_commit(id).unwrap();
        assert!(pending.is_empty());

        let insert = dml(r#"INSERT INTO "t" VALUE {'id': 1}"#);
        assert!(matches!(coord.admit(&insert, &[]), Err(Error::InvalidTxStage)));
        assert!(matches!(coord.rollback(id), Err(Error::TxCommitting)));
        assert!(matches!(coord.start_commit(id), Err(Error::TxCommitting)));
        assert!(coord.current().is_none());

        coord.finish();
        assert!(!coord.is_active());
    }
}
