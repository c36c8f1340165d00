#![deny(missing_docs)]
//! The Budget Ledger — durable hierarchical accounting of cost
//! reservations and actuals across the thread tree (§4.2).
//!
//! Reserving before spawn prevents over-commitment when many children
//! launch in parallel; reporting actuals (typically less than the
//! reservation) returns unused budget to the parent so later siblings
//! can use it. The core invariant, checked in tests rather than enforced
//! by the type system: for every non-root thread,
//! `parent.committed + Σ child.reservations + parent.headroom == parent.limit`.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rye_core::id::{ReservationId, ThreadId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

/// Errors from budget ledger operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BudgetError {
    /// No account exists for the given thread.
    #[error("no budget account for thread: {0}")]
    NoAccount(String),

    /// The parent's remaining headroom is insufficient for the requested
    /// reservation.
    #[error("insufficient headroom: requested {requested}, available {available}")]
    InsufficientHeadroom {
        /// Amount requested.
        requested: Decimal,
        /// Amount actually available.
        available: Decimal,
    },

    /// The referenced reservation does not exist.
    #[error("reservation not found: {0}")]
    ReservationNotFound(String),

    /// The reservation is not in a state that allows this operation
    /// (e.g. reporting an already-released reservation).
    #[error("reservation {0} is in state {1:?}, cannot {2}")]
    InvalidState(String, ReservationState, &'static str),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Lifecycle state of a single reservation (§3).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationState {
    /// Reserved, child not yet reported its actual spend.
    Pending,
    /// Child reported its actual spend; committed to the parent.
    Reported,
    /// Released back to headroom without ever being spent (informational;
    /// in this ledger `released` and `reported` both free the
    /// reservation — `released` denotes a reservation closed at zero
    /// actual cost).
    Released,
    /// Child never started; reservation returned to headroom without
    /// touching `committed`.
    Forfeited,
}

/// A single parent-to-child budget reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    /// This reservation's id.
    pub id: ReservationId,
    /// The thread that reserved budget for a child.
    pub parent: ThreadId,
    /// The thread the reservation is for.
    pub child: ThreadId,
    /// Amount reserved at spawn time.
    pub reserved: Decimal,
    /// Amount actually reported, once the child completes.
    pub actual: Option<Decimal>,
    /// Current lifecycle state.
    pub state: ReservationState,
}

/// An account tracks one thread's limit, committed spend, and open
/// reservations against its children.
#[derive(Debug, Clone, Default)]
struct Account {
    limit: Decimal,
    committed: Decimal,
    reservations: HashMap<ReservationId, Reservation>,
}

impl Account {
    fn reserved_total(&self) -> Decimal {
        self.reservations
            .values()
            .filter(|r| r.state == ReservationState::Pending)
            .map(|r| r.reserved)
            .sum()
    }

    fn headroom(&self) -> Decimal {
        self.limit - self.committed - self.reserved_total()
    }
}

/// Hierarchical budget accounting (§4.2 contract).
///
/// Implementations:
/// - [`InMemoryLedger`]: `RwLock`-guarded `HashMap`, single process,
///   non-durable — used directly by `rye-orch` for in-process threads
///   and as the reference implementation for the invariants below.
#[async_trait]
pub trait BudgetLedger: Send + Sync {
    /// Open a new account for `thread` with the given spend limit. Root
    /// threads open an account with no parent; child accounts are opened
    /// independently of `reserve` (a thread has its own account once it
    /// exists, regardless of who reserved budget for it).
    async fn open_account(&self, thread: ThreadId, limit: Decimal) -> Result<(), BudgetError>;

    /// Atomically check-and-insert a reservation: succeeds only if
    /// `parent`'s headroom (`limit - committed - Σ pending reservations`)
    /// is at least `amount`.
    async fn reserve(
        &self,
        parent: &ThreadId,
        child: &ThreadId,
        amount: Decimal,
    ) -> Result<ReservationId, BudgetError>;

    /// Mark a reservation reported: increments the parent's committed
    /// spend by `actual`, and returns `reserved - actual` to the parent's
    /// headroom.
    async fn report(&self, reservation: &ReservationId, actual: Decimal) -> Result<(), BudgetError>;

    /// Release a reservation without ever incurring spend (the child
    /// never started) — frees the full reserved amount back to headroom
    /// without touching `committed`.
    async fn forfeit(&self, reservation: &ReservationId) -> Result<(), BudgetError>;

    /// Current headroom for a thread's account.
    async fn headroom(&self, thread: &ThreadId) -> Result<Decimal, BudgetError>;

    /// Current committed spend for a thread's account.
    async fn committed(&self, thread: &ThreadId) -> Result<Decimal, BudgetError>;
}

/// `RwLock`-guarded in-memory implementation of [`BudgetLedger`].
pub struct InMemoryLedger {
    accounts: RwLock<HashMap<String, Account>>,
    reservations_by_id: RwLock<HashMap<String, String>>,
    next_id: std::sync::atomic::AtomicU64,
}

impl InMemoryLedger {
    /// Create a new, empty ledger.
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            reservations_by_id: RwLock::new(HashMap::new()),
            next_id: std::sync::atomic::AtomicU64::new(0),
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BudgetLedger for InMemoryLedger {
    async fn open_account(&self, thread: ThreadId, limit: Decimal) -> Result<(), BudgetError> {
        let mut accounts = self.accounts.write().unwrap();
        accounts.entry(thread.to_string()).or_insert(Account {
            limit,
            committed: Decimal::ZERO,
            reservations: HashMap::new(),
        });
        Ok(())
    }

    async fn reserve(
        &self,
        parent: &ThreadId,
        child: &ThreadId,
        amount: Decimal,
    ) -> Result<ReservationId, BudgetError> {
        let mut accounts = self.accounts.write().unwrap();
        let account = accounts
            .get_mut(parent.as_str())
            .ok_or_else(|| BudgetError::NoAccount(parent.to_string()))?;

        let available = account.headroom();
        if amount > available {
            return Err(BudgetError::InsufficientHeadroom {
                requested: amount,
                available,
            });
        }

        let seq = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let id = ReservationId::new(format!("res-{parent}-{seq}"));
        account.reservations.insert(
            id.clone(),
            Reservation {
                id: id.clone(),
                parent: parent.clone(),
                child: child.clone(),
                reserved: amount,
                actual: None,
                state: ReservationState::Pending,
            },
        );
        self.reservations_by_id
            .write()
            .unwrap()
            .insert(id.to_string(), parent.to_string());
        Ok(id)
    }

    async fn report(&self, reservation: &ReservationId, actual: Decimal) -> Result<(), BudgetError> {
        let parent = self
            .reservations_by_id
            .read()
            .unwrap()
            .get(reservation.as_str())
            .cloned()
            .ok_or_else(|| BudgetError::ReservationNotFound(reservation.to_string()))?;

        let mut accounts = self.accounts.write().unwrap();
        let account = accounts
            .get_mut(&parent)
            .ok_or_else(|| BudgetError::NoAccount(parent.clone()))?;
        let record = account
            .reservations
            .get_mut(reservation)
            .ok_or_else(|| BudgetError::ReservationNotFound(reservation.to_string()))?;

        if record.state != ReservationState::Pending {
            return Err(BudgetError::InvalidState(
                reservation.to_string(),
                record.state,
                "report",
            ));
        }

        record.actual = Some(actual);
        record.state = ReservationState::Reported;
        account.committed += actual;
        Ok(())
    }

    async fn forfeit(&self, reservation: &ReservationId) -> Result<(), BudgetError> {
        let parent = self
            .reservations_by_id
            .read()
            .unwrap()
            .get(reservation.as_str())
            .cloned()
            .ok_or_else(|| BudgetError::ReservationNotFound(reservation.to_string()))?;

        let mut accounts = self.accounts.write().unwrap();
        let account = accounts
            .get_mut(&parent)
            .ok_or_else(|| BudgetError::NoAccount(parent.clone()))?;
        let record = account
            .reservations
            .get_mut(reservation)
            .ok_or_else(|| BudgetError::ReservationNotFound(reservation.to_string()))?;

        if record.state != ReservationState::Pending {
            return Err(BudgetError::InvalidState(
                reservation.to_string(),
                record.state,
                "forfeit",
            ));
        }

        record.state = ReservationState::Forfeited;
        Ok(())
    }

    async fn headroom(&self, thread: &ThreadId) -> Result<Decimal, BudgetError> {
        let accounts = self.accounts.read().unwrap();
        let account = accounts
            .get(thread.as_str())
            .ok_or_else(|| BudgetError::NoAccount(thread.to_string()))?;
        Ok(account.headroom())
    }

    async fn committed(&self, thread: &ThreadId) -> Result<Decimal, BudgetError> {
        let accounts = self.accounts.read().unwrap();
        let account = accounts
            .get(thread.as_str())
            .ok_or_else(|| BudgetError::NoAccount(thread.to_string()))?;
        Ok(account.committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn reserve_fails_when_exceeding_headroom() {
        let ledger = InMemoryLedger::new();
        let parent = ThreadId::new("p");
        ledger.open_account(parent.clone(), dec!(10.00)).await.unwrap();
        let err = ledger
            .reserve(&parent, &ThreadId::new("c1"), dec!(11.00))
            .await
            .unwrap_err();
        assert!(matches!(err, BudgetError::InsufficientHeadroom { .. }));
    }

    #[tokio::test]
    async fn report_returns_unused_reservation_to_headroom() {
        let ledger = InMemoryLedger::new();
        let parent = ThreadId::new("p");
        ledger.open_account(parent.clone(), dec!(10.00)).await.unwrap();
        let res_id = ledger
            .reserve(&parent, &ThreadId::new("c1"), dec!(5.00))
            .await
            .unwrap();
        assert_eq!(ledger.headroom(&parent).await.unwrap(), dec!(5.00));

        ledger.report(&res_id, dec!(2.00)).await.unwrap();
        assert_eq!(ledger.committed(&parent).await.unwrap(), dec!(2.00));
        assert_eq!(ledger.headroom(&parent).await.unwrap(), dec!(8.00));
    }

    #[tokio::test]
    async fn forfeit_frees_reservation_without_committing() {
        let ledger = InMemoryLedger::new();
        let parent = ThreadId::new("p");
        ledger.open_account(parent.clone(), dec!(10.00)).await.unwrap();
        let res_id = ledger
            .reserve(&parent, &ThreadId::new("c1"), dec!(5.00))
            .await
            .unwrap();
        ledger.forfeit(&res_id).await.unwrap();
        assert_eq!(ledger.committed(&parent).await.unwrap(), dec!(0));
        assert_eq!(ledger.headroom(&parent).await.unwrap(), dec!(10.00));
    }

    #[tokio::test]
    async fn invariant_holds_across_multiple_children() {
        let ledger = InMemoryLedger::new();
        let parent = ThreadId::new("p");
        let limit = dec!(100.00);
        ledger.open_account(parent.clone(), limit).await.unwrap();

        let r1 = ledger.reserve(&parent, &ThreadId::new("c1"), dec!(30.00)).await.unwrap();
        let r2 = ledger.reserve(&parent, &ThreadId::new("c2"), dec!(20.00)).await.unwrap();
        ledger.report(&r1, dec!(25.00)).await.unwrap();
        ledger.forfeit(&r2).await.unwrap();

        let committed = ledger.committed(&parent).await.unwrap();
        let headroom = ledger.headroom(&parent).await.unwrap();
        assert_eq!(committed + headroom, limit);
    }

    #[tokio::test]
    async fn double_report_is_rejected() {
        let ledger = InMemoryLedger::new();
        let parent = ThreadId::new("p");
        ledger.open_account(parent.clone(), dec!(10.00)).await.unwrap();
        let res_id = ledger.reserve(&parent, &ThreadId::new("c1"), dec!(5.00)).await.unwrap();
        ledger.report(&res_id, dec!(5.00)).await.unwrap();
        let err = ledger.report(&res_id, dec!(1.00)).await.unwrap_err();
        assert!(matches!(err, BudgetError::InvalidState(..)));
    }
}
