//! Client mirror of the backend ledger.
//!
//! The ledger keeps the last state confirmed by the backend and, on top of
//! it, the optimistic deltas applied locally since. The displayed balance is
//! always `confirmed + pending`. A delta is stamped with the ticket of the
//! first sync request that carried it, which is what lets a failed sync
//! roll back exactly its own deltas.

use crate::amount::Amount;
use std::fmt;

/// Sequence number of an outgoing sync request.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SyncTicket(u64);

impl SyncTicket {
    pub const fn new(value: u64) -> Self {
        SyncTicket(value)
    }

    pub fn next(self) -> Self {
        SyncTicket(self.0 + 1)
    }
}

impl fmt::Display for SyncTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LedgerState {
    pub balance: Amount,
    pub referral_earnings: Amount,
    pub referrals: Vec<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeltaKind {
    Reward,
    /// Referral earnings moved into the balance.
    ReferralCommission,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct PendingDelta {
    kind: DeltaKind,
    amount: Amount,
    carried_by: Option<SyncTicket>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CommissionClaim {
    Claimed(Amount),
    NothingToClaim,
}

#[derive(Clone, Debug)]
pub struct Ledger {
    confirmed: LedgerState,
    pending: Vec<PendingDelta>,
    claim_unit_reward: Amount,
}

impl Ledger {
    pub fn new(claim_unit_reward: Amount) -> Self {
        Ledger {
            confirmed: LedgerState::default(),
            pending: Vec::new(),
            claim_unit_reward,
        }
    }

    pub fn balance(&self) -> Amount {
        self.confirmed.balance + self.pending_total()
    }

    pub fn confirmed_balance(&self) -> Amount {
        self.confirmed.balance
    }

    pub fn pending_total(&self) -> Amount {
        self.pending.iter().map(|delta| delta.amount).sum()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn referral_earnings(&self) -> Amount {
        self.confirmed.referral_earnings
    }

    pub fn referrals(&self) -> &[String] {
        &self.confirmed.referrals
    }

    pub fn claim_unit_reward(&self) -> Amount {
        self.claim_unit_reward
    }

    /// State as the client currently sees it, pending deltas included.
    pub fn view(&self) -> LedgerState {
        LedgerState {
            balance: self.balance(),
            ..self.confirmed.clone()
        }
    }

    pub fn apply_optimistic(&mut self, delta: Amount) {
        self.push(DeltaKind::Reward, delta);
    }

    /// Replaces the confirmed state and drops every pending delta.
    pub fn reconcile(&mut self, state: LedgerState) {
        self.confirmed = state;
        self.pending.clear();
    }

    /// Replaces the confirmed state with the response to `ticket`. Deltas
    /// carried by `ticket` or an earlier request are now part of the server
    /// state; later ones stay pending. The server's referral earnings do not
    /// know about commission moves still pending, so those are taken out
    /// again.
    pub fn reconcile_through(&mut self, ticket: SyncTicket, state: LedgerState) {
        self.confirmed = state;
        self.pending
            .retain(|delta| delta.carried_by.is_none_or(|carrier| carrier > ticket));
        let moved = self.pending_commission();
        self.confirmed.referral_earnings =
            self.confirmed.referral_earnings.saturating_sub(moved);
    }

    /// Stamps every delta not yet sent with `ticket`.
    pub fn mark_sent(&mut self, ticket: SyncTicket) {
        for delta in self.pending.iter_mut().filter(|d| d.carried_by.is_none()) {
            delta.carried_by = Some(ticket);
        }
    }

    /// Undoes the deltas first carried by `ticket`. Returns the amount
    /// removed from the balance.
    pub fn rollback(&mut self, ticket: SyncTicket) -> Amount {
        let mut removed = Amount::ZERO;
        let mut restored_earnings = Amount::ZERO;
        self.pending.retain(|delta| {
            if delta.carried_by != Some(ticket) {
                return true;
            }
            removed += delta.amount;
            if delta.kind == DeltaKind::ReferralCommission {
                restored_earnings += delta.amount;
            }
            false
        });
        self.confirmed.referral_earnings += restored_earnings;
        removed
    }

    /// Moves all referral earnings into the balance. Not synced by itself;
    /// the move rides along with the next outgoing request.
    pub fn claim_referral_commission(&mut self) -> CommissionClaim {
        let earnings = self.confirmed.referral_earnings;
        if earnings.is_zero() {
            return CommissionClaim::NothingToClaim;
        }
        self.confirmed.referral_earnings = Amount::ZERO;
        self.push(DeltaKind::ReferralCommission, earnings);
        CommissionClaim::Claimed(earnings)
    }

    fn pending_commission(&self) -> Amount {
        self.pending
            .iter()
            .filter(|delta| delta.kind == DeltaKind::ReferralCommission)
            .map(|delta| delta.amount)
            .sum()
    }

    fn push(&mut self, kind: DeltaKind, amount: Amount) {
        if amount.is_zero() {
            return;
        }
        self.pending.push(PendingDelta {
            kind,
            amount,
            carried_by: None,
        });
    }
}
