use crate::{
    amount::Amount,
    ledger::{
        CommissionClaim,
        Ledger,
        SyncTicket,
    },
    referral::{
        Clipboard,
        DEFAULT_REFERRAL_BASE_URL,
        generate_referral_link,
    },
    rules::ClaimRules,
    slots::{
        ClaimSlot,
        CooldownChange,
        SlotId,
        SlotState,
        SlotTick,
    },
    sync::{
        ServerSnapshot,
        SyncError,
        SyncOutcome,
        SyncRequest,
        SyncResponse,
    },
    withdrawal::{
        WithdrawalError,
        WithdrawalRequest,
    },
};
use chrono::{
    DateTime,
    Local,
};
use std::collections::BTreeMap;
use tracing::{
    debug,
    error,
    info,
    warn,
};

pub const DEFAULT_AD_SLOTS: usize = 4;
const MAX_ERRORS: usize = 50;

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub ad_slots: usize,
    pub rules: ClaimRules,
    pub referral_base_url: String,
    pub rollback_on_failure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            ad_slots: DEFAULT_AD_SLOTS,
            rules: ClaimRules::default(),
            referral_base_url: DEFAULT_REFERRAL_BASE_URL.to_string(),
            rollback_on_failure: true,
        }
    }
}

/// Work the event loop has to carry out after a session transition.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    StartTimer { slot: SlotId, seconds: u64 },
    StopTimer { slot: SlotId },
    Sync { ticket: SyncTicket, request: SyncRequest },
}

#[derive(Clone, Debug)]
enum SyncPurpose {
    Claim(SlotId),
    Withdrawal(WithdrawalRequest),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notice {
    pub at: DateTime<Local>,
    pub message: String,
}

/// Read-only view handed to the renderer.
#[derive(Clone, Debug)]
pub struct SessionSnapshot {
    pub balance: Amount,
    pub pending: Amount,
    pub referral_earnings: Amount,
    pub referrals: Vec<String>,
    pub ads: Vec<ClaimSlot>,
    pub daily: ClaimSlot,
    pub referral_link: String,
    pub status: String,
    pub withdraw_status: Option<String>,
    pub errors: Vec<Notice>,
    pub syncs_in_flight: usize,
}

/// Owns all client state. Transitions that need timers or network return
/// that work as [`Effect`]s instead of doing it.
#[derive(Debug)]
pub struct Session {
    rules: ClaimRules,
    ledger: Ledger,
    ads: Vec<ClaimSlot>,
    daily: ClaimSlot,
    referral_base_url: String,
    referral_link: String,
    next_ticket: SyncTicket,
    last_reconciled: Option<SyncTicket>,
    in_flight: BTreeMap<SyncTicket, SyncPurpose>,
    rollback_on_failure: bool,
    status: String,
    withdraw_status: Option<String>,
    errors: Vec<Notice>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let link = generate_referral_link(&config.referral_base_url, &mut rand::rng());
        Self::with_referral_link(config, link)
    }

    pub fn with_referral_link(config: SessionConfig, referral_link: String) -> Self {
        Session {
            rules: config.rules,
            ledger: Ledger::new(config.rules.ad_reward),
            ads: (0..config.ad_slots).map(ClaimSlot::ad).collect(),
            daily: ClaimSlot::daily(),
            referral_base_url: config.referral_base_url,
            referral_link,
            next_ticket: SyncTicket::new(1),
            last_reconciled: None,
            in_flight: BTreeMap::new(),
            rollback_on_failure: config.rollback_on_failure,
            status: String::from("Ready"),
            withdraw_status: None,
            errors: Vec::new(),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn slot(&self, id: SlotId) -> Option<&ClaimSlot> {
        match id {
            SlotId::Ad(index) => self.ads.get(index),
            SlotId::Daily => Some(&self.daily),
        }
    }

    pub fn ad_count(&self) -> usize {
        self.ads.len()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn withdraw_status(&self) -> Option<&str> {
        self.withdraw_status.as_deref()
    }

    pub fn errors(&self) -> &[Notice] {
        &self.errors
    }

    pub fn referral_link(&self) -> &str {
        &self.referral_link
    }

    pub fn syncs_in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// The ad button: arms an idle slot, claims an armed one, and is ignored
    /// while the slot is claimed or cooling down.
    pub fn press_ad(&mut self, index: usize) -> Vec<Effect> {
        let Some(slot) = self.ads.get(index) else {
            return Vec::new();
        };
        match slot.state() {
            SlotState::Idle => {
                self.arm(index);
                Vec::new()
            }
            SlotState::Armed => self.claim(SlotId::Ad(index)),
            SlotState::Claimed | SlotState::Cooldown(_) => {
                debug!(slot = index, "ad button pressed while disabled");
                Vec::new()
            }
        }
    }

    pub fn arm(&mut self, index: usize) -> bool {
        let Some(slot) = self.ads.get_mut(index) else {
            return false;
        };
        if !slot.arm() {
            debug!(slot = index, state = ?slot.state(), "arm ignored");
            return false;
        }
        self.status = format!("Ad {} watched. Claim your reward!", index + 1);
        true
    }

    pub fn claim(&mut self, id: SlotId) -> Vec<Effect> {
        let rules = self.rules;
        let Some(slot) = self.slot_mut(id) else {
            return Vec::new();
        };
        let Some(claim) = slot.claim(&rules) else {
            debug!(slot = %id, "claim ignored; slot not claimable");
            return Vec::new();
        };
        self.ledger.apply_optimistic(claim.reward);
        self.status = format!("Claimed {} from {}", claim.reward, id);
        info!(slot = %id, reward = %claim.reward, "reward claimed");

        let mut effects = Vec::with_capacity(2);
        if claim.cooldown_secs > 0 {
            effects.push(Effect::StartTimer {
                slot: id,
                seconds: claim.cooldown_secs,
            });
        }
        effects.push(self.dispatch(SyncPurpose::Claim(id)));
        effects
    }

    pub fn claim_daily(&mut self) -> Vec<Effect> {
        self.claim(SlotId::Daily)
    }

    /// One second of cooldown for `id`.
    pub fn tick(&mut self, id: SlotId) -> Vec<Effect> {
        let Some(slot) = self.slot_mut(id) else {
            return Vec::new();
        };
        match slot.tick() {
            SlotTick::Ready => {
                self.status = format!("You can claim {id} now!");
                vec![Effect::StopTimer { slot: id }]
            }
            SlotTick::Running(_) | SlotTick::Inactive => Vec::new(),
        }
    }

    pub fn complete_cooldown(&mut self, id: SlotId) -> Vec<Effect> {
        let Some(slot) = self.slot_mut(id) else {
            return Vec::new();
        };
        if slot.finish_cooldown() {
            self.status = format!("You can claim {id} now!");
        }
        vec![Effect::StopTimer { slot: id }]
    }

    pub fn claim_referral_commission(&mut self) -> CommissionClaim {
        let outcome = self.ledger.claim_referral_commission();
        self.status = match outcome {
            CommissionClaim::Claimed(amount) => {
                info!(%amount, "referral commission moved to balance");
                String::from("Referral commission claimed successfully!")
            }
            CommissionClaim::NothingToClaim => String::from("No referral commission available."),
        };
        outcome
    }

    pub fn submit_withdrawal(
        &mut self,
        amount: &str,
        address: &str,
    ) -> Result<Vec<Effect>, WithdrawalError> {
        let validated = WithdrawalRequest::validate(
            amount,
            address,
            self.ledger.balance(),
            self.rules.min_withdrawal,
        );
        match validated {
            Ok(request) => {
                self.withdraw_status = Some(format!(
                    "Submitting withdrawal of ${}...",
                    request.amount().to_plain_string()
                ));
                Ok(vec![self.dispatch(SyncPurpose::Withdrawal(request))])
            }
            Err(err) => {
                debug!(error = %err, "withdrawal rejected locally");
                self.withdraw_status = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Overwrites ledger and daily cooldown with `snapshot`.
    pub fn reconcile(&mut self, snapshot: ServerSnapshot) -> Vec<Effect> {
        self.ledger.reconcile(snapshot.ledger);
        self.sync_daily(snapshot.daily_claim_time_remaining)
    }

    pub fn apply_sync_outcome(&mut self, outcome: SyncOutcome) -> Vec<Effect> {
        let SyncOutcome { ticket, result } = outcome;
        let purpose = self.in_flight.remove(&ticket);
        match result {
            Ok(response) => self.apply_response(ticket, purpose, response),
            Err(err) => self.apply_failure(ticket, purpose, &err),
        }
    }

    pub fn regenerate_referral_link(&mut self) -> &str {
        self.referral_link =
            generate_referral_link(&self.referral_base_url, &mut rand::rng());
        self.status = String::from("New referral link generated.");
        &self.referral_link
    }

    pub fn copy_referral_link(&mut self, clipboard: &mut impl Clipboard) -> bool {
        match clipboard.write_text(&self.referral_link) {
            Ok(()) => {
                self.status = String::from("Referral link copied to clipboard!");
                true
            }
            Err(err) => {
                warn!(error = %err, "copying referral link failed");
                self.status = String::from("Could not copy referral link.");
                self.push_error(err.to_string());
                false
            }
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            balance: self.ledger.balance(),
            pending: self.ledger.pending_total(),
            referral_earnings: self.ledger.referral_earnings(),
            referrals: self.ledger.referrals().to_vec(),
            ads: self.ads.clone(),
            daily: self.daily,
            referral_link: self.referral_link.clone(),
            status: self.status.clone(),
            withdraw_status: self.withdraw_status.clone(),
            errors: self.errors.iter().rev().take(5).cloned().collect(),
            syncs_in_flight: self.in_flight.len(),
        }
    }

    fn apply_response(
        &mut self,
        ticket: SyncTicket,
        purpose: Option<SyncPurpose>,
        response: SyncResponse,
    ) -> Vec<Effect> {
        if let Some(SyncPurpose::Withdrawal(request)) = &purpose {
            self.withdraw_status = Some(request.pending_message());
        }
        if self.last_reconciled.is_some_and(|last| last >= ticket) {
            warn!(%ticket, "ignoring stale sync response");
            return Vec::new();
        }
        let snapshot = response.into_snapshot(self.server_view());
        self.ledger.reconcile_through(ticket, snapshot.ledger);
        self.last_reconciled = Some(ticket);
        if let Some(SyncPurpose::Claim(slot)) = purpose {
            debug!(%ticket, %slot, "claim confirmed");
        }
        info!(%ticket, balance = %self.ledger.balance(), "ledger reconciled");
        self.sync_daily(snapshot.daily_claim_time_remaining)
    }

    fn apply_failure(
        &mut self,
        ticket: SyncTicket,
        purpose: Option<SyncPurpose>,
        err: &SyncError,
    ) -> Vec<Effect> {
        error!(%ticket, error = %err, "sync failed");
        let mut effects = Vec::new();
        if self.rollback_on_failure {
            let removed = self.ledger.rollback(ticket);
            if !removed.is_zero() {
                warn!(%ticket, amount = %removed, "rolled back optimistic credit");
            }
            // A claim whose credit was undone must be claimable again.
            if let Some(SyncPurpose::Claim(slot)) = &purpose {
                effects.extend(self.release_slot(*slot));
            }
        }
        if let Some(SyncPurpose::Withdrawal(request)) = purpose {
            self.withdraw_status = Some(format!(
                "Withdrawal of ${} could not be submitted.",
                request.amount().to_plain_string()
            ));
        }
        self.status = String::from("Sync failed; see errors below.");
        self.push_error(format!("sync {ticket} failed: {err}"));
        effects
    }

    fn release_slot(&mut self, id: SlotId) -> Option<Effect> {
        let slot = self.slot_mut(id)?;
        if !slot.finish_cooldown() {
            return None;
        }
        debug!(slot = %id, "cooldown released after failed claim sync");
        Some(Effect::StopTimer { slot: id })
    }

    fn dispatch(&mut self, purpose: SyncPurpose) -> Effect {
        let ticket = self.next_ticket;
        self.next_ticket = ticket.next();
        self.ledger.mark_sent(ticket);
        let mut request = SyncRequest::snapshot(
            self.ledger.view(),
            self.daily.cooldown_remaining(),
            self.ledger.claim_unit_reward(),
        );
        if let SyncPurpose::Withdrawal(withdrawal) = &purpose {
            request = request.with_withdrawal(withdrawal.amount(), withdrawal.address());
        }
        debug!(%ticket, action = ?request.action, "dispatching sync");
        self.in_flight.insert(ticket, purpose);
        Effect::Sync { ticket, request }
    }

    fn sync_daily(&mut self, remaining: u64) -> Vec<Effect> {
        match self.daily.sync_cooldown(remaining) {
            CooldownChange::Unchanged => Vec::new(),
            CooldownChange::Started(seconds) => vec![Effect::StartTimer {
                slot: SlotId::Daily,
                seconds,
            }],
            CooldownChange::Cleared => vec![Effect::StopTimer {
                slot: SlotId::Daily,
            }],
        }
    }

    fn server_view(&self) -> ServerSnapshot {
        ServerSnapshot {
            ledger: self.ledger.view(),
            daily_claim_time_remaining: self.daily.cooldown_remaining(),
        }
    }

    fn slot_mut(&mut self, id: SlotId) -> Option<&mut ClaimSlot> {
        match id {
            SlotId::Ad(index) => self.ads.get_mut(index),
            SlotId::Daily => Some(&mut self.daily),
        }
    }

    fn push_error(&mut self, message: String) {
        self.errors.push(Notice {
            at: Local::now(),
            message,
        });
        if self.errors.len() > MAX_ERRORS {
            let drain = self.errors.len() - MAX_ERRORS;
            self.errors.drain(0..drain);
        }
    }
}

#[cfg(test)]
mod tests;
