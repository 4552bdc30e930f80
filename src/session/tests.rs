#![allow(non_snake_case)]

use super::*;
use crate::{
    ledger::LedgerState,
    referral::ClipboardError,
    rules::{
        AD_COOLDOWN_SECS,
        DAILY_COOLDOWN_SECS,
    },
    sync::SyncAction,
};
use reqwest::StatusCode;
use std::io;

const LINK: &str = "https://t.me/yourbot?start=abcd1234";

fn session() -> Session {
    Session::with_referral_link(SessionConfig::default(), LINK.to_string())
}

fn session_with_balance(units: u64) -> Session {
    let mut session = session();
    session.reconcile(ServerSnapshot {
        ledger: LedgerState {
            balance: Amount::from_units(units),
            ..LedgerState::default()
        },
        daily_claim_time_remaining: 0,
    });
    session
}

fn sync_of(effects: &[Effect]) -> (SyncTicket, SyncRequest) {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::Sync { ticket, request } => Some((*ticket, request.clone())),
            _ => None,
        })
        .expect("effects contain a sync")
}

fn ok(ticket: SyncTicket, balance_micros: u64) -> SyncOutcome {
    SyncOutcome {
        ticket,
        result: Ok(SyncResponse {
            user_balance: Amount::from_micros(balance_micros),
            referral_earnings: None,
            daily_claim_time_remaining: None,
            referrals: None,
        }),
    }
}

fn failed(ticket: SyncTicket) -> SyncOutcome {
    SyncOutcome {
        ticket,
        result: Err(SyncError::Status {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: "down".to_string(),
        }),
    }
}

fn watch_and_claim(session: &mut Session, index: usize) -> Vec<Effect> {
    assert!(session.press_ad(index).is_empty());
    session.press_ad(index)
}

#[test]
fn press_ad__idle_then_armed__credits_reward_and_syncs() {
    // given
    let mut session = session();

    // when
    let armed = session.press_ad(0);
    let armed_state = session.slot(SlotId::Ad(0)).unwrap().state();
    let effects = session.press_ad(0);

    // then
    assert!(armed.is_empty());
    assert_eq!(armed_state, SlotState::Armed);
    assert_eq!(session.ledger().balance(), Amount::from_micros(5_000));
    assert_eq!(
        session.slot(SlotId::Ad(0)).unwrap().cooldown_remaining(),
        AD_COOLDOWN_SECS
    );
    assert_eq!(
        effects[0],
        Effect::StartTimer {
            slot: SlotId::Ad(0),
            seconds: AD_COOLDOWN_SECS,
        }
    );
    let (ticket, request) = sync_of(&effects);
    assert_eq!(ticket, SyncTicket::new(1));
    assert_eq!(request.balance, Amount::from_micros(5_000));
    assert_eq!(request.claim_amounts, Amount::from_micros(5_000));
    assert_eq!(request.action, None);
}

#[test]
fn press_ad__during_cooldown__is_ignored() {
    let mut session = session();
    watch_and_claim(&mut session, 1);

    let again = session.press_ad(1);

    assert!(again.is_empty());
    assert_eq!(session.ledger().balance(), Amount::from_micros(5_000));
    assert_eq!(session.syncs_in_flight(), 1);
}

#[test]
fn claim__unwatched_ad__does_nothing() {
    let mut session = session();

    let effects = session.claim(SlotId::Ad(2));

    assert!(effects.is_empty());
    assert_eq!(session.ledger().balance(), Amount::ZERO);
}

#[test]
fn press_ad__out_of_range__does_nothing() {
    let mut session = session();

    assert!(session.press_ad(99).is_empty());
    assert!(!session.arm(99));
}

#[test]
fn claim__slots_are_independent() {
    let mut session = session();

    watch_and_claim(&mut session, 0);
    let second = watch_and_claim(&mut session, 3);

    assert_eq!(sync_of(&second).0, SyncTicket::new(2));
    assert_eq!(session.ledger().balance(), Amount::from_micros(10_000));
    assert_eq!(
        session.slot(SlotId::Ad(1)).unwrap().state(),
        SlotState::Idle
    );
}

#[test]
fn claim_daily__credits_and_reports_cooldown_to_backend() {
    let mut session = session();

    let effects = session.claim_daily();
    let repeated = session.claim_daily();

    assert_eq!(session.ledger().balance(), Amount::from_micros(3_000));
    assert_eq!(
        effects[0],
        Effect::StartTimer {
            slot: SlotId::Daily,
            seconds: DAILY_COOLDOWN_SECS,
        }
    );
    assert_eq!(sync_of(&effects).1.daily_claim_time_remaining, DAILY_COOLDOWN_SECS);
    assert!(repeated.is_empty());
}

#[test]
fn tick__last_second__makes_slot_claimable_and_stops_timer() {
    // given
    let mut session = session();
    session.reconcile(ServerSnapshot {
        ledger: LedgerState::default(),
        daily_claim_time_remaining: 2,
    });

    // when
    let first = session.tick(SlotId::Daily);
    let second = session.tick(SlotId::Daily);

    // then
    assert!(first.is_empty());
    assert_eq!(second, vec![Effect::StopTimer { slot: SlotId::Daily }]);
    assert!(session.slot(SlotId::Daily).unwrap().is_claimable());
    assert_eq!(session.status(), "You can claim daily reward now!");
}

#[test]
fn complete_cooldown__ad_slot__returns_to_idle() {
    let mut session = session();
    watch_and_claim(&mut session, 0);

    let effects = session.complete_cooldown(SlotId::Ad(0));

    assert_eq!(effects, vec![Effect::StopTimer { slot: SlotId::Ad(0) }]);
    assert_eq!(session.slot(SlotId::Ad(0)).unwrap().state(), SlotState::Idle);
}

#[test]
fn apply_sync_outcome__success__adopts_server_balance() {
    // given
    let mut session = session();
    let (ticket, _) = sync_of(&watch_and_claim(&mut session, 0));

    // when
    session.apply_sync_outcome(ok(ticket, 4_000));

    // then
    assert_eq!(session.ledger().balance(), Amount::from_micros(4_000));
    assert!(!session.ledger().has_pending());
    assert_eq!(session.syncs_in_flight(), 0);
}

#[test]
fn apply_sync_outcome__failure__rolls_back_credit_and_records_error() {
    // given
    let mut session = session();
    let (ticket, _) = sync_of(&watch_and_claim(&mut session, 0));

    // when
    let effects = session.apply_sync_outcome(failed(ticket));

    // then
    assert_eq!(effects, vec![Effect::StopTimer { slot: SlotId::Ad(0) }]);
    assert_eq!(session.ledger().balance(), Amount::ZERO);
    assert_eq!(session.slot(SlotId::Ad(0)).unwrap().state(), SlotState::Idle);
    assert_eq!(session.errors().len(), 1);
    assert!(session.errors()[0].message.contains("503"));
}

#[test]
fn apply_sync_outcome__failure_without_rollback__keeps_optimistic_credit() {
    let config = SessionConfig {
        rollback_on_failure: false,
        ..SessionConfig::default()
    };
    let mut session = Session::with_referral_link(config, LINK.to_string());
    let (ticket, _) = sync_of(&watch_and_claim(&mut session, 0));

    let effects = session.apply_sync_outcome(failed(ticket));

    assert!(effects.is_empty());
    assert_eq!(session.ledger().balance(), Amount::from_micros(5_000));
    assert_eq!(
        session.slot(SlotId::Ad(0)).unwrap().cooldown_remaining(),
        AD_COOLDOWN_SECS
    );
    assert_eq!(session.errors().len(), 1);
}

#[test]
fn apply_sync_outcome__failed_daily_claim__daily_can_be_claimed_again() {
    // given
    let mut session = session();
    let (ticket, _) = sync_of(&session.claim_daily());

    // when
    let effects = session.apply_sync_outcome(failed(ticket));
    let retry = session.claim_daily();

    // then
    assert_eq!(effects, vec![Effect::StopTimer { slot: SlotId::Daily }]);
    assert_eq!(sync_of(&retry).1.balance, Amount::from_micros(3_000));
    assert_eq!(session.ledger().balance(), Amount::from_micros(3_000));
}

#[test]
fn apply_sync_outcome__failure_of_other_claim__leaves_slot_cooling() {
    let mut session = session();
    let (first, _) = sync_of(&watch_and_claim(&mut session, 0));
    watch_and_claim(&mut session, 1);

    let effects = session.apply_sync_outcome(failed(first));

    assert_eq!(effects, vec![Effect::StopTimer { slot: SlotId::Ad(0) }]);
    assert_eq!(
        session.slot(SlotId::Ad(1)).unwrap().cooldown_remaining(),
        AD_COOLDOWN_SECS
    );
    assert_eq!(session.ledger().balance(), Amount::from_micros(5_000));
}

#[test]
fn apply_sync_outcome__out_of_order__stale_response_is_ignored() {
    // given
    let mut session = session();
    let (first, _) = sync_of(&watch_and_claim(&mut session, 0));
    let (second, _) = sync_of(&watch_and_claim(&mut session, 1));

    // when
    session.apply_sync_outcome(ok(second, 10_000));
    session.apply_sync_outcome(ok(first, 5_000));

    // then
    assert_eq!(session.ledger().balance(), Amount::from_micros(10_000));
    assert_eq!(session.syncs_in_flight(), 0);
}

#[test]
fn apply_sync_outcome__earlier_response__keeps_later_credit_pending() {
    let mut session = session();
    let (first, _) = sync_of(&watch_and_claim(&mut session, 0));
    watch_and_claim(&mut session, 1);

    session.apply_sync_outcome(ok(first, 5_000));

    assert_eq!(session.ledger().confirmed_balance(), Amount::from_micros(5_000));
    assert_eq!(session.ledger().balance(), Amount::from_micros(10_000));
}

#[test]
fn apply_sync_outcome__server_daily_remaining__restarts_daily_timer() {
    // given
    let mut session = session();
    let (ticket, _) = sync_of(&watch_and_claim(&mut session, 0));
    let mut outcome = ok(ticket, 5_000);
    if let Ok(response) = &mut outcome.result {
        response.daily_claim_time_remaining = Some(500);
    }

    // when
    let effects = session.apply_sync_outcome(outcome);

    // then
    assert_eq!(
        effects,
        vec![Effect::StartTimer {
            slot: SlotId::Daily,
            seconds: 500,
        }]
    );
    assert!(!session.slot(SlotId::Daily).unwrap().is_claimable());
}

#[test]
fn reconcile__zero_daily_remaining__clears_running_cooldown() {
    let mut session = session();
    session.claim_daily();

    let effects = session.reconcile(ServerSnapshot::default());

    assert_eq!(effects, vec![Effect::StopTimer { slot: SlotId::Daily }]);
    assert!(session.slot(SlotId::Daily).unwrap().is_claimable());
}

#[test]
fn reconcile__same_snapshot_twice__is_idempotent() {
    let snapshot = ServerSnapshot {
        ledger: LedgerState {
            balance: Amount::from_micros(1_234),
            referral_earnings: Amount::from_micros(50),
            referrals: vec!["alice".to_string()],
        },
        daily_claim_time_remaining: 90,
    };
    let mut session = session();

    session.reconcile(snapshot.clone());
    let once = session.snapshot();
    let effects = session.reconcile(snapshot);
    let twice = session.snapshot();

    assert!(effects.is_empty());
    assert_eq!(once.balance, twice.balance);
    assert_eq!(once.referrals, twice.referrals);
    assert_eq!(once.daily, twice.daily);
}

#[test]
fn submit_withdrawal__below_minimum__sends_nothing() {
    let mut session = session_with_balance(10);

    let err = session.submit_withdrawal("2", "addr").unwrap_err();

    assert_eq!(err.to_string(), "Minimum withdrawal is $3.");
    assert_eq!(session.withdraw_status(), Some("Minimum withdrawal is $3."));
    assert_eq!(session.syncs_in_flight(), 0);
}

#[test]
fn submit_withdrawal__above_balance__is_rejected() {
    let mut session = session_with_balance(3);

    let err = session.submit_withdrawal("5", "addr").unwrap_err();

    assert_eq!(err.to_string(), "Insufficient balance.");
    assert_eq!(session.ledger().balance(), Amount::from_units(3));
}

#[test]
fn submit_withdrawal__valid__syncs_with_action_then_reports_pending() {
    // given
    let mut session = session_with_balance(5);

    // when
    let effects = session.submit_withdrawal("3", " TQx9 ").unwrap();
    let (ticket, request) = sync_of(&effects);
    let balance_while_pending = session.ledger().balance();
    session.apply_sync_outcome(ok(ticket, 2_000_000));

    // then
    assert_eq!(request.action, Some(SyncAction::Withdraw));
    assert_eq!(request.withdrawal_amount, Some(Amount::from_units(3)));
    assert_eq!(request.withdrawal_address.as_deref(), Some("TQx9"));
    assert_eq!(balance_while_pending, Amount::from_units(5));
    assert_eq!(
        session.withdraw_status(),
        Some("Withdrawal of $3 to TQx9 is pending.")
    );
    assert_eq!(session.ledger().balance(), Amount::from_units(2));
}

#[test]
fn submit_withdrawal__backend_failure__reports_failure() {
    let mut session = session_with_balance(5);
    let effects = session.submit_withdrawal("4", "addr").unwrap();
    let (ticket, _) = sync_of(&effects);

    session.apply_sync_outcome(failed(ticket));

    assert_eq!(
        session.withdraw_status(),
        Some("Withdrawal of $4 could not be submitted.")
    );
    assert_eq!(session.ledger().balance(), Amount::from_units(5));
}

#[test]
fn claim_referral_commission__moves_earnings_once() {
    // given
    let mut session = session();
    session.reconcile(ServerSnapshot {
        ledger: LedgerState {
            balance: Amount::ZERO,
            referral_earnings: Amount::from_micros(1_200_000),
            referrals: Vec::new(),
        },
        daily_claim_time_remaining: 0,
    });

    // when
    let first = session.claim_referral_commission();
    let first_status = session.status().to_string();
    let second = session.claim_referral_commission();

    // then
    assert_eq!(first, CommissionClaim::Claimed(Amount::from_micros(1_200_000)));
    assert_eq!(first_status, "Referral commission claimed successfully!");
    assert_eq!(second, CommissionClaim::NothingToClaim);
    assert_eq!(session.status(), "No referral commission available.");
    assert_eq!(session.ledger().balance(), Amount::from_micros(1_200_000));
    assert_eq!(session.ledger().referral_earnings(), Amount::ZERO);
}

#[test]
fn claim_referral_commission__rides_along_with_next_sync() {
    let mut session = session();
    session.reconcile(ServerSnapshot {
        ledger: LedgerState {
            referral_earnings: Amount::from_units(1),
            ..LedgerState::default()
        },
        daily_claim_time_remaining: 0,
    });
    session.claim_referral_commission();

    let (_, request) = sync_of(&watch_and_claim(&mut session, 0));

    assert_eq!(request.balance, Amount::from_micros(1_005_000));
    assert_eq!(request.referral_earnings, Amount::ZERO);
}

fn session_with_earnings(micros: u64) -> Session {
    let mut session = session();
    session.reconcile(ServerSnapshot {
        ledger: LedgerState {
            referral_earnings: Amount::from_micros(micros),
            ..LedgerState::default()
        },
        daily_claim_time_remaining: 0,
    });
    session
}

fn ok_with_earnings(ticket: SyncTicket, balance_micros: u64, earnings_micros: u64) -> SyncOutcome {
    let mut outcome = ok(ticket, balance_micros);
    if let Ok(response) = &mut outcome.result {
        response.referral_earnings = Some(Amount::from_micros(earnings_micros));
    }
    outcome
}

#[test]
fn claim_referral_commission__claim_in_flight__cannot_claim_twice() {
    // given
    let mut session = session_with_earnings(1_200_000);
    let (ticket, _) = sync_of(&watch_and_claim(&mut session, 0));
    session.claim_referral_commission();

    // when
    session.apply_sync_outcome(ok_with_earnings(ticket, 5_000, 1_200_000));
    let second = session.claim_referral_commission();

    // then
    assert_eq!(second, CommissionClaim::NothingToClaim);
    assert_eq!(session.ledger().referral_earnings(), Amount::ZERO);
    assert_eq!(session.ledger().balance(), Amount::from_micros(1_205_000));
    let (_, next) = sync_of(&watch_and_claim(&mut session, 1));
    assert_eq!(next.balance, Amount::from_micros(1_210_000));
    assert_eq!(next.referral_earnings, Amount::ZERO);
}

#[test]
fn claim_referral_commission__carrying_sync_fails__earnings_restored_once() {
    // given
    let mut session = session_with_earnings(1_200_000);
    let (first, _) = sync_of(&watch_and_claim(&mut session, 0));
    session.claim_referral_commission();
    let (second, _) = sync_of(&watch_and_claim(&mut session, 1));
    session.apply_sync_outcome(ok_with_earnings(first, 5_000, 1_200_000));

    // when
    session.apply_sync_outcome(failed(second));

    // then
    assert_eq!(session.ledger().referral_earnings(), Amount::from_micros(1_200_000));
    assert_eq!(session.ledger().balance(), Amount::from_micros(5_000));
    assert_eq!(
        session.claim_referral_commission(),
        CommissionClaim::Claimed(Amount::from_micros(1_200_000))
    );
    assert_eq!(session.ledger().balance(), Amount::from_micros(1_205_000));
}

#[derive(Default)]
struct FakeClipboard {
    written: Vec<String>,
    fail: bool,
}

impl Clipboard for FakeClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        if self.fail {
            return Err(io::Error::other("no terminal").into());
        }
        self.written.push(text.to_string());
        Ok(())
    }
}

#[test]
fn copy_referral_link__writes_current_link() {
    let mut session = session();
    let mut clipboard = FakeClipboard::default();

    assert!(session.copy_referral_link(&mut clipboard));

    assert_eq!(clipboard.written, vec![LINK.to_string()]);
    assert_eq!(session.status(), "Referral link copied to clipboard!");
}

#[test]
fn copy_referral_link__clipboard_error__is_recorded() {
    let mut session = session();
    let mut clipboard = FakeClipboard {
        fail: true,
        ..FakeClipboard::default()
    };

    assert!(!session.copy_referral_link(&mut clipboard));

    assert_eq!(session.errors().len(), 1);
    assert_eq!(session.status(), "Could not copy referral link.");
}

#[test]
fn regenerate_referral_link__keeps_base_url() {
    let mut session = session();

    let link = session.regenerate_referral_link().to_string();

    assert!(link.starts_with("https://t.me/yourbot?start="));
    assert_eq!(session.referral_link(), link);
}

#[test]
fn push_error__keeps_only_latest_entries() {
    let mut session = session();
    for n in 0..(MAX_ERRORS + 5) {
        session.push_error(format!("error {n}"));
    }

    assert_eq!(session.errors().len(), MAX_ERRORS);
    assert_eq!(session.errors()[0].message, "error 5");
    assert_eq!(session.snapshot().errors[0].message, format!("error {}", MAX_ERRORS + 4));
}
