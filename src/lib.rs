//! Terminal client for an ad-watching rewards program: claim slots with
//! cooldowns, a daily reward, an optimistic balance ledger reconciled with
//! the backend, withdrawals and referral links.

pub mod amount;
pub mod app;
pub mod config;
pub mod countdown;
pub mod ledger;
pub mod referral;
pub mod rules;
pub mod session;
pub mod slots;
pub mod sync;
pub mod telemetry;
pub mod ui;
pub mod view;
pub mod withdrawal;
