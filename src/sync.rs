use crate::{
    amount::Amount,
    ledger::{
        LedgerState,
        SyncTicket,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use reqwest::{
    StatusCode,
    Url,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::time::Duration;
use thiserror::Error;

pub const SYNC_PATH: &str = "/api/handle_user_actions";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Withdraw,
}

/// Body of `POST /api/handle_user_actions`: the whole client state, plus the
/// withdrawal fields when `action` is set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub balance: Amount,
    pub referral_earnings: Amount,
    pub daily_claim_time_remaining: u64,
    pub referrals: Vec<String>,
    pub claim_amounts: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<SyncAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawal_amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawal_address: Option<String>,
}

impl SyncRequest {
    pub fn snapshot(
        ledger: LedgerState,
        daily_claim_time_remaining: u64,
        claim_amounts: Amount,
    ) -> Self {
        SyncRequest {
            balance: ledger.balance,
            referral_earnings: ledger.referral_earnings,
            daily_claim_time_remaining,
            referrals: ledger.referrals,
            claim_amounts,
            action: None,
            withdrawal_amount: None,
            withdrawal_address: None,
        }
    }

    pub fn with_withdrawal(mut self, amount: Amount, address: impl Into<String>) -> Self {
        self.action = Some(SyncAction::Withdraw);
        self.withdrawal_amount = Some(amount);
        self.withdrawal_address = Some(address.into());
        self
    }
}

/// Only `userBalance` is mandatory; absent fields keep their local value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub user_balance: Amount,
    #[serde(default)]
    pub referral_earnings: Option<Amount>,
    #[serde(default)]
    pub daily_claim_time_remaining: Option<u64>,
    #[serde(default)]
    pub referrals: Option<Vec<String>>,
}

/// Authoritative state the session reconciles to.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ServerSnapshot {
    pub ledger: LedgerState,
    pub daily_claim_time_remaining: u64,
}

impl SyncResponse {
    pub fn into_snapshot(self, local: ServerSnapshot) -> ServerSnapshot {
        ServerSnapshot {
            ledger: LedgerState {
                balance: self.user_balance,
                referral_earnings: self
                    .referral_earnings
                    .unwrap_or(local.ledger.referral_earnings),
                referrals: self.referrals.unwrap_or(local.ledger.referrals),
            },
            daily_claim_time_remaining: self
                .daily_claim_time_remaining
                .unwrap_or(local.daily_claim_time_remaining),
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend responded with {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("invalid sync response payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Outcome of one dispatched sync, routed back to the event loop.
#[derive(Debug)]
pub struct SyncOutcome {
    pub ticket: SyncTicket,
    pub result: Result<SyncResponse, SyncError>,
}

pub trait SyncGateway {
    fn sync_user_actions(
        &self,
        request: &SyncRequest,
    ) -> impl Future<Output = Result<SyncResponse, SyncError>> + Send;
}

#[derive(Clone, Debug)]
pub struct HttpSyncGateway {
    url: Url,
    http: reqwest::Client,
}

impl HttpSyncGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let raw = format!("{}{}", base_url.trim_end_matches('/'), SYNC_PATH);
        let url = Url::parse(&raw)
            .wrap_err_with(|| format!("invalid backend endpoint `{base_url}`"))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .wrap_err("failed to build HTTP client for backend sync")?;
        Ok(Self { url, http })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl SyncGateway for HttpSyncGateway {
    async fn sync_user_actions(
        &self,
        request: &SyncRequest,
    ) -> Result<SyncResponse, SyncError> {
        let res = self.http.post(self.url.clone()).json(request).send().await?;
        let status = res.status();
        let bytes = res.bytes().await?;
        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes).into_owned();
            return Err(SyncError::Status { status, body });
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use serde_json::json;

    fn ledger_state() -> LedgerState {
        LedgerState {
            balance: Amount::from_micros(5_000),
            referral_earnings: Amount::ZERO,
            referrals: vec!["bob".to_string()],
        }
    }

    #[test]
    fn serialize__plain_sync__omits_withdrawal_fields() {
        let request = SyncRequest::snapshot(ledger_state(), 7200, Amount::from_micros(5_000));

        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            json!({
                "balance": 0.005,
                "referralEarnings": 0.0,
                "dailyClaimTimeRemaining": 7200,
                "referrals": ["bob"],
                "claimAmounts": 0.005,
            })
        );
    }

    #[test]
    fn serialize__withdrawal__adds_action_fields() {
        let request = SyncRequest::snapshot(ledger_state(), 0, Amount::from_micros(5_000))
            .with_withdrawal(Amount::from_units(3), "addr-1");

        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["action"], json!("withdraw"));
        assert_eq!(value["withdrawalAmount"], json!(3.0));
        assert_eq!(value["withdrawalAddress"], json!("addr-1"));
    }

    #[test]
    fn into_snapshot__partial_response__keeps_local_fields() {
        // given
        let response: SyncResponse = serde_json::from_value(json!({ "userBalance": 1.5 })).unwrap();
        let local = ServerSnapshot {
            ledger: ledger_state(),
            daily_claim_time_remaining: 60,
        };

        // when
        let snapshot = response.into_snapshot(local);

        // then
        assert_eq!(snapshot.ledger.balance, Amount::from_micros(1_500_000));
        assert_eq!(snapshot.ledger.referrals, vec!["bob".to_string()]);
        assert_eq!(snapshot.daily_claim_time_remaining, 60);
    }

    #[test]
    fn deserialize__negative_balance__is_rejected() {
        let parsed: Result<SyncResponse, _> =
            serde_json::from_value(json!({ "userBalance": -1.0 }));
        assert!(parsed.is_err());
    }

    #[test]
    fn new__endpoint_without_scheme__fails() {
        assert!(HttpSyncGateway::new("localhost", Duration::from_secs(1)).is_err());
        let gateway =
            HttpSyncGateway::new("http://localhost:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            gateway.url().as_str(),
            "http://localhost:8080/api/handle_user_actions"
        );
    }
}
