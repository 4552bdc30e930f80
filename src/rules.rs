use crate::{
    amount::Amount,
    slots::SlotKind,
};

pub const AD_CLAIM_REWARD: Amount = Amount::from_micros(5_000);
pub const DAILY_CLAIM_REWARD: Amount = Amount::from_micros(3_000);
pub const AD_COOLDOWN_SECS: u64 = 2 * 60 * 60;
pub const DAILY_COOLDOWN_SECS: u64 = 24 * 60 * 60;
pub const MIN_WITHDRAWAL: Amount = Amount::from_units(3);

/// Reward amounts and cooldowns applied by the claim slots.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ClaimRules {
    pub ad_reward: Amount,
    pub daily_reward: Amount,
    pub ad_cooldown_secs: u64,
    pub daily_cooldown_secs: u64,
    pub min_withdrawal: Amount,
}

impl Default for ClaimRules {
    fn default() -> Self {
        ClaimRules {
            ad_reward: AD_CLAIM_REWARD,
            daily_reward: DAILY_CLAIM_REWARD,
            ad_cooldown_secs: AD_COOLDOWN_SECS,
            daily_cooldown_secs: DAILY_COOLDOWN_SECS,
            min_withdrawal: MIN_WITHDRAWAL,
        }
    }
}

impl ClaimRules {
    pub fn reward_for(&self, kind: SlotKind) -> Amount {
        match kind {
            SlotKind::Ad => self.ad_reward,
            SlotKind::Daily => self.daily_reward,
        }
    }

    pub fn cooldown_for(&self, kind: SlotKind) -> u64 {
        match kind {
            SlotKind::Ad => self.ad_cooldown_secs,
            SlotKind::Daily => self.daily_cooldown_secs,
        }
    }
}
