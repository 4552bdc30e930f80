use crate::{
    amount::Amount,
    countdown::{
        Countdown,
        Tick,
    },
    rules::ClaimRules,
};
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum SlotId {
    Ad(usize),
    Daily,
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotId::Ad(index) => write!(f, "ad {}", index + 1),
            SlotId::Daily => write!(f, "daily reward"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SlotKind {
    Ad,
    Daily,
}

/// Ad slots go `Idle -> Armed -> Claimed -> Cooldown -> Idle`; the daily slot
/// skips `Armed`. `Claimed` only lasts between crediting the reward and
/// starting the cooldown.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SlotState {
    Idle,
    Armed,
    Claimed,
    Cooldown(Countdown),
}

/// Credit produced by one successful claim.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Claim {
    pub slot: SlotId,
    pub reward: Amount,
    pub cooldown_secs: u64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SlotTick {
    /// Slot was not cooling down.
    Inactive,
    Running(u64),
    /// Cooldown reached zero; the slot is `Idle` again.
    Ready,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CooldownChange {
    Unchanged,
    Started(u64),
    Cleared,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ClaimSlot {
    id: SlotId,
    state: SlotState,
}

impl ClaimSlot {
    pub fn ad(index: usize) -> Self {
        ClaimSlot {
            id: SlotId::Ad(index),
            state: SlotState::Idle,
        }
    }

    pub fn daily() -> Self {
        ClaimSlot {
            id: SlotId::Daily,
            state: SlotState::Idle,
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn kind(&self) -> SlotKind {
        match self.id {
            SlotId::Ad(_) => SlotKind::Ad,
            SlotId::Daily => SlotKind::Daily,
        }
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn cooldown_remaining(&self) -> u64 {
        match self.state {
            SlotState::Cooldown(countdown) => countdown.remaining(),
            _ => 0,
        }
    }

    pub fn is_claimable(&self) -> bool {
        matches!(
            (self.kind(), self.state),
            (SlotKind::Ad, SlotState::Armed) | (SlotKind::Daily, SlotState::Idle)
        )
    }

    /// Marks an idle ad slot as watched. Returns `false` and leaves the slot
    /// untouched in every other case.
    pub fn arm(&mut self) -> bool {
        if self.kind() == SlotKind::Ad && self.state == SlotState::Idle {
            self.state = SlotState::Armed;
            true
        } else {
            false
        }
    }

    /// Credits the slot's reward and starts its cooldown, or does nothing
    /// when the slot is not claimable. A second call before the cooldown ends
    /// always returns `None`.
    pub fn claim(&mut self, rules: &ClaimRules) -> Option<Claim> {
        if !self.is_claimable() {
            return None;
        }
        let kind = self.kind();
        self.state = SlotState::Claimed;
        let claim = Claim {
            slot: self.id,
            reward: rules.reward_for(kind),
            cooldown_secs: rules.cooldown_for(kind),
        };
        self.enter_cooldown(claim.cooldown_secs);
        Some(claim)
    }

    pub fn tick(&mut self) -> SlotTick {
        let SlotState::Cooldown(ref mut countdown) = self.state else {
            return SlotTick::Inactive;
        };
        match countdown.tick() {
            Tick::Running(remaining) => SlotTick::Running(remaining),
            Tick::Finished => {
                self.state = SlotState::Idle;
                SlotTick::Ready
            }
        }
    }

    /// Forces the end of a cooldown. Returns whether the slot changed.
    pub fn finish_cooldown(&mut self) -> bool {
        if matches!(self.state, SlotState::Cooldown(_)) {
            self.state = SlotState::Idle;
            true
        } else {
            false
        }
    }

    /// Aligns the cooldown with an authoritative remaining time.
    pub fn sync_cooldown(&mut self, remaining: u64) -> CooldownChange {
        match (self.state, remaining) {
            (SlotState::Cooldown(_), 0) => {
                self.state = SlotState::Idle;
                CooldownChange::Cleared
            }
            (_, 0) => CooldownChange::Unchanged,
            (SlotState::Cooldown(countdown), r) if countdown.remaining() == r => {
                CooldownChange::Unchanged
            }
            (_, r) => {
                self.state = SlotState::Cooldown(Countdown::new(r));
                CooldownChange::Started(r)
            }
        }
    }

    fn enter_cooldown(&mut self, seconds: u64) {
        self.state = if seconds == 0 {
            SlotState::Idle
        } else {
            SlotState::Cooldown(Countdown::new(seconds))
        };
    }
}
