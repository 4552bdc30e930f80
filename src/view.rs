//! Projection of a [`SessionSnapshot`] into the text and button states the
//! terminal renders. Nothing in here touches the terminal.

use crate::{
    countdown::format_hms,
    session::SessionSnapshot,
    slots::{
        ClaimSlot,
        SlotState,
    },
};
use itertools::Itertools;
use unicode_width::{
    UnicodeWidthChar,
    UnicodeWidthStr,
};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Section {
    #[default]
    Home,
    Earn,
    Referrals,
    Withdraw,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Home,
        Section::Earn,
        Section::Referrals,
        Section::Withdraw,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Section::Home => "Home",
            Section::Earn => "Earn",
            Section::Referrals => "Referrals",
            Section::Withdraw => "Withdraw",
        }
    }

    pub fn index(self) -> usize {
        Section::ALL
            .iter()
            .position(|section| *section == self)
            .unwrap_or_default()
    }

    pub fn next(self) -> Self {
        Section::ALL[(self.index() + 1) % Section::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let len = Section::ALL.len();
        Section::ALL[(self.index() + len - 1) % len]
    }

    /// `1`..`4` jump straight to a section.
    pub fn from_hotkey(key: char) -> Option<Self> {
        let digit = key.to_digit(10)? as usize;
        digit.checked_sub(1).and_then(|i| Section::ALL.get(i).copied())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ButtonTone {
    Blue,
    Green,
    Orange,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ButtonView {
    pub label: &'static str,
    pub tone: ButtonTone,
    pub enabled: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SlotView {
    pub title: String,
    pub button: ButtonView,
    pub timer_text: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PageView {
    pub balance_text: String,
    pub pending_text: Option<String>,
    pub daily: SlotView,
    pub ads: Vec<SlotView>,
    pub referral_earnings_text: String,
    pub referral_list_text: String,
    pub referral_link: String,
    pub status: String,
    pub withdraw_status: String,
    pub errors: Vec<String>,
    pub sync_text: String,
}

pub fn cooldown_text(remaining: u64) -> String {
    format!("Next claim in: {}", format_hms(remaining))
}

pub fn ad_slot_view(slot: &ClaimSlot) -> SlotView {
    let button = match slot.state() {
        SlotState::Idle => ButtonView {
            label: "Start",
            tone: ButtonTone::Blue,
            enabled: true,
        },
        SlotState::Armed => ButtonView {
            label: "Claim",
            tone: ButtonTone::Green,
            enabled: true,
        },
        SlotState::Claimed | SlotState::Cooldown(_) => ButtonView {
            label: "Claimed",
            tone: ButtonTone::Orange,
            enabled: false,
        },
    };
    let timer_text = match slot.state() {
        SlotState::Cooldown(countdown) => cooldown_text(countdown.remaining()),
        _ => String::new(),
    };
    SlotView {
        title: capitalize(&slot.id().to_string()),
        button,
        timer_text,
    }
}

pub fn daily_slot_view(slot: &ClaimSlot) -> SlotView {
    let (button, timer_text) = match slot.state() {
        SlotState::Cooldown(countdown) => (
            ButtonView {
                label: "Claimed",
                tone: ButtonTone::Orange,
                enabled: false,
            },
            cooldown_text(countdown.remaining()),
        ),
        SlotState::Idle => (
            ButtonView {
                label: "Claim daily reward",
                tone: ButtonTone::Green,
                enabled: true,
            },
            String::from("You can claim now!"),
        ),
        SlotState::Armed | SlotState::Claimed => (
            ButtonView {
                label: "Claimed",
                tone: ButtonTone::Orange,
                enabled: false,
            },
            String::new(),
        ),
    };
    SlotView {
        title: String::from("Daily reward"),
        button,
        timer_text,
    }
}

pub fn referral_list_text(referrals: &[String]) -> String {
    if referrals.is_empty() {
        String::from("No referrals yet.")
    } else {
        referrals.iter().join("\n")
    }
}

pub fn page_view(snapshot: &SessionSnapshot) -> PageView {
    let pending_text = (!snapshot.pending.is_zero())
        .then(|| format!("{} awaiting confirmation", snapshot.pending));
    let sync_text = match snapshot.syncs_in_flight {
        0 => String::from("synced"),
        1 => String::from("1 sync in flight"),
        n => format!("{n} syncs in flight"),
    };
    PageView {
        balance_text: snapshot.balance.to_string(),
        pending_text,
        daily: daily_slot_view(&snapshot.daily),
        ads: snapshot.ads.iter().map(ad_slot_view).collect(),
        referral_earnings_text: snapshot.referral_earnings.to_string(),
        referral_list_text: referral_list_text(&snapshot.referrals),
        referral_link: snapshot.referral_link.clone(),
        status: snapshot.status.clone(),
        withdraw_status: snapshot.withdraw_status.clone().unwrap_or_default(),
        errors: snapshot
            .errors
            .iter()
            .map(|notice| format!("[{}] {}", notice.at.format("%H:%M:%S"), notice.message))
            .collect(),
        sync_text,
    }
}

/// Cuts `text` so that it occupies at most `max_width` terminal columns,
/// ending with `…` when something was removed.
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > max_width {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push('…');
    out
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
