use crate::{
    config::AppConfig,
    countdown::{
        TimerEvent,
        TimerSet,
    },
    ledger::SyncTicket,
    referral::{
        Clipboard,
        TerminalClipboard,
    },
    session::{
        Effect,
        Session,
    },
    slots::SlotId,
    sync::{
        HttpSyncGateway,
        SyncGateway,
        SyncOutcome,
        SyncRequest,
    },
    ui::{
        self,
        UserEvent,
    },
    view::{
        self,
        PageView,
        Section,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use std::time::Duration;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time,
};
use tracing::{
    debug,
    info,
};

/// Runs sync requests off the event loop and posts each outcome back.
#[derive(Clone, Debug)]
pub struct SyncDispatcher<G> {
    gateway: G,
    outcomes: mpsc::UnboundedSender<SyncOutcome>,
}

impl<G> SyncDispatcher<G>
where
    G: SyncGateway + Clone + Send + Sync + 'static,
{
    pub fn new(gateway: G, outcomes: mpsc::UnboundedSender<SyncOutcome>) -> Self {
        SyncDispatcher { gateway, outcomes }
    }

    pub fn dispatch(&self, ticket: SyncTicket, request: SyncRequest) -> JoinHandle<()> {
        let gateway = self.gateway.clone();
        let outcomes = self.outcomes.clone();
        tokio::spawn(async move {
            let result = gateway.sync_user_actions(&request).await;
            if outcomes.send(SyncOutcome { ticket, result }).is_err() {
                debug!(%ticket, "event loop gone; sync outcome dropped");
            }
        })
    }
}

pub struct AppChannels {
    pub timers: mpsc::UnboundedReceiver<TimerEvent<SlotId>>,
    pub syncs: mpsc::UnboundedReceiver<SyncOutcome>,
}

/// Glue between the session and the runtime: feeds it user, timer and sync
/// events and carries out the effects it returns.
pub struct AppController<G, C> {
    session: Session,
    timers: TimerSet<SlotId>,
    timer_tx: mpsc::UnboundedSender<TimerEvent<SlotId>>,
    dispatcher: SyncDispatcher<G>,
    clipboard: C,
}

impl<G, C> AppController<G, C>
where
    G: SyncGateway + Clone + Send + Sync + 'static,
    C: Clipboard,
{
    pub fn new(session: Session, gateway: G, clipboard: C) -> (Self, AppChannels) {
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let (sync_tx, sync_rx) = mpsc::unbounded_channel();
        let controller = AppController {
            session,
            timers: TimerSet::default(),
            timer_tx,
            dispatcher: SyncDispatcher::new(gateway, sync_tx),
            clipboard,
        };
        let channels = AppChannels {
            timers: timer_rx,
            syncs: sync_rx,
        };
        (controller, channels)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn timers(&self) -> &TimerSet<SlotId> {
        &self.timers
    }

    pub fn page(&self) -> PageView {
        view::page_view(&self.session.snapshot())
    }

    pub fn handle_user_event(&mut self, event: UserEvent) {
        let effects = match event {
            UserEvent::PressAd(index) => self.session.press_ad(index),
            UserEvent::ClaimDaily => self.session.claim_daily(),
            UserEvent::ClaimReferralCommission => {
                self.session.claim_referral_commission();
                Vec::new()
            }
            UserEvent::CopyReferralLink => {
                self.session.copy_referral_link(&mut self.clipboard);
                Vec::new()
            }
            UserEvent::RegenerateReferralLink => {
                self.session.regenerate_referral_link();
                Vec::new()
            }
            UserEvent::SubmitWithdrawal { amount, address } => self
                .session
                .submit_withdrawal(&amount, &address)
                .unwrap_or_default(),
            UserEvent::Quit | UserEvent::Redraw | UserEvent::ShowSection(_) => Vec::new(),
        };
        self.execute(effects);
    }

    pub fn handle_timer_event(&mut self, event: TimerEvent<SlotId>) {
        let token = event.token();
        if !self.timers.is_current(&token) {
            debug!(slot = %token.key, "dropping event from replaced timer");
            return;
        }
        let effects = match event {
            TimerEvent::Tick { token, .. } => self.session.tick(token.key),
            TimerEvent::Completed { token } => self.session.complete_cooldown(token.key),
        };
        self.execute(effects);
    }

    pub fn handle_sync_outcome(&mut self, outcome: SyncOutcome) {
        let effects = self.session.apply_sync_outcome(outcome);
        self.execute(effects);
    }

    pub fn shutdown(&mut self) {
        self.timers.stop_all();
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartTimer { slot, seconds } => {
                    self.timers.start(slot, seconds, self.timer_tx.clone());
                }
                Effect::StopTimer { slot } => {
                    self.timers.stop(slot);
                }
                Effect::Sync { ticket, request } => {
                    self.dispatcher.dispatch(ticket, request);
                }
            }
        }
    }
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let gateway = HttpSyncGateway::new(&config.endpoint, config.request_timeout())?;
    info!(endpoint = %gateway.url(), ad_slots = config.ad_slots, "starting reward claims client");
    let session = Session::new(config.session_config());
    let (controller, channels) = AppController::new(session, gateway, TerminalClipboard);
    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(
        controller,
        channels,
        &mut ui_state,
        &mut input_events,
        config.loading_delay(),
    )
    .await;
    ui::terminal_exit()?;
    res
}

async fn run_loop<G, C>(
    mut controller: AppController<G, C>,
    channels: AppChannels,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventStream,
    loading_delay: Duration,
) -> Result<()>
where
    G: SyncGateway + Clone + Send + Sync + 'static,
    C: Clipboard,
{
    let AppChannels {
        timers: mut timer_rx,
        syncs: mut sync_rx,
    } = channels;
    let loading = time::sleep(loading_delay);
    tokio::pin!(loading);

    ui::draw(ui_state, &controller.page()).wrap_err("initial draw failed")?;
    loop {
        tokio::select! {
            _ = &mut loading, if ui_state.is_loading() => {
                ui_state.finish_loading();
                ui_state.show_section(Section::Home);
            }
            Some(event) = timer_rx.recv() => {
                controller.handle_timer_event(event);
            }
            Some(outcome) = sync_rx.recv() => {
                controller.handle_sync_outcome(outcome);
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
            raw_ev = ui::next_raw_event(input_events) => {
                let Some(ev) = ui::interpret_event(ui_state, raw_ev?) else {
                    continue;
                };
                match ev {
                    UserEvent::Quit => break,
                    UserEvent::ShowSection(section) => ui_state.show_section(section),
                    other => controller.handle_user_event(other),
                }
            }
        }
        ui::draw(ui_state, &controller.page()).wrap_err("redraw failed")?;
    }
    controller.shutdown();
    info!(
        in_flight = controller.session().syncs_in_flight(),
        "reward claims client stopped"
    );
    Ok(())
}
