use crate::view::{
    ButtonTone,
    ButtonView,
    PageView,
    Section,
    SlotView,
    truncate_to_width,
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEvent,
        KeyEventKind,
        KeyModifiers,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use futures::StreamExt;
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::stdout;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum UserEvent {
    Quit,
    Redraw,
    ShowSection(Section),
    PressAd(usize),
    ClaimDaily,
    ClaimReferralCommission,
    CopyReferralLink,
    RegenerateReferralLink,
    SubmitWithdrawal { amount: String, address: String },
}

#[derive(Debug)]
pub struct UiState {
    mode: Mode,
    section: Section,
    selected_ad: usize,
    ad_count: usize,
    loading: bool,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

impl Default for UiState {
    fn default() -> Self {
        UiState {
            mode: Mode::Normal,
            section: Section::Home,
            selected_ad: 0,
            ad_count: 0,
            loading: true,
            terminal: None,
        }
    }
}

impl UiState {
    pub fn section(&self) -> Section {
        self.section
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn finish_loading(&mut self) {
        self.loading = false;
    }

    pub fn show_section(&mut self, section: Section) {
        self.section = section;
    }

    pub fn selected_ad(&self) -> usize {
        self.selected_ad
    }
}

#[derive(Clone, Debug, Default)]
enum Mode {
    #[default]
    Normal,
    WithdrawForm(WithdrawForm),
    QuitModal,
}

#[derive(Clone, Debug, Default)]
struct WithdrawForm {
    amount: String,
    address: String,
    focus: FormField,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
enum FormField {
    #[default]
    Amount,
    Address,
}

impl WithdrawForm {
    fn field_mut(&mut self) -> &mut String {
        match self.focus {
            FormField::Amount => &mut self.amount,
            FormField::Address => &mut self.address,
        }
    }

    fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            FormField::Amount => FormField::Address,
            FormField::Address => FormField::Amount,
        };
    }
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    // One persistent Terminal so buffers survive across draws
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub fn draw(state: &mut UiState, page: &PageView) -> Result<()> {
    state.ad_count = page.ads.len();
    state.selected_ad = state.selected_ad.min(state.ad_count.saturating_sub(1));
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, page))?;
        state.terminal = Some(term);
    }
    Ok(())
}

pub type InputEventStream = EventStream;

pub fn input_event_stream() -> InputEventStream {
    EventStream::new()
}

pub async fn next_raw_event(events: &mut InputEventStream) -> Result<Event> {
    match events.next().await {
        Some(event) => Ok(event?),
        None => Err(eyre!("terminal input stream closed")),
    }
}

/// Maps a terminal event to a user intent, updating local UI state (focus,
/// form contents, modals) on the way. Returns `None` for events with no
/// meaning in the current mode.
pub fn interpret_event(state: &mut UiState, event: Event) -> Option<UserEvent> {
    let key = match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => key,
        Event::Resize(..) => return Some(UserEvent::Redraw),
        _ => return None,
    };
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(UserEvent::Quit);
    }
    match &mut state.mode {
        Mode::QuitModal => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserEvent::Quit),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::WithdrawForm(form) => match key.code {
            KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                form.toggle_focus();
                Some(UserEvent::Redraw)
            }
            KeyCode::Backspace => {
                form.field_mut().pop();
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => {
                let form = std::mem::take(form);
                state.mode = Mode::Normal;
                Some(UserEvent::SubmitWithdrawal {
                    amount: form.amount,
                    address: form.address,
                })
            }
            KeyCode::Char(c) => {
                form.field_mut().push(c);
                Some(UserEvent::Redraw)
            }
            _ => None,
        },
        Mode::Normal => interpret_normal_key(state, key),
    }
}

fn interpret_normal_key(state: &mut UiState, key: KeyEvent) -> Option<UserEvent> {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            state.mode = Mode::QuitModal;
            return Some(UserEvent::Redraw);
        }
        _ if state.loading => return None,
        KeyCode::Tab | KeyCode::Right => {
            return Some(UserEvent::ShowSection(state.section.next()));
        }
        KeyCode::BackTab | KeyCode::Left => {
            return Some(UserEvent::ShowSection(state.section.prev()));
        }
        KeyCode::Char(c) if Section::from_hotkey(c).is_some() => {
            return Section::from_hotkey(c).map(UserEvent::ShowSection);
        }
        _ => {}
    }
    match (state.section, key.code) {
        (Section::Home, KeyCode::Char('d') | KeyCode::Enter) => Some(UserEvent::ClaimDaily),
        (Section::Earn, KeyCode::Up | KeyCode::Char('k')) => {
            state.selected_ad = state.selected_ad.saturating_sub(1);
            Some(UserEvent::Redraw)
        }
        (Section::Earn, KeyCode::Down | KeyCode::Char('j')) => {
            let max = state.ad_count.saturating_sub(1);
            state.selected_ad = (state.selected_ad + 1).min(max);
            Some(UserEvent::Redraw)
        }
        (Section::Earn, KeyCode::Enter | KeyCode::Char(' ')) => {
            Some(UserEvent::PressAd(state.selected_ad))
        }
        (Section::Referrals, KeyCode::Char('c')) => Some(UserEvent::CopyReferralLink),
        (Section::Referrals, KeyCode::Char('g')) => Some(UserEvent::RegenerateReferralLink),
        (Section::Referrals, KeyCode::Char('r')) => Some(UserEvent::ClaimReferralCommission),
        (Section::Withdraw, KeyCode::Char('w') | KeyCode::Enter) => {
            state.mode = Mode::WithdrawForm(WithdrawForm::default());
            Some(UserEvent::Redraw)
        }
        _ => None,
    }
}

fn ui(f: &mut Frame, state: &UiState, page: &PageView) {
    f.render_widget(Clear, f.area());
    if state.loading {
        draw_loading(f, f.area());
        draw_modals(f, state);
        return;
    }
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // sections
            Constraint::Length(3), // balance
            Constraint::Min(8),    // active section
            Constraint::Length(8), // status + errors
            Constraint::Length(3), // help
        ])
        .split(f.area());

    draw_tabs(f, chunks[0], state.section);
    draw_balance(f, chunks[1], page);
    match state.section {
        Section::Home => draw_home(f, chunks[2], page),
        Section::Earn => draw_earn(f, chunks[2], state, page),
        Section::Referrals => draw_referrals(f, chunks[2], page),
        Section::Withdraw => draw_withdraw(f, chunks[2], page),
    }
    draw_bottom(f, chunks[3], page);
    draw_help(f, chunks[4], state.section);
    draw_modals(f, state);
}

fn draw_loading(f: &mut Frame, area: Rect) {
    let rect = centered_rect(40, 20, area);
    let widget = Paragraph::new(vec![
        Line::from(""),
        Line::styled("Loading...", Style::default().add_modifier(Modifier::BOLD)),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title("Reward Claims"));
    f.render_widget(widget, rect);
}

fn draw_tabs(f: &mut Frame, area: Rect, section: Section) {
    let titles = Section::ALL
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{} {}", i + 1, s.title()))
        .collect::<Vec<_>>();
    let tabs = Tabs::new(titles)
        .select(section.index())
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL).title("Sections"));
    f.render_widget(tabs, area);
}

fn draw_balance(f: &mut Frame, area: Rect, page: &PageView) {
    let mut spans = vec![
        Span::raw("Balance: "),
        Span::styled(
            page.balance_text.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ];
    if let Some(pending) = &page.pending_text {
        spans.push(Span::styled(
            format!(" ({pending})"),
            Style::default().fg(Color::DarkGray),
        ));
    }
    spans.push(Span::raw(format!(" | {}", page.sync_text)));
    let widget = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("Wallet"));
    f.render_widget(widget, area);
}

fn draw_home(f: &mut Frame, area: Rect, page: &PageView) {
    let lines = vec![
        Line::from(button_span(&page.daily.button)),
        Line::from(""),
        Line::from(page.daily.timer_text.clone()),
    ];
    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(page.daily.title.clone()));
    f.render_widget(widget, area);
}

fn draw_earn(f: &mut Frame, area: Rect, state: &UiState, page: &PageView) {
    let lines = page
        .ads
        .iter()
        .enumerate()
        .map(|(i, slot)| ad_line(slot, i == state.selected_ad))
        .collect::<Vec<_>>();
    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Watch ads"));
    f.render_widget(widget, area);
}

fn ad_line(slot: &SlotView, selected: bool) -> Line<'static> {
    let marker = if selected { "> " } else { "  " };
    let title_style = if selected {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    Line::from(vec![
        Span::styled(format!("{marker}{:<8}", slot.title), title_style),
        button_span(&slot.button),
        Span::raw(format!("  {}", slot.timer_text)),
    ])
}

fn draw_referrals(f: &mut Frame, area: Rect, page: &PageView) {
    let inner_width = area.width.saturating_sub(2) as usize;
    let mut lines = vec![
        Line::from(format!("Referral earnings: {}", page.referral_earnings_text)),
        Line::from(truncate_to_width(
            &format!("Your link: {}", page.referral_link),
            inner_width,
        )),
        Line::from(""),
        Line::styled("Referrals:", Style::default().add_modifier(Modifier::BOLD)),
    ];
    lines.extend(
        page.referral_list_text
            .lines()
            .map(|line| Line::from(format!("  {line}"))),
    );
    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Referrals"));
    f.render_widget(widget, area);
}

fn draw_withdraw(f: &mut Frame, area: Rect, page: &PageView) {
    let status = if page.withdraw_status.is_empty() {
        Line::styled("No withdrawal submitted.", Style::default().fg(Color::DarkGray))
    } else {
        Line::from(page.withdraw_status.clone())
    };
    let widget = Paragraph::new(vec![
        Line::from(format!("Available: {}", page.balance_text)),
        Line::from(""),
        status,
    ])
    .wrap(Wrap { trim: false })
    .block(Block::default().borders(Borders::ALL).title("Withdraw"));
    f.render_widget(widget, area);
}

fn draw_bottom(f: &mut Frame, area: Rect, page: &PageView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let status = Paragraph::new(page.status.clone())
        .style(Style::default().fg(Color::Green))
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, chunks[0]);

    let width = chunks[1].width.saturating_sub(2) as usize;
    let lines = if page.errors.is_empty() {
        vec![Line::styled("No errors", Style::default().fg(Color::DarkGray))]
    } else {
        page.errors
            .iter()
            .map(|e| Line::from(truncate_to_width(e, width)))
            .collect()
    };
    let errors = Paragraph::new(lines)
        .style(Style::default().fg(Color::Red))
        .block(Block::default().borders(Borders::ALL).title("Errors"));
    f.render_widget(errors, chunks[1]);
}

fn draw_help(f: &mut Frame, area: Rect, section: Section) {
    let keys = match section {
        Section::Home => "d/Enter claim daily",
        Section::Earn => "↑/↓ select | Enter start/claim",
        Section::Referrals => "r claim commission | c copy link | g new link",
        Section::Withdraw => "w/Enter open form",
    };
    let help = Paragraph::new(format!("←/→/1-4 sections | {keys} | q/Esc quit"))
        .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, area);
}

fn draw_modals(f: &mut Frame, state: &UiState) {
    match &state.mode {
        Mode::QuitModal => {
            let rect = centered_rect(30, 20, f.area());
            f.render_widget(Clear, rect);
            let widget = Paragraph::new("Quit? (y/n)")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title("Confirm"));
            f.render_widget(widget, rect);
        }
        Mode::WithdrawForm(form) => {
            let rect = centered_rect(60, 30, f.area());
            f.render_widget(Clear, rect);
            let widget = Paragraph::new(vec![
                form_line("Amount", &form.amount, form.focus == FormField::Amount),
                form_line("Address", &form.address, form.focus == FormField::Address),
                Line::from(""),
                Line::styled(
                    "Tab switch field | Enter submit | Esc cancel",
                    Style::default().fg(Color::DarkGray),
                ),
            ])
            .block(Block::default().borders(Borders::ALL).title("Withdraw"));
            f.render_widget(widget, rect);
        }
        Mode::Normal => {}
    }
}

fn form_line(label: &str, value: &str, focused: bool) -> Line<'static> {
    let cursor = if focused { "_" } else { "" };
    let style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Line::from(vec![
        Span::raw(format!("{label:>8}: ")),
        Span::styled(format!("{value}{cursor}"), style),
    ])
}

fn button_span(button: &ButtonView) -> Span<'static> {
    let mut style = Style::default().fg(Color::Black).bg(tone_color(button.tone));
    if !button.enabled {
        style = style.add_modifier(Modifier::DIM);
    }
    Span::styled(format!("[ {} ]", button.label), style)
}

fn tone_color(tone: ButtonTone) -> Color {
    match tone {
        ButtonTone::Blue => Color::Blue,
        ButtonTone::Green => Color::Green,
        ButtonTone::Orange => Color::Rgb(255, 165, 0),
    }
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1])[1]
}
