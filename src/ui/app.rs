//! Main application state and logic.

use std::time::Instant;

use chrono::{Datelike, Local, NaiveDate, TimeZone};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{block::BorderType, Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use super::theme::Theme;
use super::widgets::{AnswerButtons, FlashcardWidget, KeyHints, Logo, StatsBar, SummaryScreen};
use crate::config::{Config, SettingField, Settings};
use crate::models::{DeckStats, Flashcard, StudyMode};
use crate::selection::{accuracy_preview, CardSelector};
use crate::session::{SessionSummary, StudySession};
use crate::storage::{filter_decks, DeckDetails, DeckInfo, DeckSort, DeckStorage};

// ══════════════════════════════════════════════════════════════════════════
// Application State
// ══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    DeckSelect,
    ModeSelect,
    Study,
    Settings,
    EditDeck,
    Stats,
    Summary,
}

/// Destructive deck action waiting for a second key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    Delete,
    Reset,
}

const EDIT_FIELDS: [&str; 5] = ["Name", "Description", "Category", "Colour", "Tags (comma separated)"];

/// Totals across every deck, for the stats screen.
#[derive(Debug, Default)]
struct OverallStats {
    decks: usize,
    totals: DeckStats,
    daily_streak: u32,
    weekly_streak: u32,
}

pub struct App {
    pub screen: Screen,
    pub running: bool,

    // Config and theme
    pub config: Config,
    pub theme: Theme,

    // Storage and selection
    pub storage: DeckStorage,
    selector: CardSelector,

    // Deck selection
    pub deck_list: Vec<DeckInfo>,
    pub deck_list_state: ListState,
    pub deck_sort: DeckSort,
    pub search_query: String,
    pub searching: bool,
    pub pending: Option<PendingAction>,

    // Current deck
    pub current_deck: Option<String>,
    pub cards: Vec<Flashcard>,
    pub mode_list_state: ListState,

    // Study state
    pub session: Option<StudySession>,
    pub current_card: Option<Flashcard>,
    pub showing_answer: bool,
    pub answer_result: Option<bool>,
    pub summary: Option<SessionSummary>,
    session_pool: usize,

    // Settings editor state
    pub settings_draft: Settings,
    pub settings_field: usize,
    pub settings_deck_scope: bool,
    settings_return: Screen,

    // Deck details editor state
    pub edit_fields: [String; 5],
    pub edit_focus: usize,
    edit_target: Option<String>,
    edit_return: Screen,

    overall: OverallStats,

    // Status message (shown temporarily)
    pub status_message: Option<(String, Instant)>,
}

/// Current time in milliseconds since the Unix epoch.
fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl App {
    pub fn new(storage: DeckStorage, config: Config) -> Self {
        let theme = Theme::from_name(&config.theme);
        let settings_draft = config.settings;

        let mut app = Self {
            screen: Screen::DeckSelect,
            running: true,
            config,
            theme,
            storage,
            selector: CardSelector::new(),
            deck_list: Vec::new(),
            deck_list_state: ListState::default().with_selected(Some(0)),
            deck_sort: DeckSort::default(),
            search_query: String::new(),
            searching: false,
            pending: None,
            current_deck: None,
            cards: Vec::new(),
            mode_list_state: ListState::default().with_selected(Some(0)),
            session: None,
            current_card: None,
            showing_answer: false,
            answer_result: None,
            summary: None,
            session_pool: 0,
            settings_draft,
            settings_field: 0,
            settings_deck_scope: false,
            settings_return: Screen::DeckSelect,
            edit_fields: Default::default(),
            edit_focus: 0,
            edit_target: None,
            edit_return: Screen::DeckSelect,
            overall: OverallStats::default(),
            status_message: None,
        };
        app.refresh_deck_list();
        app
    }

    pub fn set_status(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    pub fn cycle_theme(&mut self) {
        let new_theme_name = self.theme.name.next();
        self.theme = Theme::new(new_theme_name);
        self.config.theme = new_theme_name.as_str().to_string();
        self.save_config();
    }

    fn save_config(&mut self) {
        if let Err(e) = self.config.save() {
            tracing::error!(error = %e, "failed to save config");
            self.set_status(format!("Could not save settings: {}", e));
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Deck List
    // ══════════════════════════════════════════════════════════════════════

    pub fn refresh_deck_list(&mut self) {
        match self.storage.list_decks(now_ms()) {
            Ok(mut decks) => {
                self.deck_sort.sort(&mut decks);
                self.deck_list = decks;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to list decks");
                self.set_status(format!("Could not list decks: {}", e));
                self.deck_list.clear();
            }
        }
        self.clamp_deck_selection();
    }

    pub fn visible_decks(&self) -> Vec<&DeckInfo> {
        filter_decks(&self.deck_list, &self.search_query)
    }

    fn clamp_deck_selection(&mut self) {
        let len = self.visible_decks().len();
        match self.deck_list_state.selected() {
            _ if len == 0 => self.deck_list_state.select(None),
            Some(i) if i >= len => self.deck_list_state.select(Some(len - 1)),
            None => self.deck_list_state.select(Some(0)),
            _ => {}
        }
    }

    pub fn selected_deck(&self) -> Option<DeckInfo> {
        let i = self.deck_list_state.selected()?;
        self.visible_decks().get(i).map(|d| (*d).clone())
    }

    pub fn cycle_sort(&mut self) {
        self.deck_sort = self.deck_sort.next();
        self.deck_sort.sort(&mut self.deck_list);
        self.set_status(format!("Sorted by {}", self.deck_sort.name()));
    }

    pub fn open_deck(&mut self, filename: &str) {
        match self.storage.load_deck(filename) {
            Ok(cards) => {
                tracing::info!(deck = filename, cards = cards.len(), "opened deck");
                self.current_deck = Some(filename.to_string());
                self.cards = cards;
                self.mode_list_state.select(Some(0));
                self.screen = Screen::ModeSelect;
            }
            Err(e) => {
                tracing::error!(deck = filename, error = %e, "failed to load deck");
                self.set_status(format!("Failed to load deck: {}", e));
            }
        }
    }

    pub fn confirm_pending(&mut self, action: PendingAction) {
        self.pending = None;
        let Some(deck) = self.selected_deck() else {
            return;
        };

        let result = match action {
            PendingAction::Delete => self
                .storage
                .delete_deck(&deck.filename)
                .map(|_| format!("Deleted {}", deck.name)),
            PendingAction::Reset => self
                .storage
                .reset_progress(&deck.filename)
                .map(|n| format!("Reset progress on {} cards in {}", n, deck.name)),
        };

        match result {
            Ok(message) => {
                if action == PendingAction::Delete {
                    self.config.clear_deck_settings(&deck.filename);
                    self.save_config();
                }
                self.set_status(message);
            }
            Err(e) => self.set_status(format!("Failed: {}", e)),
        }
        self.refresh_deck_list();
    }

    pub fn back_to_decks(&mut self) {
        self.session = None;
        self.current_card = None;
        self.current_deck = None;
        self.cards.clear();
        self.summary = None;
        self.screen = Screen::DeckSelect;
        self.refresh_deck_list();
    }

    fn deck_display_name(&self) -> String {
        let Some(filename) = self.current_deck.as_deref() else {
            return "Deck".to_string();
        };
        self.deck_list
            .iter()
            .find(|d| d.filename == filename)
            .map(|d| d.name.clone())
            .unwrap_or_else(|| filename.to_string())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Study Session
    // ══════════════════════════════════════════════════════════════════════

    fn effective_settings(&self) -> Settings {
        self.config.settings_for(self.current_deck.as_deref())
    }

    pub fn start_session(&mut self, mode: StudyMode) {
        let Some(filename) = self.current_deck.clone() else {
            return;
        };
        let pool = mode.count(&self.cards, now_ms());
        if pool == 0 {
            self.set_status(format!("No cards in {}", mode.name()));
            return;
        }

        tracing::info!(deck = %filename, ?mode, "starting study session");
        self.session = Some(StudySession::new(mode, self.storage.max_streak(&filename)));
        self.session_pool = pool;
        self.summary = None;
        self.next_card();
    }

    pub fn next_card(&mut self) {
        let settings = self.effective_settings();
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match session.next_card(&self.cards, &settings, now_ms(), &mut self.selector) {
            Some(card) => {
                self.current_card = Some(card);
                self.showing_answer = false;
                self.answer_result = None;
                self.screen = Screen::Study;
            }
            None => self.end_session(),
        }
    }

    pub fn show_answer(&mut self) {
        self.showing_answer = true;
    }

    pub fn answer_card(&mut self, is_correct: bool) {
        if !self.showing_answer || self.answer_result.is_some() {
            return;
        }
        let (Some(card), Some(filename)) = (self.current_card.as_ref(), self.current_deck.clone()) else {
            return;
        };

        let updated = card.answered(is_correct, now_ms());
        if let Some(slot) = self.cards.iter_mut().find(|c| c.id == updated.id) {
            *slot = updated.clone();
        }

        if let Err(e) = self.storage.save_deck(&filename, &self.cards) {
            tracing::error!(deck = %filename, error = %e, "failed to save progress");
            self.set_status(format!("Failed to save progress: {}", e));
        }

        if let Some(session) = self.session.as_mut() {
            let update = session.record_answer(is_correct);
            if let Some(best) = update.new_best {
                if let Err(e) = self.storage.set_max_streak(&filename, best) {
                    tracing::warn!(deck = %filename, error = %e, "failed to save max streak");
                }
            }
            if update.celebrate {
                let best = session.best_streak();
                self.status_message = Some((format!("New best streak: {}!", best), Instant::now()));
            }
        }

        self.current_card = Some(updated);
        self.answer_result = Some(is_correct);
    }

    /// Leave the study screen, showing a summary if anything was answered.
    pub fn end_session(&mut self) {
        let summary = self
            .session
            .as_ref()
            .filter(|s| s.cards_studied() > 0)
            .map(StudySession::summary);
        match summary {
            Some(summary) => {
                self.summary = Some(summary);
                self.current_card = None;
                self.screen = Screen::Summary;
            }
            None => self.back_to_decks(),
        }
    }

    pub fn study_again(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.restart();
            self.session_pool = session.mode.count(&self.cards, now_ms());
            self.summary = None;
            self.next_card();
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Settings Editor
    // ══════════════════════════════════════════════════════════════════════

    pub fn open_settings(&mut self) {
        self.settings_deck_scope = self
            .current_deck
            .as_deref()
            .is_some_and(|d| self.config.has_deck_override(d));
        self.settings_draft = self.effective_settings();
        self.settings_field = 0;
        self.settings_return = self.screen;
        self.screen = Screen::Settings;
    }

    fn toggle_settings_scope(&mut self) {
        if self.current_deck.is_none() {
            return;
        }
        self.settings_deck_scope = !self.settings_deck_scope;
        self.settings_draft = if self.settings_deck_scope {
            self.effective_settings()
        } else {
            self.config.settings
        };
    }

    pub fn save_settings(&mut self) {
        match (self.settings_deck_scope, self.current_deck.clone()) {
            (true, Some(deck)) => self.config.set_deck_settings(&deck, self.settings_draft),
            _ => self.config.set_global_settings(self.settings_draft),
        }
        self.save_config();
        tracing::info!(settings = ?self.settings_draft, deck_scope = self.settings_deck_scope, "updated settings");

        self.screen = self.settings_return;

        // New weights apply to the card being shown too, unless it was already answered.
        if self.screen == Screen::Study && self.answer_result.is_none() {
            let settings = self.effective_settings();
            if let Some(session) = self.session.as_mut() {
                match session.reselect(&self.cards, &settings, now_ms(), &mut self.selector) {
                    Some(card) => {
                        self.current_card = Some(card);
                        self.showing_answer = false;
                    }
                    None => self.end_session(),
                }
            }
        }
    }

    fn remove_deck_override(&mut self) {
        if let Some(deck) = self.current_deck.clone() {
            self.config.clear_deck_settings(&deck);
            self.save_config();
            self.settings_deck_scope = false;
            self.settings_draft = self.config.settings;
            self.set_status("Deck now uses global settings".to_string());
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Deck Details Editor
    // ══════════════════════════════════════════════════════════════════════

    pub fn start_edit_deck(&mut self, deck: &DeckInfo) {
        let details = deck.details();
        self.edit_fields = [
            details.name,
            details.description,
            details.category,
            details.colour,
            details.tags.join(", "),
        ];
        self.edit_focus = 0;
        self.edit_target = Some(deck.filename.clone());
        self.edit_return = self.screen;
        self.screen = Screen::EditDeck;
    }

    fn edit_current_deck(&mut self) {
        let Some(filename) = self.current_deck.as_deref() else {
            return;
        };
        if let Some(info) = self.deck_list.iter().find(|d| d.filename == filename).cloned() {
            self.start_edit_deck(&info);
        }
    }

    pub fn save_deck_edit(&mut self) {
        let Some(filename) = self.edit_target.clone() else {
            return;
        };
        let [name, description, category, colour, tags] = self.edit_fields.clone();
        let details = DeckDetails {
            name,
            description,
            category,
            colour,
            tags: tags.split(',').map(|t| t.trim().to_string()).collect(),
        };

        match self.storage.save_details(&filename, &details) {
            Ok(_) => {
                self.set_status(format!("Saved {}", details.name.trim()));
                self.refresh_deck_list();
                self.screen = self.edit_return;
                self.edit_target = None;
            }
            Err(e) => self.set_status(format!("Failed to save deck: {}", e)),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Stats
    // ══════════════════════════════════════════════════════════════════════

    pub fn open_stats(&mut self) {
        let now = now_ms();
        let mut all_cards = Vec::new();
        for deck in &self.deck_list {
            match self.storage.load_deck(&deck.filename) {
                Ok(cards) => all_cards.extend(cards),
                Err(e) => tracing::warn!(deck = %deck.filename, error = %e, "skipping deck in stats"),
            }
        }

        let dates: Vec<NaiveDate> = all_cards
            .iter()
            .filter_map(|c| c.last_asked)
            .filter_map(|ms| Local.timestamp_millis_opt(ms).single())
            .map(|dt| dt.date_naive())
            .collect();
        let (daily_streak, weekly_streak) = study_streaks(&dates, Local::now().date_naive());

        self.overall = OverallStats {
            decks: self.deck_list.len(),
            totals: DeckStats::from_cards(&all_cards, now),
            daily_streak,
            weekly_streak,
        };
        self.screen = Screen::Stats;
    }

    // ══════════════════════════════════════════════════════════════════════
    // Event Handling
    // ══════════════════════════════════════════════════════════════════════

    pub fn handle_events(&mut self) -> anyhow::Result<()> {
        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    return Ok(());
                }
                self.handle_key(key.code);
            }
        }
        Ok(())
    }

    pub fn handle_key(&mut self, key: KeyCode) {
        match self.screen {
            Screen::DeckSelect => self.handle_deck_select_keys(key),
            Screen::ModeSelect => self.handle_mode_select_keys(key),
            Screen::Study => self.handle_study_keys(key),
            Screen::Settings => self.handle_settings_keys(key),
            Screen::EditDeck => self.handle_edit_deck_keys(key),
            Screen::Stats => self.handle_stats_keys(key),
            Screen::Summary => self.handle_summary_keys(key),
        }
    }

    fn handle_deck_select_keys(&mut self, key: KeyCode) {
        if self.searching {
            match key {
                KeyCode::Esc => {
                    self.searching = false;
                    self.search_query.clear();
                }
                KeyCode::Enter => self.searching = false,
                KeyCode::Backspace => {
                    self.search_query.pop();
                }
                KeyCode::Char(c) => self.search_query.push(c),
                _ => {}
            }
            self.deck_list_state.select(Some(0));
            self.clamp_deck_selection();
            return;
        }

        if let Some(action) = self.pending.take() {
            let confirm = match action {
                PendingAction::Delete => KeyCode::Char('d'),
                PendingAction::Reset => KeyCode::Char('r'),
            };
            if key == confirm {
                self.confirm_pending(action);
            }
            return;
        }

        let len = self.visible_decks().len();
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char('t') => self.cycle_theme(),
            KeyCode::Up | KeyCode::Char('k') if len > 0 => {
                let i = self.deck_list_state.selected().unwrap_or(0);
                let new_i = if i == 0 { len - 1 } else { i - 1 };
                self.deck_list_state.select(Some(new_i));
            }
            KeyCode::Down | KeyCode::Char('j') if len > 0 => {
                let i = self.deck_list_state.selected().unwrap_or(0);
                let new_i = if i + 1 >= len { 0 } else { i + 1 };
                self.deck_list_state.select(Some(new_i));
            }
            KeyCode::Enter => {
                if let Some(deck) = self.selected_deck() {
                    self.open_deck(&deck.filename);
                }
            }
            KeyCode::Char('/') => self.searching = true,
            KeyCode::Char('o') => self.cycle_sort(),
            KeyCode::Char('e') => {
                if let Some(deck) = self.selected_deck() {
                    self.start_edit_deck(&deck);
                }
            }
            KeyCode::Char('d') if len > 0 => self.pending = Some(PendingAction::Delete),
            KeyCode::Char('r') if len > 0 => self.pending = Some(PendingAction::Reset),
            KeyCode::Char('c') => self.open_settings(),
            KeyCode::Char('s') => self.open_stats(),
            _ => {}
        }
    }

    fn handle_mode_select_keys(&mut self, key: KeyCode) {
        let modes = StudyMode::all();
        match key {
            KeyCode::Esc | KeyCode::Char('q') => self.back_to_decks(),
            KeyCode::Up | KeyCode::Char('k') => {
                let i = self.mode_list_state.selected().unwrap_or(0);
                self.mode_list_state
                    .select(Some(if i == 0 { modes.len() - 1 } else { i - 1 }));
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let i = self.mode_list_state.selected().unwrap_or(0);
                self.mode_list_state.select(Some((i + 1) % modes.len()));
            }
            KeyCode::Enter => {
                let i = self.mode_list_state.selected().unwrap_or(0);
                self.start_session(modes[i]);
            }
            KeyCode::Char('c') => self.open_settings(),
            KeyCode::Char('e') => self.edit_current_deck(),
            KeyCode::Char('t') => self.cycle_theme(),
            _ => {}
        }
    }

    fn handle_study_keys(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc | KeyCode::Char('q') => self.end_session(),
            KeyCode::Char('t') => self.cycle_theme(),
            KeyCode::Char('c') => self.open_settings(),
            KeyCode::Enter | KeyCode::Char(' ') => {
                if !self.showing_answer {
                    self.show_answer();
                } else if self.answer_result.is_some() {
                    self.next_card();
                }
            }
            KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('1') => self.answer_card(false),
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('2') => self.answer_card(true),
            KeyCode::Char('n') if self.answer_result.is_some() => self.next_card(),
            _ => {}
        }
    }

    fn handle_settings_keys(&mut self, key: KeyCode) {
        let fields = SettingField::all();
        let field = fields[self.settings_field];
        match key {
            KeyCode::Esc => self.screen = self.settings_return,
            KeyCode::Enter => self.save_settings(),
            KeyCode::Up | KeyCode::Char('k') => {
                self.settings_field = (self.settings_field + fields.len() - 1) % fields.len();
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.settings_field = (self.settings_field + 1) % fields.len();
            }
            KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('-') => {
                self.settings_draft.adjust(field, -1)
            }
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('+') | KeyCode::Char('=') => {
                self.settings_draft.adjust(field, 1)
            }
            KeyCode::Tab => self.toggle_settings_scope(),
            KeyCode::Char('r') => self.settings_draft = Settings::default(),
            KeyCode::Char('x') => self.remove_deck_override(),
            _ => {}
        }
    }

    fn handle_edit_deck_keys(&mut self, key: KeyCode) {
        let count = EDIT_FIELDS.len();
        match key {
            KeyCode::Esc => {
                self.edit_target = None;
                self.screen = self.edit_return;
            }
            KeyCode::Enter => self.save_deck_edit(),
            KeyCode::Tab | KeyCode::Down => self.edit_focus = (self.edit_focus + 1) % count,
            KeyCode::BackTab | KeyCode::Up => self.edit_focus = (self.edit_focus + count - 1) % count,
            KeyCode::Backspace => {
                self.edit_fields[self.edit_focus].pop();
            }
            KeyCode::Char(c) => self.edit_fields[self.edit_focus].push(c),
            _ => {}
        }
    }

    fn handle_stats_keys(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc | KeyCode::Char('q') => self.screen = Screen::DeckSelect,
            KeyCode::Char('t') => self.cycle_theme(),
            _ => {}
        }
    }

    fn handle_summary_keys(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('a') => self.study_again(),
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => self.back_to_decks(),
            _ => {}
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Rendering
    // ══════════════════════════════════════════════════════════════════════

    pub fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();

        // Clear with background
        frame.render_widget(Clear, area);
        frame.render_widget(
            Block::default().style(Style::default().bg(self.theme.colors.bg)),
            area,
        );

        match self.screen {
            Screen::DeckSelect => self.render_deck_select(frame, area),
            Screen::ModeSelect => self.render_mode_select(frame, area),
            Screen::Study => self.render_study(frame, area),
            Screen::Settings => self.render_settings(frame, area),
            Screen::EditDeck => self.render_edit_deck(frame, area),
            Screen::Stats => self.render_stats(frame, area),
            Screen::Summary => self.render_summary(frame, area),
        }

        // Show status message if recent (within 5 seconds)
        if let Some((ref msg, time)) = self.status_message {
            if time.elapsed().as_secs() < 5 {
                let status = Paragraph::new(msg.as_str())
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(self.theme.colors.success));
                let status_area = Rect {
                    y: area.bottom().saturating_sub(3),
                    height: 1,
                    ..area
                };
                frame.render_widget(status, status_area);
            }
        }
    }

    fn rounded_block<'a>(&self, title: &'a str, color: ratatui::style::Color) -> Block<'a> {
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(color))
            .title(title)
            .title_style(Style::default().fg(color).add_modifier(Modifier::BOLD))
    }

    fn render_deck_select(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::vertical([
            Constraint::Length(1),   // Top padding
            Constraint::Length(6),   // Logo
            Constraint::Length(1),   // Spacing
            Constraint::Length(1),   // Search / sort line
            Constraint::Min(5),      // Deck list
            Constraint::Length(3),   // Help
        ])
        .split(area);

        frame.render_widget(Logo::new(&self.theme), chunks[1]);

        let list_area = centered_rect(70, 100, chunks[4]);
        let search_line = Line::from(vec![
            Span::styled("Search: ", self.theme.muted()),
            Span::styled(
                if self.search_query.is_empty() && !self.searching {
                    "(press /)".to_string()
                } else {
                    format!("{}{}", self.search_query, if self.searching { "▏" } else { "" })
                },
                Style::default().fg(self.theme.colors.text),
            ),
            Span::styled("   Sort: ", self.theme.muted()),
            Span::styled(self.deck_sort.name(), self.theme.highlight()),
        ]);
        frame.render_widget(
            Paragraph::new(search_line).alignment(Alignment::Center),
            chunks[3],
        );

        let visible = self.visible_decks();
        let items: Vec<ListItem> = visible
            .iter()
            .map(|deck| {
                let mut spans = vec![Span::styled(
                    deck.name.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )];
                if let Some(category) = &deck.category {
                    spans.push(Span::styled(format!(" [{}]", category), self.theme.dim()));
                }
                spans.push(Span::styled(
                    format!(
                        " {} cards, {} new, {} to review",
                        deck.stats.card_count, deck.stats.new_cards, deck.stats.cards_needing_review
                    ),
                    self.theme.muted(),
                ));
                if deck.stats.cards_studied > 0 {
                    spans.push(Span::styled(
                        format!(" {:.0}%", deck.stats.average_accuracy * 100.0),
                        Style::default().fg(self.theme.accuracy_color(deck.stats.average_accuracy)),
                    ));
                }
                if deck.needs_setup {
                    spans.push(Span::styled(" (needs setup)", Style::default().fg(self.theme.colors.warning)));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();

        let title = format!(" Decks ({} of {}) ", visible.len(), self.deck_list.len());
        let list = List::new(items)
            .block(self.rounded_block(&title, self.theme.colors.primary))
            .highlight_style(self.theme.selected())
            .highlight_symbol("> ");

        frame.render_stateful_widget(list, list_area, &mut self.deck_list_state);

        let theme_hint = format!("[{}]", self.theme.name.display_name());
        let hints: Vec<(&str, &str)> = match self.pending {
            Some(PendingAction::Delete) => vec![("d", "confirm delete"), ("any", "cancel")],
            Some(PendingAction::Reset) => vec![("r", "confirm reset progress"), ("any", "cancel")],
            None if self.searching => vec![("Enter", "done"), ("Esc", "clear")],
            None => vec![
                ("j/k", "nav"),
                ("Enter", "study"),
                ("/", "search"),
                ("o", "sort"),
                ("e", "edit"),
                ("r", "reset"),
                ("d", "del"),
                ("c", "settings"),
                ("s", "stats"),
                ("t", theme_hint.as_str()),
                ("q", "quit"),
            ],
        };
        frame.render_widget(KeyHints::new(&hints, &self.theme), chunks[5]);
    }

    fn render_mode_select(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::vertical([
            Constraint::Length(3),   // Header
            Constraint::Min(8),      // Modes
            Constraint::Length(2),   // Hints
        ])
        .split(area);

        let header = Paragraph::new(format!("{} - Select Study Mode", self.deck_display_name()))
            .alignment(Alignment::Center)
            .style(self.theme.title());
        frame.render_widget(header, chunks[0]);

        let now = now_ms();
        let items: Vec<ListItem> = StudyMode::all()
            .iter()
            .map(|mode| {
                let count = mode.count(&self.cards, now);
                let count_style = if count == 0 { self.theme.dim() } else { self.theme.highlight() };
                ListItem::new(vec![
                    Line::from(vec![
                        Span::styled(mode.name(), Style::default().add_modifier(Modifier::BOLD)),
                        Span::styled(format!("  {} cards", count), count_style),
                    ]),
                    Line::from(Span::styled(format!("  {}", mode.description()), self.theme.muted())),
                ])
            })
            .collect();

        let list = List::new(items)
            .block(self.rounded_block(" Study Mode ", self.theme.colors.primary))
            .highlight_style(self.theme.selected())
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, centered_rect(60, 100, chunks[1]), &mut self.mode_list_state);

        let hints = KeyHints::new(
            &[
                ("j/k", "nav"),
                ("Enter", "start"),
                ("c", "settings"),
                ("e", "edit deck"),
                ("Esc", "back"),
            ],
            &self.theme,
        );
        frame.render_widget(hints, chunks[2]);
    }

    fn render_study(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::vertical([
            Constraint::Length(3),   // Header
            Constraint::Length(1),   // Stats
            Constraint::Length(1),   // Separator
            Constraint::Min(10),     // Card
            Constraint::Length(1),   // Separator
            Constraint::Length(4),   // Buttons
            Constraint::Length(2),   // Hints
        ])
        .split(area);

        let (mode, shown, streak, best) = match &self.session {
            Some(s) => (s.mode, s.shown_count(), s.streak(), s.best_streak()),
            None => (StudyMode::All, 0, 0, 0),
        };
        let pool = self.session_pool.max(shown);

        let header = Paragraph::new(vec![
            Line::from(Span::styled(self.deck_display_name(), self.theme.title())),
            Line::from(Span::styled(
                format!("{} · card {} of {}", mode.name(), shown, pool),
                self.theme.muted(),
            )),
        ])
        .alignment(Alignment::Center);
        frame.render_widget(header, chunks[0]);

        let stats = DeckStats::from_cards(&self.cards, now_ms());
        frame.render_widget(StatsBar::new(&stats, streak, best, &self.theme), chunks[1]);

        let card_area = centered_rect(80, 100, chunks[3]);
        if let Some(card) = &self.current_card {
            let mut widget = FlashcardWidget::new(&card.question, &self.theme).result(self.answer_result);
            if self.showing_answer {
                widget = widget.revealed(&card.answer);
            }
            frame.render_widget(widget, card_area);

            let preview = accuracy_preview(card, now_ms());
            let enabled = self.showing_answer && self.answer_result.is_none();
            frame.render_widget(
                AnswerButtons::new(preview, enabled, &self.theme),
                centered_rect(60, 100, chunks[5]),
            );
        }

        let hints: &[(&str, &str)] = if !self.showing_answer {
            &[("Enter", "show answer"), ("c", "settings"), ("Esc", "end session")]
        } else if self.answer_result.is_none() {
            &[("←/h", "incorrect"), ("→/l", "correct"), ("Esc", "end session")]
        } else {
            &[("Enter", "next card"), ("c", "settings"), ("Esc", "end session")]
        };
        frame.render_widget(KeyHints::new(hints, &self.theme), chunks[6]);
    }

    fn render_settings(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::vertical([
            Constraint::Length(3),   // Title
            Constraint::Length(2),   // Scope
            Constraint::Min(8),      // Fields
            Constraint::Length(2),   // Hints
        ])
        .split(centered_rect(60, 100, area));

        let title = Paragraph::new("Settings")
            .alignment(Alignment::Center)
            .style(self.theme.title());
        frame.render_widget(title, chunks[0]);

        let scope = match (&self.current_deck, self.settings_deck_scope) {
            (Some(_), true) => format!("Applies to: {} only", self.deck_display_name()),
            _ => "Applies to: all decks".to_string(),
        };
        frame.render_widget(
            Paragraph::new(scope).alignment(Alignment::Center).style(self.theme.muted()),
            chunks[1],
        );

        let lines: Vec<Line> = SettingField::all()
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let value = self.settings_draft.get(*field);
                let shown = match field {
                    SettingField::ForgottenCardChance => format!("{:.0}%", value * 100.0),
                    SettingField::ForgottenCardThreshold => format!("{:.0} days", value),
                    _ => format!("{:.1}x", value),
                };
                let (min, max) = field.range();
                let style = if i == self.settings_field { self.theme.selected() } else { Style::default() };
                Line::from(vec![
                    Span::styled(format!("{:<26}", field.label()), style.fg(self.theme.colors.text)),
                    Span::styled(format!("◀ {:>8} ▶", shown), style.fg(self.theme.colors.accent)),
                    Span::styled(format!("   ({} to {})", min, max), self.theme.dim()),
                ])
            })
            .collect();

        let fields = Paragraph::new(lines)
            .block(self.rounded_block(" Card Selection ", self.theme.colors.primary))
            .wrap(Wrap { trim: false });
        frame.render_widget(fields, chunks[2]);

        let mut hints = vec![("j/k", "field"), ("h/l", "adjust"), ("r", "defaults")];
        if self.current_deck.is_some() {
            hints.push(("Tab", "deck/global"));
            hints.push(("x", "use global"));
        }
        hints.push(("Enter", "save"));
        hints.push(("Esc", "cancel"));
        frame.render_widget(KeyHints::new(&hints, &self.theme), chunks[3]);
    }

    fn render_edit_deck(&mut self, frame: &mut Frame, area: Rect) {
        let mut constraints = vec![Constraint::Length(3)];
        constraints.extend(EDIT_FIELDS.iter().map(|_| Constraint::Length(3)));
        constraints.push(Constraint::Min(1));
        constraints.push(Constraint::Length(2));
        let chunks = Layout::vertical(constraints).split(centered_rect(60, 100, area));

        let filename = self.edit_target.as_deref().unwrap_or("deck");
        let title = Paragraph::new(format!("Deck Details - {}", filename))
            .alignment(Alignment::Center)
            .style(self.theme.title());
        frame.render_widget(title, chunks[0]);

        for (i, label) in EDIT_FIELDS.iter().enumerate() {
            let color = if i == self.edit_focus {
                self.theme.colors.accent
            } else {
                self.theme.colors.text_muted
            };
            let title = format!(" {} ", label);
            let input = Paragraph::new(self.edit_fields[i].as_str())
                .block(self.rounded_block(&title, color));
            let field_area = chunks[i + 1];
            frame.render_widget(input, field_area);

            if i == self.edit_focus {
                let len = self.edit_fields[i].chars().count() as u16;
                let max_x = field_area.right().saturating_sub(2);
                frame.set_cursor_position(((field_area.x + 1 + len).min(max_x), field_area.y + 1));
            }
        }

        let hints = KeyHints::new(
            &[("Tab", "next field"), ("Enter", "save"), ("Esc", "cancel")],
            &self.theme,
        );
        frame.render_widget(hints, chunks[chunks.len() - 1]);
    }

    fn render_stats(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::vertical([
            Constraint::Length(3),   // Title
            Constraint::Length(1),   // Spacing
            Constraint::Min(10),     // Stats content
            Constraint::Length(2),   // Hints
        ])
        .split(area);

        let title = Paragraph::new("Stats")
            .alignment(Alignment::Center)
            .style(self.theme.title());
        frame.render_widget(title, chunks[0]);

        let content_area = centered_rect(70, 100, chunks[2]);
        let stat_chunks = Layout::vertical([
            Constraint::Length(6),   // Overview stats
            Constraint::Length(1),   // Spacing
            Constraint::Min(7),      // Progress breakdown
        ])
        .split(content_area);

        let o = &self.overall;
        let label = |s: &'static str| Span::styled(s, self.theme.muted());
        let bold = |v: String, color| Span::styled(v, Style::default().fg(color).add_modifier(Modifier::BOLD));
        let plural = |n: u32, unit: &str| format!("{} {}{}", n, unit, if n == 1 { "" } else { "s" });
        let streak_color = |n: u32| if n > 0 { self.theme.colors.success } else { self.theme.colors.text_dim };

        let overview = Paragraph::new(vec![
            Line::from(vec![label("Decks: "), bold(o.decks.to_string(), self.theme.colors.primary)]),
            Line::from(vec![label("Total Cards: "), bold(o.totals.card_count.to_string(), self.theme.colors.primary)]),
            Line::from(vec![
                label("Daily Streak: "),
                bold(plural(o.daily_streak, "day"), streak_color(o.daily_streak)),
            ]),
            Line::from(vec![
                label("Weekly Streak: "),
                bold(plural(o.weekly_streak, "week"), streak_color(o.weekly_streak)),
            ]),
        ])
        .block(self.rounded_block(" Overview ", self.theme.colors.primary));
        frame.render_widget(overview, stat_chunks[0]);

        let progress = Paragraph::new(vec![
            Line::from(vec![
                label("New: "),
                bold(o.totals.new_cards.to_string(), self.theme.colors.info),
                Span::styled(" cards not yet studied", self.theme.dim()),
            ]),
            Line::from(vec![
                label("Studied: "),
                bold(o.totals.cards_studied.to_string(), self.theme.colors.primary),
                Span::styled(
                    format!(" cards, {:.0}% average accuracy", o.totals.average_accuracy * 100.0),
                    self.theme.dim(),
                ),
            ]),
            Line::from(vec![
                label("Mastered: "),
                bold(o.totals.cards_mastered.to_string(), self.theme.colors.success),
                Span::styled(" cards (accuracy >= 80%)", self.theme.dim()),
            ]),
            Line::from(vec![
                label("Needs Review: "),
                bold(o.totals.cards_needing_review.to_string(), self.theme.colors.warning),
                Span::styled(" cards (accuracy < 50% or idle 7+ days)", self.theme.dim()),
            ]),
        ])
        .block(self.rounded_block(" Progress ", self.theme.colors.accent));
        frame.render_widget(progress, stat_chunks[2]);

        let hints = KeyHints::new(&[("t", "theme"), ("Esc", "back")], &self.theme);
        frame.render_widget(hints, chunks[3]);
    }

    fn render_summary(&mut self, frame: &mut Frame, area: Rect) {
        if let Some(summary) = &self.summary {
            frame.render_widget(
                SummaryScreen::new(summary, &self.theme),
                centered_rect(50, 50, area),
            );
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Helper Functions
// ══════════════════════════════════════════════════════════════════════════

/// Create a centered rectangle.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .split(r);

    Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .split(popup_layout[1])[1]
}

/// Daily and weekly study streaks ending at `today`.
///
/// A streak may end yesterday (or last week) so it is not lost before the
/// first answer of the day. Weeks run Monday to Sunday.
fn study_streaks(dates: &[NaiveDate], today: NaiveDate) -> (u32, u32) {
    use std::collections::HashSet;

    let days: HashSet<NaiveDate> = dates.iter().copied().collect();
    if days.is_empty() {
        return (0, 0);
    }

    fn count_back(mut day: NaiveDate, step: chrono::Duration, present: impl Fn(NaiveDate) -> bool) -> u32 {
        if !present(day) {
            day -= step;
        }
        let mut streak = 0;
        while present(day) {
            streak += 1;
            day -= step;
        }
        streak
    }

    let daily = count_back(today, chrono::Duration::days(1), |d| days.contains(&d));

    let monday = today - chrono::Duration::days(i64::from(today.weekday().num_days_from_monday()));
    let weekly = count_back(monday, chrono::Duration::days(7), |week_start| {
        (0..7).any(|d| days.contains(&(week_start + chrono::Duration::days(d))))
    });

    (daily, weekly)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_study_streaks_empty() {
        assert_eq!(study_streaks(&[], date(2024, 3, 14)), (0, 0));
    }

    #[test]
    fn test_daily_streak_counts_consecutive_days() {
        // 2024-03-14 is a Thursday.
        let today = date(2024, 3, 14);
        let dates = [date(2024, 3, 14), date(2024, 3, 13), date(2024, 3, 12), date(2024, 3, 10)];
        assert_eq!(study_streaks(&dates, today).0, 3);
    }

    #[test]
    fn test_daily_streak_may_end_yesterday() {
        let today = date(2024, 3, 14);
        let dates = [date(2024, 3, 13), date(2024, 3, 12)];
        assert_eq!(study_streaks(&dates, today).0, 2);

        let stale = [date(2024, 3, 11)];
        assert_eq!(study_streaks(&stale, today).0, 0);
    }

    #[test]
    fn test_weekly_streak() {
        let today = date(2024, 3, 14);
        // This week, last week, the week before; then a gap.
        let dates = [date(2024, 3, 11), date(2024, 3, 7), date(2024, 2, 26), date(2024, 2, 12)];
        assert_eq!(study_streaks(&dates, today).1, 3);

        // Nothing this week yet, but last week counts.
        let dates = [date(2024, 3, 8)];
        assert_eq!(study_streaks(&dates, today).1, 1);
    }
}
