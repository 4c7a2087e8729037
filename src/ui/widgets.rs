//! Custom widgets for the flashcard TUI.

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{block::BorderType, Block, Borders, Paragraph, Widget, Wrap},
};

use super::theme::Theme;
use crate::models::DeckStats;
use crate::session::SessionSummary;

// ══════════════════════════════════════════════════════════════════════════
// Logo Widget
// ══════════════════════════════════════════════════════════════════════════

pub struct Logo<'a> {
    theme: &'a Theme,
}

impl<'a> Logo<'a> {
    const ART: &'static str = r#"
 _   _             _    _
| | | | __ _ _ __ | | _(_)
| |_| |/ _` | '_ \| |/ / |
|  _  | (_| | | | |   <| |
|_| |_|\__,_|_| |_|_|\_\_|"#;

    pub fn new(theme: &'a Theme) -> Self {
        Self { theme }
    }
}

impl Widget for Logo<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut lines: Vec<Line> = Self::ART
            .lines()
            .skip(1)
            .map(|line| Line::from(Span::styled(line, Style::default().fg(self.theme.colors.primary))))
            .collect();
        lines.push(Line::from(Span::styled(
            "study what you keep getting wrong",
            self.theme.dim(),
        )));

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .render(area, buf);
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Stats Bar Widget
// ══════════════════════════════════════════════════════════════════════════

pub struct StatsBar<'a> {
    stats: &'a DeckStats,
    streak: u32,
    best_streak: u32,
    theme: &'a Theme,
}

impl<'a> StatsBar<'a> {
    pub fn new(stats: &'a DeckStats, streak: u32, best_streak: u32, theme: &'a Theme) -> Self {
        Self { stats, streak, best_streak, theme }
    }

    fn cell(&self, label: &'a str, value: String, value_style: Style) -> Line<'a> {
        Line::from(vec![
            Span::styled("● ", value_style),
            Span::styled(label, self.theme.muted()),
            Span::styled(value, value_style),
        ])
    }
}

impl Widget for StatsBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::horizontal([Constraint::Ratio(1, 5); 5]).split(area);
        let bold = |color| Style::default().fg(color).add_modifier(Modifier::BOLD);

        let cells = [
            self.cell("New: ", self.stats.new_cards.to_string(), bold(self.theme.colors.info)),
            self.cell(
                "Review: ",
                self.stats.cards_needing_review.to_string(),
                bold(self.theme.colors.warning),
            ),
            self.cell(
                "Mastered: ",
                self.stats.cards_mastered.to_string(),
                bold(self.theme.colors.success),
            ),
            self.cell(
                "Accuracy: ",
                format!("{:.0}%", self.stats.average_accuracy * 100.0),
                bold(self.theme.accuracy_color(self.stats.average_accuracy)),
            ),
            self.cell(
                "Streak: ",
                format!("{} (best {})", self.streak, self.best_streak),
                bold(self.theme.colors.accent),
            ),
        ];

        for (cell, chunk) in cells.into_iter().zip(chunks.iter()) {
            Paragraph::new(cell)
                .alignment(Alignment::Center)
                .render(*chunk, buf);
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Flashcard Widget
// ══════════════════════════════════════════════════════════════════════════

pub struct FlashcardWidget<'a> {
    question: &'a str,
    answer: Option<&'a str>,
    /// `Some(is_correct)` once the card has been answered.
    result: Option<bool>,
    theme: &'a Theme,
}

impl<'a> FlashcardWidget<'a> {
    pub fn new(question: &'a str, theme: &'a Theme) -> Self {
        Self { question, answer: None, result: None, theme }
    }

    pub fn revealed(mut self, answer: &'a str) -> Self {
        self.answer = Some(answer);
        self
    }

    pub fn result(mut self, result: Option<bool>) -> Self {
        self.result = result;
        self
    }
}

impl Widget for FlashcardWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (label, label_style, border_color) = match (self.answer, self.result) {
            (_, Some(true)) => ("CORRECT", self.theme.answer(), self.theme.colors.correct),
            (_, Some(false)) => (
                "INCORRECT",
                Style::default().fg(self.theme.colors.incorrect).add_modifier(Modifier::BOLD),
                self.theme.colors.incorrect,
            ),
            (Some(_), None) => ("ANSWER", self.theme.answer(), self.theme.colors.success),
            (None, None) => ("QUESTION", self.theme.question(), self.theme.colors.accent),
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(border_color))
            .title(Line::from(vec![
                Span::raw(" "),
                Span::styled(label, label_style),
                Span::raw(" "),
            ]))
            .title_alignment(Alignment::Center);

        let inner = block.inner(area);
        block.render(area, buf);

        let mut lines: Vec<Line> = self
            .question
            .lines()
            .map(|l| Line::from(Span::styled(l, self.theme.title())))
            .collect();
        if let Some(answer) = self.answer {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled("─────", self.theme.dim())));
            lines.push(Line::from(""));
            lines.extend(
                answer
                    .lines()
                    .map(|l| Line::from(Span::styled(l, Style::default().fg(self.theme.colors.text)))),
            );
        }

        // Center vertically
        let content_height = lines.len() as u16;
        let vertical_padding = inner.height.saturating_sub(content_height) / 2;

        let content_area = Rect {
            x: inner.x + 2,
            y: inner.y + vertical_padding,
            width: inner.width.saturating_sub(4),
            height: inner.height.saturating_sub(vertical_padding),
        };

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(content_area, buf);
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Answer Buttons Widget
// ══════════════════════════════════════════════════════════════════════════

pub struct AnswerButtons<'a> {
    /// Projected accuracy as `(if_correct, if_incorrect)`.
    preview: (f64, f64),
    enabled: bool,
    theme: &'a Theme,
}

impl<'a> AnswerButtons<'a> {
    pub fn new(preview: (f64, f64), enabled: bool, theme: &'a Theme) -> Self {
        Self { preview, enabled, theme }
    }
}

impl Widget for AnswerButtons<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let buttons = [
            ("←", "Incorrect", self.theme.colors.incorrect, self.preview.1),
            ("→", "Correct", self.theme.colors.correct, self.preview.0),
        ];

        for ((key, name, color, projected), chunk) in buttons.into_iter().zip(chunks.iter()) {
            let color = if self.enabled { color } else { self.theme.colors.text_dim };

            let button = Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(color));
            let inner = button.inner(*chunk);
            button.render(*chunk, buf);

            let mut lines = vec![Line::from(vec![
                Span::styled(key, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::raw(" "),
                Span::styled(name, Style::default().fg(color)),
            ])];
            if self.enabled {
                lines.push(Line::from(Span::styled(
                    format!("accuracy → {:.0}%", projected * 100.0),
                    self.theme.muted(),
                )));
            }

            Paragraph::new(lines)
                .alignment(Alignment::Center)
                .render(inner, buf);
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Key Hints Widget
// ══════════════════════════════════════════════════════════════════════════

pub struct KeyHints<'a> {
    hints: &'a [(&'a str, &'a str)],
    theme: &'a Theme,
}

impl<'a> KeyHints<'a> {
    pub fn new(hints: &'a [(&'a str, &'a str)], theme: &'a Theme) -> Self {
        Self { hints, theme }
    }
}

impl Widget for KeyHints<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut spans: Vec<Span> = Vec::new();
        for (i, (key, desc)) in self.hints.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled("│ ", self.theme.dim()));
            }
            spans.push(Span::styled(*key, self.theme.key_highlight()));
            spans.push(Span::styled(format!(" {} ", desc), self.theme.key_hint()));
        }

        Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .render(area, buf);
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Session Summary Widget
// ══════════════════════════════════════════════════════════════════════════

pub struct SummaryScreen<'a> {
    summary: &'a SessionSummary,
    theme: &'a Theme,
}

impl<'a> SummaryScreen<'a> {
    pub fn new(summary: &'a SessionSummary, theme: &'a Theme) -> Self {
        Self { summary, theme }
    }
}

/// `1m 5s`, or `42s` under a minute.
pub fn format_elapsed(secs: u64) -> String {
    let (mins, secs) = (secs / 60, secs % 60);
    if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

impl Widget for SummaryScreen<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(self.theme.colors.success))
            .title(Line::from(vec![
                Span::raw(" "),
                Span::styled("SESSION COMPLETE", self.theme.answer()),
                Span::raw(" "),
            ]))
            .title_alignment(Alignment::Center);

        let inner = block.inner(area);
        block.render(area, buf);

        let value = |v: String, color| {
            Span::styled(v, Style::default().fg(color).add_modifier(Modifier::BOLD))
        };
        let row = |label: &'static str, v: Span<'static>| {
            Line::from(vec![Span::styled(label, self.theme.muted()), v])
        };

        let s = self.summary;
        let text = vec![
            Line::from(""),
            row("Cards studied: ", value(s.cards_studied.to_string(), self.theme.colors.primary)),
            row("Correct: ", value(s.correct.to_string(), self.theme.colors.correct)),
            row("Incorrect: ", value(s.incorrect.to_string(), self.theme.colors.incorrect)),
            row(
                "Accuracy: ",
                value(
                    format!("{:.0}%", s.accuracy * 100.0),
                    self.theme.accuracy_color(s.accuracy),
                ),
            ),
            row("Time: ", value(format_elapsed(s.elapsed.as_secs()), self.theme.colors.primary)),
            row("Best streak: ", value(s.best_streak.to_string(), self.theme.colors.accent)),
            Line::from(""),
            Line::from(vec![
                Span::styled("a", self.theme.key_highlight()),
                Span::styled(" study again  ", self.theme.key_hint()),
                Span::styled("Esc", self.theme.key_highlight()),
                Span::styled(" back to decks", self.theme.key_hint()),
            ]),
        ];

        Paragraph::new(text)
            .alignment(Alignment::Center)
            .render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(42), "42s");
        assert_eq!(format_elapsed(65), "1m 5s");
        assert_eq!(format_elapsed(0), "0s");
    }

    #[test]
    fn test_flashcard_widget_shows_answer_when_revealed() {
        let theme = Theme::default();
        let area = Rect::new(0, 0, 40, 10);
        let mut buf = Buffer::empty(area);
        FlashcardWidget::new("2 + 2", &theme)
            .revealed("four")
            .render(area, &mut buf);

        let text: String = buf.content.iter().map(|c| c.symbol()).collect();
        assert!(text.contains("2 + 2"));
        assert!(text.contains("four"));
        assert!(text.contains("ANSWER"));
    }

    #[test]
    fn test_flashcard_widget_hides_answer() {
        let theme = Theme::default();
        let area = Rect::new(0, 0, 40, 10);
        let mut buf = Buffer::empty(area);
        FlashcardWidget::new("2 + 2", &theme).render(area, &mut buf);

        let text: String = buf.content.iter().map(|c| c.symbol()).collect();
        assert!(text.contains("QUESTION"));
        assert!(!text.contains("four"));
    }
}
