//! Data models for flashcards and study modes.

/// Milliseconds in one day.
pub const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Accuracy at or above which a studied card counts as mastered.
pub const MASTERED_ACCURACY: f64 = 0.8;

/// Accuracy below which a studied card needs review.
pub const REVIEW_ACCURACY: f64 = 0.5;

/// Days without study after which a card needs review.
pub const REVIEW_AFTER_DAYS: i64 = 7;

/// A single flashcard.
///
/// Answering a card produces a new version (`Flashcard::answered`) that
/// replaces the old one in its deck.
#[derive(Debug, Clone, PartialEq)]
pub struct Flashcard {
    /// Stable within a deck, derived from the record's position in the deck file.
    pub id: String,
    pub question: String,
    pub answer: String,

    /// Exponentially weighted estimate of answering correctly, in `[0, 1]`.
    pub accuracy: f64,
    /// Milliseconds since the Unix epoch, `None` when never studied.
    pub last_asked: Option<i64>,
}

impl Flashcard {
    pub fn new(id: impl Into<String>, question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            answer: answer.into(),
            accuracy: 0.0,
            last_asked: None,
        }
    }

    pub fn is_new(&self) -> bool {
        self.last_asked.is_none()
    }

    pub fn is_mastered(&self) -> bool {
        !self.is_new() && self.accuracy >= MASTERED_ACCURACY
    }

    pub fn needs_review(&self, now: i64) -> bool {
        match self.last_asked {
            None => false,
            Some(asked) => {
                self.accuracy < REVIEW_ACCURACY || asked < now - REVIEW_AFTER_DAYS * MS_PER_DAY
            }
        }
    }

    /// Drop all study progress, keeping identity and text.
    pub fn reset_progress(&mut self) {
        self.accuracy = 0.0;
        self.last_asked = None;
    }
}

/// Which part of a deck a study session draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StudyMode {
    #[default]
    All,
    New,
    Review,
    Mastered,
}

impl StudyMode {
    pub fn all() -> &'static [StudyMode] {
        &[Self::All, Self::New, Self::Review, Self::Mastered]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::All => "All Cards",
            Self::New => "New Cards",
            Self::Review => "Review",
            Self::Mastered => "Mastered",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::All => "Study every card in the deck",
            Self::New => "Only cards you have never studied",
            Self::Review => "Low accuracy or not studied for a week",
            Self::Mastered => "Cards at 80% accuracy or better",
        }
    }

    pub fn matches(&self, card: &Flashcard, now: i64) -> bool {
        match self {
            Self::All => true,
            Self::New => card.is_new(),
            Self::Review => card.needs_review(now),
            Self::Mastered => card.is_mastered(),
        }
    }

    /// The candidate pool for this mode, in deck order.
    pub fn candidates<'a>(&self, cards: &'a [Flashcard], now: i64) -> Vec<&'a Flashcard> {
        cards.iter().filter(|c| self.matches(c, now)).collect()
    }

    pub fn count(&self, cards: &[Flashcard], now: i64) -> usize {
        cards.iter().filter(|c| self.matches(c, now)).count()
    }
}

/// Statistics for a deck.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeckStats {
    pub card_count: usize,
    pub last_studied: Option<i64>,
    /// Mean accuracy over studied cards only; 0 when nothing is studied.
    pub average_accuracy: f64,
    pub cards_studied: usize,
    pub cards_mastered: usize,
    pub cards_needing_review: usize,
    pub new_cards: usize,
}

impl DeckStats {
    pub fn from_cards(cards: &[Flashcard], now: i64) -> Self {
        let studied: Vec<&Flashcard> = cards.iter().filter(|c| !c.is_new()).collect();

        let average_accuracy = if studied.is_empty() {
            0.0
        } else {
            studied.iter().map(|c| c.accuracy).sum::<f64>() / studied.len() as f64
        };

        Self {
            card_count: cards.len(),
            last_studied: studied.iter().filter_map(|c| c.last_asked).max(),
            average_accuracy,
            cards_studied: studied.len(),
            cards_mastered: studied.iter().filter(|c| c.is_mastered()).count(),
            cards_needing_review: studied.iter().filter(|c| c.needs_review(now)).count(),
            new_cards: cards.len() - studied.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    fn card(id: &str, accuracy: f64, last_asked: Option<i64>) -> Flashcard {
        Flashcard {
            accuracy,
            last_asked,
            ..Flashcard::new(id, "q", "a")
        }
    }

    fn sample_deck() -> Vec<Flashcard> {
        vec![
            card("card-0", 0.0, None),
            card("card-1", 0.3, Some(NOW - MS_PER_DAY)),
            card("card-2", 0.9, Some(NOW - MS_PER_DAY)),
            card("card-3", 0.7, Some(NOW - 8 * MS_PER_DAY)),
        ]
    }

    #[test]
    fn test_study_mode_filters() {
        let deck = sample_deck();
        let ids = |mode: StudyMode| -> Vec<String> {
            mode.candidates(&deck, NOW).iter().map(|c| c.id.clone()).collect()
        };

        assert_eq!(ids(StudyMode::All).len(), 4);
        assert_eq!(ids(StudyMode::New), vec!["card-0"]);
        assert_eq!(ids(StudyMode::Review), vec!["card-1", "card-3"]);
        assert_eq!(ids(StudyMode::Mastered), vec!["card-2"]);
    }

    #[test]
    fn test_never_asked_card_is_not_mastered_or_review() {
        let c = card("card-0", 0.95, None);
        assert!(!c.is_mastered());
        assert!(!c.needs_review(NOW));
    }

    #[test]
    fn test_deck_stats() {
        let stats = DeckStats::from_cards(&sample_deck(), NOW);
        assert_eq!(stats.card_count, 4);
        assert_eq!(stats.cards_studied, 3);
        assert_eq!(stats.new_cards, 1);
        assert_eq!(stats.cards_mastered, 1);
        assert_eq!(stats.cards_needing_review, 2);
        assert_eq!(stats.last_studied, Some(NOW - MS_PER_DAY));
        assert!((stats.average_accuracy - (0.3 + 0.9 + 0.7) / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_deck_stats_empty() {
        assert_eq!(DeckStats::from_cards(&[], NOW), DeckStats::default());
    }

    #[test]
    fn test_reset_progress() {
        let mut c = card("card-1", 0.6, Some(NOW));
        c.reset_progress();
        assert_eq!(c.accuracy, 0.0);
        assert!(c.is_new());
    }
}
