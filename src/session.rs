//! Study session state: which cards were shown, answer counts, and streaks.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::config::Settings;
use crate::models::{Flashcard, StudyMode};
use crate::selection::CardSelector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    InProgress,
    Complete,
}

/// What an answer did to the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreakUpdate {
    pub streak: u32,
    /// The deck best was raised to this value and should be persisted.
    pub new_best: Option<u32>,
    /// A wrong answer ended a run that had beaten the previous best.
    pub celebrate: bool,
}

/// End-of-session numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub cards_studied: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub accuracy: f64,
    pub elapsed: Duration,
    pub best_streak: u32,
}

/// One sitting with a deck in a given study mode.
///
/// Owns the shown-id set: a card is never selected twice within a session,
/// and the set is only emptied by [`StudySession::restart`].
pub struct StudySession {
    pub mode: StudyMode,
    state: SessionState,
    shown_ids: HashSet<String>,
    current: Option<String>,
    started: Option<Instant>,

    correct: u32,
    incorrect: u32,

    streak: u32,
    best_streak: u32,
    beat_previous_best: bool,
}

impl StudySession {
    pub fn new(mode: StudyMode, best_streak: u32) -> Self {
        Self {
            mode,
            state: SessionState::NotStarted,
            shown_ids: HashSet::new(),
            current: None,
            started: None,
            correct: 0,
            incorrect: 0,
            streak: 0,
            best_streak,
            beat_previous_best: false,
        }
    }

    pub fn shown_count(&self) -> usize {
        self.shown_ids.len()
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn best_streak(&self) -> u32 {
        self.best_streak
    }

    pub fn cards_studied(&self) -> u32 {
        self.correct + self.incorrect
    }

    /// Select the next card from `cards`, or `None` when the mode's pool is used up.
    pub fn next_card<R: Rng>(
        &mut self,
        cards: &[Flashcard],
        settings: &Settings,
        now: i64,
        selector: &mut CardSelector<R>,
    ) -> Option<Flashcard> {
        if self.state == SessionState::Complete {
            return None;
        }
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }

        let candidates = self.mode.candidates(cards, now);
        match selector.select_next(candidates, &mut self.shown_ids, settings, now) {
            Some(card) => {
                self.state = SessionState::InProgress;
                self.current = Some(card.id.clone());
                Some(card)
            }
            None => {
                tracing::info!(
                    mode = ?self.mode,
                    studied = self.cards_studied(),
                    "study session complete"
                );
                self.state = SessionState::Complete;
                self.current = None;
                None
            }
        }
    }

    /// Put the current card back in the pool and select again, e.g. after a
    /// settings change.
    pub fn reselect<R: Rng>(
        &mut self,
        cards: &[Flashcard],
        settings: &Settings,
        now: i64,
        selector: &mut CardSelector<R>,
    ) -> Option<Flashcard> {
        if let Some(id) = self.current.take() {
            self.shown_ids.remove(&id);
        }
        self.next_card(cards, settings, now, selector)
    }

    /// Count an answer and advance the streak.
    pub fn record_answer(&mut self, is_correct: bool) -> StreakUpdate {
        // An answered card is no longer eligible for reselection.
        self.current = None;

        if is_correct {
            self.correct += 1;
            self.streak += 1;

            let mut new_best = None;
            if self.streak > self.best_streak {
                if self.best_streak > 0 {
                    self.beat_previous_best = true;
                }
                self.best_streak = self.streak;
                new_best = Some(self.streak);
            }

            StreakUpdate {
                streak: self.streak,
                new_best,
                celebrate: false,
            }
        } else {
            self.incorrect += 1;
            let celebrate = self.beat_previous_best && self.streak > 0;
            if celebrate {
                tracing::info!(streak = self.streak, "new best streak");
            }

            self.streak = 0;
            self.beat_previous_best = false;

            StreakUpdate {
                streak: 0,
                new_best: None,
                celebrate,
            }
        }
    }

    pub fn summary(&self) -> SessionSummary {
        let answered = self.cards_studied();
        SessionSummary {
            cards_studied: answered,
            correct: self.correct,
            incorrect: self.incorrect,
            accuracy: if answered > 0 {
                f64::from(self.correct) / f64::from(answered)
            } else {
                0.0
            },
            elapsed: self.started.map(|s| s.elapsed()).unwrap_or_default(),
            best_streak: self.best_streak,
        }
    }

    /// Begin again in the same mode with a fresh shown set and counters.
    /// The deck best streak carries over.
    pub fn restart(&mut self) {
        *self = Self::new(self.mode, self.best_streak);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MS_PER_DAY;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const NOW: i64 = 1_700_000_000_000;

    fn selector() -> CardSelector<StdRng> {
        CardSelector::with_rng(StdRng::seed_from_u64(42))
    }

    fn deck() -> Vec<Flashcard> {
        (0..3)
            .map(|i| Flashcard::new(format!("card-{}", i), format!("q{}", i), format!("a{}", i)))
            .collect()
    }

    #[test]
    fn test_session_lifecycle() {
        let cards = deck();
        let settings = Settings::default();
        let mut rng = selector();
        let mut session = StudySession::new(StudyMode::All, 0);
        assert_eq!(session.state, SessionState::NotStarted);

        let mut ids = HashSet::new();
        for _ in 0..3 {
            let card = session.next_card(&cards, &settings, NOW, &mut rng).unwrap();
            assert_eq!(session.state, SessionState::InProgress);
            assert!(ids.insert(card.id));
        }

        assert!(session.next_card(&cards, &settings, NOW, &mut rng).is_none());
        assert_eq!(session.state, SessionState::Complete);
        assert!(session.next_card(&cards, &settings, NOW, &mut rng).is_none());
    }

    #[test]
    fn test_mode_limits_pool() {
        let mut cards = deck();
        cards[1] = cards[1].answered(true, NOW - MS_PER_DAY);
        let settings = Settings::default();
        let mut rng = selector();

        let mut session = StudySession::new(StudyMode::Mastered, 0);
        let card = session.next_card(&cards, &settings, NOW, &mut rng).unwrap();
        assert_eq!(card.id, "card-1");
        assert!(session.next_card(&cards, &settings, NOW, &mut rng).is_none());
    }

    #[test]
    fn test_empty_mode_completes_immediately() {
        let cards = deck();
        let mut session = StudySession::new(StudyMode::Review, 0);
        assert!(session
            .next_card(&cards, &Settings::default(), NOW, &mut selector())
            .is_none());
        assert_eq!(session.state, SessionState::Complete);
    }

    #[test]
    fn test_reselect_returns_card_to_pool() {
        let cards = vec![Flashcard::new("card-0", "q", "a")];
        let settings = Settings::default();
        let mut rng = selector();
        let mut session = StudySession::new(StudyMode::All, 0);

        let first = session.next_card(&cards, &settings, NOW, &mut rng).unwrap();
        let again = session.reselect(&cards, &settings, NOW, &mut rng).unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(session.shown_count(), 1);

        session.record_answer(true);
        assert!(session.reselect(&cards, &settings, NOW, &mut rng).is_none());
    }

    #[test]
    fn test_streak_tracking() {
        let mut session = StudySession::new(StudyMode::All, 2);

        assert_eq!(session.record_answer(true).new_best, None);
        assert_eq!(session.record_answer(true).new_best, None);
        let update = session.record_answer(true);
        assert_eq!(update.streak, 3);
        assert_eq!(update.new_best, Some(3));

        let update = session.record_answer(false);
        assert!(update.celebrate);
        assert_eq!(update.streak, 0);

        // A short run after the celebration does not celebrate again.
        session.record_answer(true);
        assert!(!session.record_answer(false).celebrate);
        assert_eq!(session.best_streak(), 3);
    }

    #[test]
    fn test_first_best_does_not_celebrate() {
        let mut session = StudySession::new(StudyMode::All, 0);
        assert_eq!(session.record_answer(true).new_best, Some(1));
        assert!(!session.record_answer(false).celebrate);
    }

    #[test]
    fn test_summary_and_restart() {
        let cards = deck();
        let settings = Settings::default();
        let mut rng = selector();
        let mut session = StudySession::new(StudyMode::All, 0);

        session.next_card(&cards, &settings, NOW, &mut rng);
        session.record_answer(true);
        session.next_card(&cards, &settings, NOW, &mut rng);
        session.record_answer(false);

        let summary = session.summary();
        assert_eq!(summary.cards_studied, 2);
        assert_eq!(summary.correct, 1);
        assert_eq!(summary.incorrect, 1);
        assert_eq!(summary.accuracy, 0.5);
        assert_eq!(summary.best_streak, 1);

        session.restart();
        assert_eq!(session.state, SessionState::NotStarted);
        assert_eq!(session.shown_count(), 0);
        assert_eq!(session.cards_studied(), 0);
        assert_eq!(session.best_streak(), 1);
    }
}
