//! Adaptive card selection.
//!
//! Each card gets a weight from its accuracy and how long ago it was asked,
//! then one card is drawn with probability proportional to its weight. After
//! an answer, accuracy moves toward 1 or 0 as an exponential moving average.

use std::collections::HashSet;

use rand::rngs::ThreadRng;
use rand::Rng;

use crate::config::Settings;
use crate::models::{Flashcard, MS_PER_DAY};

/// Share of the new answer in the running accuracy.
pub const ACCURACY_WEIGHT: f64 = 0.2;

/// Weight multiplier for cards that were never studied.
const NEW_CARD_BOOST: f64 = 1.5;

/// Accuracy and timestamp after answering a card at `now`.
///
/// The first answer (`previous_last_asked == None`) sets accuracy to exactly
/// 1 or 0, whatever the stored accuracy was.
pub fn update_accuracy(
    previous_accuracy: f64,
    previous_last_asked: Option<i64>,
    is_correct: bool,
    now: i64,
) -> (f64, i64) {
    let outcome = if is_correct { 1.0 } else { 0.0 };

    let accuracy = match previous_last_asked {
        None => outcome,
        Some(_) => {
            let blended = previous_accuracy * (1.0 - ACCURACY_WEIGHT) + outcome * ACCURACY_WEIGHT;
            blended.clamp(0.0, 1.0)
        }
    };

    (accuracy, now)
}

impl Flashcard {
    /// The next version of this card after an answer.
    pub fn answered(&self, is_correct: bool, now: i64) -> Flashcard {
        let (accuracy, last_asked) =
            update_accuracy(self.accuracy, self.last_asked, is_correct, now);
        Flashcard {
            accuracy,
            last_asked: Some(last_asked),
            ..self.clone()
        }
    }
}

/// Projected accuracy as `(if_correct, if_incorrect)`.
pub fn accuracy_preview(card: &Flashcard, now: i64) -> (f64, f64) {
    (
        update_accuracy(card.accuracy, card.last_asked, true, now).0,
        update_accuracy(card.accuracy, card.last_asked, false, now).0,
    )
}

/// Days since the card was last asked; infinite when never asked.
fn days_since(last_asked: Option<i64>, now: i64) -> f64 {
    match last_asked {
        None => f64::INFINITY,
        Some(asked) => now.saturating_sub(asked) as f64 / MS_PER_DAY as f64,
    }
}

/// Scores cards and draws the next one to study.
pub struct CardSelector<R: Rng = ThreadRng> {
    rng: R,
}

impl CardSelector<ThreadRng> {
    pub fn new() -> Self {
        Self::with_rng(rand::thread_rng())
    }
}

impl Default for CardSelector<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> CardSelector<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Selection weight of a card. Never negative.
    ///
    /// The forgotten-card boost rolls fresh randomness on every call, so two
    /// calls with identical input may disagree.
    pub fn score(&mut self, card: &Flashcard, settings: &Settings, now: i64) -> f64 {
        let days = days_since(card.last_asked, now);
        let accuracy = card.accuracy;
        let mut score = 1.0;

        // Exactly 0.5 takes neither branch.
        if accuracy < 0.5 {
            score *= settings.wrong_card_multiplier * (2.0 - 2.0 * accuracy);
        }

        if accuracy > 0.5 {
            score /= settings.correct_card_divisor * (2.0 * accuracy);
            if card.last_asked.is_some() && days < 1.0 {
                score /= 2.0;
            }
        }

        if days >= settings.forgotten_card_threshold
            && self.rng.gen::<f64>() < settings.forgotten_card_chance
        {
            score *= 2.0;
        }

        if card.last_asked.is_none() {
            score *= NEW_CARD_BOOST;
        }

        if score.is_finite() {
            score.max(0.0)
        } else {
            0.0
        }
    }

    /// Draw one item with probability proportional to its weight.
    ///
    /// All-zero weights fall back to a uniform draw. Returns `None` only for
    /// an empty slice.
    pub fn sample<'a, T>(&mut self, items: &'a [(T, f64)]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }

        let total: f64 = items.iter().map(|(_, w)| w.max(0.0)).sum();
        if total <= 0.0 || !total.is_finite() {
            let idx = self.rng.gen_range(0..items.len());
            return Some(&items[idx].0);
        }

        let mut remaining = self.rng.gen::<f64>() * total;
        for (item, weight) in items {
            if *weight <= 0.0 {
                continue;
            }
            remaining -= weight;
            if remaining <= 0.0 {
                return Some(item);
            }
        }

        // Rounding can leave a sliver of `remaining`; the last weighted item absorbs it.
        items
            .iter()
            .rev()
            .find(|(_, w)| *w > 0.0)
            .map(|(item, _)| item)
    }

    /// Pick the next card not yet in `shown_ids`, recording it as shown.
    ///
    /// Returns `None` once every candidate has been shown.
    pub fn select_next<'a, I>(
        &mut self,
        candidates: I,
        shown_ids: &mut HashSet<String>,
        settings: &Settings,
        now: i64,
    ) -> Option<Flashcard>
    where
        I: IntoIterator<Item = &'a Flashcard>,
    {
        let weighted: Vec<(&Flashcard, f64)> = candidates
            .into_iter()
            .filter(|card| !shown_ids.contains(&card.id))
            .map(|card| (card, self.score(card, settings, now)))
            .collect();

        let chosen: Flashcard = (*self.sample(&weighted)?).clone();
        shown_ids.insert(chosen.id.clone());

        tracing::debug!(
            card = %chosen.id,
            pool = weighted.len(),
            accuracy = chosen.accuracy,
            "selected card"
        );

        Some(chosen)
    }
}
