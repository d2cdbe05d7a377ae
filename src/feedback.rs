use rand::seq::SliceRandom;
use rand::Rng;

pub const DEFAULT_PHRASES: &[&str] = &[
    "Keep your back straight",
    "Great form!",
    "Slow down the movement",
    "Full range of motion",
];

/// Picks coaching phrases for the session log. A phrase is logged at most once
/// per run, in the order it was first drawn.
#[derive(Debug, Clone)]
pub struct FeedbackSelector {
    phrases: &'static [&'static str],
    probability: f64,
}

impl FeedbackSelector {
    pub fn new(probability: f64) -> Self {
        Self::with_phrases(DEFAULT_PHRASES, probability)
    }

    pub fn with_phrases(phrases: &'static [&'static str], probability: f64) -> Self {
        Self {
            phrases,
            probability: probability.clamp(0.0, 1.0),
        }
    }

    /// Rolls for feedback on one tick. Returns the phrase only when it was newly
    /// appended to `log`.
    pub fn maybe_append<R: Rng + ?Sized>(&self, rng: &mut R, log: &mut Vec<String>) -> Option<&'static str> {
        if !rng.gen_bool(self.probability) {
            return None;
        }

        let phrase = *self.phrases.choose(rng)?;
        if log.iter().any(|existing| existing == phrase) {
            return None;
        }

        log.push(phrase.to_string());
        Some(phrase)
    }
}
