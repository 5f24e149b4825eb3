//! Turn selection: which detective answers the witness.
//!
//! A single-step weighted process: the only state is who spoke last.
//! With the default [`TransitionPolicy`] this produces a "mostly bad cop,
//! good cop interjects" rhythm instead of strict alternation:
//!
//! | Situation                 | P(Reynolds) |
//! |---------------------------|-------------|
//! | witness silent            | 0.80        |
//! | Reynolds spoke last       | 0.70        |
//! | Chen spoke last           | 0.85        |
//!
//! Randomness is always supplied by the caller so that tests can inject a
//! seeded generator.

use rand::Rng;

use crate::config::TransitionPolicy;
use crate::types::Persona;

/// Stateful selector holding `last_speaker`.
#[derive(Debug, Clone)]
pub struct TurnSelector {
    policy: TransitionPolicy,
    last_speaker: Persona,
}

impl TurnSelector {
    /// Create a selector. The interrogation opens with Reynolds as the
    /// previous speaker.
    #[must_use]
    pub fn new(policy: TransitionPolicy) -> Self {
        Self {
            policy,
            last_speaker: Persona::Reynolds,
        }
    }

    /// The persona that spoke most recently.
    #[must_use]
    pub fn last_speaker(&self) -> Persona {
        self.last_speaker
    }

    /// The active policy.
    #[must_use]
    pub fn policy(&self) -> &TransitionPolicy {
        &self.policy
    }

    /// Probability that Reynolds is picked given the current state.
    #[must_use]
    pub fn reynolds_probability(&self, is_silence: bool) -> f64 {
        if is_silence {
            self.policy.silence_reynolds
        } else {
            match self.last_speaker {
                Persona::Reynolds => self.policy.reynolds_momentum,
                Persona::Chen => self.policy.chen_handback,
            }
        }
    }

    /// Draw the next speaker without changing state.
    pub fn draw<R: Rng + ?Sized>(&self, is_silence: bool, rng: &mut R) -> Persona {
        let p = self.reynolds_probability(is_silence).clamp(0.0, 1.0);
        if rng.gen_bool(p) {
            Persona::Reynolds
        } else {
            Persona::Chen
        }
    }

    /// Record that `speaker` has taken the turn.
    pub fn record(&mut self, speaker: Persona) {
        self.last_speaker = speaker;
    }

    /// Draw the next speaker and make it the new `last_speaker`.
    pub fn next<R: Rng + ?Sized>(&mut self, is_silence: bool, rng: &mut R) -> Persona {
        let speaker = self.draw(is_silence, rng);
        self.record(speaker);
        speaker
    }
}

impl Default for TurnSelector {
    fn default() -> Self {
        Self::new(TransitionPolicy::default())
    }
}
