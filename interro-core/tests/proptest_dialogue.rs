//! Property-Based Tests for interro core.
//!
//! Uses `proptest` to check the structural invariants of history and turn
//! selection under arbitrary inputs and seeds.

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

use interro_core::config::TransitionPolicy;
use interro_core::history::ConversationHistory;
use interro_core::turn::TurnSelector;
use interro_core::types::{Persona, Role};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Step {
    User(String),
    Assistant(Persona, String),
}

fn arb_persona() -> impl Strategy<Value = Persona> {
    prop_oneof![Just(Persona::Reynolds), Just(Persona::Chen)]
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        "[a-z ]{0,20}".prop_map(Step::User),
        (arb_persona(), "[a-z ]{0,20}").prop_map(|(p, s)| Step::Assistant(p, s)),
    ]
}

fn arb_policy() -> impl Strategy<Value = TransitionPolicy> {
    (0.0..=1.0f64, 0.0..=1.0f64, 0.0..=1.0f64).prop_map(|(s, m, h)| TransitionPolicy {
        silence_reynolds: s,
        reynolds_momentum: m,
        chen_handback: h,
    })
}

fn replay(steps: &[Step]) -> ConversationHistory {
    let mut history = ConversationHistory::new();
    for step in steps {
        match step {
            Step::User(text) => history.push_user(text.clone()),
            Step::Assistant(p, text) => history.push_assistant(*p, text.clone()),
        }
    }
    history
}

// ---------------------------------------------------------------------------
// Property: the window is exactly the tail of history, in order
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn window_is_ordered_tail(steps in prop::collection::vec(arb_step(), 0..40), limit in 1usize..20) {
        let history = replay(&steps);
        let window = history.recent(limit);

        prop_assert_eq!(window.len(), steps.len().min(limit));
        let offset = steps.len() - window.len();
        for (i, turn) in window.iter().enumerate() {
            match &steps[offset + i] {
                Step::User(text) => {
                    prop_assert_eq!(turn.role, Role::User);
                    prop_assert_eq!(&turn.content, text);
                    prop_assert!(turn.speaker.is_none());
                }
                Step::Assistant(p, text) => {
                    prop_assert_eq!(turn.role, Role::Assistant);
                    prop_assert_eq!(&turn.content, text);
                    prop_assert_eq!(turn.speaker, Some(*p));
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Property: history only grows
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn history_is_append_only(steps in prop::collection::vec(arb_step(), 1..30)) {
        let mut history = ConversationHistory::new();
        let mut snapshot = Vec::new();
        for step in &steps {
            match step {
                Step::User(text) => history.push_user(text.clone()),
                Step::Assistant(p, text) => history.push_assistant(*p, text.clone()),
            }
            prop_assert_eq!(&history.turns()[..snapshot.len()], snapshot.as_slice());
            snapshot = history.turns().to_vec();
        }
        prop_assert_eq!(history.len(), steps.len());
    }
}

// ---------------------------------------------------------------------------
// Property: last_speaker always equals the most recent pick
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn selector_state_tracks_last_pick(
        policy in arb_policy(),
        seed in any::<u64>(),
        silences in prop::collection::vec(any::<bool>(), 1..50),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut selector = TurnSelector::new(policy);
        let mut history = ConversationHistory::new();
        for silent in silences {
            let picked = selector.next(silent, &mut rng);
            history.push_assistant(picked, "...");
            prop_assert_eq!(selector.last_speaker(), picked);
            prop_assert_eq!(history.last_speaker(), Some(selector.last_speaker()));
        }
    }
}

// ---------------------------------------------------------------------------
// Property: same seed, same interrogation
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn seeded_selection_is_reproducible(
        seed in any::<u64>(),
        silences in prop::collection::vec(any::<bool>(), 1..50),
    ) {
        let run = |seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut selector = TurnSelector::default();
            silences.iter().map(|s| selector.next(*s, &mut rng)).collect::<Vec<_>>()
        };
        prop_assert_eq!(run(seed), run(seed));
    }
}
