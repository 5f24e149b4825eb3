//! Prompt quality checks: golden test set.
//!
//! Curated composer inputs paired with strings that must or must not
//! appear in the rendered instruction. Runs offline; no model is called.

use interro_core::types::Persona;
use interro_llm::prompt::{self, PromptComposer};

/// A golden test case for prompt evaluation.
struct GoldenCase {
    /// Human-readable name for the test case.
    name: &'static str,
    persona: Persona,
    /// Explicit silence tactic, if the witness stayed silent.
    tactic: Option<&'static str>,
    /// Earlier statements returned by memory.
    matches: Vec<String>,
    /// Strings that MUST appear in the rendered prompt.
    must_contain: Vec<&'static str>,
    /// Strings that MUST NOT appear in the rendered prompt.
    must_not_contain: Vec<&'static str>,
}

fn golden_cases() -> Vec<GoldenCase> {
    vec![
        // ---------------------------------------------------------------
        // 1. Opening pressure from Reynolds
        // ---------------------------------------------------------------
        GoldenCase {
            name: "reynolds_plain",
            persona: Persona::Reynolds,
            tactic: None,
            matches: vec![],
            must_contain: vec!["Detective James Reynolds", "bad cop", "Emily Parker", "Short, sharp"],
            must_not_contain: vec!["CONTRADICTIONS", "SECONDS", "Sarah Chen", "{"],
        },
        // ---------------------------------------------------------------
        // 2. Chen de-escalating
        // ---------------------------------------------------------------
        GoldenCase {
            name: "chen_plain",
            persona: Persona::Chen,
            tactic: None,
            matches: vec![],
            must_contain: vec!["Detective Sarah Chen", "good cop", "Warm", "common ground"],
            must_not_contain: vec!["CONTRADICTIONS", "James Reynolds (", "{"],
        },
        // ---------------------------------------------------------------
        // 3. Reynolds catching a changed story
        // ---------------------------------------------------------------
        GoldenCase {
            name: "reynolds_contradiction",
            persona: Persona::Reynolds,
            tactic: None,
            matches: vec!["I was home all night".into(), "I left around nine".into()],
            must_contain: vec![
                "CHECK FOR CONTRADICTIONS",
                "- I was home all night\n- I left around nine",
                "confront the witness",
            ],
            must_not_contain: vec!["SECONDS", "{statements}"],
        },
        // ---------------------------------------------------------------
        // 4. Silence, both detectives
        // ---------------------------------------------------------------
        GoldenCase {
            name: "reynolds_silence",
            persona: Persona::Reynolds,
            tactic: Some(prompt::profile(Persona::Reynolds).silence_tactics[3]),
            matches: vec![],
            must_contain: vec!["10 SECONDS", "obstruction of justice"],
            must_not_contain: vec!["{tactic}", "{silence_seconds}", "CONTRADICTIONS"],
        },
        GoldenCase {
            name: "chen_silence",
            persona: Persona::Chen,
            tactic: Some(prompt::profile(Persona::Chen).silence_tactics[0]),
            matches: vec![],
            must_contain: vec!["10 SECONDS", "glass of water"],
            must_not_contain: vec!["{tactic}", "CONTRADICTIONS"],
        },
        // ---------------------------------------------------------------
        // 5. Both directives at once
        // ---------------------------------------------------------------
        GoldenCase {
            name: "chen_silence_with_memory",
            persona: Persona::Chen,
            tactic: Some(prompt::profile(Persona::Chen).silence_tactics[4]),
            matches: vec!["She owed me money".into()],
            must_contain: vec!["- She owed me money", "afraid", "10 SECONDS"],
            must_not_contain: vec!["{memory_block}", "{silence_block}"],
        },
    ]
}

#[test]
fn golden_prompts_render_as_expected() {
    let composer = PromptComposer::new("Emily Parker", 10);
    for case in golden_cases() {
        let rendered = composer.render(case.persona, case.tactic, &case.matches);
        for needle in &case.must_contain {
            assert!(
                rendered.contains(needle),
                "[{}] expected {needle:?} in:\n{rendered}",
                case.name
            );
        }
        for needle in &case.must_not_contain {
            assert!(
                !rendered.contains(needle),
                "[{}] did not expect {needle:?} in:\n{rendered}",
                case.name
            );
        }
    }
}

#[test]
fn golden_set_has_minimum_coverage() {
    let cases = golden_cases();
    assert!(cases.len() >= 5, "golden set too small: {}", cases.len());
    for persona in Persona::ALL {
        assert!(cases.iter().any(|c| c.persona == persona && c.tactic.is_some()));
    }
}

#[test]
fn directives_follow_identity() {
    let composer = PromptComposer::default();
    let rendered = composer.render(
        Persona::Reynolds,
        Some("Mock them for freezing up."),
        &["earlier".to_string()],
    );
    let identity = rendered.find("You are Detective").expect("identity");
    let memory = rendered.find("EARLIER STATEMENTS").expect("memory directive");
    let silence = rendered.find("HAS SAID NOTHING").expect("silence directive");
    assert!(identity < memory && memory < silence);
}
