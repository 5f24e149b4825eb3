//! Prompt templates for the interrogation personas.
//!
//! Every prompt is a testable artifact: the composer renders a fixed
//! template with the persona profile, an optional contradiction block and
//! an optional silence tactic. Only the tactic choice is random, and the
//! random source is passed in by the caller.

use rand::Rng;
use rand::seq::SliceRandom;

use interro_core::config::DialogueConfig;
use interro_core::types::Persona;

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// Per-turn system instruction shared by both detectives.
pub const INTERROGATION_SYSTEM: &str = r"You are {detective_name} ({role_label}).
You are questioning a witness (the user) about the disappearance of {case_subject}.
Your goal: {goal}
Your style: {style}{memory_block}{silence_block}

{guidance}";

/// Appended when earlier statements resemble the current one.
pub const CONTRADICTION_DIRECTIVE: &str = r"

EARLIER STATEMENTS FROM THIS WITNESS (CHECK FOR CONTRADICTIONS):
{statements}
Compare what they just said against these statements. If anything contradicts them, confront the witness with it directly.";

/// Appended when the witness has not answered.
pub const SILENCE_DIRECTIVE: &str = r"

THE WITNESS HAS SAID NOTHING FOR {silence_seconds} SECONDS. Respond to the silence with this tactic: {tactic}";

/// Render a template with variable substitution.
///
/// Single pass over `template`: each `{key}` is replaced once and the
/// inserted values are never scanned again. Unknown keys are left untouched.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        result.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let key = &after[..close];
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v, close))
        });
        match value {
            Some((value, close)) => {
                result.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                result.push('{');
                rest = after;
            }
        }
    }
    result.push_str(rest);
    result
}

/// Format past statements as a bulleted list, one `- ` line each.
#[must_use]
pub fn format_memory_block(matches: &[String]) -> String {
    matches
        .iter()
        .map(|m| format!("- {m}"))
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Persona profiles
// ---------------------------------------------------------------------------

/// Fixed identity, goal, tone and silence tactics of one detective.
#[derive(Debug, Clone, Copy)]
pub struct PersonaProfile {
    /// Which detective.
    pub persona: Persona,
    /// Short role tag shown next to the name.
    pub role_label: &'static str,
    /// Rhetorical goal.
    pub goal: &'static str,
    /// Tone directive.
    pub style: &'static str,
    /// Standing guidance for answered turns.
    pub guidance: &'static str,
    /// Tactics drawn from when the witness stays silent.
    pub silence_tactics: &'static [&'static str],
}

const REYNOLDS_TACTICS: &[&str] = &[
    "Accuse the witness of stalling while they make up a story.",
    "Treat the silence as a sign of guilt.",
    "Mock them for freezing up.",
    "Warn them that refusing to cooperate can be charged as obstruction of justice.",
    "Drum on the table and demand an answer right now.",
    "Suggest that they are covering for someone.",
];

const CHEN_TACTICS: &[&str] = &[
    "Offer a glass of water or a moment to collect themselves.",
    "Suggest that Detective Reynolds may be intimidating them.",
    "Acknowledge that this is a hard question to answer.",
    "Remind them gently that telling the truth is the only way through this.",
    "Ask whether they are afraid of what might happen if they talk.",
];

static REYNOLDS: PersonaProfile = PersonaProfile {
    persona: Persona::Reynolds,
    role_label: "bad cop",
    goal: "Put the witness under pressure and expose inconsistencies. Be impatient, skeptical and intimidating.",
    style: "Short, sharp sentences. Address the witness formally by name if you know it.",
    guidance: "If the witness gives short answers, push for details. If they deny something, ridicule the denial.",
    silence_tactics: REYNOLDS_TACTICS,
};

static CHEN: PersonaProfile = PersonaProfile {
    persona: Persona::Chen,
    role_label: "good cop",
    goal: "Build rapport, soften Reynolds' aggression and get the witness to open up.",
    style: "Warm, understanding, soft-spoken.",
    guidance: "When the witness answers, explore why they feel the way they do and look for common ground.",
    silence_tactics: CHEN_TACTICS,
};

/// Look up the profile for a persona.
#[must_use]
pub fn profile(persona: Persona) -> &'static PersonaProfile {
    match persona {
        Persona::Reynolds => &REYNOLDS,
        Persona::Chen => &CHEN,
    }
}

// ---------------------------------------------------------------------------
// Composer
// ---------------------------------------------------------------------------

/// Builds the per-turn system instruction for the chosen detective.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    case_subject: String,
    silence_seconds: u32,
}

impl PromptComposer {
    /// Create a composer for the given case.
    #[must_use]
    pub fn new(case_subject: impl Into<String>, silence_seconds: u32) -> Self {
        Self {
            case_subject: case_subject.into(),
            silence_seconds,
        }
    }

    /// Create a composer from dialogue configuration.
    #[must_use]
    pub fn from_config(config: &DialogueConfig) -> Self {
        Self::new(config.case_subject.clone(), config.silence_seconds)
    }

    /// Pick one silence tactic uniformly from the persona's list.
    pub fn choose_tactic<R: Rng + ?Sized>(persona: Persona, rng: &mut R) -> &'static str {
        profile(persona)
            .silence_tactics
            .choose(rng)
            .copied()
            .unwrap_or_default()
    }

    /// Compose the instruction for this turn.
    ///
    /// A tactic is drawn only when `is_silence` is set; otherwise the
    /// output depends on the inputs alone.
    pub fn compose<R: Rng + ?Sized>(
        &self,
        persona: Persona,
        is_silence: bool,
        matches: &[String],
        rng: &mut R,
    ) -> String {
        let tactic = is_silence.then(|| Self::choose_tactic(persona, rng));
        self.render(persona, tactic, matches)
    }

    /// Render the instruction with an explicit tactic.
    #[must_use]
    pub fn render(&self, persona: Persona, tactic: Option<&str>, matches: &[String]) -> String {
        let p = profile(persona);

        let memory_block = if matches.is_empty() {
            String::new()
        } else {
            render_template(
                CONTRADICTION_DIRECTIVE,
                &[("statements", &format_memory_block(matches))],
            )
        };

        let silence_block = match tactic {
            Some(tactic) => render_template(
                SILENCE_DIRECTIVE,
                &[
                    ("silence_seconds", &self.silence_seconds.to_string()),
                    ("tactic", tactic),
                ],
            ),
            None => String::new(),
        };

        render_template(
            INTERROGATION_SYSTEM,
            &[
                ("detective_name", persona.full_name()),
                ("role_label", p.role_label),
                ("case_subject", &self.case_subject),
                ("goal", p.goal),
                ("style", p.style),
                ("memory_block", &memory_block),
                ("silence_block", &silence_block),
                ("guidance", p.guidance),
            ],
        )
    }
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::from_config(&DialogueConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn tactic_lists_have_expected_sizes() {
        assert_eq!(profile(Persona::Reynolds).silence_tactics.len(), 6);
        assert_eq!(profile(Persona::Chen).silence_tactics.len(), 5);
        for tactic in REYNOLDS_TACTICS {
            assert!(!CHEN_TACTICS.contains(tactic));
        }
    }

    #[test]
    fn render_template_substitutes_known_keys() {
        let out = render_template("{a} and {b} and {c}", &[("a", "x"), ("b", "y")]);
        assert_eq!(out, "x and y and {c}");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let out = render_template("{a} {b}", &[("a", "{b}"), ("b", "y")]);
        assert_eq!(out, "{b} y");
    }

    #[test]
    fn placeholders_inside_statements_survive_verbatim() {
        let composer = PromptComposer::default();
        let matches = vec![
            "I said {guidance} to him".to_string(),
            "then {silence_block} and {detective_name}".to_string(),
        ];
        let text = composer.render(Persona::Reynolds, None, &matches);
        assert!(text.contains("- I said {guidance} to him\n"));
        assert!(text.contains("- then {silence_block} and {detective_name}"));
        assert!(!text.contains("HAS SAID NOTHING"));
        assert_eq!(text.matches(profile(Persona::Reynolds).guidance).count(), 1);
    }

    #[test]
    fn memory_block_is_bulleted() {
        let block = format_memory_block(&["I was home".into(), "I never met her".into()]);
        assert_eq!(block, "- I was home\n- I never met her");
    }

    #[test]
    fn plain_turn_has_identity_and_no_directives() {
        let composer = PromptComposer::default();
        let text = composer.render(Persona::Reynolds, None, &[]);
        assert!(text.starts_with("You are Detective James Reynolds (bad cop)."));
        assert!(text.contains("Emily Parker"));
        assert!(!text.contains("CONTRADICTIONS"));
        assert!(!text.contains("SECONDS"));
        assert!(!text.contains('{'));
    }

    #[test]
    fn matches_add_contradiction_directive() {
        let composer = PromptComposer::default();
        let text = composer.render(Persona::Chen, None, &["I was at the bar".into()]);
        assert!(text.contains("CHECK FOR CONTRADICTIONS"));
        assert!(text.contains("- I was at the bar"));
        assert!(text.contains("Detective Sarah Chen"));
    }

    #[test]
    fn silence_names_duration_and_a_persona_tactic() {
        let composer = PromptComposer::new("Emily Parker", 10);
        let mut rng = StdRng::seed_from_u64(3);
        for persona in Persona::ALL {
            let text = composer.compose(persona, true, &[], &mut rng);
            assert!(text.contains("FOR 10 SECONDS"));
            let tactics = profile(persona).silence_tactics;
            assert_eq!(tactics.iter().filter(|t| text.contains(**t)).count(), 1);
        }
    }

    #[test]
    fn non_silent_compose_is_deterministic() {
        let composer = PromptComposer::default();
        let mut a = StdRng::seed_from_u64(1);
        let mut b = StdRng::seed_from_u64(999);
        let m = vec!["earlier".to_string()];
        assert_eq!(
            composer.compose(Persona::Reynolds, false, &m, &mut a),
            composer.compose(Persona::Reynolds, false, &m, &mut b)
        );
    }

    #[test]
    fn tactic_choice_covers_the_list() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            seen.insert(PromptComposer::choose_tactic(Persona::Reynolds, &mut rng));
        }
        assert_eq!(seen.len(), REYNOLDS_TACTICS.len());
    }
}
