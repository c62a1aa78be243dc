//! Prompt templates for the panel nodes
//!
//! Templates use `{placeholder}` markers filled by the `render_*` functions.

use super::state::Expert;

/// Phrase the debate ends with once the panel agrees
pub const DEBATE_SENTINEL: &str = "Thank you!";

/// Phrase the final plan ends with
pub const PLAN_SENTINEL: &str = "Final plan complete.";

pub const EXPERTS_PROMPT: &str = r#"You are assembling a panel of medical specialists. Follow these steps:

1. Read the presenting symptom: {symptom}

2. Review any guidance the operator gave for shaping the panel:

{guidance}

3. Decide which specialties are best placed to diagnose "{symptom}".

4. Choose the {max_experts} most suitable specialists.

5. Assign exactly one doctor to each specialization; no two doctors may share a specialization."#;

pub const EXPERTS_REQUEST: &str = "Generate the list of doctors.";

pub const DEBATE_PROMPT: &str = r#"You are moderating a discussion between several doctors who must diagnose a patient's symptom.

Each doctor argues for their own approach and tries to convince the others, while staying open to their ideas, until the panel settles on the best plan.

1. Take turns: let the specialists go back and forth on how to diagnose and treat the symptom.

2. Be specific: every contribution draws on concrete knowledge from that doctor's own field.

The doctors on the panel:

{personas}

Each doctor opens by introducing themselves in character and then makes their case.

Keep asking follow-up questions to drill down and refine the treatment plan.

Reason only from the stated symptom. Where details are unknown (age, gender, history), do not ask for them; cover every plausible case instead.

When the panel is satisfied with its plan, end the discussion with: "{sentinel}"

Stay in character throughout, reflecting each persona above."#;

pub const DEBATE_OPENING: &str = "The patient presents with: {symptom}. Begin the discussion.";

pub const DEBATE_CONTINUE: &str = "Continue the discussion from where it stopped.";

pub const SEARCH_QUERY_PROMPT: &str = r#"You will be shown a conversation between medical experts diagnosing a symptom.

Produce one well-structured query for retrieval or web search based on that conversation.

Analyze the full conversation first.

Pay particular attention to the treatment plan each doctor proposes.

The query should help verify the final plan."#;

pub const SYNTHESIS_PROMPT: &str = r#"You are the lead physician of the panel and must write the final treatment plan, based on:

1. The full debate between the specialists.
2. The combined evidence below (clinical guidelines, web results, encyclopedia summaries).
3. The patient's main complaint: {symptom}

Operator guidance: {guidance}

Your plan must be structured, evidence-based, reflective of the points every specialist raised, and clinically actionable.

DO NOT restate the debate.
DO NOT restate the evidence.
Synthesize everything into a single authoritative treatment plan.

Include:
- Primary diagnosis or differential
- Recommended diagnostic tests with justification
- Initial treatment
- Follow-up considerations
- Red flags or escalation scenarios

Finish with: "{sentinel}"

Evidence:

{evidence}"#;

pub const SYNTHESIS_REQUEST: &str = "Write the final treatment plan.";

const NO_GUIDANCE: &str = "(none provided)";
const NO_EVIDENCE: &str = "No external evidence available.";

fn or_none<'a>(text: &'a str, fallback: &'a str) -> &'a str {
    if text.trim().is_empty() {
        fallback
    } else {
        text
    }
}

/// Fill `{name}` placeholders in one left-to-right pass
///
/// Inserted values are never scanned again, so braces inside a symptom or
/// the evidence stay literal. Unknown placeholders are kept as written.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let value = tail.find('}').and_then(|close| {
            let key = &tail[1..close];
            values
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn render_experts_prompt(symptom: &str, guidance: &str, max_experts: usize) -> String {
    fill(
        EXPERTS_PROMPT,
        &[
            ("symptom", symptom),
            ("guidance", or_none(guidance, NO_GUIDANCE)),
            ("max_experts", &max_experts.to_string()),
        ],
    )
}

pub fn render_debate_prompt(experts: &[Expert]) -> String {
    let personas = experts
        .iter()
        .map(Expert::persona)
        .collect::<Vec<_>>()
        .join("\n");
    fill(
        DEBATE_PROMPT,
        &[("personas", &personas), ("sentinel", DEBATE_SENTINEL)],
    )
}

pub fn render_debate_opening(symptom: &str) -> String {
    fill(DEBATE_OPENING, &[("symptom", symptom)])
}

pub fn render_synthesis_prompt(symptom: &str, guidance: &str, evidence: &[String]) -> String {
    let evidence = evidence.join("\n\n");
    fill(
        SYNTHESIS_PROMPT,
        &[
            ("symptom", symptom),
            ("guidance", or_none(guidance, NO_GUIDANCE)),
            ("sentinel", PLAN_SENTINEL),
            ("evidence", or_none(&evidence, NO_EVIDENCE)),
        ],
    )
}
