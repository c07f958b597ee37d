// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction appended to every cover-letter prompt.
pub const GROUNDING_INSTRUCTION: &str = "\
    Only mention experience, skills and achievements that appear in the candidate's \
    experiences above. Do NOT invent employers, titles, dates or metrics.";
