// Prompt constants for cover-letter generation.
// Templates are filled with `fill_template`, which substitutes each
// placeholder once so caller text containing `{...}` is never re-expanded.

/// System instruction shared by every cover-letter call.
pub const COVER_LETTER_SYSTEM: &str = "You are an expert cover letter writer. \
    Create a compelling and tailored cover letter based on the provided job description \
    and experiences.";

/// Flat request template.
/// Placeholders: {job_description}, {experiences}, {grounding_instruction}
pub const FLAT_PROMPT_TEMPLATE: &str = r#"Job Description:
{job_description}

Relevant Experiences:
{experiences}

{grounding_instruction}

Based on the job description and the provided experiences, generate a professional and personalized cover letter."#;

/// Structured request template; the model answers with a JSON verdict.
/// Placeholders: {company_name}, {hiring_manager_line}, {job_description},
///               {experiences}, {grounding_instruction}
pub const STRUCTURED_PROMPT_TEMPLATE: &str = r#"Generate a professional cover letter for {company_name}.
{hiring_manager_line}
Job Description:
{job_description}

Relevant Experiences (most relevant first):
{experiences}

{grounding_instruction}

Write a compelling cover letter that:
1. Addresses the hiring manager personally (if provided)
2. Shows enthusiasm for the company
3. Connects the candidate's experiences with the job requirements, leading with the first experiences listed
4. Maintains a professional yet engaging tone
5. Keeps the length to approximately 300-400 words

Then judge how competitive the candidate is for this role given only the experiences above.

Return a JSON object with this EXACT schema (no extra fields):
{
  "cover_letter": "the full cover letter text",
  "chances": "low" | "medium" | "high",
  "chances_explanation": "two or three sentences explaining the rating"
}"#;

/// Rendered when no experiences were supplied.
pub const NO_EXPERIENCES_LINE: &str = "(none provided; rely on the job description)";

/// Substitutes `{key}` placeholders in a single left-to-right pass.
/// Unknown `{...}` sequences (e.g. JSON examples) are left as-is.
pub fn fill_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let hit = vars.iter().find(|(key, _)| {
            tail[1..].starts_with(key) && tail[1 + key.len()..].starts_with('}')
        });
        match hit {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len() + 2..];
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_template_substitutes_known_keys() {
        let out = fill_template("Hello {name}, welcome to {place}.", &[("name", "Ada"), ("place", "Acme")]);
        assert_eq!(out, "Hello Ada, welcome to Acme.");
    }

    #[test]
    fn test_fill_template_does_not_reexpand_values() {
        let out = fill_template(
            "{job_description} / {experiences}",
            &[("job_description", "literal {experiences}"), ("experiences", "- Dev")],
        );
        assert_eq!(out, "literal {experiences} / - Dev");
    }

    #[test]
    fn test_fill_template_leaves_json_braces() {
        let out = fill_template("{\n  \"a\": 1\n} {x}", &[("x", "y")]);
        assert_eq!(out, "{\n  \"a\": 1\n} y");
    }

    #[test]
    fn test_templates_have_no_leftover_placeholders_once_filled() {
        let out = fill_template(
            STRUCTURED_PROMPT_TEMPLATE,
            &[
                ("company_name", "Acme"),
                ("hiring_manager_line", ""),
                ("job_description", "jd"),
                ("experiences", "- x"),
                ("grounding_instruction", "g"),
            ],
        );
        for placeholder in ["{company_name}", "{hiring_manager_line}", "{job_description}", "{experiences}", "{grounding_instruction}"] {
            assert!(!out.contains(placeholder), "{placeholder} left in prompt");
        }
    }
}
