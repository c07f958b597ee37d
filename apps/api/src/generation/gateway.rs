//! Generation Gateway: turns a job description plus an ordered list of
//! experiences into cover-letter text with exactly one model call.
//!
//! Flow: validate → assemble prompt → one `TextGenerator` call → pass through.
//! Nothing is persisted here; callers that want a stored letter do that
//! afterwards (see `cover_letters::handlers::handle_generate_from_experiences`).

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::generation::prompts::{
    fill_template, COVER_LETTER_SYSTEM, FLAT_PROMPT_TEMPLATE, NO_EXPERIENCES_LINE,
    STRUCTURED_PROMPT_TEMPLATE,
};
use crate::llm_client::prompts::{GROUNDING_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::llm_client::{parse_json, LlmError, TextGenerator};
use crate::models::cover_letter::Chances;
use crate::models::experience::{ExperienceDetails, ExperienceRow};

// ────────────────────────────────────────────────────────────────────────────
// Request / response shapes
// ────────────────────────────────────────────────────────────────────────────

/// First-revision request body (`POST /api/generate-cover-letter`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatGenerateRequest {
    #[serde(default)]
    pub job_description: String,
    #[serde(default)]
    pub experiences: Vec<FlatExperience>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlatExperience {
    pub title: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatGenerateResponse {
    pub cover_letter: String,
}

/// Authoritative request body (`POST /api/cover-letters/generate`).
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationRequest {
    pub company_name: String,
    #[serde(default)]
    pub hiring_manager: Option<String>,
    #[serde(default)]
    pub job_description: String,
    /// Most relevant first. The order is forwarded to the model untouched.
    #[serde(default)]
    pub experiences: Vec<ExperienceSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExperienceSummary {
    pub title: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationResponse {
    pub cover_letter: String,
    pub chances: Chances,
    pub chances_explanation: String,
}

/// One experience as it is rendered into a prompt bullet.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptExperience {
    pub title: String,
    pub company: Option<String>,
    pub description: String,
    pub skills: Vec<String>,
    pub duration: Option<String>,
}

impl From<&FlatExperience> for PromptExperience {
    fn from(exp: &FlatExperience) -> Self {
        PromptExperience {
            title: exp.title.clone(),
            company: exp.company.clone(),
            description: exp.description.clone(),
            skills: vec![],
            duration: None,
        }
    }
}

impl From<&ExperienceSummary> for PromptExperience {
    fn from(exp: &ExperienceSummary) -> Self {
        PromptExperience {
            title: exp.title.clone(),
            company: exp.company.clone(),
            description: exp.description.clone(),
            skills: exp.skills.clone(),
            duration: exp.duration.clone(),
        }
    }
}

impl From<&ExperienceRow> for PromptExperience {
    fn from(row: &ExperienceRow) -> Self {
        let details = &row.details.0;
        // An untitled project already uses its name as the headline.
        let company = match details {
            ExperienceDetails::Project(p) if p.role.is_none() => None,
            _ => Some(details.organization().to_string()),
        };
        PromptExperience {
            title: details.title().to_string(),
            company,
            description: row.description.clone(),
            skills: row.skills.clone(),
            duration: details.duration(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Validation
// ────────────────────────────────────────────────────────────────────────────

/// An empty job description fails before any model call is spent.
pub fn validate_job_description(job_description: &str) -> Result<(), AppError> {
    if job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description cannot be empty".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_generation_request(request: &GenerationRequest) -> Result<(), AppError> {
    validate_job_description(&request.job_description)?;
    if request.company_name.trim().is_empty() {
        return Err(AppError::Validation(
            "company_name cannot be empty".to_string(),
        ));
    }
    if let Some(i) = request
        .experiences
        .iter()
        .position(|e| e.title.trim().is_empty())
    {
        return Err(AppError::Validation(format!(
            "experiences[{i}].title cannot be empty"
        )));
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Prompt assembly
// ────────────────────────────────────────────────────────────────────────────

/// Renders one experience as `- <title>[ at <company>]: <description>`,
/// followed by skills and duration when present.
pub fn render_experience(exp: &PromptExperience) -> String {
    let mut line = format!("- {}", exp.title.trim());

    if let Some(company) = non_blank(exp.company.as_deref()) {
        line.push_str(" at ");
        line.push_str(company);
    }

    let description = exp.description.trim();
    if !description.is_empty() {
        line.push_str(": ");
        line.push_str(description);
    }

    let mut skills: Vec<&str> = Vec::with_capacity(exp.skills.len());
    for skill in exp.skills.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if !skills.iter().any(|seen| seen.eq_ignore_ascii_case(skill)) {
            skills.push(skill);
        }
    }
    if !skills.is_empty() {
        line.push_str(&format!(" (Skills: {})", skills.join(", ")));
    }

    if let Some(duration) = non_blank(exp.duration.as_deref()) {
        line.push_str(&format!(" [{duration}]"));
    }

    line
}

/// Bullets in exactly the order given; bullet i is experience i.
pub fn render_experiences(experiences: &[PromptExperience]) -> String {
    if experiences.is_empty() {
        return NO_EXPERIENCES_LINE.to_string();
    }
    experiences
        .iter()
        .map(render_experience)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_flat_prompt(job_description: &str, experiences: &[PromptExperience]) -> String {
    let experiences = render_experiences(experiences);
    fill_template(
        FLAT_PROMPT_TEMPLATE,
        &[
            ("job_description", job_description.trim()),
            ("experiences", &experiences),
            ("grounding_instruction", GROUNDING_INSTRUCTION),
        ],
    )
}

pub fn build_structured_prompt(
    company_name: &str,
    hiring_manager: Option<&str>,
    job_description: &str,
    experiences: &[PromptExperience],
) -> String {
    let experiences = render_experiences(experiences);
    let hiring_manager_line = non_blank(hiring_manager)
        .map(|m| format!("Hiring Manager: {m}\n"))
        .unwrap_or_default();
    fill_template(
        STRUCTURED_PROMPT_TEMPLATE,
        &[
            ("company_name", company_name.trim()),
            ("hiring_manager_line", &hiring_manager_line),
            ("job_description", job_description.trim()),
            ("experiences", &experiences),
            ("grounding_instruction", GROUNDING_INSTRUCTION),
        ],
    )
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ────────────────────────────────────────────────────────────────────────────
// Model calls
// ────────────────────────────────────────────────────────────────────────────

/// Flat variant: the model's text is returned verbatim.
pub async fn write_cover_letter(
    llm: &dyn TextGenerator,
    request: &FlatGenerateRequest,
) -> Result<String, AppError> {
    validate_job_description(&request.job_description)?;

    let experiences: Vec<PromptExperience> =
        request.experiences.iter().map(PromptExperience::from).collect();
    let prompt = build_flat_prompt(&request.job_description, &experiences);

    let text = llm
        .generate(&prompt, COVER_LETTER_SYSTEM)
        .await
        .map_err(|e| AppError::Llm(format!("Cover letter generation failed: {e}")))?;

    info!(
        "Generated cover letter from {} experiences ({} chars)",
        experiences.len(),
        text.len()
    );
    Ok(text)
}

/// Structured variant: one call producing the letter plus a chances verdict.
pub async fn generate_cover_letter(
    llm: &dyn TextGenerator,
    request: &GenerationRequest,
) -> Result<GenerationResponse, AppError> {
    validate_generation_request(request)?;

    let experiences: Vec<PromptExperience> =
        request.experiences.iter().map(PromptExperience::from).collect();
    generate_from_prompt_experiences(
        llm,
        &request.company_name,
        request.hiring_manager.as_deref(),
        &request.job_description,
        &experiences,
    )
    .await
}

/// Shared by the structured endpoint and the stored-experience flow.
/// Callers validate their own inputs first.
pub async fn generate_from_prompt_experiences(
    llm: &dyn TextGenerator,
    company_name: &str,
    hiring_manager: Option<&str>,
    job_description: &str,
    experiences: &[PromptExperience],
) -> Result<GenerationResponse, AppError> {
    let prompt = build_structured_prompt(company_name, hiring_manager, job_description, experiences);
    let system = format!("{COVER_LETTER_SYSTEM} {JSON_ONLY_SYSTEM}");

    let text = llm
        .generate(&prompt, &system)
        .await
        .map_err(|e| AppError::Llm(format!("Cover letter generation failed: {e}")))?;

    let verdict: GenerationResponse = parse_json(&text)
        .map_err(|e| AppError::Llm(format!("Unreadable generation output: {e}")))?;
    if verdict.cover_letter.trim().is_empty() {
        return Err(AppError::Llm(LlmError::EmptyContent.to_string()));
    }

    info!(
        "Generated cover letter for {} (chances: {})",
        company_name,
        verdict.chances.as_str()
    );
    Ok(verdict)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Returns a canned reply and records every prompt it receives.
    pub(crate) struct ScriptedGenerator {
        reply: Result<String, u16>,
        pub calls: AtomicUsize,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        pub(crate) fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(vec![]),
            }
        }

        pub(crate) fn failing(status: u16) -> Self {
            Self {
                reply: Err(status),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(vec![]),
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str, _system: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(status) => Err(LlmError::Api {
                    status: *status,
                    message: "upstream unavailable".to_string(),
                }),
            }
        }
    }

    pub(crate) const VERDICT_JSON: &str = r#"{
        "cover_letter": "Dear Hiring Manager,\n\nI am excited to apply...",
        "chances": "High",
        "chances_explanation": "Direct backend API experience matches the role."
    }"#;

    fn exp(title: &str, company: Option<&str>, description: &str) -> PromptExperience {
        PromptExperience {
            title: title.to_string(),
            company: company.map(str::to_string),
            description: description.to_string(),
            skills: vec![],
            duration: None,
        }
    }

    fn acme_request() -> FlatGenerateRequest {
        FlatGenerateRequest {
            job_description: "Seeking backend engineer to build and scale APIs.".to_string(),
            experiences: vec![FlatExperience {
                title: "Backend Dev".to_string(),
                company: Some("X".to_string()),
                description: "built APIs".to_string(),
            }],
        }
    }

    #[test]
    fn test_render_experience_full() {
        let mut e = exp("Backend Dev", Some("X"), "built APIs");
        e.skills = vec!["Rust".into(), "rust".into(), " ".into(), "SQL".into()];
        e.duration = Some("2 years".into());
        assert_eq!(
            render_experience(&e),
            "- Backend Dev at X: built APIs (Skills: Rust, SQL) [2 years]"
        );
    }

    #[test]
    fn test_render_experience_omits_missing_parts() {
        let rendered = render_experience(&exp("Founder", None, ""));
        assert_eq!(rendered, "- Founder");
        let rendered = render_experience(&exp("Founder", Some("  "), "ran it"));
        assert_eq!(rendered, "- Founder: ran it");
    }

    #[test]
    fn test_prompt_preserves_experience_order() {
        let experiences = vec![
            exp("Zeta Engineer", Some("Zeta"), "z work"),
            exp("Alpha Engineer", Some("Alpha"), "a work"),
            exp("Mid Engineer", Some("Mid"), "m work"),
        ];
        let prompt = build_structured_prompt("Acme", None, "jd", &experiences);

        let positions: Vec<usize> = experiences
            .iter()
            .map(|e| prompt.find(&render_experience(e)).expect("bullet present"))
            .collect();
        assert!(
            positions.windows(2).all(|w| w[0] < w[1]),
            "bullet i must appear before bullet i+1: {positions:?}"
        );
    }

    #[test]
    fn test_prompt_order_holds_for_every_rotation() {
        let base = vec![
            exp("A", Some("a"), "1"),
            exp("B", Some("b"), "2"),
            exp("C", Some("c"), "3"),
            exp("D", Some("d"), "4"),
        ];
        for shift in 0..base.len() {
            let mut experiences = base.clone();
            experiences.rotate_left(shift);
            let prompt = build_flat_prompt("jd", &experiences);
            let bullets: Vec<&str> = prompt.lines().filter(|l| l.starts_with("- ")).collect();
            let expected: Vec<String> = experiences.iter().map(render_experience).collect();
            assert_eq!(bullets, expected);
        }
    }

    #[test]
    fn test_hiring_manager_line_only_when_present() {
        let with = build_structured_prompt("Acme", Some("Jane Doe"), "jd", &[]);
        assert!(with.contains("Hiring Manager: Jane Doe"));
        let without = build_structured_prompt("Acme", Some(" "), "jd", &[]);
        assert!(!without.contains("Hiring Manager:"));
    }

    #[test]
    fn test_acme_prompt_has_no_placeholders() {
        let request = acme_request();
        let experiences: Vec<PromptExperience> =
            request.experiences.iter().map(PromptExperience::from).collect();
        let prompt = build_structured_prompt("Acme", None, &request.job_description, &experiences);
        assert!(prompt.contains("- Backend Dev at X: built APIs"));
        assert!(prompt.contains("Acme"));
        assert!(!prompt.contains("undefined"));
        assert!(!prompt.contains("null"));
        assert!(!prompt.contains("None"));
    }

    #[tokio::test]
    async fn test_empty_request_makes_no_model_call() {
        let llm = ScriptedGenerator::replying("unused");
        let request = FlatGenerateRequest {
            job_description: "   ".to_string(),
            experiences: vec![],
        };
        let result = write_cover_letter(&llm, &request).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_structured_validation_makes_no_model_call() {
        let llm = ScriptedGenerator::replying(VERDICT_JSON);
        let request = GenerationRequest {
            company_name: "".to_string(),
            hiring_manager: None,
            job_description: "Seeking backend engineer".to_string(),
            experiences: vec![],
        };
        let result = generate_cover_letter(&llm, &request).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_flat_returns_model_text_verbatim() {
        let reply = "  Dear Acme team,\n\nI built APIs at X.  \n";
        let llm = ScriptedGenerator::replying(reply);
        let letter = write_cover_letter(&llm, &acme_request()).await.unwrap();
        assert_eq!(letter, reply);
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_model_failure_is_terminal() {
        let llm = ScriptedGenerator::failing(529);
        let result = write_cover_letter(&llm, &acme_request()).await;
        assert!(matches!(result, Err(AppError::Llm(_))));
        assert_eq!(llm.call_count(), 1, "no retry on model failure");
    }

    #[tokio::test]
    async fn test_structured_parses_verdict() {
        let llm = ScriptedGenerator::replying(VERDICT_JSON);
        let request = GenerationRequest {
            company_name: "Acme".to_string(),
            hiring_manager: Some("Jane".to_string()),
            job_description: "Seeking backend engineer".to_string(),
            experiences: vec![ExperienceSummary {
                title: "Backend Dev".to_string(),
                company: None,
                description: "built APIs".to_string(),
                skills: vec!["Rust".to_string()],
                duration: Some("2 years".to_string()),
            }],
        };
        let response = generate_cover_letter(&llm, &request).await.unwrap();
        assert_eq!(response.chances, Chances::High);
        assert!(response.cover_letter.starts_with("Dear Hiring Manager"));

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("- Backend Dev: built APIs (Skills: Rust) [2 years]"));
    }

    #[tokio::test]
    async fn test_structured_rejects_prose_output() {
        let llm = ScriptedGenerator::replying("Here is your cover letter: Dear...");
        let request = GenerationRequest {
            company_name: "Acme".to_string(),
            hiring_manager: None,
            job_description: "Seeking backend engineer".to_string(),
            experiences: vec![],
        };
        let result = generate_cover_letter(&llm, &request).await;
        assert!(matches!(result, Err(AppError::Llm(_))));
        assert_eq!(llm.call_count(), 1);
    }
}
