//! Boundary validation for experience input.
//!
//! Serde already enforces the per-variant required fields; this pass rejects
//! values that deserialize but make no sense and normalizes the rest.

use chrono::NaiveDate;

use crate::errors::AppError;
use crate::models::experience::{ExperienceDetails, ExperienceInput};

pub const MAX_DESCRIPTION_CHARS: usize = 5_000;
pub const MAX_SKILLS: usize = 50;
/// Length of the `VARCHAR(255)` text columns.
pub const MAX_NAME_CHARS: usize = 255;

/// Validates and normalizes an experience; returns the cleaned input.
pub fn validate_experience(mut input: ExperienceInput) -> Result<ExperienceInput, AppError> {
    match &mut input.details {
        ExperienceDetails::Work(work) => {
            require("company_name", &mut work.company_name)?;
            require("title", &mut work.title)?;
            work.location = trim_optional(work.location.take());
            if work.is_current && work.end_date.is_some() {
                return Err(AppError::Validation(
                    "a current position cannot have an end_date".to_string(),
                ));
            }
            check_date_order(Some(work.start_date), work.end_date)?;
        }
        ExperienceDetails::Project(project) => {
            require("name", &mut project.name)?;
            project.role = trim_optional(project.role.take());
            project.url = trim_optional(project.url.take());
            check_date_order(project.start_date, project.end_date)?;
        }
    }

    input.description = input.description.trim().to_string();
    if input.description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(AppError::Validation(format!(
            "description exceeds {MAX_DESCRIPTION_CHARS} characters"
        )));
    }

    input.skills = normalize_skills(&input.skills);
    if input.skills.len() > MAX_SKILLS {
        return Err(AppError::Validation(format!(
            "at most {MAX_SKILLS} skills per experience"
        )));
    }

    Ok(input)
}

/// Column limit check; Postgres `VARCHAR(n)` counts characters, not bytes.
pub fn check_max_chars(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{field} exceeds {max} characters"
        )));
    }
    Ok(())
}

fn require(field: &str, value: &mut String) -> Result<(), AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    *value = trimmed.to_string();
    Ok(())
}

fn trim_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_date_order(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), AppError> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(AppError::Validation(
                "end_date must not be before start_date".to_string(),
            ));
        }
    }
    Ok(())
}

/// Trims, drops blanks, and removes case-insensitive duplicates keeping the first spelling.
pub fn normalize_skills(skills: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(skills.len());
    for skill in skills.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if !out.iter().any(|seen| seen.eq_ignore_ascii_case(skill)) {
            out.push(skill.to_string());
        }
    }
    out
}
