pub mod handlers;
pub mod store;

use crate::errors::AppError;
use crate::experiences::store::ensure_unique;
use crate::experiences::validation::{check_max_chars, MAX_NAME_CHARS};
use crate::models::cover_letter::CoverLetterInput;

pub fn validate_cover_letter(mut input: CoverLetterInput) -> Result<CoverLetterInput, AppError> {
    input.company_name = input.company_name.trim().to_string();
    if input.company_name.is_empty() {
        return Err(AppError::Validation("company_name cannot be empty".to_string()));
    }
    if input.job_description.trim().is_empty() {
        return Err(AppError::Validation("job_description cannot be empty".to_string()));
    }
    ensure_unique(&input.experience_ids)?;
    for field in [&mut input.job_title, &mut input.hiring_manager] {
        *field = field
            .take()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
    }
    check_max_chars("company_name", &input.company_name, MAX_NAME_CHARS)?;
    for (field, value) in [("job_title", &input.job_title), ("hiring_manager", &input.hiring_manager)] {
        if let Some(value) = value {
            check_max_chars(field, value, MAX_NAME_CHARS)?;
        }
    }
    Ok(input)
}
