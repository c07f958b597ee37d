pub mod handlers;

use crate::errors::AppError;
use crate::experiences::validation::{check_max_chars, MAX_NAME_CHARS};
use crate::models::education::EducationInput;

const MAX_GRADE_CHARS: usize = 64;

/// Trims text fields and checks required ones, column lengths and date order.
pub fn validate_education(mut input: EducationInput) -> Result<EducationInput, AppError> {
    input.institution = input.institution.trim().to_string();
    input.degree = input.degree.trim().to_string();
    if input.institution.is_empty() {
        return Err(AppError::Validation("institution cannot be empty".to_string()));
    }
    if input.degree.is_empty() {
        return Err(AppError::Validation("degree cannot be empty".to_string()));
    }
    if let (Some(start), Some(end)) = (input.start_date, input.end_date) {
        if end < start {
            return Err(AppError::Validation(
                "end_date must not be before start_date".to_string(),
            ));
        }
    }
    for field in [&mut input.field_of_study, &mut input.grade, &mut input.description] {
        *field = field
            .take()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
    }
    check_max_chars("institution", &input.institution, MAX_NAME_CHARS)?;
    check_max_chars("degree", &input.degree, MAX_NAME_CHARS)?;
    if let Some(field_of_study) = &input.field_of_study {
        check_max_chars("field_of_study", field_of_study, MAX_NAME_CHARS)?;
    }
    if let Some(grade) = &input.grade {
        check_max_chars("grade", grade, MAX_GRADE_CHARS)?;
    }
    Ok(input)
}
