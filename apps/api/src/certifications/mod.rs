pub mod handlers;

use crate::errors::AppError;
use crate::experiences::validation::{check_max_chars, MAX_NAME_CHARS};
use crate::models::certification::CertificationInput;

pub fn validate_certification(mut input: CertificationInput) -> Result<CertificationInput, AppError> {
    input.name = input.name.trim().to_string();
    input.issuer = input.issuer.trim().to_string();
    if input.name.is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    if input.issuer.is_empty() {
        return Err(AppError::Validation("issuer cannot be empty".to_string()));
    }
    if let (Some(issued), Some(expires)) = (input.issue_date, input.expiry_date) {
        if expires < issued {
            return Err(AppError::Validation(
                "expiry_date must not be before issue_date".to_string(),
            ));
        }
    }
    if let Some(url) = input.credential_url.as_deref().map(str::trim) {
        if !url.is_empty() && !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(AppError::Validation(
                "credential_url must be an http(s) URL".to_string(),
            ));
        }
    }
    for field in [&mut input.credential_id, &mut input.credential_url] {
        *field = field
            .take()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
    }
    check_max_chars("name", &input.name, MAX_NAME_CHARS)?;
    check_max_chars("issuer", &input.issuer, MAX_NAME_CHARS)?;
    if let Some(credential_id) = &input.credential_id {
        check_max_chars("credential_id", credential_id, MAX_NAME_CHARS)?;
    }
    Ok(input)
}
