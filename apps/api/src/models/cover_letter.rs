use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The model's estimate of how competitive the candidate is for the role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Chances {
    #[serde(alias = "Low", alias = "LOW")]
    Low,
    #[serde(alias = "Medium", alias = "MEDIUM", alias = "moderate", alias = "Moderate")]
    Medium,
    #[serde(alias = "High", alias = "HIGH")]
    High,
}

impl Chances {
    pub fn as_str(&self) -> &'static str {
        match self {
            Chances::Low => "low",
            Chances::Medium => "medium",
            Chances::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CoverLetterStatus {
    #[default]
    Draft,
    Final,
}

impl CoverLetterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverLetterStatus::Draft => "draft",
            CoverLetterStatus::Final => "final",
        }
    }
}

/// Request body for saving or replacing a cover letter.
#[derive(Debug, Clone, Deserialize)]
pub struct CoverLetterInput {
    pub company_name: String,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub hiring_manager: Option<String>,
    pub job_description: String,
    #[serde(default)]
    pub generated_content: Option<String>,
    #[serde(default)]
    pub status: CoverLetterStatus,
    #[serde(default)]
    pub chances: Option<Chances>,
    #[serde(default)]
    pub chances_explanation: Option<String>,
    /// Linked experiences, most relevant first.
    #[serde(default)]
    pub experience_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CoverLetterRow {
    pub id: Uuid,
    #[serde(skip)]
    pub user_id: Uuid,
    pub company_name: String,
    pub job_title: Option<String>,
    pub hiring_manager: Option<String>,
    pub job_description: String,
    pub generated_content: Option<String>,
    pub status: String,
    pub chances: Option<String>,
    pub chances_explanation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
