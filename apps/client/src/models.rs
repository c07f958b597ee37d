//! Wire types shared with the backend API.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub firebase_uid: String,
}

/// The blob persisted under the session key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionData {
    pub firebase_id_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExperienceDetails {
    Work {
        company_name: String,
        title: String,
        #[serde(default)]
        location: Option<String>,
        start_date: NaiveDate,
        #[serde(default)]
        end_date: Option<NaiveDate>,
        #[serde(default)]
        is_current: bool,
    },
    Project {
        name: String,
        #[serde(default)]
        role: Option<String>,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        start_date: Option<NaiveDate>,
        #[serde(default)]
        end_date: Option<NaiveDate>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct NewExperience {
    #[serde(flatten)]
    pub details: ExperienceDetails,
    pub description: String,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Experience {
    pub id: Uuid,
    #[serde(flatten)]
    pub details: ExperienceDetails,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub skills: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationExperience {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub description: String,
    pub skills: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub company_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hiring_manager: Option<String>,
    pub job_description: String,
    /// Most relevant first.
    pub experiences: Vec<GenerationExperience>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GenerationResponse {
    pub cover_letter: String,
    pub chances: String,
    pub chances_explanation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveCoverLetter {
    pub company_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hiring_manager: Option<String>,
    pub job_description: String,
    pub generated_content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chances: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chances_explanation: Option<String>,
    pub experience_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoverLetter {
    pub id: Uuid,
    pub company_name: String,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub hiring_manager: Option<String>,
    pub job_description: String,
    #[serde(default)]
    pub generated_content: Option<String>,
    pub status: String,
    #[serde(default)]
    pub chances: Option<String>,
    #[serde(default)]
    pub chances_explanation: Option<String>,
    /// Present on single-letter responses only.
    #[serde(default)]
    pub experiences: Vec<Experience>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
