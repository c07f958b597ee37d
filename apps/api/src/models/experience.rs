use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Employment history entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkExperience {
    pub company_name: String,
    pub title: String,
    #[serde(default)]
    pub location: Option<String>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_current: bool,
}

/// Side project, open-source work, or anything not tied to an employer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectExperience {
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExperienceDetails {
    Work(WorkExperience),
    Project(ProjectExperience),
}

impl ExperienceDetails {
    pub fn kind_str(&self) -> &'static str {
        match self {
            ExperienceDetails::Work(_) => "work",
            ExperienceDetails::Project(_) => "project",
        }
    }

    /// Headline used when the entry is rendered into a prompt.
    pub fn title(&self) -> &str {
        match self {
            ExperienceDetails::Work(w) => &w.title,
            ExperienceDetails::Project(p) => p.role.as_deref().unwrap_or(&p.name),
        }
    }

    /// Employer or project the entry belongs to.
    pub fn organization(&self) -> &str {
        match self {
            ExperienceDetails::Work(w) => &w.company_name,
            ExperienceDetails::Project(p) => &p.name,
        }
    }

    /// Human-readable date span, e.g. `2021-03 – present`. `None` when undated.
    pub fn duration(&self) -> Option<String> {
        let (start, end, current) = match self {
            ExperienceDetails::Work(w) => (Some(w.start_date), w.end_date, w.is_current),
            ExperienceDetails::Project(p) => (p.start_date, p.end_date, false),
        };
        let start = start?;
        let end = match (end, current) {
            (_, true) | (None, false) => "present".to_string(),
            (Some(end), false) => end.format("%Y-%m").to_string(),
        };
        Some(format!("{} – {}", start.format("%Y-%m"), end))
    }
}

/// Request body for creating or replacing an experience.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceInput {
    #[serde(flatten)]
    pub details: ExperienceDetails,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ExperienceRow {
    pub id: Uuid,
    #[serde(skip)]
    pub user_id: Uuid,
    pub description: String,
    pub skills: Vec<String>,
    #[serde(flatten)]
    pub details: Json<ExperienceDetails>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
