//! Company research: one web search, then one model call to condense it.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::company::prompts::{COMPANY_SUMMARY_TEMPLATE, COMPANY_SYSTEM, ROLE_FIT_TEMPLATE};
use crate::generation::prompts::fill_template;
use crate::llm_client::TextGenerator;

const SERPAPI_URL: &str = "https://serpapi.com/search.json";
const MAX_SNIPPETS: usize = 8;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search returned no results")]
    NoResults,
}

impl SearchError {
    /// Safe to return to the caller.
    pub fn user_message(&self) -> &'static str {
        match self {
            SearchError::Http(_) => "Company search failed",
            SearchError::NoResults => "No results found",
        }
    }

    /// Log line without the request URL.
    fn redacted(&self) -> String {
        match self {
            SearchError::Http(e) => match e.status() {
                Some(status) => format!("HTTP status {status}"),
                None if e.is_timeout() => "request timed out".to_string(),
                None if e.is_connect() => "connection failed".to_string(),
                None => "request failed".to_string(),
            },
            SearchError::NoResults => self.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

#[derive(Clone)]
pub struct SerpApiClient {
    http: reqwest::Client,
    api_key: String,
}

impl SerpApiClient {
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self { http, api_key }
    }

    /// Returns the organic-result snippets joined one per line.
    pub async fn search_company(&self, company_name: &str) -> Result<String, SearchError> {
        let query = format!("{company_name} company mission values news products services");
        let response: SerpApiResponse = self
            .http
            .get(SERPAPI_URL)
            .query(&[
                ("engine", "google"),
                ("q", query.as_str()),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let joined = join_snippets(&response.organic_results);
        if joined.is_empty() {
            return Err(SearchError::NoResults);
        }
        Ok(joined)
    }
}

fn join_snippets(results: &[OrganicResult]) -> String {
    results
        .iter()
        .filter_map(|r| match (r.title.as_deref(), r.snippet.as_deref()) {
            (Some(title), Some(snippet)) => Some(format!("{title}: {snippet}")),
            (None, Some(snippet)) => Some(snippet.to_string()),
            _ => None,
        })
        .take(MAX_SNIPPETS)
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Deserialize)]
pub struct CompanySearchRequest {
    pub company_name: String,
    #[serde(default)]
    pub job_description: Option<String>,
}

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct CompanySearchResponse {
    pub company_name: String,
    pub search_results: Option<String>,
    pub summary: Option<String>,
    pub context: Option<String>,
    pub error: Option<String>,
}

/// Condenses raw search results. With a job description the model writes a
/// role-fit paragraph (`context`), otherwise a company summary (`summary`).
/// Failures are reported in `error` rather than failing the request.
pub async fn research_company(
    llm: &dyn TextGenerator,
    company_name: &str,
    job_description: Option<&str>,
    search_results: Result<String, SearchError>,
) -> CompanySearchResponse {
    let mut response = CompanySearchResponse {
        company_name: company_name.to_string(),
        ..Default::default()
    };

    let search_results = match search_results {
        Ok(results) => results,
        Err(e) => {
            // The request URL carries the API key; it never reaches the log or the body.
            warn!("Company search failed for {company_name}: {}", e.redacted());
            response.error = Some(e.user_message().to_string());
            return response;
        }
    };

    let job_description = job_description.map(str::trim).filter(|jd| !jd.is_empty());
    let prompt = match job_description {
        Some(jd) => fill_template(
            ROLE_FIT_TEMPLATE,
            &[
                ("company_name", company_name),
                ("job_description", jd),
                ("search_results", &search_results),
            ],
        ),
        None => fill_template(
            COMPANY_SUMMARY_TEMPLATE,
            &[("company_name", company_name), ("search_results", &search_results)],
        ),
    };

    match llm.generate(&prompt, COMPANY_SYSTEM).await {
        Ok(text) if job_description.is_some() => response.context = Some(text),
        Ok(text) => response.summary = Some(text),
        Err(e) => {
            warn!("Company summary generation failed for {company_name}: {e}");
            response.error = Some("Could not summarize company information".to_string());
        }
    }
    info!("Researched company {company_name}");
    response.search_results = Some(search_results);
    response
}
