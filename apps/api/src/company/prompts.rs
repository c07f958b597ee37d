/// System prompt for company research summaries.
pub const COMPANY_SYSTEM: &str = "You are helping a candidate write a personalized, \
    enthusiastic cover letter. Write plain prose only, no headings or lists.";

/// Placeholders: {company_name}, {search_results}
pub const COMPANY_SUMMARY_TEMPLATE: &str = r#"The user is applying to a job at {company_name}.

Here is information about the company from a web search:
{search_results}

Write a paragraph about {company_name}, who they are and why someone would be excited to join them.
Focus on their mission, values, culture, and recent developments.
Keep the tone professional but enthusiastic."#;

/// Placeholders: {company_name}, {job_description}, {search_results}
pub const ROLE_FIT_TEMPLATE: &str = r#"The user is applying to a job at {company_name}.

Job Description:
{job_description}

Here is information about the company from a web search:
{search_results}

Write a paragraph about why this specific role at {company_name} is a great fit for the candidate.
Focus on how the company's mission, values, and culture align with the job requirements.
Keep the tone professional but enthusiastic."#;
