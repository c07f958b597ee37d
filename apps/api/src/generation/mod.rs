// Generation Gateway: prompt assembly and the single model call behind
// both cover-letter generation endpoints.
// All model calls go through llm_client::TextGenerator.

pub mod gateway;
pub mod handlers;
pub mod prompts;
