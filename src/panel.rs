//! # Panel Wiring
//!
//! Builds the real collaborators (OpenAI through Rig, Tavily, Wikipedia),
//! wraps each one with the retry policy and hands them to the library's
//! [`PanelWorkflow`].

use anyhow::{Context, Result};
use rig::client::{CompletionClient, ProviderClient};
use rig::providers::openai;
use std::sync::Arc;
use tracing::{debug, info};

use rig_panel::panel::panel_mermaid;
use rig_panel::{
    PanelWorkflow, RetryingEncyclopedia, RetryingProvider, RetryingWebSearch, RigAgentAdapter,
    TavilySearch, WikipediaLookup,
};

use crate::config::Config;

/// Create the panel workflow with production collaborators.
///
/// Both API keys are checked up front so a missing key fails before any
/// model call is made.
pub fn build_workflow(config: &Config) -> Result<PanelWorkflow> {
    std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set (in the environment or .env)")?;

    let tavily = TavilySearch::from_env().context("TAVILY_API_KEY must be set (in the environment or .env)")?;
    let wikipedia = WikipediaLookup::new(&config.wiki_language);

    // Rig reads OPENAI_API_KEY itself
    let openai_client = openai::Client::from_env();
    let agent = openai_client
        .agent(&config.model)
        .temperature(config.temperature)
        .build();
    let llm = RigAgentAdapter::with_names(agent, "openai", &config.model);

    debug!(
        model = %config.model,
        language = %config.wiki_language,
        retries = config.collaborator_retries,
        "Collaborators initialized"
    );

    let policy = config.retry_policy();
    let workflow = PanelWorkflow::builder()
        .llm(Arc::new(RetryingProvider::new(llm, policy.clone())))
        .web_search(Arc::new(RetryingWebSearch::new(tavily, policy.clone())))
        .encyclopedia(Arc::new(RetryingEncyclopedia::new(wikipedia, policy)))
        .config(config.panel_config())
        .build()?;

    info!(model = %config.model, "Panel workflow ready");
    Ok(workflow)
}

/// Mermaid diagram of the panel graph; no API keys are needed.
pub fn render_graph(config: &Config) -> Result<String> {
    Ok(panel_mermaid(config.max_turns)?)
}
