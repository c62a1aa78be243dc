//! Integration Tests for the Specialist-Panel Workflow
//!
//! These tests drive the full graph with deterministic collaborators:
//! - a clinician fake that answers by recognising each node's directive
//! - retrieval fakes with controllable latency and failure
//!
//! The live run at the bottom needs real API keys and is ignored by default.
//! Run it with: `cargo test --test integration_panel_workflow -- --ignored`

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use rig_panel::panel::prompts::{DEBATE_SENTINEL, PLAN_SENTINEL};
use rig_panel::{
    run_workflow, CollaboratorError, EncyclopediaDocument, EncyclopediaLookup, ErrorKind,
    LLMConfig, LLMProvider, LLMResponse, Message, PanelConfig, PanelWorkflow, PregelConfig,
    Role, WebDocument, WebSearch,
};

// =============================================================================
// FAKE COLLABORATORS
// =============================================================================

const SPECIALTIES: [&str; 6] = [
    "Pulmonologist",
    "Allergist",
    "Gastroenterologist",
    "Cardiologist",
    "Otolaryngologist",
    "Infectious disease specialist",
];

/// Answers every node from the directive it receives
struct FakeClinician {
    /// Debate turn (1-based) that closes the discussion
    close_on_turn: usize,
    /// Whether the plan ends with the completion phrase
    plan_has_sentinel: bool,
    /// Reply for the expert-generation call, if not the default panel
    experts_reply: Option<String>,
    debate_calls: AtomicUsize,
    directives: Mutex<Vec<String>>,
}

impl FakeClinician {
    fn new() -> Self {
        Self {
            close_on_turn: 1,
            plan_has_sentinel: true,
            experts_reply: None,
            debate_calls: AtomicUsize::new(0),
            directives: Mutex::new(Vec::new()),
        }
    }

    fn closing_on_turn(mut self, turn: usize) -> Self {
        self.close_on_turn = turn;
        self
    }

    fn without_plan_sentinel(mut self) -> Self {
        self.plan_has_sentinel = false;
        self
    }

    fn with_experts_reply(mut self, reply: impl Into<String>) -> Self {
        self.experts_reply = Some(reply.into());
        self
    }

    fn directives_containing(&self, needle: &str) -> Vec<String> {
        self.directives
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.contains(needle))
            .cloned()
            .collect()
    }

    fn panel_reply() -> String {
        let experts: Vec<_> = SPECIALTIES
            .iter()
            .enumerate()
            .map(|(i, specialty)| {
                json!({
                    "name": format!("Dr. Panel {}", i + 1),
                    "qualifications": "MD",
                    "specialization": specialty,
                    "experience": 10 + i,
                    "description": format!("Senior {} at a teaching hospital", specialty),
                })
            })
            .collect();
        json!({ "experts": experts }).to_string()
    }
}

#[async_trait]
impl LLMProvider for FakeClinician {
    async fn complete(
        &self,
        messages: &[Message],
        _config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, CollaboratorError> {
        let directive = messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.directives.lock().unwrap().push(directive.clone());

        let reply = if directive.contains("assembling a panel") {
            self.experts_reply.clone().unwrap_or_else(Self::panel_reply)
        } else if directive.contains("moderating a discussion") {
            let turn = self.debate_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if turn >= self.close_on_turn {
                format!("Turn {}: we agree on imaging and an inhaler trial. {}", turn, DEBATE_SENTINEL)
            } else {
                format!("Turn {}: the pulmonologist asks about nocturnal symptoms.", turn)
            }
        } else if directive.contains("well-structured query") {
            json!({ "search_query": "chronic cough diagnosis" }).to_string()
        } else if directive.contains("lead physician") {
            if self.plan_has_sentinel {
                format!("1. Chest X-ray.\n2. Spirometry.\n\n{}", PLAN_SENTINEL)
            } else {
                "1. Chest X-ray.\n2. Spirometry.".to_string()
            }
        } else {
            return Err(CollaboratorError::permanent("fake", "unexpected directive"));
        };

        Ok(LLMResponse::new(Message::agent(reply)))
    }

    fn name(&self) -> &str {
        "fake-clinician"
    }

    fn default_model(&self) -> &str {
        "fake-1"
    }
}

/// Web search that waits before answering
struct SlowWeb {
    delay: Duration,
    documents: Vec<WebDocument>,
    calls: AtomicUsize,
}

impl SlowWeb {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            documents: vec![WebDocument::new(
                "https://example.org/cough",
                "Cough lasting over eight weeks is chronic.",
            )],
            calls: AtomicUsize::new(0),
        }
    }

    fn empty(delay: Duration) -> Self {
        Self {
            documents: Vec::new(),
            ..Self::new(delay)
        }
    }
}

#[async_trait]
impl WebSearch for SlowWeb {
    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<WebDocument>, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(self.documents.iter().take(max_results).cloned().collect())
    }
}

/// Encyclopedia that waits before answering
struct SlowEncyclopedia {
    delay: Duration,
    calls: AtomicUsize,
}

impl SlowEncyclopedia {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EncyclopediaLookup for SlowEncyclopedia {
    async fn lookup(
        &self,
        _query: &str,
        _max_docs: usize,
    ) -> Result<Vec<EncyclopediaDocument>, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(vec![EncyclopediaDocument::new(
            "https://en.wikipedia.org/wiki/Cough",
            "A cough is a sudden expulsion of air.",
        )
        .with_page("Cough")])
    }
}

/// Web search that is always unreachable
struct UnreachableWeb;

#[async_trait]
impl WebSearch for UnreachableWeb {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<WebDocument>, CollaboratorError> {
        Err(CollaboratorError::unavailable("web", "connection refused"))
    }
}

fn fast() -> Duration {
    Duration::from_millis(5)
}

fn panel(
    llm: Arc<FakeClinician>,
    web: Arc<dyn WebSearch>,
    encyclopedia: Arc<dyn EncyclopediaLookup>,
    config: PanelConfig,
) -> PanelWorkflow {
    PanelWorkflow::builder()
        .llm(llm)
        .web_search(web)
        .encyclopedia(encyclopedia)
        .config(config)
        .build()
        .expect("all collaborators set")
}

// =============================================================================
// END-TO-END RUNS
// =============================================================================

/// Full run for the canonical case
#[tokio::test]
async fn test_persistent_cough_end_to_end() {
    let llm = Arc::new(FakeClinician::new());
    let web = Arc::new(SlowWeb::new(fast()));
    let encyclopedia = Arc::new(SlowEncyclopedia::new(fast()));

    let output = run_workflow(llm.clone(), web.clone(), encyclopedia.clone(), "persistent cough", 3, None)
        .await
        .expect("run succeeds");

    assert_eq!(output.symptom, "persistent cough");
    assert_eq!(output.experts.len(), 3);

    // One debate turn followed by the plan entry
    assert_eq!(output.conversation.len(), 2);
    assert_eq!(output.conversation[0].role, Role::Agent);
    assert!(output.conversation[0].content.contains(DEBATE_SENTINEL));
    assert_eq!(output.conversation[1].content, output.plan);

    // Both branches contributed to one merged block
    assert_eq!(output.evidence.len(), 1);
    assert!(output.evidence[0].contains("https://example.org/cough"));
    assert!(output.evidence[0].contains("source=\"https://en.wikipedia.org/wiki/Cough\""));

    assert!(output.plan.trim_end().ends_with(PLAN_SENTINEL));
    assert_eq!(web.calls.load(Ordering::SeqCst), 1);
    assert_eq!(encyclopedia.calls.load(Ordering::SeqCst), 1);
    assert_eq!(output.steps, 6);
    assert!(output.duration() >= chrono::Duration::zero());
}

/// The plan directive sees both evidence blocks and the operator guidance
#[tokio::test]
async fn test_synthesis_sees_evidence_and_guidance() {
    let llm = Arc::new(FakeClinician::new());
    let output = panel(
        llm.clone(),
        Arc::new(SlowWeb::new(fast())),
        Arc::new(SlowEncyclopedia::new(fast())),
        PanelConfig::default(),
    )
    .run("persistent cough", 2, Some("patient is a smoker"))
    .await
    .unwrap();

    let synthesis = llm.directives_containing("lead physician");
    assert_eq!(synthesis.len(), 1);
    assert!(synthesis[0].contains("patient is a smoker"));
    assert!(synthesis[0].contains("Cough lasting over eight weeks"));
    assert!(synthesis[0].contains("sudden expulsion of air"));

    let experts = llm.directives_containing("assembling a panel");
    assert!(experts[0].contains("patient is a smoker"));
    assert_eq!(output.experts.len(), 2);
}

/// Room for both retrieval branches to run at once
fn concurrent_config() -> PanelConfig {
    PanelConfig::default().with_pregel(PregelConfig::default().with_parallelism(2))
}

/// Merged evidence holds both blocks regardless of which branch finished first
#[tokio::test]
async fn test_reversed_branch_latency() {
    for (web_delay, wiki_delay) in [(60, 5), (5, 60)] {
        let output = panel(
            Arc::new(FakeClinician::new()),
            Arc::new(SlowWeb::new(Duration::from_millis(web_delay))),
            Arc::new(SlowEncyclopedia::new(Duration::from_millis(wiki_delay))),
            concurrent_config(),
        )
        .run("persistent cough", 3, None)
        .await
        .unwrap();

        assert_eq!(output.evidence.len(), 1);
        let merged = &output.evidence[0];
        assert!(merged.contains("example.org/cough"));
        assert!(merged.contains("wikipedia.org/wiki/Cough"));

        // The slower branch commits last, so its block comes second
        let web_at = merged.find("example.org/cough").unwrap();
        let wiki_at = merged.find("wikipedia.org/wiki/Cough").unwrap();
        assert_eq!(web_delay > wiki_delay, web_at > wiki_at);
    }
}

/// The join starts only after both branches committed
#[tokio::test]
async fn test_merge_waits_for_both_branches() {
    let web_delay = Duration::from_millis(120);
    let wiki_delay = Duration::from_millis(80);

    let output = panel(
        Arc::new(FakeClinician::new()),
        Arc::new(SlowWeb::new(web_delay)),
        Arc::new(SlowEncyclopedia::new(wiki_delay)),
        concurrent_config(),
    )
    .run("persistent cough", 3, None)
    .await
    .unwrap();

    let trace = &output.trace;
    let merge_started = trace.invocations("merge_evidence");
    assert_eq!(merge_started.len(), 1);

    let web_done = trace.commits("retrieve_web");
    let wiki_done = trace.commits("retrieve_encyclopedia");
    assert_eq!(web_done.len(), 1);
    assert_eq!(wiki_done.len(), 1);
    assert!(merge_started[0] >= web_done[0]);
    assert!(merge_started[0] >= wiki_done[0]);

    // The two branches overlap: neither waited for the other to finish
    let web_started = trace.invocations("retrieve_web")[0];
    let wiki_started = trace.invocations("retrieve_encyclopedia")[0];
    let gap = if web_started > wiki_started {
        web_started - wiki_started
    } else {
        wiki_started - web_started
    };
    assert!(gap < wiki_delay.min(web_delay), "branches ran back to back: {gap:?}");

    assert_eq!(trace.invocations("synthesize_plan").len(), 1);
}

/// Panel sizes other than the default
#[tokio::test]
async fn test_panel_sizes() {
    for k in [1usize, 2, 5] {
        let llm = Arc::new(FakeClinician::new());
        let output = run_workflow(
            llm.clone(),
            Arc::new(SlowWeb::new(fast())),
            Arc::new(SlowEncyclopedia::new(fast())),
            "persistent cough",
            k,
            None,
        )
        .await
        .unwrap();

        assert_eq!(output.experts.len(), k);
        let debate = llm.directives_containing("moderating a discussion");
        for expert in &output.experts {
            assert!(debate[0].contains(&expert.name));
        }
    }
}

/// The debate loops until the panel closes the discussion
#[tokio::test]
async fn test_multi_turn_debate() {
    let llm = Arc::new(FakeClinician::new().closing_on_turn(2));
    let config = PanelConfig::default().with_max_turns(4);

    let output = panel(
        llm.clone(),
        Arc::new(SlowWeb::new(fast())),
        Arc::new(SlowEncyclopedia::new(fast())),
        config,
    )
    .run("persistent cough", 3, None)
    .await
    .unwrap();

    // Two debate turns, then the plan
    assert_eq!(output.conversation.len(), 3);
    assert!(!output.conversation[0].content.contains(DEBATE_SENTINEL));
    assert!(output.conversation[1].content.contains(DEBATE_SENTINEL));
    assert_eq!(output.trace.invocations("debate_turn").len(), 2);
    assert_eq!(output.trace.invocations("merge_evidence").len(), 1);
}

/// Turn limit ends the debate even without the closing phrase
#[tokio::test]
async fn test_debate_stops_at_turn_limit() {
    let llm = Arc::new(FakeClinician::new().closing_on_turn(usize::MAX));
    let config = PanelConfig::default().with_max_turns(3);

    let output = panel(
        llm,
        Arc::new(SlowWeb::new(fast())),
        Arc::new(SlowEncyclopedia::new(fast())),
        config,
    )
    .run("persistent cough", 2, None)
    .await
    .unwrap();

    assert_eq!(output.trace.invocations("debate_turn").len(), 3);
    assert_eq!(output.conversation.len(), 4);
}

/// A plan without the completion phrase gets it appended
#[tokio::test]
async fn test_plan_sentinel_is_appended() {
    let output = run_workflow(
        Arc::new(FakeClinician::new().without_plan_sentinel()),
        Arc::new(SlowWeb::new(fast())),
        Arc::new(SlowEncyclopedia::new(fast())),
        "persistent cough",
        3,
        None,
    )
    .await
    .unwrap();

    assert!(output.plan.starts_with("1. Chest X-ray."));
    assert!(output.plan.ends_with(PLAN_SENTINEL));
}

/// An empty search result still yields an evidence block
#[tokio::test]
async fn test_empty_web_results() {
    let output = run_workflow(
        Arc::new(FakeClinician::new()),
        Arc::new(SlowWeb::empty(fast())),
        Arc::new(SlowEncyclopedia::new(fast())),
        "persistent cough",
        3,
        None,
    )
    .await
    .unwrap();

    assert_eq!(output.evidence.len(), 1);
    assert!(output.evidence[0].contains("No web results found for query \"chronic cough diagnosis\"."));
    assert!(output.evidence[0].contains("sudden expulsion of air"));
}

// =============================================================================
// FAILURES
// =============================================================================

/// A failed branch aborts the run before the plan is written
#[tokio::test]
async fn test_web_failure_skips_synthesis() {
    let llm = Arc::new(FakeClinician::new());
    let err = run_workflow(
        llm.clone(),
        Arc::new(UnreachableWeb),
        Arc::new(SlowEncyclopedia::new(fast())),
        "persistent cough",
        3,
        None,
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::CollaboratorUnavailable);
    assert_eq!(err.vertex_id().map(|v| v.as_str()), Some("retrieve_web"));
    assert!(llm.directives_containing("lead physician").is_empty());
}

/// Zero specialists is rejected before any call
#[tokio::test]
async fn test_zero_experts_is_invalid_input() {
    let llm = Arc::new(FakeClinician::new());
    let err = run_workflow(
        llm.clone(),
        Arc::new(SlowWeb::new(fast())),
        Arc::new(SlowEncyclopedia::new(fast())),
        "persistent cough",
        0,
        None,
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(llm.directives.lock().unwrap().is_empty());
}

/// A blank symptom is rejected
#[tokio::test]
async fn test_blank_symptom_is_invalid_input() {
    let err = run_workflow(
        Arc::new(FakeClinician::new()),
        Arc::new(SlowWeb::new(fast())),
        Arc::new(SlowEncyclopedia::new(fast())),
        "   ",
        3,
        None,
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

/// An unparseable panel reply fails the expert node
#[tokio::test]
async fn test_unparseable_panel_is_parse_failure() {
    let llm = Arc::new(FakeClinician::new().with_experts_reply("I would pick a pulmonologist."));
    let err = run_workflow(
        llm.clone(),
        Arc::new(SlowWeb::new(fast())),
        Arc::new(SlowEncyclopedia::new(fast())),
        "persistent cough",
        3,
        None,
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ParseFailure);
    assert_eq!(err.vertex_id().map(|v| v.as_str()), Some("generate_experts"));
    assert!(llm.directives_containing("moderating a discussion").is_empty());
}

/// Asking for more specialists than distinct specialties is a parse failure
#[tokio::test]
async fn test_too_few_distinct_specialists() {
    let err = run_workflow(
        Arc::new(FakeClinician::new()),
        Arc::new(SlowWeb::new(fast())),
        Arc::new(SlowEncyclopedia::new(fast())),
        "persistent cough",
        SPECIALTIES.len() + 1,
        None,
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ParseFailure);
}

/// A branch slower than the node budget times out
#[tokio::test]
async fn test_slow_branch_times_out() {
    let config = PanelConfig::default()
        .with_pregel(PregelConfig::default().with_vertex_timeout(Duration::from_millis(50)));

    let err = panel(
        Arc::new(FakeClinician::new()),
        Arc::new(SlowWeb::new(Duration::from_secs(5))),
        Arc::new(SlowEncyclopedia::new(fast())),
        config,
    )
    .run("persistent cough", 3, None)
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(err.vertex_id().map(|v| v.as_str()), Some("retrieve_web"));
}

/// Cancelling mid-run aborts the in-flight retrieval
#[tokio::test]
async fn test_cancellation_during_retrieval() {
    let workflow = panel(
        Arc::new(FakeClinician::new()),
        Arc::new(SlowWeb::new(Duration::from_secs(10))),
        Arc::new(SlowEncyclopedia::new(Duration::from_secs(10))),
        PanelConfig::default(),
    );

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let started = std::time::Instant::now();
    let err = workflow
        .run_with_cancellation("persistent cough", 3, None, token)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(5));
}

// =============================================================================
// LIVE RUN
// =============================================================================

/// Full run against OpenAI, Tavily and Wikipedia
#[tokio::test]
#[ignore = "Requires OPENAI_API_KEY and TAVILY_API_KEY environment variables"]
async fn test_live_panel_run() {
    use rig::client::{CompletionClient, ProviderClient};
    use rig_panel::{RetryPolicy, RetryingProvider, RigAgentAdapter, TavilySearch, WikipediaLookup};

    if std::env::var("OPENAI_API_KEY").is_err() || std::env::var("TAVILY_API_KEY").is_err() {
        eprintln!("Skipping test: API keys not set");
        return;
    }

    let agent = rig::providers::openai::Client::from_env()
        .agent("gpt-4.1")
        .temperature(0.0)
        .build();
    let llm = RigAgentAdapter::with_names(agent, "openai", "gpt-4.1");

    let output = PanelWorkflow::builder()
        .llm(Arc::new(RetryingProvider::new(llm, RetryPolicy::new(2))))
        .web_search(Arc::new(TavilySearch::from_env().unwrap()))
        .encyclopedia(Arc::new(WikipediaLookup::default()))
        .build()
        .unwrap()
        .run("persistent cough", 3, None)
        .await
        .unwrap();

    assert_eq!(output.experts.len(), 3);
    assert_eq!(output.evidence.len(), 1);
    assert!(output.plan.trim_end().ends_with(PLAN_SENTINEL));
    println!("{}", output.plan);
}
