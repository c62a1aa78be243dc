//! # Medical Panel
//!
//! Simulates a panel of medical specialists for a reported symptom.
//!
//! The panel is assembled by the model, debates the symptom, gathers
//! evidence from Tavily web search and Wikipedia in parallel, and drafts a
//! treatment plan from the merged evidence.
//!
//! ## Quick Start
//! ```bash
//! cargo run -- "persistent cough"
//! ```

// =============================================================================
// MODULE DECLARATIONS
// =============================================================================

/// Configuration management
mod config;

/// Production collaborators and workflow wiring
mod panel;

// =============================================================================
// IMPORTS
// =============================================================================
use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rig_panel::{ErrorKind, FinalOutput};

use crate::config::Config;

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
#[derive(Parser, Debug)]
#[command(
    name = "medical-panel",
    version,
    about = "Simulated specialist panel that debates a symptom and drafts a treatment plan",
    long_about = r#"
Medical Panel - a simulated multidisciplinary case conference.

For the given symptom the tool will:
  1. Assemble a panel of distinct medical specialists
  2. Let the panel debate the case
  3. Search the web (Tavily) and Wikipedia in parallel
  4. Merge the evidence and write a treatment plan

The output is a simulation and not medical advice.

PREREQUISITES:
  OPENAI_API_KEY and TAVILY_API_KEY must be set (environment or .env)

EXAMPLES:
  # Default panel of three
  medical-panel "persistent cough"

  # Five specialists with extra guidance
  medical-panel -e 5 -g "patient is a smoker" "persistent cough"

  # Print the workflow graph as Mermaid
  medical-panel --graph "unused"
"#
)]
struct Args {
    /// The symptom the panel should discuss
    #[arg(help = "The reported symptom", value_name = "SYMPTOM")]
    symptom: String,

    /// Number of specialists (overrides MAX_EXPERTS)
    #[arg(short = 'e', long = "experts", help = "Number of specialists on the panel")]
    experts: Option<usize>,

    /// Free-text guidance that shapes the panel and the final plan
    #[arg(
        short = 'g',
        long = "guidance",
        help = "Guidance on which specialists to pick, also passed to the plan author"
    )]
    guidance: Option<String>,

    /// Upper bound on debate turns (overrides MAX_TURNS)
    #[arg(short = 't', long = "turns", help = "Maximum number of debate turns")]
    turns: Option<usize>,

    /// The OpenAI model to use (overrides OPENAI_MODEL env var)
    #[arg(short = 'm', long = "model", help = "OpenAI model to use", env = "OPENAI_MODEL")]
    model: Option<String>,

    /// Print the full run as JSON
    #[arg(long = "json", help = "Print the final output as JSON", default_value = "false")]
    json: bool,

    /// Print the workflow graph and exit
    #[arg(long = "graph", help = "Print the workflow graph as Mermaid and exit", default_value = "false")]
    graph: bool,

    /// Verbose output (debug logging)
    #[arg(
        short = 'v',
        long = "verbose",
        help = "Enable verbose/debug logging",
        default_value = "false"
    )]
    verbose: bool,
}

impl Args {
    /// Apply command-line overrides on top of the environment
    fn apply(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            info!(model = %model, "Using model from command line");
            config.model = model.clone();
        }
        if let Some(experts) = self.experts {
            config.max_experts = experts;
        }
        if let Some(turns) = self.turns {
            config.max_turns = turns;
        }
    }
}

// =============================================================================
// MAIN FUNCTION
// =============================================================================
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::from_env()?;
    init_logging(args.verbose, &config.log_level)?;

    args.apply(&mut config);
    config.validate()?;

    if args.graph {
        println!("{}", panel::render_graph(&config)?);
        return Ok(());
    }

    info!(
        model = %config.model,
        experts = config.max_experts,
        turns = config.max_turns,
        "Configuration loaded"
    );

    let workflow = panel::build_workflow(&config)?;

    let output = match workflow
        .run(&args.symptom, config.max_experts, args.guidance.as_deref())
        .await
    {
        Ok(output) => output,
        Err(e) => {
            error!(error = %e, kind = %e.kind(), "Panel run failed");
            eprintln!("\nPanel run failed: {}", e);
            if matches!(e.kind(), ErrorKind::CollaboratorUnavailable | ErrorKind::Timeout) {
                eprintln!("\nTip: a collaborator was unreachable or slow, running again may succeed.");
            }
            return Err(e.into());
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_report(&output);
    }

    info!(
        run_id = %output.run_id,
        duration_ms = output.duration().num_milliseconds(),
        "Panel run completed"
    );
    Ok(())
}

// =============================================================================
// OUTPUT
// =============================================================================
fn print_report(output: &FinalOutput) {
    let rule = "=".repeat(60);

    println!("\n{}", rule);
    println!("SPECIALIST PANEL: {}", output.symptom);
    println!("{}\n", rule);

    for expert in &output.experts {
        println!(
            "- {} ({}, {} years): {}",
            expert.name, expert.specialization, expert.experience, expert.qualifications
        );
    }

    println!("\n{}", rule);
    println!("TREATMENT PLAN");
    println!("{}\n", rule);
    println!("{}", output.plan);

    let evidence_chars: usize = output.evidence.iter().map(|e| e.chars().count()).sum();
    println!("\n{}", rule);
    println!(
        "{} conversation entries, {} evidence chars, {} node runs",
        output.conversation.len(),
        evidence_chars,
        output.steps
    );
    println!("{}", rule);
}

// =============================================================================
// LOGGING INITIALIZATION
// =============================================================================
/// Initialize the tracing subscriber.
///
/// `--verbose` wins over RUST_LOG; otherwise the configured filter is used.
fn init_logging(verbose: bool, log_level: &str) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}
