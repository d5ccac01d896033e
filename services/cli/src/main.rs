//! Goftogu terminal client
//!
//! Runs a practice session against the configured LLM provider directly from
//! the terminal. Configuration comes from flags or the same environment
//! variables the API service reads.

use anyhow::{Context, Result};
use async_openai::config::OpenAIConfig;
use clap::{Parser, Subcommand};
use goftogu_core::{
    evaluation::Evaluation,
    evaluator::LLMEvaluationGenerator,
    llm_client::{LLMClient, OpenAICompatibleClient, Provider},
    orchestrator::ConversationOrchestrator,
    prompts::PromptSet,
    scenario::ScenarioRegistry,
    session::PracticeSession,
    turn::LLMTurnGenerator,
    vocabulary::{JsonFileVocabularyProvider, StaticVocabularyProvider, VocabularyProvider},
};
use rand::{SeedableRng, rngs::StdRng};
use std::{io::Write, path::PathBuf, sync::Arc, time::Duration};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "goftogu")]
#[command(version, about = "Roleplay conversation practice for Farsi learners", long_about = None)]
struct Cli {
    /// LLM provider to use (openai or gemini)
    #[arg(long, env = "LLM_PROVIDER", default_value = "openai")]
    provider: Provider,

    /// Chat model identifier
    #[arg(long, env = "CHAT_MODEL", default_value = "gpt-4o")]
    model: String,

    /// Upper bound on each generation call, in seconds
    #[arg(long, env = "GENERATION_TIMEOUT_SECS", default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: u64,

    /// Directory of prompt template overrides
    #[arg(long, env = "PROMPTS_PATH")]
    prompts: Option<PathBuf>,

    /// JSON export of the content library to draw known vocabulary from
    #[arg(long, env = "VOCABULARY_PATH")]
    vocabulary: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the available scenarios
    Scenarios,
    /// Start a practice conversation
    Practice {
        /// Scenario id, as shown by `goftogu scenarios`
        scenario: String,
        /// Seed for the objective draw, for repeatable sessions
        #[arg(long)]
        seed: Option<u64>,
    },
}

/// A line typed by the learner.
#[derive(Debug, PartialEq)]
enum LearnerInput {
    Message(String),
    GiveUp,
    Quit,
    Blank,
}

fn parse_input(line: &str) -> LearnerInput {
    match line.trim() {
        "" => LearnerInput::Blank,
        "/giveup" | "/give-up" => LearnerInput::GiveUp,
        "/quit" | "/exit" => LearnerInput::Quit,
        text => LearnerInput::Message(text.to_string()),
    }
}

type InputLines = Lines<BufReader<Stdin>>;

async fn prompt_line(lines: &mut InputLines, prompt: &str) -> Result<Option<String>> {
    print!("{}", prompt);
    std::io::stdout().flush()?;
    Ok(lines.next_line().await?)
}

fn print_evaluation(evaluation: &Evaluation) {
    println!("\n=== Evaluation ===");
    println!("Objective: {}", evaluation.objective.feedback);
    println!(
        "Formality ({}/5): {}",
        evaluation.formality.score, evaluation.formality.feedback
    );
    println!(
        "Grammar ({}/5): {}",
        evaluation.grammar.score, evaluation.grammar.feedback
    );
    println!("Taarof: {}", evaluation.taarof.feedback);
    println!("Overall: {}", evaluation.overall.feedback);
}

fn print_scenarios(registry: &ScenarioRegistry) {
    for scenario in registry.list_scenarios() {
        println!("{:<12} {}", scenario.id, scenario.title);
        println!(
            "{:<12} {} ({}, {})",
            "", scenario.description, scenario.persona.name, scenario.persona.role
        );
    }
}

fn build_orchestrator(cli: &Cli) -> Result<ConversationOrchestrator> {
    let var = cli.provider.api_key_var();
    let api_key = std::env::var(var).with_context(|| format!("{} must be set", var))?;
    let openai_config = OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(cli.provider.api_base());
    let llm_client: Arc<dyn LLMClient> =
        Arc::new(OpenAICompatibleClient::new(openai_config, cli.model.clone()));

    let prompts = Arc::new(match &cli.prompts {
        Some(dir) => PromptSet::load_overrides(dir)?,
        None => PromptSet::builtin(),
    });

    Ok(ConversationOrchestrator::new(
        Arc::new(LLMTurnGenerator::new(llm_client.clone(), prompts.clone())),
        Arc::new(LLMEvaluationGenerator::new(llm_client, prompts)),
        Duration::from_secs(cli.timeout_secs),
    ))
}

/// Plays one session to the end. Returns whether it was evaluated.
async fn play(
    session: &mut PracticeSession,
    orchestrator: &ConversationOrchestrator,
    lines: &mut InputLines,
) -> Result<bool> {
    println!("\n{}", session.intro());
    println!("Your objective: {}", session.objective());
    println!("(Type /giveup to end and get feedback, /quit to leave.)\n");

    let opening = session.begin()?.clone();
    println!(
        "{}: {}\n    {}",
        session.persona().name,
        opening.content,
        opening.finglish.as_deref().unwrap_or_default()
    );

    loop {
        let Some(line) = prompt_line(lines, "> ").await? else {
            return Ok(false);
        };
        match parse_input(&line) {
            LearnerInput::Blank => continue,
            LearnerInput::Quit => return Ok(false),
            LearnerInput::GiveUp => match session.give_up(orchestrator).await {
                Ok(evaluation) => {
                    print_evaluation(evaluation);
                    return Ok(true);
                }
                Err(e) => eprintln!("{}. You can keep talking or try /giveup again.", e),
            },
            LearnerInput::Message(text) => {
                match session.send_user_message(&text, orchestrator).await {
                    Ok(output) => {
                        println!(
                            "{}: {}\n    {}",
                            session.persona().name,
                            output.response.farsi,
                            output.response.finglish
                        );
                        if let Some(evaluation) = &output.evaluation {
                            println!("\nObjective complete!");
                            print_evaluation(evaluation);
                            return Ok(true);
                        }
                    }
                    Err(e) => eprintln!("{}. Your message was not sent; please try again.", e),
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let registry = ScenarioRegistry::builtin();

    match &cli.command {
        Commands::Scenarios => print_scenarios(&registry),
        Commands::Practice { scenario, seed } => {
            let scenario = registry.get(scenario)?;
            let orchestrator = build_orchestrator(&cli)?;

            let provider: Box<dyn VocabularyProvider> = match &cli.vocabulary {
                Some(path) => Box::new(JsonFileVocabularyProvider::new(path.clone())),
                None => Box::new(StaticVocabularyProvider::empty()),
            };
            let vocabulary = provider.list_vocabulary().await?;
            debug!(terms = vocabulary.len(), "Vocabulary loaded");

            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(*seed),
                None => StdRng::from_os_rng(),
            };
            info!(scenario = %scenario.id, provider = ?cli.provider, model = %cli.model, "Starting practice");

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let mut session = PracticeSession::new(scenario, &mut rng, vocabulary)?;
            while play(&mut session, &orchestrator, &mut lines).await? {
                let answer = prompt_line(&mut lines, "\nTry again with a new objective? [y/N] ").await?;
                if !matches!(answer.as_deref().map(str::trim), Some("y" | "Y")) {
                    break;
                }
                session = session.restart(&registry, &mut rng)?;
            }
            println!("Khodahafez!");
        }
    }

    Ok(())
}
