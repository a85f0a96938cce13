//! askql CLI Entry Point
//!
//! Answers one question given on the command line, or runs an interactive
//! loop until `exit`/`quit`. Human-readable progress goes to stdout; `--json`
//! replaces it with one envelope per question. Logs go to stderr.

use anyhow::Context;
use clap::Parser;
use dialoguer::Input;
use serde::Serialize;
use std::io;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use askql::engine::DatabaseEngine;
use askql::fewshot::SchemaExamples;
use askql::oracle::openai::OpenAiOracle;
use askql::output::{ErrorEnvelope, SuccessEnvelope, ASK_COMMAND};
use askql::pipeline::{GenerationSettings, Pipeline, Stage};
use askql::{AppConfig, AskqlError, DatabaseType};

/// askql - ask questions of a SQL database in plain language
#[derive(Parser)]
#[command(name = "askql")]
#[command(about = "Translate natural-language questions into read-only SQL and answer them")]
#[command(version)]
struct Cli {
    /// Include schema-derived example queries in the SQL prompt
    #[arg(long)]
    few_shot: bool,

    /// Print one JSON envelope per question instead of human-readable output
    #[arg(long)]
    json: bool,

    /// Debug logging on stderr (ignored when RUST_LOG is set)
    #[arg(short, long)]
    verbose: bool,

    /// Question to answer once; omit to start the interactive loop
    question: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => return Ok(fail(cli.json, "", &err)),
    };
    tracing::debug!(?config, "resolved configuration");

    let oracle = match OpenAiOracle::new(config.oracle.api_key.clone(), config.oracle.base_url.clone()) {
        Ok(oracle) => oracle,
        Err(err) => return Ok(fail(cli.json, "", &err)),
    };

    let engine_name = config.connection.engine.as_str();
    match config.connection.engine {
        #[cfg(feature = "postgres")]
        DatabaseType::Postgres => {
            match askql::engine::postgres::PostgresEngine::new(config.connection.clone(), config.limits) {
                Ok(engine) => run(&cli, &config, engine, oracle).await,
                Err(err) => Ok(fail(cli.json, engine_name, &err)),
            }
        }
        #[cfg(feature = "sqlite")]
        DatabaseType::SQLite => {
            match askql::engine::sqlite::SqliteEngine::new(config.connection.clone(), config.limits) {
                Ok(engine) => run(&cli, &config, engine, oracle).await,
                Err(err) => Ok(fail(cli.json, engine_name, &err)),
            }
        }
        #[allow(unreachable_patterns)]
        other => {
            let err = AskqlError::config_error(format!("askql was built without {other} support"));
            Ok(fail(cli.json, engine_name, &err))
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "askql=debug" } else { "askql=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run<E>(
    cli: &Cli,
    config: &AppConfig,
    engine: E,
    oracle: OpenAiOracle,
) -> anyhow::Result<ExitCode>
where
    E: DatabaseEngine + Sync,
{
    let mut pipeline = Pipeline::new(engine, oracle, GenerationSettings::from(&config.oracle));
    if cli.few_shot || config.few_shot {
        pipeline = pipeline.with_examples(SchemaExamples);
    }

    if !cli.question.is_empty() {
        let question = cli.question.join(" ");
        let answered = answer(&pipeline, &question, cli.json).await;
        return Ok(if answered { ExitCode::SUCCESS } else { ExitCode::FAILURE });
    }

    if !cli.json {
        println!("askql: ask questions about your {} database.", pipeline.engine().database_type().dialect());
        println!("Type 'exit' or 'quit' to leave.\n");
    }

    loop {
        let read = Input::<String>::new()
            .with_prompt("Enter your question")
            .allow_empty(true)
            .interact_text()
            .map_err(|dialoguer::Error::IO(e)| e);

        match classify_input(read).context("Failed to read question")? {
            Prompted::Empty => {
                if !cli.json {
                    println!("Please enter a valid question.");
                }
            }
            Prompted::Quit => {
                if !cli.json {
                    println!("Goodbye!");
                }
                break;
            }
            Prompted::Question(question) => {
                answer(&pipeline, &question, cli.json).await;
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Run one cycle and print its outcome; returns whether it succeeded
async fn answer<E>(pipeline: &Pipeline<E, OpenAiOracle>, question: &str, json: bool) -> bool
where
    E: DatabaseEngine + Sync,
{
    let engine_name = pipeline.engine().database_type().as_str();

    let result = if json {
        pipeline.ask(question).await
    } else {
        println!("\nQuestion: {question}");
        pipeline.ask_with_progress(question, print_stage).await
    };

    match result {
        Ok(answer) if json => {
            print_json(&SuccessEnvelope::from_answer(engine_name, answer));
            true
        }
        Ok(answer) => {
            println!("\nAnswer:\n{}\n", answer.answer);
            true
        }
        Err(err) => {
            report_error(json, engine_name, &err);
            false
        }
    }
}

/// One read from the interactive prompt
#[derive(Debug, PartialEq, Eq)]
enum Prompted {
    Question(String),
    Empty,
    Quit,
}

/// Interpret a prompt read; Ctrl-C and end of input end the session
fn classify_input(read: io::Result<String>) -> io::Result<Prompted> {
    let line = match read {
        Ok(line) => line,
        Err(e) if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::UnexpectedEof) => {
            return Ok(Prompted::Quit);
        }
        Err(e) => return Err(e),
    };

    let question = line.trim();
    if question.is_empty() {
        Ok(Prompted::Empty)
    } else if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
        Ok(Prompted::Quit)
    } else {
        Ok(Prompted::Question(question.to_string()))
    }
}

fn print_stage(stage: Stage<'_>) {
    match stage {
        Stage::Introspecting => println!("\n[1/4] Retrieving database schema..."),
        Stage::GeneratingSql => println!("[2/4] Generating SQL query..."),
        Stage::SqlGenerated(sql) => println!("\nGenerated SQL:\n{sql}\n"),
        Stage::Executing => println!("[3/4] Executing query..."),
        Stage::ResultsFormatted(results) => println!("\nQuery Results:\n{results}\n"),
        Stage::Answering => println!("[4/4] Generating natural language answer..."),
    }
}

fn report_error(json: bool, engine: &str, err: &AskqlError) {
    if json {
        print_json(&ErrorEnvelope::from_error(engine, ASK_COMMAND, err));
    } else {
        eprintln!("\nError: {err}\n");
    }
}

fn fail(json: bool, engine: &str, err: &AskqlError) -> ExitCode {
    report_error(json, engine, err);
    ExitCode::FAILURE
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::error!("failed to serialize output: {e}"),
    }
}
