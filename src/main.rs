#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # tsgrade
//!
//! Command line front end: run a JavaScript or TypeScript file in the
//! sandbox, show its erased JavaScript, grade it against a JSON list of
//! fixtures, or show recorded progress.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, bail};
use bpaf::*;
use colored::Colorize;
use dotenvy::dotenv;
use tabled::{
    Table, Tabled,
    settings::{Panel, Style},
};
use tracing::{Level, metadata::LevelFilter};
use tracing_subscriber::{fmt, fmt::writer::BoxMakeWriter, prelude::*, util::SubscriberInitExt};
use tsgrade::{
    Config, GradingHarness, JsonFileStore, Sandbox, ScoreStore, SourceUnit, TestCase, config,
    sandbox::{self, WORKER_COMMAND},
    score::record_submission, typescript,
};

/// Where scores are kept unless `--store` says otherwise.
const DEFAULT_STORE: &str = ".tsgrade/progress.json";

/// CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Run a file
    Run(PathBuf),
    /// Print a file's erased JavaScript
    Transpile(PathBuf),
    /// Grade a file against fixtures
    Grade {
        /// submission
        file:   PathBuf,
        /// JSON list of fixtures
        tests:  PathBuf,
        /// lesson to record the attempt against
        lesson: Option<String>,
        /// score store
        store:  PathBuf,
        /// seconds spent on this attempt
        time:   u64,
    },
    /// Show recorded progress
    Progress(PathBuf),
    /// Serve one sandbox request on stdin
    Worker,
}

/// Parsed command line.
#[derive(Debug, Clone)]
struct Options {
    /// overrides the configured timeout
    timeout_ms: Option<u64>,
    /// the command to run
    cmd:        Cmd,
}

/// Parse the command line arguments and return `Options`
fn options() -> Options {
    /// parses the source file name
    fn f() -> impl Parser<PathBuf> {
        positional("FILE").help("JavaScript or TypeScript source file")
    }

    /// parses the score store path
    fn s() -> impl Parser<PathBuf> {
        long("store")
            .help("JSON file scores are kept in")
            .argument::<PathBuf>("PATH")
            .fallback(PathBuf::from(DEFAULT_STORE))
    }

    let run = construct!(Cmd::Run(f()))
        .to_options()
        .command("run")
        .help("Run a file and print its output");

    let transpile = construct!(Cmd::Transpile(f()))
        .to_options()
        .command("transpile")
        .help("Print the JavaScript a TypeScript file erases to");

    let grade = {
        let file = f();
        let tests = positional::<PathBuf>("TESTS").help("JSON file with the test cases");
        let lesson = long("lesson")
            .help("Record this attempt against a lesson id")
            .argument::<String>("ID")
            .optional();
        let store = s();
        let time = long("time")
            .help("Seconds spent on this attempt")
            .argument::<u64>("SECS")
            .fallback(0);
        construct!(Cmd::Grade {
            file,
            tests,
            lesson,
            store,
            time
        })
        .to_options()
        .command("grade")
        .help("Grade a file against test cases")
    };

    let progress = construct!(Cmd::Progress(s()))
        .to_options()
        .command("progress")
        .help("Show recorded scores, XP and streaks");

    let worker = pure(Cmd::Worker)
        .to_options()
        .command(WORKER_COMMAND)
        .hide();

    let timeout_ms = long("timeout-ms")
        .help("Wall-clock limit per evaluation, in milliseconds")
        .argument::<u64>("MS")
        .optional();
    let cmd = construct!([run, transpile, grade, progress, worker]);

    construct!(Options { timeout_ms, cmd })
        .to_options()
        .descr("Sandboxed runner and autograder for JavaScript and TypeScript")
        .run()
}

/// Reads a source file.
fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))
}

/// One lesson in the progress table.
#[derive(Tabled)]
struct LessonRow {
    /// lesson id
    #[tabled(rename = "Lesson")]
    lesson:    String,
    /// attempts
    #[tabled(rename = "Attempts")]
    attempts:  u32,
    /// latest score
    #[tabled(rename = "Score")]
    score:     String,
    /// perfect mark
    #[tabled(rename = "Perfect")]
    perfect:   String,
    /// completion mark
    #[tabled(rename = "Completed")]
    completed: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let opts = options();

    // a worker's stdout carries its replies
    let writer = if matches!(opts.cmd, Cmd::Worker) {
        BoxMakeWriter::new(std::io::stderr)
    } else {
        BoxMakeWriter::new(std::io::stdout)
    };
    let fmt = fmt::layer()
        .with_writer(writer)
        .without_time()
        .with_file(false)
        .with_line_number(false);
    let filter_layer = LevelFilter::from_level(Level::INFO);
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    let mut config = Config::from_env();
    if let Some(ms) = opts.timeout_ms {
        let limits = config
            .limits()
            .clone()
            .with_timeout(Duration::from_millis(ms));
        config = config.with_limits(limits);
    }
    if config.worker().is_none() {
        let program = std::env::current_exe().context("Could not locate the tsgrade executable")?;
        config = config.with_worker(program);
    }
    config::install(config.clone());
    let sandbox = Sandbox::from_config(&config);

    match opts.cmd {
        Cmd::Run(file) => {
            let unit = SourceUnit::detect(read_source(&file)?);
            let result = sandbox.execute_async(unit.to_javascript()).await;
            if !result.output().is_empty() {
                println!("{}", result.output());
            }
            if let Some(error) = result.error() {
                bail!("{error}");
            }
        }
        Cmd::Transpile(file) => {
            println!("{}", typescript::transpile(&read_source(&file)?));
        }
        Cmd::Grade {
            file,
            tests,
            lesson,
            store,
            time,
        } => {
            let code = read_source(&file)?;
            let raw = read_source(&tests)?;
            let test_cases: Vec<TestCase> = serde_json::from_str(&raw)
                .with_context(|| format!("Could not parse test cases in {}", tests.display()))?;

            let harness = GradingHarness::builder().sandbox(sandbox).build();
            let report = harness.grade_async(&code, &test_cases).await?;

            if report.is_empty() {
                eprintln!("{}", "No test cases to grade.".yellow());
                return Ok(());
            }
            eprintln!("{}", report.table());
            for failure in report.failures() {
                eprintln!("{}\n{}\n", failure.test_case.description.bold(), failure.diff());
            }
            println!("{}", report.summary());

            if let Some(lesson) = lesson {
                let mut store = JsonFileStore::new(store);
                let (score, progress) =
                    record_submission(&mut store, &lesson, &report, time, config.score_policy())
                        .context("Could not record attempt")?;
                println!(
                    "Lesson {}: {}% ({}) after {} attempt(s){}",
                    score.lesson_id,
                    score.score,
                    score.letter_grade(),
                    score.attempts,
                    if score.perfect { ", perfect" } else { "" }
                );
                println!(
                    "Level {} with {} XP, {} to next level, {}-day streak",
                    progress.level(),
                    progress.total_xp,
                    progress.xp_to_next_level(),
                    progress.current_streak
                );
            }
        }
        Cmd::Worker => sandbox::serve_worker()?,
        Cmd::Progress(store) => {
            let store = JsonFileStore::new(store);
            let progress = store.load_progress().context("Could not load progress")?;

            let rows = progress.lesson_scores.values().map(|s| LessonRow {
                lesson:    s.lesson_id.clone(),
                attempts:  s.attempts,
                score:     format!("{}% ({})", s.score, s.letter_grade()),
                perfect:   if s.perfect { "yes" } else { "" }.to_string(),
                completed: s
                    .completed_at
                    .map(|at| at.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
            });
            println!(
                "{}",
                Table::new(rows)
                    .with(Panel::header("Lessons"))
                    .with(Panel::footer(format!(
                        "Level {} | {} XP ({} to next) | streak {} (best {}) | average {:.1}%",
                        progress.level(),
                        progress.total_xp,
                        progress.xp_to_next_level(),
                        progress.current_streak,
                        progress.longest_streak,
                        progress.average_score()
                    )))
                    .with(Style::modern())
            );
        }
    }

    Ok(())
}
