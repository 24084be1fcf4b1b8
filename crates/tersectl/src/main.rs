//! Terse - single-sentence answer CLI.
//!
//! Assembles a prompt from a question and optional evidence (flat file or
//! SQLite rows), drives the generation pipeline, and prints exactly one
//! normalized sentence. The engine backend is pluggable; the built-in
//! `--replay` backend replays a piece script so the pipeline can be
//! exercised without a model.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use terse_core::{
    run, EvidenceSource, GenerationConfig, RowIdList, RunOptions, ScriptedEngine, TerseError,
};

#[derive(Parser)]
#[command(name = "tersectl")]
#[command(about = "Single-sentence answer generator", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question and print a single-sentence answer
    Ask {
        /// The question to answer
        question: String,

        /// Subject term; names the answer template and anchors salvage
        #[arg(long)]
        subject: Option<String>,

        /// Evidence file (takes priority over the store flags)
        #[arg(long)]
        evidence_file: Option<PathBuf>,

        /// SQLite evidence store
        #[arg(long)]
        db: Option<PathBuf>,

        /// Evidence table name
        #[arg(long, default_value = "chunks")]
        table: String,

        /// Evidence content column
        #[arg(long, default_value = "content")]
        column: String,

        /// Row identifiers to fetch, delimited by comma/semicolon/space
        #[arg(long, default_value = "")]
        ids: String,

        /// Replay script: one detokenized piece per line ("\n" escapes)
        #[arg(long)]
        replay: PathBuf,

        /// Optional TOML generation config
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        max_tokens: Option<u32>,

        #[arg(long)]
        ctx: Option<u32>,

        #[arg(long)]
        batch: Option<u32>,

        #[arg(long)]
        temp: Option<f32>,

        #[arg(long)]
        top_k: Option<u32>,

        #[arg(long)]
        top_p: Option<f32>,

        #[arg(long)]
        seed: Option<u64>,

        /// Dump the fully rendered prompt to stderr before generation
        #[arg(long)]
        debug_prompt: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match dispatch(cli.command) {
        Ok(answer) => {
            println!("{}", answer);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            let code = e
                .downcast_ref::<TerseError>()
                .map(|t| t.code())
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}

fn dispatch(command: Commands) -> Result<String> {
    match command {
        Commands::Ask {
            question,
            subject,
            evidence_file,
            db,
            table,
            column,
            ids,
            replay,
            config,
            max_tokens,
            ctx,
            batch,
            temp,
            top_k,
            top_p,
            seed,
            debug_prompt,
        } => {
            let mut cfg = match config {
                Some(path) => GenerationConfig::load(&path)?,
                None => GenerationConfig::default(),
            };
            if let Some(v) = max_tokens {
                cfg.max_tokens = v;
            }
            if let Some(v) = ctx {
                cfg.ctx_size = v;
            }
            if let Some(v) = batch {
                cfg.batch_size = v;
            }
            if let Some(v) = temp {
                cfg.temperature = v;
            }
            if let Some(v) = top_k {
                cfg.top_k = v;
            }
            if let Some(v) = top_p {
                cfg.top_p = v;
            }
            if let Some(v) = seed {
                cfg.seed = v;
            }

            let source = evidence_source(evidence_file, db, &table, &column, &ids)?;
            let mut engine = load_replay_engine(&replay)?;

            let opts = RunOptions {
                config: cfg,
                subject,
                debug_prompt,
            };

            let answer = run(&mut engine, &question, source.as_ref(), &opts)?;
            Ok(answer)
        }
    }
}

/// File mode takes priority when both a file and a store are given.
fn evidence_source(
    evidence_file: Option<PathBuf>,
    db: Option<PathBuf>,
    table: &str,
    column: &str,
    ids: &str,
) -> Result<Option<EvidenceSource>> {
    if let Some(path) = evidence_file {
        return Ok(Some(EvidenceSource::File(path)));
    }
    if let Some(db_path) = db {
        let ids: RowIdList = ids.parse()?;
        return Ok(Some(EvidenceSource::Store {
            db_path,
            table: table.to_string(),
            column: column.to_string(),
            ids,
        }));
    }
    Ok(None)
}

/// Build the replay engine from a script file: one piece per line, with
/// literal "\n" unescaped so stop markers can appear in pieces.
fn load_replay_engine(path: &PathBuf) -> Result<ScriptedEngine> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        TerseError::EngineUnavailable(format!("replay script {}: {}", path.display(), e))
    })?;
    let pieces: Vec<String> = raw
        .lines()
        .map(|line| line.replace("\\n", "\n"))
        .collect();
    Ok(ScriptedEngine::new(pieces))
}
