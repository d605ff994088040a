//! Benchmark context strategies against a scenario, or inspect chunking.
//!
//! Reads the API key from the `OPENROUTER_KEY` environment variable.
//!
//! # Examples
//!
//! ```sh
//! # All three strategies on the sample scenario
//! ctxbench run --scenario fixtures/detective_investigation.json
//!
//! # Only Compress, with a lower threshold and incremental summaries
//! ctxbench run --scenario fixtures/detective_investigation.json \
//!   --strategies compress --max-tokens 300 --incremental-summary
//!
//! # Offline grading and sequential strategies
//! ctxbench run --scenario s.json --judge substring --sequential
//!
//! # Chunk a document and search it
//! ctxbench chunk --input notes.txt report.txt --chunk-size 200 --overlap 20 --query "crowbar"
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use ctxbench::api::{ModelClient, RetryConfig, RetryingModel};
use ctxbench::bench::{
    Benchmark, CancellationFlag, JudgeFallback, JudgeKind, LoggingHandler, Scenario,
};
use ctxbench::config::{BenchConfig, ChunkerConfig, DEFAULT_MODEL};
use ctxbench::context::{
    Chunker, EmbeddingScorer, HashingEmbedder, KeywordScorer, RelevanceScorer, RetrievalIndex,
    SourceDocument, SummaryMode, TiktokenTokenizer, Tokenizer,
};
use ctxbench::error::{ContextError, ContextResult};
use ctxbench::strategy::{StrategyDeps, StrategyKind};
use ctxbench::OpenRouterClient;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ctxbench", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every strategy over a scenario and print per-strategy results
    Run(RunArgs),
    /// Split a text file into token windows and optionally search them
    Chunk(ChunkArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum ScorerArg {
    /// Keyword overlap with exact-phrase bonus
    Keyword,
    /// Cosine similarity over hashed term vectors
    Hashing,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Scenario JSON file
    #[arg(long)]
    scenario: PathBuf,

    /// Model used for answers, summaries, extraction and judging
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Comma-separated strategies to evaluate, in result order
    #[arg(long, value_delimiter = ',', default_value = "select,compress,write")]
    strategies: Vec<String>,

    /// History blocks kept by Select
    #[arg(long, default_value_t = 3)]
    top_k: usize,

    /// Raw-history token threshold for Compress
    #[arg(long, default_value_t = 2000)]
    max_tokens: usize,

    /// Facts retrieved by Write
    #[arg(long, default_value_t = 10)]
    top_n: usize,

    /// Merge new steps into the existing summary instead of resummarizing
    #[arg(long)]
    incremental_summary: bool,

    /// Relevance scorer for Select and Write
    #[arg(long, value_enum, default_value_t = ScorerArg::Keyword)]
    scorer: ScorerArg,

    /// Answer judge: llm or substring
    #[arg(long, default_value = "llm")]
    judge: String,

    /// On LLM judge failure: propagate or substring
    #[arg(long, default_value = "propagate")]
    judge_fallback: String,

    /// Per-call model timeout in seconds (0 disables)
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,

    /// Evaluate strategies one after another within a step
    #[arg(long)]
    sequential: bool,

    /// Retries for rate-limited or unavailable model calls
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// Directory for experiment_results_<timestamp>.json
    #[arg(long, default_value = "results")]
    output: PathBuf,
}

#[derive(clap::Args)]
struct ChunkArgs {
    /// Text files to chunk, one source document each
    #[arg(long, required = true, num_args = 1..)]
    input: Vec<PathBuf>,

    /// Prepend each file name as the document title
    #[arg(long)]
    titled: bool,

    #[arg(long, default_value_t = 500)]
    chunk_size: usize,

    #[arg(long, default_value_t = 50)]
    overlap: usize,

    /// Rank chunks against this query
    #[arg(long)]
    query: Option<String>,

    /// Chunks shown for --query
    #[arg(long, default_value_t = 3)]
    top_k: usize,
}

fn build_scorer(arg: ScorerArg) -> Arc<dyn RelevanceScorer> {
    match arg {
        ScorerArg::Keyword => Arc::new(KeywordScorer::default()),
        ScorerArg::Hashing => Arc::new(EmbeddingScorer::new(HashingEmbedder::default())),
    }
}

fn build_config(args: &RunArgs) -> ContextResult<BenchConfig> {
    let strategies = args
        .strategies
        .iter()
        .map(|s| s.parse::<StrategyKind>())
        .collect::<ContextResult<Vec<_>>>()?;
    let judge: JudgeKind = args.judge.parse()?;
    let fallback: JudgeFallback = args.judge_fallback.parse()?;
    let mode = if args.incremental_summary {
        SummaryMode::Incremental
    } else {
        SummaryMode::FromScratch
    };

    let config = BenchConfig::new(&args.model)
        .with_strategies(strategies)
        .with_top_k(args.top_k)
        .with_compress_threshold(args.max_tokens)
        .with_summary_mode(mode)
        .with_top_n(args.top_n)
        .with_judge(judge, fallback)
        .with_model_timeout(Duration::from_secs(args.timeout_secs))
        .with_parallel_strategies(!args.sequential);
    config.validate()?;
    Ok(config)
}

async fn run(args: RunArgs) -> ContextResult<()> {
    let config = build_config(&args)?;
    let scenario = Scenario::load(&args.scenario)?;

    let api_key = std::env::var("OPENROUTER_KEY")
        .map_err(|_| ContextError::Configuration("OPENROUTER_KEY not set".into()))?;
    let mut model: Arc<dyn ModelClient> = Arc::new(OpenRouterClient::new(api_key, &args.model)?);
    if args.retries > 0 {
        model = Arc::new(RetryingModel::new(model, RetryConfig::with_retries(args.retries)));
    }

    let deps = StrategyDeps {
        model,
        scorer: build_scorer(args.scorer),
        tokenizer: Arc::new(TiktokenTokenizer::cl100k()?),
        model_timeout: config.model_timeout,
    };

    info!(
        "{}: {} steps, model {}",
        scenario.scenario_type,
        scenario.num_steps(),
        config.model
    );
    if config.judge_fallback == JudgeFallback::Substring {
        warn!("judge fallback is substring: failed LLM verdicts are graded by containment");
    }

    let cancel = CancellationFlag::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling in-flight calls (press Ctrl-C again to exit)");
            on_signal.cancel();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted");
            process::exit(130);
        }
    });

    let mut bench = Benchmark::new(scenario, config, deps)?;
    let log = bench.run(&LoggingHandler, &cancel).await?;

    println!("{}", log.summary_table());
    let path = log.save(&args.output)?;
    println!("Results saved to {}", path.display());
    Ok(())
}

fn chunk(args: ChunkArgs) -> ContextResult<()> {
    let mut documents = Vec::with_capacity(args.input.len());
    for path in &args.input {
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("doc{}", documents.len()));
        let title = args
            .titled
            .then(|| path.file_name().map(|s| s.to_string_lossy().to_string()))
            .flatten();
        documents.push(SourceDocument {
            id,
            title,
            content: std::fs::read_to_string(path)?,
        });
    }

    let tokenizer: Arc<dyn Tokenizer> = Arc::new(TiktokenTokenizer::cl100k()?);
    let chunker = Chunker::new(
        tokenizer,
        ChunkerConfig {
            chunk_size: args.chunk_size,
            overlap: args.overlap,
        },
    )?;
    let chunks = chunker.chunk_documents(&documents)?;

    for c in &chunks {
        let preview: String = c.text.chars().take(60).collect();
        println!(
            "{:<24} tokens {:>6}..{:<6} ({:>4})  {}",
            c.id,
            c.start_token,
            c.end_token,
            c.token_count,
            preview.replace('\n', " ")
        );
    }

    if let Some(query) = &args.query {
        let mut index = RetrievalIndex::new(Arc::new(KeywordScorer::default()));
        index.add(chunks);
        println!("\nTop {} for {query:?}:", args.top_k);
        for hit in index.search(query, args.top_k) {
            println!("  {:<24} score {:.2}", hit.item.id, hit.score);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ctxbench=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run(args) => run(args).await,
        Command::Chunk(args) => chunk(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
