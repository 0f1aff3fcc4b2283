use anyhow::{Context, Result};
use clap::Parser;
use question_templates::config::Config;
use question_templates::diagnostics::{CollectingSink, DiagnosticsSink, MatchEvent, TracingSink};
use question_templates::{Token, build_aggregator};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Match a question against the query template catalog and print ranked queries
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (default: $QUESTION_TEMPLATES_CONFIG or question_templates.toml)
    #[arg(long)]
    config: Option<String>,

    /// Catalog JSON file, overrides the configured path
    #[arg(long)]
    catalog: Option<String>,

    /// JSON file holding an analyzed token array
    #[arg(long, conflicts_with = "question")]
    tokens: Option<String>,

    /// Only print the best N templates (0 for all)
    #[arg(long, default_value = "0")]
    top: usize,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,

    /// Include match diagnostics in the output
    #[arg(long)]
    diagnostics: bool,

    /// Plain question text, tokenized on whitespace
    question: Vec<String>,
}

/// Records events for output while still logging them.
struct TeeSink {
    collect: CollectingSink,
    log: TracingSink,
}

impl DiagnosticsSink for TeeSink {
    fn record(&self, event: &MatchEvent) {
        self.log.record(event);
        self.collect.record(event);
    }
}

fn main() -> Result<()> {
    question_templates::load_env();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;
    if let Some(catalog) = &args.catalog {
        config.catalog.path = catalog.clone();
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.runtime.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let tokens: Vec<Token> = match &args.tokens {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read tokens from {}", path))?;
            serde_json::from_str(&raw).with_context(|| format!("Invalid token JSON in {}", path))?
        }
        None => Token::from_plain_text(&args.question.join(" ")),
    };
    if tokens.is_empty() {
        anyhow::bail!("No question given: pass question text or --tokens <file>");
    }

    let sink = Arc::new(TeeSink {
        collect: CollectingSink::new(),
        log: TracingSink,
    });
    let aggregator = build_aggregator(&config)?.with_sink(sink.clone());
    tracing::info!("Catalog holds {} templates", aggregator.catalog().len());

    let ranked = aggregator.match_question(&tokens);
    let limit = if args.top == 0 { ranked.len() } else { args.top };
    let entries: Vec<_> = ranked.iter().take(limit).collect();

    if args.json {
        let mut out = serde_json::json!({ "results": entries });
        if args.diagnostics {
            out["diagnostics"] = serde_json::to_value(sink.collect.events())?;
        }
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No matching templates.");
    }
    for (rank, entry) in entries.iter().enumerate() {
        println!(
            "#{} key={:.4} score={:.4} template={} example=\"{}\"",
            rank + 1,
            entry.key.value,
            entry.key.score,
            entry.key.position,
            entry.example
        );
        for query in &entry.candidates {
            println!("    {}", query.query);
        }
    }
    if args.diagnostics {
        for event in sink.collect.events() {
            println!("{}", serde_json::to_string(&event)?);
        }
    }
    Ok(())
}
