//! sonobat CLI - command-line driver for the attack-surface knowledge graph
//! engine.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use sonobat_core::datalog::EvaluatorLimits;
use sonobat_core::graph::GraphSnapshot;
use sonobat_core::ingest::{self, Tool};
use sonobat_core::query::QueryFacade;
use sonobat_core::GraphStore;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "sonobat")]
#[command(about = "Attack-surface knowledge graph engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose (debug-level) logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a tool-output file and normalize it into the graph
    Ingest {
        /// Which tool produced the file (nmap, ffuf, nuclei)
        tool: String,

        /// Path to the tool-output file
        file: String,
    },

    /// Run a raw Datalog program or a named pattern against the graph
    Query {
        /// Name of a compiled-in preset or saved rule
        #[arg(long, conflicts_with = "file")]
        name: Option<String>,

        /// Path to a file containing raw Datalog source
        #[arg(long, conflicts_with = "name")]
        file: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List extracted facts for one predicate, or every predicate
    ListFacts {
        /// Predicate name (host, service, http_endpoint, ...)
        #[arg(long)]
        predicate: Option<String>,

        /// Cap the number of facts returned
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List the compiled-in Datalog presets
    Presets,

    /// Parse a tool-output file without ingesting it, reporting validity
    Validate {
        /// Which tool produced the file (nmap, ffuf, nuclei)
        tool: String,

        /// Path to the tool-output file
        file: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "sonobat=debug,info" } else { "sonobat=info,warn" };
    sonobat_core::monitoring::init_tracing_with_config(sonobat_core::monitoring::TracingConfig {
        default_level: default_level.to_string(),
        ..sonobat_core::monitoring::TracingConfig::default()
    });
    sonobat_core::monitoring::install_recorder().context("installing metrics recorder")?;

    match cli.command {
        Commands::Ingest { tool, file } => ingest_command(tool, file)?,
        Commands::Query { name, file, format } => query_command(name, file, format)?,
        Commands::ListFacts { predicate, limit } => list_facts_command(predicate, limit)?,
        Commands::Presets => presets_command(),
        Commands::Validate { tool, file } => validate_command(tool, file)?,
    }

    Ok(())
}

fn db_path() -> PathBuf {
    std::env::var("SONOBAT_DB_PATH").unwrap_or_else(|_| "sonobat.db".to_string()).into()
}

fn load_store() -> Result<GraphStore> {
    let path = db_path();
    if !path.exists() {
        return Ok(GraphStore::new());
    }
    let contents = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let snapshot: GraphSnapshot = serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
    Ok(GraphStore::from_snapshot(snapshot))
}

fn save_store(store: &GraphStore) -> Result<()> {
    let path = db_path();
    let snapshot = store.snapshot();
    let contents = serde_json::to_string_pretty(&snapshot)?;
    fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn parse_tool(name: &str) -> Result<Tool> {
    Tool::parse(name).with_context(|| format!("unknown tool '{name}' (expected nmap, ffuf, or nuclei)"))
}

fn record_graph_summary(store: &GraphStore) {
    use sonobat_core::graph::NodeKind;
    let counts: std::collections::HashMap<&'static str, usize> = NodeKind::ALL
        .iter()
        .map(|kind| (kind.as_str(), store.find_by_kind(*kind, None).len()))
        .collect();
    sonobat_core::monitoring::record_graph_summary(&counts);
}

fn ingest_command(tool: String, file: String) -> Result<()> {
    let start = Instant::now();
    let tool = parse_tool(&tool)?;
    let contents = fs::read(&file).with_context(|| format!("reading {file}"))?;

    let store = load_store()?;
    println!("{} Ingesting {} as {}...", "→".blue(), file, tool);
    let outcome = ingest::ingest(&store, tool, &file, &contents)?;
    save_store(&store)?;
    record_graph_summary(&store);

    let c = &outcome.counts;
    println!("\n{} Ingestion Result", "═".blue().bold());
    println!("{} Artifact: {}", "▸".blue(), outcome.artifact_id);
    println!("{} Hosts created: {}", "▸".blue(), c.hosts_created);
    println!("{} Services created: {}", "▸".blue(), c.services_created);
    println!("{} Endpoints created: {}", "▸".blue(), c.endpoints_created);
    println!("{} Inputs created: {}", "▸".blue(), c.inputs_created);
    println!("{} Observations created: {}", "▸".blue(), c.observations_created);
    println!("{} Svc observations created: {}", "▸".blue(), c.svc_observations_created);
    println!("{} Vulnerabilities created: {}", "▸".blue(), c.vulnerabilities_created);
    println!("{} CVEs created: {}", "▸".blue(), c.cves_created);

    println!("\n{} Total time: {:.3}ms", "✓".green(), start.elapsed().as_secs_f64() * 1000.0);
    Ok(())
}

fn query_command(name: Option<String>, file: Option<String>, format: String) -> Result<()> {
    let store = load_store()?;
    let facade = QueryFacade::new(&store);
    let limits = EvaluatorLimits::default();

    let result = match (name, file) {
        (Some(name), None) => facade.run_named_pattern(&name, &limits)?,
        (None, Some(path)) => {
            let source = fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            facade.run_program(&source, &limits)?
        }
        _ => anyhow::bail!("pass exactly one of --name or --file"),
    };

    match format.as_str() {
        "json" => {
            let rows: Vec<serde_json::Value> = result
                .answers
                .iter()
                .map(|a| {
                    serde_json::json!({
                        "goal": a.goal.predicate.to_string(),
                        "columns": a.columns,
                        "tuples": a.tuples.iter().map(|t| t.iter().map(|v| v.to_string()).collect::<Vec<_>>()).collect::<Vec<_>>(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        _ => {
            println!("{} Query Result", "═".blue().bold());
            for answer in &result.answers {
                println!("{} {}({})", "▸".blue(), answer.goal.predicate, answer.columns.join(", "));
                for tuple in &answer.tuples {
                    let row: Vec<String> = tuple.iter().map(|v| v.to_string()).collect();
                    println!("    {}", row.join(", "));
                }
            }
            println!(
                "\n{} iterations, {} tuples, {:.3}ms",
                result.stats.iterations,
                result.stats.total_tuples,
                result.stats.elapsed_ms as f64
            );
        }
    }

    Ok(())
}

fn list_facts_command(predicate: Option<String>, limit: Option<usize>) -> Result<()> {
    let store = load_store()?;
    let facade = QueryFacade::new(&store);
    let facts = facade.list_facts(predicate.as_deref(), limit);

    for fact in &facts {
        let args: Vec<String> = fact.args.iter().map(|v| v.to_string()).collect();
        println!("{}({})", fact.predicate, args.join(", "));
    }
    println!("\n{} {} facts", "▸".blue(), facts.len());
    Ok(())
}

fn presets_command() {
    println!("{} Compiled-in presets", "═".blue().bold());
    for preset in sonobat_core::datalog::PRESETS {
        println!("{} {}", "▸".blue(), preset.name);
    }
}

fn validate_command(tool: String, file: String) -> Result<()> {
    println!("{} Validating {} as {}...", "→".blue(), file, tool);
    let tool = parse_tool(&tool)?;
    let contents = fs::read(&file).with_context(|| format!("reading {file}"))?;

    let text = std::str::from_utf8(&contents).context("file is not valid UTF-8")?;
    let result = match tool {
        Tool::Nmap => sonobat_core::ingest::nmap::parse(text),
        Tool::Ffuf => sonobat_core::ingest::ffuf::parse(text),
        Tool::Nuclei => sonobat_core::ingest::nuclei::parse(text),
    };

    match result {
        Ok(parsed) => {
            println!("{} File is valid!", "✓".green());
            println!("  Hosts: {}", parsed.hosts.len());
            println!("  Services: {}", parsed.services.len());
            println!("  Endpoints: {}", parsed.endpoints.len());
            println!("  Vulnerabilities: {}", parsed.vulnerabilities.len());
        }
        Err(e) => {
            println!("{} File is invalid:", "✗".red());
            println!("  {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
