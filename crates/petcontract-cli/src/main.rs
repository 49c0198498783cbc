//! petcontract CLI - contract tests for the pet store API

mod storage;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use petcontract_core::{Config, SchemaRegistry, SuiteReport, Verdict, VerdictPolicy, VerdictStatus};
use petcontract_runner::{HttpClient, Suite};

const CONFIG_FILE: &str = ".petcontract.toml";

#[derive(Parser)]
#[command(name = "petcontract")]
#[command(about = "Contract and workflow tests for the pet store API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "terminal")]
    output: OutputFormat,

    /// Verbose output (debug logs)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the contract suite against the API
    Run {
        /// Config file (default: .petcontract.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override base URL (wins over config and PETCONTRACT_BASE_URL)
        #[arg(long)]
        base_url: Option<String>,

        /// Only run cases whose id contains this text
        #[arg(short, long)]
        filter: Option<String>,

        /// Stop after the first failed case
        #[arg(long)]
        stop_on_failure: bool,

        /// Treat a run where no case matched as passing
        #[arg(long)]
        allow_empty: bool,

        /// Output directory for reports
        #[arg(short, long, default_value = ".petcontract")]
        output_dir: PathBuf,
    },

    /// List the expanded cases without sending requests
    List {
        /// Config file (default: .petcontract.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Only list cases whose id contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Initialize config file
    Init,

    /// Print every registered contract as JSON Schema
    Contracts {
        /// Config file (default: .petcontract.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Export JSON Schema for the run report
    Schema,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Terminal,
    Json,
    Silent,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(if cli.verbose { "debug" } else { &cli.log_level });

    match run(cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(3)
        }
    }
}

/// Install the fmt subscriber on stderr; `RUST_LOG` wins over `level`.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "petcontract={level},petcontract_core={level},petcontract_runner={level}"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    let config = config.with_env_overrides();
    tracing::debug!(
        base_url = %config.base_url,
        timeout_secs = config.timeout_secs,
        "config loaded"
    );
    Ok(config)
}

fn load_registry(config: &Config) -> Result<SchemaRegistry> {
    let registry = match &config.contracts {
        Some(path) => SchemaRegistry::from_file(path)
            .with_context(|| format!("loading contracts from {}", path.display()))?,
        None => SchemaRegistry::builtin()?,
    };
    Ok(registry)
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Run {
            config,
            base_url,
            filter,
            stop_on_failure,
            allow_empty,
            output_dir,
        } => {
            let mut cfg = load_config(config.as_deref())?;
            if let Some(base_url) = base_url {
                cfg.base_url = base_url;
            }
            let registry = load_registry(&cfg)?;
            let client = HttpClient::from_config(&cfg)?;
            let suite = Suite::from_config(&cfg.suite)
                .with_filter(filter.as_deref())
                .with_stop_on_failure(stop_on_failure);

            if cli.output == OutputFormat::Terminal {
                eprintln!("Config:");
                eprintln!("  base_url: {}", cfg.base_url);
                if !cfg.headers.is_empty() {
                    eprintln!("  headers:  {} configured", cfg.headers.len());
                }
                if let Some(contracts) = &cfg.contracts {
                    eprintln!("  contracts: {}", contracts.display());
                }
                eprintln!("  cases:    {}", suite.cases().len());
                eprintln!();
            }

            let report = suite.run(&client, &registry)?;
            let verdict = VerdictPolicy { allow_empty }.verdict(&report.cases);

            match cli.output {
                OutputFormat::Terminal => print_terminal(&report, &verdict),
                OutputFormat::Json => {
                    let json_output = serde_json::json!({
                        "verdict": {
                            "status": verdict.status.to_string(),
                            "exit_code": verdict.exit_code,
                            "reason": verdict.reason,
                        },
                        "report": report,
                    });
                    println!("{}", serde_json::to_string_pretty(&json_output)?);
                }
                OutputFormat::Silent => {}
            }

            let data = storage::ReportData {
                config: &cfg,
                report: &report,
                verdict: &verdict,
            };
            match storage::save_report(&output_dir, &data) {
                Ok(path) => {
                    if cli.output != OutputFormat::Silent {
                        eprintln!("Report saved: {}", path.display());
                    }
                }
                Err(e) => eprintln!("Warning: failed to save report: {e}"),
            }

            Ok(verdict.exit_code)
        }

        Commands::List { config, filter } => {
            let cfg = load_config(config.as_deref())?;
            let suite = Suite::from_config(&cfg.suite).with_filter(filter.as_deref());

            match cli.output {
                OutputFormat::Terminal => {
                    for case in suite.cases() {
                        println!("{:<32} {} {}", case.id, case.kind.method(), case.kind.endpoint());
                    }
                    println!("\n{} cases", suite.cases().len());
                }
                OutputFormat::Json => {
                    let cases: Vec<serde_json::Value> = suite
                        .cases()
                        .iter()
                        .map(|c| {
                            serde_json::json!({
                                "id": c.id,
                                "family": c.family(),
                                "method": c.kind.method(),
                                "endpoint": c.kind.endpoint(),
                                "endpoint_template": c.kind.endpoint_template(),
                                "expected_status": c.kind.expected_status(),
                            })
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&cases)?);
                }
                OutputFormat::Silent => {}
            }
            Ok(0)
        }

        Commands::Init => {
            if Path::new(CONFIG_FILE).exists() {
                eprintln!("{CONFIG_FILE} already exists");
                return Ok(1);
            }

            std::fs::write(CONFIG_FILE, Config::example())?;
            println!("Created {CONFIG_FILE}");
            println!("\nEdit the file to configure:");
            println!("  - base_url: pet store to test");
            println!("  - headers: auth tokens, API keys");
            println!("  - [suite]: pet ids, statuses and expected messages");
            Ok(0)
        }

        Commands::Contracts { config } => {
            let cfg = load_config(config.as_deref())?;
            let registry = load_registry(&cfg)?;
            let schemas: serde_json::Map<String, serde_json::Value> = registry
                .contracts()
                .map(|c| (c.name.clone(), c.to_json_schema()))
                .collect();
            println!("{}", serde_json::to_string_pretty(&schemas)?);
            Ok(0)
        }

        Commands::Schema => {
            println!("{}", petcontract_core::report::generate_schema());
            Ok(0)
        }
    }
}

fn print_terminal(report: &SuiteReport, verdict: &Verdict) {
    for case in &report.cases {
        let icon = if case.passed() { "PASS" } else { "FAIL" };
        match &case.workflow_state {
            Some(state) => println!("{icon}  {} ({state}, {} ms)", case.id, case.duration_ms),
            None => println!("{icon}  {} ({} ms)", case.id, case.duration_ms),
        }
        for failure in &case.failures {
            println!("      {failure}");
        }
    }

    let icon = if verdict.status == VerdictStatus::Pass {
        "PASS"
    } else {
        "FAIL"
    };

    let counts = report.failure_counts();
    if !counts.is_empty() {
        println!("\nFailures by type:");
        for (failure_type, count) in counts {
            println!(
                "  {:<20} {count:>3}  {}",
                failure_type.as_str(),
                failure_type.description()
            );
        }
    }

    println!("\n{icon}: {}", verdict.reason);
    println!(
        "  Cases: {} total, {} passed, {} failed ({:.2}s)",
        report.total, report.passed, report.failed, report.duration_secs
    );
    println!("  Run id: {}", report.run_id);
    println!("  Exit code: {}", verdict.exit_code);
}
