//! Energy orchestrator entry point: CLI wiring, provider selection and batch run.

use std::path::Path;
use std::process;

use chrono::{Duration, Timelike, Utc};
use tracing::{error, info};

use energy_orchestrator::config::EngineConfig;
use energy_orchestrator::context::{ContextProvider, FileContextProvider, SimulatedContextProvider};
use energy_orchestrator::decision::engine::DecisionEngine;
use energy_orchestrator::io::export::{export_decisions_csv, export_events_csv};
use energy_orchestrator::loads::LoadRegistry;
use energy_orchestrator::runner::{RunOptions, run_batch};
use energy_orchestrator::telemetry::init_tracing;

/// Seed used by the simulated provider when none is given.
const DEFAULT_SEED: u64 = 42;

/// Parsed CLI arguments.
struct CliArgs {
    config_path: Option<String>,
    preset: Option<String>,
    loads_path: Option<String>,
    context_path: Option<String>,
    simulate: bool,
    steps: usize,
    seed: u64,
    current_source: Option<String>,
    decisions_out: Option<String>,
    events_out: Option<String>,
    json: bool,
    #[cfg(feature = "api")]
    serve: bool,
    #[cfg(feature = "api")]
    port: u16,
}

fn print_help() {
    eprintln!("energy-orchestrator — per-load power source decisions");
    eprintln!();
    eprintln!("Usage: energy-orchestrator [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <path>          Load engine config from TOML file");
    eprintln!(
        "  --preset <name>          Use a built-in preset ({})",
        EngineConfig::PRESETS.join(", ")
    );
    eprintln!("  --loads <path>           Load registry from TOML ([[loads]] tables)");
    eprintln!("  --context <path>         Replay contexts from CSV");
    eprintln!("  --simulate               Use seeded synthetic contexts");
    eprintln!("  --steps <n>              Number of decision cycles (default: 24)");
    eprintln!("  --seed <u64>             Seed for synthetic contexts (default: 42)");
    eprintln!("  --current-source <name>  Source every load starts on (default: grid)");
    eprintln!("  --decisions-out <path>   Export decisions to CSV");
    eprintln!("  --events-out <path>      Export switch events to CSV");
    eprintln!("  --json                   Print decisions as JSON lines");
    #[cfg(feature = "api")]
    {
        eprintln!("  --serve                  Start REST API server after the run");
        eprintln!("  --port <u16>             API server port (default: 3000)");
    }
    eprintln!("  --help                   Show this help message");
}

fn fail(message: &str) -> ! {
    eprintln!("error: {message}");
    process::exit(1);
}

fn value(args: &[String], i: usize, flag: &str, what: &str) -> String {
    args.get(i)
        .cloned()
        .unwrap_or_else(|| fail(&format!("{flag} requires {what}")))
}

/// Exactly one of `--simulate` and `--context` must be given.
fn check_context_source(simulate: bool, has_context: bool) -> Result<(), &'static str> {
    match (simulate, has_context) {
        (true, true) => Err("--simulate and --context are mutually exclusive"),
        (false, false) => Err("choose a context source with --context <path> or --simulate"),
        _ => Ok(()),
    }
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        config_path: None,
        preset: None,
        loads_path: None,
        context_path: None,
        simulate: false,
        steps: RunOptions::default().steps,
        seed: DEFAULT_SEED,
        current_source: None,
        decisions_out: None,
        events_out: None,
        json: false,
        #[cfg(feature = "api")]
        serve: false,
        #[cfg(feature = "api")]
        port: 3000,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--config" => {
                i += 1;
                cli.config_path = Some(value(&args, i, "--config", "a path argument"));
            }
            "--preset" => {
                i += 1;
                cli.preset = Some(value(&args, i, "--preset", "a name argument"));
            }
            "--loads" => {
                i += 1;
                cli.loads_path = Some(value(&args, i, "--loads", "a path argument"));
            }
            "--context" => {
                i += 1;
                cli.context_path = Some(value(&args, i, "--context", "a path argument"));
            }
            "--simulate" => cli.simulate = true,
            "--steps" => {
                i += 1;
                let raw = value(&args, i, "--steps", "a count argument");
                cli.steps = raw
                    .parse()
                    .unwrap_or_else(|_| fail(&format!("--steps value \"{raw}\" is not a valid count")));
            }
            "--seed" => {
                i += 1;
                let raw = value(&args, i, "--seed", "a u64 argument");
                cli.seed = raw
                    .parse()
                    .unwrap_or_else(|_| fail(&format!("--seed value \"{raw}\" is not a valid u64")));
            }
            "--current-source" => {
                i += 1;
                cli.current_source = Some(value(&args, i, "--current-source", "a source name"));
            }
            "--decisions-out" => {
                i += 1;
                cli.decisions_out = Some(value(&args, i, "--decisions-out", "a path argument"));
            }
            "--events-out" => {
                i += 1;
                cli.events_out = Some(value(&args, i, "--events-out", "a path argument"));
            }
            "--json" => cli.json = true,
            #[cfg(feature = "api")]
            "--serve" => cli.serve = true,
            #[cfg(feature = "api")]
            "--port" => {
                i += 1;
                let raw = value(&args, i, "--port", "a u16 argument");
                cli.port = raw
                    .parse()
                    .unwrap_or_else(|_| fail(&format!("--port value \"{raw}\" is not a valid u16")));
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    if let Err(message) = check_context_source(cli.simulate, cli.context_path.is_some()) {
        eprintln!("error: {message}");
        print_help();
        process::exit(1);
    }

    cli
}

fn load_config(cli: &CliArgs) -> EngineConfig {
    // --config takes priority, then --preset, then defaults
    let config = if let Some(ref path) = cli.config_path {
        EngineConfig::from_toml_file(Path::new(path))
    } else if let Some(ref name) = cli.preset {
        EngineConfig::from_preset(name)
    } else {
        Ok(EngineConfig::default())
    };
    let config = config.unwrap_or_else(|e| fail(&e.to_string()));

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }
    config
}

fn load_registry(cli: &CliArgs) -> LoadRegistry {
    let mut registry = match cli.loads_path {
        Some(ref path) => {
            LoadRegistry::from_toml_file(Path::new(path)).unwrap_or_else(|e| fail(&e.to_string()))
        }
        None => LoadRegistry::household_defaults(),
    };
    if let Some(ref source) = cli.current_source {
        let names: Vec<String> = registry.iter().map(|l| l.descriptor.name.clone()).collect();
        for name in names {
            registry.set_current_source(&name, source);
        }
    }
    registry
}

fn build_provider(cli: &CliArgs) -> Box<dyn ContextProvider> {
    match cli.context_path {
        Some(ref path) => Box::new(
            FileContextProvider::open(Path::new(path)).unwrap_or_else(|e| fail(&e.to_string())),
        ),
        // parse_args guarantees --simulate here
        None => {
            // Start at the top of the current hour so each run covers whole hours.
            let now = Utc::now();
            let start = now
                - Duration::minutes(i64::from(now.minute()))
                - Duration::seconds(i64::from(now.second()))
                - Duration::nanoseconds(i64::from(now.nanosecond()));
            Box::new(SimulatedContextProvider::new(cli.seed, start))
        }
    }
}

fn main() {
    init_tracing();
    let cli = parse_args();

    let config = load_config(&cli);
    let mut registry = load_registry(&cli);
    let mut provider = build_provider(&cli);
    let engine = DecisionEngine::new(&config);
    let options = RunOptions {
        steps: cli.steps,
        ..RunOptions::default()
    };

    let report = match run_batch(
        &engine,
        provider.as_mut(),
        &mut registry,
        &config.preferences,
        &options,
    ) {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "decision run failed");
            process::exit(1);
        }
    };

    for d in &report.decisions {
        if cli.json {
            match serde_json::to_string(d) {
                Ok(line) => println!("{line}"),
                Err(e) => fail(&format!("failed to encode decision: {e}")),
            }
        } else {
            println!("{d}");
        }
    }
    if !cli.json {
        println!("\n{}", report.summary);
    }

    if let Some(ref path) = cli.decisions_out {
        if let Err(e) = export_decisions_csv(&report.decisions, Path::new(path)) {
            fail(&format!("failed to write decisions CSV: {e}"));
        }
        info!(%path, "decisions written");
    }
    if let Some(ref path) = cli.events_out {
        if let Err(e) = export_events_csv(&report.events, Path::new(path)) {
            fail(&format!("failed to write events CSV: {e}"));
        }
        info!(%path, "switch events written");
    }

    #[cfg(feature = "api")]
    if cli.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;

        let state = Arc::new(energy_orchestrator::api::AppState {
            engine,
            preferences: config.preferences,
            config,
            summary: report.summary,
            decisions: report.decisions,
            events: report.events,
        });
        let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
        let rt = tokio::runtime::Runtime::new()
            .unwrap_or_else(|e| fail(&format!("failed to create tokio runtime: {e}")));
        if let Err(e) = rt.block_on(energy_orchestrator::api::serve(state, addr)) {
            fail(&format!("server error: {e}"));
        }
    }
}
