//! planclient - one-shot task planning client
//!
//! CLI entry point: submit one goal and print the plans the planner reports.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use planclient::channel::UnixActionChannel;
use planclient::cli::{Cli, Command, PlanArgs, get_log_path};
use planclient::client::{PlanPrinter, PlanningRequestClient};
use planclient::config::Config;
use planclient::paths;
use planclient::protocol::PlanRequest;
use planclient::service::{PlanScript, ScriptedService, cleanup_socket, create_listener_at};
use planclient::session::{CompletionPolicy, GoalState};
use planclient::{ActionChannel, PlanClientError};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Plan(args)) => {
            debug!("main: matched Plan command");
            cmd_plan(&config, args).await
        }
        Some(Command::Ping {
            socket,
            wait_timeout_ms,
        }) => {
            debug!(?socket, ?wait_timeout_ms, "main: matched Ping command");
            cmd_ping(&config, socket, wait_timeout_ms).await
        }
        Some(Command::Serve { script, socket }) => {
            debug!(?script, ?socket, "main: matched Serve command");
            cmd_serve(&config, script, socket).await
        }
        None => {
            debug!("main: no command specified, running plan with defaults");
            cmd_plan(&config, PlanArgs::default()).await
        }
    }
}

fn build_channel(config: &Config, socket: Option<PathBuf>) -> UnixActionChannel {
    let socket = socket.unwrap_or_else(|| config.channel.socket_path.clone());
    UnixActionChannel::with_socket_path(socket)
        .with_io_timeout(config.channel.io_timeout())
        .with_poll_interval(config.channel.poll_interval())
}

/// CLI override in milliseconds, where 0 means "no limit"
fn timeout_override(cli_ms: Option<u64>, configured: Option<Duration>) -> Option<Duration> {
    match cli_ms {
        Some(0) => None,
        Some(ms) => Some(Duration::from_millis(ms)),
        None => configured,
    }
}

/// Submit one goal and print every satisficing plan
async fn cmd_plan(config: &Config, args: PlanArgs) -> Result<()> {
    debug!(?args, "cmd_plan: called");
    let channel = build_channel(config, args.socket.clone());
    let wait_timeout = timeout_override(args.wait_timeout_ms, config.channel.wait_timeout());
    let plan_timeout = timeout_override(args.plan_timeout_ms, config.planning.plan_timeout());
    let policy = if args.first_plan {
        CompletionPolicy::FirstPlan
    } else {
        config.planning.completion
    };

    let domain = args
        .domain
        .or_else(|| config.planning.domain.clone())
        .unwrap_or_else(paths::default_domain_path);
    let problem = args
        .problem
        .or_else(|| config.planning.problem.clone())
        .unwrap_or_else(paths::default_problem_path);
    info!(?domain, ?problem, inline = args.inline, "cmd_plan: inputs resolved");

    let client = PlanningRequestClient::new(channel)
        .with_wait_timeout(wait_timeout)
        .with_resolution_mode(config.planning.resolution_mode);

    let submitted = if args.inline {
        let domain_text = fs::read_to_string(&domain).context(format!("Failed to read {}", domain.display()))?;
        let problem_text = fs::read_to_string(&problem).context(format!("Failed to read {}", problem.display()))?;
        let request =
            PlanRequest::inline(domain_text, problem_text).with_resolution_mode(config.planning.resolution_mode);
        client.submit_request(request).await
    } else {
        client.submit(&domain, &problem).await
    };
    let mut handle = match submitted {
        Ok(handle) => handle,
        Err(e) => {
            let hint = if e.is_retryable() {
                "the planning service may come back; try again"
            } else {
                "retrying will not help"
            };
            return Err(eyre::Report::new(e).wrap_err(format!("Failed to submit planning goal ({hint})")));
        }
    };
    debug!(goal_id = handle.goal_id(), request = ?handle.request(), "cmd_plan: goal submitted");

    let mut printer = PlanPrinter::stdout();
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let state = handle
        .spin_until(&mut printer, policy, plan_timeout, shutdown)
        .await
        .context("Planning goal failed")?;

    match state {
        GoalState::Solved { plans } => {
            info!(plans, "cmd_plan: goal solved");
            Ok(())
        }
        other => Err(eyre::eyre!("Goal ended without a plan: {}", other)),
    }
}

/// Wait for the planning service and report its version
async fn cmd_ping(config: &Config, socket: Option<PathBuf>, wait_timeout_ms: Option<u64>) -> Result<()> {
    debug!(?socket, ?wait_timeout_ms, "cmd_ping: called");
    let channel = build_channel(config, socket);
    let wait_timeout = timeout_override(wait_timeout_ms, config.channel.wait_timeout());

    match channel.wait_for_server(wait_timeout).await {
        Ok(()) => {
            let version = channel.ping().await.context("Planning service stopped answering")?;
            println!(
                "{} Planning service ready at {} (version {})",
                "✓".green(),
                channel.socket_path().display(),
                version.cyan()
            );
            Ok(())
        }
        Err(e @ PlanClientError::ChannelUnavailable { .. }) => {
            println!("{} {}", "✗".red(), e);
            if channel.socket_exists() {
                println!("  socket file exists but nothing answered; the service may be hung or gone");
            }
            Err(e.into())
        }
        Err(e) => Err(e).context("Service discovery failed"),
    }
}

/// Run the scripted planning service until Ctrl-C
async fn cmd_serve(config: &Config, script: PathBuf, socket: Option<PathBuf>) -> Result<()> {
    debug!(?script, ?socket, "cmd_serve: called");
    let script = PlanScript::load(&script)?;
    let socket = socket.unwrap_or_else(|| config.channel.socket_path.clone());

    let (listener, socket_path) = create_listener_at(&socket)?;
    println!(
        "{} Scripted planning service listening on {}",
        "✓".green(),
        socket_path.display()
    );

    let service = ScriptedService::new(script);
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let result = service.run(listener, shutdown).await;
    cleanup_socket(&socket_path);
    result
}
