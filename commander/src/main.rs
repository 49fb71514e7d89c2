//! Command-line front end for the camera command orchestrator.
//!
//! Reads configuration from `.commander/config.toml` (or `--config`), builds
//! the camera registry, and routes messages through the pipeline.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commander::agents::handler::HandlerDispatcher;
use commander::devices::camera_registry;
use commander::io::completion::CommandCompleter;
use commander::io::config::{CommanderConfig, DEFAULT_CONFIG_PATH, load_config, write_config};
use commander::logging;
use commander::pipeline::Pipeline;

#[derive(Parser)]
#[command(
    name = "commander",
    version,
    about = "Turn natural-language camera commands into action sequences"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the default configuration file if missing.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
    /// List registered handlers and the capabilities they own.
    Capabilities,
    /// Print the interpreted intent for a message.
    Interpret {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Interpret and plan a message without executing it.
    Plan {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Handle a message end to end.
    Run {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Handle messages read line by line from stdin until EOF or `exit`.
    Chat,
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Capabilities => cmd_capabilities(&cli.config),
        Command::Interpret { text } => cmd_interpret(&cli.config, &text.join(" ")),
        Command::Plan { text } => cmd_plan(&cli.config, &text.join(" ")),
        Command::Run { text } => cmd_run(&cli.config, &text.join(" ")),
        Command::Chat => cmd_chat(&cli.config),
    }
}

fn load_pipeline(config_path: &Path) -> Result<Pipeline> {
    let cfg = load_config(config_path)?;
    let registry = camera_registry().context("build camera registry")?;
    Ok(Pipeline::new(registry, cfg))
}

fn completer_for(pipeline: &Pipeline) -> CommandCompleter {
    CommandCompleter::new(pipeline.config().completion.clone())
}

fn cmd_init(config_path: &Path, force: bool) -> Result<()> {
    if !force && config_path.exists() {
        println!("{} already exists", config_path.display());
        return Ok(());
    }
    write_config(config_path, &CommanderConfig::default())
        .with_context(|| format!("write {}", config_path.display()))?;
    println!("wrote {}", config_path.display());
    Ok(())
}

fn cmd_capabilities(config_path: &Path) -> Result<()> {
    let pipeline = load_pipeline(config_path)?;
    let registry = pipeline.registry();
    for handler in registry.handler_names() {
        println!("{handler}");
        for capability in registry.capabilities_of(handler) {
            println!("  {}: {}", capability.name, capability.description);
        }
    }
    Ok(())
}

fn cmd_interpret(config_path: &Path, text: &str) -> Result<()> {
    let pipeline = load_pipeline(config_path)?;
    let intent = pipeline.interpret(&completer_for(&pipeline), text);
    println!(
        "TYPE: {}",
        intent.kind.map_or("UNKNOWN", |kind| kind.as_str())
    );
    println!("ITERATIONS: {}", intent.iterations);
    println!("QUERY: {}", intent.normalized_command.as_deref().unwrap_or(""));
    Ok(())
}

fn cmd_plan(config_path: &Path, text: &str) -> Result<()> {
    let pipeline = load_pipeline(config_path)?;
    let completer = completer_for(&pipeline);
    let intent = pipeline.interpret(&completer, text);
    if intent.is_conversational() {
        println!(
            "not a task ({}), nothing to plan",
            intent.kind.map_or("UNKNOWN", |kind| kind.as_str())
        );
        return Ok(());
    }

    let command = intent.planning_command(text);
    let plan = pipeline.plan(&completer, command);
    if plan.is_empty() {
        println!("No agents needed");
        return Ok(());
    }
    println!("iterations: {}", intent.iterations);
    for (idx, (handler, instruction)) in plan.steps().enumerate() {
        println!("{}. {handler}: {instruction}", idx + 1);
    }
    Ok(())
}

fn cmd_run(config_path: &Path, text: &str) -> Result<()> {
    let pipeline = load_pipeline(config_path)?;
    let completer = completer_for(&pipeline);
    let dispatcher = HandlerDispatcher::new(pipeline.registry(), &completer);
    let reply = pipeline.process_message(&completer, &dispatcher, text);
    for line in reply.render() {
        println!("{line}");
    }
    Ok(())
}

fn cmd_chat(config_path: &Path) -> Result<()> {
    let pipeline = load_pipeline(config_path)?;
    let completer = completer_for(&pipeline);
    let dispatcher = HandlerDispatcher::new(pipeline.registry(), &completer);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "> ").context("write prompt")?;
        stdout.flush().context("flush prompt")?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).context("read stdin")? == 0 {
            break;
        }
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if matches!(message, "exit" | "quit") {
            break;
        }
        for reply_line in pipeline.process_message(&completer, &dispatcher, message).render() {
            writeln!(stdout, "{reply_line}").context("write reply")?;
        }
    }
    Ok(())
}
