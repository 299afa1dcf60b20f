//! CLI entry point for MaxLab

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tracing::{error, info, warn};

use maxlab_agent::context::config_failure_banner;
use maxlab_agent::{BridgeReply, ChatBridge, NotebookChatAgent, Reply};
use maxlab_core::config::{Config, ConfigLoader};
use maxlab_core::history::{HistoryStore, JsonHistoryFile};
use maxlab_core::logging::init_logging;
use maxlab_core::utils::expand_home;
use maxlab_tools::{builtin_plugins, find_plugin, Tool};

#[derive(Parser)]
#[command(name = "maxlab")]
#[command(about = "Notebook chat assistant for financial analysis and data science")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message and print the reply
    Chat {
        /// Message to send
        message: String,
        /// Strip Markdown from the reply
        #[arg(long)]
        plain: bool,
    },
    /// Interactive chat with persisted history
    Repl,
    /// Serve the notebook comm channel over stdin/stdout
    Bridge,
    /// Show backend and plugin status
    Status,
    /// Ask for a review of Python code
    Analyze {
        /// File holding the code
        #[arg(short, long, conflicts_with = "code")]
        file: Option<PathBuf>,
        /// Code passed inline
        #[arg(long)]
        code: Option<String>,
        /// Extra context for the review
        #[arg(long)]
        context: Option<String>,
    },
    /// Ask for notebook-wide improvements
    Improve {
        /// Notebook summary
        summary: String,
    },
    /// Inspect or run plugin functions
    Plugin {
        #[command(subcommand)]
        command: PluginCommands,
    },
    /// Manage the stored chat history
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
}

#[derive(Subcommand)]
enum PluginCommands {
    /// List plugins and their functions
    List,
    /// Call a plugin function directly
    Call {
        /// Plugin name (e.g. 'finance')
        plugin: String,
        /// Function name (e.g. 'categorize_transaction')
        function: String,
        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// Print the stored turns
    Show,
    /// Remove every stored turn
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };
    let config = config_loader.load()?;
    let _guard = init_logging(&config.logging);

    match cli.command {
        Commands::Chat { message, plain } => {
            info!("Processing one-shot message");
            run_chat(&config, &message, plain).await?;
        }
        Commands::Repl => {
            info!("Starting interactive chat");
            run_repl(&config).await?;
        }
        Commands::Bridge => {
            info!("Starting comm bridge on stdio");
            run_bridge(&config).await?;
        }
        Commands::Status => run_status(&config_loader, &config).await?,
        Commands::Analyze {
            file,
            code,
            context,
        } => {
            let code = match (file, code) {
                (Some(path), _) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, Some(code)) => code,
                (None, None) => anyhow::bail!("Provide --file or --code"),
            };
            let agent = build_agent(&config).await?;
            let reply = with_spinner(agent.analyze_code(&code, context.as_deref())).await;
            print_reply(&reply);
            agent.cleanup().await;
        }
        Commands::Improve { summary } => {
            let agent = build_agent(&config).await?;
            let reply = with_spinner(agent.suggest_notebook_improvements(&summary)).await;
            print_reply(&reply);
            agent.cleanup().await;
        }
        Commands::Plugin { command } => match command {
            PluginCommands::List => run_plugin_list(),
            PluginCommands::Call {
                plugin,
                function,
                args,
            } => run_plugin_call(&plugin, &function, &args).await?,
        },
        Commands::History { command } => match command {
            HistoryCommands::Show => run_history_show(&config)?,
            HistoryCommands::Clear => run_history_clear(&config)?,
        },
    }

    Ok(())
}

fn history_path(config: &Config) -> PathBuf {
    expand_home(&config.history.file)
}

async fn build_agent(config: &Config) -> Result<NotebookChatAgent> {
    match NotebookChatAgent::from_config(config).await {
        Ok(agent) => Ok(agent),
        Err(e) => {
            error!("Failed to build agent: {}", e);
            eprintln!("{}", config_failure_banner(&e.to_string()));
            Err(e.into())
        }
    }
}

async fn with_spinner<F: std::future::Future<Output = Reply>>(future: F) -> Reply {
    let spinner = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(template);
    }
    spinner.set_message("Thinking...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    let reply = future.await;
    spinner.finish_and_clear();
    reply
}

fn print_reply(reply: &Reply) {
    if reply.starts_with('❌') {
        println!("{}", style(reply.as_str()).red());
    } else {
        println!("{}", reply);
    }
}

async fn run_chat(config: &Config, message: &str, plain: bool) -> Result<()> {
    let agent = build_agent(config).await?;
    let reply = with_spinner(agent.chat(message, !plain)).await;
    print_reply(&reply);
    agent.cleanup().await;
    Ok(())
}

async fn run_repl(config: &Config) -> Result<()> {
    let agent = Arc::new(build_agent(config).await?);
    let mut bridge = ChatBridge::open(agent.clone(), history_path(config)).await;

    println!("{}\n", agent.status_banner().await);
    println!(
        "{}",
        style("Type /clear to reset the conversation, /exit to quit.").dim()
    );

    loop {
        let line: String = Input::new()
            .with_prompt(style("You").bold().to_string())
            .allow_empty(true)
            .interact_text()?;
        let line = line.trim();

        let message = match line {
            "" => continue,
            "/exit" | "/quit" => break,
            "/clear" => serde_json::json!({"type": "clear_history"}),
            _ => serde_json::json!({"type": "chat", "content": line}),
        };

        let spinner = ProgressBar::new_spinner();
        spinner.set_message("Thinking...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        let reply = bridge.handle_message(&message).await;
        spinner.finish_and_clear();

        match reply {
            BridgeReply::Response { content, .. } => {
                println!("\n{}", style(agent_label(&agent)).bold().cyan());
                if content.starts_with('❌') {
                    println!("{}\n", style(content).red());
                } else {
                    println!("{}\n", content);
                }
            }
            BridgeReply::Cleared => println!("{}", style("History cleared.").green()),
            other => warn!("Unexpected bridge reply: {:?}", other),
        }
    }

    agent.cleanup().await;
    println!("{}", style("Goodbye!").green());
    Ok(())
}

fn agent_label(agent: &NotebookChatAgent) -> &'static str {
    maxlab_agent::context::persona_name(agent.persona())
}

async fn run_bridge(config: &Config) -> Result<()> {
    let agent = Arc::new(build_agent(config).await?);
    let mut bridge = ChatBridge::open(agent.clone(), history_path(config)).await;

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    let served = bridge.serve(stdin, stdout).await;

    agent.cleanup().await;
    served.context("Comm channel failed")
}

async fn run_status(loader: &ConfigLoader, config: &Config) -> Result<()> {
    println!("{}", style("MaxLab Status").bold().cyan());
    println!("Version: {}\n", env!("CARGO_PKG_VERSION"));

    println!("{}", style("Configuration:").bold());
    println!("  Config directory: {}", loader.config_dir().display());
    println!("  History file: {}", history_path(config).display());
    println!("  Timeout: {}s", config.agent.timeout_secs);
    println!();

    match NotebookChatAgent::from_config(config).await {
        Ok(agent) => {
            println!("{}", agent.status_banner().await);
            agent.cleanup().await;
        }
        Err(e) => println!("{}", style(config_failure_banner(&e.to_string())).red()),
    }

    Ok(())
}

fn run_plugin_list() {
    for plugin in builtin_plugins() {
        println!(
            "{} - {}",
            style(plugin.name()).bold().cyan(),
            plugin.description()
        );
        for function in plugin.functions() {
            println!("  {}: {}", style(function.function()).bold(), function.description());
        }
        println!();
    }
}

async fn run_plugin_call(plugin: &str, function: &str, args: &str) -> Result<()> {
    let plugin = find_plugin(plugin).with_context(|| format!("Unknown plugin: {}", plugin))?;
    let tool = plugin
        .functions()
        .into_iter()
        .find(|f| f.function() == function)
        .with_context(|| format!("Plugin {} has no function {}", plugin.name(), function))?;

    let args: serde_json::Value =
        serde_json::from_str(args).context("Arguments must be a JSON object")?;
    let errors = tool.validate_params(&args);
    if !errors.is_empty() {
        anyhow::bail!("Invalid arguments: {}", errors.join("; "));
    }

    let output = tool.execute(args).await?;
    println!("{}", output);
    Ok(())
}

fn run_history_show(config: &Config) -> Result<()> {
    let history = JsonHistoryFile::open(history_path(config))?;
    let turns = history.load()?;
    if turns.is_empty() {
        println!("{}", style("No stored history.").dim());
        return Ok(());
    }
    for turn in turns {
        println!(
            "{} {}",
            style(turn.timestamp.format("%Y-%m-%d %H:%M:%S")).dim(),
            style(turn.role).bold()
        );
        println!("{}\n", turn.content);
    }
    Ok(())
}

fn run_history_clear(config: &Config) -> Result<()> {
    let path = history_path(config);
    let mut history = JsonHistoryFile::new(&path);
    history.clear()?;
    println!(
        "{} Cleared {}",
        style("✓").green().bold(),
        path.display()
    );
    Ok(())
}
