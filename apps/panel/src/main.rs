use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    CommandNode, HttpRemoteTree, Level, Listing, Navigator, Notifier, PanelSession, TypedValue,
};
use shared::{domain::ScopePath, protocol::HelpRequest};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, DEFAULT_CONFIG_PATH};

#[derive(Parser, Debug)]
#[command(about = "Browse and drive a softmodem's command tree over HTTP")]
struct Args {
    /// Overrides the backend url from the config file and environment.
    #[arg(long)]
    backend_url: Option<String>,
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List commands and variables at a scope: empty, `module` or `module/command`.
    List {
        #[arg(default_value = "")]
        path: String,
    },
    /// Set a variable at a scope.
    Set {
        #[arg(long, default_value = "")]
        scope: String,
        name: String,
        value: String,
    },
    /// Run a module command with positional arguments.
    Run {
        module: String,
        command: String,
        args: Vec<String>,
        /// Answer yes to the command's confirmation question.
        #[arg(long)]
        yes: bool,
        /// Print the collected logs as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the help text of a component/module/object.
    Help {
        component: String,
        module: String,
        object: String,
    },
}

struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn show_dialog(&self, title: &str, body: &str) {
        println!("== {title} ==");
        if !body.is_empty() {
            println!("{body}");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings(&args.config);
    if let Some(url) = args.backend_url {
        settings.backend_url = url;
    }
    let remote = Arc::new(
        HttpRemoteTree::new(&settings.backend_url, settings.request_timeout())
            .context("failed to set up backend client")?,
    );

    let open_session = || PanelSession::new(remote.clone(), Arc::new(ConsoleNotifier));

    match args.command {
        Command::Help {
            component,
            module,
            object,
        } => {
            let text = remote
                .fetch_help(&HelpRequest {
                    component,
                    module,
                    object,
                })
                .await?;
            println!("{text}");
        }
        Command::List { path } => {
            let session = open_session();
            let level = navigate(&session, &ScopePath::parse(&path)).await?;
            session.with_navigator(|nav| print_level(nav, level)).await;
        }
        Command::Set { scope, name, value } => {
            let session = open_session();
            let level = navigate(&session, &ScopePath::parse(&scope)).await?;
            session.edit_variable(level, &name, &value).await?;
            session.submit_variable(level, &name).await?;
        }
        Command::Run {
            module,
            command,
            args,
            yes,
            json,
        } => {
            let session = open_session();
            let scope = ScopePath::root().child(&module)?.child(&command)?;
            navigate(&session, &scope).await?;
            for (index, arg) in args.iter().enumerate() {
                session.edit_argument_at(index, arg).await?;
            }

            let question = session
                .with_navigator(|nav| {
                    nav.selected_command()
                        .and_then(CommandNode::confirm)
                        .map(str::to_string)
                })
                .await;
            if let Some(question) = question {
                if !yes {
                    bail!("{question} (re-run with --yes to confirm)");
                }
            }

            session.submit_command().await?;
            let logs = session.logs().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&logs)?);
            } else {
                for entry in &logs {
                    println!(
                        "[{}] {:<12} {} enabled={}",
                        entry.level, entry.component, entry.output, entry.enabled
                    );
                }
            }
        }
    }

    Ok(())
}

/// Walks from the root down to `scope`, returning the level it names.
async fn navigate(session: &PanelSession, scope: &ScopePath) -> Result<Level> {
    session.load_root().await;
    match scope.segments() {
        [] => Ok(Level::Root),
        [module] => {
            session.select_module(module).await?;
            Ok(Level::Module)
        }
        [module, command] => {
            session.select_module(module).await?;
            session.select_command(command).await?;
            Ok(Level::Command)
        }
        _ => bail!("scope '{scope}' is deeper than module/command"),
    }
}

fn print_level(nav: &Navigator, level: Level) {
    match level {
        Level::Root => {
            print_nodes("modules", nav.modules());
            print_values("variables", nav.root_variables().items());
        }
        Level::Module => {
            print_nodes("commands", nav.commands());
            print_values("variables", nav.module_variables().items());
        }
        Level::Command => {
            if let Some(question) = nav.selected_command().and_then(CommandNode::confirm) {
                println!("confirm: {question}");
            }
            print_values("arguments", nav.arguments());
        }
    }
}

fn print_nodes(title: &str, listing: &Listing<CommandNode>) {
    println!("{title}:");
    if let Some(error) = listing.error() {
        println!("  (unavailable: {error})");
    }
    for node in listing.items() {
        let marker = if node.has_children() { "/" } else { "" };
        println!("  {}{marker}", node.name());
    }
}

fn print_values(title: &str, values: &[TypedValue]) {
    println!("{title}:");
    for value in values {
        let access = if value.is_modifiable() { "" } else { " (read-only)" };
        println!(
            "  {:<24} {:<8} {:<16} {}{access}",
            value.name(),
            value.type_tag(),
            value.value_text(),
            value.expectation()
        );
    }
}
