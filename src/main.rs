//! Logpilot CLI - a personal work-log dashboard.

use clap::Parser;
use logpilot::cli::{Cli, Commands, ConfigCommands, IgnoreCommands, LogCommands, TodoCommands};
use logpilot::commands::{self, Output};
use logpilot::config::resolver::process_env;
use logpilot::config::{SettingsOverrides, load_settings};
use logpilot::gui::ServeOptions;
use logpilot::logging;
use logpilot::models::TodoSource;
use std::future::Future;
use std::io::Read;
use std::process;

fn main() {
    let cli = Cli::parse();
    let human = cli.human_readable;

    let serving = matches!(cli.command, Commands::Serve { .. });
    let _log_guard = if serving {
        logging::init(logging::SERVE_FILTER, logging::default_log_dir().as_deref())
    } else {
        logging::init(logging::CLI_FILTER, None)
    };

    if let Err(e) = run(cli) {
        tracing::debug!("command failed: {:?}", e);
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        }
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), logpilot::Error> {
    let human = cli.human_readable;
    let mut overrides = SettingsOverrides {
        data_dir: cli.data_dir,
        ..SettingsOverrides::default()
    };
    if let Commands::Serve {
        host, port, demo, ..
    } = &cli.command
    {
        overrides.host = host.clone();
        overrides.port = *port;
        overrides.demo = demo.then_some(true);
    }
    let settings = load_settings(&overrides)?;
    let root = settings.data_dir().to_path_buf();

    match cli.command {
        Commands::Init => output(&commands::init(&root)?, human),

        Commands::Serve {
            no_scheduler,
            ui_dir,
            ..
        } => {
            let options = ServeOptions {
                host: settings.host.value.clone(),
                port: settings.port.value,
                scheduler: !no_scheduler,
                ui_dir,
                demo: settings.demo.value,
            };
            block_on(logpilot::gui::start_server(&settings, options))?;
        }

        Commands::Commit { message } => {
            output(&commands::commit(&root, message.as_deref())?, human)
        }

        Commands::Log { command } => match command {
            LogCommands::Show { date } => output(&commands::log_show(&root, date.as_deref())?, human),
            LogCommands::Write {
                date,
                content,
                append,
            } => {
                let content = match content {
                    Some(content) => content,
                    None => read_stdin()?,
                };
                output(
                    &commands::log_write(&root, date.as_deref(), &content, append)?,
                    human,
                )
            }
            LogCommands::Dates => output(&commands::log_dates(&root)?, human),
            LogCommands::Rich { date } => output(&commands::log_rich(&root, date.as_deref())?, human),
        },

        Commands::Todo { command } => match command {
            TodoCommands::List { open } => output(&commands::todo_list(&root, open)?, human),
            TodoCommands::Add { title, suggested } => {
                let source = if suggested {
                    TodoSource::Suggested
                } else {
                    TodoSource::Manual
                };
                output(&commands::todo_add(&root, &title, source)?, human)
            }
            TodoCommands::Done { id } => output(&commands::todo_set_done(&root, &id, true)?, human),
            TodoCommands::Undone { id } => {
                output(&commands::todo_set_done(&root, &id, false)?, human)
            }
            TodoCommands::Rm { id } => output(&commands::todo_remove(&root, &id)?, human),
        },

        Commands::Config { command } => match command {
            ConfigCommands::Show => output(&commands::config_show(&settings, &process_env)?, human),
            ConfigCommands::Ignore { command } => match command {
                IgnoreCommands::Add { repo } => {
                    output(&commands::config_ignore_add(&root, &repo)?, human)
                }
                IgnoreCommands::Rm { repo } => {
                    output(&commands::config_ignore_rm(&root, &repo)?, human)
                }
            },
        },

        Commands::Prs => output(&block_on(commands::prs(&settings))?, human),

        Commands::Notifications => output(&block_on(commands::notifications(&settings))?, human),

        Commands::Enrich { date } => output(
            &block_on(commands::enrich(&settings, date.as_deref()))?,
            human,
        ),

        Commands::Linkify { date } => output(
            &block_on(commands::linkify(&settings, date.as_deref()))?,
            human,
        ),

        Commands::Suggest { date } => output(
            &block_on(commands::suggest(&settings, date.as_deref()))?,
            human,
        ),

        Commands::Summary {
            from,
            to,
            prompt,
            save,
        } => output(
            &block_on(commands::summary(
                &settings,
                &from,
                &to,
                prompt.as_deref(),
                save.as_deref(),
            ))?,
            human,
        ),
    }

    Ok(())
}

/// Run a future on a fresh multi-threaded runtime.
fn block_on<F, T>(future: F) -> Result<T, logpilot::Error>
where
    F: Future<Output = Result<T, logpilot::Error>>,
{
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| logpilot::Error::Other(format!("Failed to create runtime: {}", e)))?
        .block_on(future)
}

fn read_stdin() -> Result<String, logpilot::Error> {
    let mut content = String::new();
    std::io::stdin().read_to_string(&mut content)?;
    Ok(content)
}

fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
