//! Dispatch from parsed arguments to API calls and output.

use std::io::{self, IsTerminal};
use std::path::PathBuf;

use todo_core::config::{default_config_path, write_config_file};
use todo_core::{Field, Resolver, Settings, TodoApi, TodoClient, TodoPatch, TodoStatus, Transport};
use tracing::info;
use uuid::Uuid;

use crate::args::{Cli, Command, ConfigCommand, ListArgs, TodoCommand};
use crate::error::CliError;
use crate::identify::{resolve_target, Chooser, NoChooser, TerminalChooser};
use crate::render::{Renderer, SettingsView};
use crate::transport::UreqTransport;

/// Run one invocation. Errors are returned for the caller to render.
pub fn run(cli: Cli) -> Result<(), CliError> {
    let out = Renderer::new(cli.json);
    match cli.command {
        Some(Command::Config(command)) => config(command, cli.config, &out),
        Some(Command::Todo(command)) => todo(command, cli.config, &out),
        None => todo(TodoCommand::default(), cli.config, &out),
    }
}

fn todo(command: TodoCommand, config_path: Option<PathBuf>, out: &Renderer) -> Result<(), CliError> {
    let settings = Resolver::standard(config_path).resolve()?;
    info!(base_url = %settings.base_url, "using API");
    let api = TodoApi::new(
        TodoClient::from_settings(&settings),
        UreqTransport::new(settings.timeout),
    );
    if io::stdin().is_terminal() && io::stderr().is_terminal() {
        execute(command, &api, out, &mut TerminalChooser)
    } else {
        execute(command, &api, out, &mut NoChooser)
    }
}

/// Carry out a todo command against `api`.
pub fn execute<T: Transport>(
    command: TodoCommand,
    api: &TodoApi<T>,
    out: &Renderer,
    chooser: &mut dyn Chooser,
) -> Result<(), CliError> {
    match command {
        TodoCommand::Create(args) => {
            let todo = api.create(&args.to_new_todo()?)?;
            out.todo(&todo, Some("Todo created."));
        }
        TodoCommand::List(args) => list(&args, api, out)?,
        TodoCommand::Get { id } => {
            let id = match Uuid::parse_str(id.trim()) {
                Ok(id) => id,
                Err(_) => return Err(CliError::InvalidId(id)),
            };
            out.todo(&api.get(id)?, None);
        }
        TodoCommand::Update(args) => {
            // Reject bad input before searching by title.
            let patch = args.to_patch()?;
            patch.validate()?;
            let id = resolve_target(api, &args.target, chooser)?;
            out.todo(&api.update(id, &patch)?, Some("Todo updated."));
        }
        TodoCommand::Done { target } => {
            let id = resolve_target(api, &target, chooser)?;
            let patch = TodoPatch {
                status: Field::Value(TodoStatus::Done),
                ..Default::default()
            };
            out.todo(&api.update(id, &patch)?, Some("Todo marked as done."));
        }
        TodoCommand::Delete { target } => {
            let id = resolve_target(api, &target, chooser)?;
            api.delete(id)?;
            out.deleted(id);
        }
        TodoCommand::Health => out.health(&api.health()?, api.client().base_url()),
    }
    Ok(())
}

fn list<T: Transport>(args: &ListArgs, api: &TodoApi<T>, out: &Renderer) -> Result<(), CliError> {
    let mut todos = api.list(&args.to_filter()?)?;
    if !args.includes_done() {
        todos.retain(|todo| todo.status != TodoStatus::Done);
    }
    out.todos(&todos);
    Ok(())
}

fn config(command: ConfigCommand, config_path: Option<PathBuf>, out: &Renderer) -> Result<(), CliError> {
    let file = config_path.clone().or_else(default_config_path);
    match command {
        ConfigCommand::Show => {
            let settings = Resolver::standard(config_path).resolve()?;
            out.settings(&settings_view(&settings, file));
        }
        ConfigCommand::Init {
            base_url,
            api_key,
            force,
        } => {
            let path = file.ok_or(todo_core::ConfigError::NoHomeDir)?;
            write_config_file(&path, &base_url, api_key.as_deref(), force)?;
            info!(path = %path.display(), "wrote config file");
            out.config_written(&path.display().to_string());
        }
    }
    Ok(())
}

fn settings_view(settings: &Settings, file: Option<PathBuf>) -> SettingsView {
    SettingsView {
        base_url: settings.base_url.clone(),
        api_key: settings.api_key.as_deref().map(mask),
        timeout_seconds: settings.timeout.as_secs(),
        config_file_exists: file.as_ref().is_some_and(|path| path.is_file()),
        config_file: file.map(|path| path.display().to_string()),
    }
}

/// Keep only the last four characters of a secret.
fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}
