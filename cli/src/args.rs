//! Command-line surface.
//!
//! Numbers are taken as raw integers so out-of-range values are reported
//! through the same validation path as server-side errors.

use std::path::PathBuf;

use clap::{ArgAction, ArgGroup, Args, Parser, Subcommand};
use todo_core::config::DEFAULT_BASE_URL;
use todo_core::{Field, FieldError, NewTodo, Priority, QueryFilter, TodoPatch, TodoStatus};

use crate::dates::parse_due;
use crate::error::CliError;

const WORK_TAG: &str = "work";

#[derive(Debug, Parser)]
#[command(name = "tcli", version, about = "Manage todos through the Todo API")]
pub struct Cli {
    /// Config file to read instead of the platform default
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Log more (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(flatten)]
    Todo(TodoCommand),

    /// Inspect or write the config file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum TodoCommand {
    /// Create a todo
    #[command(visible_alias = "add")]
    Create(CreateArgs),

    /// List todos; done ones are hidden unless --status or --all is given
    List(ListArgs),

    /// Show one todo by id
    Get {
        /// Todo id (UUID)
        id: String,
    },

    /// Change a todo; only the options given are sent
    #[command(visible_alias = "edit")]
    Update(UpdateArgs),

    /// Mark a todo as done
    Done {
        /// Todo id, or part of its title
        target: String,
    },

    /// Delete a todo
    Delete {
        /// Todo id, or part of its title
        target: String,
    },

    /// Check that the API answers
    Health,
}

impl Default for TodoCommand {
    fn default() -> Self {
        TodoCommand::List(ListArgs::default())
    }
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the resolved settings
    Show,

    /// Write a config file
    Init {
        #[arg(long, default_value = DEFAULT_BASE_URL)]
        base_url: String,

        #[arg(long)]
        api_key: Option<String>,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("title_input").required(true).args(["title_arg", "title"])))]
pub struct CreateArgs {
    /// Title of the todo
    #[arg(value_name = "TITLE")]
    pub title_arg: Option<String>,

    /// Title, as an option instead of a positional argument
    #[arg(short, long)]
    pub title: Option<String>,

    #[arg(short, long)]
    pub description: Option<String>,

    /// Due date: YYYY-MM-DD, YYYY-MM-DDTHH:MM[:SS], RFC 3339, MM/DD/YYYY or MM-DD-YYYY
    #[arg(long, value_name = "DATE")]
    pub due_at: Option<String>,

    /// 1 (highest) to 5 (lowest)
    #[arg(short, long, default_value_t = 3, allow_negative_numbers = true)]
    pub priority: i64,

    /// Comma-separated tags
    #[arg(long, value_name = "TAGS")]
    pub tags: Option<String>,

    #[arg(short, long, value_name = "MINUTES", allow_negative_numbers = true)]
    pub estimated_minutes: Option<i64>,

    /// Add the "work" tag
    #[arg(long)]
    pub work: bool,
}

impl CreateArgs {
    pub fn to_new_todo(&self) -> Result<NewTodo, CliError> {
        let title = self
            .title
            .as_deref()
            .or(self.title_arg.as_deref())
            .unwrap_or_default();
        let mut todo = NewTodo::new(title);
        let mut errors = Vec::new();

        todo.description = self.description.clone();
        todo.due_at = self.due_at.as_deref().map(parse_due).transpose()?;
        match Priority::new(self.priority) {
            Ok(priority) => todo.priority = priority,
            Err(err) => errors.push(err),
        }
        todo.tags = self.tags.as_deref().map(split_tags).unwrap_or_default();
        if self.work && !todo.tags.iter().any(|tag| tag == WORK_TAG) {
            todo.tags.push(WORK_TAG.to_string());
        }
        match self.estimated_minutes.map(minutes).transpose() {
            Ok(value) => todo.estimated_minutes = value,
            Err(err) => errors.push(err),
        }

        if errors.is_empty() {
            Ok(todo)
        } else {
            Err(errors.into())
        }
    }
}

#[derive(Debug, Default, Args)]
pub struct ListArgs {
    /// Search text
    #[arg(long)]
    pub q: Option<String>,

    #[arg(long)]
    pub tag: Option<String>,

    /// todo, in_progress or done
    #[arg(short, long)]
    pub status: Option<String>,

    /// Maximum number of results (1-1000)
    #[arg(short, long)]
    pub limit: Option<u32>,

    /// Include done todos
    #[arg(short, long)]
    pub all: bool,
}

impl ListArgs {
    pub fn to_filter(&self) -> Result<QueryFilter, CliError> {
        Ok(QueryFilter {
            q: self.q.clone(),
            tag: self.tag.clone(),
            status: self.status.as_deref().map(str::parse::<TodoStatus>).transpose()?,
            limit: self.limit,
        })
    }

    /// Done todos are shown only when asked for.
    pub fn includes_done(&self) -> bool {
        self.all || self.status.is_some()
    }
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Todo id, or part of its title
    pub target: String,

    #[arg(short, long)]
    pub title: Option<String>,

    /// New description; "" clears it
    #[arg(short, long)]
    pub description: Option<String>,

    /// New due date; "" clears it
    #[arg(long, value_name = "DATE")]
    pub due_at: Option<String>,

    /// todo, in_progress or done
    #[arg(short, long)]
    pub status: Option<String>,

    #[arg(short, long, allow_negative_numbers = true)]
    pub priority: Option<i64>,

    /// Comma-separated tags, replacing the current ones; "" clears them
    #[arg(long, value_name = "TAGS")]
    pub tags: Option<String>,

    #[arg(short, long, value_name = "MINUTES", allow_negative_numbers = true)]
    pub estimated_minutes: Option<i64>,
}

impl UpdateArgs {
    pub fn to_patch(&self) -> Result<TodoPatch, CliError> {
        let mut patch = TodoPatch::default();
        let mut errors = Vec::new();

        if let Some(title) = &self.title {
            patch.title = Field::Value(title.clone());
        }
        if let Some(description) = &self.description {
            patch.description = clearable(description).map_or(Field::Null, |d| Field::Value(d.to_string()));
        }
        if let Some(due_at) = &self.due_at {
            patch.due_at = match clearable(due_at) {
                Some(input) => Field::Value(parse_due(input)?),
                None => Field::Null,
            };
        }
        if let Some(status) = &self.status {
            match status.parse::<TodoStatus>() {
                Ok(status) => patch.status = Field::Value(status),
                Err(err) => errors.push(err),
            }
        }
        if let Some(priority) = self.priority {
            match Priority::new(priority) {
                Ok(priority) => patch.priority = Field::Value(priority),
                Err(err) => errors.push(err),
            }
        }
        if let Some(tags) = &self.tags {
            patch.tags = Field::Value(split_tags(tags));
        }
        if let Some(value) = self.estimated_minutes {
            match minutes(value) {
                Ok(value) => patch.estimated_minutes = Field::Value(value),
                Err(err) => errors.push(err),
            }
        }

        if errors.is_empty() {
            Ok(patch)
        } else {
            Err(errors.into())
        }
    }
}

/// `None` for an empty argument, which means "clear".
fn clearable(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn minutes(value: i64) -> Result<u32, FieldError> {
    u32::try_from(value)
        .map_err(|_| FieldError::new("estimated_minutes", "must be a non-negative number of minutes"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("tcli").chain(args.iter().copied())).unwrap()
    }

    fn todo_command(args: &[&str]) -> TodoCommand {
        match parse(args).command {
            Some(Command::Todo(command)) => command,
            other => panic!("expected a todo command, got {other:?}"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn bare_invocation_has_no_command() {
        assert!(parse(&[]).command.is_none());
        assert!(matches!(TodoCommand::default(), TodoCommand::List(ref args) if !args.includes_done()));
    }

    #[test]
    fn create_accepts_positional_or_flag_title() {
        let TodoCommand::Create(args) = todo_command(&["create", "Buy milk"]) else {
            panic!("expected create");
        };
        assert_eq!(args.to_new_todo().unwrap().title, "Buy milk");

        let TodoCommand::Create(args) = todo_command(&["add", "-t", "Call mom", "-p", "1"]) else {
            panic!("expected create");
        };
        let todo = args.to_new_todo().unwrap();
        assert_eq!(todo.title, "Call mom");
        assert_eq!(todo.priority.get(), 1);
    }

    #[test]
    fn create_requires_exactly_one_title() {
        assert!(Cli::try_parse_from(["tcli", "create"]).is_err());
        assert!(Cli::try_parse_from(["tcli", "create", "a", "--title", "b"]).is_err());
    }

    #[test]
    fn create_collects_tags_and_work_flag() {
        let TodoCommand::Create(args) =
            todo_command(&["create", "Report", "--tags", "q3, finance,,", "--work"])
        else {
            panic!("expected create");
        };
        assert_eq!(args.to_new_todo().unwrap().tags, vec!["q3", "finance", "work"]);

        let TodoCommand::Create(args) = todo_command(&["create", "Report", "--tags", "work", "--work"]) else {
            panic!("expected create");
        };
        assert_eq!(args.to_new_todo().unwrap().tags, vec!["work"]);
    }

    #[test]
    fn create_reports_every_bad_number() {
        let TodoCommand::Create(args) = todo_command(&["create", "x", "-p", "9", "-e", "-5"]) else {
            panic!("expected create");
        };
        let err = args.to_new_todo().unwrap_err();
        let fields: Vec<&str> = err.fields().iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["priority", "estimated_minutes"]);
    }

    #[test]
    fn create_parses_due_date() {
        let TodoCommand::Create(args) = todo_command(&["create", "x", "--due-at", "12/31/2025"]) else {
            panic!("expected create");
        };
        let todo = args.to_new_todo().unwrap();
        assert_eq!(todo.due_at.unwrap().to_string(), "2025-12-31T00:00:00Z");
    }

    #[test]
    fn list_shows_done_only_when_asked() {
        let TodoCommand::List(args) = todo_command(&["list"]) else {
            panic!("expected list");
        };
        assert!(!args.includes_done());

        let TodoCommand::List(args) = todo_command(&["list", "-a"]) else {
            panic!("expected list");
        };
        assert!(args.includes_done());

        let TodoCommand::List(args) = todo_command(&["list", "--status", "done", "--limit", "5"]) else {
            panic!("expected list");
        };
        assert!(args.includes_done());
        let filter = args.to_filter().unwrap();
        assert_eq!(filter.status, Some(TodoStatus::Done));
        assert_eq!(filter.limit, Some(5));
    }

    #[test]
    fn list_rejects_unknown_status() {
        let TodoCommand::List(args) = todo_command(&["list", "--status", "someday"]) else {
            panic!("expected list");
        };
        assert_eq!(args.to_filter().unwrap_err().kind(), "validation");
    }

    #[test]
    fn update_sends_only_given_fields() {
        let TodoCommand::Update(args) = todo_command(&["update", "abc", "-p", "1"]) else {
            panic!("expected update");
        };
        let patch = args.to_patch().unwrap();
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({"priority": 1}));
    }

    #[test]
    fn update_empty_values_clear_fields() {
        let TodoCommand::Update(args) = todo_command(&[
            "edit",
            "abc",
            "--description",
            "",
            "--due-at",
            "",
            "--tags",
            "",
            "--status",
            "in-progress",
        ]) else {
            panic!("expected update");
        };
        let patch = args.to_patch().unwrap();
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"description": null, "due_at": null, "tags": [], "status": "in_progress"})
        );
    }

    #[test]
    fn update_without_fields_is_an_empty_patch() {
        let TodoCommand::Update(args) = todo_command(&["update", "abc"]) else {
            panic!("expected update");
        };
        let patch = args.to_patch().unwrap();
        assert!(patch.is_empty());
        assert!(patch.validate().is_err());
    }

    #[test]
    fn config_init_defaults_base_url() {
        let cli = parse(&["config", "init", "--api-key", "k"]);
        let Some(Command::Config(ConfigCommand::Init { base_url, api_key, force })) = cli.command else {
            panic!("expected config init");
        };
        assert_eq!(base_url, DEFAULT_BASE_URL);
        assert_eq!(api_key.as_deref(), Some("k"));
        assert!(!force);
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = parse(&["list", "--json", "-vv"]);
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
    }
}
