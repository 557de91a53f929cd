//! Terminal and JSON output.
//!
//! Results go to stdout, errors to stderr. With `--json` every result is a
//! pretty-printed JSON document and errors are `{"error": {...}}`.

use colored::{ColoredString, Colorize};
use serde::Serialize;
use serde_json::{json, Value};
use todo_core::{HealthStatus, Priority, TodoItem, TodoStatus};
use tracing::error;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};
use uuid::Uuid;

use crate::error::CliError;

const COLUMNS: [(&str, usize); 6] = [
    ("ID", 36),
    ("Title", 30),
    ("Status", 12),
    ("Priority", 8),
    ("Due Date", 16),
    ("Tags", 20),
];
const GAP: &str = "  ";
const ELLIPSIS: &str = "...";
const EMPTY: &str = "-";
const LABEL_WIDTH: usize = 14;

/// Connection settings as shown by `config show`. The key is masked.
#[derive(Debug, Serialize)]
pub struct SettingsView {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    pub config_file: Option<String>,
    pub config_file_exists: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    json: bool,
}

impl Renderer {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn todos(&self, todos: &[TodoItem]) {
        if self.json {
            print_json(&todos);
        } else if todos.is_empty() {
            println!("{}", "No todos found.".yellow());
        } else {
            println!("{}", todo_table(todos));
        }
    }

    /// One todo, optionally under a success line.
    pub fn todo(&self, todo: &TodoItem, headline: Option<&str>) {
        if self.json {
            print_json(todo);
            return;
        }
        if let Some(headline) = headline {
            println!("{} {}", "✓".green().bold(), headline.green());
        }
        println!("{}", todo_detail(todo));
    }

    pub fn deleted(&self, id: Uuid) {
        if self.json {
            print_json(&json!({ "deleted": id }));
        } else {
            println!("{} {}", "✓".green().bold(), format!("Todo {id} deleted.").green());
        }
    }

    pub fn health(&self, health: &HealthStatus, base_url: &str) {
        if self.json {
            print_json(health);
            return;
        }
        println!("{} {} is {}", "✓".green().bold(), base_url, health.status.green().bold());
        for (key, value) in &health.details {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            println!("  {} {}", label(key), value);
        }
    }

    pub fn settings(&self, view: &SettingsView) {
        if self.json {
            print_json(view);
            return;
        }
        let file = match (&view.config_file, view.config_file_exists) {
            (Some(path), true) => path.clone(),
            (Some(path), false) => format!("{path} (not found)"),
            (None, _) => EMPTY.to_string(),
        };
        println!("{} {}", label("Base URL"), view.base_url);
        println!("{} {}", label("API key"), view.api_key.as_deref().unwrap_or("(none)"));
        println!("{} {}s", label("Timeout"), view.timeout_seconds);
        println!("{} {}", label("Config file"), file);
    }

    pub fn config_written(&self, path: &str) {
        if self.json {
            print_json(&json!({ "written": path }));
        } else {
            println!("{} Wrote {}", "✓".green().bold(), path);
        }
    }

    pub fn error(&self, err: &CliError) {
        if self.json {
            match serde_json::to_string_pretty(&error_json(err)) {
                Ok(text) => eprintln!("{text}"),
                Err(e) => error!("could not encode error: {e}"),
            }
        } else {
            eprintln!("{}", error_text(err));
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => error!("could not encode output: {e}"),
    }
}

pub fn todo_table(todos: &[TodoItem]) -> String {
    let header = COLUMNS
        .iter()
        .map(|(name, width)| fit(name, *width))
        .collect::<Vec<_>>()
        .join(GAP);
    let rule = COLUMNS
        .iter()
        .map(|(_, width)| "─".repeat(*width))
        .collect::<Vec<_>>()
        .join(GAP);

    let mut lines = vec![header.magenta().bold().to_string(), rule.dimmed().to_string()];
    for todo in todos {
        let cells = [
            fit(&todo.id.to_string(), COLUMNS[0].1),
            fit(&todo.title, COLUMNS[1].1),
            status_color(todo.status, fit(todo.status.as_str(), COLUMNS[2].1)).to_string(),
            priority_color(todo.priority, center(&todo.priority.to_string(), COLUMNS[3].1)).to_string(),
            fit(&due(todo), COLUMNS[4].1),
            fit(&tags(todo), COLUMNS[5].1),
        ];
        lines.push(cells.join(GAP).trim_end().to_string());
    }
    lines.push(format!("{} todo(s)", todos.len()).dimmed().to_string());
    lines.join("\n")
}

pub fn todo_detail(todo: &TodoItem) -> String {
    let estimate = todo
        .estimated_minutes
        .map_or_else(|| EMPTY.to_string(), |minutes| format!("{minutes} min"));
    let updated = todo
        .updated_at
        .map_or_else(|| EMPTY.to_string(), |t| t.0.format("%Y-%m-%d %H:%M").to_string());
    let rows = [
        ("ID", todo.id.to_string().normal()),
        ("Title", todo.title.bold()),
        ("Description", todo.description.as_deref().unwrap_or(EMPTY).normal()),
        ("Status", status_color(todo.status, todo.status.to_string())),
        ("Priority", priority_color(todo.priority, todo.priority.to_string())),
        ("Due Date", due(todo).normal()),
        ("Tags", tags(todo).normal()),
        ("Estimate", estimate.normal()),
        ("Created", todo.created_at.0.format("%Y-%m-%d %H:%M").to_string().normal()),
        ("Updated", updated.normal()),
    ];
    rows.iter()
        .map(|(name, value)| format!("{} {}", label(name), value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Numbered list used when a title fragment matches several todos.
pub fn candidate_list(todos: &[TodoItem]) -> String {
    todos
        .iter()
        .enumerate()
        .map(|(i, todo)| {
            format!(
                "  {:>2}. {}  {}  {}",
                i + 1,
                fit(&todo.title, COLUMNS[1].1),
                status_color(todo.status, fit(todo.status.as_str(), COLUMNS[2].1)),
                todo.id.to_string().dimmed()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn error_text(err: &CliError) -> String {
    let mut text = format!("{} {}", "Error:".red().bold(), err);
    if let CliError::Ambiguous { candidates, .. } = err {
        for (id, title) in candidates {
            text.push_str(&format!("\n  {id}  {title}"));
        }
    }
    if err.is_retryable() {
        text.push_str(&format!("\n{}", "The API could not be reached; try again later.".dimmed()));
    }
    text
}

pub fn error_json(err: &CliError) -> Value {
    let mut body = json!({
        "kind": err.kind(),
        "message": err.to_string(),
        "fields": err.fields(),
        "retryable": err.is_retryable(),
    });
    if let CliError::Ambiguous { candidates, .. } = err {
        body["candidates"] = candidates
            .iter()
            .map(|(id, title)| json!({ "id": id, "title": title }))
            .collect();
    }
    json!({ "error": body })
}

fn label(name: &str) -> ColoredString {
    format!("{:<width$}", format!("{name}:"), width = LABEL_WIDTH).cyan().bold()
}

fn due(todo: &TodoItem) -> String {
    todo.due_at
        .map_or_else(|| EMPTY.to_string(), |t| t.0.format("%Y-%m-%d %H:%M").to_string())
}

fn tags(todo: &TodoItem) -> String {
    if todo.tags.is_empty() {
        EMPTY.to_string()
    } else {
        todo.tags.join(", ")
    }
}

fn status_color(status: TodoStatus, text: String) -> ColoredString {
    match status {
        TodoStatus::Done => text.green().bold(),
        TodoStatus::InProgress => text.yellow().bold(),
        TodoStatus::Todo => text.cyan(),
    }
}

fn priority_color(priority: Priority, text: String) -> ColoredString {
    match priority.get() {
        0..=2 => text.red().bold(),
        3 => text.yellow(),
        _ => text.green(),
    }
}

/// Cut `text` to `width` display columns, marking the cut with an ellipsis.
fn truncate(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let budget = width.saturating_sub(ELLIPSIS.len());
    let mut used = 0;
    let mut out = String::new();
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push_str(ELLIPSIS);
    out
}

/// Truncate and left-align in exactly `width` columns.
fn fit(text: &str, width: usize) -> String {
    let text = truncate(text, width);
    let pad = width.saturating_sub(text.width());
    format!("{text}{}", " ".repeat(pad))
}

fn center(text: &str, width: usize) -> String {
    let text = truncate(text, width);
    let pad = width.saturating_sub(text.width());
    let left = pad / 2;
    format!("{}{text}{}", " ".repeat(left), " ".repeat(pad - left))
}
