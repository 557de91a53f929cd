//! Turning a command argument into a todo id.
//!
//! A UUID is used as-is. Anything else is treated as a title fragment and
//! scored against every todo; a single match wins, several matches go to a
//! `Chooser`.

use std::collections::HashSet;
use std::io::{self, BufRead, Write};

use todo_core::{QueryFilter, TodoApi, TodoItem, Transport};
use tracing::debug;
use uuid::Uuid;

use crate::error::CliError;
use crate::render;

/// Scores below this are not considered matches.
pub const MATCH_THRESHOLD: f64 = 25.0;

/// How many todos are fetched when searching by title.
pub const SEARCH_LIMIT: u32 = 1000;

const MAX_ATTEMPTS: usize = 3;

/// Picks one todo out of several candidates.
pub trait Chooser {
    fn choose(&mut self, query: &str, candidates: &[TodoItem]) -> Result<Uuid, CliError>;
}

/// Refuses to pick; used when nobody is at the terminal.
pub struct NoChooser;

impl Chooser for NoChooser {
    fn choose(&mut self, query: &str, candidates: &[TodoItem]) -> Result<Uuid, CliError> {
        Err(ambiguous(query, candidates))
    }
}

/// Lists the candidates on stderr and reads a number from stdin.
pub struct TerminalChooser;

impl Chooser for TerminalChooser {
    fn choose(&mut self, query: &str, candidates: &[TodoItem]) -> Result<Uuid, CliError> {
        let mut stderr = io::stderr().lock();
        writeln!(stderr, "Several todos match {query:?}:")?;
        writeln!(stderr, "{}", render::candidate_list(candidates))?;

        let stdin = io::stdin();
        for attempt in 1..=MAX_ATTEMPTS {
            write!(stderr, "Select 1-{} or paste an id (q to cancel): ", candidates.len())?;
            stderr.flush()?;
            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                return Err(CliError::Cancelled);
            }
            match pick(&line, candidates) {
                Ok(Some(id)) => return Ok(id),
                Ok(None) => return Err(CliError::Cancelled),
                Err(message) => {
                    debug!(attempt, "invalid selection");
                    writeln!(stderr, "{message}")?;
                }
            }
        }
        Err(CliError::Cancelled)
    }
}

/// Interpret one line of selection input: a list number or one of the
/// candidates' ids. `Ok(None)` means cancel.
pub fn pick(input: &str, candidates: &[TodoItem]) -> Result<Option<Uuid>, String> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("q") {
        return Ok(None);
    }
    if let Ok(id) = Uuid::parse_str(input) {
        return candidates
            .iter()
            .find(|todo| todo.id == id)
            .map(|todo| Some(todo.id))
            .ok_or_else(|| format!("{id} is not one of the listed todos"));
    }
    let out_of_range = || format!("enter a number between 1 and {}", candidates.len());
    let index: usize = input.parse().map_err(|_| out_of_range())?;
    index
        .checked_sub(1)
        .and_then(|i| candidates.get(i))
        .map(|todo| Some(todo.id))
        .ok_or_else(out_of_range)
}

/// Resolve `target` to an id, searching titles when it is not a UUID.
pub fn resolve_target<T: Transport>(
    api: &TodoApi<T>,
    target: &str,
    chooser: &mut dyn Chooser,
) -> Result<Uuid, CliError> {
    if let Ok(id) = Uuid::parse_str(target.trim()) {
        return Ok(id);
    }
    let filter = QueryFilter {
        limit: Some(SEARCH_LIMIT),
        ..Default::default()
    };
    let todos = api.list(&filter)?;
    let mut matches: Vec<TodoItem> = rank(target, &todos).into_iter().cloned().collect();
    debug!(query = target, matches = matches.len(), "title search");
    match matches.len() {
        0 => Err(CliError::NoMatch(target.to_string())),
        1 => Ok(matches.remove(0).id),
        _ => chooser.choose(target, &matches),
    }
}

/// Todos scoring at or above the threshold, best first.
pub fn rank<'a>(query: &str, todos: &'a [TodoItem]) -> Vec<&'a TodoItem> {
    let mut scored: Vec<(f64, &TodoItem)> = todos
        .iter()
        .map(|todo| (fuzzy_score(query, &todo.title), todo))
        .filter(|(score, _)| *score >= MATCH_THRESHOLD)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().map(|(_, todo)| todo).collect()
}

/// Similarity of `query` to `title` on a 0-100 scale, case-insensitive.
///
/// exact 100, prefix 90, substring 80, every query word present 70, most
/// words present 50-70, then shared characters up to 40.
pub fn fuzzy_score(query: &str, title: &str) -> f64 {
    let query = query.trim().to_lowercase();
    let title = title.trim().to_lowercase();
    if query.is_empty() {
        return 0.0;
    }
    if query == title {
        return 100.0;
    }
    if title.starts_with(&query) {
        return 90.0;
    }
    if title.contains(&query) {
        return 80.0;
    }

    let query_words: Vec<&str> = query.split_whitespace().collect();
    let title_words: HashSet<&str> = title.split_whitespace().collect();
    let hits = query_words.iter().filter(|word| title_words.contains(*word)).count();
    let word_ratio = hits as f64 / query_words.len() as f64;
    if hits == query_words.len() {
        return 70.0;
    }
    if word_ratio > 0.5 {
        return 50.0 + (word_ratio - 0.5) * 40.0;
    }

    let query_chars: HashSet<char> = query.chars().filter(|c| !c.is_whitespace()).collect();
    if query_chars.len() >= 3 {
        let title_chars: HashSet<char> = title.chars().filter(|c| !c.is_whitespace()).collect();
        let ratio = query_chars.intersection(&title_chars).count() as f64 / query_chars.len() as f64;
        if ratio >= 0.7 {
            return ratio * 40.0;
        }
    }
    0.0
}

fn ambiguous(query: &str, candidates: &[TodoItem]) -> CliError {
    CliError::Ambiguous {
        query: query.to_string(),
        candidates: candidates
            .iter()
            .map(|todo| (todo.id, todo.title.clone()))
            .collect(),
    }
}
