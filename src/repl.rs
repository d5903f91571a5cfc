// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Interactive REPL (Read-Eval-Print Loop) for Quill.

use std::borrow::Cow;
use std::path::PathBuf;

use owo_colors::OwoColorize;
use quill_vm::builtins::BUILTINS;
use quill_vm::{Engine, Error, Value, VmConfig};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Config, Editor, Helper};
use tracing::debug;

/// REPL configuration constants
const HISTORY_FILE: &str = "history";
const MAX_HISTORY_SIZE: usize = 1000;

const KEYWORDS: &[&str] = &["fn", "let", "if", "else", "return"];
const LITERALS: &[&str] = &["true", "false"];

/// REPL commands that can be executed with a dot prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Exit,
    Clear,
    Version,
    Load,
    Bytecode,
}

impl ReplCommand {
    /// Parse a REPL command from input string
    pub fn parse(input: &str) -> Option<(Self, Option<&str>)> {
        let rest = input.trim().strip_prefix('.')?;

        let mut parts = rest.splitn(2, char::is_whitespace);
        let cmd = parts.next()?.to_lowercase();
        let arg = parts.next().map(str::trim).filter(|arg| !arg.is_empty());

        let command = match cmd.as_str() {
            "help" | "h" | "?" => ReplCommand::Help,
            "exit" | "quit" | "q" => ReplCommand::Exit,
            "clear" | "cls" => ReplCommand::Clear,
            "version" | "v" => ReplCommand::Version,
            "load" | "l" => ReplCommand::Load,
            "bytecode" | "bc" => ReplCommand::Bytecode,
            _ => return None,
        };
        Some((command, arg))
    }

    /// Get all available commands for help/completion
    pub fn all_commands() -> &'static [(&'static str, &'static str)] {
        &[
            (".help", "Show this help message"),
            (".exit", "Exit the REPL"),
            (".clear", "Clear the screen"),
            (".version", "Show version information"),
            (".load <file>", "Load and execute a Quill file"),
            (".bytecode <code>", "Show the bytecode compiled for <code>"),
        ]
    }
}

/// Helper struct for rustyline that provides completion, hints, and validation
#[derive(Default)]
struct QuillHelper {
    /// Keywords, builtins and commands for completion
    words: Vec<String>,
}

impl QuillHelper {
    fn new() -> Self {
        let commands = ReplCommand::all_commands()
            .iter()
            .filter_map(|(cmd, _)| cmd.split_whitespace().next());

        let words = KEYWORDS
            .iter()
            .chain(LITERALS)
            .copied()
            .chain(BUILTINS.iter().map(|builtin| builtin.name))
            .chain(commands)
            .map(String::from)
            .collect();

        Self { words }
    }
}

/// Byte offset where the word ending at `end` starts.
fn word_start(line: &str, end: usize) -> usize {
    line[..end]
        .rfind(|c: char| !c.is_alphanumeric() && c != '_' && c != '.')
        .map(|i| i + 1)
        .unwrap_or(0)
}

impl Completer for QuillHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = word_start(line, pos);
        let word = &line[start..pos];
        if word.is_empty() {
            return Ok((pos, vec![]));
        }

        let matches: Vec<Pair> = self
            .words
            .iter()
            .filter(|w| w.starts_with(word))
            .map(|w| Pair {
                display: w.clone(),
                replacement: w[word.len()..].to_string(),
            })
            .collect();

        Ok((pos, matches))
    }
}

impl Hinter for QuillHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<Self::Hint> {
        if pos < line.len() {
            return None;
        }

        let word = &line[word_start(line, line.len())..];
        if word.len() < 2 {
            return None;
        }

        self.words
            .iter()
            .find(|w| w.starts_with(word) && w.len() > word.len())
            .map(|w| w[word.len()..].to_string().dimmed().to_string())
    }
}

impl Highlighter for QuillHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        let mut result = String::with_capacity(line.len() * 2);
        let mut current_word = String::new();
        let mut string_literal: Option<String> = None;

        for c in line.chars() {
            if let Some(literal) = string_literal.as_mut() {
                literal.push(c);
                if c == '"' {
                    result.push_str(&literal.green().to_string());
                    string_literal = None;
                }
                continue;
            }

            if c.is_alphanumeric() || c == '_' {
                current_word.push(c);
                continue;
            }

            if !current_word.is_empty() {
                result.push_str(&highlight_word(&current_word));
                current_word.clear();
            }

            match c {
                '"' => string_literal = Some(c.to_string()),
                '(' | ')' | '[' | ']' | '{' | '}' => result.push_str(&c.yellow().to_string()),
                '+' | '-' | '*' | '/' | '=' | '<' | '>' | '!' => {
                    result.push_str(&c.cyan().to_string())
                }
                '.' if line.starts_with('.') => result.push_str(&c.magenta().to_string()),
                _ => result.push(c),
            }
        }

        if !current_word.is_empty() {
            result.push_str(&highlight_word(&current_word));
        }
        if let Some(literal) = string_literal {
            result.push_str(&literal.green().to_string());
        }

        Cow::Owned(result)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn highlight_word(word: &str) -> String {
    if KEYWORDS.contains(&word) {
        word.magenta().bold().to_string()
    } else if LITERALS.contains(&word) {
        word.blue().to_string()
    } else if BUILTINS.iter().any(|builtin| builtin.name == word) {
        word.cyan().to_string()
    } else if word.chars().all(|c| c.is_ascii_digit()) {
        word.yellow().to_string()
    } else {
        word.to_string()
    }
}

impl Validator for QuillHelper {
    fn validate(&self, ctx: &mut ValidationContext<'_>) -> rustyline::Result<ValidationResult> {
        let input = ctx.input();

        if !is_balanced(input) {
            return Ok(ValidationResult::Incomplete);
        }

        // A trailing operator expects more input.
        let trimmed = input.trim_end();
        if trimmed.ends_with(['\\', '+', '-', '*', '/', '=', ',']) {
            return Ok(ValidationResult::Incomplete);
        }

        Ok(ValidationResult::Valid(None))
    }
}

/// Check if brackets, braces, and parentheses are balanced
fn is_balanced(input: &str) -> bool {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escape_next = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if escape_next {
            escape_next = false;
            continue;
        }

        if in_string {
            match c {
                '\\' => escape_next = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '/' if chars.peek() == Some(&'/') => {
                // Line comment: skip to end of line.
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '(' => stack.push(')'),
            '[' => stack.push(']'),
            '{' => stack.push('}'),
            ')' | ']' | '}' => {
                if stack.pop() != Some(c) {
                    return true; // let the parser report the mismatch
                }
            }
            _ => {}
        }
    }

    stack.is_empty() && !in_string
}

impl Helper for QuillHelper {}

/// The interactive REPL for Quill
pub struct Repl {
    engine: Engine,
    editor: Editor<QuillHelper, DefaultHistory>,
    history_path: PathBuf,
}

impl Repl {
    /// Create a new REPL instance
    pub fn new(config: VmConfig) -> rustyline::Result<Self> {
        let editor_config = Config::builder()
            .history_ignore_dups(true)?
            .history_ignore_space(true)
            .max_history_size(MAX_HISTORY_SIZE)?
            .auto_add_history(true)
            .build();

        let mut editor = Editor::with_config(editor_config)?;
        editor.set_helper(Some(QuillHelper::new()));

        let history_path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quill")
            .join(HISTORY_FILE);

        if let Some(parent) = history_path.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                debug!(path = %parent.display(), error = %err, "cannot create history directory");
            }
        }

        if let Err(err) = editor.load_history(&history_path) {
            debug!(path = %history_path.display(), error = %err, "no history loaded");
        }

        Ok(Self {
            engine: Engine::with_config(config),
            editor,
            history_path,
        })
    }

    /// Run the REPL main loop
    pub fn run(&mut self) -> rustyline::Result<()> {
        self.print_banner();

        loop {
            let prompt = format!("{} ", "quill>".bright_green().bold());

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();

                    if trimmed.is_empty() {
                        continue;
                    }

                    if let Some((cmd, arg)) = ReplCommand::parse(trimmed) {
                        match self.execute_command(cmd, arg) {
                            CommandResult::Continue => continue,
                            CommandResult::Exit => break,
                        }
                    }

                    self.eval_and_print(trimmed);
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "^C".dimmed());
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("{}", "^D".dimmed());
                    break;
                }
                Err(err) => {
                    eprintln!("{}: {:?}", "Error".red().bold(), err);
                    break;
                }
            }
        }

        if let Err(err) = self.editor.save_history(&self.history_path) {
            debug!(path = %self.history_path.display(), error = %err, "history not saved");
        }

        println!();
        Ok(())
    }

    fn print_banner(&self) {
        let version = env!("CARGO_PKG_VERSION");
        println!();
        println!(
            "  {} {} {}",
            "Quill".bright_cyan().bold(),
            "v".dimmed(),
            version.bright_yellow()
        );
        println!(
            "  {} {} {}",
            "Type".dimmed(),
            ".help".cyan(),
            "for available commands".dimmed()
        );
        println!();
    }

    fn execute_command(&mut self, cmd: ReplCommand, arg: Option<&str>) -> CommandResult {
        match cmd {
            ReplCommand::Help => self.print_help(),
            ReplCommand::Exit => return CommandResult::Exit,
            ReplCommand::Clear => print!("\x1B[2J\x1B[H"),
            ReplCommand::Version => {
                let version = env!("CARGO_PKG_VERSION");
                println!("{}: {}", "Quill".bright_cyan().bold(), version.yellow());
            }
            ReplCommand::Load => match arg {
                Some(path) => self.load_file(path),
                None => missing_argument(".load", "a file path"),
            },
            ReplCommand::Bytecode => match arg {
                Some(code) => self.print_bytecode(code),
                None => missing_argument(".bytecode", "some code"),
            },
        }
        CommandResult::Continue
    }

    fn print_help(&self) {
        println!();
        println!("{}", "REPL Commands:".white().bold());
        println!();

        for (cmd, desc) in ReplCommand::all_commands() {
            println!("  {:18} {}", cmd.cyan(), desc.dimmed());
        }

        println!();
        println!("{}", "Keyboard Shortcuts:".white().bold());
        println!();
        println!("  {:18} {}", "Ctrl+C".yellow(), "Cancel current input".dimmed());
        println!("  {:18} {}", "Ctrl+D".yellow(), "Exit REPL".dimmed());
        println!("  {:18} {}", "Tab".yellow(), "Autocomplete".dimmed());
        println!();
    }

    fn load_file(&mut self, path: &str) {
        match self.engine.eval_file(path) {
            Ok(value) => println!("{}", format_value(&value)),
            Err(e) => print_error(&e),
        }
    }

    fn print_bytecode(&self, code: &str) {
        match self.engine.compile(code) {
            Ok(bytecode) => print!("{}", bytecode.disassemble()),
            Err(e) => print_error(&e),
        }
    }

    fn eval_and_print(&mut self, input: &str) {
        match self.engine.eval(input) {
            Ok(value) => println!("{}", format_value(&value)),
            Err(e) => print_error(&e),
        }
    }
}

/// Result of executing a REPL command
enum CommandResult {
    Continue,
    Exit,
}

fn missing_argument(command: &str, what: &str) {
    eprintln!(
        "{}: {} {}",
        "Error".red().bold(),
        command.cyan(),
        format!("requires {}", what).dimmed()
    );
}

/// Format a value for display with syntax coloring
fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".blue().to_string(),
        Value::Boolean(b) => b.yellow().to_string(),
        Value::Integer(n) => n.yellow().to_string(),
        Value::String(s) => format!("{:?}", s).green().to_string(),
        Value::Array(_) | Value::Hash(_) => value.cyan().to_string(),
        Value::Closure(_) | Value::Builtin(_) | Value::CompiledFunction(_) => {
            value.magenta().to_string()
        }
    }
}

/// Print a formatted error message
pub fn print_error(error: &Error) {
    let error_str = error.to_string();

    // Split error type from message
    if let Some(colon_pos) = error_str.find(':') {
        let (error_type, message) = error_str.split_at(colon_pos);
        eprintln!("{}{}", error_type.red().bold(), message);
    } else {
        eprintln!("{}", error_str.red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repl_command_parse() {
        assert_eq!(ReplCommand::parse(".help"), Some((ReplCommand::Help, None)));
        assert_eq!(ReplCommand::parse(".exit"), Some((ReplCommand::Exit, None)));
        assert_eq!(
            ReplCommand::parse(".load test.ql"),
            Some((ReplCommand::Load, Some("test.ql")))
        );
        assert_eq!(
            ReplCommand::parse(".bytecode let a = 1;"),
            Some((ReplCommand::Bytecode, Some("let a = 1;")))
        );
        assert_eq!(ReplCommand::parse(".load   "), Some((ReplCommand::Load, None)));
        assert!(ReplCommand::parse(".unknown").is_none());
        assert!(ReplCommand::parse("not a command").is_none());
    }

    #[test]
    fn test_is_balanced() {
        assert!(is_balanced("(1 + 2)"));
        assert!(is_balanced("{ \"a\": 1 }"));
        assert!(is_balanced("fn() { return 1; }"));
        assert!(!is_balanced("(1 + 2"));
        assert!(!is_balanced("let f = fn(x) {"));
        assert!(is_balanced("\"string with (unbalanced\""));
        assert!(is_balanced("\"escaped \\\" quote (\""));
        assert!(is_balanced("1 // comment with (\n"));
        assert!(!is_balanced("\"open string"));
    }

    #[test]
    fn test_helper_words() {
        let helper = QuillHelper::new();
        for word in ["fn", "let", "len", "push", ".help", ".bytecode"] {
            assert!(helper.words.iter().any(|w| w == word), "{}", word);
        }
    }

    #[test]
    fn test_highlight_keeps_text() {
        // Colors are added around the text, never in place of it.
        let helper = QuillHelper::new();
        let line = "let x = len(\"a b\");";
        let highlighted = helper.highlight(line, 0);
        for part in ["let", "x", "len", "a b"] {
            assert!(highlighted.contains(part), "{}", part);
        }
    }
}
