use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::env;
use std::rc::Rc;

use ganges::{Environment, KEYWORDS, Lexer, MAX_CALL_DEPTH, Object, TokenKind, builtins};
use ganges::{eval_program, parse};
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Cmd, Completer, Context, EditMode, Editor, EventHandler, KeyCode, KeyEvent, Modifiers};
use rustyline::{Helper, Highlighter, Hinter, Validator};

const DEFAULT_HISTORY_FILE: &str = "ganges_history.txt";

/// REPL settings, read from the environment.
struct Settings {
    history_file: String, // GANGES_HISTORY
    edit_mode: EditMode,  // GANGES_EDIT_MODE=vi|emacs
}

impl Settings {
    fn from_env() -> Self {
        let history_file =
            env::var("GANGES_HISTORY").unwrap_or_else(|_| DEFAULT_HISTORY_FILE.to_string());
        let edit_mode = match env::var("GANGES_EDIT_MODE") {
            Ok(mode) if mode.eq_ignore_ascii_case("vi") => EditMode::Vi,
            _ => EditMode::Emacs,
        };
        Settings {
            history_file,
            edit_mode,
        }
    }
}

/// Logs go to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .init();
}

struct GangesCompleter {
    env: Rc<RefCell<Environment>>,
}

impl GangesCompleter {
    fn new(env: Rc<RefCell<Environment>>) -> Self {
        GangesCompleter { env }
    }

    fn candidates(&self) -> BTreeSet<String> {
        let mut names = self.env.borrow().identifiers();
        names.extend(builtins::names().map(str::to_string));
        names.extend(KEYWORDS.iter().map(|(spelling, _)| spelling.to_string()));
        names
    }
}

impl rustyline::completion::Completer for GangesCompleter {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        // Only complete a word that ends right at the cursor
        let word = Lexer::new(&line[..pos]).last().filter(|token| {
            token.span.end == pos
                && (token.kind == TokenKind::Ident
                    || KEYWORDS.iter().any(|(_, kind)| *kind == token.kind))
        });
        let Some(word) = word else {
            return Ok((pos, vec![]));
        };
        let prefix = word.literal;
        let completions = self
            .candidates()
            .into_iter()
            .filter(|name| name.starts_with(&prefix) && name.len() > prefix.len())
            .map(|name| name[prefix.len()..].to_string())
            .collect();
        Ok((pos, completions))
    }
}

#[derive(Completer, Helper, Highlighter, Hinter, Validator)]
struct InputHelper {
    #[rustyline(Validator)]
    validator: GangesValidator,
    #[rustyline(Highlighter)]
    highlighter: GangesHighlighter,
    #[rustyline(Completer)]
    completer: GangesCompleter,
}

fn is_matching_pair(opening: char, closing: char) -> bool {
    matches!((opening, closing), ('(', ')') | ('[', ']') | ('{', '}'))
}

/// Keeps reading lines while a bracket or string literal is still open.
struct GangesValidator;

impl Validator for GangesValidator {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        let input = ctx.input();
        let mut stack = Vec::new();
        let mut in_string = false;

        for (i, c) in input.chars().enumerate() {
            if in_string {
                // No escapes: the next quote always closes the literal
                if c == '"' {
                    in_string = false;
                }
                continue;
            }

            match c {
                '"' => in_string = true,
                '(' | '[' | '{' => stack.push(c),
                ')' | ']' | '}' => match stack.pop() {
                    Some(opening) if is_matching_pair(opening, c) => {}
                    _ => {
                        return Ok(ValidationResult::Invalid(Some(format!(
                            "  - Unmatched '{}' at position {}",
                            c, i
                        ))));
                    }
                },
                _ => {}
            }
        }

        if in_string || !stack.is_empty() {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

/// Colors string literals and the bracket pair next to the cursor.
struct GangesHighlighter;

impl Highlighter for GangesHighlighter {
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> Cow<'l, str> {
        // (bracket, byte offset in `highlighted`, byte offset in `line`)
        let mut stack: Vec<(char, usize, usize)> = Vec::new();
        let mut highlighted = String::new();
        let mut in_string = false;

        for (i, c) in line.char_indices() {
            if in_string {
                if c == '"' {
                    in_string = false;
                }
                highlighted.push_str(&format!("\x1b[32m{}\x1b[0m", c)); // Green for strings
                continue;
            }

            match c {
                '"' => {
                    in_string = true;
                    highlighted.push_str(&format!("\x1b[32m{}\x1b[0m", c));
                }
                '(' | '[' | '{' => {
                    stack.push((c, highlighted.len(), i));
                    highlighted.push(c);
                }
                ')' | ']' | '}' => match stack.pop() {
                    Some((opening, marker, opening_pos)) if is_matching_pair(opening, c) => {
                        if opening_pos + 1 == pos || i + 1 == pos {
                            highlighted.push_str(&format!("\x1b[34m{}\x1b[0m", c)); // Blue for the pair at the cursor
                            highlighted.replace_range(
                                marker..marker + opening.len_utf8(),
                                &format!("\x1b[1;34m{}\x1b[0m", opening),
                            );
                        } else {
                            highlighted.push(c);
                        }
                    }
                    Some((opening, marker, _)) => {
                        highlighted.push_str(&format!("\x1b[31m{}\x1b[0m", c)); // Red for mismatches
                        highlighted.replace_range(
                            marker..marker + opening.len_utf8(),
                            &format!("\x1b[1;31m{}\x1b[0m", opening),
                        );
                    }
                    None => highlighted.push_str(&format!("\x1b[31m{}\x1b[0m", c)),
                },
                _ => highlighted.push(c),
            }
        }

        Cow::Owned(highlighted)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

// Parses and evaluates one entry; syntax errors are all reported and skip evaluation.
fn run_input(input: &str, env: &Rc<RefCell<Environment>>) {
    let (program, errors) = parse(input);
    if !errors.is_empty() {
        for error in &errors {
            if error.pretty_print(input).is_err() {
                eprintln!("{}", error);
            }
        }
        return;
    }

    match eval_program(&program, env) {
        Object::Null => {}
        result => println!("{}", result.inspect()),
    }
}

fn run_session(settings: Settings) -> rustyline::Result<()> {
    println!("Ganges REPL v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or press Ctrl-D to quit.");

    let global_env = Environment::new();
    let helper = InputHelper {
        highlighter: GangesHighlighter,
        validator: GangesValidator,
        completer: GangesCompleter::new(global_env.clone()),
    };
    let config = rustyline::config::Config::builder()
        .edit_mode(settings.edit_mode)
        .build();
    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(helper));
    rl.bind_sequence(
        KeyEvent(KeyCode::Char('s'), Modifiers::CTRL),
        EventHandler::Simple(Cmd::Newline),
    );
    if rl.load_history(&settings.history_file).is_err() {
        println!("No previous history.");
    }

    loop {
        match rl.readline("ganges> ") {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let trimmed_input = line.trim();
                if trimmed_input.is_empty() {
                    continue;
                }
                if trimmed_input.eq_ignore_ascii_case("exit") {
                    break;
                }
                run_input(trimmed_input, &global_env);
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C
                println!("Interrupted. Type 'exit' or Ctrl-D to quit.");
            }
            Err(ReadlineError::Eof) => {
                // Ctrl-D
                println!("\nExiting.");
                break;
            }
            Err(err) => {
                eprintln!("Readline Error: {:?}", err);
                break;
            }
        }
    }
    rl.save_history(&settings.history_file)
}

fn main() -> rustyline::Result<()> {
    init_tracing();
    let settings = Settings::from_env();
    tracing::debug!(history = %settings.history_file, max_call_depth = MAX_CALL_DEPTH, "starting session");

    run_session(settings)
}
