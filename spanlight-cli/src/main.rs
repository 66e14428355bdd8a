//! Spanlight CLI - Terminal span annotation tool

mod app;
mod io;
mod surface;
mod ui;

use std::fs::OpenOptions;
use std::io::stdout;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use spanlight_core::{to_seeds, AnswerDocument, LabelOption};

use app::{App, Focus, Mode};

const USAGE: &str = "usage: spanlight <file> [--labels A,B,..] [--answers FILE] [--allow-overlap] [--allow-character] [--plain]";
const DEFAULT_LABELS: &[&str] = &["PER", "ORG", "LOC", "MISC"];

#[derive(Debug, Default)]
struct Args {
    file: String,
    labels: Vec<String>,
    answers: Option<String>,
    allow_overlap: bool,
    allow_character: bool,
    plain: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    let mut file = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--labels" => {
                let value = args.next().context("--labels needs a value")?;
                parsed.labels = value
                    .split(',')
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(String::from)
                    .collect();
            }
            "--answers" => parsed.answers = Some(args.next().context("--answers needs a file")?),
            "--allow-overlap" => parsed.allow_overlap = true,
            "--allow-character" => parsed.allow_character = true,
            "--plain" => parsed.plain = true,
            flag if flag.starts_with("--") => bail!("unknown option {}\n{}", flag, USAGE),
            _ => file = Some(arg),
        }
    }

    parsed.file = file.context(USAGE)?;
    if parsed.labels.is_empty() {
        parsed.labels = DEFAULT_LABELS.iter().map(|l| l.to_string()).collect();
    }
    Ok(parsed)
}

fn label_options(labels: &[String]) -> Vec<LabelOption> {
    labels
        .iter()
        .map(|l| LabelOption::new(l.to_lowercase(), l.as_str(), l.as_str()))
        .collect()
}

/// Log to ~/.spanlight/spanlight.log when SPANLIGHT_LOG holds a filter
fn init_logging() -> Result<()> {
    let Ok(filter) = EnvFilter::try_from_env("SPANLIGHT_LOG") else {
        return Ok(());
    };
    let path = io::spanlight_dir()?.join("spanlight.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    init_logging()?;

    let document = io::load_file(&args.file)?;
    let mut config = io::load_config(&io::spanlight_dir()?.join("config.json"))?;
    config.allow_overlap |= args.allow_overlap;
    config.allow_character |= args.allow_character;

    let labels = label_options(&args.labels);
    let seeds = match &args.answers {
        Some(path) => to_seeds(&io::load_answers(path)?.spans, &labels),
        None => Vec::new(),
    };
    info!(file = %args.file, seeds = seeds.len(), ?config, "starting");

    let mut app = App::new(document, labels, config, seeds, !args.plain);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = res {
        eprintln!("Error: {}", e);
    }

    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    while app.running {
        terminal.draw(|f| ui::draw(f, app))?;

        // Resize events need no handling, the next draw lays out at the new size
        if let Event::Key(key) = event::read()? {
            // Clear status on any key
            app.clear_status();

            match app.mode {
                Mode::Normal => handle_normal_mode(app, key.code),
                Mode::Visual => handle_visual_mode(app, key.code),
                Mode::Search => handle_search_mode(app, key.code),
                Mode::Help => {
                    app.mode = Mode::Normal;
                }
            }
        }
    }
    Ok(())
}

fn handle_normal_mode(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('q') => app.running = false,
        KeyCode::Char('?') => app.mode = Mode::Help,

        // Navigation
        KeyCode::Char('j') | KeyCode::Down => {
            if app.focus == Focus::Editor {
                app.move_cursor(|c| c.move_down());
            } else {
                app.next_chip();
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            if app.focus == Focus::Editor {
                app.move_cursor(|c| c.move_up());
            } else {
                app.prev_chip();
            }
        }
        KeyCode::Char('h') | KeyCode::Left => app.move_cursor(|c| c.move_left()),
        KeyCode::Char('l') | KeyCode::Right => app.move_cursor(|c| c.move_right()),
        KeyCode::Char('w') => app.move_cursor(|c| c.move_word_forward()),
        KeyCode::Char('b') => app.move_cursor(|c| c.move_word_back()),
        KeyCode::Char('0') | KeyCode::Home => app.move_cursor(|c| c.move_to_start()),
        KeyCode::Char('$') | KeyCode::End => app.move_cursor(|c| c.move_to_end()),
        KeyCode::Char('g') => app.move_cursor(|c| c.move_to_top()),
        KeyCode::Char('G') => app.move_cursor(|c| c.move_to_bottom()),

        // Chip navigation
        KeyCode::Char(']') => app.next_chip(),
        KeyCode::Char('[') => app.prev_chip(),

        // Labels
        KeyCode::Char(c @ '1'..='9') => {
            let index = c as usize - '1' as usize;
            app.select_label(index);
        }

        // Visual mode
        KeyCode::Char('v') => app.enter_visual_mode(),

        // Chip actions
        KeyCode::Char('d') => {
            app.delete_selected_span();
        }
        KeyCode::Char('r') => {
            app.relabel_selected_span();
        }
        KeyCode::Char('D') => {
            app.duplicate_selected_span();
        }

        // Focus toggle
        KeyCode::Tab => app.toggle_focus(),

        // Search
        KeyCode::Char('/') => app.start_search(),
        KeyCode::Esc => app.clear_search(),

        // Export
        KeyCode::Char('e') => {
            let answers = AnswerDocument::new(&app.document, &app.spans(), &app.labels);
            match io::spanlight_dir().and_then(|dir| io::export_answers(&dir, &answers)) {
                Ok(path) => app.set_status(&format!("Exported to {}", path.display())),
                Err(e) => app.set_status(&format!("Export failed: {}", e)),
            }
        }

        _ => {}
    }
}

fn handle_visual_mode(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc => app.cancel_visual_mode(),
        KeyCode::Char('j') | KeyCode::Down => app.move_cursor(|c| c.move_down()),
        KeyCode::Char('k') | KeyCode::Up => app.move_cursor(|c| c.move_up()),
        KeyCode::Char('h') | KeyCode::Left => app.move_cursor(|c| c.move_left()),
        KeyCode::Char('l') | KeyCode::Right => app.move_cursor(|c| c.move_right()),
        KeyCode::Char('w') => app.move_cursor(|c| c.move_word_forward()),
        KeyCode::Char('b') => app.move_cursor(|c| c.move_word_back()),
        KeyCode::Char(c @ '1'..='9') => {
            let index = c as usize - '1' as usize;
            app.select_label(index);
        }
        KeyCode::Char('a') | KeyCode::Enter => {
            app.commit_selection();
        }
        _ => {}
    }
}

fn handle_search_mode(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc => {
            app.mode = Mode::Normal;
            app.input_buffer.clear();
        }
        KeyCode::Enter => {
            app.run_search();
        }
        KeyCode::Backspace => {
            app.input_buffer.pop();
        }
        KeyCode::Char(c) => {
            app.input_buffer.push(c);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args_flags() {
        let parsed = parse_args(args(&["notes.txt", "--labels", "A, B", "--allow-overlap", "--plain"])).unwrap();
        assert_eq!(parsed.file, "notes.txt");
        assert_eq!(parsed.labels, vec!["A", "B"]);
        assert!(parsed.allow_overlap);
        assert!(!parsed.allow_character);
        assert!(parsed.plain);
    }

    #[test]
    fn test_parse_args_defaults_and_errors() {
        let parsed = parse_args(args(&["notes.txt"])).unwrap();
        assert_eq!(parsed.labels.len(), DEFAULT_LABELS.len());
        assert!(parsed.answers.is_none());

        assert!(parse_args(args(&[])).is_err());
        assert!(parse_args(args(&["notes.txt", "--labels"])).is_err());
        assert!(parse_args(args(&["notes.txt", "--bogus"])).is_err());
    }

    #[test]
    fn test_label_options_use_lowercase_ids() {
        let options = label_options(&args(&["PER", "LOC"]));
        assert_eq!(options[0].id, "per");
        assert_eq!(options[1].value, "LOC");
    }
}
