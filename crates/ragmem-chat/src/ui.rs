//! Terminal UI for the chat loop

use colored::*;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, size},
};
use std::io::{self, IsTerminal, Write};

use ragmem_core::{Response, Result, Turn};

use crate::policy::PolicyKind;

const PROMPT: &str = "ragmem>";

/// Display startup banner
pub fn display_banner(policy: PolicyKind, model: &str) {
    let terminal_width = size().map(|(w, _)| w as usize).unwrap_or(80);
    let banner_width = 60usize.min(terminal_width.saturating_sub(4)).max(40);

    let top_border = format!("┌{}┐", "─".repeat(banner_width - 2));
    let bottom_border = format!("└{}┘", "─".repeat(banner_width - 2));
    let empty_line = format!("│{}│", " ".repeat(banner_width - 2));

    println!();
    println!("{}", top_border.blue());
    println!("{}", empty_line.blue());

    let lines = [
        "ragmem - conversational document Q&A".to_string(),
        String::new(),
        format!("Query policy: {}", policy),
        format!("Chat model:   {}", model),
        String::new(),
        "Follow-up questions see the whole conversation.".to_string(),
        "Use ↑/↓ to recall earlier questions.".to_string(),
    ];

    for line in &lines {
        let padding = (banner_width - 4).saturating_sub(line.chars().count());
        println!("{}", format!("│  {}{}│", line, " ".repeat(padding)).blue());
    }

    println!("{}", empty_line.blue());
    println!("{}", bottom_border.blue());
    println!();
    println!(
        "{}",
        "💡 Tip: ask a question about your documents, or 'help' for commands".dimmed()
    );
    println!();
}

/// Position in the input history while browsing with the arrow keys
#[derive(Debug, Default)]
pub struct HistoryCursor {
    index: Option<usize>,
}

impl HistoryCursor {
    /// Step to an older entry
    pub fn up<'a>(&mut self, history: &'a [String]) -> Option<&'a str> {
        if history.is_empty() {
            return None;
        }
        let index = match self.index {
            None => history.len() - 1,
            Some(i) => i.saturating_sub(1),
        };
        self.index = Some(index);
        Some(&history[index])
    }

    /// Step to a newer entry; past the newest the line is cleared
    pub fn down<'a>(&mut self, history: &'a [String]) -> Option<&'a str> {
        match self.index {
            Some(i) if i + 1 < history.len() => {
                self.index = Some(i + 1);
                Some(&history[i + 1])
            }
            Some(_) => {
                self.index = None;
                Some("")
            }
            None => None,
        }
    }
}

fn redraw(input: &str) -> io::Result<()> {
    print!("\r{} {}\x1b[K", PROMPT.green().bold(), input);
    io::stdout().flush()
}

/// Read one line, with ↑/↓ navigation through earlier inputs
pub fn read_input_with_history(history: &mut Vec<String>) -> Result<String> {
    if !io::stdin().is_terminal() {
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim().to_string();
        if !input.is_empty() {
            history.push(input.clone());
        }
        return Ok(input);
    }

    enable_raw_mode()?;
    let line = read_raw_line(history);
    disable_raw_mode()?;
    println!();

    let line = line?;
    if !line.is_empty() {
        history.push(line.clone());
    }
    Ok(line)
}

fn read_raw_line(history: &[String]) -> Result<String> {
    let mut input = String::new();
    let mut cursor = HistoryCursor::default();
    redraw(&input)?;

    loop {
        let Event::Key(key_event) = event::read()? else {
            continue;
        };

        match key_event.code {
            KeyCode::Enter => return Ok(input.trim().to_string()),
            KeyCode::Esc => return Ok(String::new()),
            KeyCode::Char('c') if key_event.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok("exit".to_string());
            }
            KeyCode::Char(c) => input.push(c),
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Up => {
                if let Some(entry) = cursor.up(history) {
                    input = entry.to_string();
                }
            }
            KeyCode::Down => {
                if let Some(entry) = cursor.down(history) {
                    input = entry.to_string();
                }
            }
            _ => continue,
        }
        redraw(&input)?;
    }
}

/// Display help message
pub fn print_help() {
    println!("{}", "Available commands:".bold());
    println!("  {} - Ask about the indexed documents", "<question>".green());
    println!("  {} - Show the conversation so far", "history".green());
    println!("  {} - Show the query that would be sent for a question", "explain <question>".green());
    println!("  {} - Show this help message", "help".green());
    println!("  {} - Exit the application", "exit/quit".green());
    println!();
    println!("{}", "Examples:".bold());
    println!("  What is the revenue?");
    println!("  How about last year?");
}

/// The question in an `explain <question>` command, matched case-insensitively
pub fn explain_question(input: &str) -> Option<&str> {
    const COMMAND: &str = "explain ";
    let prefix = input.get(..COMMAND.len())?;
    if prefix.eq_ignore_ascii_case(COMMAND) {
        Some(input[COMMAND.len()..].trim())
    } else {
        None
    }
}

/// Render the conversation as numbered question/answer blocks
pub fn format_history(turns: &[Turn]) -> String {
    if turns.is_empty() {
        return "No conversation yet.".to_string();
    }

    let mut out = String::new();
    for (i, pair) in turns.chunks(2).enumerate() {
        out.push_str(&format!("[{}] Q: {}\n", i + 1, pair[0].content()));
        if let Some(answer) = pair.get(1) {
            out.push_str(&format!("    A: {}\n", answer.content()));
        }
    }
    out
}

/// Render the titles of the chunks an answer was grounded on
pub fn format_sources(response: &Response) -> Option<String> {
    if response.sources.is_empty() {
        return None;
    }

    let titles: Vec<String> = response
        .sources
        .iter()
        .map(|doc| {
            let title = doc.title().unwrap_or(&doc.id);
            match doc.score {
                Some(score) => format!("{} ({:.2})", title, score),
                None => title.to_string(),
            }
        })
        .collect();
    Some(format!("Sources: {}", titles.join(", ")))
}

pub fn print_answer(response: &Response) {
    println!("{}", response.text);
    if let Some(sources) = format_sources(response) {
        println!("{}", sources.dimmed());
    }
    println!();
}

pub fn print_error(error: &dyn std::fmt::Display) {
    eprintln!("{} {}", "❌".red(), error.to_string().red());
}
