use std::io::{BufRead, Write};
use std::path::PathBuf;

use colored::Colorize;

use pdfsearch_core::Mode;

use crate::prelude::{eprintln, print, println, *};

const HELP: &str = "\n=== PDF Search Help ===
Available commands:
  search <query>     - General search across all content
  headings <query>   - Search focusing on headings
  topics <query>     - Find key topics related to your query
  weighted <query>   - Use weighted fields for more relevant results
  help               - Display this help information
  exit               - Exit the program

Example: 'weighted business strategy'";

const PROMPT: &str = "\nEnter your search command: ";

#[derive(Debug, clap::Args)]
pub struct Options {
    /// Document to link results to (defaults to the indexed source)
    #[arg(long, env = "PDFSEARCH_DOCUMENT")]
    document: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Search { mode: Mode, query: String },
    Help,
    Exit,
    Blank,
}

fn mode_for(command: &str) -> Option<Mode> {
    match command {
        "search" => Some(Mode::General),
        "headings" => Some(Mode::Headings),
        "topics" => Some(Mode::Topics),
        "weighted" => Some(Mode::Weighted),
        _ => None,
    }
}

/// Interpret one input line. Command words are case-insensitive.
fn parse_line(line: &str) -> Result<Command, Error> {
    let line = line.trim();
    match line.to_lowercase().as_str() {
        "" => return Ok(Command::Blank),
        "exit" | "quit" => return Ok(Command::Exit),
        "help" => return Ok(Command::Help),
        _ => {}
    }

    let (word, query) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let word = word.to_lowercase();
    let query = query.trim();

    match mode_for(&word) {
        Some(_) if query.is_empty() => Err(Error::MissingQuery),
        Some(mode) => Ok(Command::Search {
            mode,
            query: query.to_string(),
        }),
        None if query.is_empty() => Err(Error::MissingQuery),
        None => Err(Error::UnknownCommand(word)),
    }
}

pub fn run(options: Options, global: crate::Global) -> Result<()> {
    let handle = crate::search::open_index(&global.index_dir)?;
    let locator = crate::search::locator(&handle, options.document.as_deref())?;

    println!("PDF Search Tool - Type 'help' for available commands");

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{PROMPT}");
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };

        match parse_line(&line?) {
            Ok(Command::Exit) => break,
            Ok(Command::Blank) => {}
            Ok(Command::Help) => println!("{HELP}"),
            Ok(Command::Search { mode, query }) => {
                log::debug!("repl {} search: {}", mode, query);
                // Query errors are reported and the loop keeps going.
                match crate::search::run_query(&handle, &query, mode) {
                    Ok(groups) => crate::search::print_report(&groups, &locator),
                    Err(e) => eprintln!("{} {}", "Error:".red().bold(), e),
                }
            }
            Err(e) => println!("{e}"),
        }
    }

    handle.close()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_commands() {
        assert_eq!(
            parse_line("weighted business strategy").unwrap(),
            Command::Search {
                mode: Mode::Weighted,
                query: "business strategy".to_string()
            }
        );
        assert_eq!(
            parse_line("  SEARCH   \"exact phrase\" ").unwrap(),
            Command::Search {
                mode: Mode::General,
                query: "\"exact phrase\"".to_string()
            }
        );
        assert_eq!(
            parse_line("headings intro").unwrap(),
            Command::Search {
                mode: Mode::Headings,
                query: "intro".to_string()
            }
        );
        assert_eq!(
            parse_line("topics intro").unwrap(),
            Command::Search {
                mode: Mode::Topics,
                query: "intro".to_string()
            }
        );
    }

    #[test]
    fn test_parse_control_commands() {
        assert_eq!(parse_line("help").unwrap(), Command::Help);
        assert_eq!(parse_line("EXIT").unwrap(), Command::Exit);
        assert_eq!(parse_line("   ").unwrap(), Command::Blank);
    }

    #[test]
    fn test_parse_missing_query() {
        assert!(matches!(parse_line("weighted"), Err(Error::MissingQuery)));
        assert!(matches!(parse_line("lonely"), Err(Error::MissingQuery)));
    }

    #[test]
    fn test_parse_unknown_command() {
        match parse_line("bogus something") {
            Err(Error::UnknownCommand(word)) => assert_eq!(word, "bogus"),
            other => panic!("expected UnknownCommand, got {other:?}"),
        }
    }

    #[test]
    fn test_help_lists_every_mode_command() {
        for command in ["search", "headings", "topics", "weighted"] {
            assert!(HELP.contains(&format!("  {command} <query>")));
            assert!(mode_for(command).is_some());
        }
    }
}
