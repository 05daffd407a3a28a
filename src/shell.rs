//! Line-oriented command front-end.
//!
//! ```text
//! insert <key> <int-value>
//! search <key>
//! scan
//! stats
//! help
//! exit
//! ```

use std::fmt;

use crate::common::{Error, Result};
use crate::index::btree::{BPlusTree, Entry, TreeStats, Value};
use crate::storage::IoStatsSnapshot;

pub const HELP: &str = "\
Commands:
  insert <key> <int-value>
  search <key>
  scan
  stats
  help
  exit";

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Insert { key: String, value: i64 },
    Search { key: String },
    Scan,
    Stats,
    Help,
    Exit,
}

impl Command {
    /// Parse one line. Blank lines yield `Ok(None)`.
    ///
    /// # Errors
    /// Returns `Error::InvalidInput` carrying a usage message for unknown
    /// commands, wrong arity, or a non-integer value.
    ///
    /// # Example
    /// ```
    /// use pagetree::shell::Command;
    ///
    /// let cmd = Command::parse("insert apple 3").unwrap();
    /// assert_eq!(cmd, Some(Command::Insert { key: "apple".into(), value: 3 }));
    /// assert!(Command::parse("insert apple").is_err());
    /// ```
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((&name, args)) = tokens.split_first() else {
            return Ok(None);
        };

        let command = match (name, args) {
            ("insert", [key, value]) => {
                let value = value.parse::<i64>().map_err(|_| {
                    Error::InvalidInput("Invalid value; must be an integer".to_string())
                })?;
                Command::Insert {
                    key: key.to_string(),
                    value,
                }
            }
            ("insert", _) => return Err(usage("insert <key> <int-value>")),
            ("search", [key]) => Command::Search {
                key: key.to_string(),
            },
            ("search", _) => return Err(usage("search <key>")),
            ("scan", []) => Command::Scan,
            ("stats", []) => Command::Stats,
            ("help", []) => Command::Help,
            ("exit", []) => Command::Exit,
            ("scan" | "stats" | "help" | "exit", _) => return Err(usage(name)),
            _ => {
                return Err(Error::InvalidInput(
                    "Unknown command. Use insert/search/scan/stats/help/exit.".to_string(),
                ))
            }
        };
        Ok(Some(command))
    }

    /// Run the command against `tree`.
    pub fn execute(self, tree: &mut BPlusTree) -> Result<Reply> {
        match self {
            Command::Insert { key, value } => {
                tree.insert(&key, Value::int(value))?;
                Ok(Reply::Inserted)
            }
            Command::Search { key } => Ok(match tree.search(&key)? {
                Some(value) => Reply::Found(value),
                None => Reply::NotFound,
            }),
            Command::Scan => Ok(Reply::Entries(tree.scan()?)),
            Command::Stats => Ok(Reply::Stats(tree.check_structure()?, tree.io_stats())),
            Command::Help => Ok(Reply::Help),
            Command::Exit => Ok(Reply::Exit),
        }
    }
}

fn usage(form: &str) -> Error {
    Error::InvalidInput(format!("Usage: {}", form))
}

/// Result of a successfully executed [`Command`].
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Inserted,
    Found(Value),
    NotFound,
    Entries(Vec<Entry>),
    Stats(TreeStats, IoStatsSnapshot),
    Help,
    Exit,
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Inserted => write!(f, "Inserted successfully."),
            Reply::Found(value) => write!(f, "Found: {}", value),
            Reply::NotFound => write!(f, "Key not found."),
            Reply::Entries(entries) if entries.is_empty() => write!(f, "(empty)"),
            Reply::Entries(entries) => {
                for (i, entry) in entries.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{} = {}", entry.key, entry.value)?;
                }
                Ok(())
            }
            Reply::Stats(tree, io) => write!(f, "{}\n{}", tree, io),
            Reply::Help => write!(f, "{}", HELP),
            Reply::Exit => Ok(()),
        }
    }
}

/// Parse and execute one line, rendering failures the way the prompt shows
/// them. Returns `None` when the line asks to exit.
pub fn run_line(tree: &mut BPlusTree, line: &str) -> Option<String> {
    let command = match Command::parse(line) {
        Ok(Some(command)) => command,
        Ok(None) => return Some(String::new()),
        Err(Error::InvalidInput(message)) => return Some(message),
        Err(e) => return Some(e.to_string()),
    };

    let label = match &command {
        Command::Insert { .. } => "Insert",
        Command::Search { .. } => "Search",
        Command::Scan => "Scan",
        Command::Stats => "Stats",
        Command::Help | Command::Exit => "Command",
    };
    match command.execute(tree) {
        Ok(Reply::Exit) => None,
        Ok(reply) => Some(reply.to_string()),
        Err(e) => Some(format!("{} error: {}", label, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::TreeConfig;
    use tempfile::tempdir;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("").unwrap(), None);
        assert_eq!(Command::parse("   ").unwrap(), None);
        assert_eq!(
            Command::parse("  search  apple ").unwrap(),
            Some(Command::Search {
                key: "apple".to_string()
            })
        );
        assert_eq!(
            Command::parse("insert k -12").unwrap(),
            Some(Command::Insert {
                key: "k".to_string(),
                value: -12
            })
        );
        assert_eq!(Command::parse("exit").unwrap(), Some(Command::Exit));
        assert_eq!(Command::parse("scan").unwrap(), Some(Command::Scan));
    }

    #[test]
    fn test_parse_errors() {
        let msg = |line: &str| Command::parse(line).unwrap_err().to_string();

        assert!(msg("insert k").contains("Usage: insert <key> <int-value>"));
        assert!(msg("insert k v").contains("must be an integer"));
        assert!(msg("search").contains("Usage: search <key>"));
        assert!(msg("search a b").contains("Usage: search <key>"));
        assert!(msg("exit now").contains("Usage: exit"));
        assert!(msg("drop table").contains("Unknown command"));
    }

    #[test]
    fn test_run_line_session() {
        let dir = tempdir().unwrap();
        let mut tree = BPlusTree::open(
            dir.path().join("shell.db"),
            TreeConfig::default().with_max_entries(4),
        )
        .unwrap();

        assert_eq!(
            run_line(&mut tree, "insert a 1").as_deref(),
            Some("Inserted successfully.")
        );
        assert_eq!(run_line(&mut tree, "search a").as_deref(), Some("Found: 1"));
        assert_eq!(
            run_line(&mut tree, "search b").as_deref(),
            Some("Key not found.")
        );
        assert_eq!(
            run_line(&mut tree, "insert b x").as_deref(),
            Some("Invalid value; must be an integer")
        );
        run_line(&mut tree, "insert b 2");
        assert_eq!(run_line(&mut tree, "scan").as_deref(), Some("a = 1\nb = 2"));
        assert!(run_line(&mut tree, "stats")
            .unwrap()
            .starts_with("TreeStats { height: 1"));
        assert_eq!(run_line(&mut tree, "exit"), None);
    }

    #[test]
    fn test_zero_value_is_found() {
        let dir = tempdir().unwrap();
        let mut tree = BPlusTree::open(dir.path().join("shell.db"), TreeConfig::default()).unwrap();

        run_line(&mut tree, "insert z 0");
        assert_eq!(run_line(&mut tree, "search z").as_deref(), Some("Found: 0"));
    }
}
