//! Typed REPL input.

use std::path::PathBuf;

use shared::domain::DocumentId;
use thiserror::Error;

pub const HELP: &str = "\
commands:
  /list            show the document catalog
  /open <id|#n>    open a document by id or by catalog position
  /close           leave the current document
  /upload <path>   upload a file and open it
  /reset           start a new conversation
  /status          show the current session
  /help            show this help
  /quit            exit
anything else is sent as a chat message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenTarget {
    Id(DocumentId),
    /// 1-based position in the listing printed by `/list`.
    Position(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Open(OpenTarget),
    Close,
    Upload(PathBuf),
    Reset,
    Status,
    Help,
    Quit,
    Message(String),
    Nothing,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command /{0}, try /help")]
    Unknown(String),
    #[error("/{0} needs an argument")]
    MissingArgument(&'static str),
    #[error("invalid catalog position '{0}'")]
    InvalidPosition(String),
}

pub fn parse_line(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Nothing);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Message(line.to_string()));
    };

    let (name, argument) = match rest.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument.trim()),
        None => (rest, ""),
    };

    match name {
        "list" | "ls" => Ok(Command::List),
        "open" => parse_open(argument).map(Command::Open),
        "close" => Ok(Command::Close),
        "upload" => {
            if argument.is_empty() {
                return Err(CommandError::MissingArgument("upload"));
            }
            Ok(Command::Upload(PathBuf::from(argument)))
        }
        "reset" => Ok(Command::Reset),
        "status" => Ok(Command::Status),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn parse_open(argument: &str) -> Result<OpenTarget, CommandError> {
    if argument.is_empty() {
        return Err(CommandError::MissingArgument("open"));
    }
    match argument.strip_prefix('#') {
        Some(position) => match position.parse::<usize>() {
            Ok(position) if position > 0 => Ok(OpenTarget::Position(position)),
            _ => Err(CommandError::InvalidPosition(argument.to_string())),
        },
        None => Ok(OpenTarget::Id(DocumentId::new(argument))),
    }
}
