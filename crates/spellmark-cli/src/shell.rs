//! Line commands for the interactive shell and how its output is drawn.

use std::num::ParseIntError;
use std::ops::Range;

use spellmark_core::{AnchorPoint, MenuView};
use thiserror::Error;

pub const HELP: &str = "\
commands:
  show                  print the document with highlights in [brackets]
  type <text>           append text
  insert <at> <text>    insert text at a char offset
  delete <start> <end>  delete a char range
  click <at>            click the character at a char offset
  escape                close the menu
  accept <n>            replace the selected token with suggestion n
  ignore                ignore the selected token for this session
  dict                  add the selected token to the dictionary
  help                  show this text
  quit                  exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Show,
    Insert { at: Option<usize>, text: String },
    Delete(Range<usize>),
    Click(usize),
    Escape,
    /// One-based index into the menu's suggestions.
    Accept(usize),
    Ignore,
    Dict,
    Help,
    Quit,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum CommandError {
    #[error("unknown command `{0}`, try `help`")]
    Unknown(String),

    #[error("`{command}` needs {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },

    #[error("`{arg}` is not a number: {source}")]
    InvalidNumber {
        arg: String,
        #[source]
        source: ParseIntError,
    },

    #[error("range {start}..{end} is backwards")]
    BackwardsRange { start: usize, end: usize },
}

impl Command {
    /// Parse one input line. A blank line shows the document.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (word, rest) = match line.trim_start().split_once(' ') {
            Some((word, rest)) => (word, rest),
            None => (line.trim(), ""),
        };
        match word {
            "" | "show" => Ok(Self::Show),
            "type" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "type",
                        what: "some text",
                    });
                }
                Ok(Self::Insert {
                    at: None,
                    text: rest.to_owned(),
                })
            }
            "insert" => {
                let (at, text) = rest.split_once(' ').ok_or(CommandError::MissingArgument {
                    command: "insert",
                    what: "an offset and some text",
                })?;
                Ok(Self::Insert {
                    at: Some(number(at)?),
                    text: text.to_owned(),
                })
            }
            "delete" => {
                let mut args = rest.split_whitespace();
                let (Some(start), Some(end)) = (args.next(), args.next()) else {
                    return Err(CommandError::MissingArgument {
                        command: "delete",
                        what: "a start and end offset",
                    });
                };
                let (start, end) = (number(start)?, number(end)?);
                if end < start {
                    return Err(CommandError::BackwardsRange { start, end });
                }
                Ok(Self::Delete(start..end))
            }
            "click" => Ok(Self::Click(number(required(rest, "click", "an offset")?)?)),
            "accept" => Ok(Self::Accept(number(required(
                rest,
                "accept",
                "a suggestion number",
            )?)?)),
            "escape" | "esc" => Ok(Self::Escape),
            "ignore" => Ok(Self::Ignore),
            "dict" => Ok(Self::Dict),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(CommandError::Unknown(other.to_owned())),
        }
    }
}

fn required<'a>(
    rest: &'a str,
    command: &'static str,
    what: &'static str,
) -> Result<&'a str, CommandError> {
    rest.split_whitespace()
        .next()
        .ok_or(CommandError::MissingArgument { command, what })
}

fn number(arg: &str) -> Result<usize, CommandError> {
    arg.trim()
        .parse()
        .map_err(|source| CommandError::InvalidNumber {
            arg: arg.to_owned(),
            source,
        })
}

/// Terminal cell of a char offset: column as x, line as y.
pub fn anchor_for(text: &str, char_offset: usize) -> AnchorPoint {
    let mut line = 0usize;
    let mut column = 0usize;
    for c in text.chars().take(char_offset) {
        if c == '\n' {
            line += 1;
            column = 0;
        } else {
            column += 1;
        }
    }
    AnchorPoint::new(column as f64, line as f64)
}

pub fn render_menu(menu: &MenuView) -> String {
    let mut out = match &menu.token {
        Some(token) => format!(
            "\"{token}\" at line {}, column {}",
            menu.anchor.y, menu.anchor.x
        ),
        None => format!("(gone) at line {}, column {}", menu.anchor.y, menu.anchor.x),
    };
    if menu.suggestions.is_empty() {
        out.push_str("\n  no suggestions");
    }
    for (i, suggestion) in menu.suggestions.iter().enumerate() {
        out.push_str(&format!("\n  {}. {suggestion}", i + 1));
    }
    out.push_str("\n  ignore | dict | escape");
    out
}
