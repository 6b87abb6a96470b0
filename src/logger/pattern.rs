//! Pattern formatter: compiles spdlog-style `%` tokens once and renders records.
//!
//! Supported tokens: `%Y %m %d %H %M %S %e` (date/time, `%e` = milliseconds),
//! `%l` level name, `%L` level letter, `%n` logger name, `%t` thread id,
//! `%P` process id, `%v` message, `%^`/`%$` colour range, `%%` literal percent.
//! Unknown tokens are emitted verbatim.

#![allow(missing_docs)]

use std::fmt::Write as _;
use std::ops::Range;

use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::logger::sink::Record;

/// Clock used when rendering timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeMode {
    #[default]
    Local,
    Utc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Millis,
    LevelName,
    LevelLetter,
    LoggerName,
    Thread,
    Pid,
    Message,
    ColorStart,
    ColorEnd,
}

/// A rendered line plus the byte range the console sink may colour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedLine {
    pub text: String,
    pub color_range: Option<Range<usize>>,
}

/// Compiled pattern bound to a time mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternFormatter {
    source: String,
    time_mode: TimeMode,
    tokens: Vec<Token>,
}

impl PatternFormatter {
    #[must_use]
    pub fn new(pattern: &str, time_mode: TimeMode) -> Self {
        Self {
            source: pattern.to_string(),
            time_mode,
            tokens: compile(pattern),
        }
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub const fn time_mode(&self) -> TimeMode {
        self.time_mode
    }

    /// Render one record, newline-terminated.
    #[must_use]
    pub fn format(&self, record: &Record) -> FormattedLine {
        let stamp: NaiveDateTime = match self.time_mode {
            TimeMode::Utc => record.time.naive_utc(),
            TimeMode::Local => record.time.with_timezone(&Local).naive_local(),
        };

        let mut text = String::with_capacity(self.source.len() + record.message.len() + 32);
        let mut color_start = None;
        let mut color_end = None;

        for token in &self.tokens {
            // Writing into a String cannot fail.
            let _ = match token {
                Token::Literal(lit) => {
                    text.push_str(lit);
                    Ok(())
                }
                Token::Year => write!(text, "{:04}", stamp.year()),
                Token::Month => write!(text, "{:02}", stamp.month()),
                Token::Day => write!(text, "{:02}", stamp.day()),
                Token::Hour => write!(text, "{:02}", stamp.hour()),
                Token::Minute => write!(text, "{:02}", stamp.minute()),
                Token::Second => write!(text, "{:02}", stamp.second()),
                Token::Millis => write!(text, "{:03}", (stamp.nanosecond() / 1_000_000).min(999)),
                Token::LevelName => {
                    text.push_str(record.level.name());
                    Ok(())
                }
                Token::LevelLetter => {
                    text.push(record.level.letter());
                    Ok(())
                }
                Token::LoggerName => {
                    text.push_str(&record.logger);
                    Ok(())
                }
                Token::Thread => write!(text, "{}", record.thread_id),
                Token::Pid => write!(text, "{}", std::process::id()),
                Token::Message => {
                    text.push_str(&record.message);
                    Ok(())
                }
                Token::ColorStart => {
                    color_start = Some(text.len());
                    Ok(())
                }
                Token::ColorEnd => {
                    color_end = Some(text.len());
                    Ok(())
                }
            };
        }
        text.push('\n');

        let color_range = match (color_start, color_end) {
            (Some(start), Some(end)) if start < end => Some(start..end),
            _ => None,
        };
        FormattedLine { text, color_range }
    }
}

fn compile(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = pattern.chars();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            literal.push(ch);
            continue;
        }
        let Some(flag) = chars.next() else {
            literal.push('%');
            break;
        };
        let token = match flag {
            'Y' => Token::Year,
            'm' => Token::Month,
            'd' => Token::Day,
            'H' => Token::Hour,
            'M' => Token::Minute,
            'S' => Token::Second,
            'e' => Token::Millis,
            'l' => Token::LevelName,
            'L' => Token::LevelLetter,
            'n' => Token::LoggerName,
            't' => Token::Thread,
            'P' => Token::Pid,
            'v' => Token::Message,
            '^' => Token::ColorStart,
            '$' => Token::ColorEnd,
            '%' => {
                literal.push('%');
                continue;
            }
            other => {
                literal.push('%');
                literal.push(other);
                continue;
            }
        };
        if !literal.is_empty() {
            tokens.push(Token::Literal(std::mem::take(&mut literal)));
        }
        tokens.push(token);
    }
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    tokens
}
