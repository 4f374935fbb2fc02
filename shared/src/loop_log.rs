//! Plain-text per-process log of loop signatures.
//!
//! ```text
//! [<loop index>]
//! (<iteration> <iteration> ...)
//! <send count>
//! <recv count>
//! <source sum>
//! <dest sum>
//! <source xor>
//! <dest xor>
//! ...
//! time <wall seconds>
//! ```

use std::io::{self, BufRead, Write};

use thiserror::Error;

use crate::{IterationGroup, Loop, Values};

const TIME_PREFIX: &str = "time ";

/// Errors that can occur while reading a per-process loop log
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoopLogError {
    /// The log ended in the middle of a group
    #[error("Loop log ended at line {line} in the middle of an iteration group. The file was probably cut short while being written")]
    UnexpectedEof { line: usize },

    /// A line could not be interpreted
    #[error("Malformed loop log line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    /// Reading the underlying source failed
    #[error("Failed to read loop log: {reason}")]
    Io { reason: String },
}

impl From<io::Error> for LoopLogError {
    fn from(error: io::Error) -> Self {
        LoopLogError::Io {
            reason: error.to_string(),
        }
    }
}

/// Appends one loop dump to `writer`
pub fn write_loop<W: Write>(writer: &mut W, lp: &Loop) -> io::Result<()> {
    writeln!(writer, "[{}]", lp.index)?;
    for group in &lp.groups {
        let indices: Vec<String> = group.iterations.iter().map(u64::to_string).collect();
        writeln!(writer, "({})", indices.join(" "))?;
        let values = &group.values;
        for field in [
            values.send_count,
            values.recv_count,
            values.source_sum,
            values.dest_sum,
            values.source_xor,
            values.dest_xor,
        ] {
            writeln!(writer, "{}", field)?;
        }
    }
    if let Some(seconds) = lp.wall_seconds {
        writeln!(writer, "{}{}", TIME_PREFIX, seconds)?;
    }
    Ok(())
}

/// Reads every loop dump from `reader`, in file order
pub fn read_loops<R: BufRead>(reader: R) -> Result<Vec<Loop>, LoopLogError> {
    let mut lines = Vec::new();
    for line in reader.lines() {
        lines.push(line?);
    }
    parse_lines(lines.iter().map(String::as_str))
}

/// Parses every loop dump in `text`, in file order
pub fn parse_loops(text: &str) -> Result<Vec<Loop>, LoopLogError> {
    parse_lines(text.lines())
}

fn parse_lines<'a, I: Iterator<Item = &'a str>>(lines: I) -> Result<Vec<Loop>, LoopLogError> {
    let mut loops: Vec<Loop> = Vec::new();
    let mut numbered = lines
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());
    let mut last_line = 0;

    while let Some((line_no, line)) = numbered.next() {
        last_line = line_no;

        if let Some(inner) = strip_delimiters(line, '[', ']') {
            let index = parse_number(inner, line_no)?;
            loops.push(Loop::new(index));
            continue;
        }

        let current = loops.last_mut().ok_or_else(|| LoopLogError::Malformed {
            line: line_no,
            reason: "content before the first [<loop index>] marker".to_string(),
        })?;

        if let Some(seconds) = line.strip_prefix(TIME_PREFIX) {
            let seconds = seconds.trim().parse::<f64>().map_err(|_| LoopLogError::Malformed {
                line: line_no,
                reason: format!("'{}' is not a wall time in seconds", seconds.trim()),
            })?;
            current.wall_seconds = Some(seconds);
            continue;
        }

        let Some(inner) = strip_delimiters(line, '(', ')') else {
            return Err(LoopLogError::Malformed {
                line: line_no,
                reason: format!("expected '(<iterations>)', '[<loop index>]' or 'time', found '{}'", line),
            });
        };

        let iterations = inner
            .split_whitespace()
            .map(|token| parse_number(token, line_no))
            .collect::<Result<Vec<u64>, LoopLogError>>()?;
        if iterations.is_empty() {
            return Err(LoopLogError::Malformed {
                line: line_no,
                reason: "iteration group lists no iterations".to_string(),
            });
        }

        let mut fields = [0u64; 6];
        for field in fields.iter_mut() {
            let (field_line, text) = numbered
                .next()
                .ok_or(LoopLogError::UnexpectedEof { line: last_line })?;
            last_line = field_line;
            *field = parse_number(text, field_line)?;
        }

        current.groups.push(IterationGroup {
            values: Values {
                send_count: fields[0],
                recv_count: fields[1],
                source_sum: fields[2],
                dest_sum: fields[3],
                source_xor: fields[4],
                dest_xor: fields[5],
            },
            iterations,
        });
    }

    Ok(loops)
}

fn strip_delimiters(line: &str, open: char, close: char) -> Option<&str> {
    line.strip_prefix(open)?.strip_suffix(close)
}

fn parse_number(text: &str, line: usize) -> Result<u64, LoopLogError> {
    text.trim().parse::<u64>().map_err(|_| LoopLogError::Malformed {
        line,
        reason: format!("'{}' is not a non-negative integer", text.trim()),
    })
}
