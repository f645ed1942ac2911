//! Picking a topic from the local trend list.

use std::io;
use std::path::{Path, PathBuf};

use rand::seq::IndexedRandom;
use tracing::{error, info, warn};

use crate::error::TrendError;

/// Where the topic for a run comes from.
#[derive(Clone, Debug)]
pub enum TopicSource {
    /// Always use this topic
    Fixed(String),
    /// Pick at random from this CSV file
    File(PathBuf),
}

impl TopicSource {
    /// Yields the topic for this run.
    pub fn select<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> Result<String, TrendError> {
        match self {
            Self::Fixed(topic) => {
                info!("Using fixed topic: {topic}");
                Ok(topic.clone())
            }
            Self::File(path) => select_trend(path, rng),
        }
    }
}

/// Reads the trends file and returns one entry from its first column at random.
pub fn select_trend<R: rand::Rng + ?Sized>(path: &Path, rng: &mut R) -> Result<String, TrendError> {
    let trends = match load_trends(path) {
        Ok(trends) => trends,
        Err(err) => {
            match &err {
                TrendError::Empty(_) => warn!("{err}"),
                _ => error!("{err}"),
            }
            return Err(err);
        }
    };
    let selected = trends
        .choose(rng)
        .cloned()
        .ok_or_else(|| TrendError::Empty(path.to_path_buf()))?;
    info!("Selected Trend from CSV: {selected}");
    Ok(selected)
}

/// Reads every topic from the trends file, skipping the header row and blank lines.
pub fn load_trends(path: &Path) -> Result<Vec<String>, TrendError> {
    let raw = std::fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => TrendError::NotFound(path.to_path_buf()),
        _ => TrendError::Read {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let trends: Vec<String> = first_fields(&raw).into_iter().skip(1).collect();

    if trends.is_empty() {
        return Err(TrendError::Empty(path.to_path_buf()));
    }
    Ok(trends)
}

/// First field of every CSV record, in order, header included.
///
/// Quoted fields may hold commas, `""` escapes and line breaks. Blank
/// records are dropped.
fn first_fields(raw: &str) -> Vec<String> {
    let mut records = Vec::new();
    let mut field = String::new();
    let mut in_first = true;
    let mut in_quotes = false;
    let mut has_content = false;

    let mut chars = raw.trim_start_matches('\u{feff}').chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    if in_first {
                        field.push('"');
                    }
                } else {
                    in_quotes = false;
                }
            } else if in_first {
                field.push(c);
            }
            continue;
        }

        match c {
            '"' => {
                in_quotes = true;
                has_content = true;
            }
            ',' => {
                in_first = false;
                has_content = true;
            }
            '\r' => {}
            '\n' => {
                if has_content {
                    records.push(std::mem::take(&mut field));
                }
                field.clear();
                in_first = true;
                has_content = false;
            }
            _ => {
                if in_first {
                    field.push(c);
                }
                has_content |= !c.is_whitespace();
            }
        }
    }
    if has_content {
        records.push(field);
    }
    records
}
