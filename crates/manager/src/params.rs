//! Parameter sources for generator-driven runs.
//!
//! A [`ParameterSource`] is a single-pass, pull-based sequence of
//! parameter maps, one per job submission. Sources cannot be rewound:
//! running a manager again from scratch needs a fresh source.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use crawlctl_core::error::CoreError;
use crawlctl_core::request::params_from_value;
use crawlctl_core::types::ParamMap;
use serde_json::Value;

/// Lazy sequence of parameter maps.
///
/// `None` means exhausted. An `Err` item is a malformed element and is
/// fatal to the run.
pub trait ParameterSource: Send {
    fn next_params(&mut self) -> Option<Result<ParamMap, CoreError>>;
}

// ---------------------------------------------------------------------------
// In-memory sources
// ---------------------------------------------------------------------------

/// Wraps any iterator of parameter maps. Infinite iterators are allowed
/// as long as the run has a concurrency bound.
pub struct IterParameters<I> {
    inner: I,
}

impl<I> IterParameters<I>
where
    I: Iterator<Item = ParamMap> + Send,
{
    pub fn new(inner: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            inner: inner.into_iter(),
        }
    }
}

impl<I> ParameterSource for IterParameters<I>
where
    I: Iterator<Item = ParamMap> + Send,
{
    fn next_params(&mut self) -> Option<Result<ParamMap, CoreError>> {
        self.inner.next().map(Ok)
    }
}

/// Wraps an iterator of raw JSON values; non-object values are malformed.
pub struct JsonValues<I> {
    inner: I,
}

impl<I> JsonValues<I>
where
    I: Iterator<Item = Value> + Send,
{
    pub fn new(inner: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            inner: inner.into_iter(),
        }
    }
}

impl<I> ParameterSource for JsonValues<I>
where
    I: Iterator<Item = Value> + Send,
{
    fn next_params(&mut self) -> Option<Result<ParamMap, CoreError>> {
        self.inner.next().map(params_from_value)
    }
}

// ---------------------------------------------------------------------------
// JSON-lines file
// ---------------------------------------------------------------------------

/// Reads one JSON object per line, on demand. Blank lines are skipped.
#[derive(Debug)]
pub struct JsonLinesParameters {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl JsonLinesParameters {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        Ok(Self {
            path,
            lines: BufReader::new(file).lines(),
            line_no: 0,
        })
    }

    fn malformed(&self, detail: impl std::fmt::Display) -> CoreError {
        CoreError::MalformedParameters(format!(
            "{}:{}: {detail}",
            self.path.display(),
            self.line_no
        ))
    }
}

impl ParameterSource for JsonLinesParameters {
    fn next_params(&mut self) -> Option<Result<ParamMap, CoreError>> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }

            let parsed = serde_json::from_str::<Value>(&line)
                .map_err(|e| self.malformed(e))
                .and_then(|value| params_from_value(value).map_err(|e| self.malformed(e)));
            return Some(parsed);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
