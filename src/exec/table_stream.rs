// src/exec/table_stream.rs

//! Incremental parser for left-aligned columnar text output.
//!
//! Many external tools emit tables where the only reliable way to split a
//! data row into cells is the character offset at which each header label
//! begins; data values may themselves contain single spaces, so splitting
//! rows on whitespace is wrong. The first line is treated as the header,
//! separated by runs of two-or-more spaces or a tab, and every later line is
//! sliced at the recorded header offsets.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::trace;

/// Column boundaries detected from a header line, as character offsets.
#[derive(Debug, Clone)]
pub struct ColumnLayout {
    offsets: Vec<usize>,
}

impl ColumnLayout {
    /// Split a header line into its labels and record where each begins.
    ///
    /// Labels are separated by two-or-more spaces or a tab; a single space
    /// stays inside a label. Each label's offset is found by searching
    /// forward from the end of the previous label, which tolerates
    /// variable-width padding and keeps offsets strictly increasing.
    ///
    /// A header that yields no labels is an error: there is no usable
    /// column layout to slice data rows with.
    pub fn from_header(line: &str) -> Result<(Self, Vec<String>)> {
        let separator = Regex::new(r"  +|\t").context("building header separator pattern")?;
        let tokens: Vec<&str> = separator
            .split(line)
            .filter(|t| !t.trim().is_empty())
            .collect();
        if tokens.is_empty() {
            bail!("table header has no columns: {line:?}");
        }

        let mut offsets = Vec::with_capacity(tokens.len());
        let mut search_from = 0;
        for token in &tokens {
            let found = line[search_from..]
                .find(token)
                .with_context(|| format!("header label {token:?} not found in {line:?}"))?;
            let byte_offset = search_from + found;
            offsets.push(line[..byte_offset].chars().count());
            search_from = byte_offset + token.len();
        }

        let headers = tokens.iter().map(|t| t.to_string()).collect();
        Ok((Self { offsets }, headers))
    }

    /// Slice a data line at the header offsets, trimming each cell.
    ///
    /// The last column takes the remainder of the line. Lines shorter than
    /// the full offset set yield empty trailing cells; slice bounds are
    /// clamped to the line length so over-wide values in earlier columns
    /// never cause an error.
    pub fn split_row(&self, line: &str) -> Vec<String> {
        let chars: Vec<char> = line.chars().collect();
        let mut cells = Vec::with_capacity(self.offsets.len());
        for (i, &offset) in self.offsets.iter().enumerate() {
            let end = self
                .offsets
                .get(i + 1)
                .copied()
                .unwrap_or(chars.len())
                .min(chars.len());
            let beg = offset.min(end);
            let cell: String = chars[beg..end].iter().collect();
            cells.push(cell.trim().to_string());
        }
        cells
    }
}

/// Spawn a task that parses `pipe` as a columnar table, delivering one row at
/// a time to `handler` as lines arrive.
///
/// The handler receives the 1-based line number and the row cells; row 1 is
/// the header labels, every later row is data sliced at the header offsets.
/// An entirely blank line is treated as end-of-output. An unsplittable
/// header is fatal for the invocation and surfaces when it is joined.
pub fn spawn_table_rows<R, F>(pipe: R, mut handler: F) -> JoinHandle<Result<()>>
where
    R: AsyncRead + Unpin + Send + 'static,
    F: FnMut(usize, Vec<String>) + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(pipe).lines();
        let mut layout: Option<ColumnLayout> = None;
        let mut line_number = 0;

        while let Some(line) = lines
            .next_line()
            .await
            .context("reading table line from child pipe")?
        {
            let line = line.trim_end();
            if line.is_empty() {
                trace!(line_number, "blank line ends table output");
                break;
            }
            line_number += 1;

            match &layout {
                None => {
                    let (detected, headers) = ColumnLayout::from_header(line)?;
                    handler(line_number, headers);
                    layout = Some(detected);
                }
                Some(layout) => handler(line_number, layout.split_row(line)),
            }
        }
        Ok(())
    })
}

/// Accumulates streamed table rows for callers that want the whole table.
#[derive(Debug, Default)]
pub struct RowCollector {
    pub headers: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
}

impl RowCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row handler that records the header once and appends every data row.
    pub fn handler(this: Arc<Mutex<Self>>) -> impl FnMut(usize, Vec<String>) + Send + 'static {
        move |line_number, row| {
            let mut collector = this.lock().unwrap();
            if line_number == 1 {
                if collector.headers.is_none() {
                    collector.headers = Some(row);
                }
            } else {
                collector.rows.push(row);
            }
        }
    }
}
