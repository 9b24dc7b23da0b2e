//! Per-SM profiling records and the timeline built from them.
//!
//! A traced kernel invocation produces one [`SmTraceRecord`] per block. Each
//! record is printed as a diagnostic line
//!
//! ```text
//! - <sm> <sm> <mode> <threads> <start-cycle> <end-cycle>
//! ```
//!
//! and [`Timeline`] reads those lines back, rebasing cycle counts per mode so
//! that the earliest start of every mode is cycle 0.

use std::collections::BTreeMap;

/// Profiling data of one block, recorded by thread (0, 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmTraceRecord {
    /// Physical SM the block executed on.
    pub sm_id: u32,
    /// Threads per block.
    pub threads: u32,
    /// Device cycle counter at kernel entry.
    pub start: u64,
    /// Device cycle counter after the last tile.
    pub end: u64,
}

impl SmTraceRecord {
    /// Number of `u64` words one record occupies in a device trace buffer.
    pub const WORDS: usize = 4;

    /// Decode the `[sm_id, threads, start, end]` layout written by the traced kernel.
    pub fn from_words(words: &[u64]) -> Option<Self> {
        match *words {
            [sm_id, threads, start, end] => Some(Self {
                sm_id: u32::try_from(sm_id).ok()?,
                threads: u32::try_from(threads).ok()?,
                start,
                end,
            }),
            _ => None,
        }
    }

    /// Diagnostic line for this record.
    pub fn to_line(&self, mode: &str) -> String {
        format!(
            "- {} {} {} {} {} {}",
            self.sm_id, self.sm_id, mode, self.threads, self.start, self.end
        )
    }
}

/// A parsed diagnostic line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceLine {
    pub mode: String,
    pub record: SmTraceRecord,
}

impl TraceLine {
    /// Parse one line. Lines that do not start with `-` or do not carry the
    /// six fields are not trace lines and yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.strip_prefix('-')?;
        let fields: Vec<&str> = rest.split_whitespace().collect();
        let [sm, _sm_again, mode, threads, start, end] = fields.as_slice() else {
            return None;
        };
        Some(Self {
            mode: (*mode).to_string(),
            record: SmTraceRecord {
                sm_id: sm.parse().ok()?,
                threads: threads.parse().ok()?,
                start: start.parse().ok()?,
                end: end.parse().ok()?,
            },
        })
    }
}

/// One block's execution interval, relative to its mode's earliest start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmSpan {
    pub start: u64,
    pub end: u64,
}

/// Trace records grouped by mode (first-seen order) and SM.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    modes: Vec<(String, BTreeMap<u32, Vec<SmSpan>>)>,
}

impl Timeline {
    /// Build a timeline from arbitrary text, ignoring non-trace lines.
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut raw: Vec<(String, BTreeMap<u32, Vec<SmSpan>>)> = Vec::new();
        for line in lines {
            let Some(TraceLine { mode, record }) = TraceLine::parse(line) else {
                continue;
            };
            let idx = match raw.iter().position(|(name, _)| *name == mode) {
                Some(idx) => idx,
                None => {
                    raw.push((mode, BTreeMap::new()));
                    raw.len() - 1
                }
            };
            raw[idx].1.entry(record.sm_id).or_default().push(SmSpan {
                start: record.start,
                end: record.end,
            });
        }

        // Earliest start of each mode becomes cycle 0.
        for (_, per_sm) in raw.iter_mut() {
            let base = per_sm
                .values()
                .flatten()
                .map(|span| span.start)
                .min()
                .unwrap_or(0);
            for span in per_sm.values_mut().flatten() {
                span.start -= base;
                span.end = span.end.saturating_sub(base);
            }
        }

        Self { modes: raw }
    }

    /// Mode names in first-seen order.
    pub fn modes(&self) -> impl Iterator<Item = &str> {
        self.modes.iter().map(|(name, _)| name.as_str())
    }

    /// Spans of `mode`, keyed by SM id.
    pub fn spans(&self, mode: &str) -> Option<&BTreeMap<u32, Vec<SmSpan>>> {
        self.modes
            .iter()
            .find(|(name, _)| name == mode)
            .map(|(_, per_sm)| per_sm)
    }

    /// Total number of spans across all modes.
    pub fn len(&self) -> usize {
        self.modes
            .iter()
            .map(|(_, per_sm)| per_sm.values().map(Vec::len).sum::<usize>())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Largest rebased end cycle of `mode`.
    pub fn makespan(&self, mode: &str) -> Option<u64> {
        self.spans(mode)?
            .values()
            .flatten()
            .map(|span| span.end)
            .max()
    }
}
