//! Human-readable event log, newest entry first.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::narrator::CascadeId;

/// One line of the event log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    /// Simulated hour when the line was written.
    pub hour: u32,
    /// Dispatch that produced the line, if any.
    pub cascade: Option<CascadeId>,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}

/// Log line tagged with the push that wrote it.
#[derive(Debug, Clone)]
struct Slot {
    block: u64,
    entry: LogEntry,
}

/// Event log with an optional size cap.
///
/// Every push forms a block (a single line or a narrative block). Blocks are
/// stored newest first with their lines in reading order, so a block's
/// headline sits above its body.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    slots: VecDeque<Slot>,
    next_block: u64,
    max_entries: Option<usize>,
}

impl EventLog {
    /// Creates a log; `max_entries == 0` means unbounded.
    pub fn new(max_entries: usize) -> Self {
        Self {
            slots: VecDeque::new(),
            next_block: 0,
            max_entries: (max_entries > 0).then_some(max_entries),
        }
    }

    /// Prepends a single entry.
    pub fn push(&mut self, entry: LogEntry) {
        self.push_block(vec![entry]);
    }

    /// Prepends a block, keeping the block's own order so its headline ends
    /// up on top.
    pub fn push_block(&mut self, block: Vec<LogEntry>) {
        let id = self.next_block;
        self.next_block += 1;
        for entry in block.into_iter().rev() {
            self.slots.push_front(Slot { block: id, entry });
        }
        if let Some(max) = self.max_entries {
            self.slots.truncate(max);
        }
    }

    /// Entries, newest block first.
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &LogEntry> + ExactSizeIterator {
        self.slots.iter().map(|s| &s.entry)
    }

    /// Entries in the order they were written: oldest block first, each
    /// block headline first.
    pub fn chronological(&self) -> Vec<&LogEntry> {
        let mut out = Vec::with_capacity(self.slots.len());
        let mut end = self.slots.len();
        while end > 0 {
            let block = self.slots[end - 1].block;
            let mut start = end - 1;
            while start > 0 && self.slots[start - 1].block == block {
                start -= 1;
            }
            out.extend(self.slots.range(start..end).map(|s| &s.entry));
            end = start;
        }
        out
    }

    /// The `n` newest entries.
    pub fn latest(&self, n: usize) -> impl Iterator<Item = &LogEntry> {
        self.entries().take(n)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Number of entries produced by `cascade`.
    pub fn count_for(&self, cascade: CascadeId) -> usize {
        self.entries().filter(|e| e.cascade == Some(cascade)).count()
    }

    /// Returns `true` if any entry's message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.entries().any(|e| e.message.contains(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(message: &str) -> LogEntry {
        LogEntry {
            timestamp: Utc.with_ymd_and_hms(2024, 7, 1, 14, 5, 9).unwrap(),
            hour: 0,
            cascade: None,
            message: message.to_string(),
        }
    }

    #[test]
    fn newest_entry_first() {
        let mut log = EventLog::new(0);
        log.push(entry("one"));
        log.push(entry("two"));
        let messages: Vec<_> = log.entries().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["two", "one"]);
    }

    #[test]
    fn block_keeps_headline_on_top() {
        let mut log = EventLog::new(0);
        log.push(entry("older"));
        log.push_block(vec![entry("headline"), entry("├─ detail"), entry("└─ last")]);
        let messages: Vec<_> = log.entries().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["headline", "├─ detail", "└─ last", "older"]);
    }

    #[test]
    fn chronological_keeps_blocks_readable() {
        let mut log = EventLog::new(0);
        log.push(entry("first"));
        log.push_block(vec![entry("headline"), entry("├─ detail"), entry("└─ last")]);
        log.push(entry("between"));
        log.push_block(vec![entry("second headline"), entry("└─ end")]);
        let messages: Vec<_> = log.chronological().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "first",
                "headline",
                "├─ detail",
                "└─ last",
                "between",
                "second headline",
                "└─ end"
            ]
        );
    }

    #[test]
    fn chronological_survives_a_truncated_block() {
        let mut log = EventLog::new(3);
        log.push_block(vec![entry("old headline"), entry("├─ a"), entry("└─ b")]);
        log.push(entry("new"));
        let messages: Vec<_> = log.chronological().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["old headline", "├─ a", "new"]);
    }

    #[test]
    fn cap_evicts_oldest() {
        let mut log = EventLog::new(2);
        log.push(entry("a"));
        log.push(entry("b"));
        log.push(entry("c"));
        let messages: Vec<_> = log.entries().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["c", "b"]);
    }

    #[test]
    fn display_uses_wall_clock_prefix() {
        assert_eq!(entry("hello").to_string(), "[14:05:09] hello");
    }
}
