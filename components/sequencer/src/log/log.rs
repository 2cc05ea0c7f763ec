use std::sync::Arc;
use std::sync::Mutex;

#[cfg(test)]
#[path = "./tests/log_tests.rs"]
mod tests;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub version: u64,
    pub data: Vec<u8>,
}

/// MemLog is an append-only, versioned, in-memory log.
/// Only the consensus loop appends; any number of independent `LogReader`
/// cursors replay committed entries concurrently.
pub struct MemLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemLog {
    pub fn new() -> Arc<MemLog> {
        Arc::new(MemLog {
            entries: Mutex::new(Vec::new()),
        })
    }

    pub fn append(&self, version: u64, data: Vec<u8>) {
        let mut entries = self.entries.lock().unwrap();
        entries.push(LogEntry { version, data });
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, at: usize) -> Option<LogEntry> {
        self.entries.lock().unwrap().get(at).cloned()
    }

    /// reader returns a cursor positioned before the first entry.
    pub fn reader(self: &Arc<Self>) -> LogReader {
        LogReader {
            log: self.clone(),
            at: 0,
            cur: None,
        }
    }
}

/// LogReader is a replayable cursor over one MemLog.
/// `version()`/`entry()` refer to the entry the last successful `next()`
/// moved onto.
pub struct LogReader {
    log: Arc<MemLog>,
    at: usize,
    cur: Option<LogEntry>,
}

impl LogReader {
    /// next advances to the following committed entry.
    /// Returns false (and keeps the cursor) when the log end is reached.
    pub fn next(&mut self) -> bool {
        match self.log.get(self.at) {
            Some(e) => {
                self.at += 1;
                self.cur = Some(e);
                true
            }
            None => false,
        }
    }

    pub fn version(&self) -> u64 {
        self.cur.as_ref().map(|e| e.version).unwrap_or(0)
    }

    pub fn entry(&self) -> &[u8] {
        self.cur.as_ref().map(|e| e.data.as_slice()).unwrap_or(&[])
    }
}
