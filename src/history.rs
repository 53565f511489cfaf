// history.rs

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Result of moving the browsing cursor towards newer entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Newer<'a> {
    Entry(&'a str),
    /// Stepped past the newest entry; the caller should show an empty line.
    Fresh,
    /// Already composing a fresh line.
    Unchanged,
}

/// Bounded command history with a browsing cursor.
///
/// Oldest entries are evicted once `capacity` is reached. The cursor is
/// `None` while a fresh line is being composed, otherwise it indexes a live
/// entry.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<String>,
    capacity: usize,
    cursor: Option<usize>,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            cursor: None,
        }
    }

    /// Records a submitted line. Empty lines leave both entries and cursor untouched.
    pub fn commit(&mut self, line: &str) {
        let line = line.trim_end_matches(&['\n', '\r'][..]);
        if line.is_empty() || self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(line.to_string());
        self.cursor = None;
    }

    pub fn older(&mut self) -> Option<&str> {
        let target = match self.cursor {
            None => self.entries.len().checked_sub(1)?,
            Some(0) => return None,
            Some(i) => i - 1,
        };
        self.cursor = Some(target);
        self.entries.get(target).map(String::as_str)
    }

    pub fn newer(&mut self) -> Newer<'_> {
        match self.cursor {
            None => Newer::Unchanged,
            Some(i) if i + 1 < self.entries.len() => {
                self.cursor = Some(i + 1);
                Newer::Entry(&self.entries[i + 1])
            }
            Some(_) => {
                self.cursor = None;
                Newer::Fresh
            }
        }
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn get(&self, n: usize) -> Option<&str> {
        self.entries.get(n).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Commits every non-blank line of `path`, so eviction applies as if typed.
    pub fn load_file(&mut self, path: &Path) -> io::Result<usize> {
        let reader = BufReader::new(File::open(path)?);
        let mut loaded = 0;
        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                self.commit(&line);
                loaded += 1;
            }
        }
        Ok(loaded)
    }

    pub fn save_file(&self, path: &Path) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        for entry in &self.entries {
            writeln!(out, "{}", entry)?;
        }
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(n: usize) -> History {
        let mut history = History::new(10);
        for i in 1..=n {
            history.commit(&format!("cmd{}", i));
        }
        history
    }

    #[test]
    fn eleventh_commit_evicts_oldest() {
        let history = filled(11);
        assert_eq!(history.len(), 10);
        let expected: Vec<String> = (2..=11).map(|i| format!("cmd{}", i)).collect();
        assert_eq!(history.iter().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn commit_strips_terminator_and_skips_empty() {
        let mut history = History::new(10);
        history.commit("ls\n");
        history.commit("\n");
        history.commit("");
        assert_eq!(history.len(), 1);
        assert_eq!(history.get(0), Some("ls"));
    }

    #[test]
    fn empty_commit_keeps_cursor() {
        let mut history = filled(3);
        history.older();
        history.older();
        assert_eq!(history.cursor(), Some(1));
        history.commit("");
        assert_eq!(history.cursor(), Some(1));
        history.commit("pwd");
        assert_eq!(history.cursor(), None);
    }

    #[test]
    fn older_stops_at_oldest_entry() {
        let mut history = filled(3);
        assert_eq!(history.older(), Some("cmd3"));
        assert_eq!(history.older(), Some("cmd2"));
        assert_eq!(history.older(), Some("cmd1"));
        assert_eq!(history.older(), None);
        assert_eq!(history.older(), None);
        assert_eq!(history.cursor(), Some(0));
    }

    #[test]
    fn newer_yields_fresh_once_then_unchanged() {
        let mut history = filled(2);
        history.older();
        history.older();
        assert_eq!(history.newer(), Newer::Entry("cmd2"));
        assert_eq!(history.newer(), Newer::Fresh);
        assert_eq!(history.newer(), Newer::Unchanged);
        assert_eq!(history.cursor(), None);
    }

    #[test]
    fn browsing_empty_history_is_a_no_op() {
        let mut history = History::new(10);
        assert_eq!(history.older(), None);
        assert_eq!(history.newer(), Newer::Unchanged);
        assert_eq!(history.cursor(), None);
    }

    #[test]
    fn history_file_load_applies_eviction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hist");
        let lines: Vec<String> = (1..=12).map(|i| format!("echo {}", i)).collect();
        std::fs::write(&path, format!("{}\n\n", lines.join("\n"))).unwrap();

        let mut history = History::new(10);
        assert_eq!(history.load_file(&path).unwrap(), 12);
        assert_eq!(history.get(0), Some("echo 3"));

        let saved = dir.path().join("saved");
        history.save_file(&saved).unwrap();
        let text = std::fs::read_to_string(&saved).unwrap();
        assert_eq!(text.lines().count(), 10);
        assert!(text.ends_with("echo 12\n"));
    }
}
