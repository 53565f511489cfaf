// config.rs

use std::env;
use std::path::PathBuf;

pub const HISTORY_SIZE: usize = 10;
pub const MAX_LINE: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub history_size: usize,
    /// Capacity of the edit buffer in bytes; input past it is dropped.
    pub max_line_len: usize,
    pub history_file: Option<PathBuf>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            history_size: HISTORY_SIZE,
            max_line_len: MAX_LINE,
            history_file: None,
        }
    }
}

impl ShellConfig {
    pub fn from_env() -> Self {
        Self::from_histfile(env::var_os("HISTFILE").map(PathBuf::from))
    }

    fn from_histfile(histfile: Option<PathBuf>) -> Self {
        Self {
            history_file: histfile.filter(|p| !p.as_os_str().is_empty()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_limits() {
        let config = ShellConfig::default();
        assert_eq!(config.history_size, 10);
        assert_eq!(config.max_line_len, 80);
        assert!(config.history_file.is_none());
    }

    #[test]
    fn empty_histfile_is_ignored() {
        assert!(ShellConfig::from_histfile(Some(PathBuf::new())).history_file.is_none());
        let config = ShellConfig::from_histfile(Some(PathBuf::from("/tmp/h")));
        assert_eq!(config.history_file, Some(PathBuf::from("/tmp/h")));
    }
}
