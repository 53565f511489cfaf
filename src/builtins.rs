// builtins.rs

use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, ShellError};
use crate::history::History;
use crate::parser::Builtin;

pub const FAREWELL: &str = "Exiting shell...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub fn run_builtin<W: Write>(
    builtin: &Builtin,
    history: &History,
    start_dir: &Path,
    out: &mut W,
) -> Result<Flow> {
    match builtin {
        Builtin::Exit => {
            ignore_broken_pipe(writeln!(out, "{}", FAREWELL))?;
            Ok(Flow::Exit)
        }
        Builtin::Cd(dir) => {
            let target = dir.as_ref().map_or_else(|| start_dir.to_path_buf(), PathBuf::from);
            env::set_current_dir(&target).map_err(|source| ShellError::ChangeDir {
                path: target,
                source,
            })?;
            Ok(Flow::Continue)
        }
        Builtin::History => {
            for (i, entry) in history.iter().enumerate() {
                ignore_broken_pipe(writeln!(out, "{}: {}", i + 1, entry))?;
            }
            Ok(Flow::Continue)
        }
    }
}

fn ignore_broken_pipe(res: io::Result<()>) -> io::Result<()> {
    match res {
        Err(ref e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_lists_one_indexed_entries() {
        let mut history = History::new(10);
        history.commit("ls");
        history.commit("cd /tmp");
        let mut out = Vec::new();
        let flow = run_builtin(&Builtin::History, &history, Path::new("/"), &mut out).unwrap();
        assert_eq!(flow, Flow::Continue);
        assert_eq!(String::from_utf8(out).unwrap(), "1: ls\n2: cd /tmp\n");
    }

    #[test]
    fn exit_prints_farewell() {
        let mut out = Vec::new();
        let flow = run_builtin(&Builtin::Exit, &History::new(10), Path::new("/"), &mut out).unwrap();
        assert_eq!(flow, Flow::Exit);
        assert_eq!(String::from_utf8(out).unwrap(), format!("{}\n", FAREWELL));
    }

    #[test]
    fn cd_changes_directory_and_returns_to_start() {
        let original = env::current_dir().unwrap();
        let start = tempfile::tempdir().unwrap();
        let start_dir = start.path().canonicalize().unwrap();
        std::fs::create_dir(start_dir.join("sub")).unwrap();
        env::set_current_dir(&start_dir).unwrap();
        let history = History::new(10);
        let mut out = Vec::new();

        run_builtin(&Builtin::Cd(Some("sub".into())), &history, &start_dir, &mut out).unwrap();
        assert_eq!(env::current_dir().unwrap(), start_dir.join("sub"));

        run_builtin(&Builtin::Cd(Some("..".into())), &history, &start_dir, &mut out).unwrap();
        assert_eq!(env::current_dir().unwrap(), start_dir);

        env::set_current_dir(start_dir.join("sub")).unwrap();
        run_builtin(&Builtin::Cd(None), &history, &start_dir, &mut out).unwrap();
        assert_eq!(env::current_dir().unwrap(), start_dir);

        let err = run_builtin(&Builtin::Cd(Some("missing".into())), &history, &start_dir, &mut out)
            .unwrap_err();
        assert!(matches!(err, ShellError::ChangeDir { .. }));
        assert!(err.to_string().starts_with("cd: missing: "));
        assert_eq!(env::current_dir().unwrap(), start_dir);

        env::set_current_dir(original).unwrap();
        assert!(out.is_empty());
    }
}
