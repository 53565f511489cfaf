// repl.rs

use std::env;
use std::io::{self, ErrorKind, Read, Stdout, Write};
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::builtins::{run_builtin, Flow, FAREWELL};
use crate::config::ShellConfig;
use crate::editor::LineEditor;
use crate::error::ShellError;
use crate::history::History;
use crate::parser::{describe, parse_line, Command, Stage};
use crate::pipeline::run_pipeline;
use crate::terminal::{RawMode, StdinBytes};

/// `shell [<cwd>]> `, without the leading newline.
pub fn prompt_line() -> String {
    match env::current_dir() {
        Ok(dir) => format!("shell [{}]> ", dir.display()),
        Err(e) => {
            report(&ShellError::CurrentDir(e));
            "shell [?]> ".to_string()
        }
    }
}

fn report(err: &ShellError) {
    eprintln!("rawsh: {}", err);
}

pub struct Shell<R, W> {
    config: ShellConfig,
    history: History,
    start_dir: PathBuf,
    editor: LineEditor<R, W>,
    raw_mode: Option<RawMode>,
}

impl Shell<StdinBytes, Stdout> {
    /// Shell on the process's own terminal. Raw mode failure is reported
    /// and the shell carries on in whatever mode the terminal is in.
    pub fn interactive(config: ShellConfig, start_dir: PathBuf) -> Self {
        let raw_mode = match RawMode::enable(libc::STDIN_FILENO) {
            Ok(mode) => Some(mode),
            Err(e) => {
                warn!(error = %e, "continuing without raw mode");
                report(&e);
                None
            }
        };
        Self::new(config, start_dir, StdinBytes, io::stdout(), raw_mode)
    }
}

impl<R: Read, W: Write> Shell<R, W> {
    pub fn new(
        config: ShellConfig,
        start_dir: PathBuf,
        input: R,
        output: W,
        raw_mode: Option<RawMode>,
    ) -> Self {
        let mut history = History::new(config.history_size);
        if let Some(path) = &config.history_file {
            match history.load_file(path) {
                Ok(n) => debug!(path = %path.display(), entries = n, "loaded history"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "cannot read history file"),
            }
        }
        let editor = LineEditor::new(input, output, config.max_line_len);
        Self {
            config,
            history,
            start_dir,
            editor,
            raw_mode,
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn into_output(self) -> W {
        self.editor.into_output()
    }

    /// Prompt loop. Returns on `exit`, end of input, or an unreadable input stream.
    pub fn run(&mut self) {
        loop {
            let prompt = prompt_line();
            let line = match self.editor.read_line(&prompt, &mut self.history) {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("end of input");
                    let _ = writeln!(self.editor.output_mut(), "\n{}", FAREWELL);
                    break;
                }
                Err(e) => {
                    report(&ShellError::Io(e));
                    break;
                }
            };
            self.history.commit(&line);
            if self.execute(&line) == Flow::Exit {
                break;
            }
        }
        let _ = self.editor.output_mut().flush();
        self.save_history();
    }

    fn execute(&mut self, line: &str) -> Flow {
        match parse_line(line) {
            Ok(None) => Flow::Continue,
            Ok(Some(Command::Builtin(builtin))) => {
                let out = self.editor.output_mut();
                let flow = run_builtin(&builtin, &self.history, &self.start_dir, out);
                let _ = out.flush();
                flow.unwrap_or_else(|e| {
                    report(&e);
                    Flow::Continue
                })
            }
            Ok(Some(Command::Pipeline(stages))) => {
                self.run_foreground(&stages);
                Flow::Continue
            }
            Err(e) => {
                report(&e);
                Flow::Continue
            }
        }
    }

    fn run_foreground(&mut self, stages: &[Stage]) {
        let _ = self.editor.output_mut().flush();
        debug!(pipeline = %describe(stages), "running");
        let _cooked = self.raw_mode.as_mut().map(RawMode::cooked);
        match run_pipeline(stages) {
            Ok(exits) => {
                for exit in &exits {
                    debug!(program = %exit.program, code = ?exit.code(), "stage exited");
                }
            }
            Err(e) => report(&e),
        }
    }

    fn save_history(&self) {
        let Some(path) = &self.config.history_file else {
            return;
        };
        match self.history.save_file(path) {
            Ok(()) => debug!(path = %path.display(), "saved history"),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot write history file");
                eprintln!("rawsh: history: {}: {}", path.display(), e);
            }
        }
    }
}
