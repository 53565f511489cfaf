// parser.rs

use std::ffi::CString;
use std::fmt;

use itertools::Itertools;

use crate::error::{Result, ShellError};

pub const PIPE: char = '|';

/// One program invocation inside a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    program: String,
    args: Vec<String>,
}

impl Stage {
    /// Whitespace-split `segment`; `None` when it holds no words.
    pub fn parse(segment: &str) -> Option<Self> {
        let mut words = segment.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// `argv` for execvp: program name first.
    pub fn argv(&self) -> Result<Vec<CString>> {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|word| CString::new(word.as_str()).map_err(|_| ShellError::InvalidArgument(word.clone())))
            .collect()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", std::iter::once(&self.program).chain(&self.args).join(" "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Builtin {
    Exit,
    Cd(Option<String>),
    History,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Builtin(Builtin),
    Pipeline(Vec<Stage>),
}

/// Splits on `|` and then on whitespace. Every segment must name a program.
pub fn split_pipeline(line: &str) -> Result<Vec<Stage>> {
    line.split(PIPE)
        .map(|segment| Stage::parse(segment).ok_or(ShellError::EmptyStage))
        .collect()
}

/// Classifies a committed line. Built-ins are only recognised without a pipe.
pub fn parse_line(line: &str) -> Result<Option<Command>> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    let mut stages = split_pipeline(line)?;
    if stages.len() > 1 {
        return Ok(Some(Command::Pipeline(stages)));
    }
    let stage = stages.remove(0);
    let builtin = match stage.program() {
        "exit" => Some(Builtin::Exit),
        "cd" => Some(Builtin::Cd(stage.args().first().cloned())),
        "history" => Some(Builtin::History),
        _ => None,
    };
    Ok(Some(match builtin {
        Some(builtin) => Command::Builtin(builtin),
        None => Command::Pipeline(vec![stage]),
    }))
}

pub fn describe(stages: &[Stage]) -> String {
    stages.iter().join(" | ")
}
