use thiserror::Error;

/// What a finished command wants printed: one line per affected repository
/// (already carrying its status glyph). Partial success is the norm — the
/// lines are printed even when `failure` forces a non-zero exit.
#[derive(Debug, Default)]
pub struct CommandReport {
    pub lines: Vec<String>,
    pub failure: Option<String>,
}

impl CommandReport {
    pub fn line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.failure = Some(message.into());
    }

    pub fn exit_code(&self) -> i32 {
        if self.failure.is_some() {
            20
        } else {
            0
        }
    }
}

/// Command failures, partitioned by the exit code contract: 10 argument
/// parsing, 11 lock read, 12 input derivation, 13 empty input, 20 engine.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to parse args: {0}")]
    ArgParse(String),
    #[error("could not read lock.json: {0}")]
    LockRead(anyhow::Error),
    #[error("could not get repos list: {0}")]
    Input(anyhow::Error),
    #[error("no repositories are specified")]
    EmptyTarget,
    #[error("{0:#}")]
    Engine(anyhow::Error),
}

impl CommandError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ArgParse(_) => 10,
            Self::LockRead(_) => 11,
            Self::Input(_) => 12,
            Self::EmptyTarget => 13,
            Self::Engine(_) => 20,
        }
    }

    pub(crate) fn engine(err: impl Into<anyhow::Error>) -> Self {
        Self::Engine(err.into())
    }
}

pub(crate) type CommandResult = Result<CommandReport, CommandError>;
