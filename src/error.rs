use crate::config::ConfigError;
use crate::data::SessionIdx;
use crate::engine::EngineStatus;
use crate::validation::ValidationError;
use itertools::Itertools;
use thiserror::Error;

/// Everything that can stop the pipeline before a timetable is produced.
#[derive(Error, Debug)]
pub enum TimetableError {
    // input errors
    #[error("failed to open {table} table: {source}")]
    Io {
        table: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {table} table: {source}")]
    Csv {
        table: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("{table} table is missing required column `{column}`")]
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },

    #[error("{table} table, row {row}: {message}")]
    InvalidField {
        table: &'static str,
        row: usize,
        message: String,
    },

    #[error("input validation failed: {}", .0.iter().map(|e| e.message.as_str()).join("; "))]
    Validation(Vec<ValidationError>),

    #[error(transparent)]
    Config(#[from] ConfigError),

    // structural infeasibility
    #[error(
        "no feasible assignment space: {} session(s) have no qualified teacher, large enough room or available slot (sessions {})",
        .sessions.len(),
        .sessions.iter().join(", ")
    )]
    NoFeasibleAssignment { sessions: Vec<SessionIdx> },

    // solver-level
    #[error("no solution found (solver status: {0})")]
    NoSolution(EngineStatus),
}

impl TimetableError {
    /// Stable tag for callers that branch on the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            TimetableError::Io { .. }
            | TimetableError::Csv { .. }
            | TimetableError::MissingColumn { .. }
            | TimetableError::InvalidField { .. } => "input",
            TimetableError::Validation(_) => "validation",
            TimetableError::Config(_) => "config",
            TimetableError::NoFeasibleAssignment { .. } => "no_feasible_assignment",
            TimetableError::NoSolution(_) => "no_solution",
        }
    }

    /// True for the outcomes where the data was readable but no timetable exists.
    pub fn is_infeasible(&self) -> bool {
        matches!(
            self,
            TimetableError::NoFeasibleAssignment { .. } | TimetableError::NoSolution(_)
        )
    }
}
