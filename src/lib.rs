//! Weekly school timetabling as a mixed-integer program.
//!
//! Courses are expanded into one-hour sessions, every feasible
//! (session, teacher, room, slot) combination becomes a binary decision, and
//! hard and soft scheduling rules are encoded over those decisions for an
//! external MILP engine (HiGHS via `good_lp`). The chosen decisions are read
//! back into a timetable.

pub mod config;
pub mod data;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod expander;
pub mod extractor;
pub mod feasibility;
pub mod linking;
pub mod loader;
pub mod report;
pub mod server;
pub mod solver;
pub mod validation;

pub use config::{SolverConfig, Weights};
pub use data::{Dataset, TimetableRecord};
pub use error::TimetableError;
pub use solver::{Timetable, solve, solve_with};
