use crate::config::SolverConfig;
use crate::data::{Dataset, TimetableRecord, UnmetSoftConstraint};
use crate::encoder::{EncodedModel, ModelStats, encode};
use crate::engine::{EngineSettings, EngineStatus, HighsEngine, SolvingEngine};
use crate::error::TimetableError;
use crate::expander::expand_sessions;
use crate::extractor::extract_timetable;
use crate::feasibility::enumerate_candidates;
use crate::report::{audit, presentation_order};
use crate::validation::validate_input;
use log::{debug, info};
use serde::Serialize;
use std::time::Instant;

/// The final output of the solver.
#[derive(Debug, Clone, Serialize)]
pub struct Timetable {
    pub status: EngineStatus,
    /// Objective value reported by the engine.
    pub objective: f64,
    /// Penalty recomputed from the timetable itself.
    pub score: f64,
    pub max_teacher_load: usize,
    /// Sorted by group, day and period.
    pub records: Vec<TimetableRecord>,
    pub unmet_soft_constraints: Vec<UnmetSoftConstraint>,
    pub model: ModelStats,
}

/// Solves the timetabling problem using the HiGHS MILP solver.
pub fn solve(dataset: &Dataset, config: &SolverConfig) -> Result<Timetable, TimetableError> {
    solve_with(&HighsEngine, dataset, config)
}

/// Validates, expands, enumerates, encodes, solves and extracts.
///
/// Configuration, input and structural problems are reported before the
/// engine is called.
pub fn solve_with<E: SolvingEngine + ?Sized>(
    engine: &E,
    dataset: &Dataset,
    config: &SolverConfig,
) -> Result<Timetable, TimetableError> {
    let start_time = Instant::now();
    info!(
        "Setting up timetable model with {} courses, {} groups, {} teachers, {} rooms and {} slots...",
        dataset.courses.len(),
        dataset.groups_or_derived().len(),
        dataset.teachers.len(),
        dataset.rooms.len(),
        dataset.slots.len()
    );

    config.validate()?;
    validate_input(dataset).map_err(TimetableError::Validation)?;

    let sessions = expand_sessions(&dataset.courses);
    let space = enumerate_candidates(&sessions, dataset)?;
    let EncodedModel {
        model,
        index,
        penalties,
        stats,
    } = encode(dataset, sessions, space, &config.weights);

    let outcome = engine.solve(model, &EngineSettings::from(config));
    let records = extract_timetable(&index, dataset, &outcome)?;

    let objective = outcome.valuation.as_ref().map_or(0.0, |v| v.objective);
    if let Some(valuation) = &outcome.valuation {
        let values = index.penalty_values(valuation).unwrap_or_default();
        for (term, value) in penalties.iter().zip(values) {
            if *value > 0.5 {
                debug!("Penalty incurred ({} x {}): {}", term.weight, value.round(), term.label);
            }
        }
    }

    let audit = audit(&records, dataset, &config.weights);
    info!(
        "Timetable with {} sessions ready in {:.2?} (status {}, objective {}, {} unmet soft constraints)",
        records.len(),
        start_time.elapsed(),
        outcome.status,
        objective,
        audit.unmet_soft_constraints.len()
    );

    Ok(Timetable {
        status: outcome.status,
        objective,
        score: audit.score,
        max_teacher_load: audit.max_teacher_load,
        records: presentation_order(&records, dataset),
        unmet_soft_constraints: audit.unmet_soft_constraints,
        model: stats,
    })
}
