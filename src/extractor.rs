use crate::data::{Dataset, TimetableRecord};
use crate::encoder::AssignmentIndex;
use crate::engine::{EngineOutcome, EngineStatus};
use crate::error::TimetableError;
use log::{debug, warn};
use std::collections::HashSet;

/// Decisions at or above this value count as chosen.
const CHOSEN: f64 = 0.5;

/// Turns a solver outcome into one record per session, in session order.
///
/// Anything short of a complete, conflict-free assignment is reported as
/// [`TimetableError::NoSolution`]; a partial timetable is never returned. A
/// valuation that breaks a hard rule (e.g. values read after a time-out
/// without incumbent) is treated as [`EngineStatus::Unknown`].
pub fn extract_timetable(
    index: &AssignmentIndex,
    dataset: &Dataset,
    outcome: &EngineOutcome,
) -> Result<Vec<TimetableRecord>, TimetableError> {
    let valuation = match (&outcome.valuation, outcome.status.has_solution()) {
        (Some(v), true) => v,
        _ => return Err(TimetableError::NoSolution(outcome.status)),
    };
    let unusable = || TimetableError::NoSolution(EngineStatus::Unknown);
    let Some(values) = index.decision_values(valuation) else {
        warn!(
            "Solver returned {} values for {} candidates",
            valuation.values.len(),
            index.space.len()
        );
        return Err(unusable());
    };

    let mut records = Vec::with_capacity(index.sessions.len());
    let mut teacher_slot = HashSet::new();
    let mut room_slot = HashSet::new();
    let mut group_slot = HashSet::new();

    for session in &index.sessions {
        let mut chosen = index.space.by_session[session.index]
            .iter()
            .filter(|&&i| values[i] >= CHOSEN)
            .map(|&i| index.space.candidates[i]);
        let (Some(c), None) = (chosen.next(), chosen.next()) else {
            warn!("Session {} is not assigned exactly once in the solver values", session.index);
            return Err(unusable());
        };

        if !teacher_slot.insert((c.teacher, c.slot))
            || !room_slot.insert((c.room, c.slot))
            || !group_slot.insert((session.group.as_str(), c.slot))
        {
            warn!("Session {} collides with another session at slot {}", session.index, c.slot);
            return Err(unusable());
        }

        records.push(TimetableRecord {
            session: session.index,
            course_idx: session.course_idx,
            course_name: session.course_name.clone(),
            group: session.group.clone(),
            teacher: dataset.teachers[c.teacher].id.clone(),
            room: dataset.rooms[c.room].id.clone(),
            slot: dataset.slots[c.slot].id.clone(),
        });
    }

    debug!("Extracted {} timetable records", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Course, Room, Slot, Teacher};
    use crate::engine::Valuation;
    use crate::expander::expand_sessions;
    use crate::feasibility::enumerate_candidates;
    use std::collections::BTreeSet;

    fn dataset() -> Dataset {
        Dataset {
            courses: vec![Course {
                group: "G1".into(),
                name: "Math".into(),
                hours: 2,
                size: 20,
            }],
            teachers: vec![Teacher {
                id: "T1".into(),
                qualified_courses: BTreeSet::new(),
                available_days: BTreeSet::new(),
                preferred_periods: BTreeSet::new(),
            }],
            rooms: vec![Room { id: "R1".into(), capacity: 30 }],
            groups: Vec::new(),
            slots: vec![
                Slot { id: "S1".into(), day: "Mon".into(), period: 1 },
                Slot { id: "S2".into(), day: "Tue".into(), period: 1 },
            ],
        }
    }

    /// Candidates are (session 0: S1, S2), (session 1: S1, S2).
    fn index(data: &Dataset) -> AssignmentIndex {
        let sessions = expand_sessions(&data.courses);
        let space = enumerate_candidates(&sessions, data).unwrap();
        AssignmentIndex { sessions, space }
    }

    fn solved(values: Vec<f64>) -> EngineOutcome {
        EngineOutcome {
            status: EngineStatus::Optimal,
            valuation: Some(Valuation { values, objective: 0.0 }),
        }
    }

    #[test]
    fn test_one_record_per_session() {
        let data = dataset();
        let index = index(&data);
        let records = extract_timetable(&index, &data, &solved(vec![1.0, 0.0, 0.0, 0.9999])).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].session, 0);
        assert_eq!(records[0].slot, "S1");
        assert_eq!(records[1].session, 1);
        assert_eq!(records[1].slot, "S2");
        assert_eq!(records[1].teacher, "T1");
        assert_eq!(records[1].room, "R1");
        assert_eq!(records[1].course_name, "Math");
    }

    #[test]
    fn test_non_success_status_gives_no_records() {
        let data = dataset();
        let index = index(&data);
        for status in [EngineStatus::Infeasible, EngineStatus::Unknown] {
            let outcome = EngineOutcome::without_solution(status);
            let err = extract_timetable(&index, &data, &outcome).unwrap_err();
            assert!(matches!(err, TimetableError::NoSolution(s) if s == status));
        }
    }

    #[test]
    fn test_values_ignored_without_success_status() {
        let data = dataset();
        let index = index(&data);
        let outcome = EngineOutcome {
            status: EngineStatus::Unknown,
            valuation: Some(Valuation { values: vec![1.0, 0.0, 0.0, 1.0], objective: 0.0 }),
        };
        assert!(extract_timetable(&index, &data, &outcome).is_err());
    }

    #[test]
    fn test_incomplete_assignment_rejected() {
        let data = dataset();
        let index = index(&data);
        let err = extract_timetable(&index, &data, &solved(vec![1.0, 0.0, 0.0, 0.0])).unwrap_err();
        assert!(matches!(err, TimetableError::NoSolution(EngineStatus::Unknown)));

        let err = extract_timetable(&index, &data, &solved(vec![1.0, 1.0, 0.0, 1.0])).unwrap_err();
        assert!(matches!(err, TimetableError::NoSolution(EngineStatus::Unknown)));
    }

    #[test]
    fn test_collision_rejected() {
        let data = dataset();
        let index = index(&data);
        // both sessions at S1
        let err = extract_timetable(&index, &data, &solved(vec![1.0, 0.0, 1.0, 0.0])).unwrap_err();
        assert!(matches!(err, TimetableError::NoSolution(EngineStatus::Unknown)));
    }

    #[test]
    fn test_short_valuation_rejected() {
        let data = dataset();
        let index = index(&data);
        let err = extract_timetable(&index, &data, &solved(vec![1.0, 0.0])).unwrap_err();
        assert!(matches!(err, TimetableError::NoSolution(EngineStatus::Unknown)));
    }
}
