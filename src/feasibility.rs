use crate::data::{Candidate, Dataset, Session, SessionIdx};
use crate::error::TimetableError;
use log::{info, trace, warn};

/// The feasible search space: every surviving candidate and, per session,
/// the positions of its candidates in `candidates`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSpace {
    pub candidates: Vec<Candidate>,
    pub by_session: Vec<Vec<usize>>,
}

impl CandidateSpace {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn for_session(&self, session: SessionIdx) -> impl Iterator<Item = &Candidate> + '_ {
        self.by_session[session].iter().map(|&i| &self.candidates[i])
    }
}

/// Lazily filtered (teacher, room, slot) product for sessions of one dataset.
///
/// Filters are applied teacher first, then room, then slot, so rejected
/// teachers and rooms never reach the slot loop. Each teacher's available
/// slots are resolved once up front.
pub struct Enumerator<'a> {
    dataset: &'a Dataset,
    teacher_slots: Vec<Vec<usize>>,
}

impl<'a> Enumerator<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        let teacher_slots = dataset
            .teachers
            .iter()
            .map(|teacher| {
                dataset
                    .slots
                    .iter()
                    .enumerate()
                    .filter(|(_, slot)| teacher.is_available_on(&slot.day))
                    .map(|(idx, _)| idx)
                    .collect()
            })
            .collect();
        Self {
            dataset,
            teacher_slots,
        }
    }

    /// Candidates of one session, in (teacher, room, slot) table order.
    pub fn candidates_for<'s>(
        &'s self,
        session: &'s Session,
    ) -> impl Iterator<Item = Candidate> + 's {
        let rooms = &self.dataset.rooms;
        self.dataset
            .teachers
            .iter()
            .enumerate()
            .filter(move |(_, teacher)| teacher.is_qualified_for(&session.course_name))
            .flat_map(move |(teacher, _)| {
                rooms
                    .iter()
                    .enumerate()
                    .filter(move |(_, room)| room.capacity >= session.size)
                    .flat_map(move |(room, _)| {
                        self.teacher_slots[teacher].iter().map(move |&slot| Candidate {
                            session: session.index,
                            teacher,
                            room,
                            slot,
                        })
                    })
            })
    }
}

/// Enumerates the candidate space for `sessions`.
///
/// Fails with [`TimetableError::NoFeasibleAssignment`] listing every session
/// left without a candidate; no model should be built in that case.
pub fn enumerate_candidates(
    sessions: &[Session],
    dataset: &Dataset,
) -> Result<CandidateSpace, TimetableError> {
    let enumerator = Enumerator::new(dataset);
    let mut candidates = Vec::new();
    let mut by_session = Vec::with_capacity(sessions.len());
    let mut stranded = Vec::new();

    for session in sessions {
        let start = candidates.len();
        candidates.extend(enumerator.candidates_for(session));
        if candidates.len() == start {
            warn!(
                "Session {} ({} for group {}) has no qualified teacher, fitting room or available slot",
                session.index, session.course_name, session.group
            );
            stranded.push(session.index);
        }
        by_session.push((start..candidates.len()).collect());
    }

    trace!(
        "Generated {} candidate triples out of a theoretical maximum of {}.",
        candidates.len(),
        sessions.len() * dataset.teachers.len() * dataset.rooms.len() * dataset.slots.len()
    );

    if !stranded.is_empty() {
        return Err(TimetableError::NoFeasibleAssignment { sessions: stranded });
    }
    info!(
        "Feasible assignment space has {} candidates for {} sessions",
        candidates.len(),
        sessions.len()
    );
    Ok(CandidateSpace {
        candidates,
        by_session,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Course, Room, Slot, Teacher, parse_tokens};
    use crate::expander::expand_sessions;
    use std::collections::{BTreeSet, HashSet};

    fn teacher(id: &str, qualified: &str, days: &str) -> Teacher {
        Teacher {
            id: id.into(),
            qualified_courses: parse_tokens(qualified),
            available_days: parse_tokens(days),
            preferred_periods: BTreeSet::new(),
        }
    }

    fn sample_dataset() -> Dataset {
        Dataset {
            courses: vec![
                Course { group: "G1".into(), name: "Math".into(), hours: 1, size: 30 },
                Course { group: "G2".into(), name: "Art".into(), hours: 1, size: 10 },
            ],
            teachers: vec![teacher("T1", "Math", ""), teacher("T2", "", "Tue")],
            rooms: vec![
                Room { id: "Big".into(), capacity: 40 },
                Room { id: "Small".into(), capacity: 15 },
            ],
            groups: Vec::new(),
            slots: vec![
                Slot { id: "Mon1".into(), day: "Mon".into(), period: 1 },
                Slot { id: "Tue1".into(), day: "Tue".into(), period: 1 },
            ],
        }
    }

    #[test]
    fn test_pruning_rules() {
        let dataset = sample_dataset();
        let sessions = expand_sessions(&dataset.courses);
        let space = enumerate_candidates(&sessions, &dataset).unwrap();

        // Math (size 30): T1 any day in Big (2) + T2 on Tue in Big (1)
        let math: Vec<_> = space.for_session(0).copied().collect();
        assert_eq!(math.len(), 3);
        assert!(math.iter().all(|c| dataset.rooms[c.room].id == "Big"));
        assert!(
            math.iter()
                .filter(|c| c.teacher == 1)
                .all(|c| dataset.slots[c.slot].day == "Tue")
        );

        // Art (size 10): only T2 (T1 is Math-only), both rooms, Tue only
        let art: Vec<_> = space.for_session(1).copied().collect();
        assert_eq!(art.len(), 2);
        assert!(art.iter().all(|c| c.teacher == 1 && c.slot == 1));
    }

    #[test]
    fn test_by_session_partitions_candidates() {
        let dataset = sample_dataset();
        let sessions = expand_sessions(&dataset.courses);
        let space = enumerate_candidates(&sessions, &dataset).unwrap();

        let total: usize = space.by_session.iter().map(Vec::len).sum();
        assert_eq!(total, space.len());
        for (session, indices) in space.by_session.iter().enumerate() {
            assert!(indices.iter().all(|&i| space.candidates[i].session == session));
        }
    }

    #[test]
    fn test_deterministic() {
        let dataset = sample_dataset();
        let sessions = expand_sessions(&dataset.courses);
        let first = enumerate_candidates(&sessions, &dataset).unwrap();
        let second = enumerate_candidates(&sessions, &dataset).unwrap();
        assert_eq!(first, second);

        // the candidate set does not depend on the order of the teacher table
        let mut reordered = dataset.clone();
        reordered.teachers.reverse();
        let third = enumerate_candidates(&sessions, &reordered).unwrap();
        let as_ids = |space: &CandidateSpace, data: &Dataset| -> HashSet<(usize, String, String, String)> {
            space
                .candidates
                .iter()
                .map(|c| {
                    (
                        c.session,
                        data.teachers[c.teacher].id.clone(),
                        data.rooms[c.room].id.clone(),
                        data.slots[c.slot].id.clone(),
                    )
                })
                .collect()
        };
        assert_eq!(as_ids(&first, &dataset), as_ids(&third, &reordered));
    }

    #[test]
    fn test_no_qualified_teacher_is_reported() {
        let mut dataset = sample_dataset();
        dataset.courses.push(Course {
            group: "G1".into(),
            name: "Latin".into(),
            hours: 2,
            size: 30,
        });
        dataset.teachers[1] = teacher("T2", "Art", "Tue");
        let sessions = expand_sessions(&dataset.courses);

        let err = enumerate_candidates(&sessions, &dataset).unwrap_err();
        match err {
            TimetableError::NoFeasibleAssignment { sessions } => assert_eq!(sessions, vec![2, 3]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_room_too_small_is_reported() {
        let mut dataset = sample_dataset();
        dataset.courses[1].size = 50;
        let sessions = expand_sessions(&dataset.courses);
        let err = enumerate_candidates(&sessions, &dataset).unwrap_err();
        assert!(matches!(err, TimetableError::NoFeasibleAssignment { ref sessions } if sessions == &vec![1]));
    }
}
