use crate::config::Weights;
use crate::data::{Dataset, Slot, TimetableRecord, UnmetSoftConstraint};
use crate::encoder::slots_by_day;
use itertools::Itertools;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;

/// Weighted penalty of a timetable, recomputed from the data.
#[derive(Debug, Clone, PartialEq)]
pub struct Audit {
    pub score: f64,
    pub max_teacher_load: usize,
    pub unmet_soft_constraints: Vec<UnmetSoftConstraint>,
}

/// Position of every slot: (day rank, period), day rank by first appearance.
struct SlotOrder<'a> {
    by_id: HashMap<&'a str, (usize, &'a Slot)>,
}

impl<'a> SlotOrder<'a> {
    fn new(dataset: &'a Dataset) -> Self {
        let by_id = slots_by_day(dataset)
            .into_iter()
            .enumerate()
            .flat_map(|(rank, (_, slots))| {
                slots.into_iter().map(move |s| {
                    let slot = &dataset.slots[s];
                    (slot.id.as_str(), (rank, slot))
                })
            })
            .collect();
        Self { by_id }
    }

    fn key(&self, slot_id: &str) -> (usize, u32) {
        self.by_id
            .get(slot_id)
            .map(|(rank, slot)| (*rank, slot.period))
            .unwrap_or((usize::MAX, u32::MAX))
    }

    fn slot(&self, slot_id: &str) -> Option<&'a Slot> {
        self.by_id.get(slot_id).map(|(_, slot)| *slot)
    }
}

/// Records sorted by group, then day, then period.
pub fn presentation_order(records: &[TimetableRecord], dataset: &Dataset) -> Vec<TimetableRecord> {
    let order = SlotOrder::new(dataset);
    records
        .iter()
        .sorted_by(|a, b| {
            a.group
                .cmp(&b.group)
                .then_with(|| order.key(&a.slot).cmp(&order.key(&b.slot)))
        })
        .cloned()
        .collect()
}

/// Per-group listing, one line per session: `Day-P<period>: course (teacher, room)`.
pub fn render_timetable(records: &[TimetableRecord], dataset: &Dataset) -> String {
    if records.is_empty() {
        return "No solution.\n".to_string();
    }
    let order = SlotOrder::new(dataset);
    let mut out = String::new();
    for (group, rows) in &presentation_order(records, dataset)
        .into_iter()
        .chunk_by(|r| r.group.clone())
    {
        let _ = writeln!(out, "\n--- Group {} ---", group);
        for r in rows {
            let (day, period) = order
                .slot(&r.slot)
                .map(|s| (s.day.as_str(), s.period))
                .unwrap_or(("?", 0));
            let _ = writeln!(
                out,
                "{}-P{}: {} ({}, {})",
                day, period, r.course_name, r.teacher, r.room
            );
        }
    }
    out
}

/// Recomputes the soft-constraint penalties of `records` and lists what was
/// not met. Only terms with a positive weight are scored and listed.
pub fn audit(records: &[TimetableRecord], dataset: &Dataset, weights: &Weights) -> Audit {
    let order = SlotOrder::new(dataset);
    let teachers: HashMap<&str, _> = dataset.teachers.iter().map(|t| (t.id.as_str(), t)).collect();
    let mut score = 0.0;
    let mut unmet = Vec::new();

    // teacher period preferences
    if weights.teacher_preference > 0.0 {
        for r in records {
            let (Some(teacher), Some(slot)) = (teachers.get(r.teacher.as_str()), order.slot(&r.slot))
            else {
                continue;
            };
            if teacher.dislikes_period(slot.period) {
                score += weights.teacher_preference;
                unmet.push(UnmetSoftConstraint {
                    constraint_type: "Teacher Preference".to_string(),
                    description: format!(
                        "Teacher {} teaches {} for group {} in period {} on {}, outside preferred periods {}.",
                        teacher.id,
                        r.course_name,
                        r.group,
                        slot.period,
                        slot.day,
                        teacher.preferred_periods.iter().join(", ")
                    ),
                });
            }
        }
    }

    // same course twice a day for one group
    if weights.same_day_repetition > 0.0 {
        let per_day: BTreeMap<(&str, &str, &str), usize> = records
            .iter()
            .filter_map(|r| {
                order
                    .slot(&r.slot)
                    .map(|s| (r.group.as_str(), r.course_name.as_str(), s.day.as_str()))
            })
            .counts()
            .into_iter()
            .collect();
        for ((group, course, day), count) in per_day.into_iter().filter(|(_, n)| *n >= 2) {
            score += weights.same_day_repetition;
            unmet.push(UnmetSoftConstraint {
                constraint_type: "Same-Day Repetition".to_string(),
                description: format!("Group {} has {} {} times on {}.", group, course, count, day),
            });
        }
    }

    let max_teacher_load = records
        .iter()
        .counts_by(|r| r.teacher.as_str())
        .into_values()
        .max()
        .unwrap_or(0);
    if weights.load_balance > 0.0 {
        score += weights.load_balance * max_teacher_load as f64;
    }

    if weights.group_gap > 0.0 || weights.room_change > 0.0 {
        let at: HashMap<(&str, &str), &TimetableRecord> = records
            .iter()
            .map(|r| ((r.group.as_str(), r.slot.as_str()), r))
            .collect();
        let groups: Vec<&str> = records.iter().map(|r| r.group.as_str()).unique().sorted().collect();

        for (day, slots) in slots_by_day(dataset) {
            let ids: Vec<&str> = slots.iter().map(|&s| dataset.slots[s].id.as_str()).collect();
            for &group in &groups {
                let busy: Vec<Option<&&TimetableRecord>> =
                    ids.iter().map(|id| at.get(&(group, *id))).collect();

                if weights.group_gap > 0.0 {
                    let first = busy.iter().position(Option::is_some);
                    let last = busy.iter().rposition(Option::is_some);
                    if let (Some(first), Some(last)) = (first, last) {
                        for idle in (first + 1..last).filter(|&i| busy[i].is_none()) {
                            score += weights.group_gap;
                            unmet.push(UnmetSoftConstraint {
                                constraint_type: "Group Gap".to_string(),
                                description: format!(
                                    "Group {} is idle on {} at slot {} between sessions.",
                                    group, day, ids[idle]
                                ),
                            });
                        }
                    }
                }

                if weights.room_change > 0.0 {
                    for i in 0..busy.len().saturating_sub(1) {
                        if let (Some(a), Some(b)) = (busy[i], busy[i + 1]) {
                            if a.room != b.room {
                                score += weights.room_change;
                                unmet.push(UnmetSoftConstraint {
                                    constraint_type: "Room Change".to_string(),
                                    description: format!(
                                        "Group {} moves from room {} to room {} on {} between slots {} and {}.",
                                        group, a.room, b.room, day, a.slot, b.slot
                                    ),
                                });
                            }
                        }
                    }
                }
            }
        }
    }

    Audit {
        score,
        max_teacher_load,
        unmet_soft_constraints: unmet,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Room, Teacher, parse_periods};
    use std::collections::BTreeSet;

    fn slot(id: &str, day: &str, period: u32) -> Slot {
        Slot { id: id.into(), day: day.into(), period }
    }

    fn dataset() -> Dataset {
        Dataset {
            courses: Vec::new(),
            teachers: vec![
                Teacher {
                    id: "T1".into(),
                    qualified_courses: BTreeSet::new(),
                    available_days: BTreeSet::new(),
                    preferred_periods: parse_periods("1").unwrap(),
                },
                Teacher {
                    id: "T2".into(),
                    qualified_courses: BTreeSet::new(),
                    available_days: BTreeSet::new(),
                    preferred_periods: BTreeSet::new(),
                },
            ],
            rooms: vec![
                Room { id: "R1".into(), capacity: 30 },
                Room { id: "R2".into(), capacity: 30 },
            ],
            groups: Vec::new(),
            slots: vec![
                slot("Tue1", "Tue", 1),
                slot("Mon3", "Mon", 3),
                slot("Mon1", "Mon", 1),
                slot("Mon2", "Mon", 2),
            ],
        }
    }

    fn record(session: usize, group: &str, course: &str, teacher: &str, room: &str, slot: &str) -> TimetableRecord {
        TimetableRecord {
            session,
            course_idx: 0,
            course_name: course.into(),
            group: group.into(),
            teacher: teacher.into(),
            room: room.into(),
            slot: slot.into(),
        }
    }

    fn sample_records() -> Vec<TimetableRecord> {
        vec![
            record(0, "G2", "Art", "T2", "R1", "Mon1"),
            record(1, "G1", "Math", "T1", "R1", "Mon3"),
            record(2, "G1", "Math", "T1", "R2", "Mon1"),
            record(3, "G1", "Art", "T2", "R1", "Tue1"),
        ]
    }

    #[test]
    fn test_presentation_order() {
        let data = dataset();
        let ordered = presentation_order(&sample_records(), &data);
        let sessions: Vec<usize> = ordered.iter().map(|r| r.session).collect();
        // G1: Tue comes first in the slot table, then Mon by period; then G2
        assert_eq!(sessions, vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_render_timetable() {
        let data = dataset();
        let text = render_timetable(&sample_records(), &data);
        let expected = "\n--- Group G1 ---\nTue-P1: Art (T2, R1)\nMon-P1: Math (T1, R2)\nMon-P3: Math (T1, R1)\n\n--- Group G2 ---\nMon-P1: Art (T2, R1)\n";
        assert_eq!(text, expected);
        assert_eq!(render_timetable(&[], &data), "No solution.\n");
    }

    #[test]
    fn test_audit_default_weights() {
        let data = dataset();
        let audit = audit(&sample_records(), &data, &Weights::default());

        // T1 in period 3 (10) + G1 Math twice on Mon (30) + max load 2 (2)
        assert_eq!(audit.score, 42.0);
        assert_eq!(audit.max_teacher_load, 2);
        let types: Vec<&str> = audit
            .unmet_soft_constraints
            .iter()
            .map(|u| u.constraint_type.as_str())
            .collect();
        assert_eq!(types, vec!["Teacher Preference", "Same-Day Repetition"]);
    }

    #[test]
    fn test_audit_gaps_and_room_changes() {
        let data = dataset();
        let mut records = sample_records();
        records.push(record(4, "G2", "Music", "T2", "R2", "Mon2"));
        let weights = Weights {
            teacher_preference: 0.0,
            same_day_repetition: 0.0,
            load_balance: 0.0,
            group_gap: 20.0,
            room_change: 5.0,
        };
        let audit = audit(&records, &data, &weights);

        // G1 idle at Mon2 between Mon1 and Mon3; G2 changes R1 -> R2 at Mon1 -> Mon2
        assert_eq!(audit.score, 25.0);
        assert_eq!(audit.unmet_soft_constraints.len(), 2);
        assert!(audit.unmet_soft_constraints[0].description.contains("idle on Mon at slot Mon2"));
        assert!(audit.unmet_soft_constraints[1].to_string().starts_with("[Room Change]"));
    }
}
