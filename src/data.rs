use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// Type aliases for clarity
pub type TeacherId = String;
pub type RoomId = String;
pub type SlotId = String;
pub type GroupId = String;
pub type Day = String;
pub type Period = u32;
pub type SessionIdx = usize;
pub type CourseIdx = usize;

/// A course row: a group needs `hours` weekly one-hour sessions of `name`.
///
/// Identity is the row position in the course table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Course {
    pub group: GroupId,
    #[serde(rename = "course")]
    pub name: String,
    pub hours: u32,
    pub size: u32,
}

/// A teacher with qualification, availability and period preferences.
///
/// Empty sets mean "any course", "any day" and "no preference" respectively.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Teacher {
    pub id: TeacherId,
    #[serde(default)]
    pub qualified_courses: BTreeSet<String>,
    #[serde(default)]
    pub available_days: BTreeSet<Day>,
    #[serde(default)]
    pub preferred_periods: BTreeSet<Period>,
}

impl Teacher {
    pub fn is_qualified_for(&self, course_name: &str) -> bool {
        self.qualified_courses.is_empty() || self.qualified_courses.contains(course_name)
    }

    pub fn is_available_on(&self, day: &str) -> bool {
        self.available_days.is_empty() || self.available_days.contains(day)
    }

    /// True when the teacher states preferences and `period` is not one of them.
    pub fn dislikes_period(&self, period: Period) -> bool {
        !self.preferred_periods.is_empty() && !self.preferred_periods.contains(&period)
    }
}

/// A physical room with a given capacity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Room {
    pub id: RoomId,
    pub capacity: u32,
}

/// One (day, period) scheduling unit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Slot {
    pub id: SlotId,
    pub day: Day,
    pub period: Period,
}

/// A cohort of students attending courses together.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Group {
    pub id: GroupId,
    pub size: u32,
}

/// The five input tables.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Dataset {
    pub courses: Vec<Course>,
    pub teachers: Vec<Teacher>,
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub groups: Vec<Group>,
    pub slots: Vec<Slot>,
}

impl Dataset {
    /// Groups as given, or derived from the course table when none were supplied.
    pub fn groups_or_derived(&self) -> Vec<Group> {
        if self.groups.is_empty() {
            derive_groups(&self.courses)
        } else {
            self.groups.clone()
        }
    }
}

/// Unique groups in course order. The first size seen for a group wins.
pub fn derive_groups(courses: &[Course]) -> Vec<Group> {
    let mut seen = BTreeSet::new();
    courses
        .iter()
        .filter(|c| seen.insert(c.group.as_str()))
        .map(|c| Group {
            id: c.group.clone(),
            size: c.size,
        })
        .collect()
}

/// One atomic teaching hour of a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub index: SessionIdx,
    pub course_idx: CourseIdx,
    pub course_name: String,
    pub group: GroupId,
    pub size: u32,
}

/// A (session, teacher, room, slot) combination that survived feasibility
/// pruning. Teacher, room and slot are positions in their dataset tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Candidate {
    pub session: SessionIdx,
    pub teacher: usize,
    pub room: usize,
    pub slot: usize,
}

/// A single scheduled session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimetableRecord {
    pub session: SessionIdx,
    pub course_idx: CourseIdx,
    pub course_name: String,
    pub group: GroupId,
    pub teacher: TeacherId,
    pub room: RoomId,
    pub slot: SlotId,
}

/// Describes a soft constraint that was not met in the final timetable.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UnmetSoftConstraint {
    pub constraint_type: String,
    pub description: String,
}

impl fmt::Display for UnmetSoftConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.constraint_type, self.description)
    }
}

/// Splits a comma-separated cell into a set of trimmed, non-empty tokens.
pub fn parse_tokens(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Like [`parse_tokens`], but every token must be a period number.
pub fn parse_periods(raw: &str) -> Result<BTreeSet<Period>, String> {
    parse_tokens(raw)
        .into_iter()
        .map(|t| {
            t.parse::<Period>()
                .map_err(|e| format!("invalid period `{}`: {}", t, e))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tokens_trims_and_drops_empty() {
        let tokens = parse_tokens(" Math, Physics ,,  ");
        assert_eq!(
            tokens.into_iter().collect::<Vec<_>>(),
            vec!["Math".to_string(), "Physics".to_string()]
        );
        assert!(parse_tokens("").is_empty());
        assert!(parse_tokens("  ").is_empty());
    }

    #[test]
    fn test_parse_periods() {
        let periods = parse_periods("1, 2,4").unwrap();
        assert_eq!(periods.into_iter().collect::<Vec<_>>(), vec![1, 2, 4]);
        assert!(parse_periods("").unwrap().is_empty());
        assert!(parse_periods("1,x").is_err());
    }

    #[test]
    fn test_teacher_empty_sets_mean_anything() {
        let teacher = Teacher {
            id: "T1".into(),
            qualified_courses: BTreeSet::new(),
            available_days: BTreeSet::new(),
            preferred_periods: BTreeSet::new(),
        };
        assert!(teacher.is_qualified_for("Anything"));
        assert!(teacher.is_available_on("Sun"));
        assert!(!teacher.dislikes_period(7));
    }

    #[test]
    fn test_teacher_sets_restrict() {
        let teacher = Teacher {
            id: "T1".into(),
            qualified_courses: parse_tokens("Math"),
            available_days: parse_tokens("Mon,Tue"),
            preferred_periods: parse_periods("1,2").unwrap(),
        };
        assert!(teacher.is_qualified_for("Math"));
        assert!(!teacher.is_qualified_for("Art"));
        assert!(teacher.is_available_on("Tue"));
        assert!(!teacher.is_available_on("Wed"));
        assert!(!teacher.dislikes_period(2));
        assert!(teacher.dislikes_period(3));
    }

    #[test]
    fn test_derive_groups_first_size_wins() {
        let courses = vec![
            Course { group: "G1".into(), name: "Math".into(), hours: 2, size: 30 },
            Course { group: "G2".into(), name: "Math".into(), hours: 1, size: 20 },
            Course { group: "G1".into(), name: "Art".into(), hours: 1, size: 25 },
        ];
        let groups = derive_groups(&courses);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], Group { id: "G1".into(), size: 30 });
        assert_eq!(groups[1], Group { id: "G2".into(), size: 20 });
    }

    #[test]
    fn test_dataset_from_json_lists() {
        let json = r#"{
            "courses": [{"group": "G1", "course": "Math", "hours": 2, "size": 30}],
            "teachers": [{"id": "T1", "qualified_courses": ["Math"], "preferred_periods": [1]}],
            "rooms": [{"id": "R1", "capacity": 40}],
            "slots": [{"id": "S1", "day": "Mon", "period": 1}]
        }"#;
        let dataset: Dataset = serde_json::from_str(json).unwrap();
        assert_eq!(dataset.courses[0].name, "Math");
        assert!(dataset.teachers[0].available_days.is_empty());
        assert!(dataset.groups.is_empty());
        assert_eq!(dataset.groups_or_derived().len(), 1);
    }
}
