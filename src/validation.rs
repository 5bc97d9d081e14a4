//! Input validation, run before any decision variable is created.
//!
//! Detects:
//! - Empty tables
//! - Duplicate teacher, room and slot IDs
//! - Non-positive hours, sizes and capacities
//! - Groups too large for every room
//! - Courses and groups needing more hours than there are slots
//! - More sessions than room-slot pairs

use crate::data::Dataset;
use itertools::Itertools;
use log::warn;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// A required table has no rows.
    EmptyTable,
    /// Two entities share the same ID.
    DuplicateId,
    /// Hours, size or capacity is zero.
    NonPositiveValue,
    /// A group does not fit in the largest room.
    RoomCapacityConflict,
    /// A course or group needs more weekly hours than there are slots.
    HoursExceedSlots,
    /// More sessions than room-slot pairs.
    InsufficientRoomSlots,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates the input tables.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(dataset: &Dataset) -> ValidationResult {
    let mut errors = Vec::new();

    for (table, len) in [
        ("courses", dataset.courses.len()),
        ("teachers", dataset.teachers.len()),
        ("rooms", dataset.rooms.len()),
        ("slots", dataset.slots.len()),
    ] {
        if len == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyTable,
                format!("The {} table is empty", table),
            ));
        }
    }

    check_unique(
        "teacher",
        dataset.teachers.iter().map(|t| t.id.as_str()),
        &mut errors,
    );
    check_unique("room", dataset.rooms.iter().map(|r| r.id.as_str()), &mut errors);
    check_unique("slot", dataset.slots.iter().map(|s| s.id.as_str()), &mut errors);

    for (idx, course) in dataset.courses.iter().enumerate() {
        if course.hours == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::NonPositiveValue,
                format!("Course {} ({}) of group {} has zero hours", idx, course.name, course.group),
            ));
        }
        if course.size == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::NonPositiveValue,
                format!("Course {} ({}) of group {} has zero size", idx, course.name, course.group),
            ));
        }
    }
    for room in dataset.rooms.iter().filter(|r| r.capacity == 0) {
        errors.push(ValidationError::new(
            ValidationErrorKind::NonPositiveValue,
            format!("Room {} has zero capacity", room.id),
        ));
    }

    let total_slots = dataset.slots.len() as u64;
    let max_capacity = dataset.rooms.iter().map(|r| r.capacity).max().unwrap_or(0);

    if !dataset.rooms.is_empty() {
        for course in dataset.courses.iter().filter(|c| c.size > max_capacity) {
            errors.push(ValidationError::new(
                ValidationErrorKind::RoomCapacityConflict,
                format!(
                    "Group {} (size {}) taking {} needs more capacity than the largest room ({})",
                    course.group, course.size, course.name, max_capacity
                ),
            ));
        }
    }

    if total_slots > 0 {
        for course in dataset.courses.iter().filter(|c| u64::from(c.hours) > total_slots) {
            errors.push(ValidationError::new(
                ValidationErrorKind::HoursExceedSlots,
                format!(
                    "Course {} of group {} requires {} hours/week, more than the {} available slots",
                    course.name, course.group, course.hours, total_slots
                ),
            ));
        }

        let mut group_hours: BTreeMap<&str, u64> = BTreeMap::new();
        for course in &dataset.courses {
            *group_hours.entry(course.group.as_str()).or_default() += u64::from(course.hours);
        }
        for (group, hours) in group_hours.iter().filter(|(_, h)| **h > total_slots) {
            errors.push(ValidationError::new(
                ValidationErrorKind::HoursExceedSlots,
                format!(
                    "Group {} needs {} hours/week but can attend at most {} slots",
                    group, hours, total_slots
                ),
            ));
        }

        let total_sessions: u64 = dataset.courses.iter().map(|c| u64::from(c.hours)).sum();
        let room_slots = dataset.rooms.len() as u64 * total_slots;
        if !dataset.rooms.is_empty() && total_sessions > room_slots {
            errors.push(ValidationError::new(
                ValidationErrorKind::InsufficientRoomSlots,
                format!(
                    "{} sessions cannot fit into {} room-slot pairs",
                    total_sessions, room_slots
                ),
            ));
        }
    }

    warn_on_group_size_mismatch(dataset);

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn check_unique<'a>(
    entity: &str,
    ids: impl Iterator<Item = &'a str>,
    errors: &mut Vec<ValidationError>,
) {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate {} ID: {}", entity, id),
            ));
        }
    }
}

fn warn_on_group_size_mismatch(dataset: &Dataset) {
    let declared: HashMap<&str, u32> = dataset
        .groups
        .iter()
        .map(|g| (g.id.as_str(), g.size))
        .collect();
    let mismatched = dataset
        .courses
        .iter()
        .filter(|c| declared.get(c.group.as_str()).is_some_and(|size| *size != c.size))
        .map(|c| format!("{}/{}", c.group, c.name))
        .unique()
        .collect::<Vec<_>>();
    if !mismatched.is_empty() {
        warn!(
            "Course sizes differ from the groups table for {}; course sizes are used",
            mismatched.join(", ")
        );
    }
}
