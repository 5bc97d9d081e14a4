//! CSV ingestion of the five input tables.
//!
//! Each table lives in its own file inside a data directory. Headers are
//! trimmed, extra columns are ignored and the comma-separated teacher cells
//! are parsed into sets exactly once, here.

use crate::data::{Course, Dataset, Group, Room, Slot, Teacher, parse_periods, parse_tokens};
use crate::error::TimetableError;
use csv::{ReaderBuilder, Trim};
use log::{debug, info};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const COURSE_COLUMNS: &[&str] = &["group", "course", "hours", "size"];
const TEACHER_COLUMNS: &[&str] = &["id", "qualified_courses", "available_days", "preferred_periods"];
const ROOM_COLUMNS: &[&str] = &["id", "capacity"];
const GROUP_COLUMNS: &[&str] = &["id", "size"];
const SLOT_COLUMNS: &[&str] = &["id", "day", "period"];

#[derive(Debug, Deserialize)]
struct TeacherRow {
    id: String,
    #[serde(default)]
    qualified_courses: String,
    #[serde(default)]
    available_days: String,
    #[serde(default)]
    preferred_periods: String,
}

/// Loads `courses.csv`, `teachers.csv`, `rooms.csv`, `slots.csv` and, when
/// present, `groups.csv` from `dir`.
pub fn load_dataset(dir: &Path) -> Result<Dataset, TimetableError> {
    let courses: Vec<Course> = read_table(&dir.join("courses.csv"), "courses", COURSE_COLUMNS)?;
    let teacher_rows: Vec<TeacherRow> =
        read_table(&dir.join("teachers.csv"), "teachers", TEACHER_COLUMNS)?;
    let rooms: Vec<Room> = read_table(&dir.join("rooms.csv"), "rooms", ROOM_COLUMNS)?;
    let slots: Vec<Slot> = read_table(&dir.join("slots.csv"), "slots", SLOT_COLUMNS)?;

    let groups_path = dir.join("groups.csv");
    let groups: Vec<Group> = if groups_path.exists() {
        read_table(&groups_path, "groups", GROUP_COLUMNS)?
    } else {
        debug!("No groups.csv in {}, groups will be derived from courses", dir.display());
        Vec::new()
    };

    let teachers = teacher_rows
        .into_iter()
        .enumerate()
        .map(|(row, raw)| teacher_from_row(row + 1, raw))
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        "Loaded {} courses, {} teachers, {} rooms, {} groups, {} slots from {}",
        courses.len(),
        teachers.len(),
        rooms.len(),
        groups.len(),
        slots.len(),
        dir.display()
    );

    Ok(Dataset {
        courses,
        teachers,
        rooms,
        groups,
        slots,
    })
}

fn teacher_from_row(row: usize, raw: TeacherRow) -> Result<Teacher, TimetableError> {
    let preferred_periods =
        parse_periods(&raw.preferred_periods).map_err(|message| TimetableError::InvalidField {
            table: "teachers",
            row,
            message,
        })?;
    Ok(Teacher {
        id: raw.id,
        qualified_courses: parse_tokens(&raw.qualified_courses),
        available_days: parse_tokens(&raw.available_days),
        preferred_periods,
    })
}

fn read_table<T: DeserializeOwned>(
    path: &Path,
    table: &'static str,
    required: &'static [&'static str],
) -> Result<Vec<T>, TimetableError> {
    let file = File::open(path).map_err(|source| TimetableError::Io { table, source })?;
    parse_table(file, table, required)
}

/// Reads every row of one table, checking the header first.
pub(crate) fn parse_table<T, R>(
    reader: R,
    table: &'static str,
    required: &'static [&'static str],
) -> Result<Vec<T>, TimetableError>
where
    T: DeserializeOwned,
    R: Read,
{
    let csv_err = |source| TimetableError::Csv { table, source };
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    if let Some(column) = required
        .iter()
        .copied()
        .find(|c| !headers.iter().any(|h| h.as_str() == *c))
    {
        return Err(TimetableError::MissingColumn { table, column });
    }
    reader.set_headers(headers.iter().collect());

    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(csv_err)
}
