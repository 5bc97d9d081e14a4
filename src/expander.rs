use crate::data::{Course, Session};
use log::debug;

/// Expands every course into one session per required hour.
///
/// Session indices are dense, zero-based and follow course order, so they
/// double as primary keys for the rest of the run.
pub fn expand_sessions(courses: &[Course]) -> Vec<Session> {
    let sessions: Vec<Session> = courses
        .iter()
        .enumerate()
        .flat_map(|(course_idx, course)| (0..course.hours).map(move |_| (course_idx, course)))
        .enumerate()
        .map(|(index, (course_idx, course))| Session {
            index,
            course_idx,
            course_name: course.name.clone(),
            group: course.group.clone(),
            size: course.size,
        })
        .collect();
    debug!("Expanded {} courses into {} sessions", courses.len(), sessions.len());
    sessions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(group: &str, name: &str, hours: u32, size: u32) -> Course {
        Course {
            group: group.into(),
            name: name.into(),
            hours,
            size,
        }
    }

    #[test]
    fn test_one_session_per_hour() {
        let courses = vec![course("G1", "Math", 3, 30), course("G2", "Art", 1, 12)];
        let sessions = expand_sessions(&courses);

        assert_eq!(sessions.len(), 4);
        assert_eq!(
            sessions.iter().map(|s| s.index).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
        assert!(sessions[..3].iter().all(|s| s.course_idx == 0 && s.course_name == "Math"));
        assert_eq!(sessions[3].course_idx, 1);
        assert_eq!(sessions[3].group, "G2");
        assert_eq!(sessions[3].size, 12);
    }

    #[test]
    fn test_zero_hour_course_yields_nothing() {
        let courses = vec![course("G1", "Math", 0, 30), course("G1", "Art", 2, 30)];
        let sessions = expand_sessions(&courses);
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].index, 0);
        assert_eq!(sessions[0].course_idx, 1);
    }

    #[test]
    fn test_empty() {
        assert!(expand_sessions(&[]).is_empty());
    }
}
