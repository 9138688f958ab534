use std::collections::HashSet;

use crate::models::{Activity, ActivityStats, AttendanceRecord, Student};

/// Present means an enrolled student with at least one record for this
/// activity; records for students outside the roster are not counted.
pub fn activity_stats(
    activity: &Activity,
    roster: &[Student],
    records: &[AttendanceRecord],
) -> ActivityStats {
    let attended: HashSet<&str> = records
        .iter()
        .filter(|r| r.activity_id == activity.id)
        .map(|r| r.student_id.as_str())
        .collect();
    let total_students = roster.len();
    let present_count = roster
        .iter()
        .filter(|s| attended.contains(s.id.as_str()))
        .count();
    let present_rate = if total_students == 0 {
        0.0
    } else {
        present_count as f64 * 100.0 / total_students as f64
    };
    ActivityStats {
        activity_id: activity.id.clone(),
        activity_name: activity.name.clone(),
        total_students,
        present_count,
        absent_count: total_students - present_count,
        present_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(id: &str) -> Student {
        Student {
            id: id.into(),
            last_name: String::new(),
            first_name: String::new(),
            dob: String::new(),
            class_id: "K1".into(),
        }
    }

    fn record(activity: &str, student: &str) -> AttendanceRecord {
        AttendanceRecord {
            id: format!("{activity}-{student}"),
            activity_id: activity.into(),
            student_id: student.into(),
            timestamp: String::new(),
        }
    }

    #[test]
    fn counts_enrolled_students_once() {
        let activity = Activity {
            id: "A1".into(),
            name: "Week 1".into(),
            date_time: String::new(),
            subject_id: "S1".into(),
            class_id: "K1".into(),
        };
        let roster = vec![student("SV001"), student("SV002"), student("SV003"), student("SV004")];
        let records = vec![
            record("A1", "SV001"),
            record("A1", "SV001"),
            record("A1", "SV003"),
            record("A1", "OUTSIDER"),
            record("A2", "SV002"),
        ];
        let stats = activity_stats(&activity, &roster, &records);
        assert_eq!(stats.total_students, 4);
        assert_eq!(stats.present_count, 2);
        assert_eq!(stats.absent_count, 2);
        assert_eq!(stats.present_rate, 50.0);

        let empty = activity_stats(&activity, &[], &records);
        assert_eq!(empty.present_rate, 0.0);
    }
}
