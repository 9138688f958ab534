use crate::models::Student;

/// Builds students from roster rows that were already read out of a
/// spreadsheet. Columns are `[seq, id, lastName, firstName, dob]` and the
/// first row is a header. Rows with a blank or missing id are skipped.
pub fn students_from_rows<R: AsRef<[String]>>(rows: &[R], class_id: &str) -> Vec<Student> {
    rows.iter()
        .skip(1)
        .filter_map(|row| {
            let row = row.as_ref();
            let cell = |i: usize| row.get(i).map(|c| c.trim().to_string()).unwrap_or_default();
            let id = cell(1);
            if id.is_empty() {
                return None;
            }
            Some(Student {
                id,
                last_name: cell(2),
                first_name: cell(3),
                dob: cell(4),
                class_id: class_id.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn maps_rows_after_header() {
        let rows = vec![
            row(&["STT", "Ma SV", "Ho dem", "Ten", "Ngay sinh"]),
            row(&["1", " SV001 ", "Nguyen Van", "An", "01/02/2004"]),
            row(&["2", "", "Blank", "Id", ""]),
            row(&["3"]),
            row(&["4", "SV004", "Le"]),
        ];
        let students = students_from_rows(&rows, "K1");
        assert_eq!(students.len(), 2);
        assert_eq!(students[0].id, "SV001");
        assert_eq!(students[0].dob, "01/02/2004");
        assert_eq!(students[1].id, "SV004");
        assert_eq!(students[1].first_name, "");
        assert!(students.iter().all(|s| s.class_id == "K1"));
    }
}
