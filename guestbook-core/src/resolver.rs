//! Student details derived from the current selection.

use log::debug;

use crate::model::{EntityId, StudentSnapshot};
use crate::reference::ReferenceData;

/// Snapshot for `selected`, or blank when nothing (or an unknown id) is
/// selected. Never merges with a previous snapshot.
pub fn resolve_student(reference: &ReferenceData, selected: Option<&EntityId>) -> StudentSnapshot {
    let Some(id) = selected else {
        return StudentSnapshot::blank();
    };

    match reference.find_student(id) {
        Some(student) => StudentSnapshot::from_option(student),
        None => {
            debug!("Selected student {} is not in the directory", id);
            StudentSnapshot::blank()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StudentOption;

    fn student(id: EntityId, nis: &str, nisn: &str, kelas: Option<&str>) -> StudentOption {
        StudentOption {
            label: format!("{} | Siswa {}", nis, id),
            student_name: format!("Siswa {}", id),
            value: id,
            nis: Some(nis.to_string()),
            nisn: Some(nisn.to_string()),
            kelas: kelas.map(str::to_string),
        }
    }

    fn directory() -> ReferenceData {
        ReferenceData {
            staff: Vec::new(),
            students: vec![
                student(EntityId::Number(1), "1001", "0091", Some("X RPL 1")),
                student(EntityId::Number(2), "1002", "0092", Some("XI TKJ 2")),
                student(EntityId::Number(3), "1003", "0093", None),
            ],
        }
    }

    #[test]
    fn every_listed_student_resolves_to_its_own_fields() {
        let reference = directory();
        for entry in &reference.students {
            let snapshot = resolve_student(&reference, Some(&entry.value));
            assert_eq!(snapshot.nis, entry.nis.clone().unwrap());
            assert_eq!(snapshot.nisn, entry.nisn.clone().unwrap());
            assert_eq!(snapshot.kelas, entry.kelas.clone().unwrap_or_default());
        }
    }

    #[test]
    fn textual_id_matches_numeric_entry() {
        let reference = directory();
        let id = EntityId::parse("2").unwrap();
        assert_eq!(resolve_student(&reference, Some(&id)).kelas, "XI TKJ 2");
    }

    #[test]
    fn zero_padded_id_resolves_to_its_own_entry() {
        let padded = EntityId::parse("0012").unwrap();
        let plain = EntityId::parse("12").unwrap();
        let reference = ReferenceData {
            staff: Vec::new(),
            students: vec![
                student(padded.clone(), "1", "0001", Some("X RPL 1")),
                student(plain.clone(), "2", "0002", Some("XII TKJ 1")),
            ],
        };

        assert_eq!(resolve_student(&reference, Some(&padded)).nis, "1");
        assert_eq!(resolve_student(&reference, Some(&plain)).nis, "2");
        assert_eq!(resolve_student(&reference, Some(&plain)).kelas, "XII TKJ 1");
    }

    #[test]
    fn cleared_or_unknown_selection_is_blank() {
        let reference = directory();
        assert!(resolve_student(&reference, None).is_blank());
        assert!(resolve_student(&reference, Some(&EntityId::Number(99))).is_blank());
        assert!(resolve_student(&ReferenceData::empty(), Some(&EntityId::Number(1))).is_blank());
    }

    #[test]
    fn missing_class_displays_dash() {
        let reference = directory();
        let snapshot = resolve_student(&reference, Some(&EntityId::Number(3)));
        assert_eq!(snapshot.nis, "1003");
        assert_eq!(snapshot.class_label(), "-");
    }
}
