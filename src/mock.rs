use std::path::Path;

use anyhow::Context;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::curriculum::{
    FieldKey, LessonKind, LessonSlot, Unit, DIAGNOSTIC_SETS, MASTERY_PASS_THRESHOLD,
    PERFECT_SCORE, UNIT_COUNT,
};
use crate::models::{CompletionStatus, FieldValue, StudentGrades, StudentRecord};

const FIRST_NAMES: [&str; 20] = [
    "Avery", "Jules", "Kiara", "Mateo", "Priya", "Owen", "Sofia", "Malik", "Hana", "Diego",
    "Leah", "Tariq", "Nora", "Elijah", "Mei", "Caleb", "Amara", "Lucas", "Ines", "Theo",
];

const LAST_NAMES: [&str; 20] = [
    "Lee", "Moreno", "Patel", "Nguyen", "Okafor", "Garcia", "Kim", "Johnson", "Rossi", "Haddad",
    "Silva", "Brooks", "Cohen", "Tanaka", "Mensah", "Novak", "Reyes", "Walsh", "Duarte", "Singh",
];

/// (min, max, weight)
const GRADE_BANDS: [(u32, u32, f64); 4] = [
    (90, 100, 0.2),
    (75, 89, 0.3),
    (60, 74, 0.4),
    (0, 59, 0.1),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockConfig {
    pub student_count: usize,
    pub seed: Option<u64>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            student_count: 80,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StudentProgress {
    FirstUnit,
    MultipleUnits,
    CompletedAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitProgress {
    NotStarted,
    InProgress { first_unit: bool },
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LessonProgress {
    NotStarted,
    WatchingPresentation,
    Completed,
}

pub fn generate_records(config: &MockConfig) -> Vec<StudentRecord> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    (0..config.student_count)
        .map(|_| generate_student(&mut rng).to_record())
        .collect()
}

fn generate_student(rng: &mut StdRng) -> StudentGrades {
    let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Student");
    let last = LAST_NAMES.choose(rng).copied().unwrap_or("Unknown");
    let mut grades = StudentGrades::new(first, last);

    let mut units: Vec<Unit> = Unit::all().collect();
    units.shuffle(rng);

    let (completed, current) = match student_progress(rng) {
        StudentProgress::FirstUnit => (0, Some((units[0], true))),
        StudentProgress::MultipleUnits => {
            let done = rng.gen_range(1..=(UNIT_COUNT as usize - 2));
            (done, Some((units[done], false)))
        }
        StudentProgress::CompletedAll => (units.len(), None),
    };

    for (position, unit) in units.iter().enumerate() {
        let progress = if position < completed {
            UnitProgress::Completed
        } else if current.map(|(current, _)| current) == Some(*unit) {
            UnitProgress::InProgress {
                first_unit: current.is_some_and(|(_, first)| first),
            }
        } else {
            UnitProgress::NotStarted
        };
        fill_unit(rng, &mut grades, *unit, progress);
    }

    grades
}

fn student_progress(rng: &mut StdRng) -> StudentProgress {
    let roll: f64 = rng.gen();
    if roll < 0.4 {
        StudentProgress::FirstUnit
    } else if roll < 0.9 {
        StudentProgress::MultipleUnits
    } else {
        StudentProgress::CompletedAll
    }
}

fn random_grade(rng: &mut StdRng) -> u32 {
    let roll: f64 = rng.gen();
    let mut cumulative = 0.0;
    for (min, max, weight) in GRADE_BANDS {
        cumulative += weight;
        if roll <= cumulative {
            return rng.gen_range(min..=max);
        }
    }
    rng.gen_range(0..=PERFECT_SCORE)
}

fn fill_unit(rng: &mut StdRng, grades: &mut StudentGrades, unit: Unit, progress: UnitProgress) {
    // A student on a first unit has always finished its first lesson.
    let current_lesson = match progress {
        UnitProgress::InProgress { first_unit: true } => rng.gen_range(2..=10),
        UnitProgress::InProgress { first_unit: false } => rng.gen_range(1..=10),
        _ => 0,
    };

    for slot in unit.lessons() {
        let index = slot.lesson().get();
        let lesson_progress = match progress {
            UnitProgress::Completed => LessonProgress::Completed,
            UnitProgress::NotStarted => LessonProgress::NotStarted,
            UnitProgress::InProgress { .. } if index < current_lesson => LessonProgress::Completed,
            UnitProgress::InProgress { .. } if index == current_lesson => {
                LessonProgress::WatchingPresentation
            }
            UnitProgress::InProgress { .. } => LessonProgress::NotStarted,
        };
        fill_lesson(rng, grades, slot, lesson_progress);
    }
}

fn put_score(grades: &mut StudentGrades, slot: LessonSlot, key: FieldKey, score: u32) {
    grades.lesson_mut(slot).set(key, FieldValue::Score(score));
}

fn put_status(
    grades: &mut StudentGrades,
    slot: LessonSlot,
    key: FieldKey,
    status: CompletionStatus,
) {
    grades.lesson_mut(slot).set(key, FieldValue::Status(status));
}

fn fill_lesson(
    rng: &mut StdRng,
    grades: &mut StudentGrades,
    slot: LessonSlot,
    progress: LessonProgress,
) {
    if slot.kind() == LessonKind::DiagnosticDay {
        fill_diagnostic_day(rng, grades, slot, progress);
        return;
    }

    let assessment = slot.kind().assessment_fields().first().copied();
    match progress {
        LessonProgress::NotStarted => {
            put_status(grades, slot, FieldKey::Presentation, CompletionStatus::NotStarted);
        }
        LessonProgress::WatchingPresentation => {
            // The assessment comes before the presentation.
            put_status(grades, slot, FieldKey::Presentation, CompletionStatus::InProgress);
            if let Some(key) = assessment {
                put_score(grades, slot, key, random_grade(rng));
            }
        }
        LessonProgress::Completed => {
            put_status(grades, slot, FieldKey::Presentation, CompletionStatus::Complete);
            if let Some(key) = assessment {
                put_score(grades, slot, key, random_grade(rng));
            }
        }
    }
}

fn fill_diagnostic_day(
    rng: &mut StdRng,
    grades: &mut StudentGrades,
    slot: LessonSlot,
    progress: LessonProgress,
) {
    let current_set = match progress {
        LessonProgress::NotStarted => 0,
        LessonProgress::WatchingPresentation => rng.gen_range(0..DIAGNOSTIC_SETS),
        LessonProgress::Completed => DIAGNOSTIC_SETS,
    };

    for set in 0..DIAGNOSTIC_SETS {
        if set < current_set {
            fill_completed_set(rng, grades, slot, set);
        } else if set == current_set && progress == LessonProgress::WatchingPresentation {
            // Diagnostic taken, presentation underway, no mastery attempts yet.
            put_score(grades, slot, FieldKey::Diagnostic(set), random_grade(rng));
            put_status(grades, slot, FieldKey::SetPresentation(set), CompletionStatus::InProgress);
        } else {
            put_status(grades, slot, FieldKey::SetPresentation(set), CompletionStatus::NotStarted);
        }
    }
}

// A perfect diagnostic ends the set. Mastery b only follows a failed mastery a.
fn fill_completed_set(rng: &mut StdRng, grades: &mut StudentGrades, slot: LessonSlot, set: usize) {
    let diagnostic = random_grade(rng);
    put_score(grades, slot, FieldKey::Diagnostic(set), diagnostic);
    if diagnostic == PERFECT_SCORE {
        return;
    }

    put_status(grades, slot, FieldKey::SetPresentation(set), CompletionStatus::Complete);
    let mastery_a = random_grade(rng);
    put_score(grades, slot, FieldKey::MasteryA(set), mastery_a);
    if mastery_a <= MASTERY_PASS_THRESHOLD {
        put_score(grades, slot, FieldKey::MasteryB(set), random_grade(rng));
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockDocument {
    pub row_data: Vec<StudentRecord>,
}

pub fn load_document(path: &Path) -> anyhow::Result<Vec<StudentRecord>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let document: MockDocument = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(document.row_data)
}

pub fn write_document(path: &Path, records: Vec<StudentRecord>) -> anyhow::Result<()> {
    let document = MockDocument { row_data: records };
    let contents = serde_json::to_string_pretty(&document)?;
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading;

    fn seeded(count: usize) -> Vec<StudentRecord> {
        generate_records(&MockConfig {
            student_count: count,
            seed: Some(7),
        })
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        assert_eq!(seeded(5), seeded(5));
        assert_eq!(seeded(12).len(), 12);
    }

    #[test]
    fn generated_fields_follow_the_layout() {
        for record in seeded(20) {
            assert_eq!(StudentGrades::from_record(&record).to_record(), record);
            assert!(FIRST_NAMES.contains(&record.first_name.as_str()));
        }
    }

    #[test]
    fn grades_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            assert!(random_grade(&mut rng) <= PERFECT_SCORE);
        }
    }

    #[test]
    fn every_student_has_started_the_course() {
        for record in seeded(30) {
            let grades = StudentGrades::from_record(&record);
            let summary = grading::summarize_student(&grades);
            assert!(summary.lessons_graded > 0, "{}", summary.student_name);
            assert!(summary.course_grade.is_some());
        }
    }

    #[test]
    fn completed_units_are_fully_marked() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut grades = StudentGrades::new("Avery", "Lee");
        let unit = Unit::new(4).unwrap();
        fill_unit(&mut rng, &mut grades, unit, UnitProgress::Completed);

        for slot in unit.lessons() {
            let lesson = grades.lesson(slot);
            if slot.kind() == LessonKind::DiagnosticDay {
                assert!(lesson.grade().is_some());
            } else {
                assert!(lesson.completion().presentation_complete);
                assert!(lesson.completion().has_assessment_grades);
            }
        }
    }

    #[test]
    fn not_started_units_have_no_grades() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut grades = StudentGrades::new("Avery", "Lee");
        let unit = Unit::new(0).unwrap();
        fill_unit(&mut rng, &mut grades, unit, UnitProgress::NotStarted);
        assert_eq!(grading::unit_grade(&grades, unit), None);
        assert_eq!(
            grades.lesson(LessonSlot::from_global(1).unwrap()).status(FieldKey::Presentation),
            Some(CompletionStatus::NotStarted)
        );
    }

    #[test]
    fn one_bad_value_keeps_the_rest_of_the_document() {
        let path = std::env::temp_dir()
            .join(format!("gradebook-bad-values-{}.json", std::process::id()));
        let contents = r#"{"rowData": [
            {"firstName": "Avery", "lastName": "Lee",
             "grade1_moduleGuide": 88, "grade1_presentation": "Completed"},
            {"firstName": "Jules", "lastName": "Moreno",
             "grade2_rca": null, "grade3_rca": 87.5, "grade4_rca": -3,
             "grade6_rca": "Done", "grade2_presentation": "In Progress"}
        ]}"#;
        std::fs::write(&path, contents).unwrap();
        let loaded = load_document(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.len(), 2);
        let avery = StudentGrades::from_record(&loaded[0]);
        assert_eq!(grading::course_grade(&avery), Some(88));
        assert_eq!(loaded[1].fields.len(), 1);
        assert_eq!(
            loaded[1].fields["grade2_presentation"],
            FieldValue::Status(CompletionStatus::InProgress)
        );
    }

    #[test]
    fn documents_round_trip_through_disk() {
        let path = std::env::temp_dir()
            .join(format!("gradebook-mock-{}.json", std::process::id()));
        let records = seeded(3);
        write_document(&path, records.clone()).unwrap();
        let loaded = load_document(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, records);
    }
}
