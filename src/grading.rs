use crate::curriculum::{LessonSlot, Unit, MASTERY_PASS_THRESHOLD, PERFECT_SCORE};
use crate::models::{
    CompletionStatus, DiagnosticSet, LessonRecord, StudentGrades, StudentSummary,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonCompletion {
    pub presentation_complete: bool,
    pub has_assessment_grades: bool,
}

impl LessonCompletion {
    pub fn is_complete(&self) -> bool {
        self.presentation_complete && self.has_assessment_grades
    }
}

impl LessonRecord {
    pub fn completion(&self) -> LessonCompletion {
        let kind = self.kind();
        LessonCompletion {
            presentation_complete: kind
                .presentation_fields()
                .into_iter()
                .all(|key| self.status(key) == Some(CompletionStatus::Complete)),
            has_assessment_grades: kind
                .assessment_fields()
                .into_iter()
                .all(|key| self.score(key).is_some()),
        }
    }

    /// Diagnostic days grade each attempted set regardless of completion;
    /// every other lesson is ungraded until it is complete.
    pub fn grade(&self) -> Option<u32> {
        if let LessonRecord::Diagnostic { sets } = self {
            let contributions: Vec<u32> =
                sets.iter().filter_map(diagnostic_contribution).collect();
            return mean(&contributions).map(round_grade);
        }

        if !self.completion().is_complete() {
            return None;
        }

        let scores: Vec<u32> = self
            .kind()
            .assessment_fields()
            .into_iter()
            .filter_map(|key| self.score(key))
            .collect();
        mean(&scores).map(round_grade)
    }
}

/// A perfect diagnostic stands on its own; otherwise the best mastery retry
/// above the pass threshold replaces the diagnostic score.
pub fn diagnostic_contribution(set: &DiagnosticSet) -> Option<u32> {
    let diagnostic = set.diagnostic?;
    if diagnostic == PERFECT_SCORE {
        return Some(PERFECT_SCORE);
    }

    let best_retry = [set.mastery_a, set.mastery_b]
        .into_iter()
        .flatten()
        .filter(|score| *score > MASTERY_PASS_THRESHOLD)
        .max();
    Some(best_retry.unwrap_or(diagnostic))
}

pub fn mean<T: Copy + Into<f64>>(values: &[T]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let total: f64 = values.iter().map(|value| (*value).into()).sum();
    Some(total / values.len() as f64)
}

pub fn round_grade(value: f64) -> u32 {
    value.round() as u32
}

pub fn lesson_grade(grades: &StudentGrades, slot: LessonSlot) -> Option<u32> {
    grades.lesson(slot).grade()
}

/// Unrounded mean of the graded lessons in a unit.
pub fn unit_average(grades: &StudentGrades, unit: Unit) -> Option<f64> {
    let lesson_grades: Vec<Option<u32>> =
        unit.lessons().map(|slot| lesson_grade(grades, slot)).collect();
    unit_average_from_lessons(&lesson_grades)
}

pub fn unit_average_from_lessons(lesson_grades: &[Option<u32>]) -> Option<f64> {
    let graded: Vec<u32> = lesson_grades.iter().flatten().copied().collect();
    mean(&graded)
}

pub fn unit_grade(grades: &StudentGrades, unit: Unit) -> Option<u32> {
    unit_average(grades, unit).map(round_grade)
}

/// Average of unit averages; ungraded units are left out, not counted as zero.
pub fn course_grade(grades: &StudentGrades) -> Option<u32> {
    let unit_averages: Vec<Option<f64>> =
        Unit::all().map(|unit| unit_average(grades, unit)).collect();
    course_grade_from_units(&unit_averages)
}

pub fn course_grade_from_units(unit_averages: &[Option<f64>]) -> Option<u32> {
    let graded: Vec<f64> = unit_averages.iter().flatten().copied().collect();
    mean(&graded).map(round_grade)
}

pub fn summarize_student(grades: &StudentGrades) -> StudentSummary {
    StudentSummary {
        student_name: grades.display_name(),
        course_grade: course_grade(grades),
        unit_grades: Unit::all().map(|unit| unit_grade(grades, unit)).collect(),
        lessons_graded: LessonSlot::all()
            .filter(|slot| lesson_grade(grades, *slot).is_some())
            .count(),
    }
}

/// Summaries in display-name order.
pub fn summarize_students(students: &[StudentGrades]) -> Vec<StudentSummary> {
    let mut summaries: Vec<StudentSummary> = students.iter().map(summarize_student).collect();
    summaries.sort_by_cached_key(|summary| summary.student_name.to_lowercase());
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::FieldKey;
    use crate::models::FieldValue;

    fn slot(global: u32) -> LessonSlot {
        LessonSlot::from_global(global).unwrap()
    }

    fn complete(grades: &mut StudentGrades, global: u32, key: FieldKey) {
        grades
            .lesson_mut(slot(global))
            .set(key, FieldValue::Status(CompletionStatus::Complete));
    }

    fn score(grades: &mut StudentGrades, global: u32, key: FieldKey, value: u32) {
        grades
            .lesson_mut(slot(global))
            .set(key, FieldValue::Score(value));
    }

    fn set(diagnostic: Option<u32>, mastery_a: Option<u32>, mastery_b: Option<u32>) -> DiagnosticSet {
        DiagnosticSet {
            diagnostic,
            presentation: None,
            mastery_a,
            mastery_b,
        }
    }

    #[test]
    fn complete_regular_lesson_uses_its_assessment() {
        let mut grades = StudentGrades::new("Avery", "Lee");
        score(&mut grades, 12, FieldKey::Rca, 87);
        complete(&mut grades, 12, FieldKey::Presentation);

        let completion = grades.lesson(slot(12)).completion();
        assert!(completion.presentation_complete);
        assert!(completion.has_assessment_grades);
        assert_eq!(lesson_grade(&grades, slot(12)), Some(87));
    }

    #[test]
    fn incomplete_presentation_leaves_lesson_ungraded() {
        let mut grades = StudentGrades::new("Avery", "Lee");
        score(&mut grades, 1, FieldKey::ModuleGuide, 92);
        grades.lesson_mut(slot(1)).set(
            FieldKey::Presentation,
            FieldValue::Status(CompletionStatus::InProgress),
        );

        let completion = grades.lesson(slot(1)).completion();
        assert!(!completion.presentation_complete);
        assert!(completion.has_assessment_grades);
        assert_eq!(lesson_grade(&grades, slot(1)), None);
    }

    #[test]
    fn missing_assessment_leaves_lesson_ungraded() {
        let mut grades = StudentGrades::new("Avery", "Lee");
        complete(&mut grades, 8, FieldKey::Presentation);
        assert!(!grades.lesson(slot(8)).completion().has_assessment_grades);
        assert_eq!(lesson_grade(&grades, slot(8)), None);
    }

    #[test]
    fn enrichment_lessons_never_carry_a_grade() {
        let mut grades = StudentGrades::new("Avery", "Lee");
        complete(&mut grades, 7, FieldKey::Presentation);
        complete(&mut grades, 10, FieldKey::Presentation);
        assert!(grades.lesson(slot(10)).completion().is_complete());
        assert_eq!(lesson_grade(&grades, slot(7)), None);
        assert_eq!(lesson_grade(&grades, slot(10)), None);
    }

    #[test]
    fn perfect_diagnostic_short_circuits_retries() {
        assert_eq!(diagnostic_contribution(&set(Some(100), Some(40), None)), Some(100));

        let mut grades = StudentGrades::new("Jules", "Moreno");
        score(&mut grades, 5, FieldKey::Diagnostic(0), 100);
        assert_eq!(lesson_grade(&grades, slot(5)), Some(100));
    }

    #[test]
    fn best_passing_mastery_replaces_diagnostic() {
        assert_eq!(diagnostic_contribution(&set(Some(65), Some(80), Some(72))), Some(80));
        assert_eq!(diagnostic_contribution(&set(Some(65), Some(60), Some(95))), Some(95));
    }

    #[test]
    fn failing_mastery_falls_back_to_diagnostic() {
        assert_eq!(diagnostic_contribution(&set(Some(65), Some(60), None)), Some(65));
        assert_eq!(diagnostic_contribution(&set(Some(65), Some(70), Some(70))), Some(65));
    }

    #[test]
    fn unattempted_diagnostic_set_contributes_nothing() {
        assert_eq!(diagnostic_contribution(&set(None, Some(90), Some(90))), None);

        let grades = StudentGrades::new("Kiara", "Patel");
        assert_eq!(lesson_grade(&grades, slot(9)), None);
    }

    #[test]
    fn diagnostic_day_averages_attempted_sets() {
        let mut grades = StudentGrades::new("Kiara", "Patel");
        score(&mut grades, 29, FieldKey::Diagnostic(0), 100);
        score(&mut grades, 29, FieldKey::Diagnostic(1), 65);
        score(&mut grades, 29, FieldKey::MasteryA(1), 80);
        score(&mut grades, 29, FieldKey::Diagnostic(3), 50);
        assert_eq!(lesson_grade(&grades, slot(29)), Some(77));
    }

    #[test]
    fn lesson_grades_round_half_up() {
        assert_eq!(round_grade(mean(&[70u32, 71]).unwrap()), 71);
        assert_eq!(round_grade(mean(&[70u32, 70, 71]).unwrap()), 70);
    }

    #[test]
    fn unit_grade_skips_ungraded_lessons() {
        fn rounded(lesson_grades: &[Option<u32>]) -> Option<u32> {
            unit_average_from_lessons(lesson_grades).map(round_grade)
        }
        assert_eq!(rounded(&[Some(90), None, Some(70)]), Some(80));
        assert_eq!(rounded(&[None, None]), None);
    }

    #[test]
    fn course_grade_skips_ungraded_units() {
        assert_eq!(
            course_grade_from_units(&[Some(80.0), None, Some(100.0)]),
            Some(90)
        );
        assert_eq!(course_grade_from_units(&[None, None]), None);
    }

    #[test]
    fn course_grade_weighs_units_equally() {
        let mut grades = StudentGrades::new("Avery", "Lee");
        score(&mut grades, 1, FieldKey::ModuleGuide, 100);
        complete(&mut grades, 1, FieldKey::Presentation);
        for global in [11, 12, 13] {
            let key = if global == 11 { FieldKey::ModuleGuide } else { FieldKey::Rca };
            score(&mut grades, global, key, 60);
            complete(&mut grades, global, FieldKey::Presentation);
        }

        let first = Unit::new(0).unwrap();
        let second = Unit::new(1).unwrap();
        assert_eq!(unit_grade(&grades, first), Some(100));
        assert_eq!(unit_grade(&grades, second), Some(60));
        assert_eq!(unit_grade(&grades, Unit::new(2).unwrap()), None);
        assert_eq!(course_grade(&grades), Some(80));
    }

    #[test]
    fn course_grade_averages_unrounded_unit_means() {
        // Rounding each unit first (71, 70) would give 71.
        assert_eq!(course_grade_from_units(&[Some(70.6), Some(70.3)]), Some(70));
    }

    #[test]
    fn summary_counts_graded_lessons() {
        let mut grades = StudentGrades::new("Avery", "Lee");
        score(&mut grades, 1, FieldKey::ModuleGuide, 84);
        complete(&mut grades, 1, FieldKey::Presentation);
        score(&mut grades, 5, FieldKey::Diagnostic(0), 72);

        let summary = summarize_student(&grades);
        assert_eq!(summary.student_name, "Avery Lee");
        assert_eq!(summary.lessons_graded, 2);
        assert_eq!(summary.unit_grades[0], Some(78));
        assert_eq!(summary.course_grade, Some(78));
        assert_eq!(summary.unit_grades.len(), 10);
    }
}
