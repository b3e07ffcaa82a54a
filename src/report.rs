use std::fmt::Write;

use chrono::NaiveDate;

use crate::curriculum::{Unit, MASTERY_PASS_THRESHOLD};
use crate::grading::{self, mean, round_grade};
use crate::models::{StudentGrades, StudentSummary, UnitSummary};

/// Class average per unit over the students with at least one graded lesson in it.
pub fn summarize_units(students: &[StudentGrades]) -> Vec<UnitSummary> {
    Unit::all()
        .map(|unit| {
            let grades: Vec<u32> = students
                .iter()
                .filter_map(|student| grading::unit_grade(student, unit))
                .collect();
            UnitSummary {
                unit_name: unit.name().to_string(),
                class_average: mean(&grades).map(round_grade),
                graded_students: grades.len(),
            }
        })
        .collect()
}

pub fn format_grade(grade: Option<u32>) -> String {
    grade.map(|value| format!("{value}%")).unwrap_or_else(|| "-".to_string())
}

fn needs_attention(summaries: &[StudentSummary]) -> Vec<&StudentSummary> {
    let mut flagged: Vec<&StudentSummary> = summaries
        .iter()
        .filter(|summary| {
            summary
                .course_grade
                .is_some_and(|grade| grade <= MASTERY_PASS_THRESHOLD)
        })
        .collect();
    flagged.sort_by_key(|summary| summary.course_grade);
    flagged
}

pub fn build_report(source: &str, generated_on: NaiveDate, students: &[StudentGrades]) -> String {
    let summaries = grading::summarize_students(students);
    let units = summarize_units(students);

    let course_grades: Vec<u32> = summaries.iter().filter_map(|s| s.course_grade).collect();
    let lessons_graded: usize = summaries.iter().map(|s| s.lessons_graded).sum();

    let mut output = String::new();

    let _ = writeln!(output, "# Gradebook Report");
    let _ = writeln!(output, "Generated for {} on {}", source, generated_on);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Class Overview");

    if summaries.is_empty() {
        let _ = writeln!(output, "No students found.");
    } else {
        let _ = writeln!(output, "- Students: {}", summaries.len());
        let _ = writeln!(
            output,
            "- Students with a course grade: {}",
            course_grades.len()
        );
        let _ = writeln!(
            output,
            "- Class average: {}",
            format_grade(mean(&course_grades).map(round_grade))
        );
        let _ = writeln!(output, "- Graded lessons: {}", lessons_graded);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Unit Averages");

    for unit in &units {
        match unit.class_average {
            Some(average) => {
                let _ = writeln!(
                    output,
                    "- {}: {}% across {} students",
                    unit.unit_name, average, unit.graded_students
                );
            }
            None => {
                let _ = writeln!(output, "- {}: no graded lessons", unit.unit_name);
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Students");

    if summaries.is_empty() {
        let _ = writeln!(output, "No students found.");
    } else {
        let _ = writeln!(output, "| Student | Grade | Units graded | Lessons graded |");
        let _ = writeln!(output, "|---|---|---|---|");
        for summary in &summaries {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} |",
                summary.student_name,
                format_grade(summary.course_grade),
                summary.unit_grades.iter().flatten().count(),
                summary.lessons_graded
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Needs Attention");

    let flagged = needs_attention(&summaries);
    if flagged.is_empty() {
        let _ = writeln!(
            output,
            "No students at or below {}%.",
            MASTERY_PASS_THRESHOLD
        );
    } else {
        for summary in flagged.iter().take(10) {
            let _ = writeln!(
                output,
                "- {} at {} over {} lessons",
                summary.student_name,
                format_grade(summary.course_grade),
                summary.lessons_graded
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::{FieldKey, LessonSlot};
    use crate::models::{CompletionStatus, FieldValue};

    fn student(first: &str, module_guide: Option<u32>) -> StudentGrades {
        let mut grades = StudentGrades::new(first, "Lee");
        if let Some(score) = module_guide {
            let lesson = grades.lesson_mut(LessonSlot::from_global(1).unwrap());
            lesson.set(FieldKey::ModuleGuide, FieldValue::Score(score));
            lesson.set(
                FieldKey::Presentation,
                FieldValue::Status(CompletionStatus::Complete),
            );
        }
        grades
    }

    #[test]
    fn unit_summary_skips_ungraded_students() {
        let students = vec![
            student("Avery", Some(90)),
            student("Jules", Some(71)),
            student("Kiara", None),
        ];
        let units = summarize_units(&students);
        assert_eq!(units.len(), 10);
        assert_eq!(units[0].class_average, Some(81));
        assert_eq!(units[0].graded_students, 2);
        assert_eq!(units[1].class_average, None);
    }

    #[test]
    fn report_lists_students_and_flags_low_grades() {
        let students = vec![student("Jules", Some(55)), student("Avery", Some(92))];
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let report = build_report("mock_data.json", date, &students);

        assert!(report.starts_with("# Gradebook Report"));
        assert!(report.contains("Generated for mock_data.json on 2026-03-02"));
        assert!(report.contains("- Class average: 74%"));
        assert!(report.contains("- Forensic Math: 74% across 2 students"));
        assert!(report.contains("- Home Makeover: no graded lessons"));
        assert!(report.contains("| Avery Lee | 92% | 1 | 1 |"));
        assert!(report.contains("- Jules Lee at 55% over 1 lessons"));

        let avery = report.find("| Avery Lee").unwrap();
        let jules = report.find("| Jules Lee").unwrap();
        assert!(avery < jules);
    }

    #[test]
    fn empty_report_still_renders_sections() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let report = build_report("the gradebook database", date, &[]);
        assert!(report.contains("No students found."));
        assert!(report.contains("No students at or below 70%."));
    }
}
