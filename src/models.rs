use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::curriculum::{
    parse_field_name, FieldKey, LessonKind, LessonSlot, DIAGNOSTIC_SETS, PERFECT_SCORE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionStatus {
    #[serde(rename = "Not Started", alias = "Not started")]
    NotStarted,
    #[serde(rename = "In Progress", alias = "In progress")]
    InProgress,
    #[serde(rename = "Completed", alias = "Complete")]
    Complete,
}

impl CompletionStatus {
    pub fn label(self) -> &'static str {
        match self {
            CompletionStatus::NotStarted => "Not Started",
            CompletionStatus::InProgress => "In Progress",
            CompletionStatus::Complete => "Completed",
        }
    }
}

impl FromStr for CompletionStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "not started" => Ok(CompletionStatus::NotStarted),
            "in progress" => Ok(CompletionStatus::InProgress),
            "completed" | "complete" => Ok(CompletionStatus::Complete),
            other => Err(format!("unknown completion status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Score(u32),
    Status(CompletionStatus),
}

impl FieldValue {
    /// Scores are whole numbers in 0..=100; statuses are one of the known labels.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => number
                .as_u64()
                .filter(|score| *score <= u64::from(PERFECT_SCORE))
                .map(|score| FieldValue::Score(score as u32)),
            Value::String(label) => label.parse().ok().map(FieldValue::Status),
            _ => None,
        }
    }
}

/// One student's grade history in the flat `grade{N}_{field}` shape used by
/// mock files, CSV imports and the grid rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawStudentRecord")]
pub struct StudentRecord {
    pub first_name: String,
    pub last_name: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStudentRecord {
    first_name: String,
    last_name: String,
    #[serde(flatten)]
    fields: BTreeMap<String, Value>,
}

impl From<RawStudentRecord> for StudentRecord {
    fn from(raw: RawStudentRecord) -> Self {
        let mut record = StudentRecord::new(&raw.first_name, &raw.last_name);
        for (name, value) in raw.fields {
            match FieldValue::from_json(&value) {
                Some(parsed) => {
                    record.fields.insert(name, parsed);
                }
                None => debug!(
                    student = %format!("{} {}", record.first_name, record.last_name),
                    field = %name,
                    %value,
                    "ignoring unreadable grade value"
                ),
            }
        }
        record
    }
}

impl StudentRecord {
    pub fn new(first_name: &str, last_name: &str) -> Self {
        Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            fields: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticSet {
    pub diagnostic: Option<u32>,
    pub presentation: Option<CompletionStatus>,
    pub mastery_a: Option<u32>,
    pub mastery_b: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonRecord {
    ModuleGuide {
        module_guide: Option<u32>,
        presentation: Option<CompletionStatus>,
    },
    Rca {
        rca: Option<u32>,
        presentation: Option<CompletionStatus>,
    },
    PostTest {
        posttest: Option<u32>,
        presentation: Option<CompletionStatus>,
    },
    Diagnostic {
        sets: [DiagnosticSet; DIAGNOSTIC_SETS],
    },
    Enrichment {
        presentation: Option<CompletionStatus>,
    },
}

enum FieldRef<'a> {
    Score(&'a mut Option<u32>),
    Status(&'a mut Option<CompletionStatus>),
}

impl LessonRecord {
    pub fn empty(kind: LessonKind) -> Self {
        match kind {
            LessonKind::ModuleGuide => LessonRecord::ModuleGuide {
                module_guide: None,
                presentation: None,
            },
            LessonKind::Rca => LessonRecord::Rca {
                rca: None,
                presentation: None,
            },
            LessonKind::PostTest => LessonRecord::PostTest {
                posttest: None,
                presentation: None,
            },
            LessonKind::DiagnosticDay => LessonRecord::Diagnostic {
                sets: [DiagnosticSet::default(); DIAGNOSTIC_SETS],
            },
            LessonKind::Enrichment => LessonRecord::Enrichment { presentation: None },
        }
    }

    pub fn kind(&self) -> LessonKind {
        match self {
            LessonRecord::ModuleGuide { .. } => LessonKind::ModuleGuide,
            LessonRecord::Rca { .. } => LessonKind::Rca,
            LessonRecord::PostTest { .. } => LessonKind::PostTest,
            LessonRecord::Diagnostic { .. } => LessonKind::DiagnosticDay,
            LessonRecord::Enrichment { .. } => LessonKind::Enrichment,
        }
    }

    fn field_mut(&mut self, key: FieldKey) -> Option<FieldRef<'_>> {
        let field = match (self, key) {
            (LessonRecord::ModuleGuide { module_guide, .. }, FieldKey::ModuleGuide) => {
                FieldRef::Score(module_guide)
            }
            (LessonRecord::Rca { rca, .. }, FieldKey::Rca) => FieldRef::Score(rca),
            (LessonRecord::PostTest { posttest, .. }, FieldKey::PostTest) => {
                FieldRef::Score(posttest)
            }
            (
                LessonRecord::ModuleGuide { presentation, .. }
                | LessonRecord::Rca { presentation, .. }
                | LessonRecord::PostTest { presentation, .. }
                | LessonRecord::Enrichment { presentation },
                FieldKey::Presentation,
            ) => FieldRef::Status(presentation),
            (LessonRecord::Diagnostic { sets }, FieldKey::Diagnostic(set)) => {
                FieldRef::Score(&mut sets.get_mut(set)?.diagnostic)
            }
            (LessonRecord::Diagnostic { sets }, FieldKey::SetPresentation(set)) => {
                FieldRef::Status(&mut sets.get_mut(set)?.presentation)
            }
            (LessonRecord::Diagnostic { sets }, FieldKey::MasteryA(set)) => {
                FieldRef::Score(&mut sets.get_mut(set)?.mastery_a)
            }
            (LessonRecord::Diagnostic { sets }, FieldKey::MasteryB(set)) => {
                FieldRef::Score(&mut sets.get_mut(set)?.mastery_b)
            }
            _ => return None,
        };
        Some(field)
    }

    pub fn get(&self, key: FieldKey) -> Option<FieldValue> {
        let mut copy = *self;
        match copy.field_mut(key)? {
            FieldRef::Score(score) => score.map(FieldValue::Score),
            FieldRef::Status(status) => status.map(FieldValue::Status),
        }
    }

    pub fn score(&self, key: FieldKey) -> Option<u32> {
        match self.get(key) {
            Some(FieldValue::Score(score)) => Some(score),
            _ => None,
        }
    }

    pub fn status(&self, key: FieldKey) -> Option<CompletionStatus> {
        match self.get(key) {
            Some(FieldValue::Status(status)) => Some(status),
            _ => None,
        }
    }

    /// Stores a value, returning false when the field is foreign to this
    /// lesson kind, the value has the wrong type or a score is above 100.
    pub fn set(&mut self, key: FieldKey, value: FieldValue) -> bool {
        match (self.field_mut(key), value) {
            (Some(FieldRef::Score(slot)), FieldValue::Score(score)) if score <= PERFECT_SCORE => {
                *slot = Some(score);
                true
            }
            (Some(FieldRef::Status(slot)), FieldValue::Status(status)) => {
                *slot = Some(status);
                true
            }
            _ => false,
        }
    }

    /// Present fields in display order.
    pub fn entries(&self) -> Vec<(FieldKey, FieldValue)> {
        self.kind()
            .fields()
            .into_iter()
            .filter_map(|key| self.get(key).map(|value| (key, value)))
            .collect()
    }
}

/// Structured counterpart of [`StudentRecord`], keyed by lesson slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentGrades {
    pub first_name: String,
    pub last_name: String,
    lessons: BTreeMap<LessonSlot, LessonRecord>,
}

impl StudentGrades {
    pub fn new(first_name: &str, last_name: &str) -> Self {
        Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            lessons: BTreeMap::new(),
        }
    }

    pub fn from_record(record: &StudentRecord) -> Self {
        let mut grades = Self::new(&record.first_name, &record.last_name);

        for (name, value) in &record.fields {
            let Some((slot, key)) = parse_field_name(name) else {
                debug!(field = %name, "ignoring field outside the gradebook layout");
                continue;
            };
            if !grades.lesson_mut(slot).set(key, *value) {
                debug!(field = %name, ?value, "ignoring value of the wrong type or range");
            }
        }

        grades
    }

    pub fn to_record(&self) -> StudentRecord {
        let mut record = StudentRecord::new(&self.first_name, &self.last_name);
        for (slot, lesson) in &self.lessons {
            for (key, value) in lesson.entries() {
                record.fields.insert(slot.field_name(key), value);
            }
        }
        record
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Lessons without any stored field read as empty records of their kind.
    pub fn lesson(&self, slot: LessonSlot) -> LessonRecord {
        self.lessons
            .get(&slot)
            .copied()
            .unwrap_or_else(|| LessonRecord::empty(slot.kind()))
    }

    pub fn lesson_mut(&mut self, slot: LessonSlot) -> &mut LessonRecord {
        self.lessons
            .entry(slot)
            .or_insert_with(|| LessonRecord::empty(slot.kind()))
    }
}

/// Backend document: students joined with enrollments, class periods and courses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub studentid: Uuid,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub enrollments: Vec<Enrollment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub enrollmentid: Uuid,
    pub enrollmentdate: NaiveDate,
    pub status: String,
    pub classperiods: Option<ClassPeriod>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassPeriod {
    pub periodid: Uuid,
    pub periodname: String,
    pub schedule: String,
    pub courses: Option<Course>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub courseid: Uuid,
    pub coursename: String,
    pub coursedescription: String,
}

#[derive(Debug, Clone)]
pub struct StudentSummary {
    pub student_name: String,
    pub course_grade: Option<u32>,
    pub unit_grades: Vec<Option<u32>>,
    pub lessons_graded: usize,
}

#[derive(Debug, Clone)]
pub struct UnitSummary {
    pub unit_name: String,
    pub class_average: Option<u32>,
    pub graded_students: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_rows_from_json() {
        let json = r#"{
            "firstName": "Avery",
            "lastName": "Lee",
            "grade1_moduleGuide": 88,
            "grade1_presentation": "Completed",
            "grade5_presentation2": "In Progress"
        }"#;
        let record: StudentRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.first_name, "Avery");
        assert_eq!(record.last_name, "Lee");
        assert_eq!(record.fields["grade1_moduleGuide"], FieldValue::Score(88));
        assert_eq!(
            record.fields["grade5_presentation2"],
            FieldValue::Status(CompletionStatus::InProgress)
        );
    }

    #[test]
    fn unreadable_values_are_skipped_field_by_field() {
        let json = r#"{
            "firstName": "Jules",
            "lastName": "Moreno",
            "grade1_moduleGuide": 91,
            "grade1_presentation": "complete",
            "grade2_rca": null,
            "grade3_rca": 87.5,
            "grade4_rca": -3,
            "grade6_rca": 250,
            "grade8_posttest": "Done",
            "grade8_presentation": true
        }"#;
        let record: StudentRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.fields.len(), 2);
        assert_eq!(record.fields["grade1_moduleGuide"], FieldValue::Score(91));
        assert_eq!(
            record.fields["grade1_presentation"],
            FieldValue::Status(CompletionStatus::Complete)
        );
    }

    #[test]
    fn scores_above_one_hundred_are_not_stored() {
        let mut record = StudentRecord::new("Avery", "Lee");
        record
            .fields
            .insert("grade1_moduleGuide".to_string(), FieldValue::Score(250));
        record.fields.insert(
            "grade1_presentation".to_string(),
            FieldValue::Status(CompletionStatus::Complete),
        );

        let grades = StudentGrades::from_record(&record);
        let slot = LessonSlot::from_global(1).unwrap();
        assert_eq!(grades.lesson(slot).score(FieldKey::ModuleGuide), None);
        assert_eq!(crate::grading::course_grade(&grades), None);

        let mut lesson = LessonRecord::empty(LessonKind::Rca);
        assert!(!lesson.set(FieldKey::Rca, FieldValue::Score(101)));
        assert!(lesson.set(FieldKey::Rca, FieldValue::Score(100)));
        assert_eq!(lesson.score(FieldKey::Rca), Some(100));
    }

    #[test]
    fn accepts_sibling_status_spellings() {
        assert_eq!(
            serde_json::from_str::<CompletionStatus>("\"Complete\"").unwrap(),
            CompletionStatus::Complete
        );
        assert_eq!(
            "Not started".parse::<CompletionStatus>().unwrap(),
            CompletionStatus::NotStarted
        );
        assert!("Done".parse::<CompletionStatus>().is_err());
    }

    #[test]
    fn structured_form_keeps_the_field_name_contract() {
        let mut record = StudentRecord::new("Jules", "Moreno");
        record
            .fields
            .insert("grade15_diagnostic3".to_string(), FieldValue::Score(65));
        record.fields.insert(
            "grade15_presentation3".to_string(),
            FieldValue::Status(CompletionStatus::Complete),
        );
        record
            .fields
            .insert("grade18_posttest".to_string(), FieldValue::Score(91));

        let grades = StudentGrades::from_record(&record);
        let diagnostic = grades.lesson(LessonSlot::from_global(15).unwrap());
        assert_eq!(diagnostic.score(FieldKey::Diagnostic(2)), Some(65));
        assert_eq!(grades.to_record(), record);
    }

    #[test]
    fn drops_fields_outside_the_layout() {
        let mut record = StudentRecord::new("Kiara", "Patel");
        record
            .fields
            .insert("grade2_moduleGuide".to_string(), FieldValue::Score(70));
        record.fields.insert(
            "grade3_rca".to_string(),
            FieldValue::Status(CompletionStatus::Complete),
        );
        record
            .fields
            .insert("grade3_presentation".to_string(), FieldValue::Score(12));

        let grades = StudentGrades::from_record(&record);
        assert!(grades.to_record().fields.is_empty());
    }

    #[test]
    fn missing_lessons_read_as_empty() {
        let grades = StudentGrades::new("Avery", "Lee");
        let slot = LessonSlot::from_global(9).unwrap();
        assert_eq!(grades.lesson(slot), LessonRecord::empty(LessonKind::DiagnosticDay));
        assert!(grades.lesson(slot).entries().is_empty());
    }
}
