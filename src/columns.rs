use std::collections::BTreeMap;

use serde::Serialize;

use crate::curriculum::{FieldKey, LessonSlot, Unit};
use crate::grading;
use crate::models::{CompletionStatus, FieldValue, StudentGrades, StudentRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pinned {
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupShow {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ValueGetter {
    FirstName,
    LastName,
    CourseGrade,
    UnitGrade { unit: Unit },
    LessonGrade { slot: LessonSlot },
    Field { slot: LessonSlot, key: FieldKey },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueFormatter {
    Percent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Grade(Option<u32>),
    Status(Option<CompletionStatus>),
}

impl ValueGetter {
    pub fn evaluate(&self, row: &StudentGrades) -> CellValue {
        match self {
            ValueGetter::FirstName => CellValue::Text(row.first_name.clone()),
            ValueGetter::LastName => CellValue::Text(row.last_name.clone()),
            ValueGetter::CourseGrade => CellValue::Grade(grading::course_grade(row)),
            ValueGetter::UnitGrade { unit } => CellValue::Grade(grading::unit_grade(row, *unit)),
            ValueGetter::LessonGrade { slot } => {
                CellValue::Grade(grading::lesson_grade(row, *slot))
            }
            ValueGetter::Field { slot, key } => {
                let value = row.lesson(*slot).get(*key);
                if key.is_presentation() {
                    CellValue::Status(match value {
                        Some(FieldValue::Status(status)) => Some(status),
                        _ => None,
                    })
                } else {
                    CellValue::Grade(match value {
                        Some(FieldValue::Score(score)) => Some(score),
                        _ => None,
                    })
                }
            }
        }
    }

    // Plain field columns are read by the grid straight from the row.
    fn reads_field(&self) -> bool {
        matches!(
            self,
            ValueGetter::FirstName | ValueGetter::LastName | ValueGetter::Field { .. }
        )
    }
}

impl ValueFormatter {
    pub fn format(&self, value: &CellValue) -> String {
        match (self, value) {
            (ValueFormatter::Percent, CellValue::Grade(Some(grade))) => format!("{grade}%"),
            (ValueFormatter::Percent, CellValue::Grade(None)) => String::new(),
            (ValueFormatter::Percent, other) => other.display(),
        }
    }
}

impl CellValue {
    pub fn display(&self) -> String {
        match self {
            CellValue::Text(text) => text.clone(),
            CellValue::Grade(Some(grade)) => grade.to_string(),
            CellValue::Status(Some(status)) => status.label().to_string(),
            CellValue::Grade(None) | CellValue::Status(None) => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnLeaf {
    pub col_id: String,
    pub header_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned: Option<Pinned>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortDirection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_group_show: Option<GroupShow>,
    #[serde(skip_serializing_if = "ValueGetter::reads_field")]
    pub value_getter: ValueGetter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_formatter: Option<ValueFormatter>,
}

impl ColumnLeaf {
    fn computed(col_id: String, header_name: &str, value_getter: ValueGetter) -> Self {
        Self {
            col_id,
            header_name: header_name.to_string(),
            field: None,
            pinned: None,
            sort: None,
            column_group_show: None,
            value_getter,
            value_formatter: Some(ValueFormatter::Percent),
        }
    }

    fn name(field: &str, header_name: &str, value_getter: ValueGetter) -> Self {
        Self {
            col_id: field.to_string(),
            header_name: header_name.to_string(),
            field: Some(field.to_string()),
            pinned: Some(Pinned::Left),
            sort: None,
            column_group_show: None,
            value_getter,
            value_formatter: None,
        }
    }

    fn for_field(slot: LessonSlot, key: FieldKey) -> Self {
        let name = slot.field_name(key);
        Self {
            col_id: name.clone(),
            header_name: key.header(),
            field: Some(name),
            pinned: None,
            sort: None,
            column_group_show: Some(GroupShow::Open),
            value_getter: ValueGetter::Field { slot, key },
            value_formatter: (!key.is_presentation()).then_some(ValueFormatter::Percent),
        }
    }

    pub fn evaluate(&self, row: &StudentGrades) -> CellValue {
        self.value_getter.evaluate(row)
    }

    pub fn render(&self, row: &StudentGrades) -> String {
        let value = self.evaluate(row);
        match &self.value_formatter {
            Some(formatter) => formatter.format(&value),
            None => value.display(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnGroup {
    pub header_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_by_default: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_group_show: Option<GroupShow>,
    pub children: Vec<ColumnDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnDef {
    Group(ColumnGroup),
    Leaf(ColumnLeaf),
}

impl ColumnDef {
    pub fn leaves(&self) -> Vec<&ColumnLeaf> {
        match self {
            ColumnDef::Leaf(leaf) => vec![leaf],
            ColumnDef::Group(group) => group.children.iter().flat_map(ColumnDef::leaves).collect(),
        }
    }
}

/// Pinned name and course grade columns, then one collapsed group per unit.
pub fn build_column_defs() -> Vec<ColumnDef> {
    let first = ColumnLeaf::name("firstName", "First Name", ValueGetter::FirstName);
    let mut last = ColumnLeaf::name("lastName", "Last Name", ValueGetter::LastName);
    last.sort = Some(SortDirection::Asc);

    let mut course =
        ColumnLeaf::computed("courseGrade".to_string(), "Grade", ValueGetter::CourseGrade);
    course.pinned = Some(Pinned::Left);

    let mut columns = vec![
        ColumnDef::Leaf(first),
        ColumnDef::Leaf(last),
        ColumnDef::Leaf(course),
    ];
    columns.extend(Unit::all().map(unit_group));
    columns
}

fn unit_group(unit: Unit) -> ColumnDef {
    let mut unit_grade = ColumnLeaf::computed(
        format!("unit{}_grade", unit.number()),
        "Unit Grade",
        ValueGetter::UnitGrade { unit },
    );
    unit_grade.column_group_show = Some(GroupShow::Closed);

    let mut children = vec![ColumnDef::Leaf(unit_grade)];
    children.extend(unit.lessons().map(lesson_group));

    ColumnDef::Group(ColumnGroup {
        header_name: unit.name().to_string(),
        group_id: Some(format!("unit{}", unit.number())),
        open_by_default: Some(false),
        column_group_show: None,
        children,
    })
}

fn lesson_group(slot: LessonSlot) -> ColumnDef {
    let mut lesson_grade = ColumnLeaf::computed(
        format!("grade{}_lessonGrade", slot.global()),
        "Lesson Grade",
        ValueGetter::LessonGrade { slot },
    );
    lesson_grade.column_group_show = Some(GroupShow::Closed);

    let mut children = vec![ColumnDef::Leaf(lesson_grade)];
    children.extend(
        slot.kind()
            .fields()
            .into_iter()
            .map(|key| ColumnDef::Leaf(ColumnLeaf::for_field(slot, key))),
    );

    ColumnDef::Group(ColumnGroup {
        header_name: slot.lesson().label().to_string(),
        group_id: Some(format!("grade{}", slot.global())),
        open_by_default: None,
        column_group_show: Some(GroupShow::Open),
        children,
    })
}

pub fn evaluate_row(columns: &[ColumnDef], row: &StudentGrades) -> BTreeMap<String, String> {
    columns
        .iter()
        .flat_map(ColumnDef::leaves)
        .map(|leaf| (leaf.col_id.clone(), leaf.render(row)))
        .collect()
}

/// Last name, then first name, ignoring case. Ties keep their input order.
pub fn sort_rows(rows: &mut [StudentGrades]) {
    rows.sort_by_cached_key(|row| (row.last_name.to_lowercase(), row.first_name.to_lowercase()));
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRow {
    #[serde(flatten)]
    pub record: StudentRecord,
    pub values: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridPayload {
    pub column_defs: Vec<ColumnDef>,
    pub row_data: Vec<GridRow>,
}

pub fn build_grid_payload(records: &[StudentRecord]) -> GridPayload {
    let column_defs = build_column_defs();
    let mut rows: Vec<StudentGrades> = records.iter().map(StudentGrades::from_record).collect();
    sort_rows(&mut rows);

    let row_data = rows
        .iter()
        .map(|row| GridRow {
            record: row.to_record(),
            values: evaluate_row(&column_defs, row),
        })
        .collect();

    GridPayload {
        column_defs,
        row_data,
    }
}
