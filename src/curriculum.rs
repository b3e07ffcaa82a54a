use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::GradebookError;

pub const UNIT_COUNT: u32 = 10;
pub const LESSONS_PER_UNIT: u32 = 10;
pub const DIAGNOSTIC_SETS: usize = 4;

/// Mastery retries only count when strictly above this score.
pub const MASTERY_PASS_THRESHOLD: u32 = 70;
pub const PERFECT_SCORE: u32 = 100;

pub const UNIT_NAMES: [&str; UNIT_COUNT as usize] = [
    "Forensic Math",
    "Environmental Math",
    "Properties of Math",
    "Chemical Math",
    "Math Behind Your Meals",
    "Geometric Packing",
    "Factoring & Polynomials",
    "Laser Geometry",
    "Gravity of Algebra",
    "Home Makeover",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LessonKind {
    ModuleGuide,
    Rca,
    DiagnosticDay,
    PostTest,
    Enrichment,
}

#[derive(Debug, Clone, Copy)]
pub struct LessonSpec {
    pub kind: LessonKind,
    pub label: &'static str,
}

/// Indexed by `lesson index - 1`.
pub const LESSON_TABLE: [LessonSpec; LESSONS_PER_UNIT as usize] = [
    LessonSpec { kind: LessonKind::ModuleGuide, label: "Session 1" },
    LessonSpec { kind: LessonKind::Rca, label: "Session 2" },
    LessonSpec { kind: LessonKind::Rca, label: "Session 3" },
    LessonSpec { kind: LessonKind::Rca, label: "Session 4" },
    LessonSpec { kind: LessonKind::DiagnosticDay, label: "Diagnostic Day 1" },
    LessonSpec { kind: LessonKind::Rca, label: "Session 5" },
    LessonSpec { kind: LessonKind::Enrichment, label: "Session 6" },
    LessonSpec { kind: LessonKind::PostTest, label: "Session 7" },
    LessonSpec { kind: LessonKind::DiagnosticDay, label: "Diagnostic Day 2" },
    LessonSpec { kind: LessonKind::Enrichment, label: "Enrichments" },
];

// Diagnostic sets are zero-based here and one-based in field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    ModuleGuide,
    Rca,
    PostTest,
    Presentation,
    Diagnostic(usize),
    SetPresentation(usize),
    MasteryA(usize),
    MasteryB(usize),
}

impl FieldKey {
    pub fn parse(suffix: &str) -> Option<Self> {
        match suffix {
            "moduleGuide" => return Some(FieldKey::ModuleGuide),
            "rca" => return Some(FieldKey::Rca),
            "posttest" => return Some(FieldKey::PostTest),
            "presentation" => return Some(FieldKey::Presentation),
            _ => {}
        }

        if let Some(rest) = suffix.strip_prefix("diagnostic") {
            return parse_set(rest).map(FieldKey::Diagnostic);
        }
        if let Some(rest) = suffix.strip_prefix("presentation") {
            return parse_set(rest).map(FieldKey::SetPresentation);
        }
        if let Some(rest) = suffix.strip_prefix("mastery") {
            if let Some(set) = rest.strip_suffix('a') {
                return parse_set(set).map(FieldKey::MasteryA);
            }
            if let Some(set) = rest.strip_suffix('b') {
                return parse_set(set).map(FieldKey::MasteryB);
            }
        }
        None
    }

    pub fn is_presentation(self) -> bool {
        matches!(self, FieldKey::Presentation | FieldKey::SetPresentation(_))
    }

    pub fn header(self) -> String {
        match self {
            FieldKey::ModuleGuide => "Module Guide".to_string(),
            FieldKey::Rca => "RCA".to_string(),
            FieldKey::PostTest => "Post-test".to_string(),
            FieldKey::Presentation => "Presentation".to_string(),
            FieldKey::Diagnostic(set) => format!("Diagnostic {}", set + 1),
            FieldKey::SetPresentation(set) => format!("Presentation {}", set + 1),
            FieldKey::MasteryA(set) => format!("Mastery {}a", set + 1),
            FieldKey::MasteryB(set) => format!("Mastery {}b", set + 1),
        }
    }
}

fn parse_set(digits: &str) -> Option<usize> {
    let set: usize = digits.parse().ok()?;
    (1..=DIAGNOSTIC_SETS).contains(&set).then(|| set - 1)
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::ModuleGuide => write!(f, "moduleGuide"),
            FieldKey::Rca => write!(f, "rca"),
            FieldKey::PostTest => write!(f, "posttest"),
            FieldKey::Presentation => write!(f, "presentation"),
            FieldKey::Diagnostic(set) => write!(f, "diagnostic{}", set + 1),
            FieldKey::SetPresentation(set) => write!(f, "presentation{}", set + 1),
            FieldKey::MasteryA(set) => write!(f, "mastery{}a", set + 1),
            FieldKey::MasteryB(set) => write!(f, "mastery{}b", set + 1),
        }
    }
}

impl Serialize for FieldKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl LessonKind {
    pub fn fields(self) -> Vec<FieldKey> {
        match self {
            LessonKind::ModuleGuide => vec![FieldKey::ModuleGuide, FieldKey::Presentation],
            LessonKind::Rca => vec![FieldKey::Rca, FieldKey::Presentation],
            LessonKind::PostTest => vec![FieldKey::PostTest, FieldKey::Presentation],
            LessonKind::DiagnosticDay => (0..DIAGNOSTIC_SETS)
                .flat_map(|set| {
                    [
                        FieldKey::Diagnostic(set),
                        FieldKey::SetPresentation(set),
                        FieldKey::MasteryA(set),
                        FieldKey::MasteryB(set),
                    ]
                })
                .collect(),
            LessonKind::Enrichment => vec![FieldKey::Presentation],
        }
    }

    pub fn presentation_fields(self) -> Vec<FieldKey> {
        self.fields()
            .into_iter()
            .filter(|key| key.is_presentation())
            .collect()
    }

    pub fn assessment_fields(self) -> Vec<FieldKey> {
        self.fields()
            .into_iter()
            .filter(|key| !key.is_presentation())
            .collect()
    }

    pub fn has_field(self, key: FieldKey) -> bool {
        self.fields().contains(&key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LessonIndex(u32);

impl LessonIndex {
    pub fn new(index: u32) -> Result<Self, GradebookError> {
        if (1..=LESSONS_PER_UNIT).contains(&index) {
            Ok(Self(index))
        } else {
            Err(GradebookError::LessonOutOfRange(index))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn spec(self) -> &'static LessonSpec {
        &LESSON_TABLE[(self.0 - 1) as usize]
    }

    pub fn kind(self) -> LessonKind {
        self.spec().kind
    }

    pub fn label(self) -> &'static str {
        self.spec().label
    }

    pub fn all() -> impl Iterator<Item = LessonIndex> {
        (1..=LESSONS_PER_UNIT).map(LessonIndex)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Unit(u32);

impl Unit {
    pub fn new(index: u32) -> Result<Self, GradebookError> {
        if index < UNIT_COUNT {
            Ok(Self(index))
        } else {
            Err(GradebookError::UnitOutOfRange(index))
        }
    }

    pub fn number(self) -> u32 {
        self.0 + 1
    }

    pub fn name(self) -> &'static str {
        UNIT_NAMES[self.0 as usize]
    }

    pub fn first_slot(self) -> u32 {
        self.0 * LESSONS_PER_UNIT + 1
    }

    pub fn lessons(self) -> impl Iterator<Item = LessonSlot> {
        LessonIndex::all().map(move |lesson| LessonSlot { unit: self, lesson })
    }

    pub fn all() -> impl Iterator<Item = Unit> {
        (0..UNIT_COUNT).map(Unit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LessonSlot {
    unit: Unit,
    lesson: LessonIndex,
}

impl LessonSlot {
    pub fn from_global(slot: u32) -> Result<Self, GradebookError> {
        if !(1..=UNIT_COUNT * LESSONS_PER_UNIT).contains(&slot) {
            return Err(GradebookError::SlotOutOfRange(slot));
        }
        let unit = Unit::new((slot - 1) / LESSONS_PER_UNIT)?;
        let lesson = LessonIndex::new((slot - 1) % LESSONS_PER_UNIT + 1)?;
        Ok(Self { unit, lesson })
    }

    pub fn global(self) -> u32 {
        self.unit.first_slot() + self.lesson.get() - 1
    }

    pub fn lesson(self) -> LessonIndex {
        self.lesson
    }

    pub fn kind(self) -> LessonKind {
        self.lesson.kind()
    }

    pub fn field_name(self, key: FieldKey) -> String {
        format!("grade{}_{}", self.global(), key)
    }

    pub fn all() -> impl Iterator<Item = LessonSlot> {
        Unit::all().flat_map(Unit::lessons)
    }
}

impl Serialize for LessonSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.global())
    }
}

/// Splits `grade{N}_{field}` into its slot and field, rejecting names whose
/// field does not belong to the lesson kind at that slot.
pub fn parse_field_name(name: &str) -> Option<(LessonSlot, FieldKey)> {
    let rest = name.strip_prefix("grade")?;
    let (number, suffix) = rest.split_once('_')?;
    let slot = LessonSlot::from_global(number.parse().ok()?).ok()?;
    let key = FieldKey::parse(suffix)?;
    slot.kind().has_field(key).then_some((slot, key))
}
