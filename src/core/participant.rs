//! Participant record, the intake form behind it, and its info workbook.

use std::fmt;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::Workbook;
use thiserror::Error;
use tracing::info;

use crate::error::Result;
use crate::workbook::{persist_error, save_atomically};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Female = 1,
    Male = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Tvns = 1,
    Sham = 2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub gender: Gender,
    pub age: u8,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Participant number is required.")]
    MissingId,
    #[error("Participant number may not contain path separators or `..`.")]
    UnsafeId,
    #[error("Gender must be '1' or '2'.")]
    Gender,
    #[error("Age must be a whole number between 1 and 120.")]
    Age,
    #[error("Stimulation condition must be '1' or '2'.")]
    Condition,
}

impl Participant {
    /// Validate raw form fields. Fields are checked top to bottom and the
    /// first failure is reported.
    pub fn parse(
        id: &str,
        gender: &str,
        age: &str,
        condition: &str,
    ) -> std::result::Result<Self, ValidationError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(ValidationError::MissingId);
        }
        // The id is spliced into output file names.
        if id.contains(['/', '\\']) || id.contains("..") {
            return Err(ValidationError::UnsafeId);
        }

        let gender = match gender.trim() {
            "1" => Gender::Female,
            "2" => Gender::Male,
            _ => return Err(ValidationError::Gender),
        };

        let age = age
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|a| (1..=120).contains(a))
            .ok_or(ValidationError::Age)?;

        let condition = match condition.trim() {
            "1" => Condition::Tvns,
            "2" => Condition::Sham,
            _ => return Err(ValidationError::Condition),
        };

        Ok(Self {
            id: id.to_owned(),
            gender,
            age,
            condition,
        })
    }

    pub fn gender_code(&self) -> u8 {
        self.gender as u8
    }

    pub fn condition_code(&self) -> u8 {
        self.condition as u8
    }

    pub fn info_file(&self) -> String {
        format!("{}_participant_info.xlsx", self.id)
    }
}

pub const INFO_HEADERS: [&str; 4] = ["subjID", "gender", "age", "condition"];

/// Single-row metadata workbook, written before the practice phase.
pub fn write_participant_info(dir: &Path, participant: &Participant) -> Result<PathBuf> {
    let path = dir.join(participant.info_file());

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let fail = |e| persist_error(&path, e);
    for (col, header) in INFO_HEADERS.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).map_err(fail)?;
    }
    sheet.write_string(1, 0, &participant.id).map_err(fail)?;
    sheet
        .write_number(1, 1, participant.gender_code() as f64)
        .map_err(fail)?;
    sheet.write_number(1, 2, participant.age as f64).map_err(fail)?;
    sheet
        .write_number(1, 3, participant.condition_code() as f64)
        .map_err(fail)?;

    save_atomically(&mut workbook, &path)?;
    info!("participant info written to {}", path.display());
    Ok(path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Id,
    Gender,
    Age,
    Condition,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Id, Field::Gender, Field::Age, Field::Condition];

    pub fn label(self) -> &'static str {
        match self {
            Field::Id => "Participant number:",
            Field::Gender => "Gender (1 = Female, 2 = Male):",
            Field::Age => "Age:",
            Field::Condition => "Stimulation condition (1 = tVNS, 2 = Sham):",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Editing state of the intake form. Rendering lives in the front-end.
#[derive(Debug, Clone, Default)]
pub struct IntakeForm {
    values: [String; 4],
    focus: usize,
    error: Option<ValidationError>,
}

impl IntakeForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self, field: Field) -> &str {
        &self.values[field.index()]
    }

    pub fn focused(&self) -> Field {
        Field::ALL[self.focus]
    }

    pub fn error(&self) -> Option<&ValidationError> {
        self.error.as_ref()
    }

    pub fn type_char(&mut self, c: char) {
        if c.is_control() {
            return;
        }
        self.values[self.focus].push(c);
    }

    pub fn backspace(&mut self) {
        self.values[self.focus].pop();
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % Field::ALL.len();
    }

    pub fn focus_prev(&mut self) {
        self.focus = (self.focus + Field::ALL.len() - 1) % Field::ALL.len();
    }

    /// On failure the error stays on the form and focus jumps to the field
    /// that needs fixing.
    pub fn submit(&mut self) -> Option<Participant> {
        let [id, gender, age, condition] = &self.values;
        match Participant::parse(id, gender, age, condition) {
            Ok(p) => {
                self.error = None;
                Some(p)
            }
            Err(e) => {
                self.focus = match e {
                    ValidationError::MissingId | ValidationError::UnsafeId => Field::Id,
                    ValidationError::Gender => Field::Gender,
                    ValidationError::Age => Field::Age,
                    ValidationError::Condition => Field::Condition,
                }
                .index();
                self.error = Some(e);
                None
            }
        }
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "participant {} (gender={}, age={}, condition={})",
            self.id,
            self.gender_code(),
            self.age,
            self.condition_code()
        )
    }
}
