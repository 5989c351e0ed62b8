//! Core types for the curriculum model.
//!
//! Wire names follow the JSON the browser page keeps in its storage slots
//! (`bloomLevel`, `skillType`, `cloId`), so snapshots written by earlier
//! sessions load unchanged.
//!
//! With the `typescript` feature enabled, these types can be exported to TypeScript
//! using ts-rs for consistency with the frontend.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Error returned when a string does not name a taxonomy value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseTaxonomyError {
    #[error("unknown Bloom level: {0}")]
    BloomLevel(String),

    #[error("unknown skill type: {0}")]
    SkillType(String),
}

/// Identifier of a course learning outcome, `CLO<n>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(transparent)]
pub struct CloId(String);

impl CloId {
    pub const PREFIX: &'static str = "CLO";

    /// Build the id for sequence number `n`.
    pub fn from_number(n: u32) -> Self {
        Self(format!("{}{}", Self::PREFIX, n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric suffix, if the id has the `CLO<n>` shape.
    pub fn number(&self) -> Option<u32> {
        self.0.strip_prefix(Self::PREFIX)?.parse().ok()
    }
}

impl fmt::Display for CloId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CloId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CloId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier of a program learning outcome, `PLO<n>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(transparent)]
pub struct PloId(String);

impl PloId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PloId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PloId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PloId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Bloom's taxonomy levels, in ascending cognitive complexity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub enum BloomLevel {
    Remembering,
    Understanding,
    Applying,
    Analyzing,
    Evaluating,
    Creating,
}

impl BloomLevel {
    /// All levels in taxonomy order.
    pub const ALL: [BloomLevel; 6] = [
        Self::Remembering,
        Self::Understanding,
        Self::Applying,
        Self::Analyzing,
        Self::Evaluating,
        Self::Creating,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remembering => "Remembering",
            Self::Understanding => "Understanding",
            Self::Applying => "Applying",
            Self::Analyzing => "Analyzing",
            Self::Evaluating => "Evaluating",
            Self::Creating => "Creating",
        }
    }
}

impl Default for BloomLevel {
    fn default() -> Self {
        Self::Applying
    }
}

impl fmt::Display for BloomLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BloomLevel {
    type Err = ParseTaxonomyError;

    /// Lenient parse for free text: ignores case, surrounding whitespace,
    /// quotes and periods (`"Applying."` parses as `Applying`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s
            .chars()
            .filter(|c| !matches!(c, '\'' | '"' | '.'))
            .collect();
        let cleaned = cleaned.trim();

        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(cleaned))
            .ok_or_else(|| ParseTaxonomyError::BloomLevel(cleaned.to_string()))
    }
}

/// Kind of skill a CLO develops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub enum SkillType {
    #[serde(rename = "Professional Skill")]
    ProfessionalSkill,
    #[serde(rename = "Soft Skill")]
    SoftSkill,
    #[serde(rename = "Technical Skill")]
    TechnicalSkill,
    #[serde(rename = "Analytical Skill")]
    AnalyticalSkill,
    #[serde(rename = "Communication Skill")]
    CommunicationSkill,
}

impl SkillType {
    pub const ALL: [SkillType; 5] = [
        Self::ProfessionalSkill,
        Self::SoftSkill,
        Self::TechnicalSkill,
        Self::AnalyticalSkill,
        Self::CommunicationSkill,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProfessionalSkill => "Professional Skill",
            Self::SoftSkill => "Soft Skill",
            Self::TechnicalSkill => "Technical Skill",
            Self::AnalyticalSkill => "Analytical Skill",
            Self::CommunicationSkill => "Communication Skill",
        }
    }
}

impl Default for SkillType {
    fn default() -> Self {
        Self::ProfessionalSkill
    }
}

impl fmt::Display for SkillType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillType {
    type Err = ParseTaxonomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|skill| skill.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseTaxonomyError::SkillType(trimmed.to_string()))
    }
}

/// Course details. One per session, edited field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Course {
    pub name: String,
    pub code: String,
    /// Credit count; negative or non-numeric stored values load as 0
    #[serde(deserialize_with = "deserialize_credits")]
    pub credits: u32,
    pub description: String,
}

impl Default for Course {
    fn default() -> Self {
        Self {
            name: String::new(),
            code: String::new(),
            credits: 3,
            description: String::new(),
        }
    }
}

/// Editable course fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum CourseField {
    Name,
    Code,
    Credits,
    Description,
}

impl Course {
    /// Apply a raw form value to one field.
    ///
    /// Credits take the leading integer of the input, `0` when there is none,
    /// and never go below zero.
    pub fn apply_edit(&mut self, field: CourseField, raw: &str) {
        match field {
            CourseField::Name => self.name = raw.to_string(),
            CourseField::Code => self.code = raw.to_string(),
            CourseField::Credits => {
                self.credits = leading_integer(raw).unwrap_or(0).clamp(0, u32::MAX as i64) as u32
            }
            CourseField::Description => self.description = raw.to_string(),
        }
    }
}

/// A course learning outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Clo {
    pub id: CloId,
    pub description: String,
    pub bloom_level: BloomLevel,
    pub skill_type: SkillType,
}

/// Replacement values for a CLO's mutable fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct CloUpdate {
    pub description: String,
    pub bloom_level: BloomLevel,
    pub skill_type: SkillType,
}

/// A program learning outcome from the fixed catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Plo {
    pub id: PloId,
    pub description: String,
}

/// Percentage of students meeting a CLO, always within `0..=100`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(transparent)]
pub struct Achievement(u8);

impl Achievement {
    pub const MAX: u8 = 100;

    /// Clamp an integer into range.
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(0, Self::MAX as i64) as u8)
    }

    /// Coerce free-form input: the leading integer is clamped, anything
    /// without one becomes 0.
    pub fn coerce(raw: &str) -> Self {
        Self::clamped(leading_integer(raw).unwrap_or(0))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl From<i64> for Achievement {
    fn from(value: i64) -> Self {
        Self::clamped(value)
    }
}

impl fmt::Display for Achievement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl<'de> Deserialize<'de> for Achievement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::clamped(coerce_json_integer(&value)))
    }
}

/// Achievement record for one CLO.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub clo_id: CloId,
    pub achievement: Achievement,
}

impl Evaluation {
    /// Record with zero achievement, as created by reconciliation.
    pub fn empty(clo_id: CloId) -> Self {
        Self {
            clo_id,
            achievement: Achievement::default(),
        }
    }
}

/// Leading base-10 integer of `raw`, after optional whitespace and sign.
///
/// `"42abc"` → 42, `"  -5"` → -5, `"3.7"` → 3, `"abc"` → None.
pub fn leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    // Overlong inputs saturate rather than failing
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

fn coerce_json_integer(value: &serde_json::Value) -> i64 {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        serde_json::Value::String(s) => leading_integer(s).unwrap_or(0),
        _ => 0,
    }
}

fn deserialize_credits<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(coerce_json_integer(&value).clamp(0, u32::MAX as i64) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_achievement_coercion() {
        assert_eq!(Achievement::coerce("-5").value(), 0);
        assert_eq!(Achievement::coerce("150").value(), 100);
        assert_eq!(Achievement::coerce("abc").value(), 0);
        assert_eq!(Achievement::coerce("87").value(), 87);
        assert_eq!(Achievement::coerce(" 42%").value(), 42);
        assert_eq!(Achievement::from(-5).value(), 0);
        assert_eq!(Achievement::from(150).value(), 100);
    }

    #[test]
    fn test_achievement_deserialize_coerces() {
        let values: Vec<Achievement> =
            serde_json::from_str(r#"[-5, 150, "abc", 72.9, "64", null]"#).unwrap();
        let raw: Vec<u8> = values.iter().map(Achievement::value).collect();
        assert_eq!(raw, vec![0, 100, 0, 72, 64, 0]);
    }

    #[test]
    fn test_bloom_level_lenient_parse() {
        assert_eq!("Applying".parse::<BloomLevel>().unwrap(), BloomLevel::Applying);
        assert_eq!(" \"analyzing.\" ".parse::<BloomLevel>().unwrap(), BloomLevel::Analyzing);
        assert_eq!(
            "Synthesis".parse::<BloomLevel>(),
            Err(ParseTaxonomyError::BloomLevel("Synthesis".to_string()))
        );
    }

    #[test]
    fn test_clo_wire_format() {
        let clo = Clo {
            id: CloId::from_number(1),
            description: "Explain X".to_string(),
            bloom_level: BloomLevel::Understanding,
            skill_type: SkillType::TechnicalSkill,
        };

        let json = serde_json::to_value(&clo).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "CLO1",
                "description": "Explain X",
                "bloomLevel": "Understanding",
                "skillType": "Technical Skill"
            })
        );
    }

    #[test]
    fn test_course_credit_edits() {
        let mut course = Course::default();
        assert_eq!(course.credits, 3);

        course.apply_edit(CourseField::Credits, "4");
        assert_eq!(course.credits, 4);
        course.apply_edit(CourseField::Credits, "-2");
        assert_eq!(course.credits, 0);
        course.apply_edit(CourseField::Credits, "");
        assert_eq!(course.credits, 0);

        course.apply_edit(CourseField::Code, "CS101");
        assert_eq!(course.code, "CS101");

        let loaded: Course =
            serde_json::from_str(r#"{"name":"","code":"","credits":-1,"description":""}"#).unwrap();
        assert_eq!(loaded.credits, 0);
    }

    #[test]
    fn test_clo_id_number() {
        assert_eq!(CloId::from("CLO12").number(), Some(12));
        assert_eq!(CloId::from("custom").number(), None);
        assert_eq!(CloId::from_number(3).as_str(), "CLO3");
    }
}
