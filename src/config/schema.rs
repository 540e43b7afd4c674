use crate::dom::Substitution;
use crate::path::{Partition, PathError};
use crate::verify::Verification;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

/// A TOML file of substitutions against one book.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct SubstitutionPlan {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub substitutions: Vec<SubstitutionDefinition>,
}

impl SubstitutionPlan {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.substitutions.is_empty() {
            issues.push(ValidationIssue::EmptySubstitutionList);
        }

        let mut seen = HashSet::new();
        for definition in &self.substitutions {
            let id = Some(definition.id.clone()).filter(|id| !id.trim().is_empty());

            if id.is_none() {
                issues.push(ValidationIssue::MissingField {
                    substitution_id: None,
                    field: "id",
                });
            } else if !seen.insert(definition.id.as_str()) {
                issues.push(ValidationIssue::DuplicateId {
                    substitution_id: definition.id.clone(),
                });
            }

            if definition.file.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    substitution_id: id.clone(),
                    field: "file",
                });
            }

            if definition.partition.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    substitution_id: id.clone(),
                    field: "partition",
                });
            } else if let Err(err) = definition.partition() {
                issues.push(ValidationIssue::InvalidPartition {
                    substitution_id: id.clone(),
                    message: err.to_string(),
                });
            }

            if let Some(Verify::Hash { expected, .. }) = &definition.verify {
                if Verification::parse_hex(expected).is_none() {
                    issues.push(ValidationIssue::InvalidCombo {
                        substitution_id: id.clone(),
                        message: format!("verify.expected '{expected}' is not an xxh3 hex digest"),
                    });
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source_language: Option<String>,
    #[serde(default)]
    pub target_language: Option<String>,
    /// Resolve `file` against the book root instead of the working directory.
    #[serde(default)]
    pub book_relative: bool,
    /// Fold nested substitutions of a chapter together instead of rejecting
    /// them as overlapping.
    #[serde(default)]
    pub merge_nested: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SubstitutionDefinition {
    pub id: String,
    pub file: String,
    /// Partition in string form, e.g. `"2/1/0-1"`.
    pub partition: String,
    pub content: String,
    #[serde(default)]
    pub verify: Option<Verify>,
}

impl SubstitutionDefinition {
    pub fn partition(&self) -> Result<Partition, PathError> {
        Partition::parse(self.partition.trim())
    }

    pub fn to_substitution(&self) -> Result<Substitution, PathError> {
        Ok(Substitution::new(self.partition()?, self.content.clone()))
    }
}

/// Expected original text of the partition.
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Verify {
    ExactMatch {
        expected_text: String,
    },
    Hash {
        algorithm: Option<HashAlgorithm>,
        expected: String,
    },
}

impl Verify {
    /// `None` only for a hash that fails to parse, which validation rejects.
    pub fn to_verification(&self) -> Option<Verification> {
        match self {
            Verify::ExactMatch { expected_text } => {
                Some(Verification::ExactMatch(expected_text.clone()))
            }
            Verify::Hash { expected, .. } => Verification::parse_hex(expected),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum HashAlgorithm {
    Xxh3,
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptySubstitutionList,
    MissingField {
        substitution_id: Option<String>,
        field: &'static str,
    },
    DuplicateId {
        substitution_id: String,
    },
    InvalidPartition {
        substitution_id: Option<String>,
        message: String,
    },
    InvalidCombo {
        substitution_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptySubstitutionList => {
                write!(f, "substitution plan contains no substitutions")
            }
            ValidationIssue::MissingField {
                substitution_id,
                field,
            } => match substitution_id {
                Some(id) => write!(f, "substitution '{id}' missing required field '{field}'"),
                None => write!(f, "substitution missing required field '{field}'"),
            },
            ValidationIssue::DuplicateId { substitution_id } => {
                write!(f, "substitution id '{substitution_id}' is used more than once")
            }
            ValidationIssue::InvalidPartition {
                substitution_id,
                message,
            } => match substitution_id {
                Some(id) => write!(f, "substitution '{id}' has invalid partition: {message}"),
                None => write!(f, "invalid partition: {message}"),
            },
            ValidationIssue::InvalidCombo {
                substitution_id,
                message,
            } => match substitution_id {
                Some(id) => write!(f, "substitution '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid substitution configuration: {message}"),
            },
        }
    }
}
