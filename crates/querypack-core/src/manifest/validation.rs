//! Structural validation of a parsed [`Manifest`].

use thiserror::Error;

use super::{JuryParameters, Manifest};

/// Default tolerance for the jury weight-sum check.
pub const WEIGHT_TOLERANCE: f64 = 1e-4;

/// Structural problems with a manifest. The `Display` form is the reason.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ManifestError {
    #[error("manifest is not valid JSON: {reason}")]
    Malformed { reason: String },

    #[error("manifest is missing required field `{field}`")]
    MissingField { field: &'static str },

    #[error("primary must set exactly one of `filename` or `hash`, not both")]
    AmbiguousPrimary,

    #[error("primary must set exactly one of `filename` or `hash`, found neither")]
    UnresolvedPrimary,

    #[error("juryParameters.{field} is missing or empty")]
    IncompleteJuryParameters { field: &'static str },

    #[error("juryParameters.AI_NODES[{index}] is invalid: {reason}")]
    InvalidNode { index: usize, reason: String },

    #[error("jury node weights must sum to 1.0, got {sum}")]
    WeightSum { sum: f64 },

    #[error("additional entry {name:?} is invalid: {reason}")]
    InvalidAdditional { name: String, reason: &'static str },

    #[error("support entry {index} has an empty hash")]
    EmptySupportHash { index: usize },
}

/// Checks manifest invariants in a fixed order, stopping at the first failure:
///
/// 1. `version` and `primary` are present.
/// 2. `primary` sets exactly one of `filename`/`hash`.
/// 3. When `juryParameters` is present, all three fields are present, non-empty
///    and positive, and every node is well formed.
/// 4. Jury weights sum to 1.0 within the tolerance.
/// 5. `additional` entries are named and point at exactly one location;
///    `support` hashes are non-empty.
#[derive(Debug, Clone, Copy)]
pub struct ManifestValidator {
    tolerance: f64,
}

impl Default for ManifestValidator {
    fn default() -> Self {
        Self::new(WEIGHT_TOLERANCE)
    }
}

impl ManifestValidator {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn validate(&self, manifest: &Manifest) -> Result<(), ManifestError> {
        if manifest
            .version
            .as_deref()
            .map_or(true, |v| v.trim().is_empty())
        {
            return Err(ManifestError::MissingField { field: "version" });
        }
        let primary = manifest
            .primary
            .as_ref()
            .ok_or(ManifestError::MissingField { field: "primary" })?;

        primary.resolve()?;

        if let Some(jury) = &manifest.jury_parameters {
            self.validate_jury(jury)?;
        }

        for entry in &manifest.additional {
            if entry.name.trim().is_empty() {
                return Err(ManifestError::InvalidAdditional {
                    name: entry.name.clone(),
                    reason: "name is empty",
                });
            }
            match (entry.local_filename(), entry.remote_hash()) {
                (Some(_), None) | (None, Some(_)) => {}
                (Some(_), Some(_)) => {
                    return Err(ManifestError::InvalidAdditional {
                        name: entry.name.clone(),
                        reason: "sets both filename and hash",
                    })
                }
                (None, None) => {
                    return Err(ManifestError::InvalidAdditional {
                        name: entry.name.clone(),
                        reason: "sets neither filename nor hash",
                    })
                }
            }
        }

        if let Some(index) = manifest
            .support
            .iter()
            .position(|s| s.hash.trim().is_empty())
        {
            return Err(ManifestError::EmptySupportHash { index });
        }

        Ok(())
    }

    fn validate_jury(&self, jury: &JuryParameters) -> Result<(), ManifestError> {
        if jury.number_of_outcomes.unwrap_or(0) == 0 {
            return Err(ManifestError::IncompleteJuryParameters {
                field: "NUMBER_OF_OUTCOMES",
            });
        }
        let nodes = match jury.ai_nodes.as_deref() {
            Some(nodes) if !nodes.is_empty() => nodes,
            _ => {
                return Err(ManifestError::IncompleteJuryParameters { field: "AI_NODES" });
            }
        };
        if jury.iterations.unwrap_or(0) == 0 {
            return Err(ManifestError::IncompleteJuryParameters {
                field: "ITERATIONS",
            });
        }

        for (index, node) in nodes.iter().enumerate() {
            let invalid = |reason: &str| ManifestError::InvalidNode {
                index,
                reason: reason.to_string(),
            };
            if node.provider.trim().is_empty() {
                return Err(invalid("AI_PROVIDER is empty"));
            }
            if node.model.trim().is_empty() {
                return Err(invalid("AI_MODEL is empty"));
            }
            if node.count == 0 {
                return Err(invalid("NO_COUNTS must be positive"));
            }
            if !node.weight.is_finite() || !(0.0..=1.0).contains(&node.weight) {
                return Err(invalid("WEIGHT must be within [0, 1]"));
            }
        }

        let sum: f64 = nodes.iter().map(|n| n.weight).sum();
        if (sum - 1.0).abs() > self.tolerance {
            return Err(ManifestError::WeightSum { sum });
        }
        Ok(())
    }
}
