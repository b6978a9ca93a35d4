use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ApolloError;

/// Organism name as registered on the Apollo server, e.g.
/// `Culex quinquefasciatus JHB 2020`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganismName(String);

impl OrganismName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrganismName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrganismName {
    type Err = ApolloError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().is_empty() || value.contains(['\n', '\r', '\t']) {
            return Err(ApolloError::InvalidOrganism(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureKind {
    Gene,
    Transcript,
    CodingSegment,
    Other(String),
}

impl FeatureKind {
    pub fn gff_type(&self) -> &str {
        match self {
            FeatureKind::Gene => "gene",
            FeatureKind::Transcript => "mRNA",
            FeatureKind::CodingSegment => "CDS",
            FeatureKind::Other(value) => value,
        }
    }
}

impl From<&str> for FeatureKind {
    fn from(value: &str) -> Self {
        match value {
            "gene" => FeatureKind::Gene,
            "mRNA" | "transcript" => FeatureKind::Transcript,
            "CDS" => FeatureKind::CodingSegment,
            other => FeatureKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.gff_type())
    }
}

/// One transcript of a finished gene, with the CDS id it is exported under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingEntry {
    pub transcript_id: String,
    pub coding_id: String,
    pub sequence_region_id: String,
    pub gene_name: String,
    pub peptide: Option<String>,
}

/// Reconciled entries keyed by transcript id.
pub type Mapping = BTreeMap<String, MappingEntry>;
