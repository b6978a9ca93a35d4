//! GFF3 reading and the in-memory feature graph the reconciler walks.
//!
//! Records come from `bio::io::gff`; anything after a `##FASTA` directive is
//! sequence data and is not handed to the reader.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fs::File;
use std::io::Read;

use bio::io::gff;
use bio_types::strand::Strand;
use camino::Utf8Path;
use flate2::read::MultiGzDecoder;
use serde::{Deserialize, Serialize};

use crate::domain::FeatureKind;
use crate::error::ApolloError;
use crate::store::write_bytes_atomic;

const SNAPSHOT_SCHEMA_VERSION: u32 = 1;
const FASTA_DIRECTIVE: &str = "##FASTA";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub seqid: String,
    pub source: String,
    pub feature_type: String,
    pub start: u64,
    pub end: u64,
    pub score: Option<u64>,
    pub strand: char,
    pub phase: Option<u8>,
    pub attributes: BTreeMap<String, Vec<String>>,
}

impl FeatureRecord {
    pub fn kind(&self) -> FeatureKind {
        FeatureKind::from(self.feature_type.as_str())
    }

    pub fn id(&self) -> Option<&str> {
        self.first_attr("ID")
    }

    /// First value of a (possibly multi-valued) attribute.
    pub fn first_attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .and_then(|values| values.first())
            .map(|value| value.as_str())
    }

    pub fn attr_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.first_attr(key).unwrap_or(default)
    }

    pub fn parent_ids(&self) -> &[String] {
        self.attributes
            .get("Parent")
            .map(|values| values.as_slice())
            .unwrap_or(&[])
    }
}

impl From<&gff::Record> for FeatureRecord {
    fn from(record: &gff::Record) -> Self {
        let strand = match record.strand() {
            Some(Strand::Forward) => '+',
            Some(Strand::Reverse) => '-',
            Some(Strand::Unknown) | None => '.',
        };
        let attributes = record
            .attributes()
            .iter_all()
            .map(|(key, values)| (key.trim().to_string(), values.clone()))
            .collect();
        Self {
            seqid: record.seqname().to_string(),
            source: record.source().to_string(),
            feature_type: record.feature_type().to_string(),
            start: *record.start(),
            end: *record.end(),
            score: record.score(),
            strand,
            phase: TryInto::<u8>::try_into(record.phase().clone()).ok(),
            attributes,
        }
    }
}

/// Parses GFF3 text, ignoring a trailing `##FASTA` section.
pub fn parse_gff3(text: &str) -> Result<Vec<FeatureRecord>, ApolloError> {
    let features = match text.find(FASTA_DIRECTIVE) {
        Some(offset) if offset == 0 || text[..offset].ends_with('\n') => &text[..offset],
        _ => text,
    };

    let mut reader = gff::Reader::new(features.as_bytes(), gff::GffType::GFF3);
    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|err| ApolloError::GffParse {
            line: err.position().map(|pos| pos.line() as usize).unwrap_or(0),
            message: err.to_string(),
        })?;
        records.push(FeatureRecord::from(&record));
    }
    Ok(records)
}

/// Query contract the reconciler needs from a feature store.
pub trait FeatureGraph {
    fn features_of_type<'a>(
        &'a self,
        feature_type: &'a str,
    ) -> Box<dyn Iterator<Item = &'a FeatureRecord> + 'a>;

    /// All ancestors of `id`, nearest first.
    fn parents(&self, id: &str) -> Vec<&FeatureRecord>;
}

#[derive(Debug, Clone, Default)]
pub struct GffGraph {
    records: Vec<FeatureRecord>,
    by_id: HashMap<String, Vec<usize>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GraphSnapshot {
    schema_version: u32,
    records: Vec<FeatureRecord>,
}

impl GffGraph {
    pub fn from_records(records: Vec<FeatureRecord>) -> Self {
        let mut by_id: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, record) in records.iter().enumerate() {
            if let Some(id) = record.id() {
                by_id.entry(id.to_string()).or_default().push(index);
            }
        }
        Self { records, by_id }
    }

    pub fn from_gff_str(text: &str) -> Result<Self, ApolloError> {
        Ok(Self::from_records(parse_gff3(text)?))
    }

    /// Reads a GFF3 file; `.gz` files are decompressed on the fly.
    pub fn read(path: &Utf8Path) -> Result<Self, ApolloError> {
        let file = File::open(path.as_std_path())
            .map_err(|err| ApolloError::Filesystem(format!("open {path}: {err}")))?;
        let mut reader: Box<dyn Read> = if path.extension() == Some("gz") {
            Box::new(MultiGzDecoder::new(file))
        } else {
            Box::new(file)
        };
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|err| ApolloError::Filesystem(format!("read {path}: {err}")))?;
        Self::from_gff_str(&text)
    }

    pub fn load_snapshot(path: &Utf8Path) -> Result<Self, ApolloError> {
        let content = std::fs::read(path.as_std_path())
            .map_err(|err| ApolloError::GraphSnapshot(format!("read {path}: {err}")))?;
        let snapshot: GraphSnapshot = serde_json::from_slice(&content)
            .map_err(|err| ApolloError::GraphSnapshot(err.to_string()))?;
        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(ApolloError::GraphSnapshot(format!(
                "unsupported snapshot schema version {}",
                snapshot.schema_version
            )));
        }
        Ok(Self::from_records(snapshot.records))
    }

    pub fn save_snapshot(&self, path: &Utf8Path) -> Result<(), ApolloError> {
        let snapshot = GraphSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            records: self.records.clone(),
        };
        let content = serde_json::to_vec(&snapshot)
            .map_err(|err| ApolloError::GraphSnapshot(err.to_string()))?;
        write_bytes_atomic(path, &content)
    }

    pub fn records(&self) -> &[FeatureRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn parent_ids_of(&self, id: &str) -> Vec<String> {
        let mut ids = Vec::new();
        for index in self.by_id.get(id).into_iter().flatten() {
            for parent in self.records[*index].parent_ids() {
                if !ids.contains(parent) {
                    ids.push(parent.clone());
                }
            }
        }
        ids
    }
}

impl FeatureGraph for GffGraph {
    fn features_of_type<'a>(
        &'a self,
        feature_type: &'a str,
    ) -> Box<dyn Iterator<Item = &'a FeatureRecord> + 'a> {
        Box::new(
            self.records
                .iter()
                .filter(move |record| record.feature_type == feature_type),
        )
    }

    fn parents(&self, id: &str) -> Vec<&FeatureRecord> {
        let mut seen = HashSet::from([id.to_string()]);
        let mut queue = VecDeque::from(self.parent_ids_of(id));
        let mut ancestors = Vec::new();
        while let Some(parent_id) = queue.pop_front() {
            if !seen.insert(parent_id.clone()) {
                continue;
            }
            let Some(index) = self.by_id.get(&parent_id).and_then(|found| found.first()) else {
                continue;
            };
            ancestors.push(&self.records[*index]);
            queue.extend(self.parent_ids_of(&parent_id));
        }
        ancestors
    }
}
