use std::collections::BTreeSet;

use tracing::{error, info};

use crate::apollo::{ApolloClient, SequenceRequest};
use crate::domain::{Mapping, OrganismName};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeptideFetch {
    pub mapping: Mapping,
    /// Transcript ids whose fetch failed; their entries have no peptide.
    pub errors: BTreeSet<String>,
}

impl PeptideFetch {
    pub fn fetched(&self) -> usize {
        self.mapping
            .values()
            .filter(|entry| entry.peptide.is_some())
            .count()
    }
}

/// One sequential `sequenceByName` call per entry. A failed call marks the
/// transcript as an error and the batch carries on.
pub fn fetch_peptides<C: ApolloClient + ?Sized>(
    client: &C,
    organism: &OrganismName,
    mut mapping: Mapping,
) -> PeptideFetch {
    let mut errors = BTreeSet::new();

    for entry in mapping.values_mut() {
        let request = SequenceRequest {
            organism,
            sequence_name: &entry.sequence_region_id,
            feature_name: &entry.transcript_id,
        };
        match client.sequence_by_name(&request) {
            Ok(text) => {
                info!(
                    coding_id = %entry.coding_id,
                    "retrieved peptide sequence from Apollo"
                );
                entry.peptide = Some(text);
            }
            Err(err) => {
                error!(
                    transcript_id = %entry.transcript_id,
                    kind = %err.kind,
                    url = %err.url,
                    "failed to retrieve peptide from Apollo: {}",
                    err.message
                );
                errors.insert(entry.transcript_id.clone());
            }
        }
    }

    PeptideFetch { mapping, errors }
}
