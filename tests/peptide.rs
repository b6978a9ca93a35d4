use std::collections::BTreeSet;
use std::sync::Mutex;

use apollo_peptides::apollo::{ApolloClient, SequenceRequest};
use apollo_peptides::domain::{Mapping, MappingEntry, OrganismName};
use apollo_peptides::error::{TransportError, TransportErrorKind};
use apollo_peptides::fasta::write_fasta;
use apollo_peptides::peptide::fetch_peptides;

/// Fails for the listed transcripts, answers `M<transcript>` otherwise.
struct MockApollo {
    failures: Vec<(&'static str, TransportErrorKind)>,
    requests: Mutex<Vec<(String, String, String)>>,
}

impl MockApollo {
    fn new(failures: Vec<(&'static str, TransportErrorKind)>) -> Self {
        Self {
            failures,
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl ApolloClient for MockApollo {
    fn write_annotation(&self, _organism: &OrganismName) -> Result<String, TransportError> {
        Err(TransportError::new(
            TransportErrorKind::Connection,
            "mock",
            "not used",
        ))
    }

    fn sequence_by_name(&self, request: &SequenceRequest<'_>) -> Result<String, TransportError> {
        self.requests.lock().unwrap().push((
            request.organism.to_string(),
            request.sequence_name.to_string(),
            request.feature_name.to_string(),
        ));
        match self
            .failures
            .iter()
            .find(|(transcript, _)| *transcript == request.feature_name)
        {
            Some((_, kind)) => Err(TransportError::new(*kind, "mock", "failed")),
            None => Ok(format!("M{}", request.feature_name)),
        }
    }
}

fn mapping(transcripts: &[&str]) -> Mapping {
    transcripts
        .iter()
        .map(|transcript| {
            (
                transcript.to_string(),
                MappingEntry {
                    transcript_id: transcript.to_string(),
                    coding_id: format!("cds-{transcript}"),
                    sequence_region_id: "CM027411.1".to_string(),
                    gene_name: format!("gene-{transcript}"),
                    peptide: None,
                },
            )
        })
        .collect()
}

#[test]
fn request_uses_region_and_transcript() {
    let organism: OrganismName = "speciesX".parse().unwrap();
    let client = MockApollo::new(Vec::new());
    let result = fetch_peptides(&client, &organism, mapping(&["T1"]));

    assert!(result.errors.is_empty());
    assert_eq!(result.mapping["T1"].peptide.as_deref(), Some("MT1"));
    assert_eq!(
        client.requests.lock().unwrap().as_slice(),
        &[(
            "speciesX".to_string(),
            "CM027411.1".to_string(),
            "T1".to_string()
        )]
    );
}

#[test]
fn timeout_leaves_peptide_unset() {
    let organism: OrganismName = "speciesX".parse().unwrap();
    let client = MockApollo::new(vec![("T1", TransportErrorKind::Timeout)]);
    let result = fetch_peptides(&client, &organism, mapping(&["T1"]));

    assert_eq!(result.errors, BTreeSet::from(["T1".to_string()]));
    assert_eq!(result.mapping["T1"].peptide, None);
    assert_eq!(result.fetched(), 0);
}

#[test]
fn failures_are_isolated_per_entry() {
    let organism: OrganismName = "speciesX".parse().unwrap();
    let client = MockApollo::new(vec![
        ("T2", TransportErrorKind::Protocol { status: Some(500) }),
        ("T4", TransportErrorKind::Connection),
        ("T5", TransportErrorKind::Timeout),
    ]);
    let result = fetch_peptides(&client, &organism, mapping(&["T1", "T2", "T3", "T4", "T5"]));

    assert_eq!(client.requests.lock().unwrap().len(), 5);
    assert_eq!(result.errors.len(), 3);
    assert_eq!(result.fetched(), 2);
    for entry in result.mapping.values() {
        assert_ne!(
            entry.peptide.is_some(),
            result.errors.contains(&entry.transcript_id)
        );
    }
}

#[test]
fn peptide_text_is_kept_verbatim_in_fasta() {
    let organism: OrganismName = "speciesX".parse().unwrap();
    let client = MockApollo::new(vec![("T2", TransportErrorKind::Connection)]);
    let result = fetch_peptides(&client, &organism, mapping(&["T1", "T2"]));

    let mut out = Vec::new();
    let counts = write_fasta(&result.mapping, &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), ">cds-T1 | gene-T1\nMT1\n");
    assert_eq!(counts.written, 1);
    assert_eq!(counts.skipped, 1);
}
