//! Transcript to CDS reconciliation over a feature graph.
//!
//! Apollo exports peptides by transcript (mRNA) id, but the fasta has to be
//! labelled with the CDS id. Only transcripts whose gene carries
//! `status=Finished` are kept.

use tracing::info;

use crate::domain::{FeatureKind, Mapping, MappingEntry};
use crate::gff::FeatureGraph;

pub const FINISHED_STATUS: &str = "Finished";
pub const UNEDITED_STATUS: &str = "unedited";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub mapping: Mapping,
    /// Counted once per gene visit, so a gene reached from several CDS
    /// features is counted several times.
    pub unedited: usize,
}

pub fn reconcile<G: FeatureGraph + ?Sized>(graph: &G) -> Reconciliation {
    let mut result = Reconciliation::default();
    let gene_type = FeatureKind::Gene;
    let cds_type = FeatureKind::CodingSegment;

    for cds in graph.features_of_type(cds_type.gff_type()) {
        let (Some(coding_id), Some(transcript_id)) =
            (cds.first_attr("ID"), cds.first_attr("Parent"))
        else {
            continue;
        };

        for gene in graph
            .parents(transcript_id)
            .into_iter()
            .filter(|feature| feature.kind() == gene_type)
        {
            let status = gene.attr_or("status", UNEDITED_STATUS);
            let name = gene.attr_or("Name", "");

            if status == FINISHED_STATUS {
                result.mapping.insert(
                    transcript_id.to_string(),
                    MappingEntry {
                        transcript_id: transcript_id.to_string(),
                        coding_id: coding_id.to_string(),
                        sequence_region_id: cds.seqid.clone(),
                        gene_name: name.to_string(),
                        peptide: None,
                    },
                );
            } else if status == UNEDITED_STATUS {
                result.unedited += 1;
            }
        }
    }

    info!(unedited = result.unedited, "{} unedited genes detected", result.unedited);
    result
}
