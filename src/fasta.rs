use std::io::{self, Write};

use tracing::warn;

use crate::domain::Mapping;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FastaCounts {
    pub written: usize,
    pub skipped: usize,
}

/// Writes `>{coding_id} | {gene_name}` records in mapping order. Entries
/// without a peptide are left out.
pub fn write_fasta<W: Write>(mapping: &Mapping, writer: &mut W) -> io::Result<FastaCounts> {
    let mut counts = FastaCounts::default();
    for entry in mapping.values() {
        let Some(peptide) = &entry.peptide else {
            warn!(
                transcript_id = %entry.transcript_id,
                "no peptide retrieved, leaving it out of the fasta"
            );
            counts.skipped += 1;
            continue;
        };
        writeln!(writer, ">{} | {}", entry.coding_id, entry.gene_name)?;
        writeln!(writer, "{peptide}")?;
        counts.written += 1;
    }
    Ok(counts)
}
