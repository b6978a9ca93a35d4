use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::error::ApolloError;

/// On-disk artifacts of one run.
#[derive(Debug, Clone)]
pub struct Store {
    gff_path: Utf8PathBuf,
    peptide_path: Utf8PathBuf,
    snapshot_path: Option<Utf8PathBuf>,
}

impl Store {
    pub fn new(
        gff_path: Utf8PathBuf,
        peptide_path: Utf8PathBuf,
        snapshot_path: Option<Utf8PathBuf>,
    ) -> Self {
        Self {
            gff_path,
            peptide_path,
            snapshot_path,
        }
    }

    pub fn gff_path(&self) -> &Utf8Path {
        &self.gff_path
    }

    pub fn peptide_path(&self) -> &Utf8Path {
        &self.peptide_path
    }

    pub fn snapshot_path(&self) -> Option<&Utf8Path> {
        self.snapshot_path.as_deref()
    }

    pub fn gff_exists(&self) -> bool {
        is_nonempty_file(&self.gff_path)
    }

    pub fn snapshot_exists(&self) -> bool {
        self.snapshot_path
            .as_deref()
            .map(is_nonempty_file)
            .unwrap_or(false)
    }

    pub fn write_gff(&self, content: &str) -> Result<(), ApolloError> {
        write_bytes_atomic(&self.gff_path, content.as_bytes())
    }

    pub fn write_peptides(&self, content: &[u8]) -> Result<(), ApolloError> {
        write_bytes_atomic(&self.peptide_path, content)
    }
}

fn is_nonempty_file(path: &Utf8Path) -> bool {
    fs::metadata(path.as_std_path())
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}

/// Writes through a temp file in the target directory, then renames into place.
pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), ApolloError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| ApolloError::Filesystem(format!("create {parent}: {err}")))?;
    let mut tmp = Builder::new()
        .prefix(".apollo-pep")
        .suffix(".tmp")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| ApolloError::Filesystem(err.to_string()))?;
    tmp.write_all(content)
        .map_err(|err| ApolloError::Filesystem(err.to_string()))?;
    tmp.persist(path.as_std_path())
        .map_err(|err| ApolloError::Filesystem(format!("write {path}: {}", err.error)))?;
    Ok(())
}
