use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::annotation::fetch_annotation;
use crate::apollo::ApolloClient;
use crate::domain::OrganismName;
use crate::error::ApolloError;
use crate::fasta::write_fasta;
use crate::gff::GffGraph;
use crate::peptide::fetch_peptides;
use crate::reconcile::reconcile;
use crate::store::Store;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub organism: OrganismName,
    /// Ignore a GFF file or graph snapshot left by an earlier run.
    pub refresh: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnnotationSource {
    Snapshot,
    GffFile,
    Remote,
}

impl fmt::Display for AnnotationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationSource::Snapshot => write!(f, "feature graph snapshot"),
            AnnotationSource::GffFile => write!(f, "existing GFF file"),
            AnnotationSource::Remote => write!(f, "Apollo"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub organism: String,
    pub annotation_source: AnnotationSource,
    pub features: usize,
    pub finished_transcripts: usize,
    pub unedited: usize,
    pub fetched: usize,
    pub errors: Vec<String>,
    pub written: usize,
    pub skipped: usize,
    pub gff_path: String,
    pub peptide_path: String,
    pub started_at: String,
    pub finished_at: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<C: ApolloClient> {
    store: Store,
    client: C,
}

impl<C: ApolloClient> App<C> {
    pub fn new(store: Store, client: C) -> Self {
        Self { store, client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn run(
        &self,
        options: RunOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunSummary, ApolloError> {
        let started_at = timestamp();
        info!(organism = %options.organism, "start");
        info!(gff = %self.store.gff_path(), fasta = %self.store.peptide_path(), "output paths");

        let (graph, source) = self.load_graph(&options, sink)?;
        info!(source = %source, features = graph.len(), "annotation loaded");

        sink.event(ProgressEvent {
            message: "phase=Reconcile; mapping transcripts to CDS".to_string(),
            elapsed: None,
        });
        let reconciliation = reconcile(&graph);
        let finished_transcripts = reconciliation.mapping.len();
        sink.event(ProgressEvent {
            message: format!(
                "{finished_transcripts} mRNA identified with parent gene status=Finished"
            ),
            elapsed: None,
        });

        sink.event(ProgressEvent {
            message: "phase=Fetch; retrieving peptides".to_string(),
            elapsed: None,
        });
        let start = Instant::now();
        let fetch = fetch_peptides(&self.client, &options.organism, reconciliation.mapping);
        sink.event(ProgressEvent {
            message: format!(
                "apollo.sequenceByName requests={finished_transcripts} errors={}",
                fetch.errors.len()
            ),
            elapsed: Some(start.elapsed()),
        });
        if !fetch.errors.is_empty() {
            info!(
                errors = fetch.errors.len(),
                "errors encountered in peptide fasta retrieval"
            );
        }

        sink.event(ProgressEvent {
            message: "phase=Store; writing peptide fasta".to_string(),
            elapsed: None,
        });
        info!(path = %self.store.peptide_path(), "writing peptide sequences to file");
        let mut buffer = Vec::new();
        let counts = write_fasta(&fetch.mapping, &mut buffer)
            .map_err(|err| ApolloError::Filesystem(err.to_string()))?;
        self.store.write_peptides(&buffer)?;
        info!("stop");

        Ok(RunSummary {
            organism: options.organism.to_string(),
            annotation_source: source,
            features: graph.len(),
            finished_transcripts,
            unedited: reconciliation.unedited,
            fetched: fetch.fetched(),
            errors: fetch.errors.into_iter().collect(),
            written: counts.written,
            skipped: counts.skipped,
            gff_path: self.store.gff_path().to_string(),
            peptide_path: self.store.peptide_path().to_string(),
            started_at,
            finished_at: timestamp(),
        })
    }

    fn load_graph(
        &self,
        options: &RunOptions,
        sink: &dyn ProgressSink,
    ) -> Result<(GffGraph, AnnotationSource), ApolloError> {
        if !options.refresh && self.store.snapshot_exists() {
            if let Some(path) = self.store.snapshot_path() {
                sink.event(ProgressEvent {
                    message: format!("phase=Resolve; existing database detected - using {path}"),
                    elapsed: None,
                });
                return Ok((GffGraph::load_snapshot(path)?, AnnotationSource::Snapshot));
            }
        }

        let (graph, source) = if !options.refresh && self.store.gff_exists() {
            sink.event(ProgressEvent {
                message: format!(
                    "phase=Resolve; existing GFF detected - using {}",
                    self.store.gff_path()
                ),
                elapsed: None,
            });
            (GffGraph::read(self.store.gff_path())?, AnnotationSource::GffFile)
        } else {
            sink.event(ProgressEvent {
                message: "phase=Resolve; downloading GFF from Apollo".to_string(),
                elapsed: None,
            });
            let start = Instant::now();
            let text = fetch_annotation(&self.client, &options.organism)
                .ok_or_else(|| ApolloError::AnnotationUnavailable(options.organism.to_string()))?;
            sink.event(ProgressEvent {
                message: format!("apollo.write bytes={}", text.len()),
                elapsed: Some(start.elapsed()),
            });
            let graph = GffGraph::from_gff_str(&text)?;
            self.store.write_gff(&text)?;
            (graph, AnnotationSource::Remote)
        };

        if let Some(path) = self.store.snapshot_path() {
            graph.save_snapshot(path)?;
        }
        Ok((graph, source))
    }
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
