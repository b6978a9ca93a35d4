use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink, RunSummary};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        let mut stdout = io::stdout();
        render_summary(summary, &mut stdout)
    }
}

impl ProgressSink for TextOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => tracing::info!(
                elapsed_ms = elapsed.as_millis() as u64,
                "{}",
                event.message
            ),
            None => tracing::info!("{}", event.message),
        }
    }
}

pub fn render_summary<W: Write>(summary: &RunSummary, out: &mut W) -> io::Result<()> {
    writeln!(out, "annotation source: {}", summary.annotation_source)?;
    writeln!(out, "{} unedited genes detected", summary.unedited)?;
    writeln!(
        out,
        "{} mRNA identified with parent gene status=Finished",
        summary.finished_transcripts
    )?;
    if !summary.errors.is_empty() {
        writeln!(
            out,
            "{} errors encountered in peptide fasta retrieval - see logfile",
            summary.errors.len()
        )?;
    }
    writeln!(
        out,
        "{} peptide sequences written to {}",
        summary.written, summary.peptide_path
    )?;
    Ok(())
}
