//! Run orchestration: filter -> build -> merge -> coverage -> publish.
//!
//! Every phase runs to completion in memory before any table is written, so a failure
//! in an earlier phase never leaves partial output behind.

use crate::block::{merge_fragments, NumtBlock};
use crate::cache::{self, RunFingerprint};
use crate::config::NumtConfig;
use crate::contamination::{filter_hits, ContaminationReport, ExclusionSet};
use crate::coverage::{compute_coverage, CoverageProfile};
use crate::fragment::{build_fragment_table, NumtFragment};
use crate::hit_record::AlignmentHit;
use crate::hits::{parse_hit_file, ParseErr};
use crate::output::{self, OutputPaths, StagedOutput};
use log::{debug, info};
use std::io;

#[derive(Debug)]
pub enum PipelineError {
    /// Hit table missing, malformed or empty
    Input(ParseErr),
    /// Unusable mtDNA reference
    Setup(String),
    /// Failure reading or publishing persisted tables
    Io(io::Error),
}

impl PipelineError {
    pub fn phase(&self) -> &'static str {
        match self {
            PipelineError::Input(_) => "input",
            PipelineError::Setup(_) => "setup",
            PipelineError::Io(_) => "output",
        }
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Input(e) => write!(f, "Failed to load NUMT hits: {}", e),
            PipelineError::Setup(msg) => write!(f, "Setup failed: {}", msg),
            PipelineError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<ParseErr> for PipelineError {
    fn from(e: ParseErr) -> Self {
        PipelineError::Input(e)
    }
}

impl From<io::Error> for PipelineError {
    fn from(e: io::Error) -> Self {
        PipelineError::Io(e)
    }
}

impl From<PipelineError> for io::Error {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Io(e) => e,
            PipelineError::Input(e) => io::Error::new(io::ErrorKind::InvalidData, e.to_string()),
            PipelineError::Setup(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
        }
    }
}

/// Results of one complete run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub fragments: Vec<NumtFragment>,
    pub blocks: Vec<NumtBlock>,
    pub coverage: CoverageProfile,
    /// Absent when the fragment set was reused from a previous run
    pub report: Option<ContaminationReport>,
}

/// Immutable per-run settings shared by every phase
#[derive(Debug, Clone)]
pub struct NumtPipeline {
    config: NumtConfig,
    mt_name: String,
    mt_len: i64,
}

impl NumtPipeline {
    pub fn new(config: NumtConfig, mt_name: &str, mt_len: i64) -> Result<Self, PipelineError> {
        if mt_len <= 0 {
            return Err(PipelineError::Setup(format!(
                "mtDNA length must be positive (got {})",
                mt_len
            )));
        }
        Ok(Self {
            config: config.sanitized(),
            mt_name: mt_name.to_string(),
            mt_len,
        })
    }

    /// User-declared exclusions plus the mtDNA reference's own name
    pub fn exclusion_set(&self) -> ExclusionSet {
        let mut exclusions = ExclusionSet::new(self.config.exclude.iter().cloned());
        exclusions.insert(&self.mt_name);
        exclusions
    }

    pub fn fingerprint(&self, hits_file: &str) -> RunFingerprint {
        RunFingerprint {
            hits_file: hits_file.to_string(),
            hits_modified: std::fs::metadata(hits_file)
                .and_then(|meta| meta.modified())
                .ok(),
            mt_name: self.mt_name.clone(),
            mt_len: self.mt_len,
            config: self.config.clone(),
        }
    }

    /// Filter and normalise raw hits into the sorted fragment set
    pub fn build_fragments(
        &self,
        hits: Vec<AlignmentHit>,
    ) -> Result<(Vec<NumtFragment>, ContaminationReport), PipelineError> {
        if hits.is_empty() {
            return Err(PipelineError::Input(ParseErr::EmptyTable));
        }
        let total = hits.len();
        let mut exclusions = self.exclusion_set();
        let (kept, report) = filter_hits(hits, &self.config, self.mt_len, &mut exclusions);
        info!(
            "{} of {} hits retained after filtering ({} excluded sequences)",
            kept.len(),
            total,
            exclusions.entry_count()
        );
        debug!("Excluded sequences: {}", exclusions.sorted_names().join(", "));

        let fragments = build_fragment_table(&kept, self.mt_len, self.config.circle);
        Ok((fragments, report))
    }

    /// Merge and coverage phases over an already built fragment set
    pub fn summarise(
        &self,
        fragments: Vec<NumtFragment>,
        report: Option<ContaminationReport>,
    ) -> PipelineOutput {
        let blocks = merge_fragments(&fragments, self.config.frag_merge, self.config.stranded);
        let coverage = compute_coverage(&fragments, &self.mt_name, self.mt_len);
        PipelineOutput {
            fragments,
            blocks,
            coverage,
            report,
        }
    }

    /// Run every phase in memory
    pub fn process(&self, hits: Vec<AlignmentHit>) -> Result<PipelineOutput, PipelineError> {
        let (fragments, report) = self.build_fragments(hits)?;
        Ok(self.summarise(fragments, Some(report)))
    }

    /// Full run from a hit table on disk, publishing all tables under `basefile`.
    /// A previous run's fragment set is reused unless `force` is set.
    pub fn run(
        &self,
        hits_file: &str,
        basefile: &str,
        force: bool,
    ) -> Result<PipelineOutput, PipelineError> {
        let fingerprint = self.fingerprint(hits_file);
        let cache_path = cache::cache_path(basefile);

        let reused = if force {
            None
        } else {
            cache::load_fragments(&cache_path, &fingerprint)?
        };

        let output = match reused {
            Some(fragments) => self.summarise(fragments, None),
            None => {
                let hits = parse_hit_file(hits_file)?;
                info!("Loaded {} local hits from {}", hits.len(), hits_file);
                let output = self.process(hits)?;
                cache::save_fragments(&cache_path, &fingerprint, &output.fragments)?;
                output
            }
        };

        let paths = OutputPaths::from_basefile(basefile);
        write_outputs(&output, &paths)?;
        Ok(output)
    }
}

/// Publish all four tables, renaming them into place only once every one is written
pub fn write_outputs(result: &PipelineOutput, paths: &OutputPaths) -> io::Result<()> {
    let mut staged = StagedOutput::default();
    staged.stage(&paths.fragments, |w| {
        output::write_fragment_table(w, &result.fragments)
    })?;
    staged.stage(&paths.blocks, |w| output::write_block_table(w, &result.blocks))?;
    staged.stage(&paths.depth, |w| {
        output::write_depth_table(w, &result.coverage)
    })?;
    staged.stage(&paths.read_lengths, |w| {
        output::write_readlen_table(w, &result.coverage)
    })?;
    staged.commit()?;
    info!(
        "NUMT fragments: {}; NUMT blocks: {}",
        paths.fragments.display(),
        paths.blocks.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit_record::Strand;

    fn hit(seq: &str, sbj: (i64, i64), qry: (i64, i64), length: u64, identity: u64) -> AlignmentHit {
        AlignmentHit {
            query_id: "MT2X".to_string(),
            hit_id: seq.to_string(),
            subject_start: sbj.0,
            subject_end: sbj.1,
            query_start: qry.0,
            query_end: qry.1,
            bit_score: 100.0,
            expect: 1e-20,
            length,
            identity,
        }
    }

    fn hits() -> Vec<AlignmentHit> {
        vec![
            hit("chr1", (100, 500), (101, 501), 401, 380),
            hit("chr1", (9000, 8500), (900, 1300), 501, 470),
            hit("chr2", (1, 1000), (200, 999), 1000, 900),
            hit("mito", (1, 1000), (1, 1000), 1000, 1000),
            hit("MT", (1, 50), (1, 50), 50, 50),
        ]
    }

    #[test]
    fn test_rejects_zero_length_mtdna() {
        let err = NumtPipeline::new(NumtConfig::default(), "MT", 0).unwrap_err();
        assert_eq!(err.phase(), "setup");
    }

    #[test]
    fn test_empty_hits_fatal() {
        let pipeline = NumtPipeline::new(NumtConfig::default(), "MT", 1000).unwrap();
        assert!(matches!(
            pipeline.process(Vec::new()),
            Err(PipelineError::Input(ParseErr::EmptyTable))
        ));
    }

    #[test]
    fn test_process_end_to_end() {
        let pipeline = NumtPipeline::new(NumtConfig::default(), "MT", 1000).unwrap();
        let result = pipeline.process(hits()).unwrap();

        let report = result.report.as_ref().unwrap();
        assert!(report.flagged_sequences.contains("mito"));
        assert_eq!(report.excluded_hits, 1);

        assert_eq!(result.fragments.len(), 3);
        let reverse = &result.fragments[1];
        assert_eq!((reverse.start, reverse.end), (8500, 9000));
        assert_eq!(reverse.strand, Strand::Minus);
        assert_eq!((reverse.mt_start, reverse.mt_end), (900, 300));

        assert_eq!(result.blocks.len(), 2);
        assert_eq!(result.blocks[0].frag_num, 2);
        assert_eq!(result.blocks[0].strand, Strand::Mixed);
        assert_eq!(result.blocks[0].mt_frag, "101-501|900-300");
        assert_eq!(result.coverage.depth.len(), 1000);
        assert_eq!(result.coverage.depth_at(950), Some(2));
        assert_eq!(result.coverage.depth_at(250), Some(3));
    }

    #[test]
    fn test_failed_table_write_publishes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let basefile = dir.path().join("run");
        let paths = OutputPaths::from_basefile(basefile.to_str().unwrap());
        // A directory in the way of the read-length table's temporary file
        std::fs::create_dir(dir.path().join("run.readlen.tsv.tmp")).unwrap();

        let pipeline = NumtPipeline::new(NumtConfig::default(), "MT", 1000).unwrap();
        let result = pipeline.process(hits()).unwrap();
        assert!(write_outputs(&result, &paths).is_err());

        assert!(!paths.fragments.exists());
        assert!(!paths.blocks.exists());
        assert!(!paths.depth.exists());
        assert!(!paths.read_lengths.exists());
        assert!(!dir.path().join("run.numtfrag.tsv.tmp").exists());
    }

    #[test]
    fn test_filtered_to_nothing_is_not_an_error() {
        let pipeline = NumtPipeline::new(NumtConfig::default(), "MT", 1000).unwrap();
        let result = pipeline
            .process(vec![hit("mito", (1, 1000), (1, 1000), 1000, 1000)])
            .unwrap();
        assert!(result.fragments.is_empty());
        assert!(result.blocks.is_empty());
        assert!(result.coverage.depth.iter().all(|&d| d == 0));
    }
}
