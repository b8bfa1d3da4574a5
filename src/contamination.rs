use crate::config::NumtConfig;
use crate::hit_record::AlignmentHit;
use log::{debug, info, warn};
use rustc_hash::FxHashSet;
use std::collections::BTreeSet;

/// Assembly sequence names to omit from fragment, block and coverage output
#[derive(Debug, Default, Clone)]
pub struct ExclusionSet {
    names: FxHashSet<String>,
}

impl ExclusionSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the number of entries in the set
    pub fn entry_count(&self) -> usize {
        self.names.len()
    }

    pub fn contains(&self, seq_name: &str) -> bool {
        self.names.contains(seq_name)
    }

    /// Returns true if the name was not already present
    pub fn insert(&mut self, seq_name: &str) -> bool {
        self.names.insert(seq_name.to_string())
    }

    /// Names in sorted order
    pub fn sorted_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Summary of what the filter removed
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ContaminationReport {
    /// Hits below the minimum fragment length
    pub short_hits: usize,
    /// Hits that look like the mitochondrion itself
    pub flagged_hits: usize,
    /// Sequences carrying at least one flagged hit
    pub flagged_sequences: BTreeSet<String>,
    /// Flagged sequences kept because auto-exclusion is off and unflagged hits remain
    pub ambiguous_sequences: BTreeSet<String>,
    /// Unflagged hits dropped because their sequence is excluded
    pub excluded_hits: usize,
}

/// Suspected native mtDNA: both coverage and identity strictly above their thresholds
pub fn is_suspected_mtdna(hit: &AlignmentHit, config: &NumtConfig, mt_len: i64) -> bool {
    config.contamination_filter_enabled()
        && hit.query_coverage(mt_len) > config.mt_max_cov
        && hit.identity_fraction() > config.mt_max_id
}

/// Remove short hits, suspected native mtDNA hits and hits on excluded sequences.
/// With `mt_max_exclude`, sequences with a flagged hit are added to `exclusions`.
pub fn filter_hits(
    hits: Vec<AlignmentHit>,
    config: &NumtConfig,
    mt_len: i64,
    exclusions: &mut ExclusionSet,
) -> (Vec<AlignmentHit>, ContaminationReport) {
    let mut report = ContaminationReport::default();

    let mut working: Vec<AlignmentHit> = Vec::with_capacity(hits.len());
    for hit in hits {
        if (hit.length as i64) < config.min_frag_len {
            report.short_hits += 1;
        } else if is_suspected_mtdna(&hit, config, mt_len) {
            report.flagged_hits += 1;
            report.flagged_sequences.insert(hit.hit_id.clone());
        } else {
            working.push(hit);
        }
    }
    if report.short_hits > 0 {
        info!(
            "Dropped {} hits shorter than {} bp",
            report.short_hits, config.min_frag_len
        );
    }

    if !report.flagged_sequences.is_empty() {
        if config.mt_max_exclude {
            for name in &report.flagged_sequences {
                exclusions.insert(name);
            }
            info!(
                "{} sequences with {} fragments flagged as mtDNA (>{} coverage, >{} identity): excluded",
                report.flagged_sequences.len(),
                report.flagged_hits,
                config.mt_max_cov,
                config.mt_max_id
            );
        } else {
            let retained: FxHashSet<&str> = working.iter().map(|h| h.hit_id.as_str()).collect();
            for name in &report.flagged_sequences {
                if retained.contains(name.as_str()) {
                    warn!(
                        "{} has hits flagged as mtDNA but also other NUMT fragments: sequence retained",
                        name
                    );
                    report.ambiguous_sequences.insert(name.clone());
                }
            }
            info!(
                "{} fragments on {} sequences flagged as mtDNA and dropped",
                report.flagged_hits,
                report.flagged_sequences.len()
            );
        }
    }

    let before = working.len();
    working.retain(|hit| !exclusions.contains(&hit.hit_id));
    report.excluded_hits = before - working.len();
    if report.excluded_hits > 0 {
        debug!(
            "Filtered out {} hits on {} excluded sequences",
            report.excluded_hits,
            exclusions.entry_count()
        );
    }

    (working, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MT_LEN: i64 = 1000;

    fn hit(seq: &str, qry: (i64, i64), length: u64, identity: u64) -> AlignmentHit {
        AlignmentHit {
            query_id: "MT2X".to_string(),
            hit_id: seq.to_string(),
            subject_start: 1,
            subject_end: length as i64,
            query_start: qry.0,
            query_end: qry.1,
            bit_score: 100.0,
            expect: 0.0,
            length,
            identity,
        }
    }

    #[test]
    fn test_threshold_exactness() {
        let config = NumtConfig {
            mt_max_cov: 0.5,
            mt_max_id: 0.9,
            ..NumtConfig::default()
        };
        // Coverage exactly 0.5 is never flagged
        assert!(!is_suspected_mtdna(&hit("s", (1, 500), 500, 500), &config, MT_LEN));
        // Coverage 0.501 with identity above threshold is flagged
        assert!(is_suspected_mtdna(&hit("s", (1, 501), 501, 501), &config, MT_LEN));
        // Identity exactly at threshold is not
        assert!(!is_suspected_mtdna(&hit("s", (1, 600), 100, 90), &config, MT_LEN));
    }

    #[test]
    fn test_zero_threshold_disables() {
        let config = NumtConfig {
            mt_max_cov: 0.0,
            ..NumtConfig::default()
        };
        assert!(!is_suspected_mtdna(&hit("s", (1, 2000), 2000, 2000), &config, MT_LEN));
    }

    #[test]
    fn test_auto_exclusion() {
        let config = NumtConfig::default();
        let hits = vec![
            hit("mito_contig", (1, 1000), 1000, 1000),
            hit("mito_contig", (10, 200), 191, 150),
            hit("chr1", (10, 200), 191, 150),
            hit("MT", (1, 100), 100, 100),
        ];
        let mut exclusions = ExclusionSet::new(["MT"]);
        let (kept, report) = filter_hits(hits, &config, MT_LEN, &mut exclusions);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].hit_id, "chr1");
        assert_eq!(report.flagged_hits, 1);
        assert!(report.flagged_sequences.contains("mito_contig"));
        assert_eq!(report.excluded_hits, 2);
        assert!(exclusions.contains("mito_contig"));
        assert!(report.ambiguous_sequences.is_empty());
    }

    #[test]
    fn test_no_auto_exclusion_keeps_sequence() {
        let config = NumtConfig {
            mt_max_exclude: false,
            ..NumtConfig::default()
        };
        let hits = vec![
            hit("mito_contig", (1, 1000), 1000, 1000),
            hit("mito_contig", (10, 200), 191, 150),
        ];
        let mut exclusions = ExclusionSet::default();
        let (kept, report) = filter_hits(hits, &config, MT_LEN, &mut exclusions);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].query_start, 10);
        assert!(!exclusions.contains("mito_contig"));
        assert!(report.ambiguous_sequences.contains("mito_contig"));
    }

    #[test]
    fn test_min_frag_len() {
        let config = NumtConfig {
            min_frag_len: 50,
            ..NumtConfig::default()
        };
        let hits = vec![hit("chr1", (1, 49), 49, 49), hit("chr1", (1, 50), 50, 40)];
        let mut exclusions = ExclusionSet::default();
        let (kept, report) = filter_hits(hits, &config, MT_LEN, &mut exclusions);
        assert_eq!(kept.len(), 1);
        assert_eq!(report.short_hits, 1);
    }

    #[test]
    fn test_sorted_names() {
        let set = ExclusionSet::new(["b", "a", "c"]);
        assert_eq!(set.sorted_names(), vec!["a", "b", "c"]);
    }
}
