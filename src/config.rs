use log::warn;
use serde::{Deserialize, Serialize};

/// Run configuration for NUMT post-processing.
///
/// Built once at the start of a run and passed by reference into every phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumtConfig {
    /// The mtDNA was searched as a doubled linear sequence
    pub circle: bool,
    /// Maximum gap between fragments merged into one block
    pub frag_merge: i64,
    /// Only merge fragments on the same strand
    pub stranded: bool,
    /// Query coverage fraction above which a hit is suspected native mtDNA
    pub mt_max_cov: f64,
    /// Identity fraction above which a hit is suspected native mtDNA
    pub mt_max_id: f64,
    /// Exclude whole sequences carrying a suspected native mtDNA hit
    pub mt_max_exclude: bool,
    /// Minimum local alignment length for a fragment
    pub min_frag_len: i64,
    /// Assembly sequences to omit from all output
    pub exclude: Vec<String>,
}

impl Default for NumtConfig {
    fn default() -> Self {
        Self {
            circle: true,
            frag_merge: 8000,
            stranded: false,
            mt_max_cov: 0.99,
            mt_max_id: 0.99,
            mt_max_exclude: true,
            min_frag_len: 0,
            exclude: Vec::new(),
        }
    }
}

impl NumtConfig {
    /// Clamp negative values to zero, the nearest valid setting.
    pub fn sanitized(mut self) -> Self {
        if self.frag_merge < 0 {
            warn!("fragmerge={} is negative: using 0", self.frag_merge);
            self.frag_merge = 0;
        }
        if self.min_frag_len < 0 {
            warn!("minfraglen={} is negative: using 0", self.min_frag_len);
            self.min_frag_len = 0;
        }
        if self.mt_max_cov.is_nan() || self.mt_max_cov < 0.0 {
            warn!("mtmaxcov={} is invalid: using 0 (no filtering)", self.mt_max_cov);
            self.mt_max_cov = 0.0;
        }
        if self.mt_max_id.is_nan() || self.mt_max_id < 0.0 {
            warn!("mtmaxid={} is invalid: using 0 (no filtering)", self.mt_max_id);
            self.mt_max_id = 0.0;
        }
        self.exclude.sort();
        self.exclude.dedup();
        self
    }

    /// Contamination flagging is disabled by a zero threshold
    pub fn contamination_filter_enabled(&self) -> bool {
        self.mt_max_cov > 0.0 && self.mt_max_id > 0.0
    }
}

/// Load sequence names from a file (one per line, `#` comments allowed)
pub fn load_name_list(path: &str) -> std::io::Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        std::io::Error::new(
            e.kind(),
            format!("Failed to read sequence name list '{path}': {e}"),
        )
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.to_string())
        .collect())
}
