use serde::{Deserialize, Serialize};
use std::fmt;

/// One raw local alignment between the (possibly doubled) mtDNA query and an assembly sequence.
///
/// ## Coordinate conventions:
/// - `subject_start`/`subject_end`: 1-based assembly coordinates, reversed for minus-strand hits
/// - `query_start`/`query_end`: 1-based mtDNA query coordinates, increasing with subject orientation
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentHit {
    pub query_id: String,
    pub hit_id: String,
    pub subject_start: i64,
    pub subject_end: i64,
    pub query_start: i64,
    pub query_end: i64,
    pub bit_score: f64,
    pub expect: f64,
    pub length: u64,
    pub identity: u64,
}

impl AlignmentHit {
    /// Fraction of the single-copy mtDNA spanned by the query coordinates
    pub fn query_coverage(&self, mt_len: i64) -> f64 {
        (self.query_end - self.query_start + 1) as f64 / mt_len as f64
    }

    /// Identical positions over alignment length (0 for a zero-length alignment)
    pub fn identity_fraction(&self) -> f64 {
        if self.length == 0 {
            0.0
        } else {
            self.identity as f64 / self.length as f64
        }
    }
}

/// Strand orientation of a fragment or block relative to the mtDNA query
#[derive(Default, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug, Serialize, Deserialize)]
#[repr(u8)]
pub enum Strand {
    #[default]
    Plus,
    Minus,
    /// Block built from fragments on both strands
    Mixed,
}

impl Strand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strand::Plus => "+",
            Strand::Minus => "-",
            Strand::Mixed => "+/-",
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hit table compression types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitTableFormat {
    Plain,
    Bgzf,
}

impl HitTableFormat {
    /// Detect format from file extension
    pub fn from_path(path: &str) -> Self {
        if [".gz", ".bgz"].iter().any(|e| path.ends_with(e)) {
            HitTableFormat::Bgzf
        } else {
            HitTableFormat::Plain
        }
    }
}
