//! Greedy merging of sorted NUMT fragments into NUMT blocks.
//!
//! Fragments are consumed strictly in (sequence name, start, end, strand) order. The open block
//! absorbs the next fragment when it is on the same sequence, starts no more than `frag_merge`
//! past the block end and, if `stranded`, is on the same strand. Otherwise the open block is
//! closed and a new one is seeded from the fragment. Closed blocks are never revisited.

use crate::fragment::{FragmentKey, NumtFragment};
use crate::hit_record::Strand;
use log::info;

/// One or more fragments merged by genomic proximity
#[derive(Debug, Clone, PartialEq)]
pub struct NumtBlock {
    pub seq_name: String,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
    pub bit_score: f64,
    /// Minimum e-value over member fragments
    pub expect: f64,
    /// Summed alignment length while open; genomic span once closed
    pub length: u64,
    pub identity: u64,
    /// mtDNA sub-ranges of the members, `start-end` joined by `|`
    pub mt_frag: String,
    pub frag_num: usize,
    pub frag_len: i64,
    pub frag_gaps: i64,
}

impl NumtBlock {
    fn seed(fragment: &NumtFragment) -> Self {
        Self {
            seq_name: fragment.seq_name.clone(),
            start: fragment.start,
            end: fragment.end,
            strand: fragment.strand,
            bit_score: fragment.bit_score,
            expect: fragment.expect,
            length: fragment.length,
            identity: fragment.identity,
            mt_frag: format!("{}-{}", fragment.mt_start, fragment.mt_end),
            frag_num: 1,
            frag_len: fragment.span(),
            frag_gaps: 0,
        }
    }

    fn accepts(&self, fragment: &NumtFragment, frag_merge: i64, stranded: bool) -> bool {
        self.seq_name == fragment.seq_name
            && fragment.start - self.end <= frag_merge
            && (!stranded || self.strand == fragment.strand)
    }

    fn absorb(&mut self, fragment: &NumtFragment) {
        self.frag_gaps += fragment.start - self.end - 1;
        self.end = fragment.end;
        self.expect = self.expect.min(fragment.expect);
        self.bit_score += fragment.bit_score;
        self.length += fragment.length;
        self.identity += fragment.identity;
        self.frag_num += 1;
        self.frag_len += fragment.span();
        self.mt_frag
            .push_str(&format!("|{}-{}", fragment.mt_start, fragment.mt_end));
        if self.strand != fragment.strand {
            self.strand = Strand::Mixed;
        }
    }

    fn close(mut self) -> Self {
        self.length = (self.end - self.start + 1) as u64;
        self
    }

    /// Secondary key used for joins against other tables
    pub fn key(&self) -> FragmentKey {
        FragmentKey {
            seq_name: self.seq_name.clone(),
            start: self.start,
            end: self.end,
            strand: self.strand,
        }
    }
}

/// Merge fragments (already sorted by key) into blocks in a single left-to-right pass.
pub fn merge_fragments(fragments: &[NumtFragment], frag_merge: i64, stranded: bool) -> Vec<NumtBlock> {
    let mut blocks: Vec<NumtBlock> = Vec::new();
    let mut open: Option<NumtBlock> = None;

    for fragment in fragments {
        match open {
            Some(ref mut block) if block.accepts(fragment, frag_merge, stranded) => {
                block.absorb(fragment)
            }
            _ => {
                if let Some(block) = open.replace(NumtBlock::seed(fragment)) {
                    blocks.push(block.close());
                }
            }
        }
    }
    if let Some(block) = open {
        blocks.push(block.close());
    }

    info!(
        "Merging NUMT fragments within {} bp complete: {} frags -> {} blocks",
        frag_merge,
        fragments.len(),
        blocks.len()
    );
    blocks
}
