use crate::fragment::NumtFragment;
use crate::hit_record::Strand;
use coitrees::{BasicCOITree, Interval, IntervalTree};
use log::{debug, info};
use std::collections::BTreeMap;

/// A fragment expressed purely in circular mtDNA coordinates for depth accounting
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageReadInterval {
    pub id: u32,
    pub locus: String,
    pub start: i64,
    pub end: i64,
    /// Circular span of the undivided fragment, shared by both pieces of a split
    pub read_len: i64,
    pub strand: Strand,
}

/// Depth and read-length profiles over one circular locus
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageProfile {
    pub locus: String,
    /// depth[p - 1] is the number of intervals covering position p
    pub depth: Vec<u32>,
    /// read length -> number of original fragments
    pub read_lengths: BTreeMap<i64, usize>,
}

impl CoverageProfile {
    pub fn depth_at(&self, position: i64) -> Option<u32> {
        if position < 1 {
            return None;
        }
        self.depth.get((position - 1) as usize).copied()
    }
}

/// Span on the ring from `start` to `end`, wrapping through the origin when `start > end`
pub fn circular_span(start: i64, end: i64, mt_len: i64) -> i64 {
    if start <= end {
        end - start + 1
    } else {
        (mt_len - start + 1) + end
    }
}

/// One interval per fragment with sequential ids starting at 1
pub fn read_intervals(fragments: &[NumtFragment], locus: &str, mt_len: i64) -> Vec<CoverageReadInterval> {
    fragments
        .iter()
        .enumerate()
        .map(|(idx, fragment)| CoverageReadInterval {
            id: idx as u32 + 1,
            locus: locus.to_string(),
            start: fragment.mt_start,
            end: fragment.mt_end,
            read_len: circular_span(fragment.mt_start, fragment.mt_end, mt_len),
            strand: fragment.strand,
        })
        .collect()
}

/// Split origin-spanning intervals into `[start, mt_len]` (original id) and `[1, end]` (new id).
pub fn split_origin(intervals: Vec<CoverageReadInterval>, mt_len: i64) -> Vec<CoverageReadInterval> {
    let mut next_id = intervals.iter().map(|i| i.id).max().unwrap_or(0) + 1;
    let mut pieces = Vec::with_capacity(intervals.len());

    for interval in intervals {
        if interval.start > interval.end {
            let tail = CoverageReadInterval {
                id: next_id,
                start: 1,
                ..interval.clone()
            };
            next_id += 1;
            pieces.push(CoverageReadInterval {
                end: mt_len,
                ..interval
            });
            pieces.push(tail);
        } else {
            pieces.push(interval);
        }
    }
    pieces
}

/// Per-position depth over `[1, mt_len]`
fn depth_profile(intervals: &[CoverageReadInterval], mt_len: i64) -> Vec<u32> {
    if intervals.is_empty() {
        return vec![0; mt_len as usize];
    }
    let nodes: Vec<Interval<u32>> = intervals
        .iter()
        .map(|i| Interval::new(i.start as i32, i.end as i32, i.id))
        .collect();
    let tree: BasicCOITree<u32, u32> = BasicCOITree::new(nodes.as_slice());

    (1..=mt_len)
        .map(|p| tree.query_count(p as i32, p as i32) as u32)
        .collect()
}

/// Compute depth and read-length profiles for the filtered fragment set
pub fn compute_coverage(fragments: &[NumtFragment], locus: &str, mt_len: i64) -> CoverageProfile {
    let reads = read_intervals(fragments, locus, mt_len);

    let mut read_lengths: BTreeMap<i64, usize> = BTreeMap::new();
    for read in &reads {
        *read_lengths.entry(read.read_len).or_insert(0) += 1;
    }

    let before = reads.len();
    let pieces = split_origin(reads, mt_len);
    debug!(
        "{} fragments span the mtDNA origin and were split",
        fragments.iter().filter(|f| f.spans_origin()).count()
    );

    let depth = depth_profile(&pieces, mt_len);
    let covered = depth.iter().filter(|&&d| d > 0).count();
    info!(
        "Coverage of {}: {} of {} positions covered by {} fragments",
        locus,
        covered,
        mt_len,
        before
    );

    CoverageProfile {
        locus: locus.to_string(),
        depth,
        read_lengths,
    }
}
