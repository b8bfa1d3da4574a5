//! Coordinate normalisation of raw hits into oriented fragments.
//!
//! Subject coordinates become assembly start/end with `start <= end` and an explicit strand.
//! In circular mode the query was the mtDNA concatenated to itself, so query coordinates
//! beyond `mt_len` are folded back once onto the single-copy ring. A folded `mt_start`
//! greater than `mt_end` marks a fragment spanning the circularisation origin and is kept as is.

use crate::fragment::NumtFragment;
use crate::hit_record::{AlignmentHit, Strand};

/// Fold a doubled-query coordinate back onto `[1, mt_len]`.
pub fn demodulate(position: i64, mt_len: i64) -> i64 {
    if position > mt_len {
        position - mt_len
    } else {
        position
    }
}

/// Strand and ordered assembly coordinates from subject start/end
pub fn orient(subject_start: i64, subject_end: i64) -> (Strand, i64, i64) {
    if subject_end < subject_start {
        (Strand::Minus, subject_end, subject_start)
    } else {
        (Strand::Plus, subject_start, subject_end)
    }
}

pub fn normalize_hit(hit: &AlignmentHit, mt_len: i64, circle: bool) -> NumtFragment {
    let (strand, start, end) = orient(hit.subject_start, hit.subject_end);
    let (mt_start, mt_end) = if circle {
        (
            demodulate(hit.query_start, mt_len),
            demodulate(hit.query_end, mt_len),
        )
    } else {
        (hit.query_start, hit.query_end)
    };

    NumtFragment {
        seq_name: hit.hit_id.clone(),
        start,
        end,
        strand,
        bit_score: hit.bit_score,
        expect: hit.expect,
        length: hit.length,
        identity: hit.identity,
        mt_start,
        mt_end,
    }
}
