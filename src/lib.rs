// lib.rs
pub mod block;
pub mod cache;
pub mod config;
pub mod contamination;
pub mod coverage;
pub mod fragment;
pub mod hit_record;
pub mod hits;
pub mod mtdna;
pub mod normalize;
pub mod output;
pub mod pipeline;
