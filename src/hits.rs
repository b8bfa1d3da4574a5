//! Local alignment hit table parsing
//!
//! Reads the tab-delimited hit table produced by the external aligner wrapper.
//! Columns are matched by name when a header line is present, otherwise positionally.
//! Supports both uncompressed and BGZF-compressed files.

use crate::hit_record::{AlignmentHit, HitTableFormat};
use log::debug;
use noodles::bgzf;
use std::fs::File;
use std::io::{BufRead, BufReader, Error as IoError, Read, Seek, SeekFrom};

/// Column names in the positional order used when the table has no header
pub const HIT_COLUMNS: [&str; 10] = [
    "Query", "Hit", "SbjStart", "SbjEnd", "QryStart", "QryEnd", "BitScore", "Expect", "Length",
    "Identity",
];

#[derive(Debug)]
pub enum ParseErr {
    NotEnoughFields(usize),
    MissingColumn(String),
    IoError(IoError),
    InvalidField(String, String),
    InvalidFormat(String),
    EmptyTable,
}

impl std::fmt::Display for ParseErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseErr::NotEnoughFields(line) => {
                write!(f, "Not enough fields in hit table line {}", line)
            }
            ParseErr::MissingColumn(name) => write!(f, "Missing required column '{}'", name),
            ParseErr::IoError(e) => write!(f, "IO error: {}", e),
            ParseErr::InvalidField(column, value) => {
                write!(f, "Invalid value '{}' in column {}", value, column)
            }
            ParseErr::InvalidFormat(msg) => write!(f, "{}", msg),
            ParseErr::EmptyTable => write!(f, "Hit table contains no alignment records"),
        }
    }
}

impl std::error::Error for ParseErr {}

const BGZF_HEADER_SIZE: usize = 18;

/// Check whether a file starts with a valid BGZF header.
/// Returns `Ok(false)` for regular gzip, too-small files, or plain text.
fn is_bgzf<R: Read + Seek>(reader: &mut R) -> std::io::Result<bool> {
    let mut header = [0u8; BGZF_HEADER_SIZE];
    let result = match reader.read_exact(&mut header) {
        Ok(()) => {
            Ok(header[0..2] == [0x1f, 0x8b]      // gzip magic
                && header[2] == 0x08              // DEFLATE
                && header[3] == 0x04              // FEXTRA
                && header[10..12] == [0x06, 0x00] // XLEN=6
                && header[12..14] == [b'B', b'C'] // BC subfield
                && header[14..16] == [0x02, 0x00]) // SLEN=2
        }
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    };
    reader.seek(SeekFrom::Start(0))?;
    result
}

/// Field positions of the required columns within a row
#[derive(Debug, Clone, PartialEq)]
struct ColumnMap {
    indices: [usize; 10],
}

impl ColumnMap {
    fn positional() -> Self {
        ColumnMap {
            indices: [0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
        }
    }

    /// Build from a header line. Returns `Ok(None)` when the line is not a header.
    fn from_header(fields: &[&str]) -> Result<Option<Self>, ParseErr> {
        if !fields.iter().any(|f| HIT_COLUMNS.contains(f)) {
            return Ok(None);
        }
        let mut indices = [0usize; 10];
        for (slot, name) in HIT_COLUMNS.iter().enumerate() {
            indices[slot] = fields
                .iter()
                .position(|f| f == name)
                .ok_or_else(|| ParseErr::MissingColumn(name.to_string()))?;
        }
        Ok(Some(ColumnMap { indices }))
    }

    fn width(&self) -> usize {
        self.indices.iter().max().map_or(0, |m| m + 1)
    }

    fn field<'a>(&self, fields: &[&'a str], slot: usize) -> &'a str {
        fields[self.indices[slot]]
    }
}

fn parse_num<T: std::str::FromStr>(value: &str, column: &str) -> Result<T, ParseErr> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ParseErr::InvalidField(column.to_string(), value.to_string()))
}

/// Parse a single table row into an AlignmentHit
fn parse_hit_line(
    fields: &[&str],
    columns: &ColumnMap,
    line_number: usize,
) -> Result<AlignmentHit, ParseErr> {
    if fields.len() < columns.width() {
        return Err(ParseErr::NotEnoughFields(line_number));
    }
    let get = |slot: usize| columns.field(fields, slot);

    Ok(AlignmentHit {
        query_id: get(0).to_string(),
        hit_id: get(1).to_string(),
        subject_start: parse_num(get(2), HIT_COLUMNS[2])?,
        subject_end: parse_num(get(3), HIT_COLUMNS[3])?,
        query_start: parse_num(get(4), HIT_COLUMNS[4])?,
        query_end: parse_num(get(5), HIT_COLUMNS[5])?,
        bit_score: parse_num(get(6), HIT_COLUMNS[6])?,
        expect: parse_num(get(7), HIT_COLUMNS[7])?,
        length: parse_num(get(8), HIT_COLUMNS[8])?,
        identity: parse_num(get(9), HIT_COLUMNS[9])?,
    })
}

/// Parse a hit table. Blank lines and `#` comment lines are skipped.
pub fn parse_hit_table<R: BufRead>(reader: R) -> Result<Vec<AlignmentHit>, ParseErr> {
    let mut columns: Option<ColumnMap> = None;
    let mut hits = Vec::new();

    for (idx, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(ParseErr::IoError)?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();

        if columns.is_none() {
            if let Some(map) = ColumnMap::from_header(&fields)? {
                debug!("Hit table header found, reading columns by name");
                columns = Some(map);
                continue;
            }
        }
        let map = columns.get_or_insert_with(ColumnMap::positional);

        hits.push(parse_hit_line(&fields, map, idx + 1)?);
    }

    if hits.is_empty() {
        return Err(ParseErr::EmptyTable);
    }
    Ok(hits)
}

/// Parse a hit table file with automatic format detection (compressed or uncompressed)
pub fn parse_hit_file(path: &str) -> Result<Vec<AlignmentHit>, ParseErr> {
    let mut file = File::open(path).map_err(|e| {
        ParseErr::InvalidFormat(format!("Failed to open hit table '{}': {}", path, e))
    })?;

    match HitTableFormat::from_path(path) {
        HitTableFormat::Bgzf => {
            if !is_bgzf(&mut file).map_err(ParseErr::IoError)? {
                return Err(ParseErr::InvalidFormat(format!(
                    "'{}' is regular gzip, not BGZF. Convert with: zcat '{}' | bgzip > output.tsv.gz",
                    path, path
                )));
            }
            debug!("Reading BGZF-compressed hit table {}", path);
            parse_hit_table(bgzf::io::Reader::new(file))
        }
        HitTableFormat::Plain => parse_hit_table(BufReader::new(file)),
    }
}
