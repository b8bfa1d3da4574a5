use log::{info, warn};
use noodles::bgzf;
use noodles::fasta;
use noodles::fasta::record::{Definition, Sequence};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// The single-copy mitochondrial reference used for the search
#[derive(Debug, Clone)]
pub struct MtReference {
    pub name: String,
    pub sequence: Vec<u8>,
}

impl MtReference {
    /// Length of the single-copy reference; the modulus for all circular arithmetic
    pub fn len(&self) -> i64 {
        self.sequence.len() as i64
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Load the first record of a FASTA file (plain or BGZF-compressed).
    pub fn from_fasta(path: &str) -> io::Result<Self> {
        let file = File::open(path).map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("Failed to open mtDNA FASTA file '{path}': {e}"),
            )
        })?;
        let inner: Box<dyn BufRead> = if [".gz", ".bgz"].iter().any(|e| path.ends_with(e)) {
            Box::new(bgzf::io::Reader::new(file))
        } else {
            Box::new(BufReader::new(file))
        };
        Self::from_reader(inner, path)
    }

    fn from_reader<R: BufRead>(inner: R, path: &str) -> io::Result<Self> {
        let mut reader = fasta::io::Reader::new(inner);
        let mut first: Option<MtReference> = None;
        let mut extra = 0usize;

        for result in reader.records() {
            let record = result?;
            if first.is_some() {
                extra += 1;
                continue;
            }
            first = Some(MtReference {
                name: String::from_utf8_lossy(record.name()).into_owned(),
                sequence: record.sequence().as_ref().to_vec(),
            });
        }

        let reference = first.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to load sequences from mtDNA file '{path}'"),
            )
        })?;
        if reference.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("mtDNA sequence '{}' in '{path}' is empty", reference.name),
            ));
        }
        if extra > 0 {
            warn!(
                "{} sequences loaded from {}: will use first sequence ({}) only",
                extra + 1,
                path,
                reference.name
            );
        }
        info!("Mitochondrial DNA length: {} bp", reference.len());
        Ok(reference)
    }
}

/// Path of the doubled-circular query FASTA for an mtDNA file: `<basename>2X.fasta`
pub fn doubled_query_path(mtdna_path: &str) -> PathBuf {
    let file_name = Path::new(mtdna_path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(mtdna_path);
    let base = [".fasta.gz", ".fa.gz", ".fna.gz", ".fasta", ".fa", ".fna", ".fas"]
        .iter()
        .find_map(|ext| file_name.strip_suffix(ext))
        .unwrap_or(file_name);
    PathBuf::from(format!("{base}2X.fasta"))
}

/// Write the reference concatenated to itself as a single `<name>2X` record.
/// An existing output file is reused unless `force` is set.
pub fn write_doubled_query(reference: &MtReference, path: &Path, force: bool) -> io::Result<()> {
    if path.exists() && !force {
        info!(
            "Using existing {} file for mtDNA query (force not set)",
            path.display()
        );
        return Ok(());
    }

    let mut doubled = Vec::with_capacity(reference.sequence.len() * 2);
    doubled.extend_from_slice(&reference.sequence);
    doubled.extend_from_slice(&reference.sequence);

    let record = fasta::Record::new(
        Definition::new(format!("{}2X", reference.name), None),
        Sequence::from(doubled),
    );

    let mut output = BufWriter::new(File::create(path)?);
    fasta::io::Writer::new(&mut output).write_record(&record)?;
    output.flush()?;

    info!(
        "Output double sequence to {} for mtDNA query (circular)",
        path.display()
    );
    Ok(())
}
