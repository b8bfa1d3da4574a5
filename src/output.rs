use crate::block::NumtBlock;
use crate::coverage::CoverageProfile;
use crate::fragment::NumtFragment;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const FRAGMENT_HEADER: &str =
    "SeqName\tStart\tEnd\tStrand\tBitScore\tExpect\tLength\tIdentity\tmtStart\tmtEnd";
pub const BLOCK_HEADER: &str =
    "SeqName\tStart\tEnd\tStrand\tBitScore\tExpect\tLength\tIdentity\tmtFrag\tFragNum\tFragLen\tFragGaps";
pub const DEPTH_HEADER: &str = "Locus\tPos\tDepth";
pub const READLEN_HEADER: &str = "Locus\tReadLen\tCount";

/// Output table locations derived from the run basefile
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPaths {
    pub fragments: PathBuf,
    pub blocks: PathBuf,
    pub depth: PathBuf,
    pub read_lengths: PathBuf,
}

impl OutputPaths {
    pub fn from_basefile(basefile: &str) -> Self {
        Self {
            fragments: PathBuf::from(format!("{basefile}.numtfrag.tsv")),
            blocks: PathBuf::from(format!("{basefile}.numtblock.tsv")),
            depth: PathBuf::from(format!("{basefile}.depth.tsv")),
            read_lengths: PathBuf::from(format!("{basefile}.readlen.tsv")),
        }
    }
}

/// E-values below 1e-3 in exponent form, others as plain decimals
pub fn format_expect(expect: f64) -> String {
    if expect != 0.0 && expect.abs() < 1e-3 {
        format!("{:e}", expect)
    } else {
        format!("{}", expect)
    }
}

pub fn write_fragment_table<W: Write>(writer: &mut W, fragments: &[NumtFragment]) -> io::Result<()> {
    writeln!(writer, "{}", FRAGMENT_HEADER)?;
    for f in fragments {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            f.seq_name,
            f.start,
            f.end,
            f.strand,
            f.bit_score,
            format_expect(f.expect),
            f.length,
            f.identity,
            f.mt_start,
            f.mt_end
        )?;
    }
    Ok(())
}

pub fn write_block_table<W: Write>(writer: &mut W, blocks: &[NumtBlock]) -> io::Result<()> {
    writeln!(writer, "{}", BLOCK_HEADER)?;
    for b in blocks {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            b.seq_name,
            b.start,
            b.end,
            b.strand,
            b.bit_score,
            format_expect(b.expect),
            b.length,
            b.identity,
            b.mt_frag,
            b.frag_num,
            b.frag_len,
            b.frag_gaps
        )?;
    }
    Ok(())
}

pub fn write_depth_table<W: Write>(writer: &mut W, profile: &CoverageProfile) -> io::Result<()> {
    writeln!(writer, "{}", DEPTH_HEADER)?;
    for (idx, depth) in profile.depth.iter().enumerate() {
        writeln!(writer, "{}\t{}\t{}", profile.locus, idx + 1, depth)?;
    }
    Ok(())
}

pub fn write_readlen_table<W: Write>(writer: &mut W, profile: &CoverageProfile) -> io::Result<()> {
    writeln!(writer, "{}", READLEN_HEADER)?;
    for (read_len, count) in &profile.read_lengths {
        writeln!(writer, "{}\t{}\t{}", profile.locus, read_len, count)?;
    }
    Ok(())
}

/// Tables written to temporary siblings and renamed into place together by `commit`.
/// Anything still staged when dropped is removed, so an early return publishes nothing.
#[derive(Debug, Default)]
pub struct StagedOutput {
    staged: Vec<(PathBuf, PathBuf)>,
}

impl StagedOutput {
    pub fn stage<F>(&mut self, path: &Path, write: F) -> io::Result<()>
    where
        F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
    {
        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let result = File::create(&tmp_path).and_then(|file| {
            let mut writer = BufWriter::new(file);
            write(&mut writer)?;
            writer.flush()
        });
        match result {
            Ok(()) => {
                self.staged.push((tmp_path, path.to_path_buf()));
                Ok(())
            }
            Err(e) => {
                let _ = std::fs::remove_file(&tmp_path);
                Err(e)
            }
        }
    }

    pub fn commit(mut self) -> io::Result<()> {
        for (tmp_path, path) in std::mem::take(&mut self.staged) {
            std::fs::rename(&tmp_path, &path)?;
        }
        Ok(())
    }
}

impl Drop for StagedOutput {
    fn drop(&mut self) {
        for (tmp_path, _) in &self.staged {
            let _ = std::fs::remove_file(tmp_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit_record::Strand;
    use std::collections::BTreeMap;

    #[test]
    fn test_format_expect() {
        assert_eq!(format_expect(0.0), "0");
        assert_eq!(format_expect(1e-50), "1e-50");
        assert_eq!(format_expect(2.5e-10), "2.5e-10");
        assert_eq!(format_expect(0.01), "0.01");
    }

    #[test]
    fn test_fragment_row() {
        let fragment = NumtFragment {
            seq_name: "chr1".to_string(),
            start: 100,
            end: 500,
            strand: Strand::Minus,
            bit_score: 523.5,
            expect: 1e-120,
            length: 401,
            identity: 390,
            mt_start: 16500,
            mt_end: 331,
        };
        let mut buf = Vec::new();
        write_fragment_table(&mut buf, &[fragment]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows[0], FRAGMENT_HEADER);
        assert_eq!(rows[1], "chr1\t100\t500\t-\t523.5\t1e-120\t401\t390\t16500\t331");
    }

    #[test]
    fn test_profile_tables() {
        let profile = CoverageProfile {
            locus: "MT".to_string(),
            depth: vec![0, 2, 1],
            read_lengths: BTreeMap::from([(50, 1), (7, 3)]),
        };
        let mut buf = Vec::new();
        write_depth_table(&mut buf, &profile).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "Locus\tPos\tDepth\nMT\t1\t0\nMT\t2\t2\nMT\t3\t1\n"
        );

        let mut buf = Vec::new();
        write_readlen_table(&mut buf, &profile).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "Locus\tReadLen\tCount\nMT\t7\t3\nMT\t50\t1\n"
        );
    }

    #[test]
    fn test_commit_replaces_targets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tsv");
        std::fs::write(&path, "old\n").unwrap();

        let mut staged = StagedOutput::default();
        staged.stage(&path, |w| writeln!(w, "hello")).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old\n");
        staged.commit().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
        assert!(!dir.path().join("out.tsv.tmp").exists());
    }

    #[test]
    fn test_failed_stage_publishes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.tsv");
        let second = dir.path().join("second.tsv");

        let mut staged = StagedOutput::default();
        staged.stage(&first, |w| writeln!(w, "ok")).unwrap();
        let err = staged
            .stage(&second, |_| Err(io::Error::other("disk full")))
            .unwrap_err();
        assert_eq!(err.to_string(), "disk full");
        drop(staged);

        assert!(!first.exists());
        assert!(!second.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
