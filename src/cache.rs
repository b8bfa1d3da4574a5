use crate::config::NumtConfig;
use crate::fragment::NumtFragment;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const CACHE_MAGIC: &[u8; 8] = b"NUMTFRG1";
const CACHE_VERSION: u32 = 1;

/// Everything that determines the filtered fragment set of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub hits_file: String,
    /// Modification time of the hit table when the fragments were built
    pub hits_modified: Option<SystemTime>,
    pub mt_name: String,
    pub mt_len: i64,
    pub config: NumtConfig,
}

#[derive(Serialize, Deserialize)]
struct FragmentCache {
    magic: [u8; 8],
    version: u32,
    fingerprint: RunFingerprint,
    fragments: Vec<NumtFragment>,
}

pub fn cache_path(basefile: &str) -> PathBuf {
    PathBuf::from(format!("{basefile}.numtfrag.bin"))
}

pub fn save_fragments(
    path: &Path,
    fingerprint: &RunFingerprint,
    fragments: &[NumtFragment],
) -> io::Result<()> {
    let cache = FragmentCache {
        magic: *CACHE_MAGIC,
        version: CACHE_VERSION,
        fingerprint: fingerprint.clone(),
        fragments: fragments.to_vec(),
    };

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    bincode::serde::encode_into_std_write(&cache, &mut writer, bincode::config::standard())
        .map_err(io::Error::other)?;
    writer.flush()?;
    debug!("Saved {} fragments to {}", fragments.len(), path.display());
    Ok(())
}

/// Load a previous run's fragment set. Returns `Ok(None)` when there is no cache
/// or it was produced from different inputs or settings.
pub fn load_fragments(
    path: &Path,
    fingerprint: &RunFingerprint,
) -> io::Result<Option<Vec<NumtFragment>>> {
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let cache: FragmentCache =
        match bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard()) {
            Ok(cache) => cache,
            Err(e) => {
                warn!("Ignoring unreadable fragment cache {}: {}", path.display(), e);
                return Ok(None);
            }
        };

    if &cache.magic != CACHE_MAGIC || cache.version != CACHE_VERSION {
        warn!("Ignoring fragment cache {} with unknown format", path.display());
        return Ok(None);
    }
    if cache.fingerprint.hits_modified != fingerprint.hits_modified {
        warn!(
            "Hit table {} has been modified since fragment cache creation: recomputing",
            fingerprint.hits_file
        );
        return Ok(None);
    }
    if cache.fingerprint != *fingerprint {
        info!(
            "Fragment cache {} was built with different settings: recomputing",
            path.display()
        );
        return Ok(None);
    }
    if fingerprint.hits_modified.is_none() {
        warn!("Unable to read timestamp of hit table. Hit table may have been modified since cache creation.");
    }

    info!(
        "NUMT fragments found in {} (force not set). Will re-use",
        path.display()
    );
    Ok(Some(cache.fragments))
}
