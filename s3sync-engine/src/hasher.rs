//! Content fingerprints.
//!
//! Files are read in fixed-size chunks and fed into MD5, so memory use does
//! not grow with file size and the digest matches a single-part S3 ETag.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use md5::{Digest, Md5};

use s3sync_core::Fingerprint;

/// Read buffer size for hashing.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Fingerprint the file at `path`.
///
/// Returns `None` if the file is absent or cannot be read; callers skip such
/// files instead of failing the scan.
pub fn hash_file(path: &Path) -> Option<Fingerprint> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(err) => {
            if err.kind() != ErrorKind::NotFound {
                tracing::warn!("cannot open {} for hashing: {err}", path.display());
            }
            return None;
        }
    };

    let mut hasher = Md5::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buf[..n]),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                tracing::warn!("read failed while hashing {}: {err}", path.display());
                return None;
            }
        }
    }
    Some(Fingerprint(hex::encode(hasher.finalize())))
}

/// Fingerprint an in-memory buffer.
pub fn hash_bytes(data: &[u8]) -> Fingerprint {
    let mut hasher = Md5::new();
    hasher.update(data);
    Fingerprint(hex::encode(hasher.finalize()))
}
