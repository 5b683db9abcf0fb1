//! Gzip coupon file loading
//!
//! Sources are gzip-compressed UTF-8 text, one code per line. Lines are
//! trimmed and blank lines skipped. Lines that are not valid UTF-8 are
//! counted and dropped; everything else is stored verbatim.
//! Large sources (around 100M codes) take a while to stream, so the reader
//! polls the cancellation token every `cancel_check_interval` lines.

use async_trait::async_trait;
use flate2::bufread::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{CouponLoader, CouponSet, LoadError, MemoryCouponSet};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const READ_BUFFER_BYTES: usize = 64 * 1024;

/// Tuning for the line reader
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    /// Codes to pre-size each set for
    pub initial_capacity: usize,
    /// Lines between cancellation checks
    pub cancel_check_interval: u64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            initial_capacity: 1024,
            cancel_check_interval: 1_000_000,
        }
    }
}

/// Decode a gzip coupon stream into a set
///
/// Blocking; run under `spawn_blocking` from async code. Concatenated gzip
/// members are read as one stream.
pub fn read_coupon_stream<R: Read>(
    reader: R,
    source_id: &str,
    options: LoadOptions,
    cancel: &CancellationToken,
) -> Result<MemoryCouponSet, LoadError> {
    let mut raw = BufReader::with_capacity(READ_BUFFER_BYTES, reader);

    let head = raw.fill_buf().map_err(|e| LoadError::Read {
        source_id: source_id.to_string(),
        reason: e.to_string(),
    })?;
    if head.len() < GZIP_MAGIC.len() || head[..2] != GZIP_MAGIC {
        return Err(LoadError::Decompress {
            source_id: source_id.to_string(),
            reason: "missing gzip header".to_string(),
        });
    }

    let mut lines = BufReader::with_capacity(READ_BUFFER_BYTES, MultiGzDecoder::new(raw));
    let mut set = MemoryCouponSet::with_capacity(options.initial_capacity);
    let interval = options.cancel_check_interval.max(1);
    let mut line: Vec<u8> = Vec::new();
    let mut lines_read: u64 = 0;
    let mut undecodable: u64 = 0;

    loop {
        if lines_read % interval == 0 && cancel.is_cancelled() {
            warn!(source_id = %source_id, lines_read, "Coupon loading cancelled");
            return Err(LoadError::Cancelled {
                source_id: source_id.to_string(),
            });
        }

        line.clear();
        let n = lines
            .read_until(b'\n', &mut line)
            .map_err(|e| classify_stream_error(source_id, e))?;
        if n == 0 {
            break;
        }
        lines_read += 1;

        // A non-UTF-8 line can never equal a requested code; skip it
        let Ok(text) = std::str::from_utf8(&line) else {
            undecodable += 1;
            continue;
        };
        let code = text.trim();
        if !code.is_empty() {
            set.insert(code);
        }
    }

    if undecodable > 0 {
        warn!(source_id = %source_id, undecodable, "Skipped coupon lines that are not valid UTF-8");
    }
    set.shrink_to_fit();
    debug!(source_id = %source_id, lines_read, codes = set.len(), "Coupon stream decoded");
    Ok(set)
}

/// Corrupt deflate data surfaces as `InvalidInput`; anything else is a read failure
fn classify_stream_error(source_id: &str, err: io::Error) -> LoadError {
    match err.kind() {
        io::ErrorKind::InvalidInput => LoadError::Decompress {
            source_id: source_id.to_string(),
            reason: err.to_string(),
        },
        _ => LoadError::Read {
            source_id: source_id.to_string(),
            reason: err.to_string(),
        },
    }
}

/// Loads coupon files from the local filesystem
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    options: LoadOptions,
}

impl FileLoader {
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl CouponLoader for FileLoader {
    async fn load(
        &self,
        cancel: &CancellationToken,
        source_id: &str,
    ) -> Result<Arc<dyn CouponSet>, LoadError> {
        info!(file = %source_id, "Loading coupon file");

        let path = PathBuf::from(source_id);
        let id = source_id.to_string();
        let options = self.options;
        let cancel = cancel.clone();

        let set = tokio::task::spawn_blocking(move || {
            let file = File::open(&path).map_err(|e| LoadError::Open {
                source_id: id.clone(),
                reason: e.to_string(),
            })?;
            read_coupon_stream(file, &id, options, &cancel)
        })
        .await
        .map_err(|e| LoadError::Read {
            source_id: source_id.to_string(),
            reason: format!("loader task failed: {}", e),
        })?
        .inspect_err(|e| warn!(file = %source_id, error = %e, "Failed to load coupon file"))?;

        info!(file = %source_id, coupons_loaded = set.len(), "Coupon file loaded");
        Ok(Arc::new(set))
    }
}
