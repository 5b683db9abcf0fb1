//! Sample coupon data for local development and tests

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Three sources; codes in two or more of them pass the default quorum
pub const SAMPLE_COUPONS: [(&str, [&str; 5]); 3] = [
    (
        "couponbase1.gz",
        ["VALIDONE1", "VALIDTWO12", "ALLTHREE1", "ONLYONE111", "SUMMER2024"],
    ),
    (
        "couponbase2.gz",
        ["VALIDONE1", "VALIDTWO12", "ALLTHREE1", "ONLYTWO222", "WINTER2024"],
    ),
    (
        "couponbase3.gz",
        ["WINTER2024", "SUMMER2024", "ALLTHREE1", "ONLYTHREE3", "SPRING2024"],
    ),
];

/// Write one gzip file, one code per line
pub fn write_coupon_file(path: &Path, codes: &[&str]) -> std::io::Result<()> {
    let file = File::create(path)?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    for code in codes {
        writeln!(encoder, "{}", code)?;
    }
    encoder.finish()?.flush()
}

/// Write the sample sources into `dir`, returning their paths in order
pub fn write_sample_coupons(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let mut paths = Vec::with_capacity(SAMPLE_COUPONS.len());
    for (name, codes) in &SAMPLE_COUPONS {
        let path = dir.join(name);
        write_coupon_file(&path, codes)?;
        paths.push(path);
    }
    Ok(paths)
}
