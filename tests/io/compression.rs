use anyhow::Result;
use std::io::{Read, Write};
use xshards::io::compression::{auto_detect_reader, auto_detect_writer, Compression};

fn round_trip(name: &str) -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join(name);
    let payload = "id,name\n1,Alice\n2,Bob\n".repeat(50);
    {
        let mut w = auto_detect_writer(std::fs::File::create(&path)?, &path)?;
        w.write_all(payload.as_bytes())?;
        w.finish()?;
    }
    let raw = std::fs::read(&path)?;
    if let Some(codec) = Compression::from_path(&path) {
        assert!(raw.starts_with(codec.magic_bytes()), "{name} not {}", codec.name());
    }

    // by extension
    let mut s = String::new();
    auto_detect_reader(std::fs::File::open(&path)?, &path)?.read_to_string(&mut s)?;
    assert_eq!(s, payload);

    // by magic bytes alone
    let mut s = String::new();
    auto_detect_reader(raw.as_slice(), "stdin")?.read_to_string(&mut s)?;
    assert_eq!(s, payload);
    Ok(())
}

#[test]
fn plain_files_pass_through() -> Result<()> {
    round_trip("data.csv")
}

#[cfg(feature = "compression-gzip")]
#[test]
fn gzip() -> Result<()> {
    round_trip("data.csv.gz")
}

#[cfg(feature = "compression-zstd")]
#[test]
fn zstd() -> Result<()> {
    round_trip("data.csv.zst")
}

#[cfg(feature = "compression-bzip2")]
#[test]
fn bzip2() -> Result<()> {
    round_trip("data.json.bz2")
}

#[cfg(feature = "compression-xz")]
#[test]
fn xz() -> Result<()> {
    round_trip("data.json.xz")
}
