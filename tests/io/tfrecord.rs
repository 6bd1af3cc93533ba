use anyhow::Result;
use std::fs;
use xshards::io::tfrecord::{masked_crc, TfRecordReader, TfRecordWriter};
use xshards::XShardsError;

#[test]
fn file_round_trip() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("nested").join("records.tfrecord");
    let records: Vec<Vec<u8>> = (0u8..20).map(|i| vec![i; i as usize * 3]).collect();

    let mut w = TfRecordWriter::create(&path)?;
    for r in &records {
        w.write_record(r)?;
    }
    assert_eq!(w.written(), 20);
    assert_eq!(w.finish()?, 20);

    let back = TfRecordReader::open(&path)?.collect::<Result<Vec<_>>>()?;
    assert_eq!(back, records);
    Ok(())
}

#[cfg(feature = "compression-gzip")]
#[test]
fn gzip_compressed_records() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("records.tfrecord.gz");
    {
        let mut w = TfRecordWriter::create(&path)?;
        w.write_record(b"compressed")?;
        w.finish()?;
    }
    assert_eq!(&fs::read(&path)?[..2], &[0x1f, 0x8b]);
    let back = TfRecordReader::open(&path)?.collect::<Result<Vec<_>>>()?;
    assert_eq!(back, vec![b"compressed".to_vec()]);
    Ok(())
}

#[test]
fn header_layout() -> Result<()> {
    let mut w = TfRecordWriter::new(Vec::new());
    w.write_record(b"abc")?;
    let bytes = w.into_inner()?;
    assert_eq!(&bytes[..8], &3u64.to_le_bytes());
    assert_eq!(&bytes[8..12], &masked_crc(&3u64.to_le_bytes()).to_le_bytes());
    assert_eq!(&bytes[12..15], b"abc");
    assert_eq!(&bytes[15..], &masked_crc(b"abc").to_le_bytes());
    Ok(())
}

#[test]
fn corrupted_length_checksum() -> Result<()> {
    let mut w = TfRecordWriter::new(Vec::new());
    w.write_record(b"abc")?;
    let mut bytes = w.into_inner()?;
    bytes[9] ^= 0x01;
    let err = TfRecordReader::new(bytes.as_slice()).next().unwrap().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<XShardsError>(),
        Some(XShardsError::CorruptRecord(msg)) if msg.contains("length checksum")
    ));
    Ok(())
}
