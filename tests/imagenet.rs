#![cfg(feature = "io-tfrecord")]

use anyhow::Result;
use std::collections::BTreeSet;
use std::fs;
use xshards::testing::write_imagenet_layout;
use xshards::*;

fn small() -> ImageNetWriteOptions {
    ImageNetWriteOptions::default()
        .with_train_shards(2)
        .with_validation_shards(1)
        .with_num_threads(2)
}

#[test]
fn write_then_take_one() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let raw = write_imagenet_layout(tmp.path())?;
    let out = tmp.path().join("tfrecords");

    let written = write_tfrecord("imagenet".parse()?, &raw, &out)?;
    assert_eq!(written, 5);
    assert!(out.join("train").join("train-00000-of-01024").is_file());
    assert!(out.join("validation").join("validation-00127-of-00128").is_file());

    let mut train = read_tfrecord("imagenet".parse()?, out.join("train"), true)?;
    let first: Vec<ImageExample> = train.by_ref().take(1).collect::<Result<_>>()?;
    assert_eq!(first.len(), 1);
    assert_eq!(train.count(), 3);
    Ok(())
}

#[test]
fn labels_follow_sorted_synsets() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let raw = write_imagenet_layout(tmp.path())?;
    let out = tmp.path().join("tfrecords");
    write_tfrecord_with(TfRecordFormat::ImageNet, &raw, &out, &small())?;

    let train = read_tfrecord(TfRecordFormat::ImageNet, out.join("train"), false)?;
    assert_eq!(train.files().len(), 2);
    let examples = train.collect::<Result<Vec<_>>>()?;
    assert_eq!(examples.len(), 4);
    for ex in &examples {
        let expected = if ex.synset == "n01440764" { 1 } else { 2 };
        assert_eq!(ex.label, expected);
        assert_eq!(ex.format, "JPEG");
        assert!(ex.filename.starts_with(&ex.synset));
        let original = fs::read(raw.join("train").join(&ex.synset).join(&ex.filename))?;
        assert_eq!(ex.encoded, original);
    }

    let validation = read_tfrecord(TfRecordFormat::ImageNet, out.join("validation"), false)?;
    let v = validation.collect::<Result<Vec<_>>>()?;
    assert_eq!(v.len(), 1);
    assert_eq!(v[0].label, 2);
    Ok(())
}

#[test]
fn training_shuffle_is_seeded() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let raw = write_imagenet_layout(tmp.path())?;
    let out = tmp.path().join("tfrecords");
    write_tfrecord_with(TfRecordFormat::ImageNet, &raw, &out, &small())?;

    let read = |seed: u64| -> Result<Vec<String>> {
        let opts = ReadTfRecordOptions::default().with_seed(seed).with_shuffle_buffer(4);
        read_tfrecord_with(TfRecordFormat::ImageNet, out.join("train"), true, opts)?
            .map(|r| r.map(|e| e.filename))
            .collect()
    };
    let a = read(7)?;
    assert_eq!(a, read(7)?);
    let names: BTreeSet<_> = a.into_iter().collect();
    assert_eq!(names.len(), 4);
    Ok(())
}

#[test]
fn unknown_format_is_rejected() {
    let err = "cifar10".parse::<TfRecordFormat>().unwrap_err();
    assert!(matches!(err, XShardsError::UnsupportedFormat(_)));
}

#[test]
fn missing_train_dir_is_invalid_layout() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let err = write_tfrecord(TfRecordFormat::ImageNet, tmp.path(), tmp.path().join("out"))
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<XShardsError>(),
        Some(XShardsError::InvalidImageNetLayout(_))
    ));
    Ok(())
}

#[test]
fn empty_dataset_dir_is_not_found() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let err = read_tfrecord(TfRecordFormat::ImageNet, tmp.path(), true).unwrap_err();
    assert!(err.to_string().contains("Path does not exist"));
    Ok(())
}
