//! ImageNet layout <-> sharded TFRecord files.
//!
//! Input is `<root>/train/<synset>/*` and `<root>/validation/<synset>/*`.
//! Labels are 1-based positions of the synset in the sorted list of training
//! synsets. Training images are shuffled with a seeded RNG, then every split is
//! cut into contiguous ranges, one per `<split>-NNNNN-of-MMMMM` file.
//!
//! Reading is lazy: [`ImageNetDataset`] opens one shard at a time and, in
//! training mode, draws from a fixed-size shuffle buffer.

use super::example::{Example, Feature};
use super::TfRecordFormat;
use crate::error::XShardsError;
use crate::io::glob::{is_hidden, resolve_fragments};
use crate::io::tfrecord::{TfRecordReader, TfRecordWriter};
use anyhow::{Context, Result};
use prost::Message;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};

const DEFAULT_TRAIN_SHARDS: usize = 1024;
const DEFAULT_VALIDATION_SHARDS: usize = 128;
const DEFAULT_SEED: u64 = 12345;
const DEFAULT_SHUFFLE_BUFFER: usize = 1024;

/// Options for [`write_tfrecord_with`].
#[derive(Clone, Debug)]
pub struct ImageNetWriteOptions {
    pub train_shards: usize,
    pub validation_shards: usize,
    /// Worker threads writing shards.
    pub num_threads: usize,
    /// Seed of the shuffle applied to training images before sharding.
    pub seed: u64,
}

impl Default for ImageNetWriteOptions {
    fn default() -> Self {
        Self {
            train_shards: DEFAULT_TRAIN_SHARDS,
            validation_shards: DEFAULT_VALIDATION_SHARDS,
            num_threads: num_cpus::get(),
            seed: DEFAULT_SEED,
        }
    }
}

impl ImageNetWriteOptions {
    #[must_use]
    pub fn with_train_shards(mut self, shards: usize) -> Self {
        self.train_shards = shards;
        self
    }

    #[must_use]
    pub fn with_validation_shards(mut self, shards: usize) -> Self {
        self.validation_shards = shards;
        self
    }

    #[must_use]
    pub fn with_num_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Options for [`read_tfrecord_with`].
#[derive(Clone, Debug)]
pub struct ReadTfRecordOptions {
    /// Records held back for shuffling in training mode. `0` or `1` disables
    /// record shuffling.
    pub shuffle_buffer: usize,
    /// `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for ReadTfRecordOptions {
    fn default() -> Self {
        Self {
            shuffle_buffer: DEFAULT_SHUFFLE_BUFFER,
            seed: None,
        }
    }
}

impl ReadTfRecordOptions {
    #[must_use]
    pub fn with_shuffle_buffer(mut self, records: usize) -> Self {
        self.shuffle_buffer = records;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// One labelled image as stored in an ImageNet TFRecord.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageExample {
    /// The encoded image file, byte for byte.
    pub encoded: Vec<u8>,
    /// `JPEG`, `PNG`, ...
    pub format: String,
    pub filename: String,
    /// 1-based class index; 0 is reserved for background.
    pub label: i64,
    pub synset: String,
}

impl ImageExample {
    pub fn to_example(&self) -> Example {
        Example::from_features([
            ("image/encoded", Feature::bytes(self.encoded.clone())),
            ("image/format", Feature::bytes(self.format.as_bytes())),
            ("image/filename", Feature::bytes(self.filename.as_bytes())),
            ("image/class/label", Feature::int64(self.label)),
            ("image/class/synset", Feature::bytes(self.synset.as_bytes())),
        ])
    }

    /// Extract the ImageNet features of `example`.
    ///
    /// # Errors
    /// [`XShardsError::CorruptRecord`] when a feature is missing or has the
    /// wrong kind.
    pub fn from_example(example: &Example) -> Result<Self> {
        let bytes = |key: &str| {
            example
                .bytes(key)
                .ok_or_else(|| XShardsError::CorruptRecord(format!("missing bytes feature {key}")))
        };
        let text = |key: &str| -> Result<String> {
            Ok(String::from_utf8_lossy(bytes(key)?).into_owned())
        };
        Ok(Self {
            encoded: bytes("image/encoded")?.to_vec(),
            format: text("image/format")?,
            filename: text("image/filename")?,
            label: example.int64("image/class/label").ok_or_else(|| {
                XShardsError::CorruptRecord("missing int64 feature image/class/label".into())
            })?,
            synset: text("image/class/synset")?,
        })
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let example = Example::decode(bytes).context("decode tf.train.Example")?;
        Self::from_example(&example)
    }
}

#[derive(Clone, Debug)]
struct ImageFile {
    path: PathBuf,
    synset: String,
    label: i64,
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("list {}", dir.display()))? {
        let path = entry?.path();
        if !is_hidden(&path) {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Synset directory names under `train/`, sorted; their position + 1 is the label.
fn train_synsets(train_dir: &Path) -> Result<Vec<String>> {
    let synsets: Vec<String> = sorted_entries(train_dir)?
        .into_iter()
        .filter(|p| p.is_dir())
        .map(|p| file_name(&p))
        .collect();
    if synsets.is_empty() {
        return Err(XShardsError::InvalidImageNetLayout(format!(
            "{} has no synset directories",
            train_dir.display()
        ))
        .into());
    }
    Ok(synsets)
}

fn list_images(split_dir: &Path, synsets: &[String]) -> Result<Vec<ImageFile>> {
    let mut out = Vec::new();
    for dir in sorted_entries(split_dir)?.into_iter().filter(|p| p.is_dir()) {
        let synset = file_name(&dir);
        let label = match synsets.binary_search(&synset) {
            Ok(i) => i as i64 + 1,
            Err(_) => {
                return Err(XShardsError::InvalidImageNetLayout(format!(
                    "synset {synset} in {} is not a training class",
                    split_dir.display()
                ))
                .into());
            }
        };
        for path in sorted_entries(&dir)?.into_iter().filter(|p| p.is_file()) {
            out.push(ImageFile {
                path,
                synset: synset.clone(),
                label,
            });
        }
    }
    Ok(out)
}

fn image_format(path: &Path) -> String {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg") => {
            "JPEG".to_string()
        }
        Some(ext) => ext.to_ascii_uppercase(),
        None => String::new(),
    }
}

fn shard_name(split: &str, index: usize, shards: usize) -> String {
    format!("{split}-{index:05}-of-{shards:05}")
}

/// Write `images` into `shards` files under `out_dir`, each holding a
/// contiguous range of the list.
fn write_split(split: &str, images: &[ImageFile], out_dir: &Path, shards: usize) -> Result<usize> {
    let shards = shards.max(1);
    fs::create_dir_all(out_dir).with_context(|| format!("mkdir -p {}", out_dir.display()))?;
    let n = images.len();
    let counts = (0..shards)
        .into_par_iter()
        .map(|i| -> Result<usize> {
            let range = &images[i * n / shards..(i + 1) * n / shards];
            let path = out_dir.join(shard_name(split, i, shards));
            let mut writer = TfRecordWriter::create(&path)?;
            for img in range {
                let encoded = fs::read(&img.path)
                    .with_context(|| format!("read image {}", img.path.display()))?;
                let example = ImageExample {
                    encoded,
                    format: image_format(&img.path),
                    filename: file_name(&img.path),
                    label: img.label,
                    synset: img.synset.clone(),
                };
                writer.write_record(&example.to_example().encode_to_vec())?;
            }
            let written = writer.finish()?;
            tracing::debug!(shard = %path.display(), images = written, "wrote TFRecord shard");
            Ok(written)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(counts.iter().sum())
}

/// [`write_tfrecord_with`] using default options.
pub fn write_tfrecord(
    format: TfRecordFormat,
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> Result<usize> {
    write_tfrecord_with(format, input, output, &ImageNetWriteOptions::default())
}

/// Convert an ImageNet directory tree into sharded TFRecord files.
///
/// Expects `input/train/<synset>/<image>` and optionally
/// `input/validation/<synset>/<image>`; writes `output/train/train-00000-of-NNNNN`
/// (and `output/validation/...`). Every shard file is created, even when
/// there are fewer images than shards.
///
/// Returns the number of examples written across both splits.
///
/// # Errors
/// [`XShardsError::InvalidImageNetLayout`] when `train/` is missing or has no
/// classes, or when a validation synset has no training counterpart.
pub fn write_tfrecord_with(
    format: TfRecordFormat,
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &ImageNetWriteOptions,
) -> Result<usize> {
    let TfRecordFormat::ImageNet = format;
    let input = input.as_ref();
    let output = output.as_ref();
    let train_dir = input.join("train");
    if !train_dir.is_dir() {
        return Err(XShardsError::InvalidImageNetLayout(format!(
            "missing {}",
            train_dir.display()
        ))
        .into());
    }
    let synsets = train_synsets(&train_dir)?;
    let mut train = list_images(&train_dir, &synsets)?;
    let mut rng = StdRng::seed_from_u64(options.seed);
    train.shuffle(&mut rng);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.num_threads.max(1))
        .build()
        .context("build rayon thread pool")?;

    let mut total = pool.install(|| {
        write_split("train", &train, &output.join("train"), options.train_shards)
    })?;

    let validation_dir = input.join("validation");
    if validation_dir.is_dir() {
        let validation = list_images(&validation_dir, &synsets)?;
        total += pool.install(|| {
            write_split(
                "validation",
                &validation,
                &output.join("validation"),
                options.validation_shards,
            )
        })?;
    }
    tracing::debug!(classes = synsets.len(), examples = total, output = %output.display(), "wrote ImageNet TFRecords");
    Ok(total)
}

/// [`read_tfrecord_with`] using default options.
pub fn read_tfrecord(
    format: TfRecordFormat,
    path: impl AsRef<Path>,
    is_training: bool,
) -> Result<ImageNetDataset> {
    read_tfrecord_with(format, path, is_training, ReadTfRecordOptions::default())
}

/// Open a directory (or glob) of ImageNet TFRecord shards as a lazy dataset.
///
/// Files are opened one at a time as the dataset is iterated. With
/// `is_training`, file order is shuffled and records go through a shuffle
/// buffer; otherwise records come back in file order.
///
/// # Errors
/// [`XShardsError::PathNotFound`] when `path` is missing or holds no files.
pub fn read_tfrecord_with(
    format: TfRecordFormat,
    path: impl AsRef<Path>,
    is_training: bool,
    options: ReadTfRecordOptions,
) -> Result<ImageNetDataset> {
    let TfRecordFormat::ImageNet = format;
    let path = path.as_ref();
    let mut files = match resolve_fragments(path) {
        Ok(files) => files,
        Err(e) if matches!(e.downcast_ref::<XShardsError>(), Some(XShardsError::NoDataFiles(_))) => {
            return Err(XShardsError::PathNotFound(path.to_path_buf()).into());
        }
        Err(e) => return Err(e),
    };
    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    if is_training {
        files.shuffle(&mut rng);
    }
    let buffer = if is_training {
        options.shuffle_buffer.max(1)
    } else {
        1
    };
    tracing::debug!(files = files.len(), is_training, buffer, "open TFRecord dataset");
    Ok(ImageNetDataset {
        files,
        next_file: 0,
        current: None,
        buffer: Vec::with_capacity(buffer),
        capacity: buffer,
        rng,
        done: false,
    })
}

/// Lazily iterated examples of a TFRecord directory.
///
/// Use `dataset.by_ref().take(n)` to peek at the first examples without
/// giving up the rest.
pub struct ImageNetDataset {
    files: Vec<PathBuf>,
    next_file: usize,
    current: Option<TfRecordReader<Box<dyn BufRead>>>,
    buffer: Vec<ImageExample>,
    capacity: usize,
    rng: StdRng,
    done: bool,
}

impl std::fmt::Debug for ImageNetDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageNetDataset")
            .field("files", &self.files.len())
            .field("next_file", &self.next_file)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

impl ImageNetDataset {
    /// Shard files in iteration order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    fn next_raw(&mut self) -> Option<Result<ImageExample>> {
        loop {
            if self.current.is_none() {
                let path = self.files.get(self.next_file)?;
                self.next_file += 1;
                match TfRecordReader::open(path) {
                    Ok(r) => self.current = Some(r),
                    Err(e) => return Some(Err(e)),
                }
            }
            let reader = self.current.as_mut()?;
            match reader.next() {
                Some(Ok(bytes)) => return Some(ImageExample::decode(&bytes)),
                Some(Err(e)) => return Some(Err(e)),
                None => self.current = None,
            }
        }
    }
}

impl Iterator for ImageNetDataset {
    type Item = Result<ImageExample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        while self.buffer.len() < self.capacity {
            match self.next_raw() {
                Some(Ok(example)) => self.buffer.push(example),
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => break,
            }
        }
        match self.buffer.len() {
            0 => None,
            1 => self.buffer.pop().map(Ok),
            n => {
                let i = self.rng.gen_range(0..n);
                Some(Ok(self.buffer.swap_remove(i)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_names_are_zero_padded() {
        assert_eq!(shard_name("train", 3, 1024), "train-00003-of-01024");
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(image_format(Path::new("a/b.JPEG")), "JPEG");
        assert_eq!(image_format(Path::new("a/b.jpg")), "JPEG");
        assert_eq!(image_format(Path::new("a/b.png")), "PNG");
    }

    #[test]
    fn example_features_round_trip() -> Result<()> {
        let img = ImageExample {
            encoded: vec![1, 2, 3],
            format: "JPEG".into(),
            filename: "x.JPEG".into(),
            label: 2,
            synset: "n02".into(),
        };
        let back = ImageExample::decode(&img.to_example().encode_to_vec())?;
        assert_eq!(back, img);
        Ok(())
    }

    #[test]
    fn missing_label_is_corrupt() {
        let ex = Example::from_features([("image/encoded", Feature::bytes(vec![1u8]))]);
        let err = ImageExample::from_example(&ex).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<XShardsError>(),
            Some(XShardsError::CorruptRecord(_))
        ));
    }
}
