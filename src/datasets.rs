//! Dataset loading and preprocessing for CIFAR-10 and MNIST.
//!
//! Loaders produce the engine's boundary format: a flat feature matrix and
//! an integer label vector.
use crate::matrix::Matrix;
use anyhow::{anyhow, Result};
use byteorder::{BigEndian, ReadBytesExt};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{Cursor, Read};

/// Feature matrix and integer class labels.
pub type LabeledData = (Matrix, Vec<usize>);

const CIFAR_IMAGE_BYTES: usize = 3 * 32 * 32;
const CIFAR_RECORD_BYTES: usize = 1 + CIFAR_IMAGE_BYTES;

/// Load one CIFAR-10 binary batch file (10000 records of one label byte
/// followed by 3072 pixel bytes). Pixels are scaled to [0, 1].
pub fn load_cifar10_batch(path: &str) -> Result<LabeledData> {
    let mut file =
        File::open(path).map_err(|e| anyhow!("Failed to open {}: {}", path, e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    if bytes.is_empty() || bytes.len() % CIFAR_RECORD_BYTES != 0 {
        return Err(anyhow!(
            "{} is not a CIFAR-10 batch: {} bytes is not a multiple of {}",
            path,
            bytes.len(),
            CIFAR_RECORD_BYTES
        ));
    }
    let mut x = Vec::with_capacity(bytes.len() / CIFAR_RECORD_BYTES);
    let mut y = Vec::with_capacity(x.capacity());
    for record in bytes.chunks_exact(CIFAR_RECORD_BYTES) {
        y.push(record[0] as usize);
        x.push(record[1..].iter().map(|&b| b as f64 / 255.0).collect());
    }
    Ok((x, y))
}

/// Load the five CIFAR-10 training batches from `dir`.
pub fn load_cifar10_train(dir: &str) -> Result<LabeledData> {
    let mut x = Vec::new();
    let mut y = Vec::new();
    for i in 1..=5 {
        let (mut bx, mut by) = load_cifar10_batch(&format!("{}/data_batch_{}.bin", dir, i))?;
        x.append(&mut bx);
        y.append(&mut by);
    }
    Ok((x, y))
}

/// MNIST IDX file loader
#[derive(Debug)]
struct MnistData {
    sizes: Vec<i32>,
    data: Vec<u8>,
}

impl MnistData {
    fn new(filename: &str) -> Result<Self> {
        let file =
            File::open(filename).map_err(|e| anyhow!("Failed to open {}: {}", filename, e))?;
        let mut gz = GzDecoder::new(file);
        let mut contents = Vec::new();
        gz.read_to_end(&mut contents)
            .map_err(|e| anyhow!("Gzip read error: {}", e))?;
        let mut r = Cursor::new(&contents);
        let magic = r
            .read_i32::<BigEndian>()
            .map_err(|e| anyhow!("Read magic: {}", e))?;
        let mut sizes = Vec::new();
        let mut data = Vec::new();
        match magic {
            2049 => {
                sizes.push(r.read_i32::<BigEndian>()?);
            }
            2051 => {
                sizes.push(r.read_i32::<BigEndian>()?);
                sizes.push(r.read_i32::<BigEndian>()?);
                sizes.push(r.read_i32::<BigEndian>()?);
            }
            _ => return Err(anyhow!("Invalid magic: {}", magic)),
        }
        r.read_to_end(&mut data)
            .map_err(|e| anyhow!("Read data: {}", e))?;
        Ok(Self { sizes, data })
    }
}

/// Load MNIST train or test split from gzipped IDX files, searching `data/`
/// then the current directory.
pub fn load_mnist(train: bool) -> Result<LabeledData> {
    let prefix = if train { "train" } else { "t10k" };
    let label_name = format!("{}-labels-idx1-ubyte.gz", prefix);
    let image_name = format!("{}-images-idx3-ubyte.gz", prefix);
    let label_path = format!("data/{}", label_name);
    let image_path = format!("data/{}", image_name);
    let label_data = MnistData::new(&label_path).or_else(|_| MnistData::new(&label_name))?;
    let image_data = MnistData::new(&image_path).or_else(|_| MnistData::new(&image_name))?;
    let num_images = label_data.sizes[0] as usize;
    let image_size = 28 * 28;
    let mut x = Vec::with_capacity(num_images);
    let mut y = Vec::with_capacity(num_images);
    for i in 0..num_images {
        let start = i * image_size;
        if start + image_size > image_data.data.len() {
            return Err(anyhow!("Image data overflow"));
        }
        let img_bytes = &image_data.data[start..start + image_size];
        x.push(img_bytes.iter().map(|&b| b as f64 / 255.0).collect());
        y.push(label_data.data[i] as usize);
    }
    if x.is_empty() {
        return Err(anyhow!("No MNIST data loaded"));
    }
    Ok((x, y))
}

/// Contiguous train/validation/test split: the first `n_train` examples,
/// the next `n_val`, then the next `n_test`.
#[allow(clippy::type_complexity)]
pub fn split_train_val_test(
    x: &Matrix,
    y: &[usize],
    n_train: usize,
    n_val: usize,
    n_test: usize,
) -> Result<(LabeledData, LabeledData, LabeledData)> {
    if y.len() != x.len() {
        return Err(anyhow!(
            "Label count mismatch: {} examples but {} labels",
            x.len(),
            y.len()
        ));
    }
    if n_train + n_val + n_test > x.len() {
        return Err(anyhow!(
            "Split {}+{}+{} exceeds dataset size {}",
            n_train,
            n_val,
            n_test,
            x.len()
        ));
    }
    let take = |from: usize, len: usize| -> LabeledData {
        (x[from..from + len].to_vec(), y[from..from + len].to_vec())
    };
    Ok((
        take(0, n_train),
        take(n_train, n_val),
        take(n_train + n_val, n_test),
    ))
}

/// Column-wise mean of a feature matrix (the "mean image").
pub fn mean_image(x: &Matrix) -> Vec<f64> {
    let mut mean = vec![0.0; x[0].len()];
    for row in x {
        for (m, &v) in mean.iter_mut().zip(row) {
            *m += v;
        }
    }
    let n = x.len() as f64;
    for m in &mut mean {
        *m /= n;
    }
    mean
}

/// Subtract a mean vector from every row in place.
pub fn center_columns(x: &mut Matrix, mean: &[f64]) {
    for row in x.iter_mut() {
        for (v, &m) in row.iter_mut().zip(mean) {
            *v -= m;
        }
    }
}
