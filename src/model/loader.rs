//! Model downloading and loading utilities.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;

use crate::error::{Error, Result};

use super::Device;

/// Environment variable overriding the model cache directory.
pub const CACHE_ENV: &str = "PARALLAX_DEPTH_CACHE";

/// ONNX model files used by the depth backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFile {
    /// Depth Anything V2 Small.
    DepthAnythingV2Small,
    /// MiDaS v2.1 small, convolutional.
    MidasSmall,
    /// DPT hybrid MiDaS (ViT-hybrid backbone).
    DptHybrid,
    /// DPT large MiDaS (ViT-L backbone).
    DptLarge,
}

impl ModelFile {
    /// Get the filename for this model in the cache.
    #[must_use]
    pub const fn filename(&self) -> &'static str {
        match self {
            Self::DepthAnythingV2Small => "depth_anything_v2_small.onnx",
            Self::MidasSmall => "midas_v21_small_256.onnx",
            Self::DptHybrid => "dpt_hybrid_midas.onnx",
            Self::DptLarge => "dpt_large.onnx",
        }
    }

    /// Get the download URL for this model.
    #[must_use]
    pub const fn url(&self) -> &'static str {
        match self {
            Self::DepthAnythingV2Small => {
                "https://huggingface.co/onnx-community/depth-anything-v2-small/resolve/main/onnx/model.onnx"
            }
            Self::MidasSmall => {
                "https://github.com/isl-org/MiDaS/releases/download/v2_1/model-small.onnx"
            }
            Self::DptHybrid => {
                "https://huggingface.co/Xenova/dpt-hybrid-midas/resolve/main/onnx/model.onnx"
            }
            Self::DptLarge => "https://huggingface.co/Xenova/dpt-large/resolve/main/onnx/model.onnx",
        }
    }

    /// Get the approximate size in bytes for progress indication.
    #[must_use]
    pub const fn approx_size(&self) -> u64 {
        match self {
            Self::DepthAnythingV2Small => 99_000_000, // ~99 MB
            Self::MidasSmall => 66_000_000,           // ~66 MB
            Self::DptHybrid => 490_000_000,           // ~490 MB
            Self::DptLarge => 1_370_000_000,          // ~1.37 GB
        }
    }
}

/// Manages the model cache directory and downloads.
#[derive(Debug, Clone)]
pub struct ModelCache {
    cache_dir: PathBuf,
}

impl ModelCache {
    /// Create a new model cache.
    ///
    /// Uses `$PARALLAX_DEPTH_CACHE` when set, otherwise the platform cache directory:
    /// - Windows: `%LOCALAPPDATA%\parallax-depth\models`
    /// - Linux: `~/.cache/parallax-depth/models`
    /// - macOS: `~/Library/Caches/parallax-depth/models`
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created.
    pub fn new() -> Result<Self> {
        let cache_dir = std::env::var_os(CACHE_ENV).map_or_else(
            || {
                dirs::cache_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("parallax-depth")
                    .join("models")
            },
            PathBuf::from,
        );

        Self::with_dir(cache_dir)
    }

    /// Create a model cache rooted at a specific directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn with_dir<P: Into<PathBuf>>(cache_dir: P) -> Result<Self> {
        let cache_dir = cache_dir.into();

        fs::create_dir_all(&cache_dir).map_err(|source| Error::CacheDir {
            path: cache_dir.clone(),
            source,
        })?;

        Ok(Self { cache_dir })
    }

    /// Cache directory holding the model files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get the path to a model file, downloading if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be downloaded or accessed.
    pub fn get_model_path(&self, model: ModelFile) -> Result<PathBuf> {
        let path = self.cache_dir.join(model.filename());

        if path.exists() {
            tracing::debug!("Using cached model {}", path.display());
        } else {
            download_file(model.url(), &path, model.filename(), model.approx_size())?;
        }

        Ok(path)
    }

    /// Load an ONNX model session bound to `device`.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be fetched or the session cannot be built.
    pub fn load_session(&self, model: ModelFile, device: Device) -> Result<Session> {
        let path = self.get_model_path(model)?;
        let load_err = |source| Error::ModelLoad {
            name: model.filename().to_string(),
            source,
        };

        tracing::debug!("Building session for {} on {device}", model.filename());

        Session::builder()
            .map_err(load_err)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(load_err)?
            .with_execution_providers(device.execution_providers())
            .map_err(load_err)?
            .commit_from_file(&path)
            .map_err(load_err)
    }
}

/// Download a file from a URL to a path with progress indication.
fn download_file(url: &str, path: &Path, name: &str, approx_size: u64) -> Result<()> {
    tracing::info!("Downloading {name} from {url}");

    let download_err = |source| Error::ModelDownload {
        name: name.to_string(),
        source,
    };
    let cache_err = |source| Error::CacheDir {
        path: path.to_path_buf(),
        source,
    };

    let client = reqwest::blocking::Client::new();
    let mut response = client
        .get(url)
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(download_err)?;

    let total_size = response.content_length().unwrap_or(approx_size);

    let pb = ProgressBar::new(total_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .expect("valid template")
            .progress_chars("#>-"),
    );
    pb.set_message(format!("Downloading {name}"));

    stream_to_file(&mut response, path, &pb).map_err(cache_err)?;
    pb.finish_with_message(format!("Downloaded {name}"));

    Ok(())
}

/// Copy `reader` into `path` through a temporary file, then rename it into place.
///
/// On failure neither the temporary file nor a partial model is left behind.
fn stream_to_file<R: Read>(reader: &mut R, path: &Path, pb: &ProgressBar) -> std::io::Result<()> {
    let temp_path = path.with_extension("tmp");

    let result = write_chunks(reader, &temp_path, pb).and_then(|()| fs::rename(&temp_path, path));
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    result
}

fn write_chunks<R: Read>(reader: &mut R, temp_path: &Path, pb: &ProgressBar) -> std::io::Result<()> {
    let mut file = fs::File::create(temp_path)?;

    let mut downloaded = 0u64;
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        file.write_all(&buffer[..bytes_read])?;
        downloaded += bytes_read as u64;
        pb.set_position(downloaded);
    }

    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filenames_are_distinct() {
        let files = [
            ModelFile::DepthAnythingV2Small,
            ModelFile::MidasSmall,
            ModelFile::DptHybrid,
            ModelFile::DptLarge,
        ];

        for (i, a) in files.iter().enumerate() {
            assert!(a.filename().ends_with(".onnx"));
            assert!(a.url().starts_with("https://"));
            for b in &files[i + 1..] {
                assert_ne!(a.filename(), b.filename());
            }
        }
    }

    #[test]
    fn test_cached_model_is_not_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ModelCache::with_dir(dir.path().join("models")).unwrap();
        let cached = cache.dir().join(ModelFile::MidasSmall.filename());
        fs::write(&cached, b"stub").unwrap();

        let path = cache.get_model_path(ModelFile::MidasSmall).unwrap();
        assert_eq!(path, cached);
    }

    /// Yields a few bytes, then fails like a dropped connection.
    struct DroppedConnection {
        sent: bool,
    }

    impl Read for DroppedConnection {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.sent {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection reset",
                ));
            }
            self.sent = true;
            buf[..4].copy_from_slice(b"onnx");
            Ok(4)
        }
    }

    #[test]
    fn test_interrupted_download_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.onnx");

        let err = stream_to_file(
            &mut DroppedConnection { sent: false },
            &path,
            &ProgressBar::hidden(),
        )
        .unwrap_err();

        assert_eq!(err.kind(), std::io::ErrorKind::ConnectionReset);
        assert!(!path.exists());
        assert!(!path.with_extension("tmp").exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_completed_download_is_renamed_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.onnx");

        let mut body: &[u8] = b"weights";
        stream_to_file(&mut body, &path, &ProgressBar::hidden()).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"weights");
        assert!(!path.with_extension("tmp").exists());
    }
}
