//! Depth map encoding and saving utilities.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{codecs::png::PngEncoder, ExtendedColorType, GrayImage, ImageEncoder};

use crate::error::{Error, Result};

/// Suffix appended to the input stem for the default output file.
const DEPTH_SUFFIX: &str = "_depth.png";

/// Derive the default output path for an input image: `<dir>/<stem>_depth.png`.
#[must_use]
pub fn default_output_path<P: AsRef<Path>>(input: P) -> PathBuf {
    let input = input.as_ref();
    let stem = input
        .file_stem()
        .map_or_else(|| "image".into(), |s| s.to_string_lossy());
    let file_name = format!("{stem}{DEPTH_SUFFIX}");

    match input.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// Encode a depth map as single-channel 8-bit PNG bytes.
///
/// # Errors
///
/// Returns an error if the encoder rejects the buffer.
pub fn encode_png(depth_map: &GrayImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();

    PngEncoder::new(Cursor::new(&mut bytes))
        .write_image(
            depth_map.as_raw(),
            depth_map.width(),
            depth_map.height(),
            ExtendedColorType::L8,
        )
        .map_err(|source| Error::ImageEncode { source })?;

    Ok(bytes)
}

/// Write encoded bytes to `path`, creating missing parent directories.
///
/// The bytes go to a temporary sibling first and are renamed into place, so a
/// failed write never leaves a partial file at `path`.
///
/// # Errors
///
/// Returns [`Error::OutputWrite`] if a directory or the file cannot be written.
pub fn write_bytes<P: AsRef<Path>>(bytes: &[u8], path: P) -> Result<()> {
    let path = path.as_ref();
    let write_err = |source| Error::OutputWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    if let Err(source) = fs::write(&temp_path, bytes) {
        let _ = fs::remove_file(&temp_path);
        return Err(write_err(source));
    }

    if let Err(source) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(write_err(source));
    }

    Ok(())
}

/// Encode a depth map as PNG and write it to `path`.
///
/// # Errors
///
/// Returns an error if encoding or writing fails.
pub fn save_depth_map<P: AsRef<Path>>(depth_map: &GrayImage, path: P) -> Result<()> {
    let path = path.as_ref();

    let bytes = encode_png(depth_map)?;
    write_bytes(&bytes, path)?;

    tracing::info!("Depth map saved to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use image::Luma;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path("foo/bar.jpg"),
            PathBuf::from("foo/bar_depth.png")
        );
        assert_eq!(
            default_output_path("bar.jpeg"),
            PathBuf::from("bar_depth.png")
        );
        assert_eq!(
            default_output_path("/tmp/shots/IMG.1234.HEIC"),
            PathBuf::from("/tmp/shots/IMG.1234_depth.png")
        );
    }

    #[test]
    fn test_encode_png_is_lossless_l8() {
        let mut map = GrayImage::new(5, 3);
        for (x, y, pixel) in map.enumerate_pixels_mut() {
            *pixel = Luma([u8::try_from(x * 50 + y).unwrap()]);
        }

        let bytes = encode_png(&map).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.color(), image::ColorType::L8);
        assert_eq!(decoded.to_luma8(), map);
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("out.png");

        save_depth_map(&GrayImage::from_pixel(2, 2, Luma([7])), &path).unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("nested/deeper/out.png.tmp").exists());
        let reloaded = image::open(&path).unwrap().to_luma8();
        assert_eq!(reloaded.get_pixel(1, 1), &Luma([7]));
    }

    #[test]
    fn test_write_into_file_parent_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();

        let err = write_bytes(b"data", blocker.join("out.png")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
