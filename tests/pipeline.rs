//! End-to-end pipeline tests with stub depth estimators.

use image::{GrayImage, Luma, Rgb, RgbImage};
use ndarray::Array2;

use parallax_depth::pipeline::Stage;
use parallax_depth::{
    image as depth_image, Config, DepthEstimator, DepthField, Error, ErrorKind, Pipeline, Result,
};

/// Returns a left-to-right ramp at a fixed, model-like resolution.
struct RampEstimator {
    rows: usize,
    cols: usize,
}

impl DepthEstimator for RampEstimator {
    fn name(&self) -> &str {
        "ramp"
    }

    #[allow(clippy::cast_precision_loss)]
    fn estimate(&mut self, _image: &RgbImage) -> Result<DepthField> {
        Ok(Array2::from_shape_fn((self.rows, self.cols), |(_, x)| {
            3.0 + x as f32 * 0.5
        }))
    }
}

/// Returns the image luminance at native resolution, like a perfect model.
struct LumaEstimator;

impl DepthEstimator for LumaEstimator {
    fn name(&self) -> &str {
        "luma"
    }

    fn estimate(&mut self, image: &RgbImage) -> Result<DepthField> {
        let (w, h) = image.dimensions();
        Ok(Array2::from_shape_fn((h as usize, w as usize), |(y, x)| {
            let p = image.get_pixel(x as u32, y as u32);
            f32::from(p[0]) + f32::from(p[1]) + f32::from(p[2])
        }))
    }
}

/// Fails every forward pass, like a model with an unexpected output layout.
struct FailingEstimator;

impl DepthEstimator for FailingEstimator {
    fn name(&self) -> &str {
        "failing"
    }

    fn estimate(&mut self, _image: &RgbImage) -> Result<DepthField> {
        Err(Error::ShapeMismatch {
            expected: "[H, W], [1, H, W] or [1, 1, H, W]".to_string(),
            actual: "[1, 2, 3, 4, 5]".to_string(),
        })
    }
}

fn pipeline(estimator: impl DepthEstimator + 'static, invert: bool) -> Pipeline {
    Pipeline::with_estimator(
        Config {
            invert,
            ..Config::default()
        },
        Box::new(estimator),
    )
}

fn gradient_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let v = u8::try_from((x * 7 + y * 3) % 256).unwrap();
        Rgb([v, v / 2, 255 - v])
    })
}

#[test]
fn output_matches_input_dimensions() {
    for (width, height) in [(640, 480), (33, 97), (1, 1), (518, 518)] {
        let mut pipeline = pipeline(RampEstimator { rows: 37, cols: 52 }, false);
        let map = pipeline.generate(&gradient_image(width, height)).unwrap();
        assert_eq!(map.dimensions(), (width, height));
    }
}

#[test]
fn native_resolution_spans_full_range() {
    let mut pipeline = pipeline(LumaEstimator, false);
    let map = pipeline.generate(&gradient_image(64, 48)).unwrap();

    let min = map.pixels().map(|p| p[0]).min().unwrap();
    let max = map.pixels().map(|p| p[0]).max().unwrap();
    assert_eq!((min, max), (0, 255));
}

#[test]
fn inversion_complements_every_pixel() {
    let image = gradient_image(40, 30);

    let plain = pipeline(RampEstimator { rows: 9, cols: 13 }, false)
        .generate(&image)
        .unwrap();
    let inverted = pipeline(RampEstimator { rows: 9, cols: 13 }, true)
        .generate(&image)
        .unwrap();

    for (a, b) in plain.pixels().zip(inverted.pixels()) {
        assert_eq!(u16::from(a[0]) + u16::from(b[0]), 255);
    }
}

#[test]
fn solid_image_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("solid.png");
    RgbImage::from_pixel(4, 4, Rgb([200, 30, 90])).save(&input).unwrap();

    let output = depth_image::default_output_path(&input);
    pipeline(LumaEstimator, false)
        .process(&input, &output)
        .unwrap();

    let plain = image::open(&output).unwrap();
    assert_eq!(plain.color(), image::ColorType::L8);
    let plain = plain.to_luma8();
    assert_eq!(plain.dimensions(), (4, 4));
    let value = plain.get_pixel(0, 0)[0];
    assert!(plain.pixels().all(|p| p[0] == value));

    let inverted_path = dir.path().join("out").join("solid_inverted.png");
    pipeline(LumaEstimator, true)
        .process(&input, &inverted_path)
        .unwrap();

    let inverted = image::open(&inverted_path).unwrap().to_luma8();
    assert_eq!(inverted.dimensions(), (4, 4));
    assert_eq!(inverted, GrayImage::from_pixel(4, 4, Luma([255 - value])));
}

#[test]
fn flat_field_is_uniform_zero() {
    let mut pipeline = pipeline(LumaEstimator, false);
    let map = pipeline
        .generate(&RgbImage::from_pixel(8, 5, Rgb([10, 10, 10])))
        .unwrap();
    assert!(map.pixels().all(|p| p[0] == 0));
}

#[test]
fn missing_input_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("nope").join("missing.jpg");
    let output = dir.path().join("missing_depth.png");

    let mut pipeline = pipeline(LumaEstimator, false);
    let err = pipeline.process(&input, &output).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(!output.exists());
    assert_eq!(pipeline.stage(), Stage::Idle);
}

#[test]
fn process_reaches_done() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("photo.jpg");
    gradient_image(20, 10).save(&input).unwrap();

    let mut pipeline = pipeline(RampEstimator { rows: 4, cols: 4 }, false);
    pipeline
        .process(&input, dir.path().join("photo_depth.png"))
        .unwrap();

    assert_eq!(pipeline.stage(), Stage::Done);
}

#[test]
fn inference_failure_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("photo.png");
    gradient_image(12, 8).save(&input).unwrap();
    let output = dir.path().join("photo_depth.png");

    let mut pipeline = pipeline(FailingEstimator, false);
    let err = pipeline.process(&input, &output).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Inference);
    assert_eq!(pipeline.stage(), Stage::Loaded);
    assert!(!output.exists());
    assert!(!output.with_extension("png.tmp").exists());
}

#[test]
fn unwritable_output_fails_after_encoding() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("photo.png");
    gradient_image(12, 8).save(&input).unwrap();

    // The output's parent directory is a regular file
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"x").unwrap();
    let output = blocker.join("photo_depth.png");

    let mut pipeline = pipeline(LumaEstimator, false);
    let err = pipeline.process(&input, &output).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Io);
    assert_eq!(pipeline.stage(), Stage::Encoded);
    assert!(!output.exists());
    assert_eq!(std::fs::read(&blocker).unwrap(), b"x");
}

#[test]
fn process_image_writes_decoded_image() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("nested").join("depth.png");

    let mut pipeline = pipeline(LumaEstimator, true);
    pipeline
        .process_image(gradient_image(30, 20), &output)
        .unwrap();

    assert_eq!(pipeline.stage(), Stage::Done);
    let map = image::open(&output).unwrap().to_luma8();
    assert_eq!(map.dimensions(), (30, 20));
}
