use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, RgbImage};
use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::logging::log_fs_modification;

/// Sibling path with the extension replaced by `jpg`
pub fn jpeg_path_for(source: &Path) -> PathBuf {
    source.with_extension("jpg")
}

/// Collapse any colour mode (alpha, grayscale, 16-bit) to 8-bit RGB
fn to_rgb(img: DynamicImage) -> RgbImage {
    match img {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => {
            debug!("Converting {:?} to RGB", other.color());
            other.to_rgb8()
        }
    }
}

/// Convert a raster image to a JPEG next to it.
///
/// The source is never modified. The JPEG is encoded to a scratch file and
/// renamed over `<stem>.jpg` only once complete, so a failed encode leaves any
/// existing sibling JPEG as it was.
pub fn convert_to_jpeg(source: &Path, quality: u8) -> Result<PathBuf> {
    info!("Converting {}", source.display());

    let rgb = to_rgb(image::open(source)?);
    let target = jpeg_path_for(source);
    let scratch = source.with_extension("jpg.tmp");

    if let Err(e) = write_jpeg(&rgb, &scratch, quality) {
        warn!("Failed to write {}: {}", scratch.display(), e);
        if scratch.is_file() {
            let _ = std::fs::remove_file(&scratch);
        }
        return Err(e);
    }
    std::fs::rename(&scratch, &target)?;

    log_fs_modification("convert", &target, Some(&format!("from {}", source.display())));
    Ok(target)
}

fn write_jpeg(rgb: &RgbImage, target: &Path, quality: u8) -> Result<()> {
    let mut writer = BufWriter::new(File::create(target)?);
    let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality);
    encoder.encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)?;
    writer.flush()?;
    Ok(())
}
