// THEORY:
// The `privacy` module hides sensitive regions of a frame (faces, number plates)
// before it is shown or stored. A region is an axis-aligned box in pixel
// coordinates; it is clamped to the frame, cropped out, gaussian-blurred and
// written back in place. Regions that fall entirely outside the frame are ignored.

use crate::error::HazardResult;
use image::codecs::png::PngEncoder;
use image::{ImageEncoder, RgbaImage, imageops};
use std::fmt;
use std::io::BufWriter;
use std::path::Path;
use std::str::FromStr;

/// Sigma matching a 51x51 gaussian kernel.
pub const DEFAULT_BLUR_SIGMA: f32 = 8.0;

/// A box given by its top-left `(x1, y1)` and bottom-right `(x2, y2)` corners.
/// Coordinates may lie outside the frame; they are clamped before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl Region {
    pub fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Clamps to the frame, returning `(x, y, width, height)` or `None` if nothing is left.
    fn clamp_to(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        if width == 0 || height == 0 {
            return None;
        }
        let x1 = self.x1.max(0);
        let y1 = self.y1.max(0);
        let x2 = self.x2.min(width as i64 - 1);
        let y2 = self.y2.min(height as i64 - 1);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some((x1 as u32, y1 as u32, (x2 - x1) as u32, (y2 - y1) as u32))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionParseError(pub String);

impl fmt::Display for RegionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected x1,y1,x2,y2 but got '{}'", self.0)
    }
}

impl std::error::Error for RegionParseError {}

impl FromStr for Region {
    type Err = RegionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<i64> = s
            .split(',')
            .map(|p| p.trim().parse::<i64>())
            .collect::<Result<_, _>>()
            .map_err(|_| RegionParseError(s.to_string()))?;
        match parts.as_slice() {
            [x1, y1, x2, y2] => Ok(Region::new(*x1, *y1, *x2, *y2)),
            _ => Err(RegionParseError(s.to_string())),
        }
    }
}

/// Blurs one region in place. Returns whether anything was blurred.
pub fn blur_region(frame: &mut RgbaImage, region: Region, sigma: f32) -> bool {
    let Some((x, y, w, h)) = region.clamp_to(frame.width(), frame.height()) else {
        return false;
    };
    let roi = imageops::crop_imm(&*frame, x, y, w, h).to_image();
    let blurred = imageops::blur(&roi, sigma);
    imageops::replace(frame, &blurred, x as i64, y as i64);
    true
}

/// Blurs every region, returning how many were inside the frame.
pub fn apply_privacy(frame: &mut RgbaImage, regions: &[Region], sigma: f32) -> usize {
    regions
        .iter()
        .filter(|region| blur_region(frame, **region, sigma))
        .count()
}

pub fn load(path: &Path) -> HazardResult<RgbaImage> {
    Ok(image::open(path)?.to_rgba8())
}

pub fn save(path: &Path, frame: &RgbaImage) -> HazardResult<()> {
    let output = BufWriter::new(std::fs::File::create(path)?);
    let encoder = PngEncoder::new(output);

    encoder.write_image(
        frame.as_raw(),
        frame.width(),
        frame.height(),
        image::ExtendedColorType::Rgba8,
    )?;

    Ok(())
}
