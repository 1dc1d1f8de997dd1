use crate::errors::CropError;
use common::span_debug;
use fast_image_resize::{
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
    images::{Image, ImageRef},
};
use image::{RgbImage, imageops};

/// Side length of every emitted crop.
pub const OUTPUT_SIZE: u32 = 300;

/// Square pixel region `[x1, x2) x [y1, y2)` inside an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl CropRegion {
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// Margins added around a detection before squaring.
///
/// `side` widens the box on the left and sets the ideal square to
/// `box width + 2 * side`. `top` lifts the region above the box; it is
/// zero by default so the square starts at the top of the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropPadding {
    pub side: u32,
    pub top: u32,
}

impl Default for CropPadding {
    fn default() -> Self {
        Self { side: 10, top: 0 }
    }
}

/// Computes the square crop for `bbox = (x1, y1, x2, y2)` in an image of
/// `(height, width)`.
///
/// The region starts `padding.side` left of the box and `padding.top` above
/// it, extends by the ideal side, is clamped to the image, and is then cut
/// down to its shorter edge so it stays square.
pub fn compute_crop(
    bbox: (u32, u32, u32, u32),
    (height, width): (u32, u32),
    padding: &CropPadding,
) -> CropRegion {
    let (x1, y1, x2, _) = bbox;

    let side = x2.saturating_sub(x1).saturating_add(padding.side.saturating_mul(2));

    let new_x1 = x1.saturating_sub(padding.side).min(width);
    let new_y1 = y1.saturating_sub(padding.top).min(height);
    let mut new_x2 = width.min(new_x1.saturating_add(side));
    let mut new_y2 = height.min(new_y1.saturating_add(side));

    let final_width = new_x2 - new_x1;
    let final_height = new_y2 - new_y1;

    if final_width > final_height {
        new_x2 = new_x1 + final_height;
    } else {
        new_y2 = new_y1 + final_width;
    }

    CropRegion {
        x1: new_x1,
        y1: new_y1,
        x2: new_x2,
        y2: new_y2,
    }
}

/// Copies `region` out of `image` and area-resamples it to
/// [`OUTPUT_SIZE`] x [`OUTPUT_SIZE`].
pub fn extract_and_resize(image: &RgbImage, region: &CropRegion) -> Result<RgbImage, CropError> {
    let _s = span_debug!("extract_and_resize");

    if region.is_empty() || region.x2 > image.width() || region.y2 > image.height() {
        return Err(CropError::Degenerate(*region));
    }

    let block = imageops::crop_imm(
        image,
        region.x1,
        region.y1,
        region.width(),
        region.height(),
    )
    .to_image();

    let src = ImageRef::new(block.width(), block.height(), block.as_raw(), PixelType::U8x3)?;
    let mut dst = Image::new(OUTPUT_SIZE, OUTPUT_SIZE, PixelType::U8x3);

    Resizer::new().resize(
        &src,
        &mut dst,
        &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Box)),
    )?;

    RgbImage::from_raw(OUTPUT_SIZE, OUTPUT_SIZE, dst.buffer().to_vec())
        .ok_or(CropError::Degenerate(*region))
}
