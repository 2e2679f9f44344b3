use image::imageops::invert;
use imageproc::{
    contrast::{otsu_level, threshold},
    filter::gaussian_blur_f32,
};
use log::debug;
use logging_timer::time;

use crate::{
    image_utils::{luminance, ratio, WHITE},
    types::{BinaryMask, RawImage},
};

/// Sigma of the Gaussian a 5×5 kernel gets when no sigma is given:
/// `0.3 * ((5 - 1) * 0.5 - 1) + 0.8`.
pub const BLUR_SIGMA: f32 = 1.1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreprocessOptions {
    /// Threshold the blurred luminance instead of the raw luminance.
    pub blur_before_threshold: bool,
}

#[time]
/// Converts a sheet image into a binary mask where dark marks are foreground.
///
/// The Otsu level is chosen over the whole image, and pixels at or below it
/// become foreground.
pub fn preprocess(img: &RawImage, options: &PreprocessOptions) -> BinaryMask {
    let gray = luminance(img);
    let gray = if options.blur_before_threshold {
        gaussian_blur_f32(&gray, BLUR_SIGMA)
    } else {
        gray
    };

    let level = otsu_level(&gray);
    let mut mask = threshold(&gray, level);
    invert(&mut mask);

    debug!(
        "otsu level {} leaves {:.1}% of pixels as foreground",
        level,
        ratio(&mask, &WHITE) * 100.0
    );

    mask
}
