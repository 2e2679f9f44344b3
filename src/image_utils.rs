use image::{GrayImage, Luma, Rgb, RgbImage};

pub const WHITE: Luma<u8> = Luma([u8::MAX]);
pub const BLACK: Luma<u8> = Luma([u8::MIN]);

pub const WHITE_RGB: Rgb<u8> = Rgb([255, 255, 255]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const AZURE: Rgb<u8> = Rgb([0, 165, 255]);
pub const GRAY: Rgb<u8> = Rgb([100, 100, 100]);
pub const PINK: Rgb<u8> = Rgb([255, 0, 255]);

pub const RAINBOW: [Rgb<u8>; 7] = [
    Rgb([255, 0, 0]),
    Rgb([255, 127, 0]),
    Rgb([255, 255, 0]),
    Rgb([0, 255, 0]),
    Rgb([0, 0, 255]),
    Rgb([75, 0, 130]),
    Rgb([148, 0, 211]),
];

/// Converts a color image to luminance using the BT.601 weights
/// (0.299 R + 0.587 G + 0.114 B), rounded in 14-bit fixed point.
///
/// This differs from `DynamicImage::to_luma8`, which uses the BT.709 weights
/// and would shift the Otsu level for the same scan.
pub fn luminance(img: &RgbImage) -> GrayImage {
    const SHIFT: u32 = 14;
    const R_WEIGHT: u32 = 4899;
    const G_WEIGHT: u32 = 9617;
    const B_WEIGHT: u32 = 1868;

    let mut out = GrayImage::new(img.width(), img.height());
    for (x, y, Rgb([r, g, b])) in img.enumerate_pixels() {
        let luma = (*r as u32 * R_WEIGHT
            + *g as u32 * G_WEIGHT
            + *b as u32 * B_WEIGHT
            + (1 << (SHIFT - 1)))
            >> SHIFT;
        out.put_pixel(x, y, Luma([luma as u8]));
    }
    out
}

/// Expands a binary mask to RGB so it can be drawn on in color.
pub fn mask_to_rgb(img: &GrayImage) -> RgbImage {
    let mut out = RgbImage::new(img.width(), img.height());
    for (x, y, Luma([luma])) in img.enumerate_pixels() {
        out.put_pixel(x, y, Rgb([*luma, *luma, *luma]));
    }
    out
}

/// Determines the number of pixels in an image that match the given luma.
pub fn count_pixels(img: &GrayImage, luma: &Luma<u8>) -> u32 {
    img.pixels().filter(|p| *p == luma).count() as u32
}

/// Determines the ratio of pixels in an image that match the given luma.
pub fn ratio(img: &GrayImage, luma: &Luma<u8>) -> f32 {
    let total = img.width() * img.height();
    if total == 0 {
        return 0.0;
    }
    count_pixels(img, luma) as f32 / total as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luminance_extremes() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([0, 0, 0]));
        img.put_pixel(1, 0, Rgb([255, 255, 255]));
        let gray = luminance(&img);
        assert_eq!(gray.get_pixel(0, 0), &BLACK);
        assert_eq!(gray.get_pixel(1, 0), &WHITE);
    }

    #[test]
    fn test_luminance_weights() {
        let mut img = RgbImage::new(3, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 255, 0]));
        img.put_pixel(2, 0, Rgb([0, 0, 255]));
        let gray = luminance(&img);
        assert_eq!(gray.get_pixel(0, 0).0[0], 76);
        assert_eq!(gray.get_pixel(1, 0).0[0], 150);
        assert_eq!(gray.get_pixel(2, 0).0[0], 29);
    }

    #[test]
    fn test_ratio() {
        let mut img = GrayImage::from_pixel(4, 1, BLACK);
        img.put_pixel(0, 0, WHITE);
        assert_eq!(count_pixels(&img, &WHITE), 1);
        assert_eq!(ratio(&img, &WHITE), 0.25);
        assert_eq!(ratio(&GrayImage::new(0, 0), &WHITE), 0.0);
    }
}
