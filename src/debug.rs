use std::path::{Path, PathBuf};

use image::RgbImage;
use imageproc::{
    drawing::{draw_cross_mut, draw_hollow_rect_mut},
    point::Point,
};
use log::{debug, warn};

use crate::{
    bubbles::BubbleRegion,
    geometry::center_of_rect,
    image_utils::{PINK, RAINBOW},
};

/// Creates a path for a debug image.
pub fn debug_image_path(base: &Path, label: &str) -> PathBuf {
    let mut result = PathBuf::from(base);
    result.set_file_name(format!(
        "{}_debug_{}.png",
        base.file_stem().unwrap_or_default().to_string_lossy(),
        label
    ));
    result
}

/// Writes labeled debug images next to an input sheet, or does nothing when
/// disabled.
pub struct ImageDebugWriter {
    input_path: PathBuf,
    input_image: Option<RgbImage>,
}

impl ImageDebugWriter {
    pub fn new(input_path: PathBuf, input_image: RgbImage) -> Self {
        Self {
            input_path,
            input_image: Some(input_image),
        }
    }

    pub fn disabled() -> Self {
        Self {
            input_path: PathBuf::new(),
            input_image: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.input_image.is_some()
    }

    /// Draws on a copy of the input image and saves it under `label`. Returns
    /// the written path, if any. Failing to save is logged and otherwise
    /// ignored.
    pub fn write(&self, label: &str, draw: impl FnOnce(&mut RgbImage)) -> Option<PathBuf> {
        let mut image = self.input_image.clone()?;
        draw(&mut image);

        let path = debug_image_path(&self.input_path, label);
        match image.save(&path) {
            Ok(()) => {
                debug!("wrote debug image {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("failed to write debug image {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Saves an image computed from scratch, such as a binary mask, under
    /// `label`.
    pub fn write_image(&self, label: &str, image: impl FnOnce() -> RgbImage) -> Option<PathBuf> {
        if !self.is_enabled() {
            return None;
        }
        self.write(label, |canvas| *canvas = image())
    }
}

/// Draws a debug image of every detected bubble, cycling colors so that
/// neighbouring bubbles are easy to tell apart, with the contour vertices
/// marked.
pub fn draw_bubbles_debug_image_mut(canvas: &mut RgbImage, bubbles: &[BubbleRegion]) {
    for (i, bubble) in bubbles.iter().enumerate() {
        draw_hollow_rect_mut(canvas, bubble.bounds, RAINBOW[i % RAINBOW.len()]);
        for Point { x, y } in &bubble.contour {
            if let Some(pixel) = canvas.get_pixel_mut_checked(*x as u32, *y as u32) {
                *pixel = PINK;
            }
        }
        let center = center_of_rect(&bubble.bounds);
        draw_cross_mut(
            canvas,
            RAINBOW[i % RAINBOW.len()],
            center.x.round() as i32,
            center.y.round() as i32,
        );
    }
}
