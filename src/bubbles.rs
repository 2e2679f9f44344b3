use imageproc::{
    contours::{find_contours, BorderType, Contour},
    point::Point,
    rect::Rect,
};
use log::debug;
use logging_timer::time;

use crate::{
    geometry::{compress_boundary, get_contour_bounding_rect},
    types::BinaryMask,
};

/// A candidate answer bubble found in the binary mask.
#[derive(Debug, Clone, PartialEq)]
pub struct BubbleRegion {
    pub bounds: Rect,
    /// Outer boundary with straight runs compressed to their endpoints.
    pub contour: Vec<Point<i32>>,
}

impl BubbleRegion {
    pub fn area(&self) -> u32 {
        self.bounds.width() * self.bounds.height()
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.bounds.width() as f32 / self.bounds.height() as f32
    }
}

/// Size and shape limits a contour's bounding box must meet to count as a
/// bubble. Area bounds are exclusive, aspect bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BubbleFilter {
    pub min_area: u32,
    pub max_area: u32,
    pub min_aspect_ratio: f32,
    pub max_aspect_ratio: f32,
}

impl Default for BubbleFilter {
    fn default() -> Self {
        Self {
            min_area: 150,
            max_area: 3500,
            min_aspect_ratio: 0.75,
            max_aspect_ratio: 1.25,
        }
    }
}

impl BubbleFilter {
    /// Determines whether a bounding rect could be a bubble based on its size.
    pub fn rect_could_be_bubble(&self, rect: &Rect) -> bool {
        let area = rect.width() * rect.height();
        let aspect_ratio = rect.width() as f32 / rect.height() as f32;
        area > self.min_area
            && area < self.max_area
            && aspect_ratio >= self.min_aspect_ratio
            && aspect_ratio <= self.max_aspect_ratio
    }
}

fn is_outermost(contour: &Contour<i32>) -> bool {
    contour.border_type == BorderType::Outer && contour.parent.is_none()
}

/// Finds the bubbles in a binary mask using the default filter.
pub fn detect_bubbles(mask: &BinaryMask) -> Vec<BubbleRegion> {
    detect_bubbles_with_filter(mask, &BubbleFilter::default())
}

#[time]
/// Finds outer contours of foreground components, keeps those whose bounding
/// box passes `filter`, and returns them in reading order: top to bottom, then
/// left to right.
pub fn detect_bubbles_with_filter(mask: &BinaryMask, filter: &BubbleFilter) -> Vec<BubbleRegion> {
    let contours = find_contours::<i32>(mask);
    let outer_count = contours.iter().filter(|c| is_outermost(c)).count();

    let mut bubbles = contours
        .into_iter()
        .filter(is_outermost)
        .filter_map(|contour| {
            let contour = compress_boundary(&contour.points);
            let bounds = get_contour_bounding_rect(&contour)?;
            if filter.rect_could_be_bubble(&bounds) {
                Some(BubbleRegion { bounds, contour })
            } else {
                None
            }
        })
        .collect::<Vec<BubbleRegion>>();

    bubbles.sort_by_key(|bubble| (bubble.bounds.top(), bubble.bounds.left()));

    debug!(
        "kept {} of {} outer contours as bubbles",
        bubbles.len(),
        outer_count
    );

    bubbles
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
    use proptest::prelude::*;

    const FOREGROUND: Luma<u8> = Luma([u8::MAX]);

    #[test]
    fn test_filter_bounds() {
        let filter = BubbleFilter::default();
        // area 150 is excluded, 156 included
        assert!(!filter.rect_could_be_bubble(&Rect::at(0, 0).of_size(15, 10)));
        assert!(filter.rect_could_be_bubble(&Rect::at(0, 0).of_size(13, 12)));
        // area 3500 is excluded
        assert!(!filter.rect_could_be_bubble(&Rect::at(0, 0).of_size(70, 50)));
        assert!(filter.rect_could_be_bubble(&Rect::at(0, 0).of_size(59, 59)));
        // aspect bounds are inclusive
        assert!(filter.rect_could_be_bubble(&Rect::at(0, 0).of_size(15, 20)));
        assert!(filter.rect_could_be_bubble(&Rect::at(0, 0).of_size(25, 20)));
        assert!(!filter.rect_could_be_bubble(&Rect::at(0, 0).of_size(26, 20)));
        assert!(!filter.rect_could_be_bubble(&Rect::at(0, 0).of_size(14, 20)));
    }

    #[test]
    fn test_detects_bubbles_in_reading_order() {
        let mut mask = GrayImage::new(200, 120);
        for (cx, cy) in [(150, 30), (30, 30), (90, 32), (30, 90), (90, 88)] {
            draw_filled_circle_mut(&mut mask, (cx, cy), 10, FOREGROUND);
        }

        let bubbles = detect_bubbles(&mask);
        let origins = bubbles
            .iter()
            .map(|b| (b.bounds.left(), b.bounds.top()))
            .collect::<Vec<_>>();
        assert_eq!(
            origins,
            vec![(20, 20), (140, 20), (80, 22), (80, 78), (20, 80)]
        );
        for bubble in &bubbles {
            assert_eq!(bubble.bounds.width(), 21);
            assert_eq!(bubble.bounds.height(), 21);
        }
    }

    #[test]
    fn test_rejects_noise_and_bars() {
        let mut mask = GrayImage::new(200, 100);
        // speck
        draw_filled_rect_mut(&mut mask, Rect::at(5, 5).of_size(3, 3), FOREGROUND);
        // long bar
        draw_filled_rect_mut(&mut mask, Rect::at(20, 60).of_size(150, 12), FOREGROUND);
        // too large
        draw_filled_rect_mut(&mut mask, Rect::at(100, 0).of_size(60, 60), FOREGROUND);
        draw_filled_circle_mut(&mut mask, (40, 30), 9, FOREGROUND);

        let bubbles = detect_bubbles(&mask);
        assert_eq!(bubbles.len(), 1);
        assert_eq!(bubbles[0].bounds, Rect::at(31, 21).of_size(19, 19));
    }

    #[test]
    fn test_ignores_nested_contours() {
        let mut mask = GrayImage::new(100, 100);
        // ring with a dot inside: only the ring's outer boundary counts
        draw_filled_circle_mut(&mut mask, (50, 50), 20, FOREGROUND);
        draw_filled_circle_mut(&mut mask, (50, 50), 16, Luma([0]));
        draw_filled_circle_mut(&mut mask, (50, 50), 8, FOREGROUND);

        let bubbles = detect_bubbles(&mask);
        assert_eq!(bubbles.len(), 1);
        assert_eq!(bubbles[0].bounds, Rect::at(30, 30).of_size(41, 41));
    }

    #[test]
    fn test_contour_is_compressed() {
        let mut mask = GrayImage::new(60, 60);
        draw_filled_rect_mut(&mut mask, Rect::at(10, 10).of_size(20, 20), FOREGROUND);
        let bubbles = detect_bubbles(&mask);
        assert_eq!(bubbles.len(), 1);
        assert_eq!(bubbles[0].contour.len(), 4);
        assert_eq!(bubbles[0].area(), 400);
        assert_eq!(bubbles[0].aspect_ratio(), 1.0);
    }

    #[test]
    fn test_empty_mask() {
        assert!(detect_bubbles(&GrayImage::new(50, 50)).is_empty());
    }

    proptest! {
        #[test]
        fn prop_output_sorted_and_filtered(
            rects in prop::collection::vec((0i32..180, 0i32..180, 1u32..70, 1u32..70), 0..12)
        ) {
            let mut mask = GrayImage::new(256, 256);
            for (x, y, w, h) in rects {
                draw_filled_rect_mut(&mut mask, Rect::at(x, y).of_size(w, h), FOREGROUND);
            }

            let filter = BubbleFilter::default();
            let bubbles = detect_bubbles(&mask);
            for bubble in &bubbles {
                prop_assert!(filter.rect_could_be_bubble(&bubble.bounds));
            }
            for pair in bubbles.windows(2) {
                let a = (pair[0].bounds.top(), pair[0].bounds.left());
                let b = (pair[1].bounds.top(), pair[1].bounds.left());
                prop_assert!(a <= b);
            }
            prop_assert_eq!(bubbles, detect_bubbles(&mask));
        }
    }
}
