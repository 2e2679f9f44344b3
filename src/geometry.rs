use image::{GrayImage, Luma};
use imageproc::drawing::draw_line_segment_mut;
use imageproc::point::Point;
use imageproc::rect::Rect;

/// Gets the smallest rect containing every point of the contour. Bounds are
/// inclusive, so a single point yields a 1×1 rect.
pub fn get_contour_bounding_rect(points: &[Point<i32>]) -> Option<Rect> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for point in points {
        min_x = min_x.min(point.x);
        min_y = min_y.min(point.y);
        max_x = max_x.max(point.x);
        max_y = max_y.max(point.y);
    }
    Some(Rect::at(min_x, min_y).of_size((max_x - min_x + 1) as u32, (max_y - min_y + 1) as u32))
}

fn step(from: &Point<i32>, to: &Point<i32>) -> (i32, i32) {
    ((to.x - from.x).signum(), (to.y - from.y).signum())
}

/// Compresses a closed boundary by dropping every point that sits in the
/// middle of a horizontal, vertical or diagonal run, keeping only the run
/// endpoints.
pub fn compress_boundary(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let mut points = points.to_vec();
    points.dedup();
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    let n = points.len();
    if n < 3 {
        return points;
    }

    (0..n)
        .filter(|&i| {
            let prev = &points[(i + n - 1) % n];
            let current = &points[i];
            let next = &points[(i + 1) % n];
            step(prev, current) != step(current, next)
        })
        .map(|i| points[i])
        .collect()
}

/// Fills the interior of a closed polygon row by row, sampling at pixel
/// centers with the even-odd rule. Edges are half-open in y, so every row
/// crosses the outline an even number of times.
fn fill_polygon_interior(mask: &mut GrayImage, polygon: &[Point<i32>]) {
    let (width, height) = mask.dimensions();
    let mut crossings = Vec::new();

    for y in 0..height as i32 {
        crossings.clear();
        for (i, p0) in polygon.iter().enumerate() {
            let p1 = &polygon[(i + 1) % polygon.len()];
            let (upper, lower) = if p0.y <= p1.y { (p0, p1) } else { (p1, p0) };
            if upper.y <= y && y < lower.y {
                let fraction = (y - upper.y) as f32 / (lower.y - upper.y) as f32;
                crossings.push(upper.x as f32 + fraction * (lower.x - upper.x) as f32);
            }
        }
        crossings.sort_by(f32::total_cmp);

        for span in crossings.chunks_exact(2) {
            let from = span[0].ceil().max(0.0) as u32;
            let to = span[1].floor().min(width as f32 - 1.0);
            if to < 0.0 {
                continue;
            }
            for x in from..=to as u32 {
                mask.put_pixel(x, y as u32, Luma([u8::MAX]));
            }
        }
    }
}

/// Rasterizes the filled contour into a mask the size of `bounds`, with the
/// contour translated so that `bounds` starts at the origin. Pixels on the
/// boundary itself are part of the mask.
pub fn filled_contour_mask(points: &[Point<i32>], bounds: &Rect) -> GrayImage {
    let mut mask = GrayImage::new(bounds.width(), bounds.height());
    let local = points
        .iter()
        .map(|p| Point::new(p.x - bounds.left(), p.y - bounds.top()))
        .collect::<Vec<Point<i32>>>();

    match local.as_slice() {
        [] => {}
        [only] => {
            if only.x >= 0 && only.y >= 0 {
                if let Some(pixel) = mask.get_pixel_mut_checked(only.x as u32, only.y as u32) {
                    *pixel = Luma([u8::MAX]);
                }
            }
        }
        _ => {
            fill_polygon_interior(&mut mask, &local);
            for (i, start) in local.iter().enumerate() {
                let end = &local[(i + 1) % local.len()];
                draw_line_segment_mut(
                    &mut mask,
                    (start.x as f32, start.y as f32),
                    (end.x as f32, end.y as f32),
                    Luma([u8::MAX]),
                );
            }
        }
    }

    mask
}

pub fn center_of_rect(rect: &Rect) -> Point<f32> {
    Point::new(
        rect.left() as f32 + rect.width() as f32 / 2.0,
        rect.top() as f32 + rect.height() as f32 / 2.0,
    )
}
