use image::Rgb;
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};
use logging_timer::time;

use crate::{
    answer_key::FlatKey,
    bubbles::BubbleRegion,
    image_utils::{AZURE, GRAY, GREEN, RED},
    mapping::question_groups,
    scoring::{AnswerDetail, AnswerStatus},
    types::{OptionCount, RawImage},
};

/// Picks the outline color for one option of a question.
///
/// An incorrect question colors every option in its group, not only the
/// marked one.
pub fn option_color(status: Option<AnswerStatus>, option_accepted: bool) -> Rgb<u8> {
    match status {
        Some(AnswerStatus::Correct) if option_accepted => GREEN,
        Some(AnswerStatus::Incorrect) => RED,
        Some(AnswerStatus::Unanswered) if option_accepted => AZURE,
        _ => GRAY,
    }
}

/// Draws a two pixel outline from the top-left corner of `bounds` to one past
/// its bottom-right corner.
fn draw_thick_outline_mut(canvas: &mut RawImage, bounds: &Rect, color: Rgb<u8>) {
    let outer = Rect::at(bounds.left(), bounds.top()).of_size(bounds.width() + 1, bounds.height() + 1);
    draw_hollow_rect_mut(canvas, outer, color);
    if outer.width() > 2 && outer.height() > 2 {
        let inner = Rect::at(outer.left() + 1, outer.top() + 1)
            .of_size(outer.width() - 2, outer.height() - 2);
        draw_hollow_rect_mut(canvas, inner, color);
    }
}

#[time]
/// Returns a copy of `img` with each bubble of every keyed question outlined
/// in a color showing how the question was scored.
pub fn annotate(
    img: &RawImage,
    bubbles: &[BubbleRegion],
    details: &AnswerDetail,
    key: &FlatKey,
    options: OptionCount,
) -> RawImage {
    let mut canvas = img.clone();

    for (question, group) in question_groups(bubbles, options, key.len()) {
        let status = details.get(&question).copied();
        let accepted = key.get(&question);

        for (index, bubble) in group.iter().enumerate() {
            let option_accepted = match (options.letter(index), accepted) {
                (Some(letter), Some(accepted)) => accepted.contains_letter(letter),
                _ => false,
            };
            draw_thick_outline_mut(&mut canvas, &bubble.bounds, option_color(status, option_accepted));
        }
    }

    canvas
}
