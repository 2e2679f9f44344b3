use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use log::{debug, warn};
use logging_timer::time;
use serde::{Deserialize, Serialize};

use crate::{
    answer_key::FlatKey,
    bubbles::BubbleRegion,
    geometry::filled_contour_mask,
    types::{BinaryMask, OptionCount, QuestionId},
};

/// A bubble counts as filled only when strictly more than this fraction of
/// its pixels are foreground.
pub const FILL_THRESHOLD: f32 = 0.45;

/// Below this fraction of the expected bubble count the mapping is flagged
/// as low confidence.
pub const MIN_DETECTION_RATIO: f64 = 0.9;

/// The response read for one question.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Answer {
    Unanswered,
    Single(char),
    /// Several bubbles filled; letters are sorted.
    Multiple(Vec<char>),
}

impl Answer {
    pub fn from_letters(mut letters: Vec<char>) -> Self {
        letters.sort_unstable();
        letters.dedup();
        match letters.as_slice() {
            [] => Answer::Unanswered,
            [letter] => Answer::Single(*letter),
            _ => Answer::Multiple(letters),
        }
    }
}

impl Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Answer::Unanswered => write!(f, "-"),
            Answer::Single(letter) => write!(f, "{}", letter),
            Answer::Multiple(letters) => {
                let joined = letters
                    .iter()
                    .map(|letter| letter.to_string())
                    .collect::<Vec<String>>()
                    .join(",");
                write!(f, "{}", joined)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidAnswer(pub String);

impl Display for InvalidAnswer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid answer {:?}, expected `-` or comma-separated uppercase letters",
            self.0
        )
    }
}

impl std::error::Error for InvalidAnswer {}

impl FromStr for Answer {
    type Err = InvalidAnswer;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "-" {
            return Ok(Answer::Unanswered);
        }

        let letters = s
            .split(',')
            .map(|part| {
                let mut chars = part.chars();
                match (chars.next(), chars.next()) {
                    (Some(letter), None) if letter.is_ascii_uppercase() => Ok(letter),
                    _ => Err(InvalidAnswer(s.to_string())),
                }
            })
            .collect::<Result<Vec<char>, InvalidAnswer>>()?;
        Ok(Answer::from_letters(letters))
    }
}

impl<'de> Deserialize<'de> for Answer {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for Answer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Answers read from one sheet. Questions that are absent are unanswered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentAnswers(BTreeMap<QuestionId, Answer>);

impl StudentAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, question: QuestionId, answer: Answer) {
        self.0.insert(question, answer);
    }

    pub fn get(&self, question: &QuestionId) -> &Answer {
        self.0.get(question).unwrap_or(&Answer::Unanswered)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QuestionId, &Answer)> {
        self.0.iter()
    }
}

impl FromIterator<(QuestionId, Answer)> for StudentAnswers {
    fn from_iter<T: IntoIterator<Item = (QuestionId, Answer)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Raised when far fewer bubbles were found than the key implies. Mapping
/// still proceeds with whatever was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowConfidenceWarning {
    pub detected: usize,
    pub expected: usize,
}

impl Display for LowConfidenceWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Detected only {} bubbles, expected around {}. Results may be inaccurate.",
            self.detected, self.expected
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MappedAnswers {
    pub answers: StudentAnswers,
    pub low_confidence: Option<LowConfidenceWarning>,
}

/// Computes the fraction of the bubble's filled contour that is foreground
/// in `mask`. An empty contour has a ratio of zero.
pub fn fill_ratio(mask: &BinaryMask, bubble: &BubbleRegion) -> f32 {
    let contour_mask = filled_contour_mask(&bubble.contour, &bubble.bounds);
    let mut total = 0u32;
    let mut filled = 0u32;

    for (x, y, pixel) in contour_mask.enumerate_pixels() {
        if pixel.0[0] == 0 {
            continue;
        }
        total += 1;

        let mask_x = bubble.bounds.left() + x as i32;
        let mask_y = bubble.bounds.top() + y as i32;
        if mask_x < 0 || mask_y < 0 {
            continue;
        }
        if let Some(mask_pixel) = mask.get_pixel_checked(mask_x as u32, mask_y as u32) {
            if mask_pixel.0[0] > 0 {
                filled += 1;
            }
        }
    }

    if total == 0 {
        0.0
    } else {
        filled as f32 / total as f32
    }
}

pub fn is_filled_ratio(ratio: f32) -> bool {
    ratio > FILL_THRESHOLD
}

pub fn is_filled(mask: &BinaryMask, bubble: &BubbleRegion) -> bool {
    is_filled_ratio(fill_ratio(mask, bubble))
}

/// Splits bubbles in reading order into one group per question, at most
/// `question_count` groups. Each group is sorted left to right so its
/// position matches the option letter. The last group may be short when the
/// bubble count is not a multiple of the option count.
pub fn question_groups<'a>(
    bubbles: &'a [BubbleRegion],
    options: OptionCount,
    question_count: usize,
) -> Vec<(QuestionId, Vec<&'a BubbleRegion>)> {
    let usable = bubbles.len().min(question_count * options.get());
    bubbles[..usable]
        .chunks(options.get())
        .zip(1u32..)
        .filter_map(|(chunk, number)| {
            let mut group = chunk.iter().collect::<Vec<&BubbleRegion>>();
            group.sort_by_key(|bubble| bubble.bounds.left());
            Some((QuestionId::new(number)?, group))
        })
        .collect()
}

#[time]
/// Reads one answer per question from the detected bubbles.
///
/// The expected bubble count is the number of questions in `key` times the
/// option count. Questions with no bubble group are left out of the result.
pub fn map_answers(
    bubbles: &[BubbleRegion],
    mask: &BinaryMask,
    key: &FlatKey,
    options: OptionCount,
) -> MappedAnswers {
    let expected = key.len() * options.get();
    let low_confidence = if (bubbles.len() as f64) < expected as f64 * MIN_DETECTION_RATIO {
        let warning = LowConfidenceWarning {
            detected: bubbles.len(),
            expected,
        };
        warn!("{}", warning);
        Some(warning)
    } else {
        None
    };

    let answers = question_groups(bubbles, options, key.len())
        .into_iter()
        .map(|(question, group)| {
            let letters = group
                .iter()
                .enumerate()
                .filter(|(_, bubble)| is_filled(mask, bubble))
                .filter_map(|(index, _)| options.letter(index))
                .collect::<Vec<char>>();
            let answer = Answer::from_letters(letters);
            debug!("{}: {}", question, answer);
            (question, answer)
        })
        .collect::<StudentAnswers>();

    MappedAnswers {
        answers,
        low_confidence,
    }
}
