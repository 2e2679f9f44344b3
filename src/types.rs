use std::fmt::Display;
use std::str::FromStr;

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

/// A color sheet image as supplied by the caller.
pub type RawImage = RgbImage;

/// Foreground (ink) pixels are `u8::MAX`, background pixels are `u8::MIN`.
pub type BinaryMask = GrayImage;

// Defines a new type that wraps a String for use as an ID.
macro_rules! idtype {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            #[allow(dead_code)]
            pub fn from(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            #[allow(dead_code)]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

idtype!(SubjectName);

/// Identifies a question as `Q<n>` with `n >= 1`. Ordering is numeric, so
/// `Q2` sorts before `Q10`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuestionId(u32);

impl QuestionId {
    pub fn new(number: u32) -> Option<Self> {
        if number == 0 {
            None
        } else {
            Some(Self(number))
        }
    }

    /// The 1-based question number.
    pub fn number(&self) -> u32 {
        self.0
    }
}

impl Display for QuestionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Q{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidQuestionId(pub String);

impl Display for InvalidQuestionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid question id {:?}, expected Q<n> with n >= 1", self.0)
    }
}

impl std::error::Error for InvalidQuestionId {}

impl FromStr for QuestionId {
    type Err = InvalidQuestionId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix('Q')
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse::<u32>().ok())
            .and_then(QuestionId::new)
            .ok_or_else(|| InvalidQuestionId(s.to_string()))
    }
}

impl<'de> Deserialize<'de> for QuestionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for QuestionId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

pub const MAX_OPTIONS_PER_QUESTION: u8 = 26;

/// Number of answer options (bubbles) per question, `A` through at most `Z`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct OptionCount(u8);

impl OptionCount {
    pub fn new(count: u8) -> Option<Self> {
        if (1..=MAX_OPTIONS_PER_QUESTION).contains(&count) {
            Some(Self(count))
        } else {
            None
        }
    }

    pub fn get(&self) -> usize {
        self.0 as usize
    }

    /// The option letter at the given left-to-right position.
    pub fn letter(&self, index: usize) -> Option<char> {
        if index < self.get() {
            Some(char::from(b'A' + index as u8))
        } else {
            None
        }
    }
}

impl Default for OptionCount {
    fn default() -> Self {
        Self(4)
    }
}
