//! Scores optical-mark-recognition answer sheets.
//!
//! A sheet goes through [`preprocess`], [`detect_bubbles`], [`map_answers`]
//! and [`score`], each a plain function over explicit inputs. [`annotate`]
//! renders the result back onto the sheet for review.
//!
//! ```no_run
//! use omr_scorer::{
//!     annotate, detect_bubbles, map_answers, preprocess, score, AnswerKey, MarkingScheme,
//!     OptionCount, PreprocessOptions,
//! };
//!
//! let key = AnswerKey::from_json(r#"{"physics": {"Q1": "A", "Q2": "B,C"}}"#).unwrap();
//! let sheet = image::open("sheet.jpg").unwrap().into_rgb8();
//!
//! let mask = preprocess(&sheet, &PreprocessOptions::default());
//! let bubbles = detect_bubbles(&mask);
//! let mapped = map_answers(&bubbles, &mask, &key.flatten(), OptionCount::default());
//! let (scores, details) = score(&mapped.answers, &key, &MarkingScheme::new(1.0, -0.25).unwrap());
//! let annotated = annotate(&sheet, &bubbles, &details, &key.flatten(), OptionCount::default());
//! # let _ = (scores, annotated);
//! ```

pub mod annotate;
pub mod answer_key;
pub mod bubbles;
pub mod debug;
pub mod geometry;
pub mod image_utils;
pub mod interpret;
pub mod mapping;
pub mod preprocess;
pub mod scoring;
pub mod store;
pub mod types;

pub use annotate::annotate;
pub use answer_key::{AcceptedAnswers, AnswerKey, AnswerKeyError, FlatKey, Subject};
pub use bubbles::{detect_bubbles, detect_bubbles_with_filter, BubbleFilter, BubbleRegion};
pub use interpret::{
    score_sheet, score_sheet_file, score_sheet_files, ProcessingError, ScoredSheet, ScoringOptions,
    SheetResult,
};
pub use mapping::{map_answers, Answer, LowConfidenceWarning, MappedAnswers, StudentAnswers};
pub use preprocess::{preprocess, PreprocessOptions};
pub use scoring::{score, AnswerDetail, AnswerStatus, MarkingScheme, MarkingSchemeError, ScoreReport};
pub use store::{AnswerKeyStore, DirectoryKeyStore, StoreError};
pub use types::{BinaryMask, OptionCount, QuestionId, RawImage, SubjectName};
