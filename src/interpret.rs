use std::fmt::Display;
use std::path::{Path, PathBuf};

use image::ImageError;
use log::{info, warn};
use logging_timer::time;
use rayon::prelude::*;
use serde::Serialize;

use crate::annotate::annotate;
use crate::answer_key::AnswerKey;
use crate::bubbles::{detect_bubbles, BubbleRegion};
use crate::debug::{draw_bubbles_debug_image_mut, ImageDebugWriter};
use crate::image_utils::mask_to_rgb;
use crate::mapping::{map_answers, LowConfidenceWarning, MappedAnswers, StudentAnswers};
use crate::preprocess::{preprocess, PreprocessOptions};
use crate::scoring::{score, AnswerDetail, MarkingScheme, ScoreReport};
use crate::types::{BinaryMask, OptionCount, RawImage};

#[derive(Debug, Clone, Default)]
pub struct ScoringOptions {
    pub options_per_question: OptionCount,
    pub marking: MarkingScheme,
    pub preprocess: PreprocessOptions,
    /// Write annotated sheets into this directory.
    pub annotate_dir: Option<PathBuf>,
    /// Write intermediate images next to each input sheet.
    pub debug: bool,
}

/// Everything produced while scoring one sheet image.
#[derive(Debug, Clone)]
pub struct ScoredSheet {
    pub mask: BinaryMask,
    pub bubbles: Vec<BubbleRegion>,
    pub mapped: MappedAnswers,
    pub scores: ScoreReport,
    pub details: AnswerDetail,
}

/// The per-sheet record handed back to callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetResult {
    pub student_id: String,
    pub scores: ScoreReport,
    pub answers: StudentAnswers,
    pub details: AnswerDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_confidence: Option<LowConfidenceWarning>,
}

#[derive(Debug)]
pub enum ProcessingError {
    ImageOpenError(PathBuf, ImageError),
    NoAnswersDetected(PathBuf),
    ImageWriteError(PathBuf, ImageError),
}

impl Display for ProcessingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingError::ImageOpenError(path, e) => {
                write!(f, "could not read sheet image {}: {}", path.display(), e)
            }
            ProcessingError::NoAnswersDetected(path) => write!(
                f,
                "could not process {}: no answer bubbles were detected",
                path.display()
            ),
            ProcessingError::ImageWriteError(path, e) => {
                write!(f, "could not write annotated image {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ProcessingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProcessingError::ImageOpenError(_, e) | ProcessingError::ImageWriteError(_, e) => Some(e),
            ProcessingError::NoAnswersDetected(_) => None,
        }
    }
}

/// Runs preprocessing, bubble detection, answer mapping and scoring on an
/// in-memory sheet.
pub fn score_sheet(img: &RawImage, key: &AnswerKey, options: &ScoringOptions) -> ScoredSheet {
    score_sheet_with_debug(img, key, options, &ImageDebugWriter::disabled())
}

fn score_sheet_with_debug(
    img: &RawImage,
    key: &AnswerKey,
    options: &ScoringOptions,
    debug: &ImageDebugWriter,
) -> ScoredSheet {
    let flat_key = key.flatten();

    let mask = preprocess(img, &options.preprocess);
    debug.write_image("binary", || mask_to_rgb(&mask));

    let bubbles = detect_bubbles(&mask);
    debug.write("bubbles", |canvas| draw_bubbles_debug_image_mut(canvas, &bubbles));

    let mapped = map_answers(&bubbles, &mask, &flat_key, options.options_per_question);
    let (scores, details) = score(&mapped.answers, key, &options.marking);

    ScoredSheet {
        mask,
        bubbles,
        mapped,
        scores,
        details,
    }
}

/// The student id is the file name without its extension.
pub fn student_id_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[time]
/// Loads one sheet image from disk and scores it. Writes the annotated sheet
/// when `options.annotate_dir` is set.
pub fn score_sheet_file(
    path: &Path,
    key: &AnswerKey,
    options: &ScoringOptions,
) -> Result<SheetResult, ProcessingError> {
    let img = image::open(path)
        .map_err(|e| ProcessingError::ImageOpenError(path.to_path_buf(), e))?
        .into_rgb8();

    let debug = if options.debug {
        ImageDebugWriter::new(path.to_path_buf(), img.clone())
    } else {
        ImageDebugWriter::disabled()
    };

    let sheet = score_sheet_with_debug(&img, key, options, &debug);
    if sheet.mapped.answers.is_empty() {
        return Err(ProcessingError::NoAnswersDetected(path.to_path_buf()));
    }

    let student_id = student_id_from_path(path);

    if let Some(annotate_dir) = &options.annotate_dir {
        let annotated = annotate(
            &img,
            &sheet.bubbles,
            &sheet.details,
            &key.flatten(),
            options.options_per_question,
        );
        let annotated_path = annotate_dir.join(format!("{}_annotated.png", student_id));
        annotated
            .save(&annotated_path)
            .map_err(|e| ProcessingError::ImageWriteError(annotated_path.clone(), e))?;
        info!("wrote annotated sheet {}", annotated_path.display());
    }

    info!("{}: total {}", student_id, sheet.scores.total);

    Ok(SheetResult {
        student_id,
        scores: sheet.scores,
        answers: sheet.mapped.answers,
        details: sheet.details,
        low_confidence: sheet.mapped.low_confidence,
    })
}

/// Scores many sheet files in parallel, one sheet per worker. Results keep
/// the input order, and a sheet that fails does not affect the others.
pub fn score_sheet_files(
    paths: &[PathBuf],
    key: &AnswerKey,
    options: &ScoringOptions,
) -> Vec<(PathBuf, Result<SheetResult, ProcessingError>)> {
    paths
        .par_iter()
        .map(|path| {
            let result = score_sheet_file(path, key, options);
            if let Err(e) = &result {
                warn!("skipping sheet: {}", e);
            }
            (path.clone(), result)
        })
        .collect()
}
