use std::collections::BTreeMap;
use std::fmt::Display;

use log::debug;
use logging_timer::time;
use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::{
    answer_key::{AcceptedAnswers, AnswerKey, TOTAL_KEY},
    mapping::{Answer, StudentAnswers},
    types::{QuestionId, SubjectName},
};

/// Marks awarded for a correct answer and added for an incorrect one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkingScheme {
    correct: f64,
    incorrect: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarkingSchemeError {
    NegativeCorrectMarks(f64),
    PositiveIncorrectMarks(f64),
}

impl Display for MarkingSchemeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarkingSchemeError::NegativeCorrectMarks(marks) => {
                write!(f, "marks for a correct answer must be >= 0, got {}", marks)
            }
            MarkingSchemeError::PositiveIncorrectMarks(marks) => {
                write!(f, "marks for an incorrect answer must be <= 0, got {}", marks)
            }
        }
    }
}

impl std::error::Error for MarkingSchemeError {}

impl MarkingScheme {
    /// `incorrect` is a penalty expressed as a non-positive number that is
    /// added to the subject score as is.
    pub fn new(correct: f64, incorrect: f64) -> Result<Self, MarkingSchemeError> {
        if correct.is_nan() || correct < 0.0 {
            return Err(MarkingSchemeError::NegativeCorrectMarks(correct));
        }
        if incorrect.is_nan() || incorrect > 0.0 {
            return Err(MarkingSchemeError::PositiveIncorrectMarks(incorrect));
        }
        Ok(Self { correct, incorrect })
    }

    pub fn correct(&self) -> f64 {
        self.correct
    }

    pub fn incorrect(&self) -> f64 {
        self.incorrect
    }
}

impl Default for MarkingScheme {
    fn default() -> Self {
        Self {
            correct: 1.0,
            incorrect: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerStatus {
    Correct,
    Incorrect,
    Unanswered,
}

pub type AnswerDetail = BTreeMap<QuestionId, AnswerStatus>;

/// Per-subject scores in key order plus their total. Serializes as a single
/// map with the total under the reserved `total` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreReport {
    pub subjects: Vec<(SubjectName, f64)>,
    pub total: f64,
}

impl ScoreReport {
    pub fn subject(&self, name: &str) -> Option<f64> {
        self.subjects
            .iter()
            .find(|(subject, _)| subject.as_str() == name)
            .map(|(_, score)| *score)
    }
}

impl Serialize for ScoreReport {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.subjects.len() + 1))?;
        for (subject, score) in &self.subjects {
            map.serialize_entry(subject.as_str(), score)?;
        }
        map.serialize_entry(TOTAL_KEY, &self.total)?;
        map.end()
    }
}

/// Classifies one answer against the accepted set for its question.
/// Multi-mark answers never match, since accepted options hold one letter.
pub fn classify(answer: &Answer, accepted: &AcceptedAnswers) -> AnswerStatus {
    match answer {
        Answer::Unanswered => AnswerStatus::Unanswered,
        Answer::Single(letter) if accepted.contains_letter(*letter) => AnswerStatus::Correct,
        _ => AnswerStatus::Incorrect,
    }
}

#[time]
/// Scores the answers against every question in the key, subject by subject.
pub fn score(
    answers: &StudentAnswers,
    key: &AnswerKey,
    marking: &MarkingScheme,
) -> (ScoreReport, AnswerDetail) {
    let mut details = AnswerDetail::new();
    let mut subjects = Vec::with_capacity(key.subjects().len());

    for subject in key.subjects() {
        let mut subject_score = 0.0;
        for (question, accepted) in &subject.questions {
            let status = classify(answers.get(question), accepted);
            subject_score += match status {
                AnswerStatus::Correct => marking.correct(),
                AnswerStatus::Incorrect => marking.incorrect(),
                AnswerStatus::Unanswered => 0.0,
            };
            details.insert(*question, status);
        }
        debug!("{}: {}", subject.name, subject_score);
        subjects.push((subject.name.clone(), subject_score));
    }

    let total = subjects.iter().map(|(_, score)| score).sum();
    (ScoreReport { subjects, total }, details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn q(n: u32) -> QuestionId {
        QuestionId::new(n).unwrap()
    }

    fn answers(pairs: &[(u32, &str)]) -> StudentAnswers {
        pairs
            .iter()
            .map(|(n, answer)| (q(*n), answer.parse::<Answer>().unwrap()))
            .collect()
    }

    fn scenario_key() -> AnswerKey {
        AnswerKey::from_json(r#"{"s1":{"Q1":"A","Q2":"B,C"}}"#).unwrap()
    }

    #[test]
    fn test_multi_answer_key_accepts_either_letter() {
        let marking = MarkingScheme::new(1.0, -0.25).unwrap();
        let (report, details) = score(&answers(&[(1, "A"), (2, "C")]), &scenario_key(), &marking);

        assert_eq!(report.subject("s1"), Some(2.0));
        assert_eq!(report.total, 2.0);
        assert_eq!(details[&q(1)], AnswerStatus::Correct);
        assert_eq!(details[&q(2)], AnswerStatus::Correct);
        assert_eq!(
            serde_json::to_string(&report).unwrap(),
            r#"{"s1":2.0,"total":2.0}"#
        );
        assert_eq!(
            serde_json::to_string(&details).unwrap(),
            r#"{"Q1":"correct","Q2":"correct"}"#
        );
    }

    #[test]
    fn test_incorrect_penalty_and_unanswered() {
        let marking = MarkingScheme::new(1.0, -0.25).unwrap();
        let (report, details) = score(&answers(&[(1, "B"), (2, "-")]), &scenario_key(), &marking);

        assert_eq!(report.subject("s1"), Some(-0.25));
        assert_eq!(report.total, -0.25);
        assert_eq!(details[&q(1)], AnswerStatus::Incorrect);
        assert_eq!(details[&q(2)], AnswerStatus::Unanswered);
    }

    #[test]
    fn test_missing_answers_are_unanswered() {
        let marking = MarkingScheme::new(2.0, -1.0).unwrap();
        let (report, details) = score(&StudentAnswers::new(), &scenario_key(), &marking);
        assert_eq!(report.total, 0.0);
        assert_eq!(details.len(), 2);
        assert!(details.values().all(|s| *s == AnswerStatus::Unanswered));
    }

    #[test]
    fn test_multi_mark_answer_is_incorrect() {
        let marking = MarkingScheme::new(1.0, -0.5).unwrap();
        let (report, details) =
            score(&answers(&[(1, "A"), (2, "B,C")]), &scenario_key(), &marking);
        assert_eq!(details[&q(2)], AnswerStatus::Incorrect);
        assert_eq!(report.total, 0.5);
    }

    #[test]
    fn test_subjects_keep_key_order() {
        let key = AnswerKey::from_json(r#"{"zoology":{"Q1":"A"},"art":{"Q2":"B"}}"#).unwrap();
        let (report, _) = score(&answers(&[(1, "A"), (2, "B")]), &key, &MarkingScheme::default());
        assert_eq!(
            serde_json::to_string(&report).unwrap(),
            r#"{"zoology":1.0,"art":1.0,"total":2.0}"#
        );
    }

    #[test]
    fn test_marking_scheme_validation() {
        assert!(MarkingScheme::new(0.0, 0.0).is_ok());
        assert_eq!(
            MarkingScheme::new(-1.0, 0.0),
            Err(MarkingSchemeError::NegativeCorrectMarks(-1.0))
        );
        assert_eq!(
            MarkingScheme::new(1.0, 0.25),
            Err(MarkingSchemeError::PositiveIncorrectMarks(0.25))
        );
        assert!(MarkingScheme::new(f64::NAN, 0.0).is_err());
    }

    fn arb_answer() -> impl Strategy<Value = Answer> {
        prop_oneof![
            Just(Answer::Unanswered),
            prop::sample::select(vec!['A', 'B', 'C', 'D']).prop_map(Answer::Single),
            prop::sample::subsequence(vec!['A', 'B', 'C', 'D'], 2..=4).prop_map(Answer::Multiple),
        ]
    }

    fn arb_key_and_answers() -> impl Strategy<Value = (AnswerKey, StudentAnswers)> {
        (1usize..4, 1usize..6)
            .prop_flat_map(|(subjects, per_subject)| {
                let count = subjects * per_subject;
                (
                    Just((subjects, per_subject)),
                    prop::collection::vec(prop::sample::select(vec!["A", "B", "C", "D", "A,C"]), count),
                    prop::collection::vec(prop::option::of(arb_answer()), count),
                )
            })
            .prop_map(|((subjects, per_subject), key_answers, student)| {
                let json = (0..subjects)
                    .map(|s| {
                        let questions = (0..per_subject)
                            .map(|i| {
                                let n = s * per_subject + i;
                                format!("\"Q{}\":\"{}\"", n + 1, key_answers[n])
                            })
                            .collect::<Vec<_>>()
                            .join(",");
                        format!("\"subject{}\":{{{}}}", s, questions)
                    })
                    .collect::<Vec<_>>()
                    .join(",");
                let key = AnswerKey::from_json(&format!("{{{}}}", json)).unwrap();
                let answers: StudentAnswers = student
                    .into_iter()
                    .enumerate()
                    .filter_map(|(n, answer)| Some((q(n as u32 + 1), answer?)))
                    .collect();
                (key, answers)
            })
    }

    proptest! {
        #[test]
        fn prop_total_is_sum_of_subjects(
            (key, answers) in arb_key_and_answers(),
            correct in 0.0f64..4.0,
            incorrect in -2.0f64..=0.0,
        ) {
            let marking = MarkingScheme::new(correct, incorrect).unwrap();
            let (report, details) = score(&answers, &key, &marking);

            let sum: f64 = report.subjects.iter().map(|(_, s)| s).sum();
            prop_assert!((report.total - sum).abs() < 1e-9);
            prop_assert_eq!(details.len(), key.question_count());

            // unanswered questions contribute nothing
            for subject in key.subjects() {
                let expected: f64 = subject
                    .questions
                    .iter()
                    .map(|(question, _)| match details[question] {
                        AnswerStatus::Correct => correct,
                        AnswerStatus::Incorrect => incorrect,
                        AnswerStatus::Unanswered => 0.0,
                    })
                    .sum();
                let actual = report.subject(subject.name.as_str()).unwrap();
                prop_assert!((actual - expected).abs() < 1e-9);
            }
        }

        #[test]
        fn prop_answering_the_key_scores_every_question(
            letters in prop::collection::vec(prop::sample::select(vec!['A', 'B', 'C', 'D']), 1..30)
        ) {
            let json = letters
                .iter()
                .enumerate()
                .map(|(i, letter)| format!("\"Q{}\":\"{}\"", i + 1, letter))
                .collect::<Vec<_>>()
                .join(",");
            let key = AnswerKey::from_json(&format!("{{\"all\":{{{}}}}}", json)).unwrap();
            let answers = key
                .flatten()
                .iter()
                .map(|(question, accepted)| (*question, accepted.as_str().parse::<Answer>().unwrap()))
                .collect::<StudentAnswers>();

            let marking = MarkingScheme::new(1.0, 0.0).unwrap();
            let (report, _) = score(&answers, &key, &marking);
            prop_assert_eq!(report.total, letters.len() as f64);
        }
    }
}
