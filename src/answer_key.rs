use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::types::{QuestionId, SubjectName};

/// Subject name reserved for the overall score in a `ScoreReport`.
pub const TOTAL_KEY: &str = "total";

/// The set of answers accepted for one question, e.g. `"B,C"` accepts either
/// `B` or `C`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedAnswers {
    raw: String,
    options: Vec<String>,
}

impl AcceptedAnswers {
    pub fn parse(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            options: raw.split(',').map(|s| s.trim().to_string()).collect(),
        }
    }

    pub fn contains(&self, answer: &str) -> bool {
        self.options.iter().any(|option| option == answer)
    }

    pub fn contains_letter(&self, letter: char) -> bool {
        let mut buf = [0u8; 4];
        self.contains(letter.encode_utf8(&mut buf))
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Serialize for AcceptedAnswers {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub name: SubjectName,
    pub questions: Vec<(QuestionId, AcceptedAnswers)>,
}

/// The answer key with subject grouping removed.
pub type FlatKey = BTreeMap<QuestionId, AcceptedAnswers>;

/// An answer key grouped by subject. Subject and question order follow the
/// source document.
///
/// Construction guarantees that question ids are unique across subjects,
/// that they run from `Q1` to `Qn` with no gaps, and that no subject uses
/// the reserved name `total`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerKey {
    subjects: Vec<Subject>,
}

#[derive(Debug)]
pub enum AnswerKeyError {
    Json(serde_json::Error),
    NotAnObject,
    SubjectNotAnObject {
        subject: String,
    },
    ReservedSubjectName,
    InvalidQuestionId {
        subject: String,
        question: String,
    },
    AnswerNotAString {
        subject: String,
        question: String,
    },
    DuplicateQuestionId {
        question: QuestionId,
        first_subject: SubjectName,
        second_subject: SubjectName,
    },
    MissingQuestion {
        question: QuestionId,
    },
}

impl Display for AnswerKeyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnswerKeyError::Json(e) => write!(f, "answer key is not valid JSON: {}", e),
            AnswerKeyError::NotAnObject => {
                write!(f, "answer key must map subject names to question maps")
            }
            AnswerKeyError::SubjectNotAnObject { subject } => {
                write!(f, "subject `{}` must map question ids to answers", subject)
            }
            AnswerKeyError::ReservedSubjectName => {
                write!(f, "subject name `{}` is reserved", TOTAL_KEY)
            }
            AnswerKeyError::InvalidQuestionId { subject, question } => write!(
                f,
                "subject `{}` has invalid question id `{}`, expected Q<n>",
                subject, question
            ),
            AnswerKeyError::AnswerNotAString { subject, question } => write!(
                f,
                "answer for `{}` in subject `{}` must be a string",
                question, subject
            ),
            AnswerKeyError::DuplicateQuestionId {
                question,
                first_subject,
                second_subject,
            } => write!(
                f,
                "question `{}` appears in both `{}` and `{}`",
                question, first_subject, second_subject
            ),
            AnswerKeyError::MissingQuestion { question } => {
                write!(f, "question `{}` is missing from the answer key", question)
            }
        }
    }
}

impl std::error::Error for AnswerKeyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AnswerKeyError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for AnswerKeyError {
    fn from(e: serde_json::Error) -> Self {
        AnswerKeyError::Json(e)
    }
}

impl AnswerKey {
    /// Builds a key from already-typed subjects, checking the id invariants.
    pub fn new(subjects: Vec<Subject>) -> Result<Self, AnswerKeyError> {
        let mut seen: HashMap<QuestionId, &SubjectName> = HashMap::new();
        for subject in &subjects {
            if subject.name.as_str() == TOTAL_KEY {
                return Err(AnswerKeyError::ReservedSubjectName);
            }
            for (question, _) in &subject.questions {
                if let Some(first_subject) = seen.insert(*question, &subject.name) {
                    return Err(AnswerKeyError::DuplicateQuestionId {
                        question: *question,
                        first_subject: first_subject.clone(),
                        second_subject: subject.name.clone(),
                    });
                }
            }
        }

        if let Some(question) = (1..=seen.len() as u32)
            .filter_map(QuestionId::new)
            .find(|question| !seen.contains_key(question))
        {
            return Err(AnswerKeyError::MissingQuestion { question });
        }

        Ok(Self { subjects })
    }

    pub fn from_json(json: &str) -> Result<Self, AnswerKeyError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Accepts the persisted shape `{subject: {questionId: "A[,B...]"}}`.
    pub fn from_value(value: &Value) -> Result<Self, AnswerKeyError> {
        let subjects = value.as_object().ok_or(AnswerKeyError::NotAnObject)?;
        let subjects = subjects
            .iter()
            .map(|(name, questions)| parse_subject(name, questions))
            .collect::<Result<Vec<Subject>, AnswerKeyError>>()?;
        Self::new(subjects)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(
            self.subjects
                .iter()
                .map(|subject| {
                    let questions = subject
                        .questions
                        .iter()
                        .map(|(id, answers)| (id.to_string(), Value::from(answers.as_str())))
                        .collect::<Map<String, Value>>();
                    (subject.name.to_string(), Value::Object(questions))
                })
                .collect(),
        )
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn question_count(&self) -> usize {
        self.subjects.iter().map(|s| s.questions.len()).sum()
    }

    pub fn flatten(&self) -> FlatKey {
        self.subjects
            .iter()
            .flat_map(|subject| subject.questions.iter().cloned())
            .collect()
    }
}

impl Serialize for AnswerKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_value().serialize(serializer)
    }
}

fn parse_subject(name: &str, questions: &Value) -> Result<Subject, AnswerKeyError> {
    let questions = questions
        .as_object()
        .ok_or_else(|| AnswerKeyError::SubjectNotAnObject {
            subject: name.to_string(),
        })?;

    let questions = questions
        .iter()
        .map(|(id, answer)| {
            let question = id
                .parse::<QuestionId>()
                .map_err(|_| AnswerKeyError::InvalidQuestionId {
                    subject: name.to_string(),
                    question: id.clone(),
                })?;
            let answer = answer
                .as_str()
                .ok_or_else(|| AnswerKeyError::AnswerNotAString {
                    subject: name.to_string(),
                    question: id.clone(),
                })?;
            Ok((question, AcceptedAnswers::parse(answer)))
        })
        .collect::<Result<Vec<_>, AnswerKeyError>>()?;

    Ok(Subject {
        name: SubjectName::from(name),
        questions,
    })
}
