//! Question bank loading, validation, and shuffling
//!
//! A bank is an immutable, pre-shuffled sequence of multiple-choice
//! questions, fixed for the lifetime of one session. Questions are
//! validated when the bank is built and never change afterwards; the
//! shuffle happens exactly once, at construction.

use garde::Validate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::question::OPTION_COUNT;

/// A single multiple-choice question
///
/// Each question carries a prompt, exactly four answer options, and the
/// index of the correct option.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Question {
    /// The question prompt shown to players
    #[garde(length(max = crate::constants::question::MAX_PROMPT_LENGTH))]
    prompt: String,
    /// The answer options, in display order
    #[garde(
        length(min = OPTION_COUNT, max = OPTION_COUNT),
        inner(length(max = crate::constants::question::MAX_OPTION_LENGTH))
    )]
    options: Vec<String>,
    /// Index of the correct option
    #[garde(range(max = OPTION_COUNT - 1))]
    correct_index: usize,
}

impl Question {
    /// Creates a new question record
    ///
    /// The record is validated when it is handed to a [`QuestionBank`],
    /// not here.
    pub fn new(prompt: impl Into<String>, options: Vec<String>, correct_index: usize) -> Self {
        Self {
            prompt: prompt.into(),
            options,
            correct_index,
        }
    }

    /// Returns the question prompt
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Returns the answer options in display order
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Checks a chosen option index against the correct one
    pub fn is_correct(&self, chosen_index: usize) -> bool {
        self.correct_index == chosen_index
    }
}

/// Errors that can occur when building a question bank
#[derive(Error, Debug)]
pub enum Error {
    /// The bank holds more questions than the configured maximum
    #[error("question bank exceeds {} questions", crate::constants::question::MAX_BANK_SIZE)]
    TooManyQuestions,
    /// A question record failed validation
    #[error("invalid question: {0}")]
    InvalidQuestion(garde::Report),
}

/// An immutable, pre-shuffled sequence of questions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Builds a bank from the given questions, randomizing their order once
    ///
    /// # Errors
    ///
    /// Returns an error if the bank is oversized or any question record is
    /// invalid.
    pub fn shuffled(mut questions: Vec<Question>) -> Result<Self, Error> {
        fastrand::shuffle(&mut questions);
        Self::in_order(questions)
    }

    /// Builds a bank that keeps the given question order
    ///
    /// # Errors
    ///
    /// Returns an error if the bank is oversized or any question record is
    /// invalid.
    pub fn in_order(questions: Vec<Question>) -> Result<Self, Error> {
        if questions.len() > crate::constants::question::MAX_BANK_SIZE {
            return Err(Error::TooManyQuestions);
        }
        for question in &questions {
            question.validate().map_err(Error::InvalidQuestion)?;
        }
        Ok(Self { questions })
    }

    /// Builds the built-in general-knowledge bank, shuffled
    ///
    /// # Panics
    ///
    /// This method panics if the built-in set fails validation, which
    /// cannot happen.
    pub fn builtin() -> Self {
        let q = |prompt: &str, options: [&str; OPTION_COUNT], correct_index: usize| {
            Question::new(
                prompt,
                options.into_iter().map(str::to_owned).collect(),
                correct_index,
            )
        };

        Self::shuffled(vec![
            q(
                "What is the capital of France?",
                ["Paris", "London", "Berlin", "Madrid"],
                0,
            ),
            q("What is 5 + 7?", ["10", "11", "12", "13"], 2),
            q(
                "Who wrote 'Hamlet'?",
                ["Shakespeare", "Dickens", "Tolkien", "Rowling"],
                0,
            ),
            q(
                "What is the largest planet in our solar system?",
                ["Earth", "Mars", "Jupiter", "Saturn"],
                2,
            ),
            q(
                "Which country is home to the kangaroo?",
                ["South Africa", "Brazil", "Australia", "New Zealand"],
                2,
            ),
            q(
                "What is the chemical symbol for gold?",
                ["Go", "Gd", "Au", "Ag"],
                2,
            ),
            q(
                "In which year did World War II end?",
                ["1943", "1945", "1947", "1950"],
                1,
            ),
            q(
                "Which of these is not a primary color?",
                ["Red", "Blue", "Green", "Yellow"],
                3,
            ),
            q(
                "What is the capital of Japan?",
                ["Beijing", "Seoul", "Tokyo", "Bangkok"],
                2,
            ),
            q(
                "Which planet is known as the Red Planet?",
                ["Venus", "Mars", "Jupiter", "Saturn"],
                1,
            ),
        ])
        .expect("built-in questions are valid")
    }

    /// Returns the question at the given index, if any
    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Returns the number of questions in the bank
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Checks whether the bank contains no questions
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn capital_question() -> Question {
        Question::new(
            "What is the capital of France?",
            vec![
                "Paris".to_owned(),
                "London".to_owned(),
                "Berlin".to_owned(),
                "Madrid".to_owned(),
            ],
            0,
        )
    }

    #[test]
    fn test_question_accessors() {
        let question = capital_question();
        assert_eq!(question.prompt(), "What is the capital of France?");
        assert_eq!(question.options().len(), 4);
        assert!(question.is_correct(0));
        assert!(!question.is_correct(1));
        assert!(!question.is_correct(17));
    }

    #[test]
    fn test_question_validation() {
        assert!(capital_question().validate().is_ok());
    }

    #[test]
    fn test_wrong_option_count_rejected() {
        let question = Question::new("Pick one", vec!["A".to_owned(), "B".to_owned()], 0);
        assert!(matches!(
            QuestionBank::in_order(vec![question]),
            Err(Error::InvalidQuestion(_))
        ));
    }

    #[test]
    fn test_out_of_range_correct_index_rejected() {
        let question = Question::new(
            "Pick one",
            vec!["A".to_owned(), "B".to_owned(), "C".to_owned(), "D".to_owned()],
            4,
        );
        assert!(matches!(
            QuestionBank::in_order(vec![question]),
            Err(Error::InvalidQuestion(_))
        ));
    }

    #[test]
    fn test_prompt_too_long_rejected() {
        let question = Question::new(
            "a".repeat(crate::constants::question::MAX_PROMPT_LENGTH + 1),
            vec!["A".to_owned(), "B".to_owned(), "C".to_owned(), "D".to_owned()],
            0,
        );
        assert!(matches!(
            QuestionBank::in_order(vec![question]),
            Err(Error::InvalidQuestion(_))
        ));
    }

    #[test]
    fn test_oversized_bank_rejected() {
        let questions = vec![capital_question(); crate::constants::question::MAX_BANK_SIZE + 1];
        assert!(matches!(
            QuestionBank::in_order(questions),
            Err(Error::TooManyQuestions)
        ));
    }

    #[test]
    fn test_in_order_keeps_order() {
        let mut questions = Vec::new();
        for i in 0..5 {
            questions.push(Question::new(
                format!("Question {i}"),
                vec!["A".to_owned(), "B".to_owned(), "C".to_owned(), "D".to_owned()],
                0,
            ));
        }
        let bank = QuestionBank::in_order(questions).unwrap();
        assert_eq!(bank.len(), 5);
        for i in 0..5 {
            assert_eq!(bank.get(i).unwrap().prompt(), format!("Question {i}"));
        }
        assert!(bank.get(5).is_none());
    }

    #[test]
    fn test_shuffled_keeps_every_question() {
        let mut questions = Vec::new();
        for i in 0..10 {
            questions.push(Question::new(
                format!("Question {i}"),
                vec!["A".to_owned(), "B".to_owned(), "C".to_owned(), "D".to_owned()],
                0,
            ));
        }
        let bank = QuestionBank::shuffled(questions).unwrap();
        assert_eq!(bank.len(), 10);

        let mut prompts: Vec<_> = (0..10)
            .map(|i| bank.get(i).unwrap().prompt().to_owned())
            .collect();
        prompts.sort();
        let expected: Vec<_> = (0..10).map(|i| format!("Question {i}")).collect();
        assert_eq!(prompts, expected);
    }

    #[test]
    fn test_builtin_bank() {
        let bank = QuestionBank::builtin();
        assert_eq!(bank.len(), 10);
        assert!(!bank.is_empty());
        for i in 0..bank.len() {
            assert!(bank.get(i).unwrap().validate().is_ok());
        }
    }

    #[test]
    fn test_empty_bank_allowed() {
        let bank = QuestionBank::in_order(Vec::new()).unwrap();
        assert!(bank.is_empty());
        assert_eq!(bank.len(), 0);
    }
}
