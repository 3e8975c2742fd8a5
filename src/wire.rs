//! Newline-delimited protocol records exchanged with clients
//!
//! Every message on the wire is a single JSON object on its own line,
//! tagged by a `type` field. Server events flow to every registered
//! player through the broadcaster; client messages arrive on each
//! connection's receive loop.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// Events sent from the server to clients
///
/// These are the only records the server ever emits. Each one is encoded
/// once per broadcast with [`ServerEvent::to_line`] and delivered to every
/// registered connection.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerEvent {
    /// A new question is open for answers
    Question {
        /// The question prompt
        question: String,
        /// The four answer options, in display order
        options: Vec<String>,
        /// 1-based number of this question
        question_num: usize,
        /// Total number of questions in the session
        total_questions: usize,
        /// Time limit for this question in seconds
        time_limit: u64,
    },
    /// Outcome of the current question
    Result {
        /// Name of the answering player; absent when the question timed out
        player: Option<String>,
        /// Whether the answer was correct; absent when the question timed out
        correct: Option<bool>,
        /// Whether the question was resolved by the deadline instead of an
        /// answer
        #[serde(default)]
        timeout: bool,
        /// Whether the server is about to move on to the next question
        move_next: bool,
    },
    /// The current score table
    Score {
        /// Mapping of player name to score
        scores: HashMap<String, i64>,
    },
    /// The session is over
    End {
        /// Name of the winning player, or a no-winner sentinel
        winner: String,
    },
    /// A chat line, either relayed from a player or originated by the server
    Chat {
        /// Sender's display name; `"Server"` for server notices
        name: String,
        /// The chat text
        msg: String,
    },
}

impl ServerEvent {
    /// Encodes the event as a single protocol line (without the trailing
    /// newline)
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which cannot happen for
    /// these record shapes with the default JSON serializer.
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Messages sent from clients to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// An answer submission for the currently open question
    Answer {
        /// The submitting player's display name
        name: String,
        /// Chosen option index, 0-based
        answer: usize,
    },
    /// A chat line to relay to every player
    Chat {
        /// The sender's display name
        name: String,
        /// The chat text
        msg: String,
    },
}

impl ClientMessage {
    /// Decodes one protocol line into a client message
    ///
    /// # Errors
    ///
    /// Returns the underlying JSON error when the line is not a valid
    /// client record; callers log and discard such lines without
    /// terminating the connection.
    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_question_event_field_names() {
        let event = ServerEvent::Question {
            question: "What is the capital of France?".to_owned(),
            options: vec![
                "Paris".to_owned(),
                "London".to_owned(),
                "Berlin".to_owned(),
                "Madrid".to_owned(),
            ],
            question_num: 1,
            total_questions: 10,
            time_limit: 20,
        };

        let value: serde_json::Value = serde_json::from_str(&event.to_line()).unwrap();
        assert_eq!(value["type"], "question");
        assert_eq!(value["question"], "What is the capital of France?");
        assert_eq!(value["options"][0], "Paris");
        assert_eq!(value["question_num"], 1);
        assert_eq!(value["total_questions"], 10);
        assert_eq!(value["time_limit"], 20);
    }

    #[test]
    fn test_answer_result_carries_player_and_correctness() {
        let event = ServerEvent::Result {
            player: Some("Ann".to_owned()),
            correct: Some(true),
            timeout: false,
            move_next: true,
        };

        let value: serde_json::Value = serde_json::from_str(&event.to_line()).unwrap();
        assert_eq!(value["type"], "result");
        assert_eq!(value["player"], "Ann");
        assert_eq!(value["correct"], true);
        assert_eq!(value["timeout"], false);
        assert_eq!(value["move_next"], true);
    }

    #[test]
    fn test_timeout_result_omits_player_and_correctness() {
        let event = ServerEvent::Result {
            player: None,
            correct: None,
            timeout: true,
            move_next: true,
        };

        let value: serde_json::Value = serde_json::from_str(&event.to_line()).unwrap();
        assert_eq!(value["type"], "result");
        assert_eq!(value["timeout"], true);
        assert!(value.get("player").is_none());
        assert!(value.get("correct").is_none());
    }

    #[test]
    fn test_score_event_mapping() {
        let event = ServerEvent::Score {
            scores: HashMap::from([("Ann".to_owned(), 1), ("Bo".to_owned(), -1)]),
        };

        let value: serde_json::Value = serde_json::from_str(&event.to_line()).unwrap();
        assert_eq!(value["type"], "score");
        assert_eq!(value["scores"]["Ann"], 1);
        assert_eq!(value["scores"]["Bo"], -1);
    }

    #[test]
    fn test_client_answer_parses() {
        let message = ClientMessage::from_line(r#"{"type": "answer", "name": "Ann", "answer": 0}"#)
            .unwrap();
        assert_eq!(
            message,
            ClientMessage::Answer {
                name: "Ann".to_owned(),
                answer: 0,
            }
        );
    }

    #[test]
    fn test_client_chat_round_trip() {
        let message = ClientMessage::Chat {
            name: "Bo".to_owned(),
            msg: "good luck".to_owned(),
        };
        let line = serde_json::to_string(&message).unwrap();
        assert_eq!(ClientMessage::from_line(&line).unwrap(), message);
    }

    #[test]
    fn test_malformed_line_is_an_error() {
        assert!(ClientMessage::from_line("not json").is_err());
        assert!(ClientMessage::from_line(r#"{"type": "launch"}"#).is_err());
        assert!(ClientMessage::from_line(r#"{"type": "answer", "name": "Ann"}"#).is_err());
    }

    #[test]
    fn test_server_event_decodes_from_its_own_line() {
        let event = ServerEvent::End {
            winner: "Ann".to_owned(),
        };
        let decoded: ServerEvent = serde_json::from_str(&event.to_line()).unwrap();
        assert_eq!(decoded, event);
    }
}
