//! Core session orchestration and state management
//!
//! This module contains the session state machine for one trivia game:
//! player admission and quorum tracking, the question/answer window,
//! timeout-driven advancement, score updates, and the chat relay.
//!
//! A [`Game`] is single-threaded by construction. Every entry point takes
//! `&mut self` and must be called with the session lock held (the runtime
//! module wraps the game in exactly one mutex), so the window-open check
//! and the window close always happen as one indivisible step. Timed
//! transitions are requested through a `schedule` callback and delivered
//! back via [`Game::receive_alarm`]; each alarm carries the question index
//! it was armed for and is checked against the current phase on receipt,
//! so a stale alarm is a no-op and no timer ever needs to be cancelled
//! in flight.

use std::{fmt::Debug, time::Duration};

use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::{
    bank::QuestionBank,
    constants::protocol,
    registry::{Id, Registry},
    scoreboard::Scoreboard,
    session::Tunnel,
    wire::{ClientMessage, ServerEvent},
};

/// Validation result type for duration validation
type ValidationResult = garde::Result;

/// Validates the per-question answer time limit
fn validate_time_limit(val: &Duration) -> ValidationResult {
    const MIN: u64 = crate::constants::session::MIN_TIME_LIMIT;
    const MAX: u64 = crate::constants::session::MAX_TIME_LIMIT;

    if (MIN..=MAX).contains(&val.as_secs()) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "time_limit is outside of the bounds [{MIN},{MAX}]",
        )))
    }
}

/// Configuration for one trivia session
#[serde_with::serde_as]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct Settings {
    /// Number of joined players required before the game starts
    #[garde(range(min = 1, max = crate::constants::session::MAX_PLAYER_COUNT))]
    required_players: usize,
    /// Time limit for answering each question
    #[garde(custom(|v, _| validate_time_limit(v)))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    time_limit: Duration,
    /// Delay between resolving one question and delivering the next
    #[garde(skip)]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pacing_delay: Duration,
}

impl Default for Settings {
    /// Two players, twenty seconds per question, one second of pacing
    fn default() -> Self {
        Self::new(
            crate::constants::session::DEFAULT_REQUIRED_PLAYERS,
            Duration::from_secs(crate::constants::session::DEFAULT_TIME_LIMIT),
        )
    }
}

impl Settings {
    /// Creates settings with the given quorum and time limit
    pub fn new(required_players: usize, time_limit: Duration) -> Self {
        Self {
            required_players,
            time_limit,
            pacing_delay: crate::constants::session::PACING_DELAY,
        }
    }

    /// Returns the player quorum required to start
    pub fn required_players(&self) -> usize {
        self.required_players
    }

    /// Returns the per-question time limit
    pub fn time_limit(&self) -> Duration {
        self.time_limit
    }

    /// Returns the delay between questions
    pub fn pacing_delay(&self) -> Duration {
        self.pacing_delay
    }
}

/// Represents the current phase of the session
///
/// The index in [`Phase::Question`] is monotonically non-decreasing;
/// reaching the length of the question bank is the unique condition for a
/// normal finish. `Over` is also reached when the player count drops below
/// quorum mid-game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Waiting for the required number of players to join
    Lobby,
    /// Question `index` is current; `accepting` is the answer window
    Question {
        /// 0-based index into the question bank
        index: usize,
        /// Whether an answer can still resolve this question
        accepting: bool,
    },
    /// The session has ended, normally or by quorum loss
    Over,
}

/// Timed transitions requested by the game and delivered back by the host
///
/// Each alarm names the question index it was armed for; `receive_alarm`
/// validates that index against the current phase, which makes delivery of
/// an outdated alarm harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// Deliver question `index` after the pacing delay
    Deliver {
        /// 0-based index of the question to deliver
        index: usize,
    },
    /// The answer window for question `index` has expired
    Deadline {
        /// 0-based index of the question that timed out
        index: usize,
    },
}

/// The session orchestrator for one trivia game
///
/// Owns the question bank, the player registry, and the score table, and
/// drives every transition between them. All network fan-out goes through
/// the registry's broadcaster; a failed delivery unregisters that player
/// mid-flow, which is why transitions re-check the phase after each
/// broadcast.
pub struct Game<T: Tunnel> {
    /// The pre-shuffled questions for this session
    bank: QuestionBank,
    /// Quorum and timing configuration
    settings: Settings,
    /// Registered player connections
    players: Registry<T>,
    /// Name-keyed score table
    scores: Scoreboard,
    /// Current phase of the session
    phase: Phase,
}

impl<T: Tunnel> Debug for Game<T> {
    /// Custom debug implementation that avoids requiring `T: Debug`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("phase", &self.phase)
            .field("players", &self.players.len())
            .finish_non_exhaustive()
    }
}

impl<T: Tunnel> Game<T> {
    /// Creates a new session in the lobby phase
    pub fn new(bank: QuestionBank, settings: Settings) -> Self {
        Self {
            bank,
            settings,
            players: Registry::new(),
            scores: Scoreboard::new(),
            phase: Phase::Lobby,
        }
    }

    /// Returns the current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the number of registered players
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Admits a player that completed the join handshake
    ///
    /// Registers the connection, creates its score entry, and announces
    /// the join. Once the quorum is reached while still in the lobby, the
    /// game starts: a starting notice goes out and delivery of the first
    /// question is scheduled after the pacing delay. The session starts at
    /// most once.
    ///
    /// Registering the same connection twice is a precondition violation;
    /// it is logged and the duplicate is dropped, never panicking.
    pub fn add_player<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        id: Id,
        name: String,
        tunnel: T,
        mut schedule: S,
    ) {
        if let Err(error) = self.players.register(id, name.clone(), tunnel) {
            log::error!("refusing connection {id} ({name}): {error}");
            return;
        }

        self.scores.enroll(&name);
        log::info!("{name} joined the game");
        self.server_notice(format!("{name} joined the game"));

        if self.phase == Phase::Lobby && self.players.len() >= self.settings.required_players() {
            self.start(&mut schedule);
        }
    }

    /// Removes a player and cleans up after it
    ///
    /// Drops the score entry, closes the tunnel, and announces the
    /// departure. If a question phase is active and the remaining player
    /// count falls below quorum, the session aborts: a no-winner end event
    /// is broadcast exactly once and no further questions are delivered.
    pub fn remove_player(&mut self, id: Id) {
        let Some(player) = self.players.unregister(id) else {
            log::debug!("ignoring removal of unknown connection {id}");
            return;
        };
        let (name, tunnel) = player.into_parts();
        tunnel.close();
        self.scores.forget(&name);

        log::info!("{name} disconnected");
        self.server_notice(format!("{name} left the game"));

        if matches!(self.phase, Phase::Question { .. })
            && self.players.len() < self.settings.required_players()
        {
            self.abort();
        }
    }

    /// Handles one decoded message from a player's receive loop
    pub fn receive_message<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        id: Id,
        message: ClientMessage,
        schedule: S,
    ) {
        if !self.players.contains(id) {
            log::debug!("discarding message from unregistered connection {id}");
            return;
        }

        match message {
            ClientMessage::Answer { name, answer } => {
                self.submit_answer(&name, answer, schedule);
            }
            // The chat relay is a stateless pass-through
            ClientMessage::Chat { name, msg } => {
                self.broadcast(&ServerEvent::Chat { name, msg });
            }
        }
    }

    /// Handles a fired alarm
    ///
    /// Only an alarm matching the current phase has any effect: a
    /// `Deliver` is honored while its question is pending delivery, a
    /// `Deadline` while its question is still accepting answers. Anything
    /// else is a leftover from a question that was already resolved.
    pub fn receive_alarm<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        message: AlarmMessage,
        schedule: S,
    ) {
        match message {
            AlarmMessage::Deliver { index }
                if self.phase
                    == (Phase::Question {
                        index,
                        accepting: false,
                    }) =>
            {
                self.deliver(index, schedule);
            }
            AlarmMessage::Deadline { index }
                if self.phase
                    == (Phase::Question {
                        index,
                        accepting: true,
                    }) =>
            {
                self.expire(index, schedule);
            }
            message => log::debug!("ignoring stale alarm {message:?}"),
        }
    }

    /// Starts question delivery once the lobby has a quorum
    fn start<S: FnMut(AlarmMessage, Duration)>(&mut self, schedule: &mut S) {
        log::info!(
            "{} players joined, starting the game",
            self.players.len()
        );
        self.server_notice("Game starting!".to_owned());

        // The starting notice itself can drop a dead connection below
        // quorum again.
        if self.phase != Phase::Lobby || self.players.len() < self.settings.required_players() {
            return;
        }

        self.phase = Phase::Question {
            index: 0,
            accepting: false,
        };
        schedule(
            AlarmMessage::Deliver { index: 0 },
            self.settings.pacing_delay(),
        );
    }

    /// Scores the first answer for the open question and moves on
    ///
    /// Closing the window is the first effect: only one answer per
    /// question is ever scored, and a later answer or the question's
    /// deadline finds the window already closed. The submitting player
    /// gains a point when correct and loses one otherwise; nobody else is
    /// affected.
    fn submit_answer<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        name: &str,
        chosen_index: usize,
        schedule: S,
    ) {
        let Phase::Question {
            index,
            accepting: true,
        } = self.phase
        else {
            log::debug!("discarding answer from {name}: no open question");
            return;
        };
        self.phase = Phase::Question {
            index,
            accepting: false,
        };

        log::info!("received answer from {name}");
        let correct = self
            .bank
            .get(index)
            .is_some_and(|question| question.is_correct(chosen_index));
        if !self.scores.award(name, if correct { 1 } else { -1 }) {
            log::warn!("answer from {name} matches no score entry");
        }

        self.broadcast(&ServerEvent::Result {
            player: Some(name.to_owned()),
            correct: Some(correct),
            timeout: false,
            move_next: true,
        });
        self.broadcast_scores();
        self.advance(schedule);
    }

    /// Resolves the open question as timed out
    ///
    /// Every currently registered player loses a point, including any who
    /// would have answered correctly had they been faster.
    fn expire<S: FnMut(AlarmMessage, Duration)>(&mut self, index: usize, schedule: S) {
        self.phase = Phase::Question {
            index,
            accepting: false,
        };

        log::info!("time's up, deducting a point from every player");
        self.scores.penalize_all();

        self.broadcast(&ServerEvent::Result {
            player: None,
            correct: None,
            timeout: true,
            move_next: true,
        });
        self.broadcast_scores();
        self.advance(schedule);
    }

    /// Moves to the next question after a resolution
    ///
    /// This is the single chokepoint shared by the answer and timeout
    /// paths. It only acts on a closed window, so a session that aborted
    /// while results were being broadcast stays put.
    fn advance<S: FnMut(AlarmMessage, Duration)>(&mut self, mut schedule: S) {
        let Phase::Question {
            index,
            accepting: false,
        } = self.phase
        else {
            return;
        };

        let next = index + 1;
        self.phase = Phase::Question {
            index: next,
            accepting: false,
        };
        schedule(
            AlarmMessage::Deliver { index: next },
            self.settings.pacing_delay(),
        );
    }

    /// Broadcasts a question and opens its answer window
    ///
    /// Reaching the end of the bank finishes the session instead. The
    /// window only opens if the question fan-out left the session intact.
    fn deliver<S: FnMut(AlarmMessage, Duration)>(&mut self, index: usize, mut schedule: S) {
        let Some(event) = self.question_event(index) else {
            self.finish();
            return;
        };

        self.broadcast(&event);
        if self.phase
            != (Phase::Question {
                index,
                accepting: false,
            })
        {
            return;
        }

        self.phase = Phase::Question {
            index,
            accepting: true,
        };
        schedule(
            AlarmMessage::Deadline { index },
            self.settings.time_limit(),
        );
    }

    /// Builds the wire payload for question `index`, if the bank still has
    /// one
    fn question_event(&self, index: usize) -> Option<ServerEvent> {
        let question = self.bank.get(index)?;
        Some(ServerEvent::Question {
            question: question.prompt().to_owned(),
            options: question.options().to_vec(),
            question_num: index + 1,
            total_questions: self.bank.len(),
            time_limit: self.settings.time_limit().as_secs(),
        })
    }

    /// Ends the session normally and names the winner
    fn finish(&mut self) {
        let winner = self
            .scores
            .winner()
            .unwrap_or_else(|| protocol::NO_PLAYERS.to_owned());
        log::info!("question bank exhausted, winner: {winner}");

        self.phase = Phase::Over;
        self.broadcast(&ServerEvent::End { winner });
    }

    /// Ends the session because the player count fell below quorum
    fn abort(&mut self) {
        log::info!("not enough players remain, ending the game");

        self.phase = Phase::Over;
        self.broadcast(&ServerEvent::End {
            winner: protocol::NO_WINNER.to_owned(),
        });
    }

    /// Broadcasts the current score table
    fn broadcast_scores(&mut self) {
        let scores = self.scores.table();
        self.broadcast(&ServerEvent::Score { scores });
    }

    /// Broadcasts a server-originated chat notice
    fn server_notice(&mut self, msg: String) {
        self.broadcast(&ServerEvent::Chat {
            name: protocol::SERVER_NAME.to_owned(),
            msg,
        });
    }

    /// Fans an event out to every player, unregistering the ones whose
    /// delivery failed
    ///
    /// Unregistration cascades through [`Game::remove_player`], so losing
    /// a connection here can itself abort the session.
    fn broadcast(&mut self, event: &ServerEvent) {
        for id in self.players.broadcast(event) {
            self.remove_player(id);
        }
    }
}
