//! Tokio-backed session runtime
//!
//! This module supplies the concurrency shell around [`Game`]: one worker
//! task per client connection, a writer task per connection, and timer
//! tasks for the question alarms. All of them funnel into a single mutex
//! around the game state, so registration, answer submission, timeout
//! firing, and advancement are serialized with each other; the lock is
//! never held across I/O or sleeps.
//!
//! Accepting connections stays outside this crate. Whatever owns the
//! listening socket hands each accepted stream to [`Session::handle`].

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    sync::mpsc,
};

use crate::{
    bank::QuestionBank,
    game::{AlarmMessage, Game, Phase, Settings},
    registry::Id,
    session::{Closed, Tunnel},
    wire::ClientMessage,
};

/// Tunnel implementation backed by a per-connection writer task
///
/// Sending only enqueues the line, so it never blocks the session lock;
/// the writer task drains the queue onto the socket. Once the writer is
/// gone (socket error or shutdown), sends fail and the broadcaster
/// unregisters the player.
#[derive(Debug, Clone)]
struct LineTunnel {
    tx: mpsc::UnboundedSender<String>,
}

impl Tunnel for LineTunnel {
    fn send(&self, line: &str) -> Result<(), Closed> {
        self.tx.send(line.to_owned()).map_err(|_| Closed)
    }

    // Dropping the sender lets the writer task drain and exit, which
    // releases the write half of the connection.
    fn close(self) {}
}

/// One live trivia session shared by all of its connection workers
///
/// Cloning is cheap; every clone drives the same game behind the same
/// lock. The accept loop stays outside this crate:
///
/// ```no_run
/// use quizcast::{bank::QuestionBank, game::Settings, runtime::Session};
///
/// # async fn serve() -> std::io::Result<()> {
/// let session = Session::new(QuestionBank::builtin(), Settings::default());
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:12345").await?;
/// loop {
///     let (stream, _) = listener.accept().await?;
///     let session = session.clone();
///     tokio::spawn(async move { session.handle(stream).await });
/// }
/// # }
/// ```
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

struct Shared {
    game: Mutex<Game<LineTunnel>>,
}

impl Session {
    /// Creates a session over the given bank and settings
    pub fn new(bank: QuestionBank, settings: Settings) -> Self {
        Self {
            shared: Arc::new(Shared {
                game: Mutex::new(Game::new(bank, settings)),
            }),
        }
    }

    /// Returns the session's current phase
    pub fn phase(&self) -> Phase {
        self.lock().phase()
    }

    /// Returns the number of registered players
    pub fn player_count(&self) -> usize {
        self.lock().player_count()
    }

    /// Runs one client connection to completion
    ///
    /// The first line received is the join handshake carrying the display
    /// name; an empty line yields an unnamed identity, and a connection
    /// that closes before sending it is dropped without ever being
    /// registered. After the handshake, every line is decoded as a client
    /// record and dispatched under the session lock; malformed lines are
    /// logged and discarded without terminating the connection. When the
    /// stream ends, the player is removed and the usual departure cascade
    /// runs.
    pub async fn handle<S>(&self, stream: S)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let (tx, rx) = mpsc::unbounded_channel();
        let writer_task = tokio::spawn(pump_lines(writer, rx));
        let mut lines = BufReader::new(reader).lines();

        let name = match lines.next_line().await {
            Ok(Some(line)) => clean_name(&line),
            Ok(None) => {
                drop(tx);
                let _ = writer_task.await;
                return;
            }
            Err(error) => {
                log::warn!("join handshake failed: {error}");
                drop(tx);
                let _ = writer_task.await;
                return;
            }
        };

        let id = Id::new();
        self.lock()
            .add_player(id, name, LineTunnel { tx }, self.scheduler());

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match ClientMessage::from_line(line) {
                        Ok(message) => {
                            self.lock().receive_message(id, message, self.scheduler());
                        }
                        Err(error) => {
                            log::warn!("discarding malformed record on {id}: {error}");
                        }
                    }
                }
                Ok(None) => break,
                Err(error) => {
                    log::warn!("receive failed on {id}: {error}");
                    break;
                }
            }
        }

        self.lock().remove_player(id);
        let _ = writer_task.await;
    }

    /// Builds the schedule callback handed to the game: each request
    /// becomes a timer task that sleeps and then re-enters the lock with
    /// the alarm
    fn scheduler(&self) -> impl FnMut(AlarmMessage, Duration) {
        let shared = Arc::clone(&self.shared);
        move |message, after| schedule_alarm(&shared, message, after)
    }

    fn lock(&self) -> MutexGuard<'_, Game<LineTunnel>> {
        lock_game(&self.shared)
    }
}

fn lock_game(shared: &Arc<Shared>) -> MutexGuard<'_, Game<LineTunnel>> {
    shared.game.lock().expect("session state lock poisoned")
}

/// Arms one alarm; the game decides on receipt whether it is still
/// current, so a timer that lost its race fires into a no-op
fn schedule_alarm(shared: &Arc<Shared>, message: AlarmMessage, after: Duration) {
    let shared = Arc::clone(shared);
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        let chained = Arc::clone(&shared);
        lock_game(&shared).receive_alarm(message, move |message, after| {
            schedule_alarm(&chained, message, after);
        });
    });
}

/// Drains queued protocol lines onto the socket, one line per record
async fn pump_lines<W>(mut sink: W, mut source: mpsc::UnboundedReceiver<String>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(mut line) = source.recv().await {
        line.push('\n');
        if let Err(error) = sink.write_all(line.as_bytes()).await {
            log::debug!("writer stopped: {error}");
            break;
        }
    }
}

/// Normalizes a handshake line into a display name
fn clean_name(line: &str) -> String {
    line.trim()
        .chars()
        .take(crate::constants::player::MAX_NAME_LENGTH)
        .collect()
}
