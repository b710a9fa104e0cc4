// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, span, warn, Instrument, Level};

use crate::keys::KeyEvent;
use crate::player::Player;

/// How long one read may block before the loop re-checks for shutdown. The
/// wait for the next event line is the only thing allowed to block the loop.
const IDLE_TIMEOUT: Duration = Duration::from_millis(250);

/// Reads key events off the event stream and feeds them to the player in
/// arrival order.
pub struct Controller {
    handle: JoinHandle<()>,
}

impl Controller {
    /// Creates a new controller reading from the given event stream,
    /// typically stdin with the keyboard listener piped in.
    pub fn new<R>(player: Arc<Player>, reader: R) -> Controller
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let span = span!(Level::INFO, "controller");
        Controller {
            handle: tokio::spawn(Controller::read_events(player, reader).instrument(span)),
        }
    }

    /// Join will block until the event stream ends or the player shuts down.
    pub async fn join(&mut self) -> Result<(), JoinError> {
        (&mut self.handle).await
    }

    async fn read_events<R>(player: Arc<Player>, reader: R)
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let mut lines = BufReader::new(reader).lines();
        loop {
            if player.is_stopping() {
                info!("Controller closing.");
                return;
            }

            let line = match tokio::time::timeout(IDLE_TIMEOUT, lines.next_line()).await {
                // Idle: no input within the timeout, go re-check shutdown.
                Err(_) => continue,
                Ok(Ok(Some(line))) => line,
                Ok(Ok(None)) => {
                    info!("Event stream ended.");
                    return;
                }
                Ok(Err(e)) => {
                    warn!(err = %e, "Error reading event stream.");
                    return;
                }
            };

            match KeyEvent::parse(&line) {
                Some(event) => player.dispatch(event),
                None => debug!(line, "Skipping malformed event line."),
            }
        }
    }
}
