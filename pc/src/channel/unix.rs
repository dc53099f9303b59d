//! Unix Domain Socket action channel
//!
//! Discovery opens a short-lived connection per probe. A goal gets its own
//! connection which stays open for as long as the service streams feedback.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::BufReader;
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tracing::{debug, info};

use super::frame::{read_frame, write_frame};
use super::{ActionChannel, GoalStream, get_socket_path};
use crate::error::PlanClientError;
use crate::protocol::{ClientMessage, PlanRequest, ServiceMessage};

/// Default timeout for a single I/O step
const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Default delay between discovery probes
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Action channel over a Unix Domain Socket
#[derive(Debug, Clone)]
pub struct UnixActionChannel {
    socket_path: PathBuf,
    io_timeout: Duration,
    poll_interval: Duration,
}

impl Default for UnixActionChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl UnixActionChannel {
    /// Create a channel with the default socket path
    pub fn new() -> Self {
        Self::with_socket_path(get_socket_path())
    }

    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            io_timeout: DEFAULT_IO_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set a custom I/O timeout
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Set the delay between discovery probes
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Check if the service socket exists
    pub fn socket_exists(&self) -> bool {
        self.socket_path.exists()
    }

    /// Probe the service once and return its version
    pub async fn ping(&self) -> Result<String, PlanClientError> {
        debug!(?self.socket_path, "UnixActionChannel::ping: probing service");
        let (mut reader, mut writer) = self.connect().await?;

        self.bounded(write_frame(&mut writer, &ClientMessage::Ping)).await?;
        let response: Option<ServiceMessage> = self.bounded(read_frame(&mut reader)).await?;

        match response {
            Some(ServiceMessage::Pong { version }) => Ok(version),
            Some(ServiceMessage::Error { message }) => Err(PlanClientError::Protocol(format!(
                "Service error: {}",
                message
            ))),
            Some(other) => Err(PlanClientError::Protocol(format!(
                "Unexpected response to Ping: {}",
                other.kind()
            ))),
            None => Err(PlanClientError::ConnectionClosed),
        }
    }

    async fn connect(&self) -> Result<(BufReader<OwnedReadHalf>, OwnedWriteHalf), PlanClientError> {
        let stream = self
            .bounded(async { UnixStream::connect(&self.socket_path).await.map_err(PlanClientError::from) })
            .await?;
        let (read_half, write_half) = stream.into_split();
        Ok((BufReader::new(read_half), write_half))
    }

    async fn bounded<F, T>(&self, fut: F) -> Result<T, PlanClientError>
    where
        F: Future<Output = Result<T, PlanClientError>>,
    {
        tokio::time::timeout(self.io_timeout, fut)
            .await
            .map_err(|_| PlanClientError::Timeout(self.io_timeout))?
    }
}

#[async_trait]
impl ActionChannel for UnixActionChannel {
    async fn wait_for_server(&self, timeout: Option<Duration>) -> Result<(), PlanClientError> {
        debug!(?self.socket_path, ?timeout, "UnixActionChannel::wait_for_server: called");
        let started = Instant::now();

        let unavailable = |waited: Duration| PlanClientError::ChannelUnavailable {
            socket: self.socket_path.clone(),
            waited,
        };

        loop {
            // A probe never outlives the discovery deadline, even against a silent peer
            let probe = match timeout {
                Some(limit) => {
                    let remaining = limit.saturating_sub(started.elapsed());
                    if remaining.is_zero() {
                        return Err(unavailable(started.elapsed()));
                    }
                    tokio::time::timeout(remaining, self.ping())
                        .await
                        .unwrap_or(Err(PlanClientError::Timeout(remaining)))
                }
                None => self.ping().await,
            };

            match probe {
                Ok(version) => {
                    info!(%version, waited = ?started.elapsed(), "Planning service is ready");
                    return Ok(());
                }
                Err(e) => {
                    debug!(error = %e, "UnixActionChannel::wait_for_server: service not ready");
                }
            }

            let mut delay = self.poll_interval;
            if let Some(limit) = timeout {
                let waited = started.elapsed();
                if waited >= limit {
                    return Err(unavailable(waited));
                }
                delay = delay.min(limit - waited);
            }
            tokio::time::sleep(delay).await;
        }
    }

    async fn send_goal(&self, goal_id: &str, request: &PlanRequest) -> Result<Box<dyn GoalStream>, PlanClientError> {
        debug!(%goal_id, ?request, "UnixActionChannel::send_goal: called");
        let (reader, mut writer) = self.connect().await?;

        let msg = ClientMessage::SendGoal {
            goal_id: goal_id.to_string(),
            goal: request.clone(),
        };
        self.bounded(write_frame(&mut writer, &msg)).await?;
        info!(%goal_id, domain = request.domain(), problem = request.problem(), "Goal sent");

        Ok(Box::new(UnixGoalStream {
            goal_id: goal_id.to_string(),
            reader,
            writer,
            io_timeout: self.io_timeout,
        }))
    }
}

/// Goal stream over a dedicated socket connection
#[derive(Debug)]
pub struct UnixGoalStream {
    goal_id: String,
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    io_timeout: Duration,
}

#[async_trait]
impl GoalStream for UnixGoalStream {
    async fn next_message(&mut self) -> Result<Option<ServiceMessage>, PlanClientError> {
        // Plan computation is unbounded, so reads are not timed out here
        let msg: Option<ServiceMessage> = read_frame(&mut self.reader).await?;
        if let Some(msg) = &msg {
            debug!(goal_id = %self.goal_id, kind = msg.kind(), "UnixGoalStream::next_message: received");
        }
        Ok(msg)
    }

    async fn cancel(&mut self) -> Result<(), PlanClientError> {
        debug!(goal_id = %self.goal_id, "UnixGoalStream::cancel: called");
        let msg = ClientMessage::CancelGoal {
            goal_id: self.goal_id.clone(),
        };
        tokio::time::timeout(self.io_timeout, write_frame(&mut self.writer, &msg))
            .await
            .map_err(|_| PlanClientError::Timeout(self.io_timeout))?
    }
}
