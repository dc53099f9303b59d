//! Scripted planning service
//!
//! Speaks the planning service side of the action protocol but, instead of
//! planning, replays feedback from a YAML script. Used for local runs and
//! end-to-end tests of the client.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::BufReader;
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::channel::frame::{read_frame, write_frame};
use crate::error::PlanClientError;
use crate::protocol::{
    ClientMessage, FeedbackNotification, GoalResult, PlanGenerationResult, PlanRequest, ServiceMessage,
};

/// What the scripted service answers to a goal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanScript {
    /// Version reported in Pong
    pub version: String,

    /// Accept goals; when false every goal is rejected
    pub accept: bool,

    #[serde(rename = "reject-reason")]
    pub reject_reason: String,

    /// Delay before each feedback frame
    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,

    /// Feedback frames, in order
    pub feedback: Vec<PlanGenerationResult>,

    /// Final result; without one the goal stays open until canceled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<GoalResult>,
}

impl Default for PlanScript {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            accept: true,
            reject_reason: "goal rejected".to_string(),
            delay_ms: 0,
            feedback: Vec::new(),
            result: None,
        }
    }
}

impl PlanScript {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("Failed to read plan script")?;
        let script: Self = serde_yaml::from_str(&content).context("Failed to parse plan script")?;
        info!("Loaded plan script from: {}", path.display());
        Ok(script)
    }
}

/// Planning service replaying a [`PlanScript`] to every goal
#[derive(Debug, Clone)]
pub struct ScriptedService {
    script: Arc<PlanScript>,
}

impl ScriptedService {
    pub fn new(script: PlanScript) -> Self {
        Self {
            script: Arc::new(script),
        }
    }

    /// Accept connections until `shutdown` resolves
    pub async fn run<S>(&self, listener: UnixListener, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        info!(version = %self.script.version, "Scripted planning service listening");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, _) = accepted.context("Failed to accept connection")?;
                    let service = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = service.serve_connection(stream).await {
                            debug!(error = %e, "ScriptedService: connection ended with error");
                        }
                    });
                }
                _ = &mut shutdown => {
                    info!("Scripted planning service shutting down");
                    return Ok(());
                }
            }
        }
    }

    /// Serve one client connection
    pub async fn serve_connection(&self, stream: UnixStream) -> Result<(), PlanClientError> {
        let (read_half, mut writer) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        while let Some(msg) = read_frame::<_, ClientMessage>(&mut reader).await? {
            debug!(?msg, "ScriptedService::serve_connection: received");
            match msg {
                ClientMessage::Ping => {
                    let pong = ServiceMessage::Pong {
                        version: self.script.version.clone(),
                    };
                    write_frame(&mut writer, &pong).await?;
                }
                ClientMessage::CancelGoal { goal_id } => {
                    write_frame(&mut writer, &ServiceMessage::GoalCanceled { goal_id }).await?;
                }
                ClientMessage::SendGoal { goal_id, goal } => {
                    // The rest of the connection belongs to this goal
                    let (tx, rx) = mpsc::channel(8);
                    tokio::spawn(forward_client_messages(reader, tx));
                    return self.run_goal(&mut writer, rx, goal_id, goal).await;
                }
            }
        }

        Ok(())
    }

    async fn run_goal(
        &self,
        writer: &mut OwnedWriteHalf,
        mut control: mpsc::Receiver<ClientMessage>,
        goal_id: String,
        goal: PlanRequest,
    ) -> Result<(), PlanClientError> {
        info!(%goal_id, domain = goal.domain(), problem = goal.problem(), "Goal received");

        if !self.script.accept {
            let rejected = ServiceMessage::GoalRejected {
                goal_id,
                reason: self.script.reject_reason.clone(),
            };
            return write_frame(writer, &rejected).await;
        }

        write_frame(writer, &ServiceMessage::GoalAccepted { goal_id: goal_id.clone() }).await?;

        let delay = Duration::from_millis(self.script.delay_ms);
        for result in &self.script.feedback {
            let pause = tokio::time::sleep(delay);
            tokio::pin!(pause);
            loop {
                tokio::select! {
                    _ = &mut pause => break,
                    msg = control.recv() => {
                        if self.handle_control(writer, &goal_id, msg).await? {
                            return Ok(());
                        }
                    }
                }
            }

            let feedback = ServiceMessage::Feedback {
                goal_id: goal_id.clone(),
                feedback: FeedbackNotification::new(result.clone()),
            };
            write_frame(writer, &feedback).await?;
        }

        if let Some(result) = &self.script.result {
            let done = ServiceMessage::Result {
                goal_id,
                result: result.clone(),
            };
            return write_frame(writer, &done).await;
        }

        // No scripted result: hold the goal open like an anytime planner
        loop {
            let msg = control.recv().await;
            if self.handle_control(writer, &goal_id, msg).await? {
                return Ok(());
            }
        }
    }

    /// Returns true once the goal is over
    async fn handle_control(
        &self,
        writer: &mut OwnedWriteHalf,
        goal_id: &str,
        msg: Option<ClientMessage>,
    ) -> Result<bool, PlanClientError> {
        match msg {
            Some(ClientMessage::CancelGoal { goal_id: id }) if id == goal_id => {
                info!(%goal_id, "Goal canceled by client");
                write_frame(writer, &ServiceMessage::GoalCanceled { goal_id: id }).await?;
                Ok(true)
            }
            Some(ClientMessage::Ping) => {
                let pong = ServiceMessage::Pong {
                    version: self.script.version.clone(),
                };
                write_frame(writer, &pong).await?;
                Ok(false)
            }
            Some(other) => {
                warn!(%goal_id, ?other, "Ignoring unexpected message during goal");
                Ok(false)
            }
            None => {
                debug!(%goal_id, "ScriptedService: client disconnected");
                Ok(true)
            }
        }
    }
}

async fn forward_client_messages(
    mut reader: BufReader<tokio::net::unix::OwnedReadHalf>,
    tx: mpsc::Sender<ClientMessage>,
) {
    loop {
        match read_frame::<_, ClientMessage>(&mut reader).await {
            Ok(Some(msg)) => {
                if tx.send(msg).await.is_err() {
                    return;
                }
            }
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "ScriptedService: bad frame from client");
                return;
            }
        }
    }
}
