//! Planning request client
//!
//! Builds a one-shot planning goal, submits it over an [`ActionChannel`] and
//! drives the resulting feedback stream, handing every notification to a
//! [`FeedbackHandler`] in arrival order.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::channel::{ActionChannel, GoalStream};
use crate::error::PlanClientError;
use crate::protocol::{FeedbackNotification, PlanRequest, PlanStatus, ResolutionMode, ServiceMessage};
use crate::render::render_plan;
use crate::session::{CompletionPolicy, GoalSession, GoalState};

/// Receives feedback notifications, one at a time
pub trait FeedbackHandler: Send {
    fn on_feedback(&mut self, notification: &FeedbackNotification) -> Result<(), PlanClientError>;
}

impl<F> FeedbackHandler for F
where
    F: FnMut(&FeedbackNotification) -> Result<(), PlanClientError> + Send,
{
    fn on_feedback(&mut self, notification: &FeedbackNotification) -> Result<(), PlanClientError> {
        self(notification)
    }
}

/// Prints every satisficing plan; all other notifications produce no output
pub struct PlanPrinter<W: Write> {
    out: W,
}

impl PlanPrinter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> PlanPrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> FeedbackHandler for PlanPrinter<W> {
    fn on_feedback(&mut self, notification: &FeedbackNotification) -> Result<(), PlanClientError> {
        let status = notification.status();
        if status != PlanStatus::SolvedSatisficing {
            debug!(%status, "PlanPrinter::on_feedback: not a satisficing plan, skipping");
            return Ok(());
        }

        let text = render_plan(&notification.result)?;
        self.out.write_all(text.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}

/// Client that submits one planning goal per call
#[derive(Debug, Clone)]
pub struct PlanningRequestClient<C: ActionChannel> {
    channel: C,
    wait_timeout: Option<Duration>,
    resolution_mode: ResolutionMode,
}

impl<C: ActionChannel> PlanningRequestClient<C> {
    /// Create a client that waits forever for the service
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            wait_timeout: None,
            resolution_mode: ResolutionMode::Satisfiable,
        }
    }

    /// Bound the service discovery wait; `None` waits forever
    pub fn with_wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.wait_timeout = timeout;
        self
    }

    pub fn with_resolution_mode(mut self, resolution_mode: ResolutionMode) -> Self {
        self.resolution_mode = resolution_mode;
        self
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Submit a FILE goal for the given domain and problem paths
    ///
    /// The paths are not checked here; the service reports unreadable files.
    /// Returns once the goal is sent, before any feedback is known.
    pub async fn submit(
        &self,
        domain: impl AsRef<Path>,
        problem: impl AsRef<Path>,
    ) -> Result<GoalHandle, PlanClientError> {
        let request = PlanRequest::from_files(domain, problem).with_resolution_mode(self.resolution_mode);
        self.submit_request(request).await
    }

    /// Submit an already built request
    pub async fn submit_request(&self, request: PlanRequest) -> Result<GoalHandle, PlanClientError> {
        debug!(?request, wait_timeout = ?self.wait_timeout, "PlanningRequestClient::submit_request: called");
        self.channel.wait_for_server(self.wait_timeout).await?;

        let goal_id = Uuid::now_v7().to_string();
        let stream = self.channel.send_goal(&goal_id, &request).await?;
        info!(%goal_id, mode = ?request.mode(), "Planning goal submitted");

        Ok(GoalHandle {
            goal_id,
            request,
            stream,
        })
    }
}

/// A submitted goal and the stream of messages about it
pub struct GoalHandle {
    goal_id: String,
    request: PlanRequest,
    stream: Box<dyn GoalStream>,
}

impl GoalHandle {
    pub fn goal_id(&self) -> &str {
        &self.goal_id
    }

    pub fn request(&self) -> &PlanRequest {
        &self.request
    }

    /// Raw access to the next message, for callers driving the stream themselves
    pub async fn next_message(&mut self) -> Result<Option<ServiceMessage>, PlanClientError> {
        self.stream.next_message().await
    }

    /// Ask the service to stop working on this goal
    pub async fn cancel(&mut self) -> Result<(), PlanClientError> {
        info!(goal_id = %self.goal_id, "Canceling goal");
        self.stream.cancel().await
    }

    /// Consume feedback until the goal reaches a terminal state
    pub async fn spin<H: FeedbackHandler>(
        &mut self,
        handler: &mut H,
        policy: CompletionPolicy,
        plan_timeout: Option<Duration>,
    ) -> Result<GoalState, PlanClientError> {
        self.spin_until(handler, policy, plan_timeout, std::future::pending())
            .await
    }

    /// Like [`spin`](Self::spin), but also stops and cancels the goal when `shutdown` resolves
    pub async fn spin_until<H, S>(
        &mut self,
        handler: &mut H,
        policy: CompletionPolicy,
        plan_timeout: Option<Duration>,
        shutdown: S,
    ) -> Result<GoalState, PlanClientError>
    where
        H: FeedbackHandler,
        S: Future<Output = ()>,
    {
        debug!(goal_id = %self.goal_id, ?policy, ?plan_timeout, "GoalHandle::spin_until: called");
        let mut session = GoalSession::new(&self.goal_id, policy);

        let deadline = plan_timeout.map(|t| tokio::time::Instant::now() + t);
        let timer = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(timer);
        tokio::pin!(shutdown);

        let outcome = loop {
            if session.is_finished() {
                break Ok(());
            }

            let next = tokio::select! {
                next = self.stream.next_message() => next,
                _ = &mut timer => {
                    let waited = plan_timeout.unwrap_or_default();
                    warn!(goal_id = %self.goal_id, ?waited, "No terminal outcome before plan timeout");
                    session.abort(format!("no terminal outcome within {:?}", waited));
                    break Ok(());
                }
                _ = &mut shutdown => {
                    info!(goal_id = %self.goal_id, "Shutdown requested");
                    session.abort("interrupted");
                    break Ok(());
                }
            };

            let msg = match next {
                Ok(Some(msg)) => msg,
                Ok(None) => {
                    session.end_of_stream();
                    break Ok(());
                }
                Err(e) => {
                    session.abort(e.to_string());
                    break Err(e);
                }
            };

            if !session.accepts(&msg) {
                warn!(goal_id = %self.goal_id, other = ?msg.goal_id(), kind = msg.kind(), "Dropping message for another goal");
                continue;
            }

            if let ServiceMessage::Feedback { feedback, .. } = &msg {
                if let Err(e) = handler.on_feedback(feedback) {
                    warn!(goal_id = %self.goal_id, error = %e, "Feedback handler failed");
                    session.abort(e.to_string());
                    break Err(e);
                }
            }

            session.apply(&msg);

            if let ServiceMessage::GoalRejected { reason, .. } = msg {
                break Err(PlanClientError::GoalRejected {
                    goal_id: self.goal_id.clone(),
                    reason,
                });
            }
        };

        if session.needs_cancel() {
            if let Err(e) = self.stream.cancel().await {
                warn!(goal_id = %self.goal_id, error = %e, "Failed to cancel goal");
            }
        }

        info!(goal_id = %self.goal_id, state = %session.state(), "Goal finished");
        outcome.map(|_| session.state().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ActionInstance, GoalResult, Parameter, PlanGenerationResult};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// In-memory channel replaying a fixed list of messages
    #[derive(Clone, Default)]
    struct ScriptedChannel {
        unavailable: bool,
        script: Vec<ServiceMessage>,
        sent: Arc<Mutex<Vec<(String, PlanRequest)>>>,
        canceled: Arc<AtomicBool>,
    }

    struct ScriptedStream {
        messages: VecDeque<ServiceMessage>,
        hang_when_empty: bool,
        canceled: Arc<AtomicBool>,
    }

    fn addressed(msg: &ServiceMessage, id: &str) -> ServiceMessage {
        let goal_id = id.to_string();
        match msg.clone() {
            ServiceMessage::GoalAccepted { .. } => ServiceMessage::GoalAccepted { goal_id },
            ServiceMessage::GoalRejected { reason, .. } => ServiceMessage::GoalRejected { goal_id, reason },
            ServiceMessage::Feedback { feedback, .. } => ServiceMessage::Feedback { goal_id, feedback },
            ServiceMessage::Result { result, .. } => ServiceMessage::Result { goal_id, result },
            ServiceMessage::GoalCanceled { .. } => ServiceMessage::GoalCanceled { goal_id },
            other => other,
        }
    }

    #[async_trait]
    impl ActionChannel for ScriptedChannel {
        async fn wait_for_server(&self, timeout: Option<Duration>) -> Result<(), PlanClientError> {
            if self.unavailable {
                return Err(PlanClientError::ChannelUnavailable {
                    socket: "memory".into(),
                    waited: timeout.unwrap_or_default(),
                });
            }
            Ok(())
        }

        async fn send_goal(
            &self,
            goal_id: &str,
            request: &PlanRequest,
        ) -> Result<Box<dyn GoalStream>, PlanClientError> {
            self.sent.lock().unwrap().push((goal_id.to_string(), request.clone()));
            Ok(Box::new(ScriptedStream {
                messages: self.script.iter().map(|m| addressed(m, goal_id)).collect(),
                hang_when_empty: false,
                canceled: self.canceled.clone(),
            }))
        }
    }

    #[async_trait]
    impl GoalStream for ScriptedStream {
        async fn next_message(&mut self) -> Result<Option<ServiceMessage>, PlanClientError> {
            match self.messages.pop_front() {
                Some(msg) => Ok(Some(msg)),
                None if self.hang_when_empty => std::future::pending().await,
                None => Ok(None),
            }
        }

        async fn cancel(&mut self) -> Result<(), PlanClientError> {
            self.canceled.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn satisficing(actions: Vec<ActionInstance>) -> ServiceMessage {
        ServiceMessage::Feedback {
            goal_id: String::new(),
            feedback: FeedbackNotification::new(PlanGenerationResult::new(PlanStatus::SolvedSatisficing, actions)),
        }
    }

    fn status_only(status: PlanStatus, actions: Vec<ActionInstance>) -> ServiceMessage {
        ServiceMessage::Feedback {
            goal_id: String::new(),
            feedback: FeedbackNotification::new(PlanGenerationResult::new(status, actions)),
        }
    }

    fn accepted() -> ServiceMessage {
        ServiceMessage::GoalAccepted { goal_id: String::new() }
    }

    fn finished() -> ServiceMessage {
        ServiceMessage::Result {
            goal_id: String::new(),
            result: GoalResult {
                success: true,
                message: String::new(),
            },
        }
    }

    fn channel(script: Vec<ServiceMessage>) -> ScriptedChannel {
        ScriptedChannel {
            script,
            ..Default::default()
        }
    }

    async fn run(
        script: Vec<ServiceMessage>,
        policy: CompletionPolicy,
    ) -> (Result<GoalState, PlanClientError>, String, ScriptedChannel) {
        let channel = channel(script);
        let client = PlanningRequestClient::new(channel.clone());
        let mut handle = client.submit("domain.pddl", "problem.pddl").await.unwrap();
        let mut printer = PlanPrinter::new(Vec::new());
        let state = handle.spin(&mut printer, policy, None).await;
        let output = String::from_utf8(printer.into_inner()).unwrap();
        (state, output, channel)
    }

    #[tokio::test]
    async fn test_submit_sends_exactly_one_file_goal() {
        let channel = channel(vec![]);
        let client = PlanningRequestClient::new(channel.clone());
        let handle = client
            .submit("/srv/pddl/pick_place_domain.pddl", "/srv/pddl/pick_place_problem_01.pddl")
            .await
            .unwrap();

        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (goal_id, request) = &sent[0];
        assert_eq!(goal_id, handle.goal_id());
        assert_eq!(request.mode(), crate::protocol::RequestMode::File);
        assert_eq!(request.resolution_mode(), ResolutionMode::Satisfiable);
        assert_eq!(request.domain(), "/srv/pddl/pick_place_domain.pddl");
        assert_eq!(request.problem(), "/srv/pddl/pick_place_problem_01.pddl");
    }

    #[tokio::test]
    async fn test_submit_fails_when_channel_unavailable() {
        let channel = ScriptedChannel {
            unavailable: true,
            ..Default::default()
        };
        let client = PlanningRequestClient::new(channel.clone()).with_wait_timeout(Some(Duration::from_millis(10)));

        let result = client.submit("d.pddl", "p.pddl").await;
        assert!(matches!(result, Err(PlanClientError::ChannelUnavailable { .. })));
        assert!(channel.sent.lock().unwrap().is_empty(), "No goal may be sent");
    }

    #[tokio::test]
    async fn test_pick_and_place_plan_is_printed() {
        let script = vec![
            accepted(),
            satisficing(vec![
                ActionInstance::with_symbols("pick", ["a"]),
                ActionInstance::with_symbols("place", ["a", "table"]),
            ]),
            finished(),
        ];

        let (state, output, _) = run(script, CompletionPolicy::UntilResult).await;
        assert_eq!(state.unwrap(), GoalState::Solved { plans: 1 });
        assert_eq!(output, "Received plan:\n  0. pick(a)\n  1. place(a,table)\n");
    }

    #[tokio::test]
    async fn test_solved_optimally_prints_nothing() {
        let script = vec![
            accepted(),
            status_only(
                PlanStatus::SolvedOptimally,
                vec![ActionInstance::with_symbols("pick", ["a"])],
            ),
        ];

        let (state, output, _) = run(script, CompletionPolicy::UntilResult).await;
        assert!(output.is_empty());
        assert_eq!(
            state.unwrap(),
            GoalState::Exhausted {
                status: PlanStatus::SolvedOptimally
            }
        );
    }

    #[tokio::test]
    async fn test_non_satisficing_statuses_print_nothing() {
        for status in [
            PlanStatus::Intermediate,
            PlanStatus::UnsolvableProven,
            PlanStatus::UnsolvableIncompletely,
            PlanStatus::Timeout,
            PlanStatus::Memout,
            PlanStatus::InternalError,
            PlanStatus::UnsupportedProblem,
            PlanStatus::Unknown,
        ] {
            let script = vec![status_only(status, vec![ActionInstance::with_symbols("pick", ["a"])])];
            let (_, output, _) = run(script, CompletionPolicy::UntilResult).await;
            assert!(output.is_empty(), "{status} produced output");
        }
    }

    #[tokio::test]
    async fn test_empty_plan_prints_header_only() {
        let (state, output, _) = run(vec![satisficing(vec![]), finished()], CompletionPolicy::UntilResult).await;
        assert_eq!(output, "Received plan:\n");
        assert!(state.unwrap().is_solved());
    }

    #[tokio::test]
    async fn test_every_anytime_plan_is_printed_in_order() {
        let script = vec![
            accepted(),
            satisficing(vec![ActionInstance::with_symbols("pick", ["a"])]),
            status_only(PlanStatus::Intermediate, vec![]),
            satisficing(vec![ActionInstance::with_symbols("pick", ["b"])]),
            finished(),
        ];

        let (state, output, channel) = run(script, CompletionPolicy::UntilResult).await;
        assert_eq!(
            output,
            "Received plan:\n  0. pick(a)\nReceived plan:\n  0. pick(b)\n"
        );
        assert_eq!(state.unwrap(), GoalState::Solved { plans: 2 });
        assert!(!channel.canceled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_first_plan_policy_stops_and_cancels() {
        let script = vec![
            satisficing(vec![ActionInstance::with_symbols("pick", ["a"])]),
            satisficing(vec![ActionInstance::with_symbols("pick", ["b"])]),
        ];

        let (state, output, channel) = run(script, CompletionPolicy::FirstPlan).await;
        assert_eq!(output, "Received plan:\n  0. pick(a)\n");
        assert_eq!(state.unwrap(), GoalState::Solved { plans: 1 });
        assert!(channel.canceled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_malformed_parameter_fails_loudly() {
        let script = vec![satisficing(vec![ActionInstance {
            action_name: "place".to_string(),
            parameters: vec![Parameter::from_symbol("a"), Parameter::default()],
        }])];

        let (state, output, _) = run(script, CompletionPolicy::UntilResult).await;
        assert!(matches!(state, Err(PlanClientError::MalformedNotification { .. })));
        assert!(output.is_empty(), "No partial plan may be printed");
    }

    #[tokio::test]
    async fn test_rejected_goal_is_an_error() {
        let script = vec![ServiceMessage::GoalRejected {
            goal_id: String::new(),
            reason: "planner busy".to_string(),
        }];

        let (state, _, _) = run(script, CompletionPolicy::UntilResult).await;
        match state {
            Err(PlanClientError::GoalRejected { reason, .. }) => assert_eq!(reason, "planner busy"),
            other => panic!("Expected GoalRejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_messages_for_other_goals_are_dropped() {
        let channel = channel(vec![]);
        let mut handle = PlanningRequestClient::new(channel).submit("d", "p").await.unwrap();
        handle.stream = Box::new(ScriptedStream {
            messages: VecDeque::from(vec![
                addressed(&satisficing(vec![ActionInstance::with_symbols("x", ["y"])]), "someone-else"),
                addressed(&finished(), handle.goal_id()),
            ]),
            hang_when_empty: false,
            canceled: Arc::new(AtomicBool::new(false)),
        });

        let mut printer = PlanPrinter::new(Vec::new());
        let state = handle.spin(&mut printer, CompletionPolicy::UntilResult, None).await.unwrap();
        assert!(printer.into_inner().is_empty());
        assert!(matches!(state, GoalState::Failed { .. }));
    }

    #[tokio::test]
    async fn test_plan_timeout_aborts_and_cancels() {
        let canceled = Arc::new(AtomicBool::new(false));
        let channel = channel(vec![]);
        let mut handle = PlanningRequestClient::new(channel).submit("d", "p").await.unwrap();
        handle.stream = Box::new(ScriptedStream {
            messages: VecDeque::from(vec![addressed(&accepted(), handle.goal_id())]),
            hang_when_empty: true,
            canceled: canceled.clone(),
        });

        let mut printer = PlanPrinter::new(Vec::new());
        let state = handle
            .spin(&mut printer, CompletionPolicy::UntilResult, Some(Duration::from_millis(20)))
            .await
            .unwrap();

        assert!(matches!(state, GoalState::Failed { reason } if reason.contains("no terminal outcome")));
        assert!(canceled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_spin() {
        let canceled = Arc::new(AtomicBool::new(false));
        let channel = channel(vec![]);
        let mut handle = PlanningRequestClient::new(channel).submit("d", "p").await.unwrap();
        handle.stream = Box::new(ScriptedStream {
            messages: VecDeque::new(),
            hang_when_empty: true,
            canceled: canceled.clone(),
        });

        let mut printer = PlanPrinter::new(Vec::new());
        let state = handle
            .spin_until(&mut printer, CompletionPolicy::UntilResult, None, async {})
            .await
            .unwrap();

        assert_eq!(
            state,
            GoalState::Failed {
                reason: "interrupted".to_string()
            }
        );
        assert!(canceled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_closure_handler_sees_every_notification() {
        let script = vec![
            status_only(PlanStatus::Intermediate, vec![]),
            satisficing(vec![]),
            status_only(PlanStatus::Timeout, vec![]),
        ];
        let channel = channel(script);
        let mut handle = PlanningRequestClient::new(channel).submit("d", "p").await.unwrap();

        let mut seen = Vec::new();
        let mut handler = |n: &FeedbackNotification| -> Result<(), PlanClientError> {
            seen.push(n.status());
            Ok(())
        };
        let state = handle
            .spin(&mut handler, CompletionPolicy::UntilResult, None)
            .await
            .unwrap();

        assert_eq!(
            seen,
            vec![PlanStatus::Intermediate, PlanStatus::SolvedSatisficing, PlanStatus::Timeout]
        );
        assert_eq!(state, GoalState::Solved { plans: 1 });
    }

    #[tokio::test]
    async fn test_submit_request_inline() {
        let channel = channel(vec![]);
        let client = PlanningRequestClient::new(channel.clone());
        client
            .submit_request(PlanRequest::inline("(define (domain d))", "(define (problem p))"))
            .await
            .unwrap();

        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent[0].1.mode(), crate::protocol::RequestMode::Inline);
    }
}
