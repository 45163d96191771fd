//! High level guarded client.
//!
//! Wires together the state store, write guard, signal detectors and the
//! verification pipeline behind a single `call` entry point. Every call
//! resolves to a [`ToolOutcome`]; nothing the remote service does turns into
//! an `Err`.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::challenges::core::{
	ApiTransport, NormalizedResponse, ReqwestTransport, TransportBuildError,
	VerificationSubmission, execute_verification_submission,
};
use crate::challenges::detectors::{
	VerificationSignal, extract_retry_seconds, extract_suspension, extract_verification,
};
use crate::challenges::pipeline::{AutoSolveOutcome, VerificationPipeline};
use crate::config::{ConfigError, GuardConfig};
use crate::modules::events::{
	BlockedEvent, ChallengeEvent, ErrorEvent, EventDispatcher, EventHandler, GuardEvent,
	LoggingHandler, RequestEvent, ResponseEvent,
};
use crate::modules::guard::{GuardBlock, GuardPolicy, evaluate};
use crate::modules::state::{
	GuardState, JsonFileStateStore, MAX_PENDING_AGE_SECS, PendingVerification, StateError,
	StateStore, Suspension,
};
use crate::outcome::{ErrorCode, ToolOutcome};
use crate::tools::{CooldownCategory, ToolClassifier, ToolRequest};

const MANUAL_VERIFY_TOOL: &str = "submit_verification";

/// Result alias used across the orchestration layer.
pub type GuardedClientResult<T> = Result<T, GuardedClientError>;

/// Construction and state-management failures.
#[derive(Debug, Error)]
pub enum GuardedClientError {
	#[error("configuration error: {0}")]
	Config(#[from] ConfigError),
	#[error("transport initialisation failed: {0}")]
	Transport(#[from] TransportBuildError),
	#[error("state store error: {0}")]
	State(#[from] StateError),
}

/// Time source for guard decisions.
pub trait Clock: Send + Sync {
	fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> DateTime<Utc> {
		Utc::now()
	}
}

/// Settable clock for tests and replay.
#[derive(Debug)]
pub struct ManualClock {
	now: StdMutex<DateTime<Utc>>,
}

impl ManualClock {
	pub fn new(now: DateTime<Utc>) -> Self {
		Self {
			now: StdMutex::new(now),
		}
	}

	pub fn set(&self, now: DateTime<Utc>) {
		*self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = now;
	}

	pub fn advance(&self, by: Duration) {
		let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
		*now += by;
	}
}

impl Clock for ManualClock {
	fn now(&self) -> DateTime<Utc> {
		*self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}
}

/// Swept state plus the decision a write would get right now.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuardStatus {
	pub state: GuardState,
	pub write_block: Option<GuardBlock>,
}

impl GuardStatus {
	pub fn can_write(&self) -> bool {
		self.write_block.is_none()
	}
}

/// Fluent builder for [`GuardedClient`].
pub struct GuardedClientBuilder {
	config: GuardConfig,
	transport: Option<Arc<dyn ApiTransport>>,
	store: Option<Arc<dyn StateStore>>,
	clock: Option<Arc<dyn Clock>>,
	handlers: Vec<Arc<dyn EventHandler>>,
	logging: bool,
}

impl GuardedClientBuilder {
	pub fn new() -> Self {
		Self {
			config: GuardConfig::default(),
			transport: None,
			store: None,
			clock: None,
			handlers: Vec::new(),
			logging: true,
		}
	}

	pub fn with_config(mut self, config: GuardConfig) -> Self {
		self.config = config;
		self
	}

	pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.config.base_url = base_url.into();
		self
	}

	pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
		self.config.api_key = Some(api_key.into());
		self
	}

	pub fn with_state_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
		self.config.state_path = path.into();
		self
	}

	pub fn with_verify_path(mut self, path: impl Into<String>) -> Self {
		self.config.verify_path = path.into();
		self
	}

	pub fn with_status_tool(mut self, tool: impl Into<String>) -> Self {
		self.config.status_tool = tool.into();
		self
	}

	pub fn with_write_tools<I, S>(mut self, tools: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.config.write_tools = tools.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_min_write_interval_secs(mut self, secs: u64) -> Self {
		self.config.min_write_interval_secs = secs;
		self
	}

	pub fn with_transport(mut self, transport: Arc<dyn ApiTransport>) -> Self {
		self.transport = Some(transport);
		self
	}

	pub fn with_state_store(mut self, store: Arc<dyn StateStore>) -> Self {
		self.store = Some(store);
		self
	}

	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = Some(clock);
		self
	}

	pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
		self.handlers.push(handler);
		self
	}

	/// Skip the default [`LoggingHandler`].
	pub fn without_logging(mut self) -> Self {
		self.logging = false;
		self
	}

	pub fn build(self) -> GuardedClientResult<GuardedClient> {
		let config = self.config;

		let transport: Arc<dyn ApiTransport> = match self.transport {
			Some(transport) => transport,
			None => Arc::new(ReqwestTransport::new(
				config.parsed_base_url()?,
				config.api_key.as_deref(),
				&config.user_agent,
				config.request_timeout(),
			)?),
		};
		let store: Arc<dyn StateStore> = match self.store {
			Some(store) => store,
			None => Arc::new(JsonFileStateStore::new(config.state_path.clone())),
		};
		let clock = self
			.clock
			.unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

		let mut events = EventDispatcher::new();
		if self.logging {
			events.register_handler(Arc::new(LoggingHandler));
		}
		for handler in self.handlers {
			events.register_handler(handler);
		}

		let max_pending_age = i64::try_from(config.max_pending_age_secs)
			.ok()
			.and_then(Duration::try_seconds)
			.unwrap_or_else(|| Duration::seconds(MAX_PENDING_AGE_SECS));

		Ok(GuardedClient {
			transport,
			store,
			clock,
			events,
			pipeline: VerificationPipeline::new(config.verify_path.clone()),
			classifier: ToolClassifier::new(config.write_tools.iter().cloned()),
			policy: GuardPolicy::new(config.min_write_interval_secs),
			status_tool: config.status_tool.clone(),
			max_pending_age,
			serial: Mutex::new(()),
		})
	}
}

impl Default for GuardedClientBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Guarded API client.
///
/// Calls on one client are serialized so the load/sweep/mutate/save cycle of
/// the state record never interleaves. Separate clients (or processes)
/// sharing one store are not coordinated.
pub struct GuardedClient {
	transport: Arc<dyn ApiTransport>,
	store: Arc<dyn StateStore>,
	clock: Arc<dyn Clock>,
	events: EventDispatcher,
	pipeline: VerificationPipeline,
	classifier: ToolClassifier,
	policy: GuardPolicy,
	status_tool: String,
	max_pending_age: Duration,
	serial: Mutex<()>,
}

impl GuardedClient {
	pub fn builder() -> GuardedClientBuilder {
		GuardedClientBuilder::new()
	}

	pub fn from_config(config: GuardConfig) -> GuardedClientResult<Self> {
		GuardedClientBuilder::new().with_config(config).build()
	}

	pub fn is_mutating(&self, request: &ToolRequest) -> bool {
		self.classifier.is_mutating(request)
	}

	/// Run one tool request through the guard.
	pub async fn call(&self, request: ToolRequest) -> ToolOutcome {
		let _serial = self.serial.lock().await;
		let now = self.clock.now();
		let mutating = self.classifier.is_mutating(&request);
		let mut state = self.load_state(now, &request.tool);

		if mutating && let Some(block) = evaluate(&state, now, &self.policy) {
			self.emit_blocked(&request.tool, &block, now);
			return ToolOutcome::blocked(block.to_error());
		}

		self.events.dispatch(GuardEvent::Request(RequestEvent {
			tool: request.tool.clone(),
			method: request.method.clone(),
			path: request.path.clone(),
			mutating,
			timestamp: now,
		}));
		let started = Instant::now();
		let response = self
			.transport
			.execute(&request.method, &request.path, request.parts())
			.await;
		let now = self.clock.now();
		self.events.dispatch(GuardEvent::Response(ResponseEvent {
			tool: request.tool.clone(),
			method: request.method.clone(),
			path: request.path.clone(),
			status: response.status,
			latency: started.elapsed(),
			timestamp: now,
		}));

		self.record_suspension(&mut state, &response, now, request.tool == self.status_tool);

		if mutating {
			let retry_secs = extract_retry_seconds(&response, now);
			if retry_secs > 0 {
				apply_cooldown(&mut state, &request.tool, now, retry_secs);
			}
		}

		let verification = if mutating {
			extract_verification(&response)
		} else {
			None
		};

		let outcome = match verification {
			Some(signal) => {
				self.auto_verify(&mut state, &request.tool, &response, signal, now)
					.await
			}
			None => {
				if response.ok && mutating {
					state.last_write_at = Some(now);
				}
				shape_response(&response)
			}
		};

		self.persist(&state, &request.tool, now);
		outcome
	}

	/// Answer the outstanding verification challenge by hand.
	///
	/// Only an active suspension blocks this call. `verification_code` falls
	/// back to the code of the pending record.
	pub async fn submit_verification(
		&self,
		answer: impl Into<String>,
		verification_code: Option<String>,
	) -> ToolOutcome {
		let _serial = self.serial.lock().await;
		let answer = answer.into();
		let now = self.clock.now();
		let mut state = self.load_state(now, MANUAL_VERIFY_TOOL);

		if state.suspension.active {
			let block = GuardBlock::AccountSuspended {
				reason: state.suspension.reason.clone(),
				until: state.suspension.until,
			};
			self.emit_blocked(MANUAL_VERIFY_TOOL, &block, now);
			return ToolOutcome::blocked(block.to_error());
		}

		let code = verification_code.or_else(|| {
			state
				.pending_verification
				.as_ref()
				.and_then(|pending| pending.verification_code.clone())
		});
		let submission = VerificationSubmission::new(answer.clone()).with_code(code);
		let response = execute_verification_submission(
			self.transport.as_ref(),
			self.pipeline.verify_path(),
			&submission,
		)
		.await;
		let now = self.clock.now();
		self.record_suspension(&mut state, &response, now, false);

		self.events.dispatch(GuardEvent::Challenge(ChallengeEvent {
			tool: MANUAL_VERIFY_TOOL.to_string(),
			answer: Some(answer.clone()),
			verified: response.ok,
			manual: true,
			timestamp: now,
		}));

		let outcome = if response.ok {
			state.pending_verification = None;
			ToolOutcome::success(&response)
		} else {
			state.offense_count = state.offense_count.saturating_add(1);
			if let Some(pending) = state.pending_verification.as_mut() {
				pending.attempt_count = pending.attempt_count.saturating_add(1);
				pending.failed_answers.push(answer);
			}
			let code = match response.status {
				0 => ErrorCode::NetworkError,
				429 => ErrorCode::RateLimited,
				_ => ErrorCode::VerificationRequired,
			};
			ToolOutcome::failure_with(&response, code, failure_message(&response))
				.with_details(json!({ "offense_count": state.offense_count }))
		};

		self.persist(&state, MANUAL_VERIFY_TOOL, now);
		outcome
	}

	/// Swept state and the block a write would hit right now.
	pub async fn guard_status(&self) -> GuardedClientResult<GuardStatus> {
		let _serial = self.serial.lock().await;
		let now = self.clock.now();
		let (state, _) = self.store.sweep(now, self.max_pending_age)?;
		let write_block = evaluate(&state, now, &self.policy);
		Ok(GuardStatus { state, write_block })
	}

	pub async fn set_safe_mode(&self, enabled: bool) -> GuardedClientResult<GuardState> {
		let _serial = self.serial.lock().await;
		let now = self.clock.now();
		let (mut state, _) = self.store.sweep(now, self.max_pending_age)?;
		state.safe_mode = enabled;
		self.store.save(&state)?;
		log::info!("safe mode {}", if enabled { "enabled" } else { "disabled" });
		Ok(state)
	}

	async fn auto_verify(
		&self,
		state: &mut GuardState,
		tool: &str,
		response: &NormalizedResponse,
		signal: VerificationSignal,
		now: DateTime<Utc>,
	) -> ToolOutcome {
		let attempt = self
			.pipeline
			.attempt(self.transport.as_ref(), &signal, &response.body)
			.await;

		if attempt.attempted() {
			self.events.dispatch(GuardEvent::Challenge(ChallengeEvent {
				tool: tool.to_string(),
				answer: attempt.answer().map(str::to_string),
				verified: matches!(attempt, AutoSolveOutcome::Verified { .. }),
				manual: false,
				timestamp: now,
			}));
		}

		let mut pending = PendingVerification::new(tool, now);
		pending.verification_code = signal.verification_code.clone();
		pending.challenge = signal.challenge.clone();
		pending.prompt = signal.prompt.clone();
		pending.expires_at = signal.expires_at;

		match attempt {
			AutoSolveOutcome::Verified {
				response: verify, ..
			} => {
				self.record_suspension(state, &verify, now, false);
				state.pending_verification = None;
				state.last_write_at = Some(now);
				ToolOutcome {
					ok: true,
					status: Some(response.status),
					data: response.body.clone(),
					auto_verified: true,
					verify_response: Some(verify.body),
					error: None,
				}
			}
			AutoSolveOutcome::Rejected {
				answer,
				response: verify,
			} => {
				self.record_suspension(state, &verify, now, false);
				pending.auto_attempted = true;
				pending.attempt_count = 1;
				pending.failed_answers.push(answer);
				let outcome = verification_required(response, &pending).with_verify_response(&verify);
				state.pending_verification = Some(pending);
				outcome
			}
			AutoSolveOutcome::Unsolvable => {
				let outcome = verification_required(response, &pending);
				state.pending_verification = Some(pending);
				outcome
			}
		}
	}

	fn record_suspension(
		&self,
		state: &mut GuardState,
		response: &NormalizedResponse,
		now: DateTime<Utc>,
		status_check: bool,
	) {
		match extract_suspension(response) {
			Some(signal) => {
				if !state.suspension.active {
					log::warn!("account suspension detected: {}", signal.reason);
				}
				state.suspension = Suspension {
					active: true,
					reason: Some(signal.reason),
					until: signal.until,
					seen_at: Some(now),
				};
			}
			None if status_check && response.ok && state.suspension.active => {
				log::info!("status check shows no suspension; clearing stale record");
				state.suspension = Suspension::default();
			}
			None => {}
		}
	}

	fn load_state(&self, now: DateTime<Utc>, tool: &str) -> GuardState {
		match self.store.sweep(now, self.max_pending_age) {
			Ok((state, _)) => state,
			Err(err) => {
				self.emit_store_error(tool, "load", &err, now);
				GuardState::default()
			}
		}
	}

	fn persist(&self, state: &GuardState, tool: &str, now: DateTime<Utc>) {
		if let Err(err) = self.store.save(state) {
			self.emit_store_error(tool, "save", &err, now);
		}
	}

	fn emit_store_error(&self, tool: &str, action: &str, err: &StateError, now: DateTime<Utc>) {
		log::warn!("state {} failed during {}: {}", action, tool, err);
		self.events.dispatch(GuardEvent::Error(ErrorEvent {
			tool: tool.to_string(),
			error: format!("state {action} failed: {err}"),
			timestamp: now,
		}));
	}

	fn emit_blocked(&self, tool: &str, block: &GuardBlock, now: DateTime<Utc>) {
		self.events.dispatch(GuardEvent::Blocked(BlockedEvent {
			tool: tool.to_string(),
			code: block.code(),
			message: block.message(),
			timestamp: now,
		}));
	}
}

fn apply_cooldown(state: &mut GuardState, tool: &str, now: DateTime<Utc>, retry_secs: u64) {
	let Some(until) = i64::try_from(retry_secs)
		.ok()
		.and_then(Duration::try_seconds)
		.and_then(|delta| now.checked_add_signed(delta))
	else {
		return;
	};

	state.cooldowns.write_until = Some(until);
	match CooldownCategory::for_tool(tool) {
		Some(CooldownCategory::Post) => state.cooldowns.post_until = Some(until),
		Some(CooldownCategory::Comment) => state.cooldowns.comment_until = Some(until),
		None => {}
	}
	log::info!("{} cooldown set for {}s", tool, retry_secs);
}

fn shape_response(response: &NormalizedResponse) -> ToolOutcome {
	if response.ok {
		ToolOutcome::success(response)
	} else {
		ToolOutcome::failure(response, failure_message(response))
	}
}

fn verification_required(response: &NormalizedResponse, pending: &PendingVerification) -> ToolOutcome {
	let details = serde_json::to_value(pending).unwrap_or(Value::Null);
	let message = if pending.auto_attempted {
		"verification challenge could not be answered automatically"
	} else {
		"verification challenge requires a manual answer"
	};
	ToolOutcome::failure_with(response, ErrorCode::VerificationRequired, message).with_details(details)
}

fn failure_message(response: &NormalizedResponse) -> String {
	crate::challenges::core::first_text(
		&response.body,
		&["message", "error", "error.message", "detail"],
	)
	.unwrap_or_else(|| format!("request failed with status {}", response.status))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::challenges::core::executor::tests::{StubTransport, response};
	use crate::modules::state::MemoryStateStore;
	use chrono::TimeZone;
	use http::Method;

	fn start() -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap()
	}

	struct Harness {
		client: GuardedClient,
		transport: Arc<StubTransport>,
		store: Arc<MemoryStateStore>,
		clock: Arc<ManualClock>,
	}

	fn harness(responses: Vec<NormalizedResponse>, state: GuardState) -> Harness {
		let transport = Arc::new(StubTransport::new(responses));
		let store = Arc::new(MemoryStateStore::with_state(state));
		let clock = Arc::new(ManualClock::new(start()));
		let client = GuardedClient::builder()
			.with_transport(transport.clone())
			.with_state_store(store.clone())
			.with_clock(clock.clone())
			.without_logging()
			.build()
			.unwrap();
		Harness {
			client,
			transport,
			store,
			clock,
		}
	}

	#[tokio::test]
	async fn reads_are_never_blocked() {
		let mut state = GuardState::default();
		state.suspension.active = true;
		let h = harness(vec![response(200, json!({ "posts": [] }))], state);

		let outcome = h.client.call(ToolRequest::get("get_feed", "/feed")).await;
		assert!(outcome.ok);
		assert_eq!(outcome.status, Some(200));
		assert_eq!(h.transport.recorded().len(), 1);
	}

	#[tokio::test]
	async fn suspended_account_blocks_writes_without_request() {
		let mut state = GuardState::default();
		state.suspension.active = true;
		state.suspension.reason = Some("spam".into());
		let h = harness(vec![], state);

		let outcome = h
			.client
			.call(ToolRequest::post("create_post", "/posts").with_body(json!({ "title": "hi" })))
			.await;
		assert!(!outcome.ok);
		assert_eq!(outcome.status, None);
		assert_eq!(outcome.error_code(), Some(ErrorCode::AccountSuspended));
		assert!(h.transport.recorded().is_empty());
	}

	#[tokio::test]
	async fn suspension_in_response_is_recorded() {
		let h = harness(
			vec![response(
				403,
				json!({ "error": "Your account is suspended", "suspended_until": "2026-10-20T00:00:00Z" }),
			)],
			GuardState::default(),
		);

		let outcome = h.client.call(ToolRequest::post("create_comment", "/comments")).await;
		assert_eq!(outcome.error_code(), Some(ErrorCode::RequestFailed));

		let state = h.store.snapshot();
		assert!(state.suspension.active);
		assert_eq!(state.suspension.reason.as_deref(), Some("Your account is suspended"));
		assert_eq!(
			state.suspension.until,
			Some(Utc.with_ymd_and_hms(2026, 10, 20, 0, 0, 0).unwrap())
		);
		assert_eq!(state.suspension.seen_at, Some(start()));
		assert_eq!(state.last_write_at, None);
	}

	#[tokio::test]
	async fn status_check_clears_stale_suspension() {
		let mut state = GuardState::default();
		state.suspension.active = true;
		let h = harness(
			vec![
				response(200, json!({ "status": "active", "karma": 12 })),
				response(200, json!({ "id": "p1" })),
			],
			state,
		);

		let status = h.client.call(ToolRequest::get("account_status", "/agents/status")).await;
		assert!(status.ok);
		assert!(!h.store.snapshot().suspension.active);

		let write = h.client.call(ToolRequest::post("create_post", "/posts")).await;
		assert!(write.ok);
		assert_eq!(h.store.snapshot().last_write_at, Some(start()));
	}

	#[tokio::test]
	async fn other_reads_do_not_clear_suspension() {
		let mut state = GuardState::default();
		state.suspension.active = true;
		let h = harness(vec![response(200, json!({ "posts": [] }))], state);

		h.client.call(ToolRequest::get("get_feed", "/feed")).await;
		assert!(h.store.snapshot().suspension.active);
	}

	#[tokio::test]
	async fn unsolvable_challenge_becomes_pending() {
		let h = harness(
			vec![response(
				403,
				json!({ "error": "verification required", "verification_code": "vc-1", "challenge": "Describe a sunset" }),
			)],
			GuardState::default(),
		);

		let outcome = h.client.call(ToolRequest::post("create_post", "/posts")).await;
		assert_eq!(outcome.error_code(), Some(ErrorCode::VerificationRequired));
		assert_eq!(h.transport.recorded().len(), 1);

		let pending = h.store.snapshot().pending_verification.unwrap();
		assert_eq!(pending.source_tool, "create_post");
		assert_eq!(pending.verification_code.as_deref(), Some("vc-1"));
		assert!(!pending.auto_attempted);
		assert_eq!(pending.attempt_count, 0);

		let blocked = h.client.call(ToolRequest::post("create_comment", "/comments")).await;
		assert_eq!(
			blocked.error_code(),
			Some(ErrorCode::BlockedByPendingVerification)
		);
	}

	#[tokio::test]
	async fn rejected_answer_is_remembered() {
		let h = harness(
			vec![
				response(403, json!({ "verification_code": "vc-2", "challenge": "What is 6 * 7?" })),
				response(400, json!({ "error": "incorrect answer" })),
			],
			GuardState::default(),
		);

		let outcome = h.client.call(ToolRequest::post("create_post", "/posts")).await;
		assert_eq!(outcome.error_code(), Some(ErrorCode::VerificationRequired));
		assert!(!outcome.auto_verified);
		assert!(outcome.verify_response.is_some());

		let pending = h.store.snapshot().pending_verification.unwrap();
		assert!(pending.auto_attempted);
		assert_eq!(pending.attempt_count, 1);
		assert_eq!(pending.failed_answers, vec!["42.00".to_string()]);
		assert_eq!(h.store.snapshot().last_write_at, None);
	}

	#[tokio::test]
	async fn successful_read_with_challenge_text_is_not_verification() {
		let h = harness(
			vec![response(200, json!({ "title": "Weekly math challenge thread" }))],
			GuardState::default(),
		);

		let outcome = h.client.call(ToolRequest::post("create_post", "/posts")).await;
		assert!(outcome.ok);
		assert_eq!(h.transport.recorded().len(), 1);
		assert!(h.store.snapshot().pending_verification.is_none());
	}

	#[tokio::test]
	async fn manual_verification_clears_pending() {
		let mut state = GuardState::default();
		let mut pending = PendingVerification::new("create_post", start());
		pending.verification_code = Some("vc-3".into());
		pending.challenge = Some("name a lobster".into());
		state.pending_verification = Some(pending);
		let h = harness(vec![response(200, json!({ "success": true }))], state);

		let outcome = h.client.submit_verification("Larry", None).await;
		assert!(outcome.ok);

		let recorded = h.transport.recorded();
		assert_eq!(recorded[0].method, Method::POST);
		assert_eq!(recorded[0].path, "/verify");
		assert_eq!(
			recorded[0].body,
			Some(json!({ "answer": "Larry", "verification_code": "vc-3" }))
		);
		assert!(h.store.snapshot().pending_verification.is_none());
		assert_eq!(h.store.snapshot().last_write_at, None);
	}

	#[tokio::test]
	async fn failed_manual_verification_counts_offense() {
		let mut state = GuardState::default();
		let mut pending = PendingVerification::new("create_post", start());
		pending.verification_code = Some("vc-4".into());
		state.pending_verification = Some(pending);
		let h = harness(vec![response(400, json!({ "error": "wrong" }))], state);

		let outcome = h
			.client
			.submit_verification("3.00", Some("override".into()))
			.await;
		assert_eq!(outcome.error_code(), Some(ErrorCode::VerificationRequired));
		assert_eq!(
			h.transport.recorded()[0].body,
			Some(json!({ "answer": "3.00", "verification_code": "override" }))
		);

		let state = h.store.snapshot();
		assert_eq!(state.offense_count, 1);
		let pending = state.pending_verification.unwrap();
		assert_eq!(pending.attempt_count, 1);
		assert_eq!(pending.failed_answers, vec!["3.00".to_string()]);
	}

	#[tokio::test]
	async fn manual_verification_blocked_while_suspended() {
		let mut state = GuardState::default();
		state.suspension.active = true;
		let h = harness(vec![], state);

		let outcome = h.client.submit_verification("1.00", None).await;
		assert_eq!(outcome.error_code(), Some(ErrorCode::AccountSuspended));
		assert!(h.transport.recorded().is_empty());
	}

	#[tokio::test]
	async fn network_errors_are_reported() {
		let h = harness(
			vec![NormalizedResponse::network_error("connection refused")],
			GuardState::default(),
		);

		let outcome = h.client.call(ToolRequest::post("create_post", "/posts")).await;
		assert_eq!(outcome.status, Some(0));
		assert_eq!(outcome.error_code(), Some(ErrorCode::NetworkError));
		assert_eq!(h.store.snapshot().last_write_at, None);
	}

	#[tokio::test]
	async fn status_reports_block_and_expiry() {
		let mut state = GuardState::default();
		state.cooldowns.write_until = Some(start() + Duration::seconds(30));
		let h = harness(vec![], state);

		let status = h.client.guard_status().await.unwrap();
		assert!(!status.can_write());
		assert_eq!(
			status.write_block.as_ref().map(GuardBlock::code),
			Some(ErrorCode::WriteCooldownActive)
		);

		h.clock.advance(Duration::seconds(31));
		let status = h.client.guard_status().await.unwrap();
		assert!(status.can_write());
		assert_eq!(h.store.snapshot().cooldowns.write_until, None);
	}

	#[tokio::test]
	async fn safe_mode_toggle_persists() {
		let mut state = GuardState::default();
		state.last_write_at = Some(start());
		let h = harness(vec![response(201, json!({ "id": "p2" }))], state);

		let saved = h.client.set_safe_mode(false).await.unwrap();
		assert!(!saved.safe_mode);
		assert!(!h.store.snapshot().safe_mode);

		let outcome = h.client.call(ToolRequest::post("create_post", "/posts")).await;
		assert!(outcome.ok);
	}
}
