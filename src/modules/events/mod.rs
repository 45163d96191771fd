//! Event system for the guarded client.
//!
//! Provides hooks for logging and custom reactions around guarded calls.

use chrono::{DateTime, Utc};
use http::Method;
use std::sync::Arc;
use std::time::Duration;

use crate::outcome::ErrorCode;

/// Outgoing request, emitted once the guard lets a call through.
#[derive(Debug, Clone)]
pub struct RequestEvent {
    pub tool: String,
    pub method: Method,
    pub path: String,
    pub mutating: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ResponseEvent {
    pub tool: String,
    pub method: Method,
    pub path: String,
    pub status: u16,
    pub latency: Duration,
    pub timestamp: DateTime<Utc>,
}

/// Call refused locally.
#[derive(Debug, Clone)]
pub struct BlockedEvent {
    pub tool: String,
    pub code: ErrorCode,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ChallengeEvent {
    pub tool: String,
    pub answer: Option<String>,
    pub verified: bool,
    pub manual: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ErrorEvent {
    pub tool: String,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum GuardEvent {
    Request(RequestEvent),
    Response(ResponseEvent),
    Blocked(BlockedEvent),
    Challenge(ChallengeEvent),
    Error(ErrorEvent),
}

/// Trait implemented by event handlers.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &GuardEvent);
}

/// Dispatcher that broadcasts events to registered handlers.
#[derive(Default, Clone)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    pub fn register_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn dispatch(&self, event: GuardEvent) {
        for handler in &self.handlers {
            handler.handle(&event);
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Logs events using the `log` crate.
#[derive(Debug)]
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn handle(&self, event: &GuardEvent) {
        match event {
            GuardEvent::Request(request) => {
                log::debug!(
                    "-> {} {} {} (mutating={})",
                    request.tool,
                    request.method,
                    request.path,
                    request.mutating
                );
            }
            GuardEvent::Response(response) => {
                log::debug!(
                    "<- {} {} {} -> {} ({:.2}s)",
                    response.tool,
                    response.method,
                    response.path,
                    response.status,
                    response.latency.as_secs_f64()
                );
            }
            GuardEvent::Blocked(blocked) => {
                log::info!("blocked {} [{}]: {}", blocked.tool, blocked.code, blocked.message);
            }
            GuardEvent::Challenge(challenge) => {
                log::info!(
                    "verification {} answer={} verified={} manual={}",
                    challenge.tool,
                    challenge.answer.as_deref().unwrap_or("-"),
                    challenge.verified,
                    challenge.manual
                );
            }
            GuardEvent::Error(error) => {
                log::warn!("warning {} -> {}", error.tool, error.error);
            }
        }
    }
}
