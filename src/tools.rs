//! Tool-style requests and their classification.

use std::collections::HashSet;

use http::Method;
use serde_json::Value;

use crate::challenges::core::RequestParts;

/// Tools treated as mutating when a request does not say otherwise.
pub const DEFAULT_WRITE_TOOLS: &[&str] = &[
    "create_post",
    "delete_post",
    "create_comment",
    "delete_comment",
    "upvote_post",
    "downvote_post",
    "upvote_comment",
    "downvote_comment",
    "follow_agent",
    "unfollow_agent",
    "subscribe_submolt",
    "unsubscribe_submolt",
    "update_profile",
];

/// A named operation mapped onto one HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolRequest {
    pub tool: String,
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Explicit classification; `None` defers to the write-tool set.
    pub mutating: Option<bool>,
}

impl ToolRequest {
    pub fn new(tool: impl Into<String>, method: Method, path: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            mutating: None,
        }
    }

    pub fn get(tool: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(tool, Method::GET, path)
    }

    pub fn post(tool: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(tool, Method::POST, path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_mutating(mut self, mutating: bool) -> Self {
        self.mutating = Some(mutating);
        self
    }

    pub(crate) fn parts(&self) -> RequestParts {
        RequestParts {
            query: self.query.clone(),
            body: self.body.clone(),
        }
    }
}

/// Category-specific cooldown slot a tool feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownCategory {
    Post,
    Comment,
}

impl CooldownCategory {
    /// `post` is checked first, so `upvote_post` maps to posts and
    /// `upvote_comment` to comments.
    pub fn for_tool(tool: &str) -> Option<Self> {
        let tool = tool.to_ascii_lowercase();
        if tool.contains("post") {
            Some(CooldownCategory::Post)
        } else if tool.contains("comment") {
            Some(CooldownCategory::Comment)
        } else {
            None
        }
    }
}

/// The configured set of mutating tool names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolClassifier {
    write_tools: HashSet<String>,
}

impl ToolClassifier {
    pub fn new<I, S>(write_tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            write_tools: write_tools.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_mutating(&self, request: &ToolRequest) -> bool {
        request
            .mutating
            .unwrap_or_else(|| self.write_tools.contains(&request.tool))
    }
}

impl Default for ToolClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_WRITE_TOOLS.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_uses_write_set() {
        let classifier = ToolClassifier::default();
        assert!(classifier.is_mutating(&ToolRequest::post("create_post", "/posts")));
        assert!(!classifier.is_mutating(&ToolRequest::get("get_feed", "/feed")));
    }

    #[test]
    fn explicit_flag_overrides() {
        let classifier = ToolClassifier::default();
        let read = ToolRequest::post("create_post", "/posts").with_mutating(false);
        let write = ToolRequest::post("pin_thread", "/threads/1/pin").with_mutating(true);
        assert!(!classifier.is_mutating(&read));
        assert!(classifier.is_mutating(&write));
    }

    #[test]
    fn categories_prefer_post() {
        assert_eq!(CooldownCategory::for_tool("create_post"), Some(CooldownCategory::Post));
        assert_eq!(CooldownCategory::for_tool("upvote_post"), Some(CooldownCategory::Post));
        assert_eq!(
            CooldownCategory::for_tool("create_comment"),
            Some(CooldownCategory::Comment)
        );
        assert_eq!(
            CooldownCategory::for_tool("delete_post_comment"),
            Some(CooldownCategory::Post)
        );
        assert_eq!(CooldownCategory::for_tool("follow_agent"), None);
    }
}
