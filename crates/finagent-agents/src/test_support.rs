//! Test doubles for backends, tools and agents.
//!
//! These are public so downstream crates can drive the pipeline end to end
//! without a model, network access or the Claude CLI.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use finagent_models::{ToolOutput, Turn};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::agent::Agent;
use crate::backend::{BackendMessage, ReasoningBackend};
use crate::error::{AgentError, ToolError};
use crate::tools::{ToolCapability, ToolInputSchema};

/// A backend that replays a fixed script of replies, one per call.
///
/// Once the script runs out every further call fails.
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, String>>>,
    transcripts: Mutex<Vec<Vec<BackendMessage>>>,
    always_fail: Option<String>,
}

impl ScriptedBackend {
    pub fn new<'a>(replies: impl IntoIterator<Item = &'a str>) -> Arc<Self> {
        Self::from_results(replies.into_iter().map(|r| Ok(r.to_string())))
    }

    /// Replies where `Err` entries fail that call with a backend error.
    pub fn from_results(replies: impl IntoIterator<Item = Result<String, String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            transcripts: Mutex::new(Vec::new()),
            always_fail: None,
        })
    }

    /// A backend that is never reachable.
    pub fn failing(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            transcripts: Mutex::new(Vec::new()),
            always_fail: Some(reason.to_string()),
        })
    }

    pub async fn calls(&self) -> usize {
        self.transcripts.lock().await.len()
    }

    /// Transcript sent with the most recent call.
    pub async fn last_transcript(&self) -> Vec<BackendMessage> {
        self.transcripts
            .lock()
            .await
            .last()
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ReasoningBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        _system_prompt: &str,
        messages: &[BackendMessage],
    ) -> Result<String, AgentError> {
        self.transcripts.lock().await.push(messages.to_vec());

        if let Some(reason) = &self.always_fail {
            return Err(AgentError::Backend(reason.clone()));
        }

        match self.replies.lock().await.pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(reason)) => Err(AgentError::Backend(reason)),
            None => Err(AgentError::Backend("script exhausted".to_string())),
        }
    }
}

/// A tool with a canned result that records every input it receives.
pub struct MockTool {
    name: String,
    result: Result<ToolOutput, String>,
    inputs: Mutex<Vec<Value>>,
}

impl MockTool {
    pub fn new(name: &str, result: Result<ToolOutput, String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            result,
            inputs: Mutex::new(Vec::new()),
        })
    }

    pub fn text(name: &str, output: &str) -> Arc<Self> {
        Self::new(name, Ok(ToolOutput::Text(output.to_string())))
    }

    /// Fails every call with `ToolError::Malformed(reason)`.
    pub fn failing(name: &str, reason: &str) -> Arc<Self> {
        Self::new(name, Err(reason.to_string()))
    }

    pub async fn inputs(&self) -> Vec<Value> {
        self.inputs.lock().await.clone()
    }
}

#[async_trait]
impl ToolCapability for MockTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Mock tool"
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::FreeText
    }

    async fn invoke(&self, input: &Value) -> Result<ToolOutput, ToolError> {
        self.inputs.lock().await.push(input.clone());
        self.result.clone().map_err(ToolError::Malformed)
    }
}

/// An agent with a canned answer that records the context of each run.
pub struct MockAgent {
    name: String,
    answer: Result<String, String>,
    queries: Mutex<Vec<String>>,
    contexts: Mutex<Vec<Option<String>>>,
}

impl MockAgent {
    pub fn answering(name: &str, answer: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            answer: Ok(answer.to_string()),
            queries: Mutex::new(Vec::new()),
            contexts: Mutex::new(Vec::new()),
        })
    }

    /// Fails every run with `AgentError::Unavailable`.
    pub fn failing(name: &str, reason: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            answer: Err(reason.to_string()),
            queries: Mutex::new(Vec::new()),
            contexts: Mutex::new(Vec::new()),
        })
    }

    /// Context received by each run, in call order.
    pub async fn contexts(&self) -> Vec<Option<String>> {
        self.contexts.lock().await.clone()
    }

    /// Query text received by each run, in call order.
    pub async fn queries(&self) -> Vec<String> {
        self.queries.lock().await.clone()
    }

    pub async fn runs(&self) -> usize {
        self.contexts.lock().await.len()
    }
}

#[async_trait]
impl Agent for MockAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, query: &str, context: Option<&str>) -> Result<Turn, AgentError> {
        self.queries.lock().await.push(query.to_string());
        self.contexts.lock().await.push(context.map(str::to_string));

        match &self.answer {
            Ok(answer) => {
                let mut turn = Turn::new(&self.name, query, context);
                turn.answer = answer.clone();
                Ok(turn)
            }
            Err(reason) => Err(AgentError::Unavailable {
                agent: self.name.clone(),
                reason: reason.clone(),
            }),
        }
    }
}
