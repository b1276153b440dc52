//! LLM-backed reasoning client
//!
//! Renders a prompt per facet, sends it through a stateless `LlmClient`, and
//! parses the JSON the model is asked to reply with.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::{ReasoningClient, ReasoningError};
use crate::chat::{ChatMessage, ChatRole};
use crate::config::LlmConfig;
use crate::domain::{DurationEstimate, ResourceSuggestion, Strategy, SubTaskDraft, Task};
use crate::llm::{CompletionRequest, LlmClient, Message, create_client};
use crate::prompts::{PromptContext, PromptLoader};

/// Token budget for structured facet replies
const FACET_MAX_TOKENS: u32 = 1500;

/// Token budget for chat replies
const CHAT_MAX_TOKENS: u32 = 800;

pub struct LlmReasoningClient {
    llm: Option<Arc<dyn LlmClient>>,
    prompts: PromptLoader,
    /// Task the chat prompt is framed around
    chat_task: Option<Task>,
}

impl LlmReasoningClient {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: PromptLoader) -> Self {
        debug!("LlmReasoningClient::new: called");
        Self {
            llm: Some(llm),
            prompts,
            chat_task: None,
        }
    }

    /// Build from config; an unconfigured provider yields a client that is not ready
    pub fn from_config(config: &LlmConfig, prompts: PromptLoader) -> Self {
        debug!(provider = %config.provider, "LlmReasoningClient::from_config: called");
        let llm = match create_client(config) {
            Ok(llm) => Some(llm),
            Err(e) if e.is_setup_problem() => {
                info!(error = %e, "Reasoning service not configured, using offline analysis");
                None
            }
            Err(e) => {
                warn!(error = %e, "Reasoning client could not be built, using offline analysis");
                None
            }
        };
        Self {
            llm,
            prompts,
            chat_task: None,
        }
    }

    /// Frame chat turns around this task
    pub fn with_chat_task(mut self, task: Task) -> Self {
        self.chat_task = Some(task);
        self
    }

    fn client(&self) -> Result<&Arc<dyn LlmClient>, ReasoningError> {
        self.llm
            .as_ref()
            .ok_or_else(|| ReasoningError::Unavailable("no LLM client configured".to_string()))
    }

    /// One round trip returning the raw text reply
    async fn ask(&self, system_prompt: String, messages: Vec<Message>, max_tokens: u32) -> Result<String, ReasoningError> {
        let llm = self.client()?;
        let response = llm
            .complete(CompletionRequest {
                system_prompt,
                messages,
                max_tokens,
            })
            .await?;
        debug!(tokens = response.usage.total(), "ask: response received");
        response
            .content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ReasoningError::Parse("empty reply".to_string()))
    }

    async fn ask_json<T: DeserializeOwned>(
        &self,
        template: &str,
        context: &PromptContext,
        instruction: String,
    ) -> Result<T, ReasoningError> {
        debug!(%template, "ask_json: called");
        let system_prompt = self.prompts.render(template, context)?;
        let text = self
            .ask(system_prompt, vec![Message::user(instruction)], FACET_MAX_TOKENS)
            .await?;
        parse_json(&text)
    }
}

/// Parse the first JSON object or array in a reply, tolerating code fences and chatter
pub fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, ReasoningError> {
    let start = text.find(['{', '[']);
    let end = text.rfind(['}', ']']);
    let slice = match (start, end) {
        (Some(s), Some(e)) if e > s => &text[s..=e],
        _ => {
            warn!(len = text.len(), "parse_json: no JSON found in reply");
            return Err(ReasoningError::Parse("no JSON in reply".to_string()));
        }
    };
    serde_json::from_str(slice).map_err(|e| ReasoningError::Parse(e.to_string()))
}

#[async_trait]
impl ReasoningClient for LlmReasoningClient {
    fn is_ready(&self) -> bool {
        self.llm.is_some()
    }

    async fn generate_strategy(&self, task: &Task) -> Result<Strategy, ReasoningError> {
        debug!(task_id = %task.id, "generate_strategy: called");
        let strategy: Strategy = self
            .ask_json(
                "strategy",
                &PromptContext::for_task(task),
                format!("Plan my approach to: {}", task.title),
            )
            .await?;
        if strategy.overview.trim().is_empty() {
            return Err(ReasoningError::Parse("strategy without overview".to_string()));
        }
        Ok(strategy)
    }

    async fn estimate_duration(&self, task: &Task) -> Result<DurationEstimate, ReasoningError> {
        debug!(task_id = %task.id, "estimate_duration: called");
        let estimate: DurationEstimate = self
            .ask_json(
                "duration",
                &PromptContext::for_task(task),
                format!("How long will this take: {}", task.title),
            )
            .await?;
        if estimate.minutes == 0 {
            return Err(ReasoningError::Parse("zero-minute estimate".to_string()));
        }
        Ok(estimate)
    }

    async fn generate_resource_searches(
        &self,
        title: &str,
        context: &str,
        max_results: usize,
    ) -> Result<Vec<ResourceSuggestion>, ReasoningError> {
        debug!(%title, max_results, "generate_resource_searches: called");
        let mut resources: Vec<ResourceSuggestion> = self
            .ask_json(
                "resources",
                &PromptContext::for_search(title, context, max_results),
                format!("Find tutorials for: {}", title),
            )
            .await?;
        resources.retain(|r| !r.query.trim().is_empty());
        resources.truncate(max_results);
        Ok(resources)
    }

    async fn decompose(&self, task: &Task) -> Result<Vec<SubTaskDraft>, ReasoningError> {
        debug!(task_id = %task.id, "decompose: called");
        let mut drafts: Vec<SubTaskDraft> = self
            .ask_json(
                "decompose",
                &PromptContext::for_task(task),
                format!("Break this into steps: {}", task.title),
            )
            .await?;
        drafts.retain(|d| !d.title.trim().is_empty());
        Ok(drafts)
    }

    async fn converse(&self, history: &[ChatMessage], message: &str) -> Result<ChatMessage, ReasoningError> {
        debug!(history_len = history.len(), "converse: called");
        let task = self.chat_task.clone().unwrap_or_else(|| Task::new("chat", "General help"));
        let system_prompt = self.prompts.render("chat", &PromptContext::for_task(&task))?;

        let mut messages: Vec<Message> = history.iter().map(Message::from).collect();
        messages.push(Message::user(message));

        let reply = self.ask(system_prompt, messages, CHAT_MAX_TOKENS).await?;
        Ok(ChatMessage {
            role: ChatRole::Assistant,
            content: reply,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Confidence;
    use crate::llm::client::mock::MockLlmClient;
    use crate::llm::{CompletionResponse, Role};

    fn client_with(texts: &[&str]) -> (Arc<MockLlmClient>, LlmReasoningClient) {
        let mock = Arc::new(MockLlmClient::with_texts(texts));
        let client = LlmReasoningClient::new(mock.clone(), PromptLoader::embedded_only());
        (mock, client)
    }

    #[test]
    fn test_parse_json_strips_fences() {
        let text = "Here you go:\n```json\n{\"minutes\": 20, \"confidence\": \"low\"}\n```";
        let estimate: DurationEstimate = parse_json(text).unwrap();
        assert_eq!(estimate.minutes, 20);
        assert_eq!(estimate.confidence, Confidence::Low);
    }

    #[test]
    fn test_parse_json_without_json() {
        assert!(matches!(
            parse_json::<DurationEstimate>("I cannot help with that"),
            Err(ReasoningError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_generate_strategy() {
        let (mock, client) = client_with(&[
            r#"{"overview": "Outline first", "key_points": ["Be brief"], "steps": ["Open doc"], "estimated_minutes": 40, "confidence": "high"}"#,
        ]);
        let task = Task::new("t1", "Prepare quarterly report");
        let strategy = client.generate_strategy(&task).await.unwrap();

        assert_eq!(strategy.overview, "Outline first");
        assert_eq!(strategy.estimated_minutes, Some(40));
        let requests = mock.requests();
        assert!(requests[0].system_prompt.contains("Prepare quarterly report"));
    }

    #[tokio::test]
    async fn test_generate_strategy_rejects_empty_overview() {
        let (_, client) = client_with(&[r#"{"overview": "  "}"#]);
        let task = Task::new("t1", "x");
        assert!(client.generate_strategy(&task).await.is_err());
    }

    #[tokio::test]
    async fn test_resource_searches_truncated() {
        let (_, client) = client_with(&[
            r#"[{"title": "A", "query": "a"}, {"title": "B", "query": "b"}, {"title": "C", "query": ""}, {"title": "D", "query": "d"}]"#,
        ]);
        let resources = client.generate_resource_searches("Learn", "study", 2).await.unwrap();
        let titles: Vec<_> = resources.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_decompose_parses_drafts() {
        let (_, client) = client_with(&[
            r#"[{"title": "Gather data", "estimated_minutes": 10, "rationale": "inputs first"}, {"title": ""}]"#,
        ]);
        let drafts = client.decompose(&Task::new("t1", "Report")).await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].estimated_minutes, Some(10));
    }

    #[tokio::test]
    async fn test_converse_sends_history_then_message() {
        let (mock, client) = client_with(&["Open the spreadsheet."]);
        let history = vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")];
        let reply = client.converse(&history, "What first?").await.unwrap();

        assert_eq!(reply, ChatMessage::assistant("Open the spreadsheet."));
        let sent = &mock.requests()[0].messages;
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[2].role, Role::User);
        assert_eq!(sent[2].content, "What first?");
    }

    #[tokio::test]
    async fn test_empty_reply_is_an_error() {
        let mock = Arc::new(MockLlmClient::new(vec![CompletionResponse {
            content: None,
            ..CompletionResponse::text("")
        }]));
        let client = LlmReasoningClient::new(mock, PromptLoader::embedded_only());
        assert!(client.converse(&[], "hi").await.is_err());
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let (_, client) = client_with(&[]);
        assert!(matches!(
            client.estimate_duration(&Task::new("t1", "x")).await,
            Err(ReasoningError::Llm(_))
        ));
    }

    #[test]
    fn test_unconfigured_is_not_ready() {
        let config = LlmConfig {
            api_key_env: "TASKCARD_SURELY_UNSET_KEY".to_string(),
            ..Default::default()
        };
        let client = LlmReasoningClient::from_config(&config, PromptLoader::embedded_only());
        assert!(!client.is_ready());
    }
}
