//! The orchestrator: one signed-in user, one conversation.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use copilot_auth::CredentialApi;
use copilot_core::{BatchRequestItem, CredentialSession};
use copilot_fetch::{EventCallback, RequestExecutor, RetryPolicy};
use copilot_store::AppSettings;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::batch::{BatchBuilder, BatchPlan};
use crate::chat::{ChatApi, ChatOutcome};
use crate::error::ServiceError;
use crate::interactions::InteractionsApi;
use crate::retrieval::RetrievalApi;
use crate::search::{NextLink, SearchApi};

/// Chat, search, retrieval and batch calls for one signed-in user.
///
/// Every call validates its input first, then acquires a bearer token, then
/// talks to the API. Invalid input never reaches the network.
pub struct CopilotService {
    credentials: Arc<dyn CredentialApi>,
    executor: Arc<RequestExecutor>,
    chat: ChatApi,
    search: SearchApi,
    retrieval: RetrievalApi,
    interactions: InteractionsApi,
    batch_path: String,
}

impl fmt::Debug for CopilotService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CopilotService")
            .field("base_url", &self.executor.base_url())
            .field("conversation_id", &self.chat.conversation_id())
            .field("batch_path", &self.batch_path)
            .finish_non_exhaustive()
    }
}

impl CopilotService {
    /// Creates a service from validated settings.
    pub fn new(settings: &AppSettings, credentials: Arc<dyn CredentialApi>) -> Result<Self, ServiceError> {
        let timeout = Duration::from_secs(settings.timeout_seconds);
        let executor = RequestExecutor::new(
            settings.base_url.as_str(),
            timeout,
            RetryPolicy::new(settings.retry_attempts),
        )?;
        Ok(Self::with_executor(settings, credentials, executor))
    }

    /// Creates a service around an existing executor.
    pub fn with_executor(
        settings: &AppSettings,
        credentials: Arc<dyn CredentialApi>,
        executor: RequestExecutor,
    ) -> Self {
        let executor = Arc::new(executor);
        Self {
            credentials,
            chat: ChatApi::new(
                Arc::clone(&executor),
                settings.chat_path.as_str(),
                settings.time_zone.clone(),
            ),
            search: SearchApi::new(Arc::clone(&executor), settings.search_path.as_str()),
            retrieval: RetrievalApi::new(Arc::clone(&executor), settings.retrieval_path.as_str()),
            interactions: InteractionsApi::new(
                Arc::clone(&executor),
                settings.ai_interactions_path.as_str(),
            ),
            batch_path: settings.batch_path.clone(),
            executor,
        }
    }

    /// The conversation id, once the first chat created it.
    pub fn conversation_id(&self) -> Option<&str> {
        self.chat.conversation_id()
    }

    // ========================================================================
    // Credentials
    // ========================================================================

    /// Describes the signed-in account.
    pub async fn session_state(&self) -> CredentialSession {
        self.credentials.session_state().await
    }

    /// Signs in, reusing a cached account when possible.
    pub async fn sign_in(&self) -> Result<CredentialSession, ServiceError> {
        Ok(self.credentials.sign_in().await?)
    }

    /// Signs out and erases the token cache.
    pub async fn sign_out(&self) -> Result<(), ServiceError> {
        Ok(self.credentials.sign_out().await?)
    }

    async fn token(&self) -> Result<String, ServiceError> {
        Ok(self.credentials.acquire_access_token().await?)
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Sends a chat message.
    ///
    /// With `useStream` set in the payload, `on_event` is called for every
    /// streamed event in arrival order.
    #[instrument(skip_all)]
    pub async fn send_chat(
        &self,
        payload: &Value,
        on_event: Option<EventCallback<'_>>,
    ) -> Result<ChatOutcome, ServiceError> {
        let prepared = self.chat.prepare(payload)?;
        let token = self.token().await?;
        self.chat.send(&token, &prepared, on_event).await
    }

    /// Runs a search.
    #[instrument(skip_all)]
    pub async fn run_search(&self, payload: &Value) -> Result<Value, ServiceError> {
        SearchApi::validate(payload)?;
        let token = self.token().await?;
        Ok(self.search.search(&token, payload).await?)
    }

    /// Fetches the next search page.
    #[instrument(skip(self))]
    pub async fn run_search_next_page(&self, next_link: &str) -> Result<Value, ServiceError> {
        let link = NextLink::parse(next_link)?;
        let token = self.token().await?;
        Ok(self.search.next_page(&token, &link).await?)
    }

    /// Runs a retrieval.
    #[instrument(skip_all)]
    pub async fn run_retrieval(&self, payload: &Value) -> Result<Value, ServiceError> {
        RetrievalApi::validate(payload)?;
        let token = self.token().await?;
        Ok(self.retrieval.retrieve(&token, payload).await?)
    }

    /// Submits a batch of chat, search and retrieval operations.
    ///
    /// The batch response is returned as-is.
    #[instrument(skip_all)]
    pub async fn run_batch(&self, payload: &Value) -> Result<Value, ServiceError> {
        let plan = BatchPlan::from_payload(payload)?;
        let chat_body = plan.chat.as_ref().map(|chat| self.chat.normalize(chat)).transpose()?;
        debug!(operations = ?plan.operations(), "Composing batch");

        let token = self.token().await?;
        let mut builder = BatchBuilder::new();

        if let Some(body) = chat_body {
            let conversation_id = self.chat.ensure_conversation(&token).await?;
            let url = self.chat.chat_path_for(conversation_id);
            builder.push_with(|id| BatchRequestItem::post_json(id, url, body));
        }
        if let Some(search) = &plan.search {
            builder.push_with(|id| self.search.batch_item(id, search));
        }
        if let Some(retrieval) = &plan.retrieval {
            builder.push_with(|id| self.retrieval.batch_item(id, retrieval));
        }

        debug!(requests = builder.len(), path = %self.batch_path, "Submitting batch");
        Ok(self
            .executor
            .post_json(&token, &self.batch_path, &builder.into_body())
            .await?)
    }

    /// Lists the signed-in user's enterprise AI interactions.
    #[instrument(skip(self))]
    pub async fn get_ai_interactions(
        &self,
        top: Option<u32>,
        filter: Option<&str>,
    ) -> Result<Value, ServiceError> {
        let token = self.token().await?;
        let user_id = self
            .credentials
            .user_id()
            .await
            .ok_or(ServiceError::MissingUserId)?;
        Ok(self
            .interactions
            .get_all_enterprise_interactions(&token, &user_id, top, filter)
            .await?)
    }
}
