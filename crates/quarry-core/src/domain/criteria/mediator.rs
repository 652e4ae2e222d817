//! Search mediator
//!
//! Connects a query builder to the service that executes searches. Searches
//! may overlap; only the most recently issued one is delivered, older
//! responses resolve to [`SearchOutcome::Stale`] and are dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::entity::Condition;
use super::event::SearchEvent;
use super::query_builder::{QueryBuilder, sanitize_search_tree};
use crate::domain::events::EventPublisher;
use crate::error::{Error, Result};

/// Which form produced the search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Basic,
    Advanced,
    /// Search delegated to an external system
    External,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Advanced => "advanced",
            Self::External => "external",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "basic" => Some(Self::Basic),
            "advanced" => Some(Self::Advanced),
            "external" => Some(Self::External),
            _ => None,
        }
    }
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    Asc,
    #[default]
    Desc,
}

/// Paging and ordering of a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchArguments {
    /// 1-based
    pub page_number: u32,
    pub page_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(default)]
    pub order_direction: OrderDirection,
}

impl Default for SearchArguments {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: 25,
            order_by: None,
            order_direction: OrderDirection::Desc,
        }
    }
}

impl SearchArguments {
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_page_number(mut self, page_number: u32) -> Self {
        self.page_number = page_number;
        self
    }

    pub fn with_order(mut self, order_by: impl Into<String>, direction: OrderDirection) -> Self {
        self.order_by = Some(order_by.into());
        self.order_direction = direction;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub tree: Condition,
}

/// Payload handed to the search service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: SearchQuery,
    pub arguments: SearchArguments,
    pub search_mode: SearchMode,
    /// Object the search runs in the context of
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl SearchRequest {
    /// Request for a sanitized copy of `tree`
    pub fn new(
        tree: &Condition,
        arguments: SearchArguments,
        search_mode: SearchMode,
        context: Option<String>,
    ) -> Self {
        Self {
            query: SearchQuery {
                tree: sanitize_search_tree(tree),
            },
            arguments,
            search_mode,
            context,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchData {
    #[serde(default)]
    pub values: Vec<serde_json::Value>,
    #[serde(default)]
    pub result_size: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub data: SearchData,
}

/// Result of [`SearchMediator::search`]
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Completed(SearchResponse),
    /// A newer search was issued before this one resolved
    Stale,
}

/// Executes searches
#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(&self, request: SearchRequest) -> Result<SearchResponse>;
}

type BeforeSearchCallback = Box<dyn Fn(&SearchRequest) + Send + Sync>;
type SearchCallback = Box<dyn Fn(&SearchResponse) + Send + Sync>;

/// One search session: a criteria tree plus everything needed to run it
pub struct SearchMediator {
    session_id: Uuid,
    builder: QueryBuilder,
    service: Arc<dyn SearchService>,
    arguments: SearchArguments,
    mode: SearchMode,
    context: Option<String>,
    publisher: Option<Arc<dyn EventPublisher>>,
    latest_request: AtomicU64,
    before_search: Vec<BeforeSearchCallback>,
    on_search: Vec<SearchCallback>,
}

impl std::fmt::Debug for SearchMediator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchMediator")
            .field("session_id", &self.session_id)
            .field("mode", &self.mode)
            .field("arguments", &self.arguments)
            .field("latest_request", &self.latest_request)
            .finish_non_exhaustive()
    }
}

impl SearchMediator {
    pub fn new(builder: QueryBuilder, service: Arc<dyn SearchService>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            builder,
            service,
            arguments: SearchArguments::default(),
            mode: SearchMode::default(),
            context: None,
            publisher: None,
            latest_request: AtomicU64::new(0),
            before_search: Vec::new(),
            on_search: Vec::new(),
        }
    }

    pub fn with_arguments(mut self, arguments: SearchArguments) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Record search events through `publisher`
    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    pub fn builder_mut(&mut self) -> &mut QueryBuilder {
        &mut self.builder
    }

    pub fn arguments(&self) -> &SearchArguments {
        &self.arguments
    }

    pub fn arguments_mut(&mut self) -> &mut SearchArguments {
        &mut self.arguments
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SearchMode) {
        self.mode = mode;
    }

    pub fn on_before_search(&mut self, callback: impl Fn(&SearchRequest) + Send + Sync + 'static) {
        self.before_search.push(Box::new(callback));
    }

    /// Called with the response of every search that was not superseded
    pub fn on_search(&mut self, callback: impl Fn(&SearchResponse) + Send + Sync + 'static) {
        self.on_search.push(Box::new(callback));
    }

    /// Request the current tree would be searched with
    pub fn build_request(&self) -> Result<SearchRequest> {
        let tree = self.builder.tree().ok_or(Error::BuilderNotInitialized)?;
        Ok(SearchRequest::new(
            tree,
            self.arguments.clone(),
            self.mode,
            self.context.clone(),
        ))
    }

    /// Mark every search in flight as stale
    pub fn abort_pending(&self) {
        self.latest_request.fetch_add(1, Ordering::SeqCst);
    }

    fn is_latest(&self, request_number: u64) -> bool {
        self.latest_request.load(Ordering::SeqCst) == request_number
    }

    async fn record(&self, event: SearchEvent) -> Result<()> {
        if let Some(publisher) = &self.publisher {
            publisher.publish(&event).await?;
        }
        Ok(())
    }

    /// Run the current tree through the search service
    pub async fn search(&self) -> Result<SearchOutcome> {
        let request = self.build_request()?;
        let request_number = self.latest_request.fetch_add(1, Ordering::SeqCst) + 1;

        for callback in &self.before_search {
            callback(&request);
        }
        self.record(SearchEvent::started(self.session_id, request_number, self.mode.as_str()))
            .await?;
        info!(
            session = %self.session_id,
            request = request_number,
            mode = %self.mode,
            "Search issued"
        );

        let result = self.service.search(request).await;

        if !self.is_latest(request_number) {
            let latest = self.latest_request.load(Ordering::SeqCst);
            warn!(request = request_number, latest, "Discarding response of superseded search");
            self.record(SearchEvent::discarded(self.session_id, request_number, latest))
                .await?;
            return Ok(SearchOutcome::Stale);
        }

        match result {
            Ok(response) => {
                info!(
                    request = request_number,
                    result_size = response.data.result_size,
                    "Search completed"
                );
                self.record(SearchEvent::completed(
                    self.session_id,
                    request_number,
                    response.data.result_size,
                ))
                .await?;
                for callback in &self.on_search {
                    callback(&response);
                }
                Ok(SearchOutcome::Completed(response))
            }
            Err(err) => {
                warn!(request = request_number, error = %err, "Search failed");
                self.record(SearchEvent::failed(self.session_id, request_number, &err.to_string()))
                    .await?;
                Err(err)
            }
        }
    }
}
