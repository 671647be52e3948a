//! Lineage API client and notifying mutation wrappers
//!
//! [`LineageApi`] is the seam between view code and the catalog server. Mutations go
//! through [`LineageMutations`], which makes exactly one attempt, notifies the user once
//! on failure and hands the same error back so the caller can revert optimistic state.
//! Concurrent calls are not ordered against each other.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::errors::{ApiError, ApiResult};
use crate::model::{AddLineage, EdgeData, EntityLineage, EntityType};
use crate::notify::{Message, Notifier};

/// Who is calling and where. Read-only once built, passed to the client explicitly.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionContext {
    pub base_url: Url,
    pub token: Option<String>,
    pub user: Option<String>,
}

impl SessionContext {
    pub fn new(base_url: &str) -> ApiResult<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            token: None,
            user: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

#[async_trait]
pub trait LineageApi: Send + Sync {
    async fn get_lineage(
        &self,
        entity_type: EntityType,
        fqn: &str,
        upstream_depth: u32,
        downstream_depth: u32,
    ) -> ApiResult<EntityLineage>;

    async fn add_lineage(&self, request: &AddLineage) -> ApiResult<()>;

    async fn delete_lineage_edge(&self, edge: &EdgeData) -> ApiResult<()>;
}

/// [`LineageApi`] over the catalog's REST endpoints
pub struct HttpLineageClient {
    http: Client,
    session: SessionContext,
}

impl HttpLineageClient {
    pub fn new(session: SessionContext, timeout: Duration) -> ApiResult<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, session })
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.session.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(["api", "v1", "lineage"])
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.session.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(response: Response) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl LineageApi for HttpLineageClient {
    async fn get_lineage(
        &self,
        entity_type: EntityType,
        fqn: &str,
        upstream_depth: u32,
        downstream_depth: u32,
    ) -> ApiResult<EntityLineage> {
        let mut url = self.endpoint(&[entity_type.as_str(), "name", fqn])?;
        url.query_pairs_mut()
            .append_pair("upstreamDepth", &upstream_depth.to_string())
            .append_pair("downstreamDepth", &downstream_depth.to_string());
        debug!("GET {}", url);

        let response = self.authorize(self.http.get(url)).send().await?;
        let body = Self::check(response).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn add_lineage(&self, request: &AddLineage) -> ApiResult<()> {
        let url = self.endpoint(&[])?;
        debug!(
            "PUT {} ({} -> {})",
            url, request.edge.from_entity.id, request.edge.to_entity.id
        );

        let response = self.authorize(self.http.put(url)).json(request).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_lineage_edge(&self, edge: &EdgeData) -> ApiResult<()> {
        let url = self.endpoint(&[
            edge.from_entity.as_str(),
            &edge.from_id,
            edge.to_entity.as_str(),
            &edge.to_id,
        ])?;
        debug!("DELETE {}", url);

        let response = self.authorize(self.http.delete(url)).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}

const LINEAGE_LABEL: &str = "Lineage";

/// Lineage calls that report failures to the user before returning them
pub struct LineageMutations<A, N> {
    api: A,
    notifier: N,
}

impl<A, N> LineageMutations<A, N>
where
    A: LineageApi,
    N: Notifier,
{
    pub fn new(api: A, notifier: N) -> Self {
        Self { api, notifier }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub async fn add_lineage_edge(&self, request: &AddLineage) -> ApiResult<()> {
        self.api.add_lineage(request).await.inspect_err(|err| {
            self.notifier.error(
                err,
                &Message::AddEntityError {
                    entity: LINEAGE_LABEL.to_string(),
                },
            )
        })?;
        info!(
            "Added lineage {} -> {}",
            request.edge.from_entity.id, request.edge.to_entity.id
        );
        Ok(())
    }

    pub async fn remove_lineage_edge(&self, edge: &EdgeData) -> ApiResult<()> {
        self.api.delete_lineage_edge(edge).await.inspect_err(|err| {
            self.notifier.error(
                err,
                &Message::DeleteEntityError {
                    entity: LINEAGE_LABEL.to_string(),
                },
            )
        })?;
        info!("Removed lineage {} -> {}", edge.from_id, edge.to_id);
        Ok(())
    }

    pub async fn fetch_lineage(
        &self,
        entity_type: EntityType,
        fqn: &str,
        upstream_depth: u32,
        downstream_depth: u32,
    ) -> ApiResult<EntityLineage> {
        self.api
            .get_lineage(entity_type, fqn, upstream_depth, downstream_depth)
            .await
            .inspect_err(|err| {
                self.notifier.error(
                    err,
                    &Message::FetchError {
                        entity: LINEAGE_LABEL.to_string(),
                    },
                )
            })
    }
}
