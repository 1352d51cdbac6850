//! Azure DevOps REST client
//!
//! Only the read-only operations used by credential validation and the
//! default tools are implemented. A client is always scoped to one
//! organization and one credential; [`AdoClientFactory`] owns the shared
//! HTTP connection pool and mints clients per session.

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::AdoConfig;
use crate::error::{AdoMcpError, Result};

/// Credential presented to the downstream API.
#[derive(Clone, PartialEq, Eq)]
pub enum AdoCredential {
    /// Personal access token, sent as HTTP Basic with an empty user name
    Pat(String),
    /// OAuth access token, sent as a Bearer header
    Bearer(String),
}

impl AdoCredential {
    /// `Authorization` header value for this credential.
    ///
    /// # Examples
    ///
    /// ```
    /// use ado_mcp::ado::AdoCredential;
    ///
    /// let bearer = AdoCredential::Bearer("abc".to_string());
    /// assert_eq!(bearer.authorization_header(), "Bearer abc");
    ///
    /// // base64(":pat")
    /// let pat = AdoCredential::Pat("pat".to_string());
    /// assert_eq!(pat.authorization_header(), "Basic OnBhdA==");
    /// ```
    pub fn authorization_header(&self) -> String {
        match self {
            Self::Pat(token) => format!("Basic {}", STANDARD.encode(format!(":{}", token))),
            Self::Bearer(token) => format!("Bearer {}", token),
        }
    }
}

impl fmt::Debug for AdoCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pat(_) => f.write_str("Pat(<redacted>)"),
            Self::Bearer(_) => f.write_str("Bearer(<redacted>)"),
        }
    }
}

/// A team project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamProject {
    /// Project GUID
    pub id: String,
    /// Project name
    pub name: String,
    /// Free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Lifecycle state (`wellFormed`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Visibility (`private`, `public`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
}

/// A team within a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebApiTeam {
    /// Team GUID
    pub id: String,
    /// Team name
    pub name: String,
    /// Free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Reference returned by a WIQL query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItemReference {
    /// Work item id
    pub id: u64,
    /// REST URL of the work item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WiqlResponse {
    #[serde(default)]
    work_items: Vec<WorkItemReference>,
}

/// Builds organization-scoped [`AdoClient`]s over a shared connection pool.
#[derive(Debug, Clone)]
pub struct AdoClientFactory {
    http: reqwest::Client,
    api_base: Url,
    api_version: String,
}

impl AdoClientFactory {
    /// Creates a factory from the `ado` config section.
    ///
    /// # Errors
    ///
    /// Returns [`AdoMcpError::Config`] if `api_base` is not a valid base URL,
    /// or an HTTP error if the client cannot be built.
    pub fn new(config: &AdoConfig) -> Result<Self> {
        let api_base = Url::parse(&config.api_base)
            .map_err(|e| AdoMcpError::Config(format!("Invalid ado.api_base: {}", e)))?;
        if api_base.cannot_be_a_base() {
            return Err(AdoMcpError::Config("ado.api_base cannot be a base URL".to_string()).into());
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            api_base,
            api_version: config.api_version.clone(),
        })
    }

    /// Creates a client for one organization and credential.
    ///
    /// # Arguments
    ///
    /// * `organization` - Organization name; becomes the first path segment
    /// * `credential` - Credential sent with every call
    /// * `user_agent` - `User-Agent` header value
    pub fn create(&self, organization: &str, credential: AdoCredential, user_agent: &str) -> AdoClient {
        AdoClient {
            http: self.http.clone(),
            api_base: self.api_base.clone(),
            api_version: self.api_version.clone(),
            organization: organization.to_string(),
            credential,
            user_agent: user_agent.to_string(),
        }
    }
}

/// Client for one organization, authenticated with one credential.
#[derive(Debug, Clone)]
pub struct AdoClient {
    http: reqwest::Client,
    api_base: Url,
    api_version: String,
    organization: String,
    credential: AdoCredential,
    user_agent: String,
}

impl AdoClient {
    /// Organization this client is scoped to.
    pub fn organization(&self) -> &str {
        &self.organization
    }

    /// `User-Agent` sent with every call.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Lists projects in the organization.
    ///
    /// # Arguments
    ///
    /// * `top` - Maximum number of projects to return
    ///
    /// # Errors
    ///
    /// Returns [`AdoMcpError::Downstream`]; `status` is `None` when the API
    /// could not be reached.
    pub async fn list_projects(&self, top: Option<u32>) -> Result<Vec<TeamProject>> {
        let mut url = self.endpoint(&["_apis", "projects"])?;
        if let Some(top) = top {
            url.query_pairs_mut().append_pair("$top", &top.to_string());
        }
        let body: ListResponse<TeamProject> = self.get_json(url).await?;
        Ok(body.value)
    }

    /// Lists the teams of a project.
    pub async fn list_project_teams(&self, project: &str) -> Result<Vec<WebApiTeam>> {
        let url = self.endpoint(&["_apis", "projects", project, "teams"])?;
        let body: ListResponse<WebApiTeam> = self.get_json(url).await?;
        Ok(body.value)
    }

    /// Fetches one work item.
    ///
    /// # Arguments
    ///
    /// * `id` - Work item id
    /// * `project` - Optional project scope
    /// * `expand` - Optional `$expand` value (`relations`, `fields`, `all`, ...)
    pub async fn get_work_item(
        &self,
        id: u64,
        project: Option<&str>,
        expand: Option<&str>,
    ) -> Result<serde_json::Value> {
        let id = id.to_string();
        let mut url = match project {
            Some(project) => self.endpoint(&[project, "_apis", "wit", "workitems", &id])?,
            None => self.endpoint(&["_apis", "wit", "workitems", &id])?,
        };
        if let Some(expand) = expand {
            url.query_pairs_mut().append_pair("$expand", expand);
        }
        self.get_json(url).await
    }

    /// Work items assigned to the caller that are not closed.
    pub async fn my_work_items(&self, project: &str, top: Option<u32>) -> Result<Vec<WorkItemReference>> {
        let mut url = self.endpoint(&[project, "_apis", "wit", "wiql"])?;
        if let Some(top) = top {
            url.query_pairs_mut().append_pair("$top", &top.to_string());
        }
        let query = serde_json::json!({
            "query": "SELECT [System.Id] FROM WorkItems \
                      WHERE [System.TeamProject] = @project \
                      AND [System.AssignedTo] = @Me \
                      AND [System.State] <> 'Closed' \
                      ORDER BY [System.ChangedDate] DESC"
        });

        tracing::debug!(organization = %self.organization, project, "Running WIQL query");
        let response = self
            .authorized(self.http.post(url))
            .json(&query)
            .send()
            .await
            .map_err(unreachable)?;
        let body: WiqlResponse = decode(response).await?;
        Ok(body.work_items)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| AdoMcpError::Config("ado.api_base cannot be a base URL".to_string()))?
            .pop_if_empty()
            .push(&self.organization)
            .extend(segments);
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header(AUTHORIZATION, self.credential.authorization_header())
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json")
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        tracing::debug!(organization = %self.organization, path = url.path(), "GET");
        let response = self
            .authorized(self.http.get(url))
            .send()
            .await
            .map_err(unreachable)?;
        decode(response).await
    }
}

fn unreachable(e: reqwest::Error) -> anyhow::Error {
    AdoMcpError::Downstream {
        status: None,
        message: e.to_string(),
    }
    .into()
}

async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AdoMcpError::Downstream {
            status: Some(status.as_u16()),
            message: body.chars().take(200).collect(),
        }
        .into());
    }
    response.json::<T>().await.map_err(|e| {
        AdoMcpError::Downstream {
            status: Some(status.as_u16()),
            message: format!("invalid response body: {}", e),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn factory(base: &str) -> AdoClientFactory {
        AdoClientFactory::new(&AdoConfig {
            api_base: base.to_string(),
            api_version: "7.1".to_string(),
            request_timeout_seconds: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_credential_debug_redacts() {
        let debug = format!("{:?}", AdoCredential::Pat("super-secret".to_string()));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_factory_rejects_invalid_base() {
        let result = AdoClientFactory::new(&AdoConfig {
            api_base: "not a url".to_string(),
            ..AdoConfig::default()
        });
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_list_projects_sends_pat_as_basic() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/contoso/_apis/projects"))
            .and(query_param("api-version", "7.1"))
            .and(query_param("$top", "1"))
            .and(header("authorization", "Basic OnBhdA=="))
            .and(header("user-agent", "ado-mcp/test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "count": 1,
                "value": [{"id": "p1", "name": "Fabrikam"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = factory(&server.uri()).create(
            "contoso",
            AdoCredential::Pat("pat".to_string()),
            "ado-mcp/test",
        );
        let projects = client.list_projects(Some(1)).await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "Fabrikam");
    }

    #[tokio::test]
    async fn test_non_success_maps_to_downstream_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = factory(&server.uri()).create(
            "contoso",
            AdoCredential::Bearer("tok".to_string()),
            "ua",
        );
        let err = client.list_projects(None).await.unwrap_err();
        match err.downcast_ref::<AdoMcpError>() {
            Some(AdoMcpError::Downstream { status, .. }) => assert_eq!(*status, Some(401)),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_maps_to_no_status() {
        // Nothing listens on port 9 locally
        let client = factory("http://127.0.0.1:9").create(
            "contoso",
            AdoCredential::Pat("pat".to_string()),
            "ua",
        );
        let err = client.list_projects(None).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AdoMcpError>(),
            Some(AdoMcpError::Downstream { status: None, .. })
        ));
    }

    #[tokio::test]
    async fn test_get_work_item_with_project_and_expand() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/contoso/Fabrikam/_apis/wit/workitems/42"))
            .and(query_param("$expand", "relations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 42,
                "fields": {"System.Title": "Fix login"}
            })))
            .mount(&server)
            .await;

        let client = factory(&server.uri()).create(
            "contoso",
            AdoCredential::Bearer("tok".to_string()),
            "ua",
        );
        let item = client
            .get_work_item(42, Some("Fabrikam"), Some("relations"))
            .await
            .unwrap();
        assert_eq!(item["fields"]["System.Title"], "Fix login");
    }

    #[tokio::test]
    async fn test_my_work_items_posts_wiql() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/contoso/Fabrikam/_apis/wit/wiql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "workItems": [{"id": 1}, {"id": 2}]
            })))
            .mount(&server)
            .await;

        let client = factory(&server.uri()).create(
            "contoso",
            AdoCredential::Pat("pat".to_string()),
            "ua",
        );
        let items = client.my_work_items("Fabrikam", None).await.unwrap();
        assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_project_names_are_path_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/contoso/_apis/projects/My%20Project/teams"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [{"id": "t1", "name": "Team A"}]
            })))
            .mount(&server)
            .await;

        let client = factory(&server.uri()).create(
            "contoso",
            AdoCredential::Pat("pat".to_string()),
            "ua",
        );
        let teams = client.list_project_teams("My Project").await.unwrap();
        assert_eq!(teams[0].name, "Team A");
    }
}
