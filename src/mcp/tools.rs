//! Tool and prompt collaborators
//!
//! A [`ToolConfigurator`] registers tools and prompts on a freshly built
//! [`McpServer`]. It never sees the caller's identity directly; everything
//! it needs arrives through the three accessors in [`ToolBindings`]:
//!
//! - the current credential and its expiry,
//! - a downstream client scoped to the caller's organization,
//! - the caller-identification string sent as `User-Agent`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::ado::AdoClient;
use crate::error::Result;
use crate::mcp::server::McpServer;
use crate::mcp::types::{
    CallToolResponse, GetPromptResponse, Implementation, McpTool, MessageContent, Prompt,
    PromptArgument, PromptMessage, Role, ToolAnnotations,
};

/// Tools registered by [`AdoToolConfigurator`].
pub const DEFAULT_TOOL_NAMES: &[&str] = &[
    "core_list_projects",
    "core_list_project_teams",
    "wit_get_work_item",
    "wit_my_work_items",
];

/// Prompts registered by [`AdoToolConfigurator`].
pub const DEFAULT_PROMPT_NAMES: &[&str] = &["summarize_work_item"];

/// A downstream credential with its expiry.
#[derive(Clone)]
pub struct AccessToken {
    /// Bearer string presented downstream
    pub token: String,
    /// When the credential stops being usable
    pub expires_on: DateTime<Utc>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Returns the session's current credential.
pub type CredentialAccessor = Arc<dyn Fn() -> AccessToken + Send + Sync>;

/// Builds a downstream client for the session's organization and credential.
pub type ClientAccessor = Arc<dyn Fn() -> Result<AdoClient> + Send + Sync>;

/// Returns the caller-identification string.
pub type UserAgentAccessor = Arc<dyn Fn() -> String + Send + Sync>;

/// The accessors handed to a [`ToolConfigurator`].
#[derive(Clone)]
pub struct ToolBindings {
    /// Current credential accessor
    pub credential: CredentialAccessor,
    /// Downstream client accessor
    pub client: ClientAccessor,
    /// Caller-identification accessor
    pub user_agent: UserAgentAccessor,
}

impl fmt::Debug for ToolBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolBindings").finish_non_exhaustive()
    }
}

/// Registers tools and prompts on a session's server.
pub trait ToolConfigurator: Send + Sync {
    /// Registers everything this configurator provides.
    ///
    /// # Errors
    ///
    /// Returns an error if the configurator is misconfigured. The caller
    /// treats this as fatal to the one session being built.
    fn configure(&self, server: &mut McpServer, bindings: &ToolBindings) -> Result<()>;
}

/// Composes the `User-Agent` string.
///
/// The peer's client info is appended once the handshake has completed.
///
/// # Examples
///
/// ```
/// use ado_mcp::mcp::tools::compose_user_agent;
/// use ado_mcp::mcp::types::Implementation;
///
/// assert_eq!(compose_user_agent("ado-mcp", "0.1.0", None), "ado-mcp/0.1.0");
///
/// let peer = Implementation {
///     name: "vscode".to_string(),
///     version: "1.90".to_string(),
///     description: None,
/// };
/// assert_eq!(
///     compose_user_agent("ado-mcp", "0.1.0", Some(&peer)),
///     "ado-mcp/0.1.0 (vscode/1.90)"
/// );
/// ```
pub fn compose_user_agent(name: &str, version: &str, peer: Option<&Implementation>) -> String {
    match peer {
        Some(peer) => format!("{}/{} ({}/{})", name, version, peer.name, peer.version),
        None => format!("{}/{}", name, version),
    }
}

// ---------------------------------------------------------------------------
// Default Azure DevOps tools
// ---------------------------------------------------------------------------

/// Registers the read-only Azure DevOps tools and prompts.
#[derive(Debug, Clone, Default)]
pub struct AdoToolConfigurator;

#[derive(Debug, Deserialize)]
struct ListProjectsArgs {
    #[serde(default)]
    top: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProjectArgs {
    project: String,
}

#[derive(Debug, Deserialize)]
struct GetWorkItemArgs {
    id: u64,
    #[serde(default)]
    project: Option<String>,
    #[serde(default)]
    expand: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MyWorkItemsArgs {
    project: String,
    #[serde(default)]
    top: Option<u32>,
}

fn read_only(title: &str) -> Option<ToolAnnotations> {
    Some(ToolAnnotations {
        title: Some(title.to_string()),
        read_only_hint: Some(true),
        open_world_hint: Some(true),
    })
}

fn pretty(value: &impl serde::Serialize) -> Result<CallToolResponse> {
    Ok(CallToolResponse::text(serde_json::to_string_pretty(value)?))
}

impl ToolConfigurator for AdoToolConfigurator {
    fn configure(&self, server: &mut McpServer, bindings: &ToolBindings) -> Result<()> {
        let client = Arc::clone(&bindings.client);
        server.register_tool(
            McpTool {
                name: "core_list_projects".to_string(),
                description: Some("List projects in the organization".to_string()),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "top": {"type": "integer", "description": "Maximum number of projects"}
                    }
                }),
                annotations: read_only("List projects"),
            },
            move |args| {
                let client = Arc::clone(&client);
                async move {
                    let args: ListProjectsArgs = serde_json::from_value(args)?;
                    let projects = client()?.list_projects(args.top).await?;
                    pretty(&projects)
                }
            },
        );

        let client = Arc::clone(&bindings.client);
        server.register_tool(
            McpTool {
                name: "core_list_project_teams".to_string(),
                description: Some("List the teams of a project".to_string()),
                input_schema: json!({
                    "type": "object",
                    "properties": {"project": {"type": "string"}},
                    "required": ["project"]
                }),
                annotations: read_only("List project teams"),
            },
            move |args| {
                let client = Arc::clone(&client);
                async move {
                    let args: ProjectArgs = serde_json::from_value(args)?;
                    let teams = client()?.list_project_teams(&args.project).await?;
                    pretty(&teams)
                }
            },
        );

        let client = Arc::clone(&bindings.client);
        server.register_tool(
            McpTool {
                name: "wit_get_work_item".to_string(),
                description: Some("Get a work item by id".to_string()),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "id": {"type": "integer"},
                        "project": {"type": "string"},
                        "expand": {
                            "type": "string",
                            "enum": ["none", "relations", "fields", "links", "all"]
                        }
                    },
                    "required": ["id"]
                }),
                annotations: read_only("Get work item"),
            },
            move |args| {
                let client = Arc::clone(&client);
                async move {
                    let args: GetWorkItemArgs = serde_json::from_value(args)?;
                    let item = client()?
                        .get_work_item(args.id, args.project.as_deref(), args.expand.as_deref())
                        .await?;
                    pretty(&item)
                }
            },
        );

        let client = Arc::clone(&bindings.client);
        server.register_tool(
            McpTool {
                name: "wit_my_work_items".to_string(),
                description: Some("Open work items assigned to the caller".to_string()),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "project": {"type": "string"},
                        "top": {"type": "integer"}
                    },
                    "required": ["project"]
                }),
                annotations: read_only("My work items"),
            },
            move |args| {
                let client = Arc::clone(&client);
                async move {
                    let args: MyWorkItemsArgs = serde_json::from_value(args)?;
                    let items = client()?.my_work_items(&args.project, args.top).await?;
                    pretty(&items)
                }
            },
        );

        server.register_prompt(
            Prompt {
                name: "summarize_work_item".to_string(),
                description: Some("Summarize a work item and its recent activity".to_string()),
                arguments: Some(vec![
                    PromptArgument {
                        name: "id".to_string(),
                        description: Some("Work item id".to_string()),
                        required: Some(true),
                    },
                    PromptArgument {
                        name: "project".to_string(),
                        description: Some("Project the work item belongs to".to_string()),
                        required: Some(false),
                    },
                ]),
            },
            |args: HashMap<String, String>| async move {
                let id = args.get("id").map(String::as_str).unwrap_or_default();
                let scope = match args.get("project") {
                    Some(project) => format!(" in project {}", project),
                    None => String::new(),
                };
                Ok(GetPromptResponse {
                    description: Some(format!("Summarize work item {}", id)),
                    messages: vec![PromptMessage {
                        role: Role::User,
                        content: MessageContent::Text {
                            text: format!(
                                "Use wit_get_work_item with expand=relations to fetch work item {}{}. \
                                 Summarize its title, state, assignee and open questions.",
                                id, scope
                            ),
                        },
                    }],
                })
            },
        );

        Ok(())
    }
}
