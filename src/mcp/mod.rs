//! MCP (Model Context Protocol) server implementation.
//!
//! This module exposes the ledger's action boundary as tools for AI agent integration. The server
//! communicates via JSON-RPC over stdio.

mod mcp_utils;
mod tools;

use crate::actions::{Actions, RouteRevalidator};
use crate::model::Participants;
use crate::{clock, Config, Mode};
use anyhow::Context;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo};
use rmcp::transport::stdio;
use rmcp::{tool_handler, ServerHandler, ServiceExt};
use std::sync::Arc;
use tracing::info;

const INSTRUCTIONS: &str = "\
This server manages a shared expense ledger for two people.

Each transaction has an id, a date (YYYY-MM-DD), an amount in whole currency units, a category, a \
merchant, a consumer, a type (income or expense) and an optional memo. The consumer is one of the \
two participants or the shared label. Expenses need one of the configured categories.

Use fetch_transactions to read, optionally for one month (YYYY-MM). create_transaction generates an \
id when none is given. update_transaction replaces every field of an existing transaction, so fetch \
it first and send all fields back. delete_transaction removes a transaction by id.";

/// The ledger MCP server.
#[derive(Debug, Clone)]
pub struct LedgerServer {
    actions: Arc<Actions>,
    routes: Arc<RouteRevalidator>,
    participants: Arc<Participants>,
    tool_router: ToolRouter<LedgerServer>,
}

impl LedgerServer {
    /// Creates a server over the action boundary that `config` selects.
    pub async fn new(config: &Config, mode: Mode) -> crate::Result<Self> {
        let routes = Arc::new(RouteRevalidator::default());
        let actions = Actions::open(config, mode, clock::system(), routes.clone()).await?;
        Ok(Self {
            actions: Arc::new(actions),
            routes,
            participants: Arc::new(config.participants().clone()),
            tool_router: Self::tool_router(),
        })
    }
}

#[tool_handler]
impl ServerHandler for LedgerServer {
    /// Returns server information sent to the MCP client during initialization.
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "couple-ledger".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(INSTRUCTIONS.into()),
        }
    }
}

/// Transport type for the MCP server.
#[derive(Debug, Default)]
pub(crate) enum Io {
    #[default]
    Stdio,
    /// Mock transport for testing - holds one end of a duplex channel.
    #[cfg(test)]
    Mock(tokio::io::DuplexStream),
}

/// Runs the MCP server with stdio transport or mock transport. This function starts the MCP server
/// and blocks until the client disconnects or an error occurs.
///
/// # Arguments
/// - `config`: The `Config` object
/// - `mode`: Whether we are running with a live Google sheet or with a test sheet
/// - `io`: Whether we are using stdio as the transport or using mock io for testing
///
pub(crate) async fn run_server(config: Config, mode: Mode, io: Io) -> crate::Result<()> {
    let server = LedgerServer::new(&config, mode)
        .await
        .context("Unable to set up the MCP server")?;
    info!("Starting MCP server...");

    let service = match io {
        Io::Stdio => server
            .serve(stdio())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start MCP server: {e}"))?,
        #[cfg(test)]
        Io::Mock(stream) => server
            .serve(stream)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start MCP server: {e}"))?,
    };

    info!("MCP server running, waiting for requests...");

    service
        .waiting()
        .await
        .map_err(|e| anyhow::anyhow!("MCP server error: {e}"))?;

    info!("MCP server shut down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;
    use rmcp::model::{CallToolRequestParam, CallToolResult};
    use rmcp::service::{RoleClient, RunningService};
    use serde_json::{json, Value};
    use tokio::io::duplex;

    async fn call(
        client: &RunningService<RoleClient, ()>,
        name: &'static str,
        arguments: Value,
    ) -> CallToolResult {
        client
            .call_tool(CallToolRequestParam {
                name: name.into(),
                arguments: arguments.as_object().cloned(),
            })
            .await
            .unwrap_or_else(|e| panic!("{name} call failed: {e}"))
    }

    /// The JSON attached to a successful tool result.
    fn structure(result: &CallToolResult) -> Value {
        assert!(
            !result.is_error.unwrap_or(false),
            "tool returned error: {:?}",
            result.content
        );
        let text = &result.content[1].as_text().expect("json content").text;
        serde_json::from_str(text).unwrap()
    }

    /// Drives the four tools against the in-memory sheet over an in-memory transport.
    #[tokio::test]
    async fn test_mcp_server_integration() {
        let (client_io, server_io) = duplex(4096);
        let env = TestEnv::remote().await;
        let config = env.config();
        let server_handle =
            tokio::spawn(
                async move { run_server(config, Mode::Testing, Io::Mock(server_io)).await },
            );
        let client = ().serve(client_io).await.expect("Failed to create client");

        let tools = client.list_tools(Default::default()).await.unwrap();
        let mut names: Vec<String> = tools.tools.iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "create_transaction",
                "delete_transaction",
                "fetch_transactions",
                "update_transaction"
            ]
        );

        let month = json!({"month": "2024-03"});
        let march = structure(&call(&client, "fetch_transactions", month.clone()).await);
        let count = march.as_array().unwrap().len();
        assert!(count > 0);

        let created = structure(
            &call(
                &client,
                "create_transaction",
                json!({
                    "date": "2024-03-05",
                    "amount": 15000,
                    "category": "식비",
                    "merchant": "맥도날드",
                    "consumer": "남편",
                    "type": "expense"
                }),
            )
            .await,
        );
        let id = created["transaction"]["id"].as_str().unwrap().to_string();
        assert_eq!(created["stale_routes"], json!(["/", "/stats"]));

        let mut changed = created["transaction"].clone();
        changed["amount"] = json!(16000);
        let updated = structure(&call(&client, "update_transaction", changed).await);
        assert_eq!(updated["transaction"]["amount"], json!(16000));

        let march = structure(&call(&client, "fetch_transactions", month).await);
        let march = march.as_array().unwrap();
        assert_eq!(march.len(), count + 1);
        assert!(march.iter().any(|t| t["id"] == json!(id) && t["amount"] == json!(16000)));

        structure(&call(&client, "delete_transaction", json!({"id": id})).await);
        let again = call(&client, "delete_transaction", json!({"id": id})).await;
        assert!(again.is_error.unwrap_or(false));

        let invalid = call(
            &client,
            "create_transaction",
            json!({
                "date": "2024-03-05",
                "amount": 1,
                "category": "식비",
                "merchant": "편의점",
                "consumer": "옆집",
                "type": "expense"
            }),
        )
        .await;
        assert!(invalid.is_error.unwrap_or(false));

        drop(client);
        let server_result = tokio::time::timeout(std::time::Duration::from_secs(5), server_handle)
            .await
            .expect("Server timed out")
            .expect("Server task panicked");
        assert!(server_result.is_ok(), "Server returned error: {server_result:?}");
    }
}
