//! The transaction tools. Each one relays to the action boundary and reports the routes its write
//! marked stale.

use crate::commands::{count, Out};
use crate::mcp::mcp_utils::tool_result;
use crate::mcp::LedgerServer;
use crate::model::{Amount, MonthKey, Transaction, TransactionType, EXPENSE_CATEGORIES};
use anyhow::Context;
use chrono::NaiveDate;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::CallToolResult;
use rmcp::ErrorData as McpError;
use rmcp::{tool, tool_router};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Parameters for the fetch_transactions tool.
#[derive(Debug, Default, Deserialize, JsonSchema)]
#[schemars(title = "FetchParams")]
pub struct FetchParams {
    /// Only return transactions in this month, formatted YYYY-MM. Omit for all transactions.
    #[serde(default)]
    pub month: Option<String>,
}

/// Parameters for the create_transaction tool.
#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(title = "NewTransaction")]
pub struct NewTransaction {
    /// The id to store the transaction under. A UUID is generated when omitted.
    #[serde(default)]
    pub id: Option<String>,
    /// YYYY-MM-DD
    #[schemars(with = "String")]
    pub date: NaiveDate,
    /// Whole currency units, never negative.
    #[schemars(with = "u64")]
    pub amount: Amount,
    /// Required for expenses.
    #[serde(default)]
    pub category: String,
    pub merchant: String,
    /// One of the two participants or the shared label.
    pub consumer: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(default)]
    pub memo: String,
}

impl NewTransaction {
    fn into_transaction(self) -> Transaction {
        Transaction {
            id: self
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            date: self.date,
            amount: self.amount,
            category: self.category,
            merchant: self.merchant,
            consumer: self.consumer,
            kind: self.kind,
            memo: self.memo,
        }
    }
}

/// Parameters for the delete_transaction tool.
#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(title = "DeleteParams")]
pub struct DeleteParams {
    /// The id of the transaction to delete.
    pub id: String,
}

/// What a create or update tool call saved.
#[derive(Debug, Clone, Serialize)]
pub struct Saved {
    pub transaction: Transaction,
    pub stale_routes: Vec<String>,
}

/// What a delete tool call removed.
#[derive(Debug, Clone, Serialize)]
pub struct Deleted {
    pub id: String,
    pub stale_routes: Vec<String>,
}

#[tool_router(vis = "pub(super)")]
impl LedgerServer {
    /// Fetch transactions from the ledger, either all of them or only those in one month.
    ///
    /// Returns a message with the count and a JSON array of transactions. Each transaction has
    /// `id`, `date` (YYYY-MM-DD), `amount`, `category`, `merchant`, `consumer`, `type` (`income`
    /// or `expense`) and `memo`.
    #[tool]
    async fn fetch_transactions(
        &self,
        Parameters(params): Parameters<FetchParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: fetch_transactions called with month={:?}", params.month);
        tool_result(self.fetch(params).await)
    }

    /// Create a new transaction.
    ///
    /// The consumer must be one of the participants or the shared label, and expenses need one of
    /// the configured categories. An id is generated when none is given.
    ///
    /// # Example
    ///
    /// ```json
    /// {
    ///   "date": "2024-03-05",
    ///   "amount": 15000,
    ///   "category": "식비",
    ///   "merchant": "맥도날드",
    ///   "consumer": "남편",
    ///   "type": "expense"
    /// }
    /// ```
    #[tool]
    async fn create_transaction(
        &self,
        Parameters(params): Parameters<NewTransaction>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: create_transaction called");
        tool_result(self.create(params.into_transaction()).await)
    }

    /// Replace every field of an existing transaction, found by its `id`. Send the whole
    /// transaction; fields left out are stored as empty.
    #[tool]
    async fn update_transaction(
        &self,
        Parameters(transaction): Parameters<Transaction>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: update_transaction called for {}", transaction.id);
        tool_result(self.update(transaction).await)
    }

    /// Delete a transaction by its `id`.
    #[tool]
    async fn delete_transaction(
        &self,
        Parameters(params): Parameters<DeleteParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: delete_transaction called for {}", params.id);
        tool_result(self.delete(params.id).await)
    }
}

impl LedgerServer {
    async fn fetch(&self, params: FetchParams) -> crate::Result<Out<Vec<Transaction>>> {
        let month: Option<MonthKey> = params
            .month
            .as_deref()
            .map(str::parse)
            .transpose()
            .context("Bad month")?;
        let transactions = self.actions.fetch(month).await;
        Ok(Out::new(
            format!("Found {}", count(transactions.len(), "transaction")),
            transactions,
        ))
    }

    async fn create(&self, transaction: Transaction) -> crate::Result<Out<Saved>> {
        transaction.validate(&self.participants, EXPENSE_CATEGORIES)?;
        self.actions
            .create(&transaction)
            .await
            .context("Failed to save the transaction")?;
        Ok(Out::new(
            format!("Created transaction {}", transaction.id),
            Saved {
                transaction,
                stale_routes: self.routes.take_stale(),
            },
        ))
    }

    async fn update(&self, transaction: Transaction) -> crate::Result<Out<Saved>> {
        transaction.validate(&self.participants, EXPENSE_CATEGORIES)?;
        self.actions
            .update(&transaction)
            .await
            .context("Failed to save the transaction")?;
        Ok(Out::new(
            format!("Updated transaction {}", transaction.id),
            Saved {
                transaction,
                stale_routes: self.routes.take_stale(),
            },
        ))
    }

    async fn delete(&self, id: String) -> crate::Result<Out<Deleted>> {
        self.actions
            .delete(&id)
            .await
            .context("Failed to delete the transaction")?;
        Ok(Out::new(
            format!("Deleted transaction {id}"),
            Deleted {
                id,
                stale_routes: self.routes.take_stale(),
            },
        ))
    }
}
