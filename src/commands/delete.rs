use crate::commands::Out;
use crate::store::DataService;
use crate::Result;
use anyhow::Context;

/// Deletes the transaction with `id`.
pub async fn delete(service: &DataService, id: &str) -> Result<Out<String>> {
    service
        .delete_transaction(id)
        .await
        .context("Failed to delete the transaction")?;
    Ok(Out::new(format!("Deleted transaction {id}"), id.to_string()))
}
