use crate::args::TransactionArgs;
use crate::commands::Out;
use crate::model::{Participants, Transaction, EXPENSE_CATEGORIES};
use crate::store::DataService;
use crate::Result;
use anyhow::Context;
use uuid::Uuid;

/// Adds a new transaction under a freshly generated UUID v4 id.
///
/// The category (for expenses) and the consumer are checked against the configured categories
/// and `participants` before anything is written.
///
/// # Returns
///
/// The message names the new id; the structure is the saved transaction.
///
/// # Errors
///
/// - Returns an error if validation fails.
/// - Returns an error if the store rejects the write, e.g. when Google credentials are missing.
pub async fn add(
    service: &DataService,
    participants: &Participants,
    args: &TransactionArgs,
) -> Result<Out<Transaction>> {
    let transaction = args.to_transaction(Uuid::new_v4().to_string());
    transaction.validate(participants, EXPENSE_CATEGORIES)?;
    service
        .add_transaction(&transaction)
        .await
        .context("Failed to save the transaction")?;
    let message = format!(
        "Added {} {} at {} ({})",
        transaction.kind,
        transaction.amount.formatted(),
        transaction.merchant,
        transaction.id
    );
    Ok(Out::new(message, transaction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::model::{Amount, TransactionType};
    use crate::test::TestEnv;
    use chrono::NaiveDate;

    fn lunch(consumer: &str, category: &str) -> TransactionArgs {
        TransactionArgs::new(
            NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
            Amount::new(9000),
            "김밥천국",
            consumer,
            TransactionType::Expense,
            category,
            "",
        )
    }

    #[tokio::test]
    async fn test_add_generates_an_id() {
        let env = TestEnv::remote().await;
        let out = add(env.service(), env.participants(), &lunch("함께", "외식"))
            .await
            .unwrap();
        let saved = out.structure().unwrap();
        assert!(Uuid::parse_str(&saved.id).is_ok());
        let all = env.service().get_transactions(None).await;
        assert!(all.contains(saved));
    }

    #[tokio::test]
    async fn test_add_validates_before_writing() {
        let env = TestEnv::remote().await;
        let before = env.service().get_transactions(None).await.len();
        assert!(add(env.service(), env.participants(), &lunch("철수", "외식"))
            .await
            .is_err());
        assert!(add(env.service(), env.participants(), &lunch("남편", "간식"))
            .await
            .is_err());
        assert_eq!(env.service().get_transactions(None).await.len(), before);
    }

    #[tokio::test]
    async fn test_add_without_credentials() {
        let env = TestEnv::disconnected().await;
        let err = add(env.service(), env.participants(), &lunch("남편", "외식"))
            .await
            .unwrap_err();
        assert!(StoreError::is_unavailable(&err));
        assert!(err.to_string().contains("Failed to save"));
    }
}
