use crate::args::UpdateArgs;
use crate::commands::Out;
use crate::model::{Participants, Transaction, EXPENSE_CATEGORIES};
use crate::store::DataService;
use crate::Result;
use anyhow::Context;

/// Replaces every field of the transaction with the given id. Validation is the same as for `add`.
///
/// # Errors
///
/// - Returns an error if validation fails.
/// - Returns an error wrapping `StoreError::RecordNotFound` if no transaction has the id.
pub async fn update(
    service: &DataService,
    participants: &Participants,
    args: &UpdateArgs,
) -> Result<Out<Transaction>> {
    let transaction = args.to_transaction();
    transaction.validate(participants, EXPENSE_CATEGORIES)?;
    service
        .update_transaction(&transaction)
        .await
        .context("Failed to save the transaction")?;
    Ok(Out::new(
        format!("Updated transaction {}", transaction.id),
        transaction,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::TransactionArgs;
    use crate::error::StoreError;
    use crate::model::{Amount, TransactionType};
    use crate::test::TestEnv;
    use chrono::NaiveDate;

    fn fields(amount: u64) -> TransactionArgs {
        TransactionArgs::new(
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            Amount::new(amount),
            "맥도날드",
            "남편",
            TransactionType::Expense,
            "식비",
            "세트",
        )
    }

    #[tokio::test]
    async fn test_update_replaces_all_fields() {
        let env = TestEnv::remote().await;
        let args = UpdateArgs::new("seed-02", fields(16000));
        update(env.service(), env.participants(), &args)
            .await
            .unwrap();
        let all = env.service().get_transactions(None).await;
        let changed = all.iter().find(|t| t.id == "seed-02").unwrap();
        assert_eq!(changed, &args.to_transaction());
        assert_eq!(all.iter().filter(|t| t.id == "seed-02").count(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let env = TestEnv::remote().await;
        let before = env.service().get_transactions(None).await;
        let args = UpdateArgs::new("nope", fields(1));
        let err = update(env.service(), env.participants(), &args)
            .await
            .unwrap_err();
        assert!(StoreError::is_not_found(&err));
        assert_eq!(env.service().get_transactions(None).await, before);
    }
}
