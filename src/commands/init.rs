use crate::args::InitArgs;
use crate::commands::Out;
use crate::config::{ConfigInit, StoreMode};
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the ledger home directory and an initial `config.json`.
///
/// # Arguments
/// - `ledger_home` - The directory that will hold the config and the local transaction file,
///   e.g. `$HOME/couple-ledger`
/// - `args` - The sheet URL, service account settings and whether to use the sheet at all.
///
/// # Errors
/// - Returns an error if the directory cannot be created, the config already exists or the sheet
///   URL is not a Google Sheets URL.
pub async fn init(ledger_home: &Path, args: &InitArgs) -> Result<Out<()>> {
    let init = ConfigInit {
        sheet_url: args.sheet_url().map(str::to_string),
        client_email: args.client_email().map(str::to_string),
        service_account_key: args.service_account_key().map(Path::to_path_buf),
        remote: args.remote(),
    };
    let config = Config::create(ledger_home, init)
        .await
        .context("Unable to create the ledger directory and config")?;

    let message = match (config.store_mode(), config.credentials()) {
        (StoreMode::Local, _) => format!(
            "Created {}; transactions will be kept in {}",
            config.config_path().display(),
            config.local_store_path().display()
        ),
        (StoreMode::Remote, Some(c)) => format!(
            "Created {}; transactions will be kept in spreadsheet {}",
            config.config_path().display(),
            c.spreadsheet_id()
        ),
        (StoreMode::Remote, None) => format!(
            "Created {}, but the Google credentials are incomplete. Set GOOGLE_SHEET_ID, \
            GOOGLE_CLIENT_EMAIL and GOOGLE_PRIVATE_KEY or provide --service-account-key",
            config.config_path().display()
        ),
    };
    Ok(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_local_then_refuse_twice() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("ledger");
        let out = init(&home, &InitArgs::default()).await.unwrap();
        assert!(out.message().contains("transactions.json"));
        assert!(home.join("config.json").is_file());
        assert!(init(&home, &InitArgs::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_init_rejects_bad_url() {
        let dir = TempDir::new().unwrap();
        let args = InitArgs::new(Some("https://example.com/x".into()), None, None, true);
        assert!(init(dir.path(), &args).await.is_err());
    }
}
