use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "storyhub";

/// Secrets kept in the OS keychain under the `storyhub` service.
pub struct CredentialStore;

impl CredentialStore {
    /// Store a secret for `account`, replacing any previous one
    pub fn store(account: &str, secret: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, account)
            .context("Failed to create keyring entry")?;
        entry
            .set_password(secret)
            .context("Failed to store secret in keychain")?;
        Ok(())
    }

    /// Retrieve the secret for `account`, `None` if nothing is stored
    pub fn get(account: &str) -> Result<Option<String>> {
        let entry = Entry::new(SERVICE_NAME, account)
            .context("Failed to create keyring entry")?;
        match entry.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve secret from keychain"),
        }
    }

    /// Delete the secret for `account`. Deleting a missing secret is not an error.
    pub fn delete(account: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, account)
            .context("Failed to create keyring entry")?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete secret from keychain"),
        }
    }
}
