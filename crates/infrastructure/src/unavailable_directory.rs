//! Null directory adapter.

use async_trait::async_trait;

use opmetrics_application::{DirectoryAuthenticator, DirectoryOutcome};
use opmetrics_core::AppResult;

/// Stand-in used when no directory is configured. Every attempt is
/// reported as unavailable, so logins fall back to local credentials
/// only.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableDirectory;

#[async_trait]
impl DirectoryAuthenticator for UnavailableDirectory {
    async fn authenticate(&self, _login_name: &str, _secret: &str) -> AppResult<DirectoryOutcome> {
        Ok(DirectoryOutcome::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_reports_unavailable() -> AppResult<()> {
        let directory = UnavailableDirectory;
        let outcome = directory.authenticate("anyone", "anything").await?;
        assert_eq!(outcome, DirectoryOutcome::Unavailable);
        Ok(())
    }
}
