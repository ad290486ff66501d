//! LDAP directory credential verification.
//!
//! Verification is search-then-bind: a service account locates the
//! entry for the submitted login name, then the secret is proved by
//! re-binding as the found DN. Transport failures degrade to
//! [`DirectoryOutcome::Unavailable`] so the caller can answer with
//! the same generic refusal it uses for bad credentials.
//!
//! While the directory is flagged unavailable, verification calls are
//! skipped without touching the network; a single probing attempt is
//! allowed through per cooldown interval so the flag can recover
//! without a restart.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use ldap3::{LdapConnAsync, LdapConnSettings, Scope, SearchEntry, ldap_escape};

use opmetrics_application::{DirectoryAuthenticator, DirectoryOutcome};
use opmetrics_core::AppResult;
use opmetrics_domain::DirectoryPrincipal;

/// Attributes requested for a located entry.
const PRINCIPAL_ATTRS: [&str; 8] = [
    "cn",
    "givenName",
    "sn",
    "mail",
    "department",
    "title",
    "employeeNumber",
    "memberOf",
];

/// Connection settings for the directory.
#[derive(Debug, Clone)]
pub struct LdapSettings {
    /// Directory URL, e.g. `ldaps://dc01.example.gov:636`.
    pub url: String,
    /// DN the service account binds as for the search phase.
    pub service_dn: String,
    /// Service account secret.
    pub service_password: String,
    /// Subtree searched for principals.
    pub base_dn: String,
    /// Connect and per-operation timeout.
    pub timeout: Duration,
}

/// Minimum wait between probing attempts while the directory is
/// flagged unavailable.
const RETRY_COOLDOWN: Duration = Duration::from_secs(30);

/// Directory client implementing search-then-bind verification.
pub struct LdapDirectoryClient {
    settings: LdapSettings,
    available: Arc<AtomicBool>,
    retry_at: Arc<Mutex<Option<Instant>>>,
}

impl LdapDirectoryClient {
    /// Creates a client; call [`init`](Self::init) at startup to
    /// populate the availability flag.
    #[must_use]
    pub fn new(settings: LdapSettings) -> Self {
        Self {
            settings,
            available: Arc::new(AtomicBool::new(false)),
            retry_at: Arc::new(Mutex::new(None)),
        }
    }

    /// Last observed reachability of the directory. Updated by
    /// [`init`](Self::init) and by every attempted exchange; skipped
    /// calls leave it untouched.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    /// Startup service-bind probe, recording the availability flag.
    pub async fn init(&self) -> bool {
        match self.service_bind().await {
            Ok(()) => {
                self.mark_available();
                tracing::info!(url = %self.settings.url, "directory reachable");
                true
            }
            Err(error) => {
                self.mark_unavailable();
                tracing::warn!(%error, url = %self.settings.url, "directory unreachable");
                false
            }
        }
    }

    /// Marks the directory as out of service. Connections are opened
    /// per call, so there is nothing else to tear down.
    pub fn shutdown(&self) {
        self.mark_unavailable();
    }

    fn mark_available(&self) {
        self.available.store(true, Ordering::Relaxed);
        *self.retry_slot() = None;
    }

    fn mark_unavailable(&self) {
        self.available.store(false, Ordering::Relaxed);
        *self.retry_slot() = Some(Instant::now() + RETRY_COOLDOWN);
    }

    fn retry_slot(&self) -> std::sync::MutexGuard<'_, Option<Instant>> {
        self.retry_at.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether this call may touch the network. Always true while the
    /// directory is flagged available; otherwise one probing attempt
    /// is admitted per cooldown interval and the rest are skipped.
    fn may_attempt(&self) -> bool {
        if self.is_available() {
            return true;
        }

        let mut slot = self.retry_slot();
        let now = Instant::now();
        match *slot {
            Some(at) if now >= at => {
                *slot = Some(now + RETRY_COOLDOWN);
                true
            }
            Some(_) => false,
            // Not yet probed: skip, and schedule the first retry.
            None => {
                *slot = Some(now + RETRY_COOLDOWN);
                false
            }
        }
    }

    async fn service_bind(&self) -> Result<(), ldap3::LdapError> {
        let (conn, mut ldap) = self.connect().await?;
        drive_connection(conn);
        ldap.with_timeout(self.settings.timeout)
            .simple_bind(&self.settings.service_dn, &self.settings.service_password)
            .await?
            .success()?;
        let _ = ldap.unbind().await;
        Ok(())
    }

    async fn connect(&self) -> Result<(LdapConnAsync, ldap3::Ldap), ldap3::LdapError> {
        let conn_settings = LdapConnSettings::new().set_conn_timeout(self.settings.timeout);
        LdapConnAsync::with_settings(conn_settings, &self.settings.url).await
    }

    /// Full search-then-bind exchange; any transport error bubbles up
    /// and is mapped to `Unavailable` by the caller.
    async fn try_authenticate(
        &self,
        login_name: &str,
        secret: &str,
    ) -> Result<DirectoryOutcome, ldap3::LdapError> {
        let (conn, mut ldap) = self.connect().await?;
        drive_connection(conn);

        ldap.with_timeout(self.settings.timeout)
            .simple_bind(&self.settings.service_dn, &self.settings.service_password)
            .await?
            .success()?;

        let filter = format!("(cn={})", ldap_escape(login_name));
        let (entries, _result) = ldap
            .with_timeout(self.settings.timeout)
            .search(
                &self.settings.base_dn,
                Scope::Subtree,
                &filter,
                PRINCIPAL_ATTRS,
            )
            .await?
            .success()?;

        // Exactly one entry may match; absent or ambiguous names are
        // refused rather than guessed at.
        let mut entries = entries.into_iter();
        let entry = match (entries.next(), entries.next()) {
            (Some(entry), None) => SearchEntry::construct(entry),
            (None, _) => {
                let _ = ldap.unbind().await;
                return Ok(DirectoryOutcome::Denied);
            }
            (Some(_), Some(_)) => {
                tracing::warn!(login_name, "multiple directory entries match; refusing");
                let _ = ldap.unbind().await;
                return Ok(DirectoryOutcome::Denied);
            }
        };

        let _ = ldap.unbind().await;

        // The secret is proved by binding as the found entry on a
        // dedicated connection; the privileged one is never rebound
        // with a user password.
        let (user_conn, mut user_ldap) = self.connect().await?;
        drive_connection(user_conn);
        let bind = user_ldap
            .with_timeout(self.settings.timeout)
            .simple_bind(&entry.dn, secret)
            .await?;
        let _ = user_ldap.unbind().await;

        if bind.rc == 0 {
            Ok(DirectoryOutcome::Verified {
                principal: principal_from_entry(login_name, &entry),
            })
        } else {
            Ok(DirectoryOutcome::Denied)
        }
    }
}

#[async_trait]
impl DirectoryAuthenticator for LdapDirectoryClient {
    async fn authenticate(&self, login_name: &str, secret: &str) -> AppResult<DirectoryOutcome> {
        // An empty bind password would be treated as an anonymous
        // bind by many servers; refuse it here.
        if secret.is_empty() {
            return Ok(DirectoryOutcome::Denied);
        }

        if !self.may_attempt() {
            tracing::debug!(login_name, "directory flagged unavailable; attempt skipped");
            return Ok(DirectoryOutcome::Unavailable);
        }

        match self.try_authenticate(login_name, secret).await {
            Ok(outcome) => {
                self.mark_available();
                Ok(outcome)
            }
            Err(error) => {
                self.mark_unavailable();
                tracing::warn!(%error, login_name, "directory exchange failed");
                Ok(DirectoryOutcome::Unavailable)
            }
        }
    }
}

/// Pumps the connection's I/O in the background for the lifetime of
/// one exchange.
fn drive_connection(conn: LdapConnAsync) {
    tokio::spawn(async move {
        if let Err(error) = conn.drive().await {
            tracing::warn!(%error, "directory connection closed with an error");
        }
    });
}

fn first_attr(entry: &SearchEntry, name: &str) -> Option<String> {
    entry
        .attrs
        .get(name)
        .and_then(|values| values.first())
        .cloned()
}

fn principal_from_entry(login_name: &str, entry: &SearchEntry) -> DirectoryPrincipal {
    let given_name = first_attr(entry, "givenName");
    let surname = first_attr(entry, "sn");
    let display_name = match (given_name, surname) {
        (Some(given), Some(sur)) => format!("{given} {sur}"),
        (Some(given), None) => given,
        (None, Some(sur)) => sur,
        (None, None) => first_attr(entry, "cn").unwrap_or_else(|| login_name.to_owned()),
    };

    DirectoryPrincipal {
        login_name: login_name.to_owned(),
        display_name,
        email: first_attr(entry, "mail"),
        department: first_attr(entry, "department"),
        title: first_attr(entry, "title"),
        employee_number: first_attr(entry, "employeeNumber"),
        groups: entry.attrs.get("memberOf").cloned().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn entry(attrs: Vec<(&str, Vec<&str>)>) -> SearchEntry {
        SearchEntry {
            dn: "CN=mkhumalo,OU=Staff,DC=example,DC=gov".to_owned(),
            attrs: attrs
                .into_iter()
                .map(|(name, values)| {
                    (
                        name.to_owned(),
                        values.into_iter().map(str::to_owned).collect(),
                    )
                })
                .collect(),
            bin_attrs: HashMap::new(),
        }
    }

    #[test]
    fn principal_combines_given_name_and_surname() {
        let entry = entry(vec![
            ("givenName", vec!["Mandla"]),
            ("sn", vec!["Khumalo"]),
            ("mail", vec!["mkhumalo@example.gov"]),
            ("department", vec!["Operations"]),
            (
                "memberOf",
                vec!["CN=OPM_Officers,OU=Groups,DC=example,DC=gov"],
            ),
        ]);

        let principal = principal_from_entry("mkhumalo", &entry);

        assert_eq!(principal.display_name, "Mandla Khumalo");
        assert_eq!(principal.email.as_deref(), Some("mkhumalo@example.gov"));
        assert_eq!(principal.groups.len(), 1);
    }

    #[test]
    fn principal_falls_back_to_cn_then_login_name() {
        let with_cn = entry(vec![("cn", vec!["mkhumalo"])]);
        assert_eq!(
            principal_from_entry("mkhumalo", &with_cn).display_name,
            "mkhumalo"
        );

        let bare = entry(Vec::new());
        assert_eq!(principal_from_entry("mkhumalo", &bare).display_name, "mkhumalo");
        assert!(principal_from_entry("mkhumalo", &bare).groups.is_empty());
    }

    #[test]
    fn login_names_are_escaped_into_the_filter() {
        let filter = format!("(cn={})", ldap_escape("adm*)(uid=*"));
        assert_eq!(filter, r"(cn=adm\2a\29\28uid=\2a)");
    }

    fn settings_for(url: String) -> LdapSettings {
        LdapSettings {
            url,
            service_dn: "CN=svc-opmetrics,OU=Service,DC=example,DC=gov".to_owned(),
            service_password: "service-secret".to_owned(),
            base_dn: "DC=example,DC=gov".to_owned(),
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn flagged_unavailable_answers_without_touching_the_network() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap_or_else(|error| panic!("listener should bind: {error}"));
        listener
            .set_nonblocking(true)
            .unwrap_or_else(|error| panic!("listener should configure: {error}"));
        let address = listener
            .local_addr()
            .unwrap_or_else(|error| panic!("listener should have an address: {error}"));

        // Never probed, so the flag is down and the call must skip.
        let client = LdapDirectoryClient::new(settings_for(format!("ldap://{address}")));
        assert!(!client.is_available());

        let outcome = client
            .authenticate("ghost", "whatever")
            .await
            .unwrap_or_else(|error| panic!("skipped attempt should not error: {error}"));

        assert_eq!(outcome, DirectoryOutcome::Unavailable);
        assert!(matches!(
            listener.accept(),
            Err(error) if error.kind() == std::io::ErrorKind::WouldBlock
        ));
    }

    #[test]
    fn one_probing_attempt_is_admitted_per_cooldown() {
        let client = LdapDirectoryClient::new(settings_for("ldap://127.0.0.1:1".to_owned()));

        // Unprobed clients skip and schedule the first retry.
        assert!(!client.may_attempt());
        assert!(!client.may_attempt());

        // Once the cooldown has elapsed a single probe goes through.
        *client.retry_slot() = Some(Instant::now() - Duration::from_secs(1));
        assert!(client.may_attempt());
        assert!(!client.may_attempt());

        // An available directory is never gated.
        client.mark_available();
        assert!(client.may_attempt());
        assert!(client.may_attempt());
    }

    #[test]
    fn shutdown_lowers_the_flag_and_gates_calls() {
        let client = LdapDirectoryClient::new(settings_for("ldap://127.0.0.1:1".to_owned()));
        client.mark_available();
        assert!(client.is_available());

        client.shutdown();
        assert!(!client.is_available());
        assert!(!client.may_attempt());
    }
}
