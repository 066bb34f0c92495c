use crate::errors::IdentityError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::Arc};
use tokio::{fs, sync::watch};
use tracing::{error, info, warn};
use uuid::Uuid;

const MAX_TOKEN_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Anonymous,
    Token,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub kind: SessionKind,
    pub started_at: DateTime<Utc>,
}

impl Session {
    pub fn is_anonymous(&self) -> bool {
        self.kind == SessionKind::Anonymous
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// A session established by an earlier run, if any.
    async fn restore(&self) -> Option<Session>;

    async fn sign_in_with_token(&self, token: &str) -> Result<Session, IdentityError>;

    async fn sign_in_anonymously(&self) -> Result<Session, IdentityError>;

    async fn sign_out(&self) -> Result<(), IdentityError>;
}

/// Identity provider that issues sessions locally and remembers the last
/// one in a small JSON file.
pub struct LocalIdentityProvider {
    session_path: Option<PathBuf>,
}

impl LocalIdentityProvider {
    pub fn new(session_path: PathBuf) -> Self {
        Self {
            session_path: Some(session_path),
        }
    }

    pub fn ephemeral() -> Self {
        Self { session_path: None }
    }

    async fn remember(&self, session: &Session) -> Result<(), IdentityError> {
        let Some(path) = &self.session_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| IdentityError::Persist {
                    path: path.clone(),
                    source,
                })?;
        }
        let payload = serde_json::to_vec_pretty(session)?;
        fs::write(path, payload)
            .await
            .map_err(|source| IdentityError::Persist {
                path: path.clone(),
                source,
            })
    }
}

fn token_is_well_formed(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= MAX_TOKEN_LEN
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn restore(&self) -> Option<Session> {
        let path = self.session_path.as_ref()?;
        match fs::read(path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(session) => Some(session),
                Err(err) => {
                    error!("failed to parse session file: {err}");
                    None
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                error!("failed to read session file: {err}");
                None
            }
        }
    }

    async fn sign_in_with_token(&self, token: &str) -> Result<Session, IdentityError> {
        let token = token.trim();
        if !token_is_well_formed(token) {
            return Err(IdentityError::InvalidToken);
        }
        let session = Session {
            id: token.to_string(),
            kind: SessionKind::Token,
            started_at: Utc::now(),
        };
        self.remember(&session).await?;
        Ok(session)
    }

    async fn sign_in_anonymously(&self) -> Result<Session, IdentityError> {
        let session = Session {
            id: Uuid::new_v4().to_string(),
            kind: SessionKind::Anonymous,
            started_at: Utc::now(),
        };
        self.remember(&session).await?;
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        let Some(path) = &self.session_path else {
            return Ok(());
        };
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(IdentityError::Persist {
                path: path.clone(),
                source,
            }),
        }
    }
}

/// Current session plus the readiness signal the rest of the app waits on.
pub struct Identity {
    provider: Arc<dyn IdentityProvider>,
    session: watch::Sender<Option<Session>>,
}

impl Identity {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (session, _rx) = watch::channel(None);
        Self { provider, session }
    }

    /// Reuses a stored session, else exchanges `token`, else signs in
    /// anonymously. A rejected token silently falls back to anonymous.
    pub async fn bootstrap(&self, token: Option<&str>) -> Result<Session, IdentityError> {
        if let Some(session) = self.session() {
            return Ok(session);
        }

        let session = match self.provider.restore().await {
            Some(session) => {
                info!(session = %session.id, "reusing existing session");
                session
            }
            None => match token {
                Some(token) => match self.provider.sign_in_with_token(token).await {
                    Ok(session) => session,
                    Err(err) => {
                        warn!("token sign-in failed, continuing anonymously: {err}");
                        self.provider.sign_in_anonymously().await?
                    }
                },
                None => self.provider.sign_in_anonymously().await?,
            },
        };

        info!(
            session = %session.id,
            anonymous = session.is_anonymous(),
            "identity ready"
        );
        self.session.send_replace(Some(session.clone()));
        Ok(session)
    }

    pub fn is_ready(&self) -> bool {
        self.session.borrow().is_some()
    }

    pub fn session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }

    pub async fn sign_out(&self) -> Result<(), IdentityError> {
        self.provider.sign_out().await?;
        self.session.send_replace(None);
        info!("session ended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        inner: LocalIdentityProvider,
        anonymous_calls: AtomicUsize,
    }

    impl CountingProvider {
        fn new(inner: LocalIdentityProvider) -> Self {
            Self {
                inner,
                anonymous_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl IdentityProvider for CountingProvider {
        async fn restore(&self) -> Option<Session> {
            self.inner.restore().await
        }

        async fn sign_in_with_token(&self, token: &str) -> Result<Session, IdentityError> {
            self.inner.sign_in_with_token(token).await
        }

        async fn sign_in_anonymously(&self) -> Result<Session, IdentityError> {
            self.anonymous_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.sign_in_anonymously().await
        }

        async fn sign_out(&self) -> Result<(), IdentityError> {
            self.inner.sign_out().await
        }
    }

    fn temp_session_path() -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("consumption_session_{}.json", Uuid::new_v4()));
        path
    }

    #[tokio::test]
    async fn anonymous_without_token() {
        let identity = Identity::new(Arc::new(LocalIdentityProvider::ephemeral()));
        assert!(!identity.is_ready());

        let session = identity.bootstrap(None).await.unwrap();
        assert!(session.is_anonymous());
        assert!(identity.is_ready());
        assert_eq!(identity.session(), Some(session));
    }

    #[tokio::test]
    async fn valid_token_yields_token_session() {
        let identity = Identity::new(Arc::new(LocalIdentityProvider::ephemeral()));
        let session = identity.bootstrap(Some("operator-7")).await.unwrap();
        assert_eq!(session.kind, SessionKind::Token);
        assert_eq!(session.id, "operator-7");
    }

    #[tokio::test]
    async fn rejected_token_falls_back_to_anonymous() {
        let provider = Arc::new(CountingProvider::new(LocalIdentityProvider::ephemeral()));
        let identity = Identity::new(provider.clone());

        let session = identity.bootstrap(Some("not a token!")).await.unwrap();
        assert!(session.is_anonymous());
        assert_eq!(provider.anonymous_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn bootstrap_runs_once() {
        let provider = Arc::new(CountingProvider::new(LocalIdentityProvider::ephemeral()));
        let identity = Identity::new(provider.clone());

        let first = identity.bootstrap(None).await.unwrap();
        let second = identity.bootstrap(None).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(provider.anonymous_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stored_session_is_reused() {
        let path = temp_session_path();
        let first = Identity::new(Arc::new(LocalIdentityProvider::new(path.clone())))
            .bootstrap(None)
            .await
            .unwrap();

        let provider = Arc::new(CountingProvider::new(LocalIdentityProvider::new(path.clone())));
        let restarted = Identity::new(provider.clone());
        let second = restarted.bootstrap(Some("operator-7")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.anonymous_calls.load(Ordering::SeqCst), 0);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn sign_out_clears_readiness() {
        let path = temp_session_path();
        let identity = Identity::new(Arc::new(LocalIdentityProvider::new(path.clone())));
        let mut rx = identity.subscribe();
        identity.bootstrap(None).await.unwrap();
        assert!(rx.borrow_and_update().is_some());

        identity.sign_out().await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_none());
        assert!(!identity.is_ready());
        assert!(!path.exists());
    }

    #[test]
    fn token_shape() {
        assert!(token_is_well_formed("abc.DEF_1-2"));
        assert!(!token_is_well_formed(""));
        assert!(!token_is_well_formed("has space"));
        assert!(!token_is_well_formed(&"x".repeat(MAX_TOKEN_LEN + 1)));
    }
}
