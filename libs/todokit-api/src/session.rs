//! Sign-in state on top of an [`ApiClient`]
//!
//! [`AuthSession`] is the only place that arms or clears the client's
//! credential after construction. The signed-in [`SessionUser`] is kept in a
//! [`SessionStore`] so a later process can [`restore`](AuthSession::restore) it.

use crate::dispatcher::{ApiClient, RequestOptions};
use crate::error::ClientError;
use crate::registry::{AuthSignin, AuthSignout, AuthSignup, SessionUser, SigninForm, SignupForm};
use parking_lot::{Mutex, RwLock};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("session store I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("stored session is unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),
}

impl SessionError {
    /// User-facing text
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            SessionError::Client(e) => e.message(),
            other => other.to_string(),
        }
    }
}

/// Where the signed-in user survives between runs
pub trait SessionStore: Send + Sync {
    /// # Errors
    /// Returns an error if the stored session cannot be read.
    fn load(&self) -> Result<Option<SessionUser>, SessionError>;

    /// # Errors
    /// Returns an error if the session cannot be written.
    fn save(&self, user: &SessionUser) -> Result<(), SessionError>;

    /// # Errors
    /// Returns an error if the stored session cannot be removed.
    fn clear(&self) -> Result<(), SessionError>;
}

/// Keeps the session for the lifetime of the process only
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    user: Mutex<Option<SessionUser>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<SessionUser>, SessionError> {
        Ok(self.user.lock().clone())
    }

    fn save(&self, user: &SessionUser) -> Result<(), SessionError> {
        *self.user.lock() = Some(user.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.user.lock() = None;
        Ok(())
    }
}

/// Keeps the session as a JSON file, readable only by its owner on unix
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> SessionError {
        SessionError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<SessionUser>, SessionError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn save(&self, user: &SessionUser) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let bytes = serde_json::to_vec_pretty(user)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes).map_err(|e| self.io_error(e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))
                .map_err(|e| self.io_error(e))?;
        }

        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))
    }

    fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(self.io_error(e)),
            _ => Ok(()),
        }
    }
}

/// Sign-in, sign-up and sign-out over one shared [`ApiClient`]
pub struct AuthSession {
    client: Arc<ApiClient>,
    store: Box<dyn SessionStore>,
    user: RwLock<Option<SessionUser>>,
}

impl AuthSession {
    #[must_use]
    pub fn new(client: Arc<ApiClient>, store: Box<dyn SessionStore>) -> Self {
        Self {
            client,
            store,
            user: RwLock::new(None),
        }
    }

    /// Session kept in memory only
    #[must_use]
    pub fn in_memory(client: Arc<ApiClient>) -> Self {
        Self::new(client, Box::new(MemorySessionStore::new()))
    }

    #[must_use]
    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    #[must_use]
    pub fn current_user(&self) -> Option<SessionUser> {
        self.user.read().clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.read().is_some()
    }

    /// Re-arms the credential from the stored session, if there is one.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub fn restore(&self) -> Result<Option<SessionUser>, SessionError> {
        let Some(user) = self.store.load()? else {
            return Ok(None);
        };
        self.client.set_credential(user.token.clone());
        *self.user.write() = Some(user.clone());
        tracing::debug!(user_id = %user.id, "session restored");
        Ok(Some(user))
    }

    /// Signs in with a form-encoded email and password.
    ///
    /// On failure the credential and stored session are left as they were.
    ///
    /// # Errors
    /// Returns the rejected call, or a store failure after a successful sign-in.
    pub async fn sign_in(&self, form: SigninForm) -> Result<SessionUser, SessionError> {
        let user = self
            .client
            .execute(RequestOptions::<AuthSignin>::new().body(form))
            .await?;
        self.establish(user)
    }

    /// Registers a new account and signs it in.
    ///
    /// # Errors
    /// As [`sign_in`](Self::sign_in).
    pub async fn sign_up(&self, form: SignupForm) -> Result<SessionUser, SessionError> {
        let user = self
            .client
            .execute(RequestOptions::<AuthSignup>::new().body(form))
            .await?;
        self.establish(user)
    }

    /// Forgets the session locally, then tells the server.
    ///
    /// Local state is cleared even when the server call fails; the failure is
    /// still returned.
    ///
    /// # Errors
    /// Returns a store failure, or the server's rejection of the sign-out.
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        let token = self.client.credential();

        self.user.write().take();
        self.client.clear_credential();
        let cleared = self.store.clear();

        let mut options = RequestOptions::<AuthSignout>::new();
        if let Some(token) = token {
            match crate::dispatcher::bearer(&token) {
                Ok(value) => {
                    options = options.header_value(http::header::AUTHORIZATION, value);
                }
                Err(e) => return Err(ClientError::from(e).into()),
            }
        }
        let remote = self.client.execute(options).await;
        tracing::debug!(ok = remote.is_ok(), "signed out");

        cleared?;
        remote.map(|_| ()).map_err(Into::into)
    }

    fn establish(&self, user: SessionUser) -> Result<SessionUser, SessionError> {
        self.client.set_credential(user.token.clone());
        *self.user.write() = Some(user.clone());
        tracing::debug!(user_id = %user.id, role = %user.role, "signed in");
        self.store.save(&user)?;
        Ok(user)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn user(token: &str) -> SessionUser {
        SessionUser {
            token: token.to_owned(),
            token_type: "Bearer".to_owned(),
            expires_at: None,
            id: "u1".to_owned(),
            email: "a@b.com".to_owned(),
            name: "Ada".to_owned(),
            role: "user".to_owned(),
            profile_image_url: "/user.png".to_owned(),
            permissions: None,
        }
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemorySessionStore::new();
        assert!(store.load().unwrap().is_none());
        store.save(&user("t")).unwrap();
        assert_eq!(store.load().unwrap().unwrap().token, "t");
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested/session.json"));
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();

        store.save(&user("t")).unwrap();
        assert_eq!(store.load().unwrap(), Some(user("t")));
        store.clear().unwrap();
        assert!(!store.path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));
        store.save(&user("t")).unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, b"{not json").unwrap();
        let err = FileSessionStore::new(path).load().unwrap_err();
        assert!(matches!(err, SessionError::Corrupt(_)));
    }

    #[tokio::test]
    async fn restore_arms_credential() {
        let client = Arc::new(ApiClient::new("http://localhost:8000/api/v1").unwrap());
        let store = MemorySessionStore::new();
        store.save(&user("stored")).unwrap();

        let session = AuthSession::new(Arc::clone(&client), Box::new(store));
        assert!(!session.is_authenticated());

        let restored = session.restore().unwrap().unwrap();
        assert_eq!(restored.token, "stored");
        assert!(session.is_authenticated());
        assert!(client.has_credential());
    }
}
