//! Serialized async access to a [`Profile`].

use std::sync::Arc;

use tokio::sync::Mutex;
use zeroize::Zeroizing;

use super::{Profile, ProfileMetadata, ProfileState};
use crate::error::{VaultError, VaultResult};

/// Cloneable handle that runs one profile operation at a time.
///
/// The lock is held for the whole operation, including the PBKDF2 work that
/// `create_new` and `open` push onto the blocking pool.
#[derive(Clone)]
pub struct SharedProfile {
    inner: Arc<Mutex<Profile>>,
}

impl SharedProfile {
    pub fn new(profile: Profile) -> Self {
        Self {
            inner: Arc::new(Mutex::new(profile)),
        }
    }

    pub async fn state(&self) -> ProfileState {
        self.inner.lock().await.state()
    }

    /// Run a synchronous operation under the lock.
    pub async fn with<R>(&self, f: impl FnOnce(&mut Profile) -> VaultResult<R>) -> VaultResult<R> {
        let mut profile = self.inner.lock().await;
        f(&mut *profile)
    }

    /// Run a synchronous operation on the blocking pool, still under the lock.
    async fn with_blocking<R, F>(&self, f: F) -> VaultResult<R>
    where
        F: FnOnce(&mut Profile) -> VaultResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let mut profile = self.inner.clone().lock_owned().await;
        tokio::task::spawn_blocking(move || f(&mut *profile))
            .await
            .map_err(|e| VaultError::Task(e.to_string()))?
    }

    pub async fn create_new(
        &self,
        password: impl Into<String>,
        metadata: ProfileMetadata,
        backup_password: Option<String>,
    ) -> VaultResult<()> {
        let password = Zeroizing::new(password.into());
        let backup_password = backup_password.map(Zeroizing::new);
        self.with_blocking(move |profile| {
            profile.create_new(
                &password,
                metadata,
                backup_password.as_ref().map(|p| p.as_str()),
            )
        })
        .await
    }

    pub async fn open(&self, password: impl Into<String>) -> VaultResult<()> {
        let password = Zeroizing::new(password.into());
        self.with_blocking(move |profile| profile.open(&password))
            .await
    }

    pub async fn open_with_backup(&self, password: impl Into<String>) -> VaultResult<()> {
        let password = Zeroizing::new(password.into());
        self.with_blocking(move |profile| profile.open_with_backup(&password))
            .await
    }

    pub async fn serialize(&self) -> VaultResult<Vec<u8>> {
        self.with(|profile| profile.serialize()).await
    }

    pub async fn close(&self) {
        self.inner.lock().await.close();
    }
}
