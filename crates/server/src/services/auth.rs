//! Admin authentication against the credential file.
//!
//! Stored passwords may be Argon2 PHC strings or plain text. Plain-text
//! entries are hashed once at load time so every login goes through the same
//! Argon2 verification.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use secrecy::ExposeSecret;

use brunch_core::{CredentialError, CredentialFile, CredentialStore, PagingCredentials};

/// Errors from loading credentials or checking a login.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The credential file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The credential file is malformed.
    #[error("invalid credential file: {0}")]
    Parse(#[from] CredentialError),

    /// Hashing a password failed.
    #[error("password hashing failed")]
    PasswordHash,

    /// Username or password did not match.
    #[error("invalid username or password")]
    InvalidCredentials,
}

/// Admin accounts loaded from the credential file.
pub struct FileCredentialStore {
    hashes: HashMap<String, String>,
}

impl FileCredentialStore {
    /// Read and parse the credential file at `path`.
    ///
    /// Returns the admin store and the DAPNET account, if the file has one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Io` if the file cannot be read and
    /// `AuthError::Parse` if it is malformed.
    pub fn load(path: &Path) -> Result<(Self, Option<PagingCredentials>), AuthError> {
        let content = std::fs::read_to_string(path).map_err(|source| AuthError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file = CredentialFile::parse(&content)?;
        let paging = file.paging.clone();
        let store = Self::from_file(&file)?;

        tracing::info!(
            path = %path.display(),
            admins = store.hashes.len(),
            paging = paging.is_some(),
            "Loaded credentials"
        );
        Ok((store, paging))
    }

    /// Build the store from parsed credentials.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordHash` if a plain-text password cannot be hashed.
    pub fn from_file(file: &CredentialFile) -> Result<Self, AuthError> {
        if file.admins.is_empty() {
            tracing::warn!("Credential file has no admin accounts; admin login is disabled");
        }

        let mut hashes = HashMap::with_capacity(file.admins.len());
        for account in &file.admins {
            let stored = account.password.expose_secret();
            let hash = if PasswordHash::new(stored).is_ok() {
                stored.to_string()
            } else {
                tracing::warn!(
                    username = %account.username,
                    "Plain-text admin password; store an Argon2 hash instead (brunch-cli hash-password)"
                );
                hash_password(stored)?
            };
            hashes.insert(account.username.clone(), hash);
        }
        Ok(Self { hashes })
    }

    /// Check a login.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown user or a wrong
    /// password.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let hash = self
            .hashes
            .get(username)
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, hash)
    }
}

impl CredentialStore for FileCredentialStore {
    fn verify(&self, username: &str, password: &str) -> bool {
        self.authenticate(username, password).is_ok()
    }
}

impl std::fmt::Debug for FileCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileCredentialStore")
            .field("admins", &self.hashes.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
