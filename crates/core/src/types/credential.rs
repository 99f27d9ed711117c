//! Admin and paging-service credentials.
//!
//! Credentials come from a line-oriented file of `key:value` pairs:
//!
//! ```text
//! # admin accounts: username:password (plain text or an Argon2 PHC string)
//! erik:$argon2id$v=19$m=19456,t=2,p=1$...
//! helga:kaffee-und-kuchen
//!
//! # DAPNET paging account
//! dapnet.user:do1ffe
//! dapnet.password:geheim
//! ```
//!
//! Lines are split at the first `:` so passwords may contain colons. Blank
//! lines and lines starting with `#` are ignored.

use secrecy::SecretString;

/// Key prefix reserved for paging-service settings.
const PAGING_PREFIX: &str = "dapnet.";

/// Errors that can occur when parsing a credential file.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// A line has no `:` separator.
    #[error("line {line}: expected 'key:value'")]
    MalformedLine {
        /// 1-based line number.
        line: usize,
    },
    /// A line has an empty key.
    #[error("line {line}: empty username")]
    EmptyKey {
        /// 1-based line number.
        line: usize,
    },
    /// The same admin username appears twice.
    #[error("line {line}: duplicate user '{username}'")]
    DuplicateUser {
        /// 1-based line number of the second entry.
        line: usize,
        /// Repeated username.
        username: String,
    },
    /// A `dapnet.` key other than `user` or `password`.
    #[error("line {line}: unknown paging setting '{key}'")]
    UnknownPagingKey {
        /// 1-based line number.
        line: usize,
        /// Offending key.
        key: String,
    },
    /// Only one of `dapnet.user` and `dapnet.password` is present.
    #[error("dapnet.user and dapnet.password must be given together")]
    IncompletePaging,
}

/// One administrator account.
#[derive(Debug, Clone)]
pub struct AdminAccount {
    /// Login name.
    pub username: String,
    /// Stored password: an Argon2 PHC string or plain text.
    pub password: SecretString,
}

/// Credentials for the DAPNET paging API.
#[derive(Debug, Clone)]
pub struct PagingCredentials {
    /// DAPNET login (usually a callsign).
    pub user: String,
    /// DAPNET password.
    pub password: SecretString,
}

/// Parsed contents of a credential file.
#[derive(Debug, Clone, Default)]
pub struct CredentialFile {
    /// Administrator accounts in file order.
    pub admins: Vec<AdminAccount>,
    /// Paging credentials, if configured.
    pub paging: Option<PagingCredentials>,
}

impl CredentialFile {
    /// Parse the text of a credential file.
    ///
    /// # Errors
    ///
    /// Returns a `CredentialError` naming the first offending line.
    pub fn parse(content: &str) -> Result<Self, CredentialError> {
        let mut admins: Vec<AdminAccount> = Vec::new();
        let mut paging_user = None;
        let mut paging_password = None;

        for (index, raw) in content.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let (key, value) = trimmed
                .split_once(':')
                .ok_or(CredentialError::MalformedLine { line })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(CredentialError::EmptyKey { line });
            }

            if let Some(setting) = key.strip_prefix(PAGING_PREFIX) {
                match setting {
                    "user" => paging_user = Some(value.trim().to_owned()),
                    "password" => paging_password = Some(SecretString::from(value.to_owned())),
                    _ => {
                        return Err(CredentialError::UnknownPagingKey {
                            line,
                            key: key.to_owned(),
                        });
                    }
                }
                continue;
            }

            if admins.iter().any(|account| account.username == key) {
                return Err(CredentialError::DuplicateUser {
                    line,
                    username: key.to_owned(),
                });
            }
            admins.push(AdminAccount {
                username: key.to_owned(),
                password: SecretString::from(value.to_owned()),
            });
        }

        let paging = match (paging_user, paging_password) {
            (Some(user), Some(password)) => Some(PagingCredentials { user, password }),
            (None, None) => None,
            _ => return Err(CredentialError::IncompletePaging),
        };

        Ok(Self { admins, paging })
    }

    /// Look up an admin account by username.
    #[must_use]
    pub fn admin(&self, username: &str) -> Option<&AdminAccount> {
        self.admins.iter().find(|account| account.username == username)
    }
}

/// Capability to check admin logins.
///
/// The server uses a file-backed implementation; tests swap in doubles.
pub trait CredentialStore: Send + Sync {
    /// Returns `true` if `username` exists and `password` matches.
    fn verify(&self, username: &str, password: &str) -> bool;
}
