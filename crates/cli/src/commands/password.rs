//! Password hashing for the credential file.
//!
//! # Usage
//!
//! ```bash
//! echo -n 'secret' | brunch-cli hash-password
//! ```
//!
//! Put the printed hash after `username:` in the credential file.

use std::io::BufRead;

use brunch_server::services::{AuthError, hash_password};
use thiserror::Error;

/// Errors from hashing a password.
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to read password: {0}")]
    Io(#[from] std::io::Error),

    #[error("Password must not be empty")]
    Empty,

    #[error(transparent)]
    Hash(#[from] AuthError),
}

/// Hash `password`, or the first line of stdin, and print the PHC string.
#[allow(clippy::print_stdout)]
pub fn hash(password: Option<String>) -> Result<(), PasswordError> {
    let password = match password {
        Some(password) => password,
        None => read_line(std::io::stdin().lock())?,
    };
    if password.is_empty() {
        return Err(PasswordError::Empty);
    }

    let hash = hash_password(&password)?;
    println!("{hash}");
    Ok(())
}

/// First line of `input` without its line ending.
fn read_line(mut input: impl BufRead) -> Result<String, std::io::Error> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
