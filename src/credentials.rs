//! AWS credentials read from the process environment.
//!
//! Loading never fails.  A missing key surfaces later, when the client signs
//! its first request, as an authentication error.

use std::env;
use std::fmt;

use crate::{Error, Result};

/// Environment variable holding the access key id.
pub const ACCESS_KEY_ID_VAR: &str = "AWS_ACCESS_KEY_ID";

/// Environment variable holding the secret access key.
pub const SECRET_ACCESS_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";

/// Environment variable holding the session token of temporary credentials.
pub const SESSION_TOKEN_VAR: &str = "AWS_SESSION_TOKEN";

/// Credentials used to sign Bedrock requests.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    session_token: Option<String>,
}

impl Credentials {
    /// Creates credentials from explicit values.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: Some(access_key_id.into()),
            secret_access_key: Some(secret_access_key.into()),
            session_token,
        }
    }

    /// Reads credentials from the environment.
    ///
    /// Empty values are treated as absent.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads a `.env` file from the working directory (if there is one) and
    /// then reads credentials from the environment.
    ///
    /// Variables already set in the environment take precedence over the file.
    pub fn from_dotenv_and_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Reads credentials through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        Self {
            access_key_id: read(ACCESS_KEY_ID_VAR),
            secret_access_key: read(SECRET_ACCESS_KEY_VAR),
            session_token: read(SESSION_TOKEN_VAR),
        }
    }

    /// The access key id, if present.
    pub fn access_key_id(&self) -> Option<&str> {
        self.access_key_id.as_deref()
    }

    /// The secret access key, if present.
    pub fn secret_access_key(&self) -> Option<&str> {
        self.secret_access_key.as_deref()
    }

    /// The session token, if present.
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    /// True when both the key id and the secret are present.
    pub fn is_complete(&self) -> bool {
        self.access_key_id.is_some() && self.secret_access_key.is_some()
    }

    /// Returns the key id and secret, or an authentication error naming the
    /// missing variable.
    pub fn require(&self) -> Result<(&str, &str)> {
        let key_id = self.access_key_id().ok_or_else(|| {
            Error::authentication(format!("{ACCESS_KEY_ID_VAR} is not set"))
        })?;
        let secret = self.secret_access_key().ok_or_else(|| {
            Error::authentication(format!("{SECRET_ACCESS_KEY_VAR} is not set"))
        })?;
        Ok((key_id, secret))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
