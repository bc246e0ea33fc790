use crate::config::schema::CredentialsConfig;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;

pub const USERNAME_ENV: &str = "EVCAL_USERNAME";
pub const PASSWORD_ENV: &str = "EVCAL_PASSWORD";

/// A question the login flow cannot answer on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Challenge {
    Username,
    Password,
    /// Username or phone number re-entry after an unusual-activity check.
    IdentityCheck,
    /// One-time code from an authenticator app, SMS or email.
    VerificationCode,
}

impl fmt::Display for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Challenge::Username => "username",
            Challenge::Password => "password",
            Challenge::IdentityCheck => "username or phone number for identity check",
            Challenge::VerificationCode => "verification code",
        };
        f.write_str(label)
    }
}

/// Supplies answers to login challenges, typically by asking a human.
#[async_trait]
pub trait ChallengeResponder: Send + Sync {
    /// `None` means no answer is available.
    async fn respond(&self, challenge: Challenge) -> Option<String>;
}

/// Answers from a fixed table; never prompts.
#[derive(Debug, Clone, Default)]
pub struct StaticResponder {
    answers: HashMap<Challenge, String>,
}

impl StaticResponder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, challenge: Challenge, answer: impl Into<String>) -> Self {
        self.answers.insert(challenge, answer.into());
        self
    }
}

#[async_trait]
impl ChallengeResponder for StaticResponder {
    async fn respond(&self, challenge: Challenge) -> Option<String> {
        self.answers.get(&challenge).cloned()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Config values first, then the process environment, then the responder.
    pub async fn resolve(
        config: &CredentialsConfig,
        responder: &dyn ChallengeResponder,
    ) -> Option<Self> {
        Self::resolve_with(config, |key| std::env::var(key).ok(), responder).await
    }

    pub async fn resolve_with<F>(
        config: &CredentialsConfig,
        env: F,
        responder: &dyn ChallengeResponder,
    ) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let configured = non_empty(config.username.clone()).or_else(|| non_empty(env(USERNAME_ENV)));
        let username = match configured {
            Some(username) => username,
            None => non_empty(responder.respond(Challenge::Username).await)?,
        };
        let configured = non_empty(config.password.clone()).or_else(|| non_empty(env(PASSWORD_ENV)));
        let password = match configured {
            Some(password) => password,
            None => non_empty(responder.respond(Challenge::Password).await)?,
        };
        Some(Self { username, password })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
