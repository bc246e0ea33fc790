use super::CollectSettings;
use super::credentials::{Challenge, ChallengeResponder, Credentials};
use crate::resolution::{AdaptiveResolver, TextRoleQuery};
use crate::session::{PageSession, SessionError};
use evcal_common::descriptor::{AttributeCandidates, Descriptor, ElementHandle};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("Could not open the login page: {0}")]
    Navigation(SessionError),

    #[error("Username input not found")]
    UsernameInputNotFound,

    #[error("'Next' button not found after {step}")]
    NextButtonNotFound { step: &'static str },

    #[error("Password input not found")]
    PasswordInputNotFound,

    #[error("No answer available for the {0} challenge")]
    ChallengeUnanswered(Challenge),

    #[error("Login button not found")]
    LoginButtonNotFound,

    #[error("Login was not confirmed: timeline never appeared")]
    NotConfirmed,

    #[error("Session error during {step}: {source}")]
    Session {
        step: &'static str,
        source: SessionError,
    },
}

impl LoginError {
    /// Short stable name of the failing step, also used for page captures.
    pub fn step(&self) -> &'static str {
        match self {
            LoginError::Navigation(_) => "login_navigation",
            LoginError::UsernameInputNotFound => "username_input",
            LoginError::NextButtonNotFound { .. } => "next_button",
            LoginError::PasswordInputNotFound => "password_input",
            LoginError::ChallengeUnanswered(Challenge::VerificationCode) => "verification_code",
            LoginError::ChallengeUnanswered(_) => "identity_check",
            LoginError::LoginButtonNotFound => "login_button",
            LoginError::NotConfirmed => "login_confirmation",
            LoginError::Session { step, .. } => *step,
        }
    }
}

fn username_candidates() -> AttributeCandidates {
    AttributeCandidates::new()
        .with("name", ["text"])
        .with("autocomplete", ["username"])
        .with(
            "aria-label",
            [
                "Phone, email address, or username",
                "電話番号、メールアドレス、またはユーザー名",
            ],
        )
        .with("type", ["text", "email"])
}

fn password_candidates() -> AttributeCandidates {
    AttributeCandidates::new()
        .with("name", ["password"])
        .with("autocomplete", ["current-password"])
        .with("type", ["password"])
}

fn identity_check_candidates() -> AttributeCandidates {
    AttributeCandidates::new()
        .with("data-testid", ["ocfEnterTextTextInput"])
        .with("name", ["text"])
}

fn verification_candidates() -> AttributeCandidates {
    AttributeCandidates::new()
        .with("name", ["challenge_response", "verification_code"])
        .with("data-testid", ["ocfEnterTextTextInput", "LoginVerificationCode"])
        .with("inputmode", ["numeric"])
}

fn next_button() -> TextRoleQuery {
    TextRoleQuery::new()
        .texts(["次へ", "Next"])
        .role("button")
        .test_ids(["ocfEnterTextNextButton", "next_link"])
}

fn confirm_button() -> TextRoleQuery {
    TextRoleQuery::new()
        .texts(["次へ", "Next", "認証", "Verify", "確認"])
        .role("button")
        .test_ids(["ocfEnterTextNextButton"])
}

fn login_button() -> TextRoleQuery {
    TextRoleQuery::new()
        .texts(["ログイン", "Log in"])
        .role("button")
        .test_ids(["ocfLoginButton", "LoginForm_Login_Button", "loginButton"])
}

fn timeline_landmark() -> TextRoleQuery {
    TextRoleQuery::new().role("main").test_ids(["primaryColumn"])
}

/// Scripted sign-in against the platform's multi-step login form.
pub struct LoginFlow<'a> {
    settings: &'a CollectSettings,
    responder: &'a dyn ChallengeResponder,
}

impl<'a> LoginFlow<'a> {
    pub fn new(settings: &'a CollectSettings, responder: &'a dyn ChallengeResponder) -> Self {
        Self { settings, responder }
    }

    pub fn login_url(&self) -> String {
        format!(
            "{}{}",
            self.settings.site.base_url.trim_end_matches('/'),
            self.settings.site.login_path
        )
    }

    pub async fn login(
        &self,
        session: &mut dyn PageSession,
        credentials: &Credentials,
    ) -> Result<(), LoginError> {
        let result = self.run(session, credentials).await;
        if let Err(e) = &result {
            warn!("Login failed at {}: {}", e.step(), e);
            self.settings
                .recorder
                .capture(session, &format!("login_failed_{}", e.step()))
                .await;
        }
        result
    }

    async fn run(
        &self,
        session: &mut dyn PageSession,
        credentials: &Credentials,
    ) -> Result<(), LoginError> {
        let url = self.login_url();
        info!("Opening login page {}", url);
        session.navigate(&url).await.map_err(LoginError::Navigation)?;
        self.settings.pacer.pause().await;

        let step = self.step_timeout();
        let username_input = self
            .find_input(session, &username_candidates(), step)
            .await
            .ok_or(LoginError::UsernameInputNotFound)?;
        fill(session, &username_input, &credentials.username, "username").await?;
        self.settings.pacer.pause().await;
        let missing = LoginError::NextButtonNotFound { step: "username" };
        self.click(session, &next_button(), step, missing).await?;
        self.settings.pacer.pause().await;

        // An unusual-activity check may sit between the username and password steps.
        let probe = Duration::from_millis(self.settings.scraping.challenge_probe_ms);
        if let Some(input) = self.find_input(session, &identity_check_candidates(), probe).await
            && !self.password_visible(session).await
        {
            info!("Identity check requested");
            let answer = self
                .responder
                .respond(Challenge::IdentityCheck)
                .await
                .unwrap_or_else(|| credentials.username.clone());
            fill(session, &input, &answer, "identity_check").await?;
            self.settings.pacer.pause().await;
            let missing = LoginError::NextButtonNotFound {
                step: "identity_check",
            };
            self.click(session, &next_button(), step, missing).await?;
            self.settings.pacer.pause().await;
        }

        let password_input = self
            .find_input(session, &password_candidates(), step)
            .await
            .ok_or(LoginError::PasswordInputNotFound)?;
        fill(session, &password_input, &credentials.password, "password").await?;
        self.settings.pacer.pause().await;
        self.click(session, &login_button(), step, LoginError::LoginButtonNotFound)
            .await?;
        self.settings.pacer.pause().await;

        if let Some(input) = self.find_input(session, &verification_candidates(), probe).await {
            info!("Verification code requested");
            let code = self
                .responder
                .respond(Challenge::VerificationCode)
                .await
                .ok_or(LoginError::ChallengeUnanswered(Challenge::VerificationCode))?;
            fill(session, &input, code.trim(), "verification_code").await?;
            self.settings.pacer.pause().await;
            let missing = LoginError::NextButtonNotFound {
                step: "verification_code",
            };
            self.click(session, &confirm_button(), step, missing).await?;
            self.settings.pacer.pause().await;
        }

        let confirm = Duration::from_millis(self.settings.scraping.login_confirm_timeout_ms);
        self.resolver(session)
            .resolve_by_text_or_role(&timeline_landmark(), confirm)
            .await
            .ok_or(LoginError::NotConfirmed)?;
        info!("Login confirmed");
        Ok(())
    }

    fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.settings.scraping.login_step_timeout_ms)
    }

    fn resolver<'s, 'o>(
        &self,
        session: &'s mut (dyn PageSession + 'o),
    ) -> AdaptiveResolver<'s, dyn PageSession + 'o> {
        AdaptiveResolver::with_config(session, self.settings.resolver.clone())
    }

    async fn find_input(
        &self,
        session: &mut dyn PageSession,
        candidates: &AttributeCandidates,
        timeout: Duration,
    ) -> Option<ElementHandle> {
        self.resolver(session)
            .resolve_by_attributes(candidates, timeout)
            .await
    }

    async fn password_visible(&self, session: &mut dyn PageSession) -> bool {
        let descriptors: Vec<_> = password_candidates()
            .pairs()
            .map(|(name, value)| Descriptor::input_attribute(name, value))
            .collect();
        for descriptor in &descriptors {
            if matches!(session.count(descriptor).await, Ok(n) if n > 0) {
                return true;
            }
        }
        false
    }

    async fn click(
        &self,
        session: &mut dyn PageSession,
        query: &TextRoleQuery,
        timeout: Duration,
        missing: LoginError,
    ) -> Result<(), LoginError> {
        let button = self
            .resolver(session)
            .resolve_by_text_or_role(query, timeout)
            .await
            .ok_or(missing)?;
        session.click(&button).await.map_err(|source| LoginError::Session {
            step: "click",
            source,
        })
    }
}

async fn fill(
    session: &mut dyn PageSession,
    input: &ElementHandle,
    value: &str,
    step: &'static str,
) -> Result<(), LoginError> {
    session
        .fill(input, value)
        .await
        .map_err(|source| LoginError::Session { step, source })
}
