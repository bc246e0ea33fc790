use async_trait::async_trait;
use evcal_engine::collect::Challenge;
use evcal_engine::collect::credentials::ChallengeResponder;
use std::io::IsTerminal;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;

/// Asks the operator on the terminal. Declines when stdin is not interactive.
pub struct StdinResponder;

fn prompt_for(challenge: Challenge) -> &'static str {
    match challenge {
        Challenge::Username => "Username: ",
        Challenge::Password => "Password: ",
        Challenge::IdentityCheck => "Phone number or username for the identity check: ",
        Challenge::VerificationCode => "Verification code: ",
    }
}

#[async_trait]
impl ChallengeResponder for StdinResponder {
    async fn respond(&self, challenge: Challenge) -> Option<String> {
        if !std::io::stdin().is_terminal() {
            warn!("Cannot answer {} challenge: stdin is not a terminal", challenge);
            return None;
        }

        let mut stderr = tokio::io::stderr();
        stderr.write_all(prompt_for(challenge).as_bytes()).await.ok()?;
        stderr.flush().await.ok()?;

        let mut line = String::new();
        let read = BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .ok()?;
        let answer = line.trim();
        if read == 0 || answer.is_empty() {
            return None;
        }
        Some(answer.to_string())
    }
}
