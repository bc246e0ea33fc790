use chromiumoxide::Page;
use evcal_common::error::SessionError;
use serde_json::Value;
use std::time::Duration;

const LOCATOR_JS: &str = include_str!("locator.js");

/// Default timeout for JavaScript evaluation.
/// Keeps a blocking dialog from hanging the caller.
pub const EVAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum retries for context errors during page navigation.
const MAX_CONTEXT_RETRIES: u32 = 10;

const CONTEXT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Whether the error means the page context is gone, usually mid-navigation.
fn is_context_error(err: &str) -> bool {
    err.contains("Cannot find context")
        || err.contains("Execution context was destroyed")
        || err.contains("-32000")
}

#[derive(Debug)]
pub enum EvalError {
    Timeout,
    Context(String),
    Other(String),
}

impl From<EvalError> for SessionError {
    fn from(err: EvalError) -> Self {
        match err {
            EvalError::Timeout => SessionError::TimeoutWithContext {
                operation: "script evaluation (possibly blocked by a dialog)".into(),
            },
            EvalError::Context(message) => SessionError::ScriptError(message),
            EvalError::Other(message) => SessionError::from_driver_message(message),
        }
    }
}

pub async fn evaluate_with_timeout(page: &Page, expression: &str) -> Result<Value, EvalError> {
    match tokio::time::timeout(EVAL_TIMEOUT, page.evaluate(expression)).await {
        Err(_) => Err(EvalError::Timeout),
        Ok(Err(e)) => {
            let err_str = e.to_string();
            if is_context_error(&err_str) {
                Err(EvalError::Context(err_str))
            } else {
                Err(EvalError::Other(err_str))
            }
        }
        // `undefined` results carry no value; treat them as null.
        Ok(Ok(result)) => Ok(result.value().cloned().unwrap_or(Value::Null)),
    }
}

/// Evaluate, retrying while the page context is being replaced.
pub async fn evaluate(page: &Page, expression: &str) -> Result<Value, SessionError> {
    let mut last_error = None;
    for attempt in 0..MAX_CONTEXT_RETRIES {
        match evaluate_with_timeout(page, expression).await {
            Err(EvalError::Context(err_str)) => {
                tracing::debug!(
                    "Context error during evaluation (attempt {}/{}), retrying...",
                    attempt + 1,
                    MAX_CONTEXT_RETRIES
                );
                last_error = Some(err_str);
                tokio::time::sleep(CONTEXT_RETRY_DELAY).await;
            }
            other => return other.map_err(SessionError::from),
        }
    }
    Err(SessionError::ScriptError(
        last_error.unwrap_or_else(|| "evaluation failed after retries".to_string()),
    ))
}

/// Install the locator helpers unless the current document already has them.
pub async fn inject_locator(page: &Page) -> Result<(), SessionError> {
    let loaded = evaluate(page, "typeof window.__evcal !== 'undefined'").await?;
    if loaded != Value::Bool(true) {
        evaluate(page, LOCATOR_JS).await?;
    }
    Ok(())
}

/// Call `window.__evcal.<method>(<args>)`, injecting the helpers first.
pub async fn call_locator(page: &Page, method: &str, args: &[Value]) -> Result<Value, SessionError> {
    let args = args
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()?
        .join(", ");
    let expression = format!("window.__evcal.{}({})", method, args);

    let mut last_error = None;
    for attempt in 0..MAX_CONTEXT_RETRIES {
        inject_locator(page).await?;
        match evaluate_with_timeout(page, &expression).await {
            Ok(value) => return Ok(value),
            Err(EvalError::Context(err_str)) => {
                tracing::debug!(
                    "Context error during {} (attempt {}/{}), retrying...",
                    method,
                    attempt + 1,
                    MAX_CONTEXT_RETRIES
                );
                last_error = Some(err_str);
                tokio::time::sleep(CONTEXT_RETRY_DELAY).await;
            }
            Err(other) => return Err(other.into()),
        }
    }
    Err(SessionError::ScriptError(
        last_error.unwrap_or_else(|| format!("{} failed after retries", method)),
    ))
}
