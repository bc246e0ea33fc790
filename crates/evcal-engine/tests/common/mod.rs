#![allow(dead_code)]

use async_trait::async_trait;
use evcal_engine::collect::scripts;
use evcal_engine::descriptor::{Descriptor, ElementHandle};
use evcal_engine::session::{NavigationResult, PageSession, SessionError, SessionLauncher};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// How an element answers visibility and count queries.
#[derive(Debug, Clone)]
pub enum Behavior {
    Visible,
    /// Becomes visible this long after the page was created.
    AppearsAfter(Duration),
    /// Passes the visibility wait, then counts as zero matches.
    Vanishes,
    Fails(SessionError),
    /// The page dies while this element is being waited for.
    ClosesSession,
}

pub type Page = Vec<(String, Behavior)>;

pub fn page(elements: &[(&str, Behavior)]) -> Page {
    elements
        .iter()
        .map(|(label, behavior)| (label.to_string(), behavior.clone()))
        .collect()
}

/// A scripted page keyed by descriptor labels (their `Display` form).
pub struct FakePage {
    pub open: bool,
    pub elements: HashMap<String, Behavior>,
    /// Clicking an element swaps in the next page queued under its label.
    pub transitions: HashMap<String, VecDeque<Page>>,
    /// Results for extraction scripts, in order; scroll scripts never consume them.
    pub evaluations: VecDeque<Result<Value, SessionError>>,
    pub attempts: Vec<(String, Duration)>,
    pub navigations: Vec<String>,
    pub fills: Vec<(String, String)>,
    pub clicks: Vec<String>,
    pub scrolls: usize,
    handles: HashMap<u32, String>,
    next_id: u32,
    created: Instant,
}

impl FakePage {
    pub fn new(elements: Page) -> Self {
        Self {
            open: true,
            elements: elements.into_iter().collect(),
            transitions: HashMap::new(),
            evaluations: VecDeque::new(),
            attempts: Vec::new(),
            navigations: Vec::new(),
            fills: Vec::new(),
            clicks: Vec::new(),
            scrolls: 0,
            handles: HashMap::new(),
            next_id: 1,
            created: Instant::now(),
        }
    }

    pub fn on_click(mut self, label: &str, next: Page) -> Self {
        self.transitions
            .entry(label.to_string())
            .or_default()
            .push_back(next);
        self
    }

    pub fn with_evaluations(mut self, results: Vec<Result<Value, SessionError>>) -> Self {
        self.evaluations = results.into();
        self
    }

    pub fn attempted(&self) -> Vec<&str> {
        self.attempts.iter().map(|(label, _)| label.as_str()).collect()
    }

    pub fn total_timeout(&self) -> Duration {
        self.attempts.iter().map(|(_, t)| *t).sum()
    }

    fn handle(&mut self, descriptor: &Descriptor) -> ElementHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.handles.insert(id, descriptor.to_string());
        ElementHandle {
            id,
            descriptor: descriptor.clone(),
        }
    }

    fn label_of(&self, element: &ElementHandle) -> Result<String, SessionError> {
        self.handles
            .get(&element.id)
            .cloned()
            .ok_or(SessionError::ElementStale { id: element.id })
    }
}

#[async_trait]
impl PageSession for FakePage {
    async fn is_open(&self) -> bool {
        self.open
    }

    async fn wait_for_visible(
        &mut self,
        descriptor: &Descriptor,
        timeout: Duration,
    ) -> Result<ElementHandle, SessionError> {
        let label = descriptor.to_string();
        self.attempts.push((label.clone(), timeout));
        if !self.open {
            return Err(SessionError::SessionClosed);
        }
        match self.elements.get(&label).cloned() {
            Some(Behavior::Visible) | Some(Behavior::Vanishes) => Ok(self.handle(descriptor)),
            Some(Behavior::AppearsAfter(at)) => {
                let now = self.created.elapsed();
                if now + timeout >= at {
                    tokio::time::sleep(at.saturating_sub(now)).await;
                    Ok(self.handle(descriptor))
                } else {
                    tokio::time::sleep(timeout).await;
                    Err(SessionError::Timeout)
                }
            }
            Some(Behavior::Fails(e)) => Err(e),
            Some(Behavior::ClosesSession) => {
                self.open = false;
                Err(SessionError::SessionClosed)
            }
            None => {
                tokio::time::sleep(timeout).await;
                Err(SessionError::Timeout)
            }
        }
    }

    async fn count(&mut self, descriptor: &Descriptor) -> Result<usize, SessionError> {
        match self.elements.get(&descriptor.to_string()) {
            Some(Behavior::Visible) => Ok(1),
            Some(Behavior::AppearsAfter(at)) if self.created.elapsed() >= *at => Ok(1),
            _ => Ok(0),
        }
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult, SessionError> {
        if !self.open {
            return Err(SessionError::SessionClosed);
        }
        self.navigations.push(url.to_string());
        Ok(NavigationResult {
            url: url.to_string(),
            title: "fake".into(),
        })
    }

    async fn fill(&mut self, element: &ElementHandle, text: &str) -> Result<(), SessionError> {
        let label = self.label_of(element)?;
        self.fills.push((label, text.to_string()));
        Ok(())
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<(), SessionError> {
        let label = self.label_of(element)?;
        self.clicks.push(label.clone());
        if let Some(next) = self.transitions.get_mut(&label).and_then(VecDeque::pop_front) {
            self.elements = next.into_iter().collect();
        }
        Ok(())
    }

    async fn evaluate(&mut self, script: &str) -> Result<Value, SessionError> {
        if !self.open {
            return Err(SessionError::SessionClosed);
        }
        if script == scripts::SCROLL_PAGE {
            self.scrolls += 1;
            return Ok(json!(true));
        }
        self.evaluations.pop_front().unwrap_or(Ok(json!([])))
    }

    async fn content(&mut self) -> Result<String, SessionError> {
        Ok("<html><body>fake</body></html>".into())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, SessionError> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.open = false;
        Ok(())
    }
}

/// Hands out pre-built pages; fails once they run out.
pub struct FakeLauncher {
    pages: Mutex<VecDeque<FakePage>>,
}

impl FakeLauncher {
    pub fn new(pages: Vec<FakePage>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
        }
    }

    pub fn failing() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn PageSession>, SessionError> {
        let next = self.pages.lock().unwrap().pop_front();
        match next {
            Some(page) => Ok(Box::new(page)),
            None => Err(SessionError::ConnectionLost),
        }
    }
}

pub fn post(id: &str, author: &str, text: &str) -> Value {
    json!({
        "id": id,
        "author": author,
        "text": text,
        "posted_at": "2025-05-01T12:00:00.000Z",
        "url": format!("https://x.com/{author}/status/{id}"),
    })
}
