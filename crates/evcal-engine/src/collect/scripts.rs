//! In-page scripts evaluated through [`PageSession::evaluate`](crate::session::PageSession::evaluate).
//!
//! Each script is a single expression whose value is JSON-serializable.

/// Posts currently rendered in the timeline.
pub const EXTRACT_POSTS: &str = r#"
(() => {
  const out = [];
  for (const article of document.querySelectorAll('article[data-testid="tweet"]')) {
    const link = article.querySelector('a[href*="/status/"]');
    if (!link) continue;
    const href = link.getAttribute('href') || '';
    const match = href.match(/\/([^\/]+)\/status\/(\d+)/);
    if (!match) continue;
    const textNode = article.querySelector('div[data-testid="tweetText"]');
    const time = article.querySelector('time');
    out.push({
      id: match[2],
      author: match[1],
      text: textNode ? textNode.innerText : '',
      posted_at: time ? time.getAttribute('datetime') : null,
      url: new URL(href, location.origin).href,
    });
  }
  return out;
})()
"#;

/// Member cells of a list members page.
pub const EXTRACT_MEMBERS: &str = r#"
(() => {
  const out = [];
  for (const cell of document.querySelectorAll('div[data-testid="UserCell"]')) {
    const spans = Array.from(cell.querySelectorAll('div[data-testid="User-Name"] span'))
      .map((s) => s.innerText.trim())
      .filter((t) => t.length > 0);
    const handle = spans.find((t) => t.startsWith('@'));
    if (!handle) continue;
    const name = spans.find((t) => !t.startsWith('@')) || null;
    const bio = cell.querySelector('div[data-testid="UserCell-Text"]');
    const verified = cell.querySelector('svg[data-testid="icon-verified"], svg[aria-label*="Verified"], svg[data-testid="icon-blue_checkmark"]');
    out.push({
      user_id: handle.slice(1),
      user_name: name,
      display_name: name,
      bio: bio ? bio.innerText : null,
      is_verified: verified !== null,
    });
  }
  return out;
})()
"#;

pub const SCROLL_PAGE: &str = "(() => { window.scrollBy(0, document.body.scrollHeight); return true; })()";

/// Structural summary used when diagnosing a failed step.
pub const ANALYZE_PAGE: &str = r#"
(() => {
  const testIds = Array.from(document.querySelectorAll('[data-testid]'))
    .map((el) => el.getAttribute('data-testid'));
  return {
    url: location.href,
    title: document.title,
    inputs: document.querySelectorAll('input, textarea').length,
    buttons: document.querySelectorAll('button, [role="button"]').length,
    test_ids: Array.from(new Set(testIds)).slice(0, 50),
  };
})()
"#;
