//! Chromium page sessions over the DevTools protocol.

pub mod cdp;
pub mod inject;
pub mod launcher;
pub mod session;

pub use launcher::ChromiumLauncher;
pub use session::ChromiumSession;
