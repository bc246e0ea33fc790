pub mod descriptor;
pub mod error;
pub mod event;
pub mod record;
