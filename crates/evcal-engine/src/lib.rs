pub mod collect;
pub mod config;
pub mod integrate;
pub mod pipeline;
pub mod process;
pub mod publish;
pub mod resolution;
pub mod session;
pub mod storage;

pub use evcal_common::descriptor;
pub use evcal_common::event;
pub use evcal_common::record;
