pub mod budget;
pub mod resolver;

pub use budget::SearchBudget;
pub use resolver::{AdaptiveResolver, ResolverConfig, TextRoleQuery, text_or_role_descriptors};
