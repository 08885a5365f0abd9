pub mod meili;
pub mod r#trait;

pub use meili::MeilisearchIndex;
pub use r#trait::VectorIndex;
