pub mod groq;
pub mod r#trait;

pub use groq::GroqProvider;
pub use r#trait::{LlmProvider, TokenStream};
