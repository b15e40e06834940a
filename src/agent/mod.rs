pub mod context;
pub mod core;
pub mod llm;
pub mod observer;

pub use context::Context;
pub use core::{build_agent, Agent, AgentOutput, AgentProfile, INVALID_RESPONSE, ITERATION_LIMIT_OUTPUT};
pub use llm::{build_model, CachedModel, ChatModel, OpenAiClient};
pub use observer::{AgentObserver, NoopObserver, PrintObserver};
