pub mod agent;
pub mod backend;
pub mod chat;
pub mod cli;
pub mod config;
pub mod server;
pub mod tools;
pub mod types;

pub use agent::{build_agent, Agent, AgentProfile};
pub use backend::{AssortmentRecord, BackendClient, Catalog, FetchError, StoreRecord};
pub use chat::{ChatError, ChatService};
pub use cli::run_cli;
pub use config::Config;
