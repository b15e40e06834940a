//! 会话与消息处理：每个会话持有自己的 agent

mod session;

pub use session::{ChatError, ChatService, SessionId, SessionInfo};
