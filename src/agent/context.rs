use crate::types::Message;

/// 会话记忆 - 只保存用户输入和最终回复
#[derive(Debug, Clone, Default)]
pub struct Context {
    messages: Vec<Message>,
}

impl Context {
    pub fn new() -> Self {
        Context {
            messages: Vec::new(),
        }
    }

    /// 记录一轮对话
    pub fn record_turn(&mut self, input: &str, output: &str) {
        self.messages.push(Message::user(input));
        self.messages.push(Message::assistant(output));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// 已完成的轮数
    pub fn turns(&self) -> usize {
        self.messages.len() / 2
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
