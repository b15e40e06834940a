use anyhow::{Context as _, Result};
use std::sync::Arc;

use crate::config::CONSULTANT_PROMPT;
use crate::tools::ToolRegistry;
use crate::types::{Message, ToolCall};

use super::context::Context;
use super::llm::ChatModel;
use super::observer::AgentObserver;

/// 达到最大迭代次数时的回复
pub const ITERATION_LIMIT_OUTPUT: &str = "Agent stopped due to iteration limit or time limit.";

/// 模型输出无法使用时反馈给模型的提示
pub const INVALID_RESPONSE: &str = "Invalid or incomplete response";

/// 创建 agent 时的可选项：是否带记忆、是否带系统提示
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentProfile {
    pub enable_memory: bool,
    pub system_prompt: Option<String>,
}

impl AgentProfile {
    /// 无记忆、无系统提示，每条消息独立处理
    pub fn minimal() -> Self {
        AgentProfile::default()
    }

    /// 带记忆的店员人设
    pub fn consultant() -> Self {
        AgentProfile {
            enable_memory: true,
            system_prompt: Some(CONSULTANT_PROMPT.to_string()),
        }
    }
}

/// 一次调用的结果
#[derive(Debug, Clone, PartialEq)]
pub struct AgentOutput {
    pub output: String,
    pub tool_calls: usize,
}

pub struct Agent {
    profile: AgentProfile,
    model: Arc<dyn ChatModel>,
    tools: Arc<ToolRegistry>,
    memory: Option<Context>,
    max_iterations: usize,
}

/// 组装 agent
pub fn build_agent(
    profile: AgentProfile,
    model: Arc<dyn ChatModel>,
    tools: Arc<ToolRegistry>,
    max_iterations: usize,
) -> Agent {
    let memory = profile.enable_memory.then(Context::new);

    Agent {
        profile,
        model,
        tools,
        memory,
        max_iterations: max_iterations.max(1),
    }
}

impl Agent {
    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    /// 会话记忆，未开启时为 None
    pub fn memory(&self) -> Option<&Context> {
        self.memory.as_ref()
    }

    /// 清空会话记忆
    pub fn clear_history(&mut self) {
        if let Some(memory) = self.memory.as_mut() {
            memory.clear();
        }
    }

    /// 处理一条用户消息
    pub async fn chat(&mut self, input: &str, observer: &dyn AgentObserver) -> Result<AgentOutput> {
        let definitions = self.tools.definitions();
        let mut scratchpad: Vec<Message> = Vec::new();
        let mut tool_calls = 0;

        for iteration in 1..=self.max_iterations {
            observer.on_step(iteration, self.max_iterations);
            tracing::debug!(iteration, max = self.max_iterations, "agent 迭代");

            let messages = self.prompt(input, &scratchpad);
            let reply = self
                .model
                .complete(&messages, &definitions)
                .await
                .context("调用语言模型失败")?;

            if let Some(calls) = reply.tool_calls.clone().filter(|c| !c.is_empty()) {
                scratchpad.push(Message::assistant_tool_calls(reply.content.clone(), calls.clone()));
                tool_calls += calls.len();

                for call in &calls {
                    let observation = self.run_tool(call, observer).await?;
                    scratchpad.push(Message::tool_result(&call.id, &observation));
                }
                continue;
            }

            let output = reply.text_content().trim();
            if output.is_empty() {
                tracing::warn!(iteration, "模型返回空回复，要求重新作答");
                observer.on_recovered_error(INVALID_RESPONSE);
                scratchpad.push(Message::user(INVALID_RESPONSE));
                continue;
            }

            observer.on_final(output);
            return Ok(self.finish(input, output.to_string(), tool_calls));
        }

        tracing::warn!(max = self.max_iterations, "agent 达到最大迭代次数");
        Ok(self.finish(input, ITERATION_LIMIT_OUTPUT.to_string(), tool_calls))
    }

    /// 执行一次工具调用；参数类错误转成观察结果交给模型，其余错误向上抛
    async fn run_tool(&self, call: &ToolCall, observer: &dyn AgentObserver) -> Result<String> {
        let name = &call.function.name;
        let arguments = &call.function.arguments;

        observer.on_tool_call(name, arguments);
        tracing::debug!(tool = %name, %arguments, "调用工具");

        match self.tools.execute(name, arguments).await {
            Ok(result) => {
                observer.on_tool_result(name, &result);
                Ok(result)
            }
            Err(e) if e.is_recoverable() => {
                tracing::warn!(tool = %name, error = %e, "工具调用无效，反馈给模型");
                observer.on_recovered_error(&e.to_string());
                Ok(format!("{}: {}", INVALID_RESPONSE, e))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn prompt(&self, input: &str, scratchpad: &[Message]) -> Vec<Message> {
        let history = self.memory.as_ref().map(|m| m.messages()).unwrap_or_default();
        let mut messages = Vec::with_capacity(history.len() + scratchpad.len() + 2);

        if let Some(prompt) = &self.profile.system_prompt {
            messages.push(Message::system(prompt));
        }
        messages.extend(history.iter().cloned());
        messages.push(Message::user(input));
        messages.extend(scratchpad.iter().cloned());

        messages
    }

    fn finish(&mut self, input: &str, output: String, tool_calls: usize) -> AgentOutput {
        if let Some(memory) = self.memory.as_mut() {
            memory.record_turn(input, &output);
        }
        AgentOutput { output, tool_calls }
    }
}
