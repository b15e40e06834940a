/// agent 执行过程的回调，供界面展示中间步骤
pub trait AgentObserver: Send + Sync {
    fn on_step(&self, _iteration: usize, _max_iterations: usize) {}

    fn on_tool_call(&self, _tool: &str, _arguments: &str) {}

    fn on_tool_result(&self, _tool: &str, _result: &str) {}

    /// 模型输出无法解析、已反馈给模型重试
    fn on_recovered_error(&self, _error: &str) {}

    fn on_final(&self, _output: &str) {}
}

/// 不做任何事
pub struct NoopObserver;

impl AgentObserver for NoopObserver {}

/// 终端输出
pub struct PrintObserver;

impl AgentObserver for PrintObserver {
    fn on_step(&self, iteration: usize, max_iterations: usize) {
        println!("🔄 迭代 {}/{}", iteration, max_iterations);
    }

    fn on_tool_call(&self, tool: &str, arguments: &str) {
        println!("🔧 调用工具：{}({})", tool, arguments);
    }

    fn on_tool_result(&self, _tool: &str, result: &str) {
        println!("✅ 工具调用成功：{}", result);
    }

    fn on_recovered_error(&self, error: &str) {
        println!("⚠️ {}", error);
    }

    fn on_final(&self, _output: &str) {
        println!("✅ 获得最终回复");
    }
}
