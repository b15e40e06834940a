pub mod catalog;
pub mod registry;

use async_trait::async_trait;
use serde_json::Value;

use crate::types::{FunctionDefinition, Tool as ToolDefinition};

pub use catalog::{assortment_description, AssortmentTool, StoreTool, STORE_DESCRIPTION};
pub use registry::{ToolError, ToolRegistry};

/// 可被 agent 调用的工具
#[async_trait]
pub trait Tool: Send + Sync {
    /// 发给模型的函数名
    fn name(&self) -> &str;

    /// 展示用名称
    fn title(&self) -> &str;

    /// 模型据此决定是否调用，措辞会直接影响选工具的效果
    fn description(&self) -> &str;

    fn parameters_schema(&self) -> Option<Value> {
        None
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(FunctionDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        })
    }
}
