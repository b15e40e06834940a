use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::backend::Catalog;
use crate::config::ToolsConfig;
use crate::types::Tool as ToolDefinition;

use super::catalog::{AssortmentTool, StoreTool};
use super::Tool;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("未知工具：{0}")]
    UnknownTool(String),

    #[error("工具 {tool} 参数无效：{reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("工具 {tool} 执行失败：{source}")]
    Failed {
        tool: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ToolError {
    /// 模型输出层面的错误，可以反馈给模型重试
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ToolError::Failed { .. })
    }
}

/// 工具注册表
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        ToolRegistry { tools: Vec::new() }
    }

    /// 商品 + 门店两个查询工具
    pub fn with_catalog(catalog: Arc<dyn Catalog>, config: &ToolsConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(AssortmentTool::new(catalog.clone(), &config.categories)));
        registry.register(Arc::new(StoreTool::new(catalog)));
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn find(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    /// 获取所有工具定义
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// 按名称执行工具，arguments 为模型给出的原始 JSON 文本
    pub async fn execute(&self, name: &str, arguments: &str) -> Result<String, ToolError> {
        let tool = self
            .find(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let args = parse_arguments(tool.as_ref(), arguments)?;

        tool.execute(args).await.map_err(|source| ToolError::Failed {
            tool: name.to_string(),
            source,
        })
    }
}

/// 解析并校验参数；裸字符串会被填进唯一的必填参数
fn parse_arguments(tool: &dyn Tool, arguments: &str) -> Result<Value, ToolError> {
    let invalid = |reason: String| ToolError::InvalidArguments {
        tool: tool.name().to_string(),
        reason,
    };

    let trimmed = arguments.trim();
    let value: Value = if trimmed.is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_str(trimmed).map_err(|e| invalid(e.to_string()))?
    };

    let schema = match tool.parameters_schema() {
        Some(schema) => schema,
        None => return Ok(value),
    };

    let required: Vec<&str> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|r| r.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    let value = match value {
        Value::String(s) if required.len() == 1 => {
            let mut object = serde_json::Map::new();
            object.insert(required[0].to_string(), Value::String(s));
            Value::Object(object)
        }
        object @ Value::Object(_) => object,
        other => return Err(invalid(format!("需要 JSON 对象，实际为 {}", other))),
    };

    for key in &required {
        match value.get(*key) {
            Some(Value::Null) | None => return Err(invalid(format!("缺少 {} 参数", key))),
            Some(_) => {}
        }
    }

    if let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) {
        for (key, property) in properties {
            let expected = match property.get("type").and_then(|t| t.as_str()) {
                Some(expected) => expected,
                None => continue,
            };
            match value.get(key) {
                Some(Value::Null) | None => {}
                Some(actual) if matches_type(actual, expected) => {}
                Some(actual) => {
                    return Err(invalid(format!("{} 参数应为 {}，实际为 {}", key, expected, actual)))
                }
            }
        }
    }

    Ok(value)
}

/// JSON Schema 基本类型检查
fn matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{AssortmentRecord, FetchError, StoreRecord};
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeCatalog {
        calls: Mutex<Vec<Option<String>>>,
        fail_stores: bool,
    }

    #[async_trait]
    impl Catalog for FakeCatalog {
        async fn assortment(&self, pathname: Option<&str>) -> Result<Vec<AssortmentRecord>, FetchError> {
            self.calls.lock().unwrap().push(pathname.map(str::to_string));
            Ok(vec![AssortmentRecord { name: "PodX".to_string() }])
        }

        async fn stores(&self) -> Result<Vec<StoreRecord>, FetchError> {
            if self.fail_stores {
                return Err(FetchError::Status {
                    status: StatusCode::UNAUTHORIZED,
                    url: "http://backend/store".to_string(),
                });
            }
            Ok(vec![StoreRecord {
                id: serde_json::json!(1),
                name: "Central".to_string(),
                address: "Main St 1".to_string(),
            }])
        }
    }

    fn registry(catalog: Arc<FakeCatalog>) -> ToolRegistry {
        ToolRegistry::with_catalog(catalog, &ToolsConfig::default())
    }

    #[test]
    fn definitions_expose_both_tools() {
        let defs = registry(Arc::new(FakeCatalog::default())).definitions();
        let names: Vec<&str> = defs.iter().map(|d| d.function.name.as_str()).collect();
        assert_eq!(names, vec!["get_assortment", "get_stores"]);
        assert!(defs[0].function.parameters.is_some());
        assert!(defs[1].function.parameters.is_none());
        assert_eq!(defs[1].tool_type, "function");
    }

    #[tokio::test]
    async fn assortment_passes_variant_through() {
        let catalog = Arc::new(FakeCatalog::default());
        let out = registry(catalog.clone())
            .execute("get_assortment", r#"{"variant":"pods"}"#)
            .await
            .unwrap();

        assert_eq!(out, r#"[{"name":"PodX"}]"#);
        assert_eq!(*catalog.calls.lock().unwrap(), vec![Some("pods".to_string())]);
    }

    #[tokio::test]
    async fn bare_string_fills_single_required_param() {
        let catalog = Arc::new(FakeCatalog::default());
        registry(catalog.clone())
            .execute("get_assortment", r#""POD""#)
            .await
            .unwrap();
        assert_eq!(*catalog.calls.lock().unwrap(), vec![Some("POD".to_string())]);
    }

    #[tokio::test]
    async fn stores_ignore_arguments() {
        let out = registry(Arc::new(FakeCatalog::default()))
            .execute("get_stores", "")
            .await
            .unwrap();
        assert_eq!(out, r#"[{"id":1,"name":"Central","address":"Main St 1"}]"#);
    }

    #[tokio::test]
    async fn malformed_arguments_are_recoverable() {
        let reg = registry(Arc::new(FakeCatalog::default()));

        let err = reg.execute("get_assortment", "{variant:").await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
        assert!(err.is_recoverable());

        let err = reg.execute("get_assortment", "{}").await.unwrap_err();
        assert!(err.to_string().contains("variant"));

        let err = reg.execute("get_weather", "{}").await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(ref n) if n == "get_weather"));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn wrong_typed_arguments_are_recoverable() {
        let catalog = Arc::new(FakeCatalog::default());
        let reg = registry(catalog.clone());

        for args in [r#"{"variant": 5}"#, r#"{"variant": {}}"#, r#"{"variant": ["POD"]}"#] {
            let err = reg.execute("get_assortment", args).await.unwrap_err();
            assert!(matches!(err, ToolError::InvalidArguments { .. }), "{}", args);
            assert!(err.is_recoverable());
            assert!(err.to_string().contains("variant"));
        }

        let err = reg.execute("get_assortment", "5").await.unwrap_err();
        assert!(err.is_recoverable());

        assert!(catalog.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn schema_type_names() {
        assert!(matches_type(&serde_json::json!("x"), "string"));
        assert!(!matches_type(&serde_json::json!(5), "string"));
        assert!(matches_type(&serde_json::json!(5), "integer"));
        assert!(!matches_type(&serde_json::json!(5.5), "integer"));
        assert!(matches_type(&serde_json::json!(5.5), "number"));
        assert!(matches_type(&serde_json::json!(null), "whatever"));
    }

    #[tokio::test]
    async fn fetch_failure_is_not_recoverable() {
        let catalog = Arc::new(FakeCatalog {
            fail_stores: true,
            ..FakeCatalog::default()
        });
        let err = registry(catalog).execute("get_stores", "{}").await.unwrap_err();
        assert!(!err.is_recoverable());

        let ToolError::Failed { source, .. } = err else {
            panic!("expected Failed");
        };
        let fetch = source.downcast_ref::<FetchError>().unwrap();
        assert_eq!(fetch.status(), Some(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn register_replaces_same_name() {
        let catalog: Arc<dyn Catalog> = Arc::new(FakeCatalog::default());
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(StoreTool::new(catalog.clone())));
        reg.register(Arc::new(StoreTool::new(catalog)));
        assert_eq!(reg.tools().len(), 1);
    }
}
