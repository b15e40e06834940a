use anyhow::Context;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::sync::Arc;

use crate::backend::Catalog;
use crate::config::ProductCategory;

use super::Tool;

pub const STORE_DESCRIPTION: &str =
    "useful for when you need to answer questions about stores, location of outlets and where you can buy goods";

const ASSORTMENT_PREAMBLE: &str =
    "This information is helpful for responding to queries about different product categories.";

static ASSORTMENT_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::json!({
        "type": "object",
        "properties": {
            "variant": {
                "title": "Variant",
                "type": "string"
            }
        },
        "required": ["variant"]
    })
});

/// 拼接 assortment 工具描述，默认分类下与线上文案一字不差
pub fn assortment_description(categories: &[ProductCategory]) -> String {
    let items: Vec<String> = categories
        .iter()
        .map(|c| format!("{} ({})", c.name, c.topic))
        .collect();

    let listed = match items.as_slice() {
        [] => return ASSORTMENT_PREAMBLE.to_string(),
        [only] => only.clone(),
        [first, second] => format!("{} and {}", first, second),
        [head @ .., last] => format!("{}, and {}", head.join(", "), last),
    };

    format!(
        "{} It can recognize and categorize user queries into one of the following product types: {}.",
        ASSORTMENT_PREAMBLE, listed
    )
}

/// 按分类查询商品
pub struct AssortmentTool {
    catalog: Arc<dyn Catalog>,
    description: String,
}

impl AssortmentTool {
    pub fn new(catalog: Arc<dyn Catalog>, categories: &[ProductCategory]) -> Self {
        AssortmentTool {
            catalog,
            description: assortment_description(categories),
        }
    }
}

#[async_trait]
impl Tool for AssortmentTool {
    fn name(&self) -> &str {
        "get_assortment"
    }

    fn title(&self) -> &str {
        "Get assortment"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Option<Value> {
        Some(ASSORTMENT_SCHEMA.clone())
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let variant = args
            .get("variant")
            .and_then(|v| v.as_str())
            .context("缺少 variant 参数")?;

        let records = self.catalog.assortment(Some(variant)).await?;
        Ok(serde_json::to_string(&records)?)
    }
}

/// 查询门店列表
pub struct StoreTool {
    catalog: Arc<dyn Catalog>,
}

impl StoreTool {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        StoreTool { catalog }
    }
}

#[async_trait]
impl Tool for StoreTool {
    fn name(&self) -> &str {
        "get_stores"
    }

    fn title(&self) -> &str {
        "Get stores"
    }

    fn description(&self) -> &str {
        STORE_DESCRIPTION
    }

    async fn execute(&self, _args: Value) -> anyhow::Result<String> {
        let records = self.catalog.stores().await?;
        Ok(serde_json::to_string(&records)?)
    }
}
