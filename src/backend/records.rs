use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 商品记录，只保留名称
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssortmentRecord {
    pub name: String,
}

/// 门店记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRecord {
    /// 原样保留后端的 id（数字或字符串）
    pub id: Value,
    pub name: String,
    pub address: String,
}

/// 列表接口的外层结构，多余字段直接忽略
#[derive(Debug, Deserialize)]
pub(crate) struct Rows<T> {
    pub rows: Vec<T>,
}
