use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::config::BackendConfig;

use super::error::FetchError;
use super::records::{AssortmentRecord, Rows, StoreRecord};

/// 商品目录能力，工具只依赖这个接口
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn assortment(&self, pathname: Option<&str>) -> Result<Vec<AssortmentRecord>, FetchError>;

    async fn stores(&self) -> Result<Vec<StoreRecord>, FetchError>;
}

/// 后端 HTTP 客户端
#[derive(Debug, Clone)]
pub struct BackendClient {
    config: Arc<BackendConfig>,
}

impl BackendClient {
    pub fn new(config: Arc<BackendConfig>) -> Self {
        BackendClient { config }
    }

    /// GET /assortment，带 pathname 时按分类过滤并限制条数
    pub async fn fetch_assortment(
        &self,
        pathname: Option<&str>,
    ) -> Result<Vec<AssortmentRecord>, FetchError> {
        let query = match pathname {
            Some(pathname) => vec![
                ("filter", format!("pathname~{}", pathname)),
                ("limit", self.config.assortment_limit.to_string()),
            ],
            None => Vec::new(),
        };

        self.get_rows("assortment", &query).await
    }

    /// GET /store
    pub async fn fetch_stores(&self) -> Result<Vec<StoreRecord>, FetchError> {
        self.get_rows("store", &[]).await
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }

    async fn get_rows<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, FetchError> {
        let url = self.endpoint(path);

        // 每次调用独立的 client，返回时连同连接一起释放
        let client = Client::new();
        let mut request = client
            .get(&url)
            .basic_auth(&self.config.username, Some(&self.config.password));
        if !query.is_empty() {
            request = request.query(query);
        }

        tracing::debug!(%url, ?query, "请求后端");

        let response = request.send().await.map_err(FetchError::Transport)?;
        let status = response.status();

        if !status.is_success() {
            tracing::warn!(%url, %status, "后端返回错误");
            return Err(FetchError::Status { status, url });
        }

        let text = response.text().await.map_err(FetchError::Transport)?;
        let body: Rows<T> =
            serde_json::from_str(&text).map_err(|e| FetchError::Decode(e.to_string()))?;

        tracing::debug!(%url, rows = body.rows.len(), "后端返回");
        Ok(body.rows)
    }
}

#[async_trait]
impl Catalog for BackendClient {
    async fn assortment(&self, pathname: Option<&str>) -> Result<Vec<AssortmentRecord>, FetchError> {
        self.fetch_assortment(pathname).await
    }

    async fn stores(&self) -> Result<Vec<StoreRecord>, FetchError> {
        self.fetch_stores().await
    }
}
