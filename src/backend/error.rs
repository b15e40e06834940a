use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("后端返回错误状态 {status}：{url}")]
    Status { status: StatusCode, url: String },

    #[error("请求后端失败：{0}")]
    Transport(#[source] reqwest::Error),

    #[error("解析后端响应失败：{0}")]
    Decode(String),
}

impl FetchError {
    /// 非 2xx 时的状态码
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
