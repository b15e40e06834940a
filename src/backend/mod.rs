//! 后端商品/门店查询接口

mod client;
mod error;
mod records;

pub use client::{BackendClient, Catalog};
pub use error::FetchError;
pub use records::{AssortmentRecord, StoreRecord};
