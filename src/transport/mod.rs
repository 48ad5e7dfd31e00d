//! 数式ストアとの通信層
//!
//! 1つの意図につきリクエストを1回だけ送る（自動リトライなし）。
//! 空の一覧は成功であり、失敗とは区別される。

mod http;

pub use http::HttpTransport;

use crate::error::Result;
use formula_manager_common::{
    ComparisonResult, ExportResponse, Formula, FormulaFields, FormulaId, ManageResponse,
};
use serde_json::Value;

#[allow(async_fn_in_trait)]
pub trait FormulaTransport {
    /// `GET /formulas`（検証前の生ペイロード）
    async fn list_all(&self) -> Result<Value>;

    async fn create(&self, fields: &FormulaFields, user_id: i64) -> Result<ManageResponse>;

    async fn update(&self, id: FormulaId, fields: &FormulaFields, user_id: i64) -> Result<ManageResponse>;

    async fn delete(&self, id: FormulaId, user_id: i64) -> Result<ManageResponse>;

    async fn find_similar(&self, latex: &str) -> Result<Vec<ComparisonResult>>;

    async fn convert_ast_to_latex(&self, ast: &[Value]) -> Result<String>;

    async fn convert_to_export_format(&self, formulas: &[Formula]) -> Result<ExportResponse>;

    /// エクスポート結果のファイル参照を取得する
    async fn fetch_file(&self, file_url: &str) -> Result<Vec<u8>>;
}
