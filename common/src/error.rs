//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid AST: {0}")]
    InvalidAst(String),
}

/// ローカル検証エラー（ネットワーク呼び出し前に判定）
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("fill in all fields: formula, legend and description are required")]
    BlankFields,

    #[error("select a formula first")]
    NoSelection,

    #[error("enter a formula first")]
    EmptyInput,

    #[error("no formulas selected")]
    NothingSelected,

    #[error("no formula is being edited")]
    NoActiveEdit,
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
