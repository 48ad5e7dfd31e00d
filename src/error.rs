use formula_manager_common::{FormulaId, ValidationError};
use std::fmt;
use thiserror::Error;

/// 利用者に通知する操作名（失敗時のメッセージに使う）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    LoadFormulas,
    AddFormula,
    SaveFormula,
    DeleteFormula,
    FindSimilar,
    ConvertAst,
    ExportFormulas,
    DownloadFile,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::LoadFormulas => "loading formulas",
            Action::AddFormula => "adding formula",
            Action::SaveFormula => "saving formula",
            Action::DeleteFormula => "deleting formula",
            Action::FindSimilar => "searching for similar formulas",
            Action::ConvertAst => "converting AST to LaTeX",
            Action::ExportFormulas => "exporting formulas",
            Action::DownloadFile => "downloading file",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum FormulaManagerError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// 通信失敗（HTTPエラー・非成功ステータス・レスポンス不正を区別しない）
    #[error("error {action}: {message}")]
    Request { action: Action, message: String },

    #[error("error {action}: unexpected response ({message})")]
    UnexpectedResponse { action: Action, message: String },

    #[error("{0} is already in progress")]
    Busy(Action),

    #[error("formula {0} not found")]
    NotFound(FormulaId),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("設定エラー: {0}")]
    Config(String),

    #[error("入力エラー: {0}")]
    Prompt(String),

    #[error(transparent)]
    Common(#[from] formula_manager_common::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),
}

impl FormulaManagerError {
    pub fn request(action: Action, message: impl ToString) -> Self {
        FormulaManagerError::Request {
            action,
            message: message.to_string(),
        }
    }

    /// ネットワーク呼び出し前に弾かれたエラーか
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            FormulaManagerError::Validation(_)
                | FormulaManagerError::Busy(_)
                | FormulaManagerError::NotFound(_)
                | FormulaManagerError::InvalidState(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FormulaManagerError>;
