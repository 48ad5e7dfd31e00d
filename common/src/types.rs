//! 数式ストアとやり取りする型定義
//!
//! CLIとワークスペース制御で共有される型:
//! - Formula: サーバが所有する数式レコード
//! - ComparisonResult: 類似検索の結果1件
//! - FormulaFields: 編集・追加時の入力値（下書き）
//! - ManageRequest / ManageResponse / ExportResponse: ワイヤ形式

use crate::error::{Error, Result, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 数式ID（サーバが採番、不変）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormulaId(pub i64);

impl fmt::Display for FormulaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FormulaId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(FormulaId)
            .map_err(|_| format!("Invalid formula id: {}", s))
    }
}

/// 数式レコード
///
/// `author_id` と日時はエクスポート時にそのままサーバへ返すため保持する。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    pub id: FormulaId,

    pub latex_formula: String,

    #[serde(default)]
    pub author_id: Option<i64>,

    #[serde(default)]
    pub legend: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub creation_date: Option<String>,

    #[serde(default)]
    pub update_date: Option<String>,
}

impl Formula {
    /// 凡例（未設定なら空文字）
    pub fn legend(&self) -> &str {
        self.legend.as_deref().unwrap_or("")
    }

    /// 説明（未設定なら空文字）
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

/// 共通部分式の情報
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommonSubexpression {
    pub subexpression: String,
    pub indices_in_expr2: Vec<usize>,
    pub occurrences_in_simplified2: Vec<(usize, usize)>,
}

/// 類似検索の結果
///
/// `simplified1` は検索元、`simplified2` は一致した数式の簡約形。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub formula: Formula,

    #[serde(default)]
    pub equivalent: bool,

    /// 類似度（0〜100）
    #[serde(default)]
    pub similarity: f64,

    #[serde(default)]
    pub simplified1: String,

    #[serde(default)]
    pub simplified2: String,

    #[serde(default)]
    pub common_subexpressions: Vec<CommonSubexpression>,
}

/// 編集・追加フォームの入力値
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormulaFields {
    pub latex: String,
    pub legend: String,
    pub description: String,
}

impl FormulaFields {
    /// 既存レコードから下書きを作る
    pub fn from_formula(formula: &Formula) -> Self {
        Self {
            latex: formula.latex_formula.clone(),
            legend: formula.legend().to_string(),
            description: formula.description().to_string(),
        }
    }

    /// 3項目すべてが空白以外であること
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.latex.trim().is_empty()
            || self.legend.trim().is_empty()
            || self.description.trim().is_empty()
        {
            return Err(ValidationError::BlankFields);
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.latex.is_empty() && self.legend.is_empty() && self.description.is_empty()
    }
}

/// `/manage_formula` のアクション
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManageAction {
    Create,
    Update,
    Delete,
}

/// `/manage_formula` のリクエストボディ
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManageRequest {
    pub formula: String,
    pub userid: i64,
    pub action: ManageAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula_id: Option<FormulaId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ManageRequest {
    pub fn create(fields: &FormulaFields, user_id: i64) -> Self {
        Self {
            formula: fields.latex.clone(),
            userid: user_id,
            action: ManageAction::Create,
            formula_id: None,
            legend: Some(fields.legend.clone()),
            description: Some(fields.description.clone()),
        }
    }

    pub fn update(id: FormulaId, fields: &FormulaFields, user_id: i64) -> Self {
        Self {
            formula: fields.latex.clone(),
            userid: user_id,
            action: ManageAction::Update,
            formula_id: Some(id),
            legend: Some(fields.legend.clone()),
            description: Some(fields.description.clone()),
        }
    }

    pub fn delete(id: FormulaId, user_id: i64) -> Self {
        Self {
            formula: String::new(),
            userid: user_id,
            action: ManageAction::Delete,
            formula_id: Some(id),
            legend: None,
            description: None,
        }
    }
}

/// `/manage_formula` のレスポンス
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManageResponse {
    pub status: String,
    pub message: String,
    pub formula_id: Option<FormulaId>,
}

/// `/convert_to_docx` のレスポンス
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportResponse {
    pub status: String,
    pub file_url: Option<String>,
}

impl ExportResponse {
    /// `status == "success"` かつ `file_url` がある場合のみファイル参照を返す
    pub fn file_url_on_success(&self) -> Option<&str> {
        if self.status != "success" {
            return None;
        }
        self.file_url.as_deref().filter(|url| !url.trim().is_empty())
    }
}

/// `/convert_ast_to_latex` のレスポンス
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatexResponse {
    pub latex: String,
}

/// AST（ノード配列）のJSONを読み込む
pub fn parse_ast_nodes(json: &str) -> Result<Vec<serde_json::Value>> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let serde_json::Value::Array(nodes) = value else {
        return Err(Error::InvalidAst("expected an array of nodes".into()));
    };
    if let Some(pos) = nodes.iter().position(|n| !n.is_object()) {
        return Err(Error::InvalidAst(format!("node {} is not an object", pos)));
    }
    Ok(nodes)
}
