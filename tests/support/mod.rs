//! 統合テスト用の記録付きモックTransport
//!
//! 呼び出しを順に記録し、操作ごとに失敗させられる。
//! create/update/delete は保持している一覧にも反映する。

#![allow(dead_code)]

use formula_manager::error::{Action, FormulaManagerError, Result};
use formula_manager::transport::FormulaTransport;
use formula_manager::workspace::{Workspace, WorkspaceSettings};
use formula_manager_common::{
    ComparisonResult, ExportResponse, Formula, FormulaFields, FormulaId, ManageResponse,
};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListAll,
    Create(FormulaFields),
    Update(FormulaId, FormulaFields),
    Delete(FormulaId),
    FindSimilar(String),
    ConvertAst(usize),
    Export(Vec<FormulaId>),
    FetchFile(String),
}

pub struct MockTransport {
    calls: Mutex<Vec<Call>>,
    formulas: Mutex<Vec<Value>>,
    /// 設定されていれば `list_all` はこれをそのまま返す
    raw_list: Mutex<Option<Value>>,
    failing: Mutex<HashSet<Action>>,
    similar: Mutex<Vec<ComparisonResult>>,
    export_response: Mutex<ExportResponse>,
    file_bytes: Vec<u8>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            formulas: Mutex::new(Vec::new()),
            raw_list: Mutex::new(None),
            failing: Mutex::new(HashSet::new()),
            similar: Mutex::new(Vec::new()),
            export_response: Mutex::new(ExportResponse {
                status: "success".into(),
                file_url: Some("/files/formulas.docx".into()),
            }),
            file_bytes: b"PK\x03\x04docx".to_vec(),
        }
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_formulas(formulas: Value) -> Self {
        let mock = Self::new();
        if let Value::Array(items) = formulas {
            *mock.formulas.lock().unwrap() = items;
        }
        mock
    }

    pub fn set_raw_list(&self, payload: Value) {
        *self.raw_list.lock().unwrap() = Some(payload);
    }

    pub fn fail(&self, action: Action) {
        self.failing.lock().unwrap().insert(action);
    }

    pub fn recover(&self, action: Action) {
        self.failing.lock().unwrap().remove(&action);
    }

    pub fn set_similar(&self, results: Vec<ComparisonResult>) {
        *self.similar.lock().unwrap() = results;
    }

    pub fn set_export_response(&self, response: ExportResponse) {
        *self.export_response.lock().unwrap() = response;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// 一覧取得以外の呼び出し
    pub fn mutating_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(|c| *c != Call::ListAll).collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call, action: Action) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.lock().unwrap().contains(&action) {
            return Err(FormulaManagerError::request(action, "HTTP 500 Internal Server Error"));
        }
        Ok(())
    }

    fn ok(id: Option<FormulaId>) -> ManageResponse {
        ManageResponse {
            status: "success".into(),
            message: String::new(),
            formula_id: id,
        }
    }
}

impl FormulaTransport for MockTransport {
    async fn list_all(&self) -> Result<Value> {
        self.record(Call::ListAll, Action::LoadFormulas)?;
        if let Some(raw) = self.raw_list.lock().unwrap().clone() {
            return Ok(raw);
        }
        Ok(Value::Array(self.formulas.lock().unwrap().clone()))
    }

    async fn create(&self, fields: &FormulaFields, user_id: i64) -> Result<ManageResponse> {
        self.record(Call::Create(fields.clone()), Action::AddFormula)?;
        let mut formulas = self.formulas.lock().unwrap();
        let next = formulas
            .iter()
            .filter_map(|f| f["id"].as_i64())
            .max()
            .unwrap_or(0)
            + 1;
        formulas.push(json!({
            "id": next,
            "latex_formula": fields.latex,
            "legend": fields.legend,
            "description": fields.description,
            "author_id": user_id,
        }));
        Ok(Self::ok(Some(FormulaId(next))))
    }

    async fn update(&self, id: FormulaId, fields: &FormulaFields, _user_id: i64) -> Result<ManageResponse> {
        self.record(Call::Update(id, fields.clone()), Action::SaveFormula)?;
        let mut formulas = self.formulas.lock().unwrap();
        if let Some(f) = formulas.iter_mut().find(|f| f["id"].as_i64() == Some(id.0)) {
            f["latex_formula"] = json!(fields.latex);
            f["legend"] = json!(fields.legend);
            f["description"] = json!(fields.description);
        }
        Ok(Self::ok(Some(id)))
    }

    async fn delete(&self, id: FormulaId, _user_id: i64) -> Result<ManageResponse> {
        self.record(Call::Delete(id), Action::DeleteFormula)?;
        self.formulas
            .lock()
            .unwrap()
            .retain(|f| f["id"].as_i64() != Some(id.0));
        Ok(Self::ok(None))
    }

    async fn find_similar(&self, latex: &str) -> Result<Vec<ComparisonResult>> {
        self.record(Call::FindSimilar(latex.to_string()), Action::FindSimilar)?;
        Ok(self.similar.lock().unwrap().clone())
    }

    async fn convert_ast_to_latex(&self, ast: &[Value]) -> Result<String> {
        self.record(Call::ConvertAst(ast.len()), Action::ConvertAst)?;
        Ok(r"\frac{a}{b}".to_string())
    }

    async fn convert_to_export_format(&self, formulas: &[Formula]) -> Result<ExportResponse> {
        let ids = formulas.iter().map(|f| f.id).collect();
        self.record(Call::Export(ids), Action::ExportFormulas)?;
        Ok(self.export_response.lock().unwrap().clone())
    }

    async fn fetch_file(&self, file_url: &str) -> Result<Vec<u8>> {
        self.record(Call::FetchFile(file_url.to_string()), Action::DownloadFile)?;
        Ok(self.file_bytes.clone())
    }
}

/// よく使う3件の数式
pub fn sample_formulas() -> Value {
    json!([
        {"id": 1, "latex_formula": "a^2+b^2=c^2", "legend": "Pythagoras", "description": "right triangle", "author_id": 1},
        {"id": 2, "latex_formula": "E=mc^2", "legend": "Mass-energy", "description": "Einstein"},
        {"id": 5, "latex_formula": "F=ma", "legend": "Newton", "description": "second law"}
    ])
}

pub fn workspace(mock: MockTransport, download_dir: &Path) -> Workspace<MockTransport> {
    Workspace::new(
        mock,
        WorkspaceSettings {
            user_id: 1,
            download_dir: download_dir.to_path_buf(),
        },
    )
}
