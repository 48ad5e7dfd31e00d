//! DOCXエクスポート
//!
//! 選択集合は絞り込みとは独立している。絞り込みで見えなくなった数式も選択されたまま残る。
//! 同時に実行できるエクスポートは1つだけ。
//! 選択を変えると世代が進み、送信中のエクスポート結果は捨てられる。

use crate::error::{Action, FormulaManagerError, Result};
use crate::repository::FormulaRepository;
use formula_manager_common::{ExportResponse, Formula, FormulaId, ValidationError};

/// ダウンロード時の既定ファイル名
pub const EXPORT_FILE_NAME: &str = "formulas.docx";

/// エクスポート成功時に実行するダウンロード
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub file_url: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportTicket {
    generation: u64,
    request: u64,
    pub formulas: Vec<Formula>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Download(DownloadRequest),
    Stale,
}

#[derive(Debug, Default)]
pub struct ExportWorkflow {
    query: String,
    /// 選択順を保持する
    selection: Vec<FormulaId>,
    /// 送信中リクエストの通し番号
    pending: Option<u64>,
    requests: u64,
    generation: u64,
}

impl ExportWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
    }

    pub fn visible<'a>(&self, repository: &'a FormulaRepository) -> Vec<&'a Formula> {
        repository.filter(&self.query)
    }

    pub fn selection(&self) -> &[FormulaId] {
        &self.selection
    }

    pub fn is_selected(&self, id: FormulaId) -> bool {
        self.selection.contains(&id)
    }

    pub fn is_in_flight(&self) -> bool {
        self.pending.is_some()
    }

    /// 生成ボタンが押せるか
    pub fn can_export(&self) -> bool {
        !self.selection.is_empty() && self.pending.is_none()
    }

    /// 選択を反転する。選択後の状態を返す
    pub fn toggle(&mut self, id: FormulaId) -> bool {
        self.generation += 1;
        if let Some(pos) = self.selection.iter().position(|s| *s == id) {
            self.selection.remove(pos);
            false
        } else {
            self.selection.push(id);
            true
        }
    }

    /// 選択中の数式を選択順に集め、送信用チケットを返す
    ///
    /// キャッシュから消えた数式は送らない。
    pub fn begin_export(&mut self, repository: &FormulaRepository) -> Result<ExportTicket> {
        if self.pending.is_some() {
            return Err(FormulaManagerError::Busy(Action::ExportFormulas));
        }
        let formulas: Vec<Formula> = self
            .selection
            .iter()
            .filter_map(|id| repository.get(*id).cloned())
            .collect();
        if formulas.is_empty() {
            return Err(ValidationError::NothingSelected.into());
        }
        if formulas.len() < self.selection.len() {
            tracing::warn!(
                missing = self.selection.len() - formulas.len(),
                "selected formulas no longer in the list were skipped"
            );
        }

        self.requests += 1;
        self.pending = Some(self.requests);
        Ok(ExportTicket {
            generation: self.generation,
            request: self.requests,
            formulas,
        })
    }

    /// `convert_to_docx` の結果を適用する
    ///
    /// 失敗しても選択はそのまま残るので再実行できる。
    /// 送信後に選択が変わっていれば結果を捨てる。
    pub fn finish_export(
        &mut self,
        ticket: ExportTicket,
        outcome: Result<ExportResponse>,
    ) -> Result<ExportOutcome> {
        if self.pending == Some(ticket.request) {
            self.pending = None;
        }
        if ticket.generation != self.generation {
            tracing::warn!("stale export response discarded");
            return Ok(ExportOutcome::Stale);
        }

        let response = outcome?;
        let file_url = response.file_url_on_success().ok_or_else(|| {
            FormulaManagerError::UnexpectedResponse {
                action: Action::ExportFormulas,
                message: format!("status {:?} without a file", response.status),
            }
        })?;
        Ok(ExportOutcome::Download(DownloadRequest {
            file_url: file_url.to_string(),
            file_name: EXPORT_FILE_NAME.to_string(),
        }))
    }

    /// 明示的なリセット（選択・検索語を消す）
    pub fn reset(&mut self) {
        self.generation += 1;
        self.pending = None;
        self.selection.clear();
        self.query.clear();
    }
}
