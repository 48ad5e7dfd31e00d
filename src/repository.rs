//! 数式一覧のローカルキャッシュ
//!
//! `reload` のたびに全件を丸ごと差し替える（部分更新はしない）。
//! 通信失敗時は空にしてエラー状態を記録し、古い一覧には戻さない。

use crate::error::Result;
use crate::transport::FormulaTransport;
use formula_manager_common::{filter_formulas, sanitize_records, Formula, FormulaId};
use serde_json::Value;

/// 読み込み状態
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Idle,
    Loaded,
    Failed(String),
}

/// 実行中の再読み込みを識別するチケット
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadTicket {
    generation: u64,
}

#[derive(Debug, Default)]
pub struct FormulaRepository {
    formulas: Vec<Formula>,
    state: LoadState,
    generation: u64,
}

impl FormulaRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn formulas(&self) -> &[Formula] {
        &self.formulas
    }

    pub fn get(&self, id: FormulaId) -> Option<&Formula> {
        self.formulas.iter().find(|f| f.id == id)
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }

    /// 凡例・説明で絞り込む（キャッシュは変更しない）
    pub fn filter(&self, query: &str) -> Vec<&Formula> {
        filter_formulas(&self.formulas, query)
    }

    pub fn begin_reload(&mut self) -> ReloadTicket {
        self.generation += 1;
        ReloadTicket {
            generation: self.generation,
        }
    }

    /// 取得結果を公開する
    ///
    /// 後発の再読み込みが始まっていれば結果を捨てて `Ok(None)` を返す。
    pub fn finish_reload(&mut self, ticket: ReloadTicket, outcome: Result<Value>) -> Result<Option<usize>> {
        if ticket.generation != self.generation {
            tracing::warn!("stale formula list discarded");
            return Ok(None);
        }

        match outcome {
            Ok(payload) => {
                let batch = sanitize_records(&payload);
                if batch.not_an_array {
                    tracing::warn!("formula list is not an array; showing an empty list");
                } else if batch.dropped > 0 {
                    tracing::debug!(dropped = batch.dropped, "malformed formula records skipped");
                }
                self.formulas = batch.formulas;
                self.state = LoadState::Loaded;
                tracing::info!(count = self.formulas.len(), "formulas loaded");
                Ok(Some(self.formulas.len()))
            }
            Err(err) => {
                tracing::warn!(error = %err, "formula list reload failed");
                self.formulas = Vec::new();
                self.state = LoadState::Failed(err.to_string());
                Err(err)
            }
        }
    }

    /// `list_all` を1回呼んでキャッシュを差し替える
    pub async fn reload<T: FormulaTransport>(&mut self, transport: &T) -> Result<usize> {
        let ticket = self.begin_reload();
        let outcome = transport.list_all().await;
        Ok(self.finish_reload(ticket, outcome)?.unwrap_or(self.formulas.len()))
    }
}
