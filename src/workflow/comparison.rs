//! 類似数式検索
//!
//! 入力モード:
//! - `Existing`: キャッシュ済みの数式を1つ選ぶ
//! - `New`: 数式を直接入力する
//!
//! 検索結果は送信ごとに丸ごと置き換える（追記・マージはしない）。
//! 結果側には一致した数式しか含まれないため、検索元の数式も一緒に保持する。

use crate::error::{Action, FormulaManagerError, Result};
use crate::repository::FormulaRepository;
use formula_manager_common::{clean_latex, ComparisonResult, FormulaId, ValidationError};
use std::fmt;
use std::str::FromStr;

/// 入力タブ
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompareMode {
    #[default]
    Existing,
    New,
}

impl fmt::Display for CompareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareMode::Existing => write!(f, "existing"),
            CompareMode::New => write!(f, "new"),
        }
    }
}

impl FromStr for CompareMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "existing" | "e" => Ok(CompareMode::Existing),
            "new" | "n" => Ok(CompareMode::New),
            _ => Err(format!("Unknown mode: {}. Use existing or new", s)),
        }
    }
}

/// 画面の段階
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ComparisonPhase {
    #[default]
    Input,
    Submitted {
        source: String,
        results: Vec<ComparisonResult>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    generation: u64,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// 結果を表示した（件数）
    Applied(usize),
    Stale,
}

#[derive(Debug, Default)]
pub struct ComparisonWorkflow {
    mode: CompareMode,
    selected: Option<FormulaId>,
    new_latex: String,
    phase: ComparisonPhase,
    generation: u64,
    pending: bool,
}

impl ComparisonWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> CompareMode {
        self.mode
    }

    pub fn selected(&self) -> Option<FormulaId> {
        self.selected
    }

    pub fn new_latex(&self) -> &str {
        &self.new_latex
    }

    pub fn phase(&self) -> &ComparisonPhase {
        &self.phase
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// 表示中の結果（検索元, 結果）
    pub fn results(&self) -> Option<(&str, &[ComparisonResult])> {
        match &self.phase {
            ComparisonPhase::Submitted { source, results } => Some((source.as_str(), results.as_slice())),
            ComparisonPhase::Input => None,
        }
    }

    /// タブ切り替え。両方の下書き（選択・直接入力）を破棄する
    pub fn set_mode(&mut self, mode: CompareMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        self.clear_drafts();
    }

    pub fn select_formula(&mut self, id: FormulaId) {
        self.selected = Some(id);
    }

    pub fn set_new_latex(&mut self, value: &str) {
        self.new_latex = clean_latex(value);
    }

    /// 検索元を確定し、送信用チケットを返す
    pub fn begin_search(&mut self, repository: &FormulaRepository) -> Result<SearchTicket> {
        if self.pending {
            return Err(FormulaManagerError::Busy(Action::FindSimilar));
        }
        if matches!(self.phase, ComparisonPhase::Submitted { .. }) {
            return Err(FormulaManagerError::InvalidState(
                "results are shown; start a new search first".into(),
            ));
        }

        let source = match self.mode {
            CompareMode::Existing => self
                .selected
                .and_then(|id| repository.get(id))
                .map(|f| f.latex_formula.clone())
                .ok_or(ValidationError::NoSelection)?,
            CompareMode::New => {
                if self.new_latex.trim().is_empty() {
                    return Err(ValidationError::EmptyInput.into());
                }
                self.new_latex.clone()
            }
        };

        self.pending = true;
        Ok(SearchTicket {
            generation: self.generation,
            source,
        })
    }

    /// `find_similar` の結果を適用する。失敗時は入力段階のまま
    pub fn finish_search(
        &mut self,
        ticket: SearchTicket,
        outcome: Result<Vec<ComparisonResult>>,
    ) -> Result<SearchOutcome> {
        if ticket.generation != self.generation {
            tracing::warn!("stale similarity results discarded");
            return Ok(SearchOutcome::Stale);
        }
        self.pending = false;
        let results = outcome?;
        let count = results.len();
        self.generation += 1;
        self.phase = ComparisonPhase::Submitted {
            source: ticket.source,
            results,
        };
        Ok(SearchOutcome::Applied(count))
    }

    /// 「新しい検索」: 結果を消し、入力を初期状態に戻す
    pub fn new_search(&mut self) {
        self.mode = CompareMode::default();
        self.phase = ComparisonPhase::Input;
        self.clear_drafts();
    }

    fn clear_drafts(&mut self) {
        self.generation += 1;
        self.pending = false;
        self.selected = None;
        self.new_latex.clear();
    }
}
