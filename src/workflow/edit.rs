//! 一覧画面のインライン編集
//!
//! 状態: `Idle` → `Editing(id)` → (キャンセル/保存成功) → `Idle`
//!
//! 編集セッションは常に最大1つ。別の数式の編集を始めると、
//! 前の下書きは保存せずに破棄される。
//! 下書きを変えると世代が進み、それ以前に送った保存の結果は適用しない。

use crate::error::Result;
use formula_manager_common::{clean_latex, Formula, FormulaFields, FormulaId, ValidationError};

/// 編集中の下書き
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    pub target_id: FormulaId,
    pub draft: FormulaFields,
}

/// 送信中の保存リクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTicket {
    generation: u64,
    pub target_id: FormulaId,
    pub fields: FormulaFields,
}

/// 保存完了の適用結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// セッションを閉じた。呼び出し側で一覧を再読み込みする
    Saved(FormulaId),
    /// 送信後にセッションが変わっていたので結果を捨てた
    Stale,
}

#[derive(Debug, Default)]
pub struct EditLifecycle {
    session: Option<EditSession>,
    generation: u64,
}

impl EditLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_editing_target(&self, id: FormulaId) -> bool {
        self.session.as_ref().is_some_and(|s| s.target_id == id)
    }

    /// 編集を開始する。既存のセッションは置き換えられ、破棄した下書きを返す
    pub fn begin_edit(&mut self, formula: &Formula) -> Option<EditSession> {
        self.generation += 1;
        let discarded = self.session.replace(EditSession {
            target_id: formula.id,
            draft: FormulaFields::from_formula(formula),
        });
        if let Some(prev) = &discarded {
            tracing::debug!(previous = %prev.target_id, next = %formula.id, "unsaved draft discarded");
        }
        discarded
    }

    /// 編集を取り消す（通信なし）
    pub fn cancel_edit(&mut self) -> Option<EditSession> {
        self.generation += 1;
        self.session.take()
    }

    /// 入力ウィジェットからの数式を反映する（整形あり）
    pub fn set_latex(&mut self, value: &str) -> bool {
        self.with_draft(|d| d.latex = clean_latex(value))
    }

    pub fn set_legend(&mut self, value: &str) -> bool {
        self.with_draft(|d| d.legend = value.to_string())
    }

    pub fn set_description(&mut self, value: &str) -> bool {
        self.with_draft(|d| d.description = value.to_string())
    }

    fn with_draft(&mut self, f: impl FnOnce(&mut FormulaFields)) -> bool {
        match self.session.as_mut() {
            Some(session) => {
                f(&mut session.draft);
                self.generation += 1;
                true
            }
            None => false,
        }
    }

    /// 保存前の検証。成功したら送信用チケットを返す（状態は変えない）
    pub fn begin_save(&self) -> Result<SaveTicket> {
        let session = self
            .session
            .as_ref()
            .ok_or(ValidationError::NoActiveEdit)?;
        session.draft.validate()?;
        Ok(SaveTicket {
            generation: self.generation,
            target_id: session.target_id,
            fields: session.draft.clone(),
        })
    }

    /// `update` の結果を適用する
    ///
    /// 失敗時は `Editing` のまま下書きを保持し、エラーを返す。
    pub fn finish_save(&mut self, ticket: SaveTicket, outcome: Result<()>) -> Result<SaveOutcome> {
        if ticket.generation != self.generation {
            tracing::warn!(id = %ticket.target_id, "stale save response ignored");
            return Ok(SaveOutcome::Stale);
        }
        match outcome {
            Ok(()) => {
                self.generation += 1;
                self.session = None;
                Ok(SaveOutcome::Saved(ticket.target_id))
            }
            Err(err) => Err(err),
        }
    }

    /// 削除された数式を編集中なら閉じる
    pub fn forget(&mut self, id: FormulaId) -> Option<EditSession> {
        if self.is_editing_target(id) {
            return self.cancel_edit();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Action, FormulaManagerError};

    fn formula(id: i64, latex: &str, legend: &str, description: &str) -> Formula {
        Formula {
            id: FormulaId(id),
            latex_formula: latex.into(),
            legend: Some(legend.into()),
            description: Some(description.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_begin_edit_seeds_draft() {
        let mut edit = EditLifecycle::new();
        assert!(edit.begin_edit(&formula(5, "E=mc^2", "Mass-energy", "...")).is_none());

        let session = edit.session().unwrap();
        assert_eq!(session.target_id, FormulaId(5));
        assert_eq!(session.draft.latex, "E=mc^2");
        assert_eq!(session.draft.legend, "Mass-energy");
    }

    #[test]
    fn test_begin_edit_replaces_previous_session() {
        let mut edit = EditLifecycle::new();
        edit.begin_edit(&formula(1, "a", "A", "first"));
        edit.set_legend("changed");

        let discarded = edit.begin_edit(&formula(2, "b", "B", "second")).unwrap();
        assert_eq!(discarded.target_id, FormulaId(1));
        assert_eq!(discarded.draft.legend, "changed");
        assert_eq!(edit.session().unwrap().target_id, FormulaId(2));
        assert_eq!(edit.session().unwrap().draft.legend, "B");
    }

    #[test]
    fn test_cancel_edit() {
        let mut edit = EditLifecycle::new();
        edit.begin_edit(&formula(5, "E=mc^2", "Mass-energy", "..."));
        assert!(edit.cancel_edit().is_some());
        assert!(edit.session().is_none());
        assert!(edit.cancel_edit().is_none());
    }

    #[test]
    fn test_set_latex_cleans_input() {
        let mut edit = EditLifecycle::new();
        assert!(!edit.set_latex("x"));
        edit.begin_edit(&formula(1, "a", "A", "d"));
        assert!(edit.set_latex(r"\text{a}^2"));
        assert_eq!(edit.session().unwrap().draft.latex, "a^2");
    }

    #[test]
    fn test_begin_save_validation() {
        let mut edit = EditLifecycle::new();
        assert!(matches!(
            edit.begin_save(),
            Err(FormulaManagerError::Validation(ValidationError::NoActiveEdit))
        ));

        edit.begin_edit(&formula(1, "a", "A", "d"));
        edit.set_description("   ");
        assert!(matches!(
            edit.begin_save(),
            Err(FormulaManagerError::Validation(ValidationError::BlankFields))
        ));
        assert!(edit.is_editing());
    }

    #[test]
    fn test_finish_save_success_closes_session() {
        let mut edit = EditLifecycle::new();
        edit.begin_edit(&formula(1, "a", "A", "d"));
        let ticket = edit.begin_save().unwrap();
        assert_eq!(edit.finish_save(ticket, Ok(())).unwrap(), SaveOutcome::Saved(FormulaId(1)));
        assert!(!edit.is_editing());
    }

    #[test]
    fn test_finish_save_failure_keeps_draft() {
        let mut edit = EditLifecycle::new();
        edit.begin_edit(&formula(1, "a", "A", "d"));
        edit.set_legend("new legend");
        let ticket = edit.begin_save().unwrap();
        let err = edit
            .finish_save(ticket, Err(FormulaManagerError::request(Action::SaveFormula, "HTTP 500")))
            .unwrap_err();
        assert_eq!(err.to_string(), "error saving formula: HTTP 500");
        assert_eq!(edit.session().unwrap().draft.legend, "new legend");
    }

    #[test]
    fn test_stale_save_is_ignored() {
        let mut edit = EditLifecycle::new();
        edit.begin_edit(&formula(1, "a", "A", "d"));
        let ticket = edit.begin_save().unwrap();
        edit.begin_edit(&formula(2, "b", "B", "e"));

        assert_eq!(edit.finish_save(ticket, Ok(())).unwrap(), SaveOutcome::Stale);
        assert_eq!(edit.session().unwrap().target_id, FormulaId(2));
    }

    #[test]
    fn test_forget_only_matching_target() {
        let mut edit = EditLifecycle::new();
        edit.begin_edit(&formula(1, "a", "A", "d"));
        assert!(edit.forget(FormulaId(2)).is_none());
        assert!(edit.forget(FormulaId(1)).is_some());
        assert!(!edit.is_editing());
    }

    /// 保存送信後の入力は保存成功で消えない
    #[test]
    fn test_edit_after_begin_save_keeps_session() {
        let mut edit = EditLifecycle::new();
        edit.begin_edit(&formula(1, "a", "A", "d"));
        let ticket = edit.begin_save().unwrap();
        edit.set_legend("typed while saving");

        assert_eq!(edit.finish_save(ticket, Ok(())).unwrap(), SaveOutcome::Stale);
        let session = edit.session().unwrap();
        assert_eq!(session.target_id, FormulaId(1));
        assert_eq!(session.draft.legend, "typed while saving");

        let ticket = edit.begin_save().unwrap();
        assert_eq!(ticket.fields.legend, "typed while saving");
        assert_eq!(edit.finish_save(ticket, Ok(())).unwrap(), SaveOutcome::Saved(FormulaId(1)));
    }
}
