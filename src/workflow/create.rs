//! 追加画面
//!
//! 編集と同じ整形・必須チェックを行い、成功したら下書きを空にする。

use crate::error::{Action, FormulaManagerError, Result};
use formula_manager_common::{clean_latex, FormulaFields};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTicket {
    generation: u64,
    pub fields: FormulaFields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    Stale,
}

#[derive(Debug, Default)]
pub struct CreateWorkflow {
    draft: FormulaFields,
    generation: u64,
    submitting: bool,
}

impl CreateWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &FormulaFields {
        &self.draft
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn set_latex(&mut self, value: &str) {
        self.draft.latex = clean_latex(value);
    }

    pub fn set_legend(&mut self, value: &str) {
        self.draft.legend = value.to_string();
    }

    pub fn set_description(&mut self, value: &str) {
        self.draft.description = value.to_string();
    }

    /// プレビューを出すか（いずれかの項目に入力がある）
    pub fn has_preview(&self) -> bool {
        !self.draft.is_empty()
    }

    pub fn begin_submit(&mut self) -> Result<CreateTicket> {
        if self.submitting {
            return Err(FormulaManagerError::Busy(Action::AddFormula));
        }
        self.draft.validate()?;
        self.submitting = true;
        Ok(CreateTicket {
            generation: self.generation,
            fields: self.draft.clone(),
        })
    }

    /// `create` の結果を適用する。失敗時は下書きを残す
    pub fn finish_submit(&mut self, ticket: CreateTicket, outcome: Result<()>) -> Result<CreateOutcome> {
        if ticket.generation != self.generation {
            tracing::warn!("stale create response ignored");
            return Ok(CreateOutcome::Stale);
        }
        self.submitting = false;
        outcome?;
        self.generation += 1;
        self.draft = FormulaFields::default();
        Ok(CreateOutcome::Created)
    }

    /// 下書きを破棄する
    pub fn reset(&mut self) {
        self.generation += 1;
        self.submitting = false;
        self.draft = FormulaFields::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formula_manager_common::ValidationError;

    fn filled() -> CreateWorkflow {
        let mut create = CreateWorkflow::new();
        create.set_legend("Einstein");
        create.set_latex(r"\text{E}=mc^2");
        create.set_description("mass-energy equivalence");
        create
    }

    #[test]
    fn test_latex_is_cleaned() {
        assert_eq!(filled().draft().latex, "E=mc^2");
    }

    #[test]
    fn test_blank_field_rejected() {
        let mut create = filled();
        create.set_description(" ");
        let err = create.begin_submit().unwrap_err();
        assert!(matches!(err, FormulaManagerError::Validation(ValidationError::BlankFields)));
        assert!(!create.is_submitting());
    }

    #[test]
    fn test_success_clears_draft() {
        let mut create = filled();
        let ticket = create.begin_submit().unwrap();
        assert!(create.is_submitting());
        assert!(matches!(create.begin_submit(), Err(FormulaManagerError::Busy(Action::AddFormula))));
        assert_eq!(create.finish_submit(ticket, Ok(())).unwrap(), CreateOutcome::Created);
        assert!(!create.has_preview());
        assert!(!create.is_submitting());
    }

    #[test]
    fn test_failure_keeps_draft() {
        let mut create = filled();
        let ticket = create.begin_submit().unwrap();
        let err = create
            .finish_submit(ticket, Err(FormulaManagerError::request(Action::AddFormula, "HTTP 400")))
            .unwrap_err();
        assert_eq!(err.to_string(), "error adding formula: HTTP 400");
        assert_eq!(create.draft().legend, "Einstein");
    }

    #[test]
    fn test_reset_makes_pending_submit_stale() {
        let mut create = filled();
        let ticket = create.begin_submit().unwrap();
        create.reset();
        create.set_legend("next");
        assert_eq!(create.finish_submit(ticket, Ok(())).unwrap(), CreateOutcome::Stale);
        assert_eq!(create.draft().legend, "next");
    }
}
