//! 一覧画面（検索 + インライン編集）

use super::edit::EditLifecycle;
use crate::repository::FormulaRepository;
use formula_manager_common::Formula;

#[derive(Debug, Default)]
pub struct ListWorkflow {
    query: String,
    pub edit: EditLifecycle,
}

impl ListWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// キー入力ごとに呼ばれる。編集セッションには影響しない
    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
    }

    pub fn visible<'a>(&self, repository: &'a FormulaRepository) -> Vec<&'a Formula> {
        repository.filter(&self.query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formula_manager_common::FormulaId;
    use serde_json::json;

    #[test]
    fn test_query_does_not_touch_edit_session() {
        let mut repo = FormulaRepository::new();
        let ticket = repo.begin_reload();
        repo.finish_reload(
            ticket,
            Ok(json!([
                {"id": 1, "latex_formula": "a", "legend": "Alpha"},
                {"id": 2, "latex_formula": "b", "legend": "Beta"}
            ])),
        )
        .unwrap();

        let mut list = ListWorkflow::new();
        list.edit.begin_edit(repo.get(FormulaId(2)).unwrap());
        list.set_query("alpha");

        let visible = list.visible(&repo);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, FormulaId(1));
        assert!(list.edit.is_editing_target(FormulaId(2)));
    }
}
