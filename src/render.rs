//! 端末向けのテキスト表示
//!
//! 数式は LaTeX 文字列のまま表示する（組版はしない）。

use crate::repository::LoadState;
use crate::workflow::EditSession;
use formula_manager_common::{ComparisonResult, Formula, FormulaFields};
use std::fmt::Write;

/// 一覧が空のときの表示。検索語があれば「該当なし」、なければ「未登録」
pub fn empty_list_message(query: &str) -> &'static str {
    if query.trim().is_empty() {
        "No formulas"
    } else {
        "No formulas found"
    }
}

/// 読み込み失敗時のバナー
pub fn load_state_banner(state: &LoadState) -> Option<String> {
    match state {
        LoadState::Failed(message) => Some(format!("⚠ {}", message)),
        LoadState::Idle | LoadState::Loaded => None,
    }
}

pub fn formula_card(formula: &Formula) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "#{} {}", formula.id, formula.legend());
    let _ = writeln!(out, "    {}", formula.latex_formula);
    if !formula.description().is_empty() {
        let _ = writeln!(out, "    {}", formula.description());
    }
    if let Some(updated) = formula.update_date.as_deref().or(formula.creation_date.as_deref()) {
        let _ = writeln!(out, "    ({})", updated);
    }
    out
}

/// 一覧の表示。空なら `empty_list_message`
pub fn formula_list(formulas: &[&Formula], query: &str) -> String {
    if formulas.is_empty() {
        return format!("{}\n", empty_list_message(query));
    }
    formulas.iter().map(|f| formula_card(f)).collect()
}

/// 編集中の下書き
pub fn edit_card(session: &EditSession) -> String {
    format!("✎ #{} (editing)\n{}", session.target_id, fields_preview(&session.draft))
}

/// 追加・編集フォームのプレビュー
pub fn fields_preview(fields: &FormulaFields) -> String {
    format!(
        "    legend:      {}\n    latex:       {}\n    description: {}\n",
        fields.legend, fields.latex, fields.description
    )
}

/// エクスポート画面の1行（選択マーカー付き）
pub fn export_row(formula: &Formula, selected: bool) -> String {
    format!(
        "[{}] #{} {}  {}",
        if selected { "x" } else { " " },
        formula.id,
        formula.legend(),
        formula.latex_formula
    )
}

pub fn similarity_label(similarity: f64) -> String {
    format!("{}%", similarity)
}

/// 検索元と一致した数式を並べて表示する
pub fn comparison_card(source: &str, result: &ComparisonResult) -> String {
    let formula = &result.formula;
    let mut out = String::new();
    let _ = writeln!(out, "── {} (#{})", formula.legend(), formula.id);
    let _ = writeln!(out, "  source:      {}", source);
    let _ = writeln!(out, "  match:       {}", formula.latex_formula);
    if !formula.description().is_empty() {
        let _ = writeln!(out, "  {}", formula.description());
    }
    let _ = writeln!(
        out,
        "  equivalent:  {}",
        if result.equivalent { "Yes" } else { "No" }
    );
    let _ = writeln!(out, "  similarity:  {}", similarity_label(result.similarity));
    let _ = writeln!(out, "  simplified1: {}", result.simplified1);
    let _ = writeln!(out, "  simplified2: {}", result.simplified2);

    if !result.common_subexpressions.is_empty() {
        let _ = writeln!(out, "  common subexpressions:");
        for common in &result.common_subexpressions {
            let _ = writeln!(
                out,
                "    {} (x{})",
                common.subexpression,
                common.occurrences_in_simplified2.len().max(common.indices_in_expr2.len())
            );
        }
    }
    out
}

pub fn comparison_results(source: &str, results: &[ComparisonResult]) -> String {
    let mut out = format!("Similar formulas ({})\n", results.len());
    if results.is_empty() {
        out.push_str("No similar formulas found\n");
        return out;
    }
    for result in results {
        out.push_str(&comparison_card(source, result));
    }
    out
}
