//! 凡例・説明の部分一致フィルタ
//!
//! キー入力ごとに再計算される純粋関数。キャッシュは変更しない。

use crate::types::Formula;

/// `query` を凡例または説明に含む数式を元の順序で返す（大文字小文字を区別しない）
///
/// 空クエリは全件をそのまま返す。
pub fn filter_formulas<'a>(formulas: &'a [Formula], query: &str) -> Vec<&'a Formula> {
    if query.is_empty() {
        return formulas.iter().collect();
    }
    let needle = query.to_lowercase();
    formulas
        .iter()
        .filter(|f| matches_lowercase(f, &needle))
        .collect()
}

/// 1件の判定（`needle` は小文字化済み）
pub fn matches_lowercase(formula: &Formula, needle: &str) -> bool {
    formula.legend().to_lowercase().contains(needle)
        || formula.description().to_lowercase().contains(needle)
}
