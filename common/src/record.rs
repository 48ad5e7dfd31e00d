//! `/formulas` レスポンスの検証
//!
//! `id` と `latex_formula` を持たないレコードはキャッシュに入れる前に除外する。
//! 一部が壊れていても一覧表示を使えるようにするため、エラーにはしない。

use crate::types::{Formula, FormulaId};
use serde_json::Value;
use std::collections::HashSet;

/// 検証済みレコードの集合
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SanitizedRecords {
    pub formulas: Vec<Formula>,
    /// 除外した件数（不正レコード + 重複ID）
    pub dropped: usize,
    /// ペイロード自体が配列でなかった
    pub not_an_array: bool,
}

/// 生レコード1件を検証して `Formula` に変換する
///
/// - `id`: 整数、または整数として読める文字列
/// - `latex_formula`: 空でない文字列
/// - その他の項目は型が合わなければ未設定扱い
pub fn sanitize_record(raw: &Value) -> Option<Formula> {
    let obj = raw.as_object()?;

    let id = match obj.get("id")? {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };

    let latex = obj.get("latex_formula")?.as_str()?;
    if latex.trim().is_empty() {
        return None;
    }

    let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);

    Some(Formula {
        id: FormulaId(id),
        latex_formula: latex.to_string(),
        author_id: obj.get("author_id").and_then(Value::as_i64),
        legend: text("legend"),
        description: text("description"),
        creation_date: text("creation_date"),
        update_date: text("update_date"),
    })
}

/// 一覧ペイロード全体を検証する
///
/// 順序はサーバの返却順を保つ。同じIDが複数あれば先頭のみ残す。
pub fn sanitize_records(payload: &Value) -> SanitizedRecords {
    let Some(items) = payload.as_array() else {
        return SanitizedRecords {
            not_an_array: true,
            ..Default::default()
        };
    };

    let mut seen = HashSet::new();
    let mut formulas = Vec::with_capacity(items.len());
    for item in items {
        if let Some(formula) = sanitize_record(item) {
            if seen.insert(formula.id) {
                formulas.push(formula);
            }
        }
    }

    SanitizedRecords {
        dropped: items.len() - formulas.len(),
        formulas,
        not_an_array: false,
    }
}
