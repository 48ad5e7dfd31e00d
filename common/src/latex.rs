//! 数式入力ウィジェット出力の整形
//!
//! 入力ウィジェットは1文字の英数字を `\text{x}` で包んで出力することがある。
//! 表示前・保存前にこれを素の文字へ戻す（数式の意味は変えない）。

use regex::Regex;

/// `\text{X}`（Xは英数字1文字）を `X` に置き換える
pub fn clean_latex(latex: &str) -> String {
    lazy_static::lazy_static! {
        static ref TEXT_WRAPPED_CHAR_RE: Regex = Regex::new(r"\\text\{([a-zA-Z0-9])\}").unwrap();
    }
    TEXT_WRAPPED_CHAR_RE.replace_all(latex, "$1").into_owned()
}
