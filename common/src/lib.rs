//! Formula Manager Common Library
//!
//! 数式ストアとのワイヤ型と、IOを持たない純粋な処理（検証・整形・フィルタ）

pub mod types;
pub mod error;
pub mod latex;
pub mod record;
pub mod filter;

pub use types::{
    CommonSubexpression, ComparisonResult, ExportResponse, Formula, FormulaFields, FormulaId,
    LatexResponse, ManageAction, ManageRequest, ManageResponse, parse_ast_nodes,
};
pub use error::{Error, Result, ValidationError};
pub use latex::clean_latex;
pub use record::{sanitize_record, sanitize_records, SanitizedRecords};
pub use filter::filter_formulas;
