//! 画面ごとの状態機械
//!
//! どのワークフローも他のワークフローの状態を直接変更しない。
//! 通信を伴う操作は `begin_*` → (通信) → `finish_*` の2段階で、
//! チケットの世代が合わない完了は捨てる。

pub mod comparison;
pub mod create;
pub mod edit;
pub mod export;
pub mod list;

pub use comparison::{CompareMode, ComparisonPhase, ComparisonWorkflow, SearchOutcome, SearchTicket};
pub use create::{CreateOutcome, CreateTicket, CreateWorkflow};
pub use edit::{EditLifecycle, EditSession, SaveOutcome, SaveTicket};
pub use export::{DownloadRequest, ExportOutcome, ExportTicket, ExportWorkflow, EXPORT_FILE_NAME};
pub use list::ListWorkflow;
