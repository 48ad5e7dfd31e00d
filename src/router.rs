//! 表示中の画面（ビュー）の切り替え
//!
//! アクティブなワークフローはタグ付き共用体で1つだけ保持する。
//! 別のビューへ切り替えると前のワークフローは破棄され、新しいものは初期状態から始まる。

use crate::workflow::{ComparisonWorkflow, CreateWorkflow, ExportWorkflow, ListWorkflow};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum View {
    #[default]
    List,
    Create,
    Similarity,
    Export,
}

impl View {
    pub const ALL: [View; 4] = [View::List, View::Create, View::Similarity, View::Export];

    /// 表示時にキャッシュを再読み込みするビュー
    pub fn loads_formulas(&self) -> bool {
        !matches!(self, View::Create)
    }

    pub fn title(&self) -> &'static str {
        match self {
            View::List => "Formulas",
            View::Create => "Add formula",
            View::Similarity => "Find similar formulas",
            View::Export => "Export to DOCX",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::List => write!(f, "list"),
            View::Create => write!(f, "create"),
            View::Similarity => write!(f, "similarity"),
            View::Export => write!(f, "export"),
        }
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "list" => Ok(View::List),
            "create" | "add" => Ok(View::Create),
            "similarity" | "similar" => Ok(View::Similarity),
            "export" => Ok(View::Export),
            _ => Err(format!("Unknown view: {}. Use list, create, similarity, or export", s)),
        }
    }
}

/// アクティブなワークフロー
#[derive(Debug)]
pub enum Workflow {
    List(ListWorkflow),
    Create(CreateWorkflow),
    Similarity(ComparisonWorkflow),
    Export(ExportWorkflow),
}

impl Workflow {
    pub fn fresh(view: View) -> Self {
        match view {
            View::List => Workflow::List(ListWorkflow::new()),
            View::Create => Workflow::Create(CreateWorkflow::new()),
            View::Similarity => Workflow::Similarity(ComparisonWorkflow::new()),
            View::Export => Workflow::Export(ExportWorkflow::new()),
        }
    }

    pub fn view(&self) -> View {
        match self {
            Workflow::List(_) => View::List,
            Workflow::Create(_) => View::Create,
            Workflow::Similarity(_) => View::Similarity,
            Workflow::Export(_) => View::Export,
        }
    }
}

#[derive(Debug)]
pub struct ViewRouter {
    workflow: Workflow,
}

impl Default for ViewRouter {
    fn default() -> Self {
        Self {
            workflow: Workflow::fresh(View::default()),
        }
    }
}

impl ViewRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> View {
        self.workflow.view()
    }

    /// 唯一の遷移関数。別のビューなら前の一時状態を捨てて切り替え、`true` を返す
    pub fn set_view(&mut self, view: View) -> bool {
        if self.current() == view {
            return false;
        }
        tracing::debug!(from = %self.current(), to = %view, "view switched");
        self.workflow = Workflow::fresh(view);
        true
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn workflow_mut(&mut self) -> &mut Workflow {
        &mut self.workflow
    }
}
