//! ワークスペース制御（ルートコントローラ）
//!
//! 数式ストア（Transport）・一覧キャッシュ・ビュー切り替えを1か所で所有し、
//! 各画面の操作を「検証 → 通信 → 結果の適用」の順に実行する。

use crate::config::Config;
use crate::download::save_download;
use crate::error::{FormulaManagerError, Result};
use crate::repository::{FormulaRepository, LoadState};
use crate::router::{View, ViewRouter, Workflow};
use crate::transport::FormulaTransport;
use crate::workflow::{
    ComparisonWorkflow, CreateOutcome, CreateWorkflow, DownloadRequest, EditLifecycle,
    EditSession, ExportOutcome, ExportWorkflow, ListWorkflow, SaveOutcome, SearchOutcome,
};
use formula_manager_common::{Formula, FormulaId};
use serde_json::Value;
use std::path::PathBuf;

/// ワークスペースの動作設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSettings {
    pub user_id: i64,
    pub download_dir: PathBuf,
}

impl WorkspaceSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            user_id: config.user_id,
            download_dir: config.download_dir.clone(),
        }
    }
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

pub struct Workspace<T> {
    transport: T,
    settings: WorkspaceSettings,
    repository: FormulaRepository,
    router: ViewRouter,
}

impl<T: FormulaTransport> Workspace<T> {
    pub fn new(transport: T, settings: WorkspaceSettings) -> Self {
        Self {
            transport,
            settings,
            repository: FormulaRepository::new(),
            router: ViewRouter::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn settings(&self) -> &WorkspaceSettings {
        &self.settings
    }

    pub fn repository(&self) -> &FormulaRepository {
        &self.repository
    }

    pub fn router(&self) -> &ViewRouter {
        &self.router
    }

    // -- ビュー --

    pub fn view(&self) -> View {
        self.router.current()
    }

    pub fn set_view(&mut self, view: View) -> bool {
        self.router.set_view(view)
    }

    /// ビューを切り替え、必要なら一覧を読み込む
    pub async fn enter(&mut self, view: View) -> Result<()> {
        let switched = self.set_view(view);
        let never_loaded = matches!(self.repository.state(), LoadState::Idle);
        if view.loads_formulas() && (switched || never_loaded) {
            self.reload().await?;
        }
        Ok(())
    }

    pub async fn reload(&mut self) -> Result<usize> {
        self.repository.reload(&self.transport).await
    }

    /// 変更が確定した後の再読み込み
    ///
    /// 失敗は `LoadState::Failed` に残すだけで、確定済みの変更の結果には含めない。
    async fn refresh_after_change(&mut self) {
        if let Err(err) = self.reload().await {
            tracing::warn!(error = %err, "reload after a confirmed change failed");
        }
    }

    /// 現在のビューで表示する数式
    pub fn visible_formulas(&self) -> Vec<&Formula> {
        match self.router.workflow() {
            Workflow::List(list) => list.visible(&self.repository),
            Workflow::Export(export) => export.visible(&self.repository),
            Workflow::Similarity(_) => self.repository.formulas().iter().collect(),
            Workflow::Create(_) => Vec::new(),
        }
    }

    /// 一覧・エクスポート画面の検索語を更新する
    pub fn set_query(&mut self, query: &str) -> Result<()> {
        match self.router.workflow_mut() {
            Workflow::List(list) => list.set_query(query),
            Workflow::Export(export) => export.set_query(query),
            other => {
                return Err(FormulaManagerError::InvalidState(format!(
                    "the {} view has no search box",
                    other.view()
                )))
            }
        }
        Ok(())
    }

    // -- 各ワークフローへのアクセス --

    pub fn list(&self) -> Option<&ListWorkflow> {
        match self.router.workflow() {
            Workflow::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn list_mut(&mut self) -> Result<&mut ListWorkflow> {
        list_of(&mut self.router)
    }

    pub fn edit_mut(&mut self) -> Result<&mut EditLifecycle> {
        Ok(&mut list_of(&mut self.router)?.edit)
    }

    pub fn create(&self) -> Option<&CreateWorkflow> {
        match self.router.workflow() {
            Workflow::Create(create) => Some(create),
            _ => None,
        }
    }

    pub fn create_mut(&mut self) -> Result<&mut CreateWorkflow> {
        create_of(&mut self.router)
    }

    pub fn comparison(&self) -> Option<&ComparisonWorkflow> {
        match self.router.workflow() {
            Workflow::Similarity(cmp) => Some(cmp),
            _ => None,
        }
    }

    pub fn comparison_mut(&mut self) -> Result<&mut ComparisonWorkflow> {
        comparison_of(&mut self.router)
    }

    pub fn export(&self) -> Option<&ExportWorkflow> {
        match self.router.workflow() {
            Workflow::Export(export) => Some(export),
            _ => None,
        }
    }

    pub fn export_mut(&mut self) -> Result<&mut ExportWorkflow> {
        export_of(&mut self.router)
    }

    // -- 一覧（編集・削除） --

    /// 編集を開始する。別の数式を編集中だった場合、その下書きを返す（保存はしない）
    pub fn begin_edit(&mut self, id: FormulaId) -> Result<Option<EditSession>> {
        let formula = self
            .repository
            .get(id)
            .ok_or(FormulaManagerError::NotFound(id))?;
        Ok(list_of(&mut self.router)?.edit.begin_edit(formula))
    }

    pub fn cancel_edit(&mut self) -> Result<Option<EditSession>> {
        Ok(list_of(&mut self.router)?.edit.cancel_edit())
    }

    /// 下書きを保存し、成功したら一覧を再読み込みする
    pub async fn save_edit(&mut self) -> Result<SaveOutcome> {
        let ticket = list_of(&mut self.router)?.edit.begin_save()?;
        let outcome = self
            .transport
            .update(ticket.target_id, &ticket.fields, self.settings.user_id)
            .await
            .map(|_| ());

        let saved = list_of(&mut self.router)?.edit.finish_save(ticket, outcome)?;
        if let SaveOutcome::Saved(id) = saved {
            tracing::info!(%id, "formula updated");
            self.refresh_after_change().await;
        }
        Ok(saved)
    }

    /// 削除して一覧を再読み込みする（確認は表示側で行う）
    pub async fn delete_formula(&mut self, id: FormulaId) -> Result<()> {
        list_of(&mut self.router)?;
        self.transport.delete(id, self.settings.user_id).await?;
        tracing::info!(%id, "formula deleted");

        if list_of(&mut self.router)?.edit.forget(id).is_some() {
            tracing::debug!(%id, "edit session closed for deleted formula");
        }
        self.refresh_after_change().await;
        Ok(())
    }

    // -- 追加 --

    /// 追加に成功したら一覧画面へ戻る
    pub async fn submit_create(&mut self) -> Result<CreateOutcome> {
        let ticket = create_of(&mut self.router)?.begin_submit()?;
        let outcome = self
            .transport
            .create(&ticket.fields, self.settings.user_id)
            .await
            .map(|response| {
                tracing::info!(id = ?response.formula_id, "formula created");
            });

        let created = create_of(&mut self.router)?.finish_submit(ticket, outcome)?;
        if created == CreateOutcome::Created {
            self.set_view(View::List);
            self.refresh_after_change().await;
        }
        Ok(created)
    }

    // -- 類似検索 --

    pub async fn search_similar(&mut self) -> Result<SearchOutcome> {
        let ticket = comparison_of(&mut self.router)?.begin_search(&self.repository)?;
        let outcome = self.transport.find_similar(&ticket.source).await;

        let applied = comparison_of(&mut self.router)?.finish_search(ticket, outcome)?;
        if let SearchOutcome::Applied(count) = applied {
            tracing::info!(count, "similar formulas found");
        }
        Ok(applied)
    }

    // -- エクスポート --

    pub fn toggle_export(&mut self, id: FormulaId) -> Result<bool> {
        Ok(export_of(&mut self.router)?.toggle(id))
    }

    /// 選択した数式をDOCXに変換し、ダウンロードしたファイルのパスを返す
    ///
    /// 古い応答だった場合は `Ok(None)`。
    pub async fn export_selected(&mut self) -> Result<Option<PathBuf>> {
        let ticket = export_of(&mut self.router)?.begin_export(&self.repository)?;
        tracing::info!(count = ticket.formulas.len(), "exporting formulas");
        let outcome = self.transport.convert_to_export_format(&ticket.formulas).await;

        match export_of(&mut self.router)?.finish_export(ticket, outcome)? {
            ExportOutcome::Download(request) => Ok(Some(self.download(&request).await?)),
            ExportOutcome::Stale => Ok(None),
        }
    }

    /// ファイル参照を1回だけ取得して保存する
    pub async fn download(&self, request: &DownloadRequest) -> Result<PathBuf> {
        let bytes = self.transport.fetch_file(&request.file_url).await?;
        let path = save_download(&self.settings.download_dir, &request.file_name, &bytes)?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "export downloaded");
        Ok(path)
    }

    // -- その他 --

    pub async fn convert_ast(&self, ast: &[Value]) -> Result<String> {
        self.transport.convert_ast_to_latex(ast).await
    }
}

fn inactive(expected: View, current: View) -> FormulaManagerError {
    FormulaManagerError::InvalidState(format!(
        "the {} view is not active (current: {})",
        expected, current
    ))
}

fn list_of(router: &mut ViewRouter) -> Result<&mut ListWorkflow> {
    match router.workflow_mut() {
        Workflow::List(list) => Ok(list),
        other => Err(inactive(View::List, other.view())),
    }
}

fn create_of(router: &mut ViewRouter) -> Result<&mut CreateWorkflow> {
    match router.workflow_mut() {
        Workflow::Create(create) => Ok(create),
        other => Err(inactive(View::Create, other.view())),
    }
}

fn comparison_of(router: &mut ViewRouter) -> Result<&mut ComparisonWorkflow> {
    match router.workflow_mut() {
        Workflow::Similarity(cmp) => Ok(cmp),
        other => Err(inactive(View::Similarity, other.view())),
    }
}

fn export_of(router: &mut ViewRouter) -> Result<&mut ExportWorkflow> {
    match router.workflow_mut() {
        Workflow::Export(export) => Ok(export),
        other => Err(inactive(View::Export, other.view())),
    }
}
