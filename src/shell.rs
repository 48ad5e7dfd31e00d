//! 対話モード
//!
//! 表示中のビューごとにメニューを出し、選んだ操作をワークスペースに渡す。
//! 操作の失敗は通知して続行し、端末入力そのものの失敗だけを呼び出し元へ返す。

use crate::error::{FormulaManagerError, Result};
use crate::render;
use crate::router::View;
use crate::transport::FormulaTransport;
use crate::workflow::{CompareMode, CreateOutcome, SaveOutcome, SearchOutcome};
use crate::workspace::Workspace;
use dialoguer::{Confirm, Input, MultiSelect, Select};
use formula_manager_common::FormulaId;
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::time::Duration;

/// 通信中に表示するスピナー
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub async fn with_spinner<F: Future>(message: &str, fut: F) -> F::Output {
    let pb = spinner(message);
    let output = fut.await;
    pb.finish_and_clear();
    output
}

/// 失敗を通知して `None` にする
fn notify<T>(result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            if err.is_local() {
                println!("⚠ {}", err);
            } else {
                println!("✖ {}", err);
            }
            None
        }
    }
}

fn prompt_error(e: dialoguer::Error) -> FormulaManagerError {
    FormulaManagerError::Prompt(e.to_string())
}

fn choose(prompt: &str, items: &[&str]) -> Result<Option<usize>> {
    Select::new()
        .with_prompt(prompt)
        .items(items)
        .default(0)
        .interact_opt()
        .map_err(prompt_error)
}

fn text(prompt: &str, initial: &str) -> Result<String> {
    Input::<String>::new()
        .with_prompt(prompt)
        .with_initial_text(initial)
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_error)
}

fn pick_formula(prompt: &str, choices: &[(FormulaId, String)]) -> Result<Option<FormulaId>> {
    if choices.is_empty() {
        println!("{}", render::empty_list_message(""));
        return Ok(None);
    }
    let labels: Vec<&str> = choices.iter().map(|(_, label)| label.as_str()).collect();
    Ok(choose(prompt, &labels)?.map(|i| choices[i].0))
}

fn formula_choices<T: FormulaTransport>(workspace: &Workspace<T>) -> Vec<(FormulaId, String)> {
    workspace
        .visible_formulas()
        .iter()
        .map(|f| (f.id, format!("#{} {}  {}", f.id, f.legend(), f.latex_formula)))
        .collect()
}

/// 画面共通のメニュー項目
enum Nav {
    SwitchView,
    Quit,
}

const NAV_LABELS: [&str; 2] = ["画面を切り替え", "終了"];

fn nav_at(index: usize, own_items: usize) -> Option<Nav> {
    match index.checked_sub(own_items) {
        Some(0) => Some(Nav::SwitchView),
        Some(1) => Some(Nav::Quit),
        _ => None,
    }
}

fn menu(own: &[&str]) -> Result<Option<usize>> {
    let items: Vec<&str> = own.iter().copied().chain(NAV_LABELS).collect();
    choose("操作", &items)
}

async fn handle_nav<T: FormulaTransport>(workspace: &mut Workspace<T>, nav: Nav) -> Result<bool> {
    match nav {
        Nav::Quit => Ok(false),
        Nav::SwitchView => {
            let titles: Vec<&str> = View::ALL.iter().map(|v| v.title()).collect();
            let current = View::ALL.iter().position(|v| *v == workspace.view()).unwrap_or(0);
            let picked = Select::new()
                .with_prompt("画面")
                .items(&titles)
                .default(current)
                .interact_opt()
                .map_err(prompt_error)?;
            if let Some(i) = picked {
                notify(with_spinner("読み込み中...", workspace.enter(View::ALL[i])).await);
            }
            Ok(true)
        }
    }
}

pub async fn run_shell<T: FormulaTransport>(workspace: &mut Workspace<T>) -> Result<()> {
    println!("🧮 formula-manager - 対話モード");
    notify(with_spinner("一覧を読み込み中...", workspace.enter(View::List)).await);

    loop {
        println!("\n== {} ==", workspace.view().title());
        let keep_going = match workspace.view() {
            View::List => list_screen(workspace).await?,
            View::Create => create_screen(workspace).await?,
            View::Similarity => similarity_screen(workspace).await?,
            View::Export => export_screen(workspace).await?,
        };
        if !keep_going {
            break;
        }
    }
    println!("👋 終了します");
    Ok(())
}

async fn list_screen<T: FormulaTransport>(workspace: &mut Workspace<T>) -> Result<bool> {
    if let Some(banner) = render::load_state_banner(workspace.repository().state()) {
        println!("{}", banner);
    }
    let query = workspace.list().map(|l| l.query().to_string()).unwrap_or_default();
    if !query.is_empty() {
        println!("検索: {}", query);
    }
    print!("{}", render::formula_list(&workspace.visible_formulas(), &query));

    let editing = workspace.list().and_then(|l| l.edit.session()).cloned();
    if let Some(session) = &editing {
        print!("\n{}", render::edit_card(session));
        let own = ["LaTeXを編集", "凡例を編集", "説明を編集", "保存", "編集を取り消す"];
        let Some(index) = menu(&own)? else {
            return Ok(true);
        };
        let draft = &session.draft;
        match index {
            0 => {
                let value = text("LaTeX", &draft.latex)?;
                workspace.edit_mut()?.set_latex(&value);
            }
            1 => {
                let value = text("凡例", &draft.legend)?;
                workspace.edit_mut()?.set_legend(&value);
            }
            2 => {
                let value = text("説明", &draft.description)?;
                workspace.edit_mut()?.set_description(&value);
            }
            3 => {
                if let Some(SaveOutcome::Saved(id)) =
                    notify(with_spinner("保存中...", workspace.save_edit()).await)
                {
                    println!("✔ #{} を保存しました", id);
                }
            }
            4 => {
                workspace.cancel_edit()?;
            }
            other => {
                if let Some(nav) = nav_at(other, own.len()) {
                    return handle_nav(workspace, nav).await;
                }
            }
        }
        return Ok(true);
    }

    let own = ["検索", "編集", "削除", "再読み込み"];
    let Some(index) = menu(&own)? else {
        return Ok(true);
    };
    match index {
        0 => {
            let value = text("検索語（凡例・説明）", &query)?;
            workspace.set_query(&value)?;
        }
        1 => {
            if let Some(id) = pick_formula("編集する数式", &formula_choices(workspace))? {
                if let Some(discarded) = notify(workspace.begin_edit(id)).flatten() {
                    println!("未保存の #{} の編集を破棄しました", discarded.target_id);
                }
            }
        }
        2 => {
            if let Some(id) = pick_formula("削除する数式", &formula_choices(workspace))? {
                let confirmed = Confirm::new()
                    .with_prompt(format!("#{} を削除しますか?", id))
                    .default(false)
                    .interact()
                    .map_err(prompt_error)?;
                if confirmed && notify(with_spinner("削除中...", workspace.delete_formula(id)).await).is_some() {
                    println!("✔ #{} を削除しました", id);
                }
            }
        }
        3 => {
            notify(with_spinner("読み込み中...", workspace.reload()).await);
        }
        other => {
            if let Some(nav) = nav_at(other, own.len()) {
                return handle_nav(workspace, nav).await;
            }
        }
    }
    Ok(true)
}

async fn create_screen<T: FormulaTransport>(workspace: &mut Workspace<T>) -> Result<bool> {
    let draft = workspace.create().map(|c| c.draft().clone()).unwrap_or_default();
    if !draft.is_empty() {
        println!("プレビュー:\n{}", render::fields_preview(&draft));
    }

    let own = ["入力", "追加", "クリア"];
    let Some(index) = menu(&own)? else {
        return Ok(true);
    };
    match index {
        0 => {
            let legend = text("凡例", &draft.legend)?;
            let latex = text("LaTeX", &draft.latex)?;
            let description = text("説明", &draft.description)?;
            let create = workspace.create_mut()?;
            create.set_legend(&legend);
            create.set_latex(&latex);
            create.set_description(&description);
        }
        1 => {
            if let Some(CreateOutcome::Created) =
                notify(with_spinner("追加中...", workspace.submit_create()).await)
            {
                println!("✔ 数式を追加しました");
            }
        }
        2 => workspace.create_mut()?.reset(),
        other => {
            if let Some(nav) = nav_at(other, own.len()) {
                return handle_nav(workspace, nav).await;
            }
        }
    }
    Ok(true)
}

async fn similarity_screen<T: FormulaTransport>(workspace: &mut Workspace<T>) -> Result<bool> {
    let shown = workspace
        .comparison()
        .and_then(|c| c.results())
        .map(|(source, results)| render::comparison_results(source, results));

    if let Some(results) = shown {
        print!("{}", results);
        let own = ["新しい検索"];
        let Some(index) = menu(&own)? else {
            return Ok(true);
        };
        match index {
            0 => workspace.comparison_mut()?.new_search(),
            other => {
                if let Some(nav) = nav_at(other, own.len()) {
                    return handle_nav(workspace, nav).await;
                }
            }
        }
        return Ok(true);
    }

    if let Some(cmp) = workspace.comparison() {
        match cmp.mode() {
            CompareMode::Existing => match cmp.selected() {
                Some(id) => println!("検索元: #{}", id),
                None => println!("検索元: (未選択)"),
            },
            CompareMode::New => println!("検索元: {}", cmp.new_latex()),
        }
    }

    let own = ["登録済みの数式から選ぶ", "新しい数式を入力", "検索"];
    let Some(index) = menu(&own)? else {
        return Ok(true);
    };
    match index {
        0 => {
            workspace.comparison_mut()?.set_mode(CompareMode::Existing);
            if let Some(id) = pick_formula("検索元の数式", &formula_choices(workspace))? {
                workspace.comparison_mut()?.select_formula(id);
            }
        }
        1 => {
            let current = workspace
                .comparison()
                .map(|c| c.new_latex().to_string())
                .unwrap_or_default();
            let value = text("LaTeX", &current)?;
            let cmp = workspace.comparison_mut()?;
            cmp.set_mode(CompareMode::New);
            cmp.set_new_latex(&value);
        }
        2 => {
            if let Some(SearchOutcome::Applied(count)) =
                notify(with_spinner("検索中...", workspace.search_similar()).await)
            {
                println!("✔ {}件見つかりました", count);
            }
        }
        other => {
            if let Some(nav) = nav_at(other, own.len()) {
                return handle_nav(workspace, nav).await;
            }
        }
    }
    Ok(true)
}

async fn export_screen<T: FormulaTransport>(workspace: &mut Workspace<T>) -> Result<bool> {
    let Some(export) = workspace.export() else {
        return Ok(true);
    };
    let query = export.query().to_string();
    let visible = workspace.visible_formulas();
    if visible.is_empty() {
        println!("{}", render::empty_list_message(&query));
    }
    for formula in &visible {
        println!("{}", render::export_row(formula, export.is_selected(formula.id)));
    }
    println!("選択中: {}件", export.selection().len());

    let own = ["検索", "選択", "DOCXを生成", "選択をクリア"];
    let Some(index) = menu(&own)? else {
        return Ok(true);
    };
    match index {
        0 => {
            let value = text("検索語（凡例・説明）", &query)?;
            workspace.set_query(&value)?;
        }
        1 => select_for_export(workspace)?,
        2 => {
            match notify(with_spinner("エクスポート中...", workspace.export_selected()).await) {
                Some(Some(path)) => println!("✔ 保存しました: {}", path.display()),
                Some(None) | None => {}
            }
        }
        3 => workspace.export_mut()?.reset(),
        other => {
            if let Some(nav) = nav_at(other, own.len()) {
                return handle_nav(workspace, nav).await;
            }
        }
    }
    Ok(true)
}

/// 表示中の数式について選択状態を切り替える（非表示の選択はそのまま）
fn select_for_export<T: FormulaTransport>(workspace: &mut Workspace<T>) -> Result<()> {
    let Some(export) = workspace.export() else {
        return Ok(());
    };
    let rows: Vec<(FormulaId, String, bool)> = workspace
        .visible_formulas()
        .iter()
        .map(|f| (f.id, format!("#{} {}", f.id, f.legend()), export.is_selected(f.id)))
        .collect();
    if rows.is_empty() {
        println!("{}", render::empty_list_message(export.query()));
        return Ok(());
    }

    let labels: Vec<&str> = rows.iter().map(|(_, label, _)| label.as_str()).collect();
    let defaults: Vec<bool> = rows.iter().map(|(_, _, selected)| *selected).collect();
    let chosen = MultiSelect::new()
        .with_prompt("出力する数式（スペースで切り替え）")
        .items(&labels)
        .defaults(&defaults)
        .interact()
        .map_err(prompt_error)?;

    for (i, (id, _, selected)) in rows.iter().enumerate() {
        if chosen.contains(&i) != *selected {
            workspace.toggle_export(*id)?;
        }
    }
    Ok(())
}
