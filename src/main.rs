use anyhow::Result;
use clap::Parser;
use dialoguer::Confirm;
use formula_manager::{cli, config, error, render, router, shell, transport, workflow, workspace};
use cli::{Cli, Commands, SimilarArgs};
use config::Config;
use error::FormulaManagerError;
use formula_manager_common::parse_ast_nodes;
use router::View;
use shell::with_spinner;
use transport::HttpTransport;
use workflow::{CompareMode, SaveOutcome, SearchOutcome};
use workspace::{Workspace, WorkspaceSettings};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load()?;

    // 設定の編集は通信しない
    if let Commands::Config { set_url, set_user_id, set_download_dir, show } = &cli.command {
        if let Some(url) = set_url {
            config.set_base_url(url.clone())?;
            println!("✔ ベースURLを設定しました");
        }
        if let Some(user_id) = set_user_id {
            config.set_user_id(*user_id)?;
            println!("✔ ユーザーIDを設定しました");
        }
        if let Some(dir) = set_download_dir {
            config.set_download_dir(dir.clone())?;
            println!("✔ ダウンロード先を設定しました");
        }
        if *show {
            println!("設定:");
            println!("  ベースURL: {}", config.base_url);
            println!("  ユーザーID: {}", config.user_id);
            println!("  ダウンロード先: {}", config.download_dir.display());
            println!("  タイムアウト: {}秒", config.timeout_seconds);
        }
        return Ok(());
    }

    config.apply_env()?;
    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
    }
    tracing::debug!(base_url = %config.base_url, user_id = config.user_id, "configuration loaded");

    let transport = HttpTransport::from_config(&config)?;
    let mut settings = WorkspaceSettings::from_config(&config);
    if let Commands::Export { output: Some(dir), .. } = &cli.command {
        settings.download_dir = dir.clone();
    }
    let mut ws = Workspace::new(transport, settings);

    match cli.command {
        Commands::List { query } => {
            with_spinner("一覧を読み込み中...", ws.enter(View::List)).await?;
            let query = query.unwrap_or_default();
            ws.set_query(&query)?;
            print!("{}", render::formula_list(&ws.visible_formulas(), &query));
        }

        Commands::Add { latex, legend, description } => {
            println!("➕ formula-manager - 数式の追加\n");
            ws.enter(View::Create).await?;
            let create = ws.create_mut()?;
            create.set_latex(&latex);
            create.set_legend(&legend);
            create.set_description(&description);
            print!("{}", render::fields_preview(create.draft()));

            with_spinner("追加中...", ws.submit_create()).await?;
            println!("✔ 数式を追加しました");
            report_load_state(&ws);
        }

        Commands::Edit { id, latex, legend, description } => {
            println!("✎ formula-manager - 数式の編集\n");
            with_spinner("一覧を読み込み中...", ws.enter(View::List)).await?;
            ws.begin_edit(id)?;
            let edit = ws.edit_mut()?;
            if let Some(latex) = latex {
                edit.set_latex(&latex);
            }
            if let Some(legend) = legend {
                edit.set_legend(&legend);
            }
            if let Some(description) = description {
                edit.set_description(&description);
            }
            if let Some(session) = edit.session() {
                print!("{}", render::edit_card(session));
            }

            if let SaveOutcome::Saved(id) = with_spinner("保存中...", ws.save_edit()).await? {
                println!("✔ #{} を保存しました", id);
                report_load_state(&ws);
            }
        }

        Commands::Delete { id, yes } => {
            with_spinner("一覧を読み込み中...", ws.enter(View::List)).await?;
            let formula = ws
                .repository()
                .get(id)
                .ok_or(FormulaManagerError::NotFound(id))?;
            print!("{}", render::formula_card(formula));

            let confirmed = yes
                || Confirm::new()
                    .with_prompt(format!("#{} を削除しますか?", id))
                    .default(false)
                    .interact()
                    .map_err(|e| FormulaManagerError::Prompt(e.to_string()))?;
            if !confirmed {
                println!("中止しました");
                return Ok(());
            }
            with_spinner("削除中...", ws.delete_formula(id)).await?;
            println!("✔ #{} を削除しました", id);
            report_load_state(&ws);
        }

        Commands::Similar(SimilarArgs { id, latex }) => {
            println!("🔍 formula-manager - 類似数式の検索\n");
            with_spinner("一覧を読み込み中...", ws.enter(View::Similarity)).await?;
            let cmp = ws.comparison_mut()?;
            match (id, latex) {
                (Some(id), _) => {
                    cmp.set_mode(CompareMode::Existing);
                    cmp.select_formula(id);
                }
                (None, latex) => {
                    cmp.set_mode(CompareMode::New);
                    cmp.set_new_latex(&latex.unwrap_or_default());
                }
            }

            if let SearchOutcome::Applied(_) = with_spinner("検索中...", ws.search_similar()).await? {
                if let Some((source, results)) = ws.comparison().and_then(|c| c.results()) {
                    print!("{}", render::comparison_results(source, results));
                }
            }
        }

        Commands::Export { ids, query, .. } => {
            println!("📄 formula-manager - DOCXエクスポート\n");
            with_spinner("一覧を読み込み中...", ws.enter(View::Export)).await?;
            if let Some(query) = query {
                ws.set_query(&query)?;
            }
            for id in ids {
                let already = ws.export().is_some_and(|e| e.is_selected(id));
                if !already {
                    ws.toggle_export(id)?;
                }
            }
            if let Some(export) = ws.export() {
                for formula in ws.visible_formulas() {
                    println!("{}", render::export_row(formula, export.is_selected(formula.id)));
                }
            }

            if let Some(path) = with_spinner("エクスポート中...", ws.export_selected()).await? {
                println!("\n✅ 保存しました: {}", path.display());
            }
        }

        Commands::Convert { input } => {
            let content = std::fs::read_to_string(&input)?;
            let nodes = parse_ast_nodes(&content)?;
            let latex = with_spinner("変換中...", ws.convert_ast(&nodes)).await?;
            println!("{}", latex);
        }

        Commands::Shell => {
            shell::run_shell(&mut ws).await?;
        }

        Commands::Config { .. } => {}
    }

    Ok(())
}

/// 変更後の再読み込みに失敗していたら表示する
fn report_load_state(ws: &Workspace<HttpTransport>) {
    if let Some(banner) = render::load_state_banner(ws.repository().state()) {
        eprintln!("{}", banner);
    }
}
