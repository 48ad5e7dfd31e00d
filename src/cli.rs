use clap::{Args, Parser, Subcommand};
use formula_manager_common::FormulaId;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "formula-manager")]
#[command(about = "数式ストアのクライアント（一覧・編集・類似検索・DOCXエクスポート）", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 数式ストアのベースURL（設定ファイル・環境変数より優先）
    #[arg(long, global = true)]
    pub base_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 数式一覧を表示
    List {
        /// 凡例・説明で絞り込む
        #[arg(short, long)]
        query: Option<String>,
    },

    /// 数式を追加
    Add {
        /// LaTeX
        #[arg(long)]
        latex: String,

        /// 凡例（名前）
        #[arg(long)]
        legend: String,

        /// 説明
        #[arg(long)]
        description: String,
    },

    /// 数式を編集（指定しなかった項目は現在の値のまま）
    Edit {
        #[arg(required = true)]
        id: FormulaId,

        #[arg(long)]
        latex: Option<String>,

        #[arg(long)]
        legend: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// 数式を削除
    Delete {
        #[arg(required = true)]
        id: FormulaId,

        /// 確認しない
        #[arg(short, long)]
        yes: bool,
    },

    /// 類似数式を検索
    Similar(SimilarArgs),

    /// 選択した数式をDOCXに出力
    Export {
        /// 出力する数式ID（指定順に出力）
        #[arg(required = true)]
        ids: Vec<FormulaId>,

        /// 一覧表示の絞り込み（選択には影響しない）
        #[arg(short, long)]
        query: Option<String>,

        /// 保存先ディレクトリ（デフォルト: 設定の download_dir）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 数式ASTのJSONをLaTeXに変換
    Convert {
        /// ASTノード配列のJSONファイル
        #[arg(required = true)]
        input: PathBuf,
    },

    /// 対話モード
    Shell,

    /// 設定
    Config {
        /// ベースURLを設定
        #[arg(long)]
        set_url: Option<String>,

        /// ユーザーIDを設定
        #[arg(long)]
        set_user_id: Option<i64>,

        /// ダウンロード先を設定
        #[arg(long)]
        set_download_dir: Option<PathBuf>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct SimilarArgs {
    /// 登録済みの数式IDを検索元にする
    #[arg(long)]
    pub id: Option<FormulaId>,

    /// 新しい数式を検索元にする
    #[arg(long)]
    pub latex: Option<String>,
}
