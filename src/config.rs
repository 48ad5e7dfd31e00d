use crate::error::{FormulaManagerError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_BASE_URL: &str = "FORMULA_MANAGER_URL";
pub const ENV_USER_ID: &str = "FORMULA_MANAGER_USER_ID";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 数式ストアのベースURL
    pub base_url: String,
    pub user_id: i64,
    /// エクスポートしたDOCXの保存先
    pub download_dir: PathBuf,
    pub timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            user_id: 1,
            download_dir: PathBuf::from("."),
            timeout_seconds: 30,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| FormulaManagerError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("formula-manager").join("config.json"))
    }

    /// 環境変数を優先して反映する
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(
            std::env::var(ENV_BASE_URL).ok(),
            std::env::var(ENV_USER_ID).ok(),
        )
    }

    fn apply_overrides(&mut self, base_url: Option<String>, user_id: Option<String>) -> Result<()> {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(id) = user_id.filter(|u| !u.trim().is_empty()) {
            self.user_id = id.trim().parse().map_err(|_| {
                FormulaManagerError::Config(format!("{} は整数で指定してください: {}", ENV_USER_ID, id))
            })?;
        }
        Ok(())
    }

    pub fn set_base_url(&mut self, url: String) -> Result<()> {
        if url.trim().is_empty() {
            return Err(FormulaManagerError::Config("URLが空です".into()));
        }
        self.base_url = url.trim().to_string();
        self.save()
    }

    pub fn set_user_id(&mut self, user_id: i64) -> Result<()> {
        self.user_id = user_id;
        self.save()
    }

    pub fn set_download_dir(&mut self, dir: PathBuf) -> Result<()> {
        self.download_dir = dir;
        self.save()
    }
}
