//! 設定ファイル管理モジュール
//!
//! 入力ログのパスとエンコーディング、外れ値フィルタの設定をJSON形式で保持

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// 設定ファイルのデフォルトファイル名
const CONFIG_FILENAME: &str = "gbtrace_config.json";

/// 実行ファイルのディレクトリを取得
pub fn get_exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// 設定ファイルのパスを取得
pub fn get_config_path() -> PathBuf {
    get_exe_dir().join(CONFIG_FILENAME)
}

/// ログファイルの文字エンコーディング
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEncoding {
    /// 自前エミュレータのログ（PowerShellのリダイレクト出力）
    #[serde(rename = "utf-16le")]
    Utf16Le,
    /// 参照エミュレータのログ
    #[serde(rename = "utf-8")]
    Utf8,
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextEncoding::Utf16Le => write!(f, "utf-16le"),
            TextEncoding::Utf8 => write!(f, "utf-8"),
        }
    }
}

impl FromStr for TextEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-16le" | "utf16le" | "utf-16" => Ok(TextEncoding::Utf16Le),
            "utf-8" | "utf8" | "default" => Ok(TextEncoding::Utf8),
            other => Err(format!("Unknown encoding: {}", other)),
        }
    }
}

/// ツール設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 自前エミュレータのトレースログ
    #[serde(default = "default_own_path")]
    pub own_path: String,
    /// 参照エミュレータのトレースログ
    #[serde(default = "default_ext_path")]
    pub ext_path: String,
    #[serde(default = "default_own_encoding")]
    pub own_encoding: TextEncoding,
    #[serde(default = "default_ext_encoding")]
    pub ext_encoding: TextEncoding,
    /// パフォーマンスログ
    #[serde(default = "default_perf_path")]
    pub perf_path: String,
    #[serde(default = "default_own_encoding")]
    pub perf_encoding: TextEncoding,
    /// 外れ値フィルタの許容偏差（平均に対する割合）
    #[serde(default = "default_deviation")]
    pub deviation: f64,
    /// グラフウィンドウサイズ（幅）
    #[serde(default = "default_window_width")]
    pub window_width: usize,
    /// グラフウィンドウサイズ（高さ）
    #[serde(default = "default_window_height")]
    pub window_height: usize,
}

fn default_own_path() -> String { "../dev/log/out4.log".to_string() }
fn default_ext_path() -> String { "../dev/log/working2-safety-short.txt".to_string() }
fn default_perf_path() -> String { "../dev/log/perf-unbound2.log".to_string() }
fn default_own_encoding() -> TextEncoding { TextEncoding::Utf16Le }
fn default_ext_encoding() -> TextEncoding { TextEncoding::Utf8 }
fn default_deviation() -> f64 { 0.5 }
fn default_window_width() -> usize { 960 }
fn default_window_height() -> usize { 540 }

impl Default for Config {
    fn default() -> Self {
        Config {
            own_path: default_own_path(),
            ext_path: default_ext_path(),
            own_encoding: default_own_encoding(),
            ext_encoding: default_ext_encoding(),
            perf_path: default_perf_path(),
            perf_encoding: default_own_encoding(),
            deviation: default_deviation(),
            window_width: default_window_width(),
            window_height: default_window_height(),
        }
    }
}

impl Config {
    /// 設定ファイルを読み込む
    /// 優先順位:
    /// 1. config_path が指定されている場合はそれを使用
    /// 2. 実行ファイルディレクトリの gbtrace_config.json
    /// 3. どちらも無ければデフォルト値
    pub fn load_with_options(config_path: Option<&str>) -> (Self, PathBuf) {
        let config_file_path = match config_path {
            Some(path) => PathBuf::from(path),
            None => get_config_path(),
        };
        let config = Self::load_from(&config_file_path);
        (config, config_file_path)
    }

    /// 指定したパスから設定を読み込む
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(content) => Self::from_json(&content).unwrap_or_else(|e| {
                log::warn!("Failed to parse config {:?}: {}, using defaults", path.as_ref(), e);
                Config::default()
            }),
            Err(_) => Config::default(),
        }
    }

    /// JSON文字列から設定を構築（未指定の項目はデフォルト）
    pub fn from_json(content: &str) -> Result<Self, String> {
        let config: Config = serde_json::from_str(content)
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// 値の範囲チェック
    pub fn validate(&self) -> Result<(), String> {
        if !(self.deviation >= 0.0) {
            return Err(format!("deviation must be >= 0 (got {})", self.deviation));
        }
        if self.window_width == 0 || self.window_height == 0 {
            return Err(format!(
                "window size must be non-zero (got {}x{})",
                self.window_width, self.window_height
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_script_inputs() {
        let config = Config::default();
        assert_eq!(config.own_encoding, TextEncoding::Utf16Le);
        assert_eq!(config.ext_encoding, TextEncoding::Utf8);
        assert_eq!(config.perf_encoding, TextEncoding::Utf16Le);
        assert_eq!(config.deviation, 0.5);
        assert!(config.own_path.ends_with("out4.log"));
    }

    #[test]
    fn test_partial_json() {
        let config = Config::from_json(r#"{"own_path": "a.log", "ext_encoding": "utf-16le"}"#).unwrap();
        assert_eq!(config.own_path, "a.log");
        assert_eq!(config.ext_encoding, TextEncoding::Utf16Le);
        assert_eq!(config.deviation, 0.5);
    }

    #[test]
    fn test_negative_deviation_rejected() {
        assert!(Config::from_json(r#"{"deviation": -0.1}"#).is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load_from("/nonexistent/gbtrace_config.json");
        assert_eq!(config.deviation, 0.5);
    }

    #[test]
    fn test_encoding_from_str() {
        assert_eq!("UTF-16LE".parse::<TextEncoding>(), Ok(TextEncoding::Utf16Le));
        assert_eq!("utf8".parse::<TextEncoding>(), Ok(TextEncoding::Utf8));
        assert!("latin1".parse::<TextEncoding>().is_err());
    }
}
