//! gbtrace - GB-rs emulator analysis tools
//!
//! 開発用の解析ツール群:
//! - トレース比較（自前エミュレータ vs 参照エミュレータ）
//! - パフォーマンスログの集計とグラフ表示

pub mod config;
pub mod textlog;
pub mod schema;
pub mod trace;
pub mod compare;
pub mod perf;
pub mod stats;
pub mod font;
pub mod plot;
pub mod tools;
