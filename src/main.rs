//! gbtrace - GB-rs emulator analysis tools
//!
//! # 使用方法
//! ```text
//! gbtrace diff --own out4.log --ext working2-safety-short.txt
//! gbtrace diff --all-fields --quiet
//! gbtrace plot --input perf-unbound2.log
//! ```

use gbtrace::config::{Config, TextEncoding};
use gbtrace::trace::{TraceField, TraceFields};
use gbtrace::tools;
use clap::{Parser, Subcommand};
use std::io;

/// gbtrace - trace diff and performance plot tools
#[derive(Parser, Debug)]
#[command(name = "gbtrace")]
#[command(author = "GB-rs Project")]
#[command(version = "0.1.0")]
#[command(about = "Trace diff and performance plot tools for GB-rs", long_about = None)]
struct Args {
    /// 設定ファイル（JSON）
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 2つのトレースログを比較して最初の不一致を表示
    Diff {
        /// 自前エミュレータのトレースログ
        #[arg(long)]
        own: Option<String>,

        /// 参照エミュレータのトレースログ
        #[arg(long)]
        ext: Option<String>,

        /// 自前ログのエンコーディング (utf-16le, utf-8)
        #[arg(long)]
        own_encoding: Option<TextEncoding>,

        /// 参照ログのエンコーディング (utf-16le, utf-8)
        #[arg(long)]
        ext_encoding: Option<TextEncoding>,

        /// 比較するフィールド: address, exec, BC, DE, HL, AF, SP, PC
        /// 複数指定可（未指定なら address）
        #[arg(short, long = "field")]
        fields: Vec<String>,

        /// 全フィールドを比較
        #[arg(long)]
        all_fields: bool,

        /// 一致した行を出力しない
        #[arg(short, long)]
        quiet: bool,
    },

    /// パフォーマンスログを集計してグラフを表示
    Plot {
        /// パフォーマンスログ
        #[arg(short, long)]
        input: Option<String>,

        /// ログのエンコーディング (utf-16le, utf-8)
        #[arg(long)]
        encoding: Option<TextEncoding>,

        /// 外れ値フィルタの許容偏差（平均に対する割合）
        #[arg(short, long)]
        deviation: Option<f64>,

        /// ウィンドウを開かずに集計のみ
        #[arg(long)]
        no_window: bool,
    },
}

/// フィールド指定を解析
fn parse_fields(names: &[String], all: bool) -> Result<TraceFields, String> {
    if all {
        return Ok(TraceFields::all());
    }
    if names.is_empty() {
        return Ok(TraceFields::ADDRESS);
    }
    let mut fields = TraceFields::empty();
    for name in names.iter().flat_map(|n| n.split(',')) {
        match TraceField::from_name(name.trim()) {
            Some(field) => fields |= field.flag(),
            None => return Err(format!("Unknown trace field: {}", name)),
        }
    }
    Ok(fields)
}

fn run(args: Args) -> Result<(), String> {
    let (mut config, config_path) = Config::load_with_options(args.config.as_deref());
    log::debug!("Config: {:?}", config_path);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.command {
        Command::Diff { own, ext, own_encoding, ext_encoding, fields, all_fields, quiet } => {
            if let Some(path) = own {
                config.own_path = path;
            }
            if let Some(path) = ext {
                config.ext_path = path;
            }
            if let Some(enc) = own_encoding {
                config.own_encoding = enc;
            }
            if let Some(enc) = ext_encoding {
                config.ext_encoding = enc;
            }
            let fields = parse_fields(&fields, all_fields)?;
            let reports = tools::run_trace_diff(&config, fields, !quiet, &mut out)
                .map_err(|e| format!("Trace diff failed: {}", e))?;
            let diverged = reports.iter().filter(|r| r.divergence.is_some()).count();
            log::info!("{} of {} fields diverged", diverged, reports.len());
        }
        Command::Plot { input, encoding, deviation, no_window } => {
            if let Some(path) = input {
                config.perf_path = path;
            }
            if let Some(enc) = encoding {
                config.perf_encoding = enc;
            }
            if let Some(dev) = deviation {
                config.deviation = dev;
            }
            config.validate()?;
            tools::run_perf_plot(&config, !no_window, &mut out)
                .map_err(|e| format!("Perf plot failed: {}", e))?;
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        log::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fields_default() {
        assert_eq!(parse_fields(&[], false), Ok(TraceFields::ADDRESS));
        assert_eq!(parse_fields(&[], true), Ok(TraceFields::all()));
    }

    #[test]
    fn test_parse_fields_list() {
        let names = vec!["pc".to_string(), "address,SP".to_string()];
        assert_eq!(
            parse_fields(&names, false),
            Ok(TraceFields::PC | TraceFields::ADDRESS | TraceFields::SP)
        );
        assert!(parse_fields(&["IX".to_string()], false).is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let args = Args::try_parse_from([
            "gbtrace", "diff", "--own", "a.log", "--own-encoding", "utf-8", "-f", "HL", "-q",
        ])
        .unwrap();
        match args.command {
            Command::Diff { own, own_encoding, fields, quiet, .. } => {
                assert_eq!(own.as_deref(), Some("a.log"));
                assert_eq!(own_encoding, Some(TextEncoding::Utf8));
                assert_eq!(fields, vec!["HL".to_string()]);
                assert!(quiet);
            }
            _ => panic!("expected diff"),
        }
    }

    #[test]
    fn test_cli_plot() {
        let args = Args::try_parse_from(["gbtrace", "--config", "c.json", "plot", "-d", "0.25", "--no-window"]).unwrap();
        assert_eq!(args.config.as_deref(), Some("c.json"));
        match args.command {
            Command::Plot { deviation, no_window, .. } => {
                assert_eq!(deviation, Some(0.25));
                assert!(no_window);
            }
            _ => panic!("expected plot"),
        }
    }
}
