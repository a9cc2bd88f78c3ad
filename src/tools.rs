//! 各ツールのエントリーポイント
//!
//! 設定を受け取り、読み込みから出力までを実行する。

use crate::compare::{compare_fields, FieldReport};
use crate::config::Config;
use crate::perf::PerfParser;
use crate::plot::{self, StackedChart};
use crate::stats::{FilteredSeries, FrameTimings, PerfSummary};
use crate::trace::{TraceFields, TraceParser, TraceSource};
use std::io::{self, Write};

/// トレース比較
pub fn run_trace_diff<W: Write>(
    config: &Config,
    fields: TraceFields,
    echo: bool,
    out: &mut W,
) -> io::Result<Vec<FieldReport>> {
    let own = TraceParser::new(TraceSource::Own)?.load(&config.own_path, config.own_encoding)?;
    let ext = TraceParser::new(TraceSource::External)?.load(&config.ext_path, config.ext_encoding)?;
    compare_fields(&own, &ext, fields, out, echo)
}

/// パフォーマンスログの集計とグラフ表示
pub fn run_perf_plot<W: Write>(config: &Config, open_window: bool, out: &mut W) -> io::Result<PerfSummary> {
    let series = PerfParser::new()?.load(&config.perf_path, config.perf_encoding)?;

    let filtered = FilteredSeries::from_series(&series, config.deviation);
    let timings = FrameTimings::from_totals(&filtered.total);
    let summary = PerfSummary::new(&series, &filtered, &timings, config.deviation);
    write!(out, "{}", summary.report())?;
    out.flush()?;

    if open_window {
        let chart = StackedChart::emulation_share(&series.em_perc);
        let title = format!("gbtrace - {}", config.perf_path);
        plot::show(&chart, &title, config.window_width, config.window_height)?;
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TextEncoding;
    use std::fs;
    use std::path::PathBuf;

    fn temp_file(name: &str, bytes: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gbtrace-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    fn utf16le(s: &str) -> Vec<u8> {
        "\u{FEFF}".encode_utf16().chain(s.encode_utf16()).flat_map(|u| u.to_le_bytes()).collect()
    }

    #[test]
    fn test_trace_diff_end_to_end() {
        let own = temp_file("own.log", &utf16le("0001 00\r\n0002 C3\r\n0003 00\r\n0005 00\r\n"));
        let ext = temp_file(
            "ext.txt",
            b"00:00 0001 nop\n00:00 0002 jp\n00:00 0004 nop\n00:00 0006 nop\n",
        );
        let config = Config {
            own_path: own.to_string_lossy().into_owned(),
            ext_path: ext.to_string_lossy().into_owned(),
            ..Config::default()
        };
        let mut out = Vec::new();
        let reports = run_trace_diff(&config, TraceFields::ADDRESS, true, &mut out).unwrap();
        assert_eq!(reports.len(), 1);
        let d = reports[0].divergence.as_ref().unwrap();
        assert_eq!((d.index, d.own.as_str(), d.ext.as_str()), (2, "0003", "0004"));
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "0001 | 0001\n0002 | 0002\n0003 | 0004\n2: 0003 != 0004\n"
        );
    }

    #[test]
    fn test_trace_diff_missing_file() {
        let config = Config {
            own_path: "/nonexistent/own.log".to_string(),
            ..Config::default()
        };
        let mut out = Vec::new();
        assert!(run_trace_diff(&config, TraceFields::ADDRESS, true, &mut out).is_err());
    }

    #[test]
    fn test_perf_plot_headless() {
        let log = "15000000 (0.90) | 1666666 (0.10) | 16666666\n\
                   Frame 250\n\
                   15000000 (0.90) | 1666666 (0.10) | 16666666\n\
                   14000000 (0.84) | 2666666 (0.16) | 16666666\n\
                   15000000 (0.90) | 1666666 (0.10) | 16666666\n\
                   38000000 (0.95) | 2000000 (0.05) | 40000000\n";
        let path = temp_file("perf.log", &utf16le(log));
        let config = Config {
            perf_path: path.to_string_lossy().into_owned(),
            perf_encoding: TextEncoding::Utf16Le,
            ..Config::default()
        };
        let mut out = Vec::new();
        let summary = run_perf_plot(&config, false, &mut out).unwrap();
        assert_eq!(summary.samples, 5);
        // 40ms のフレームは外れ値として除外
        assert_eq!(summary.filtered_totals, 4);
        assert!(String::from_utf8(out).unwrap().contains("Performance Summary"));
    }
}
