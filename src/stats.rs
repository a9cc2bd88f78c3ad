//! 統計処理
//!
//! 外れ値フィルタとフレーム時間の集計

use crate::perf::PerfSeries;

/// 平均計算に使う数値
pub trait Sample: Copy {
    fn as_f64(self) -> f64;
}

impl Sample for u64 {
    #[inline]
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Sample for f64 {
    #[inline]
    fn as_f64(self) -> f64 {
        self
    }
}

/// 算術平均（空なら None）
pub fn mean<T: Sample>(values: &[T]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().map(|v| v.as_f64()).sum::<f64>() / values.len() as f64)
    }
}

/// 平均から `dev` の割合以内にある値だけを残す（順序は維持）
///
/// 範囲は `[mean*(1-dev), mean*(1+dev)]`。空の入力は空を返す。
/// 系列ごとに自分の平均で判定するので、フィルタ後の系列同士は
/// インデックスが揃わない。
pub fn filter_deviance<T: Sample>(values: &[T], dev: f64) -> Vec<T> {
    let Some(avg) = mean(values) else {
        return Vec::new();
    };
    let min = avg * (1.0 - dev);
    let max = avg * (1.0 + dev);
    values
        .iter()
        .copied()
        .filter(|v| {
            let v = v.as_f64();
            v >= min && v <= max
        })
        .collect()
}

/// フィルタ後の各系列
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredSeries {
    pub em: Vec<u64>,
    pub em_perc: Vec<f64>,
    pub draw: Vec<u64>,
    pub draw_perc: Vec<f64>,
    pub total: Vec<u64>,
}

impl FilteredSeries {
    pub fn from_series(series: &PerfSeries, dev: f64) -> Self {
        FilteredSeries {
            em: filter_deviance(&series.em, dev),
            em_perc: filter_deviance(&series.em_perc, dev),
            draw: filter_deviance(&series.draw, dev),
            draw_perc: filter_deviance(&series.draw_perc, dev),
            total: filter_deviance(&series.total, dev),
        }
    }
}

/// フレーム時間から導出した値
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameTimings {
    pub total_ms: Vec<f64>,
    pub total_s: Vec<f64>,
    /// total が 0 のフレームは無限大
    pub fps: Vec<f64>,
}

impl FrameTimings {
    pub fn from_totals(total: &[u64]) -> Self {
        let total_ms: Vec<f64> = total.iter().map(|&n| n as f64 / 1_000_000.0).collect();
        let total_s = total.iter().map(|&n| n as f64 / 1_000_000_000.0).collect();
        let fps = total_ms.iter().map(|&ms| 1000.0 / ms).collect();
        FrameTimings { total_ms, total_s, fps }
    }
}

/// 集計結果
#[derive(Debug, Clone, PartialEq)]
pub struct PerfSummary {
    pub samples: usize,
    pub filtered_totals: usize,
    pub deviation: f64,
    pub mean_frame_ms: Option<f64>,
    pub mean_fps: Option<f64>,
    pub mean_em_perc: Option<f64>,
    pub mean_draw_perc: Option<f64>,
}

impl PerfSummary {
    pub fn new(series: &PerfSeries, filtered: &FilteredSeries, timings: &FrameTimings, deviation: f64) -> Self {
        PerfSummary {
            samples: series.len(),
            filtered_totals: filtered.total.len(),
            deviation,
            mean_frame_ms: mean(&timings.total_ms),
            mean_fps: mean(&timings.fps),
            mean_em_perc: mean(&filtered.em_perc),
            mean_draw_perc: mean(&filtered.draw_perc),
        }
    }

    /// レポート文字列
    pub fn report(&self) -> String {
        fn opt(v: Option<f64>, suffix: &str) -> String {
            v.map_or_else(|| "n/a".to_string(), |v| format!("{:.3}{}", v, suffix))
        }

        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let mut report = String::new();
        report.push_str(&format!("=== Performance Summary ({}) ===\n", timestamp));
        report.push_str(&format!(
            "Samples:      {} ({} within +/-{:.0}%)\n",
            self.samples,
            self.filtered_totals,
            self.deviation * 100.0
        ));
        report.push_str(&format!("Frame time:   {}\n", opt(self.mean_frame_ms, " ms")));
        report.push_str(&format!("FPS:          {}\n", opt(self.mean_fps, "")));
        report.push_str(&format!("Emulation:    {}\n", opt(self.mean_em_perc.map(|p| p * 100.0), " %")));
        report.push_str(&format!("Draw:         {}\n", opt(self.mean_draw_perc.map(|p| p * 100.0), " %")));
        report
    }
}
