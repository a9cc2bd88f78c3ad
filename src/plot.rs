//! グラフ描画
//!
//! 積み上げ面グラフをフレームバッファに描き、minifbウィンドウで表示する。

use crate::font::{draw_text, text_width, GLYPH_HEIGHT};
use minifb::{Key, Window, WindowOptions};
use std::io;

/// 色定義
const COLOR_BG: u32 = 0xFFFFFF;
const COLOR_AXIS: u32 = 0x333333;
const COLOR_GRID: u32 = 0xE0E0E0;
const COLOR_TEXT: u32 = 0x222222;
/// レイヤー色（matplotlib の既定色順）
pub const LAYER_COLORS: [u32; 4] = [0x1F77B4, 0xFF7F0E, 0x2CA02C, 0xD62728];

/// 余白
const MARGIN_LEFT: usize = 72;
const MARGIN_RIGHT: usize = 24;
const MARGIN_TOP: usize = 40;
const MARGIN_BOTTOM: usize = 40;
const TEXT_SCALE: usize = 2;

/// 1レイヤー分の系列
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub label: String,
    pub values: Vec<f64>,
    pub color: u32,
}

/// 積み上げ面グラフ
#[derive(Debug, Clone, PartialEq)]
pub struct StackedChart {
    pub title: String,
    pub layers: Vec<Layer>,
}

impl StackedChart {
    pub fn new(title: &str) -> Self {
        StackedChart {
            title: title.to_string(),
            layers: Vec::new(),
        }
    }

    pub fn layer(mut self, label: &str, values: Vec<f64>) -> Self {
        let color = LAYER_COLORS[self.layers.len() % LAYER_COLORS.len()];
        self.layers.push(Layer {
            label: label.to_string(),
            values,
            color,
        });
        self
    }

    /// フレームごとのエミュレーション割合とその残り
    ///
    /// フィルタ前の em_perc 全体を使う。
    pub fn emulation_share(em_perc: &[f64]) -> Self {
        StackedChart::new("emulation share per frame")
            .layer("em_perc", em_perc.to_vec())
            .layer("1 - em_perc", em_perc.iter().map(|p| 1.0 - p).collect())
    }

    /// x方向の点数（最初のレイヤーの長さ）
    pub fn len(&self) -> usize {
        self.layers.first().map_or(0, |l| l.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 積み上げ後の境界（[0] は基準線 0, [i+1] はレイヤー i の上端）
    pub fn boundaries(&self) -> Vec<Vec<f64>> {
        let n = self.len();
        let mut result = vec![vec![0.0; n]];
        for layer in &self.layers {
            let prev = &result[result.len() - 1];
            let next = (0..n)
                .map(|i| prev[i] + layer.values.get(i).copied().unwrap_or(0.0))
                .collect();
            result.push(next);
        }
        result
    }

    /// y軸の範囲（常に0を含む）
    pub fn y_range(&self) -> (f64, f64) {
        let (lo, hi) = self
            .boundaries()
            .iter()
            .flatten()
            .filter(|v| v.is_finite())
            .fold((0.0f64, 0.0f64), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if hi - lo < f64::EPSILON {
            (lo, lo + 1.0)
        } else {
            (lo, hi)
        }
    }

    /// フレームバッファに描画
    pub fn render(&self, buffer: &mut [u32], width: usize, height: usize) {
        buffer.fill(COLOR_BG);
        if width <= MARGIN_LEFT + MARGIN_RIGHT + 1 || height <= MARGIN_TOP + MARGIN_BOTTOM + 1 {
            return;
        }

        let plot_w = width - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_h = height - MARGIN_TOP - MARGIN_BOTTOM;
        let (y_min, y_max) = self.y_range();
        let to_py = |v: f64| -> f64 {
            let t = (v - y_min) / (y_max - y_min);
            MARGIN_TOP as f64 + (1.0 - t) * (plot_h - 1) as f64
        };

        // 目盛り線
        for tick in 0..=4 {
            let v = y_min + (y_max - y_min) * tick as f64 / 4.0;
            let py = to_py(v).round() as usize;
            for px in MARGIN_LEFT..MARGIN_LEFT + plot_w {
                buffer[py * width + px] = COLOR_GRID;
            }
            let label = format!("{:.2}", v);
            let lx = MARGIN_LEFT.saturating_sub(text_width(&label, TEXT_SCALE) + 6);
            let ly = py.saturating_sub(GLYPH_HEIGHT * TEXT_SCALE / 2);
            draw_text(buffer, width, lx, ly, &label, COLOR_TEXT, TEXT_SCALE);
        }

        // 面の塗りつぶし
        let n = self.len();
        if n > 0 {
            let bounds = self.boundaries();
            for col in 0..plot_w {
                let x = if n == 1 {
                    0.0
                } else {
                    col as f64 * (n - 1) as f64 / (plot_w - 1).max(1) as f64
                };
                let i0 = (x.floor() as usize).min(n - 1);
                let i1 = (i0 + 1).min(n - 1);
                let frac = x - i0 as f64;
                let at = |b: &[f64]| b[i0] + (b[i1] - b[i0]) * frac;

                for (layer, pair) in self.layers.iter().zip(bounds.windows(2)) {
                    let a = to_py(at(pair[0].as_slice()));
                    let b = to_py(at(pair[1].as_slice()));
                    if !a.is_finite() || !b.is_finite() {
                        continue;
                    }
                    let top = a.min(b).round().max(MARGIN_TOP as f64) as usize;
                    let bottom = a.max(b).round().min((MARGIN_TOP + plot_h - 1) as f64) as usize;
                    for py in top..=bottom {
                        buffer[py * width + MARGIN_LEFT + col] = layer.color;
                    }
                }
            }
        }

        // 軸
        let axis_y = MARGIN_TOP + plot_h;
        for px in MARGIN_LEFT..MARGIN_LEFT + plot_w {
            buffer[axis_y * width + px] = COLOR_AXIS;
        }
        for py in MARGIN_TOP..=axis_y {
            buffer[py * width + MARGIN_LEFT - 1] = COLOR_AXIS;
        }

        // x軸ラベル（最初と最後のインデックス）
        let label_y = axis_y + 8;
        draw_text(buffer, width, MARGIN_LEFT, label_y, "0", COLOR_TEXT, TEXT_SCALE);
        if n > 1 {
            let last = format!("{}", n - 1);
            let lx = (MARGIN_LEFT + plot_w).saturating_sub(text_width(&last, TEXT_SCALE));
            draw_text(buffer, width, lx, label_y, &last, COLOR_TEXT, TEXT_SCALE);
        }

        // タイトルと凡例
        draw_text(buffer, width, MARGIN_LEFT, 12, &self.title, COLOR_TEXT, TEXT_SCALE);
        let mut lx = width - MARGIN_RIGHT;
        for layer in self.layers.iter().rev() {
            let w = text_width(&layer.label, TEXT_SCALE);
            lx = lx.saturating_sub(w);
            draw_text(buffer, width, lx, 12, &layer.label, COLOR_TEXT, TEXT_SCALE);
            lx = lx.saturating_sub(16);
            for dy in 0..10 {
                for dx in 0..10 {
                    buffer[(12 + dy) * width + lx + dx] = layer.color;
                }
            }
            lx = lx.saturating_sub(16);
        }
    }
}

/// ウィンドウを開いてグラフを表示（閉じるかESCで戻る）
pub fn show(chart: &StackedChart, title: &str, width: usize, height: usize) -> io::Result<()> {
    let mut buffer = vec![0u32; width * height];
    chart.render(&mut buffer, width, height);

    let mut window = Window::new(title, width, height, WindowOptions::default())
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("Failed to create window: {}", e)))?;
    window.set_target_fps(30);
    log::info!("Chart window opened ({}x{}), close or press ESC to exit", width, height);

    while window.is_open() && !window.is_key_down(Key::Escape) {
        window
            .update_with_buffer(&buffer, width, height)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("Failed to update window: {}", e)))?;
    }
    Ok(())
}
