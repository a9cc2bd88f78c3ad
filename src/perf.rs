//! パフォーマンスログ解析
//!
//! 1フレームごとの `<em> (<em_perc>) | <draw> (<draw_perc>) | <total>` 行を読み込む。
//! em: エミュレーション時間, draw: 描画時間, total: フレーム全体（ナノ秒）

use crate::config::TextEncoding;
use crate::schema::{Captures, LineSchema, SchemaBuilder};
use crate::textlog::TextLog;
use std::io;
use std::path::Path;
use std::str::FromStr;

/// 1フレーム分のサンプル
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerfSample {
    pub em: u64,
    pub em_perc: f64,
    pub draw: u64,
    pub draw_perc: f64,
    pub total: u64,
}

/// フィールドごとの系列（全系列同じ長さ）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerfSeries {
    pub em: Vec<u64>,
    pub em_perc: Vec<f64>,
    pub draw: Vec<u64>,
    pub draw_perc: Vec<f64>,
    pub total: Vec<u64>,
}

impl PerfSeries {
    pub fn push(&mut self, sample: PerfSample) {
        self.em.push(sample.em);
        self.em_perc.push(sample.em_perc);
        self.draw.push(sample.draw);
        self.draw_perc.push(sample.draw_perc);
        self.total.push(sample.total);
    }

    pub fn len(&self) -> usize {
        self.total.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total.is_empty()
    }
}

fn field<T: FromStr>(caps: &Captures<'_>, name: &str) -> io::Result<T> {
    let text = caps.get(name).unwrap_or_default();
    text.parse().map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} out of range: {}", name, text),
        )
    })
}

fn sample(caps: &Captures<'_>) -> io::Result<PerfSample> {
    Ok(PerfSample {
        em: field(caps, "em")?,
        em_perc: field(caps, "em_perc")?,
        draw: field(caps, "draw")?,
        draw_perc: field(caps, "draw_perc")?,
        total: field(caps, "total")?,
    })
}

/// パフォーマンスログのパーサ
pub struct PerfParser {
    schema: LineSchema,
}

impl PerfParser {
    pub fn new() -> io::Result<Self> {
        let float = |b: SchemaBuilder| b.digits().literal(".").digits();
        let schema = LineSchema::builder()
            .field("em", |b| b.digits())
            .whitespace()
            .literal("(")
            .field("em_perc", float)
            .literal(")")
            .whitespace()
            .literal("|")
            .whitespace()
            .field("draw", |b| b.digits())
            .whitespace()
            .literal("(")
            .field("draw_perc", float)
            .literal(")")
            .whitespace()
            .literal("|")
            .whitespace()
            .field("total", |b| b.digits())
            .build()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("perf schema: {}", e)))?;
        Ok(PerfParser { schema })
    }

    /// 1行を解析（1行に複数あればすべて返す）
    ///
    /// u64 に収まらない値を含むサンプルは要素が `Err` になる。
    pub fn parse_line(&self, line: &str) -> Vec<io::Result<PerfSample>> {
        self.schema.find_iter(line).map(|caps| sample(&caps)).collect()
    }

    /// 全行を解析（範囲外の値を含むサンプルは警告して読み飛ばす）
    pub fn parse_lines<'a, I>(&self, lines: I) -> PerfSeries
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut series = PerfSeries::default();
        let mut skipped = 0usize;
        let mut out_of_range = 0usize;
        for (number, line) in lines.into_iter().enumerate() {
            let samples = self.parse_line(line);
            if samples.is_empty() {
                skipped += 1;
            }
            for sample in samples {
                match sample {
                    Ok(sample) => series.push(sample),
                    Err(e) => {
                        log::warn!("[perf] line {}: {}, sample skipped", number + 1, e);
                        out_of_range += 1;
                    }
                }
            }
        }
        log::debug!("[perf] {} samples, {} lines skipped", series.len(), skipped);
        if out_of_range > 0 {
            log::warn!("[perf] {} samples skipped (value out of range)", out_of_range);
        }
        series
    }

    pub fn load<P: AsRef<Path>>(&self, path: P, encoding: TextEncoding) -> io::Result<PerfSeries> {
        let text = TextLog::open(path, encoding)?;
        let series = self.parse_lines(text.lines());
        log::info!("[perf] parsed {} samples", series.len());
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> PerfParser {
        PerfParser::new().unwrap()
    }

    #[test]
    fn test_parse_sample() {
        let samples = parser().parse_line("5 (12.50) | 3 (7.25) | 1000000");
        assert_eq!(samples.len(), 1);
        assert_eq!(
            samples[0].as_ref().unwrap(),
            &PerfSample {
                em: 5,
                em_perc: 12.5,
                draw: 3,
                draw_perc: 7.25,
                total: 1000000,
            }
        );
    }

    #[test]
    fn test_parse_multiple_per_line() {
        let line = "1 (0.5) | 1 (0.5) | 2 ## 3 (0.75) | 1 (0.25) | 4";
        let samples = parser().parse_line(line);
        assert_eq!(samples.len(), 2);
        let second = samples[1].as_ref().unwrap();
        assert_eq!(second.em, 3);
        assert_eq!(second.total, 4);
    }

    #[test]
    fn test_integer_percentage_not_matched() {
        // 小数点の無い割合は対象外
        let parser = parser();
        assert!(parser.parse_line("5 (1) | 3 (0.25) | 100").is_empty());
        assert!(parser.parse_line("Frame 250").is_empty());
    }

    #[test]
    fn test_out_of_range_sample_reported() {
        let line = "99999999999999999999999 (0.5) | 1 (0.5) | 2";
        let samples = parser().parse_line(line);
        assert_eq!(samples.len(), 1);
        let err = samples[0].as_ref().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_out_of_range_sample_skipped() {
        let series = parser().parse_lines(vec![
            "15000000 (0.9) | 1666666 (0.1) | 16666666",
            "1 (0.5) | 1 (0.5) | 99999999999999999999999 ## 3 (0.75) | 1 (0.25) | 4",
            "14000000 (0.84) | 2666666 (0.16) | 16666666",
        ]);
        // 同じ行の正常なサンプルは残る
        assert_eq!(series.len(), 3);
        assert_eq!(series.total, vec![16666666, 4, 16666666]);
        assert_eq!(series.em_perc, vec![0.9, 0.75, 0.84]);
    }

    #[test]
    fn test_series_aligned() {
        let series = parser().parse_lines(vec![
            "15000000 (0.9) | 1666666 (0.1) | 16666666",
            "Frame 250",
            "14000000 (0.84) | 2666666 (0.16) | 16666666",
        ]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.em, vec![15000000, 14000000]);
        assert_eq!(series.em_perc, vec![0.9, 0.84]);
        assert_eq!(series.draw_perc.len(), 2);
    }
}
