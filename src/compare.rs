//! トレース比較
//!
//! 2つの列を先頭から同じ位置同士で比較し、最初の不一致を報告する。
//! 短い方の長さで打ち切り、不一致後の再同期は行わない
//! （1命令の欠落でも以降はすべてずれる）。

use crate::trace::{TraceField, TraceFields, TraceLog};
use std::fmt;
use std::io::{self, Write};

/// レジスタ部が無い行の表示
pub const MISSING: &str = "----";

/// 最初の不一致
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence<T> {
    pub index: usize,
    pub own: T,
    pub ext: T,
}

impl<T: fmt::Display> fmt::Display for Divergence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} != {}", self.index, self.own, self.ext)
    }
}

/// 最初の不一致位置を探す
pub fn first_divergence<T: PartialEq + Clone>(own: &[T], ext: &[T]) -> Option<Divergence<T>> {
    own.iter()
        .zip(ext.iter())
        .position(|(a, b)| a != b)
        .map(|index| Divergence {
            index,
            own: own[index].clone(),
            ext: ext[index].clone(),
        })
}

/// 列を比較しながら各組を出力する
///
/// `echo` が true なら比較した組を `"{own} | {ext}"` で出力し、
/// 不一致では `"{index}: {own} != {ext}"` を出力して止まる。
pub fn compare_column<W: Write>(
    own: &[Option<&str>],
    ext: &[Option<&str>],
    out: &mut W,
    echo: bool,
) -> io::Result<Option<Divergence<String>>> {
    if own.len() != ext.len() {
        log::warn!(
            "Trace lengths differ (own={}, ext={}), comparing first {}",
            own.len(),
            ext.len(),
            own.len().min(ext.len())
        );
    }

    let divergence = first_divergence(own, ext);
    let shown = divergence.as_ref().map_or(own.len().min(ext.len()), |d| d.index + 1);
    if echo {
        for (a, b) in own.iter().zip(ext.iter()).take(shown) {
            writeln!(out, "{} | {}", a.unwrap_or(MISSING), b.unwrap_or(MISSING))?;
        }
    }

    let divergence = divergence.map(|d| Divergence {
        index: d.index,
        own: d.own.unwrap_or(MISSING).to_string(),
        ext: d.ext.unwrap_or(MISSING).to_string(),
    });
    if let Some(d) = &divergence {
        writeln!(out, "{}", d)?;
    }
    Ok(divergence)
}

/// フィールドごとの比較結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldReport {
    pub field: TraceField,
    pub compared: usize,
    pub divergence: Option<Divergence<String>>,
}

/// 選択されたフィールドをそれぞれ独立に比較
pub fn compare_fields<W: Write>(
    own: &TraceLog,
    ext: &TraceLog,
    fields: TraceFields,
    out: &mut W,
    echo: bool,
) -> io::Result<Vec<FieldReport>> {
    let selected = fields.fields();
    let with_header = selected.len() > 1;
    let mut reports = Vec::with_capacity(selected.len());

    for field in selected {
        if with_header {
            writeln!(out, "[{}]", field)?;
        }
        let own_col = own.column(field);
        let ext_col = ext.column(field);
        let divergence = compare_column(&own_col, &ext_col, out, echo)?;
        let compared = match &divergence {
            Some(d) => d.index + 1,
            None => own_col.len().min(ext_col.len()),
        };
        match &divergence {
            Some(d) => log::info!("{}: diverged at {}", field, d.index),
            None => log::info!("{}: {} entries match", field, compared),
        }
        reports.push(FieldReport { field, compared, divergence });
    }
    Ok(reports)
}
