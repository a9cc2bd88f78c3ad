//! テキストログ読み込み
//!
//! ファイル全体を読み込んでデコードし、行に分割する。
//! BOMは除去しない（パターン側では通常の1文字として扱われる）。

use crate::config::TextEncoding;
use std::fs;
use std::io;
use std::path::Path;

/// バイト列を指定エンコーディングで文字列にデコード
pub fn decode(bytes: &[u8], encoding: TextEncoding) -> io::Result<String> {
    match encoding {
        TextEncoding::Utf8 => String::from_utf8(bytes.to_vec())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("invalid utf-8: {}", e))),
        TextEncoding::Utf16Le => {
            if bytes.len() % 2 != 0 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("truncated utf-16le data ({} bytes)", bytes.len()),
                ));
            }
            let units = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
            char::decode_utf16(units)
                .collect::<Result<String, _>>()
                .map_err(|e| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("invalid utf-16le: unpaired surrogate {:#06X}", e.unpaired_surrogate()),
                    )
                })
        }
    }
}

/// 改行で分割（\n, \r\n, \r のいずれも行末として扱う）
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let bytes = text.as_bytes();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(&text[start..i]);
                i += 1;
                start = i;
            }
            b'\r' => {
                lines.push(&text[start..i]);
                i += 1;
                if i < bytes.len() && bytes[i] == b'\n' {
                    i += 1;
                }
                start = i;
            }
            _ => i += 1,
        }
    }
    if start < bytes.len() {
        lines.push(&text[start..]);
    }
    lines
}

/// デコード済みのログファイル
pub struct TextLog {
    text: String,
}

impl TextLog {
    /// ファイルを読み込んでデコード
    pub fn open<P: AsRef<Path>>(path: P, encoding: TextEncoding) -> io::Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .map_err(|e| io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))?;
        let text = decode(&bytes, encoding)
            .map_err(|e| io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))?;
        log::info!("Loaded {} ({}, {} bytes)", path.display(), encoding, bytes.len());
        Ok(TextLog { text })
    }

    pub fn lines(&self) -> Vec<&str> {
        split_lines(&self.text)
    }
}
