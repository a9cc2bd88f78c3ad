//! トレースログ解析
//!
//! 自前エミュレータと参照エミュレータのトレース行から
//! アドレス・命令・レジスタ値を取り出す。

use crate::config::TextEncoding;
use crate::schema::{Captures, LineSchema, SchemaBuilder};
use crate::textlog::TextLog;
use std::fmt;
use std::io;
use std::path::Path;

bitflags::bitflags! {
    /// 比較対象フィールドの集合
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct TraceFields: u32 {
        const ADDRESS = 0b0000_0001;
        const EXEC    = 0b0000_0010;
        const BC      = 0b0000_0100;
        const DE      = 0b0000_1000;
        const HL      = 0b0001_0000;
        const AF      = 0b0010_0000;
        const SP      = 0b0100_0000;
        const PC      = 0b1000_0000;
    }
}

/// トレースの1フィールド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceField {
    Address,
    Exec,
    BC,
    DE,
    HL,
    AF,
    SP,
    PC,
}

impl TraceField {
    /// 比較順
    pub fn all() -> &'static [TraceField] {
        &[
            TraceField::Address,
            TraceField::Exec,
            TraceField::BC,
            TraceField::DE,
            TraceField::HL,
            TraceField::AF,
            TraceField::SP,
            TraceField::PC,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            TraceField::Address => "address",
            TraceField::Exec => "exec",
            TraceField::BC => "BC",
            TraceField::DE => "DE",
            TraceField::HL => "HL",
            TraceField::AF => "AF",
            TraceField::SP => "SP",
            TraceField::PC => "PC",
        }
    }

    pub fn flag(&self) -> TraceFields {
        match self {
            TraceField::Address => TraceFields::ADDRESS,
            TraceField::Exec => TraceFields::EXEC,
            TraceField::BC => TraceFields::BC,
            TraceField::DE => TraceFields::DE,
            TraceField::HL => TraceFields::HL,
            TraceField::AF => TraceFields::AF,
            TraceField::SP => TraceFields::SP,
            TraceField::PC => TraceFields::PC,
        }
    }

    /// 名前から取得（大文字小文字を区別しない）
    pub fn from_name(name: &str) -> Option<TraceField> {
        TraceField::all()
            .iter()
            .copied()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for TraceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TraceFields {
    /// 選択されたフィールドを比較順に列挙
    pub fn fields(&self) -> Vec<TraceField> {
        TraceField::all()
            .iter()
            .copied()
            .filter(|f| self.contains(f.flag()))
            .collect()
    }
}

/// レジスタ値（ログ上の4桁16進文字列のまま保持）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers {
    pub bc: String,
    pub de: String,
    pub hl: String,
    pub af: String,
    pub sp: String,
    pub pc: String,
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BC={} DE={} HL={} AF={} SP={} PC={}",
            self.bc, self.de, self.hl, self.af, self.sp, self.pc
        )
    }
}

/// トレース1命令分
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub address: String,
    /// オペコード（自前: 16進, 参照: ニーモニック）
    pub exec: String,
    pub registers: Option<Registers>,
}

impl TraceRecord {
    /// フィールド値を取得（レジスタ部が無い行は None）
    pub fn field(&self, field: TraceField) -> Option<&str> {
        let regs = self.registers.as_ref();
        match field {
            TraceField::Address => Some(&self.address),
            TraceField::Exec => Some(&self.exec),
            TraceField::BC => regs.map(|r| r.bc.as_str()),
            TraceField::DE => regs.map(|r| r.de.as_str()),
            TraceField::HL => regs.map(|r| r.hl.as_str()),
            TraceField::AF => regs.map(|r| r.af.as_str()),
            TraceField::SP => regs.map(|r| r.sp.as_str()),
            TraceField::PC => regs.map(|r| r.pc.as_str()),
        }
    }

    fn from_captures(caps: &Captures<'_>) -> Option<TraceRecord> {
        let address = caps.get("address")?.to_string();
        let exec = caps.get("exec")?.to_string();
        let registers = match (
            caps.get("BC"),
            caps.get("DE"),
            caps.get("HL"),
            caps.get("AF"),
            caps.get("SP"),
            caps.get("PC"),
        ) {
            (Some(bc), Some(de), Some(hl), Some(af), Some(sp), Some(pc)) => Some(Registers {
                bc: bc.to_string(),
                de: de.to_string(),
                hl: hl.to_string(),
                af: af.to_string(),
                sp: sp.to_string(),
                pc: pc.to_string(),
            }),
            _ => None,
        };
        Some(TraceRecord { address, exec, registers })
    }
}

/// トレースの出所
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceSource {
    /// 自前エミュレータ
    Own,
    /// 参照エミュレータ
    External,
}

impl TraceSource {
    pub fn name(&self) -> &'static str {
        match self {
            TraceSource::Own => "own",
            TraceSource::External => "ext",
        }
    }
}

/// ` BC=XXXX DE=XXXX HL=XXXX AF=XXXX SP=XXXX PC=XXXX`
fn register_suffix(b: SchemaBuilder) -> SchemaBuilder {
    b.optional(|b| {
        b.literal(" BC=")
            .field("BC", |b| b.upper_hex(4))
            .literal(" DE=")
            .field("DE", |b| b.upper_hex(4))
            .literal(" HL=")
            .field("HL", |b| b.upper_hex(4))
            .literal(" AF=")
            .field("AF", |b| b.upper_hex(4))
            .literal(" SP=")
            .field("SP", |b| b.upper_hex(4))
            .literal(" PC=")
            .field("PC", |b| b.upper_hex(4))
    })
}

/// トレース行パーサ
pub struct TraceParser {
    source: TraceSource,
    schema: LineSchema,
}

impl TraceParser {
    pub fn new(source: TraceSource) -> io::Result<Self> {
        let schema = match source {
            // 行頭の1文字は省略可能（BOMや区切り記号）
            TraceSource::Own => LineSchema::builder()
                .start_of_line()
                .optional_any()
                .field("address", |b| b.hex(4))
                .any()
                .field("exec", |b| b.hex_run()),
            // 先頭6文字は固定幅の列
            TraceSource::External => LineSchema::builder()
                .start_of_line()
                .any_n(6)
                .field("address", |b| b.hex(4))
                .whitespace()
                .field("exec", |b| b.letters()),
        };
        let schema = register_suffix(schema).build().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} trace schema: {}", source.name(), e),
            )
        })?;
        Ok(TraceParser { source, schema })
    }

    /// 1行を解析（マッチしない行は空）
    pub fn parse_line(&self, line: &str) -> Vec<TraceRecord> {
        self.schema
            .find_iter(line)
            .filter_map(|caps| TraceRecord::from_captures(&caps))
            .collect()
    }

    pub fn parse_lines<'a, I>(&self, lines: I) -> TraceLog
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut records = Vec::new();
        let mut skipped = 0usize;
        for line in lines {
            let parsed = self.parse_line(line);
            if parsed.is_empty() {
                skipped += 1;
            }
            records.extend(parsed);
        }
        log::debug!("[{}] {} records, {} lines skipped", self.source.name(), records.len(), skipped);
        TraceLog { records }
    }

    /// ファイルから読み込み
    pub fn load<P: AsRef<Path>>(&self, path: P, encoding: TextEncoding) -> io::Result<TraceLog> {
        let text = TextLog::open(path, encoding)?;
        let log = self.parse_lines(text.lines());
        log::info!("[{}] parsed {} trace records", self.source.name(), log.len());
        Ok(log)
    }
}

/// 解析済みトレース（ファイル順）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceLog {
    pub records: Vec<TraceRecord>,
}

impl TraceLog {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 1フィールド分の列
    pub fn column(&self, field: TraceField) -> Vec<Option<&str>> {
        self.records.iter().map(|r| r.field(field)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGS: &str = " BC=0013 DE=00D8 HL=014D AF=01B0 SP=FFFE PC=0100";

    #[test]
    fn test_own_line() {
        let parser = TraceParser::new(TraceSource::Own).unwrap();
        let recs = parser.parse_line("0100 00");
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].address, "0100");
        assert_eq!(recs[0].exec, "00");
        assert_eq!(recs[0].registers, None);
    }

    #[test]
    fn test_own_line_with_registers() {
        let parser = TraceParser::new(TraceSource::Own).unwrap();
        let line = format!("\u{FEFF}0100:C3{}", REGS);
        let recs = parser.parse_line(&line);
        assert_eq!(recs.len(), 1);
        let regs = recs[0].registers.as_ref().unwrap();
        assert_eq!(recs[0].address, "0100");
        assert_eq!(recs[0].exec, "C3");
        assert_eq!(regs.bc, "0013");
        assert_eq!(regs.af, "01B0");
        assert_eq!(regs.pc, "0100");
        assert_eq!(regs.to_string(), REGS.trim_start());
        for field in TraceField::all() {
            assert_eq!(recs[0].field(*field).unwrap().len(), match field {
                TraceField::Exec => 2,
                _ => 4,
            });
        }
    }

    #[test]
    fn test_lowercase_registers_not_captured() {
        let parser = TraceParser::new(TraceSource::Own).unwrap();
        let recs = parser.parse_line("0100 00 BC=00ab DE=00D8 HL=014D AF=01B0 SP=FFFE PC=0100");
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].registers, None);
    }

    #[test]
    fn test_ext_line() {
        let parser = TraceParser::new(TraceSource::External).unwrap();
        let recs = parser.parse_line("00:00 0100 nop");
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].address, "0100");
        assert_eq!(recs[0].exec, "nop");

        let line = format!("ROM0: 0150 jp{}", REGS);
        let recs = parser.parse_line(&line);
        assert_eq!(recs[0].exec, "jp");
        assert_eq!(recs[0].registers.as_ref().unwrap().sp, "FFFE");
    }

    #[test]
    fn test_ext_separator_control_is_whitespace() {
        // U+001C..U+001F も空白として扱う
        let parser = TraceParser::new(TraceSource::External).unwrap();
        let line = format!("30C=Zoc77c\u{1C}jp{}", REGS);
        let recs = parser.parse_line(&line);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].address, "c77c");
        assert_eq!(recs[0].exec, "jp");
        assert_eq!(recs[0].registers.as_ref().unwrap().hl, "014D");
    }

    #[test]
    fn test_non_matching_lines_skipped() {
        let parser = TraceParser::new(TraceSource::External).unwrap();
        assert!(parser.parse_line("short").is_empty());
        assert!(parser.parse_line("").is_empty());
        // 6文字目の後に16進4桁が無い
        assert!(parser.parse_line("xxxxxxzz00 nop").is_empty());

        let log = parser.parse_lines(vec!["header line", "00:00 0100 nop", "00:00 0101 jp"]);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_column_missing_registers() {
        let parser = TraceParser::new(TraceSource::Own).unwrap();
        let second = format!("0101 C3{}", REGS);
        let log = parser.parse_lines(vec!["0100 00", second.as_str()]);
        assert_eq!(log.column(TraceField::Address), vec![Some("0100"), Some("0101")]);
        assert_eq!(log.column(TraceField::HL), vec![None, Some("014D")]);
    }

    #[test]
    fn test_field_selection() {
        let fields = (TraceFields::PC | TraceFields::ADDRESS).fields();
        assert_eq!(fields, vec![TraceField::Address, TraceField::PC]);
        assert_eq!(TraceFields::all().fields().len(), 8);
        assert_eq!(TraceField::from_name("hl"), Some(TraceField::HL));
        assert_eq!(TraceField::from_name("Address"), Some(TraceField::Address));
        assert_eq!(TraceField::from_name("ix"), None);
    }
}
