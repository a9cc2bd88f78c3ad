//! 行スキーマ
//!
//! ログ1行から名前付きフィールドを取り出すための小さな宣言的パターン。
//! ビルダーで組み立てた断片を一度だけ `regex::Regex` にコンパイルし、
//! 全行に使い回す。

use regex::Regex;

/// 文字クラス
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// 任意の1文字（改行含む）
    Any,
    /// 16進数字（大文字・小文字）
    Hex,
    /// 16進数字（大文字のみ）
    UpperHex,
    /// ASCII英字
    Letter,
    /// 10進数字（ASCII）
    Digit,
    /// 空白文字（Unicode空白に加えて U+001C..U+001F の区切り文字）
    Space,
}

impl CharClass {
    fn pattern(self) -> &'static str {
        match self {
            CharClass::Any => r"(?s:.)",
            CharClass::Hex => r"[0-9a-fA-F]",
            CharClass::UpperHex => r"[0-9A-F]",
            CharClass::Letter => r"[a-zA-Z]",
            CharClass::Digit => r"[0-9]",
            CharClass::Space => r"[\s\x1C-\x1F]",
        }
    }
}

/// スキーマビルダー
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    pattern: String,
    names: Vec<&'static str>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 行頭でのみマッチ
    pub fn start_of_line(mut self) -> Self {
        self.pattern.insert(0, '^');
        self
    }

    fn class(mut self, class: CharClass, quantifier: &str) -> Self {
        self.pattern.push_str(class.pattern());
        self.pattern.push_str(quantifier);
        self
    }

    pub fn any(self) -> Self {
        self.class(CharClass::Any, "")
    }

    pub fn any_n(self, n: usize) -> Self {
        self.class(CharClass::Any, &format!("{{{}}}", n))
    }

    pub fn optional_any(self) -> Self {
        self.class(CharClass::Any, "?")
    }

    pub fn hex(self, n: usize) -> Self {
        self.class(CharClass::Hex, &format!("{{{}}}", n))
    }

    pub fn hex_run(self) -> Self {
        self.class(CharClass::Hex, "+")
    }

    pub fn upper_hex(self, n: usize) -> Self {
        self.class(CharClass::UpperHex, &format!("{{{}}}", n))
    }

    pub fn letters(self) -> Self {
        self.class(CharClass::Letter, "+")
    }

    pub fn digits(self) -> Self {
        self.class(CharClass::Digit, "+")
    }

    pub fn whitespace(self) -> Self {
        self.class(CharClass::Space, "")
    }

    pub fn literal(mut self, text: &str) -> Self {
        self.pattern.push_str(&regex::escape(text));
        self
    }

    /// 名前付きフィールド
    pub fn field<F>(mut self, name: &'static str, f: F) -> Self
    where
        F: FnOnce(SchemaBuilder) -> SchemaBuilder,
    {
        self.names.push(name);
        self.pattern.push_str(&format!("(?P<{}>", name));
        let mut inner = f(self);
        inner.pattern.push(')');
        inner
    }

    /// 省略可能な区間
    pub fn optional<F>(mut self, f: F) -> Self
    where
        F: FnOnce(SchemaBuilder) -> SchemaBuilder,
    {
        self.pattern.push_str("(?:");
        let mut inner = f(self);
        inner.pattern.push_str(")?");
        inner
    }

    pub fn build(self) -> Result<LineSchema, regex::Error> {
        let regex = Regex::new(&self.pattern)?;
        log::trace!("Compiled line schema: {}", self.pattern);
        Ok(LineSchema {
            regex,
            names: self.names,
        })
    }
}

/// コンパイル済みの行スキーマ
#[derive(Debug, Clone)]
pub struct LineSchema {
    regex: Regex,
    names: Vec<&'static str>,
}

/// 1回分のマッチ結果
#[derive(Debug)]
pub struct Captures<'a> {
    inner: regex::Captures<'a>,
}

impl<'a> Captures<'a> {
    /// フィールドの値を取得（省略区間で未マッチなら None）
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.inner.name(name).map(|m| m.as_str())
    }
}

impl LineSchema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn field_names(&self) -> &[&'static str] {
        &self.names
    }

    /// 行内の重ならない全マッチを左から順に返す
    pub fn find_iter<'s, 'a>(&'s self, line: &'a str) -> impl Iterator<Item = Captures<'a>> + 's
    where
        'a: 's,
    {
        self.regex.captures_iter(line).map(|inner| Captures { inner })
    }

    /// 最初のマッチのみ
    pub fn find<'a>(&self, line: &'a str) -> Option<Captures<'a>> {
        self.regex.captures(line).map(|inner| Captures { inner })
    }
}
