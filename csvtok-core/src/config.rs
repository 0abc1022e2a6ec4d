use log::debug;

#[cfg(feature = "serde")]
use serde::Deserialize;

use crate::charset::Charset;
use crate::error::ConfigError;
use crate::matcher::TokenSet;

/// The quoting style to use when encoding records.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum QuoteStyle {
    /// This puts quotes around every field. Always.
    Always,
    /// This puts quotes around fields only when necessary.
    ///
    /// They are necessary when a field contains one of the configured quote
    /// triggers, or when a record consists of a single empty field.
    ///
    /// This is the default.
    Necessary,
    /// This *never* writes quotes, even when quote tokens are configured.
    Never,
}

impl Default for QuoteStyle {
    fn default() -> QuoteStyle {
        QuoteStyle::Necessary
    }
}

/// A named, compile time configuration.
///
/// Presets are plain constants. Turn one into a `Config` with
/// `Config::from_preset` or start a builder from it with
/// `ConfigBuilder::from_preset`.
#[derive(Clone, Copy, Debug)]
pub struct Preset {
    /// Field separators.
    pub sep: &'static [&'static str],
    /// Line separators. The first one is written by the encoder.
    pub linesep: &'static [&'static str],
    /// Quote tokens. Empty disables quoting.
    pub quote: &'static [&'static str],
    /// Escape tokens. Empty disables escaping.
    pub esc: &'static [&'static str],
    /// An explicit set of tokens that must be escaped, if any.
    pub to_esc: Option<&'static [&'static str]>,
}

const CRLF_FAMILY: &[&str] = &["\r\n", "\n", "\r"];

/// Comma separated values with backslash escapes and no quoting.
///
/// This is also the default configuration.
pub const CSV: Preset = Preset {
    sep: &[","],
    linesep: CRLF_FAMILY,
    quote: &[],
    esc: &["\\"],
    to_esc: None,
};

/// Comma separated values with double quotes and backslash escapes.
pub const CSV_QUOTED: Preset = Preset {
    sep: &[","],
    linesep: CRLF_FAMILY,
    quote: &["\""],
    esc: &["\\"],
    to_esc: None,
};

/// Tab separated values with backslash escapes and no quoting.
pub const TSV: Preset = Preset {
    sep: &["\t"],
    linesep: CRLF_FAMILY,
    quote: &[],
    esc: &["\\"],
    to_esc: None,
};

/// RFC 4180 style CSV, where a quote inside a quoted field is written by
/// doubling it.
pub const RFC4180: Preset = Preset {
    sep: &[","],
    linesep: CRLF_FAMILY,
    quote: &["\""],
    esc: &["\""],
    to_esc: Some(&["\""]),
};

/// A resolved, immutable configuration shared by the tokenizer and the
/// encoder.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    field_separators: TokenSet,
    line_separators: TokenSet,
    quotes: TokenSet,
    escapes: TokenSet,
    escaped: TokenSet,
    quote_triggers: TokenSet,
    fields: Option<Vec<String>>,
    charset: Charset,
    emit_empty_rows: bool,
    quote_style: QuoteStyle,
    strict_quotes: bool,
}

impl Default for Config {
    fn default() -> Config {
        ConfigBuilder::new().assemble()
    }
}

impl Config {
    /// Resolve the given preset.
    pub fn from_preset(preset: &Preset) -> Config {
        ConfigBuilder::from_preset(preset).assemble()
    }

    /// The field separator candidates, in declaration order.
    pub fn field_separators(&self) -> &TokenSet {
        &self.field_separators
    }

    /// The line separator candidates, in declaration order.
    pub fn line_separators(&self) -> &TokenSet {
        &self.line_separators
    }

    /// The quote tokens. When empty, quoting is disabled.
    pub fn quotes(&self) -> &TokenSet {
        &self.quotes
    }

    /// The escape prefix tokens. When empty, escaping is disabled.
    pub fn escapes(&self) -> &TokenSet {
        &self.escapes
    }

    /// The tokens that appear escaped in the stream.
    pub fn escaped(&self) -> &TokenSet {
        &self.escaped
    }

    /// The tokens whose presence forces a field to be quoted when encoding.
    pub fn quote_triggers(&self) -> &TokenSet {
        &self.quote_triggers
    }

    /// The configured field names, if any.
    pub fn fields(&self) -> Option<&[String]> {
        self.fields.as_ref().map(|f| &**f)
    }

    /// The character encoding.
    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// Whether blank lines produce empty records.
    pub fn emit_empty_rows(&self) -> bool {
        self.emit_empty_rows
    }

    /// The quoting style used by the encoder.
    pub fn quote_style(&self) -> QuoteStyle {
        self.quote_style
    }

    /// Whether text following a closing quote is rejected.
    pub fn strict_quotes(&self) -> bool {
        self.strict_quotes
    }

    /// Whether quoting is enabled at all.
    pub fn is_quoting(&self) -> bool {
        !self.quotes.is_empty()
    }

    /// Whether escaping is enabled at all.
    pub fn is_escaping(&self) -> bool {
        !self.escapes.is_empty()
    }
}

/// Conversion into a sequence of tokens.
///
/// This lets every token option accept either a single token or a list of
/// them. A single empty string is treated as an empty list.
pub trait IntoTokens {
    /// Convert this value into an ordered list of tokens.
    fn into_tokens(self) -> Vec<String>;
}

impl<'a> IntoTokens for &'a str {
    fn into_tokens(self) -> Vec<String> {
        if self.is_empty() {
            vec![]
        } else {
            vec![self.to_string()]
        }
    }
}

impl<'a> IntoTokens for &'a String {
    fn into_tokens(self) -> Vec<String> {
        self.as_str().into_tokens()
    }
}

impl IntoTokens for String {
    fn into_tokens(self) -> Vec<String> {
        self.as_str().into_tokens()
    }
}

impl IntoTokens for char {
    fn into_tokens(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl<'a, 'b> IntoTokens for &'a [&'b str] {
    fn into_tokens(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

impl<'a> IntoTokens for &'a [String] {
    fn into_tokens(self) -> Vec<String> {
        self.to_vec()
    }
}

impl<'a, const N: usize> IntoTokens for [&'a str; N] {
    fn into_tokens(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

impl<'a> IntoTokens for Vec<&'a str> {
    fn into_tokens(self) -> Vec<String> {
        self.into_iter().map(String::from).collect()
    }
}

impl IntoTokens for Vec<String> {
    fn into_tokens(self) -> Vec<String> {
        self
    }
}

/// Builds a `Config` with various configuration knobs.
///
/// Options that are never set fall back to the `CSV` preset. Once a
/// `Config` is built, it cannot be changed.
#[derive(Clone, Debug, Default)]
pub struct ConfigBuilder {
    sep: Option<Vec<String>>,
    linesep: Option<Vec<String>>,
    quote: Option<Vec<String>>,
    esc: Option<Vec<String>>,
    to_esc: Option<Vec<String>>,
    to_quote: Option<Vec<String>>,
    fields: Option<Vec<String>>,
    charset: Option<String>,
    emit_empty_rows: bool,
    quote_style: QuoteStyle,
    strict_quotes: bool,
}

fn strings(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|s| s.to_string()).collect()
}

impl ConfigBuilder {
    /// Create a new builder.
    pub fn new() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Create a builder initialized from a preset.
    pub fn from_preset(preset: &Preset) -> ConfigBuilder {
        ConfigBuilder {
            sep: Some(strings(preset.sep)),
            linesep: Some(strings(preset.linesep)),
            quote: Some(strings(preset.quote)),
            esc: Some(strings(preset.esc)),
            to_esc: preset.to_esc.map(strings),
            ..ConfigBuilder::default()
        }
    }

    /// Build a `Config` from this builder.
    ///
    /// This fails if either the field separator set or the line separator
    /// set is empty, if any token is the empty string or if the character
    /// encoding is not recognized.
    pub fn build(&self) -> Result<Config, ConfigError> {
        let config = self.assemble();
        if config.field_separators.is_empty() {
            return Err(ConfigError::MissingFieldSeparator);
        }
        if config.line_separators.is_empty() {
            return Err(ConfigError::MissingLineSeparator);
        }
        let sets = [
            ("sep", &config.field_separators),
            ("linesep", &config.line_separators),
            ("quote", &config.quotes),
            ("esc", &config.escapes),
            ("toEsc", &config.escaped),
            ("toQuote", &config.quote_triggers),
        ];
        for &(option, set) in &sets {
            if set.has_empty() {
                return Err(ConfigError::EmptyToken { option });
            }
        }
        let config = match self.charset {
            None => config,
            Some(ref name) => Config { charset: name.parse()?, ..config },
        };
        debug!(
            "resolved config: {} field separator(s), {} line separator(s), \
             {} quote(s), {} escape(s), escaped {:?}, quote triggers {:?}",
            config.field_separators.len(),
            config.line_separators.len(),
            config.quotes.len(),
            config.escapes.len(),
            config.escaped,
            config.quote_triggers,
        );
        Ok(config)
    }

    /// Resolve the token sets without validating them.
    fn assemble(&self) -> Config {
        let or_default = |opt: &Option<Vec<String>>, default: &[&str]| {
            TokenSet::new(opt.clone().unwrap_or_else(|| strings(default)))
        };
        let field_separators = or_default(&self.sep, CSV.sep);
        let line_separators = or_default(&self.linesep, CSV.linesep);
        let quotes = or_default(&self.quote, CSV.quote);
        let escapes = or_default(&self.esc, CSV.esc);
        let escaped = match self.to_esc {
            Some(ref toks) => TokenSet::new(toks.clone()),
            None => TokenSet::union(vec![
                &quotes,
                &field_separators,
                &line_separators,
                &escapes,
            ]),
        };
        let quote_triggers = match self.to_quote {
            Some(ref toks) => TokenSet::new(toks.clone()),
            None => TokenSet::union(vec![
                &field_separators,
                &line_separators,
                &quotes,
            ]),
        };
        Config {
            field_separators,
            line_separators,
            quotes,
            escapes,
            escaped,
            quote_triggers,
            fields: self.fields.clone(),
            charset: Charset::default(),
            emit_empty_rows: self.emit_empty_rows,
            quote_style: self.quote_style,
            strict_quotes: self.strict_quotes,
        }
    }

    /// The field separator(s).
    ///
    /// The default is `,`.
    pub fn sep<T: IntoTokens>(&mut self, tokens: T) -> &mut ConfigBuilder {
        self.sep = Some(tokens.into_tokens());
        self
    }

    /// The line separator(s).
    ///
    /// The default is `\r\n`, `\n` and `\r`, each recognized as one line
    /// separator. The first declared token is the one written when encoding.
    pub fn linesep<T: IntoTokens>(&mut self, tokens: T) -> &mut ConfigBuilder {
        self.linesep = Some(tokens.into_tokens());
        self
    }

    /// The quote token(s).
    ///
    /// A quoted field must be closed by the same token that opened it. By
    /// default, quoting is disabled.
    pub fn quote<T: IntoTokens>(&mut self, tokens: T) -> &mut ConfigBuilder {
        self.quote = Some(tokens.into_tokens());
        self
    }

    /// The escape token(s).
    ///
    /// The default is `\`. An empty list disables escaping.
    pub fn esc<T: IntoTokens>(&mut self, tokens: T) -> &mut ConfigBuilder {
        self.esc = Some(tokens.into_tokens());
        self
    }

    /// The tokens that must appear escaped.
    ///
    /// When not set, this is the union of the quote, field separator, line
    /// separator and escape tokens.
    pub fn to_esc<T: IntoTokens>(&mut self, tokens: T) -> &mut ConfigBuilder {
        self.to_esc = Some(tokens.into_tokens());
        self
    }

    /// The tokens that force a field to be quoted when encoding.
    ///
    /// When not set, this is the union of the field separator, line
    /// separator and quote tokens.
    pub fn to_quote<T: IntoTokens>(
        &mut self,
        tokens: T,
    ) -> &mut ConfigBuilder {
        self.to_quote = Some(tokens.into_tokens());
        self
    }

    /// Field names. When set, parsed rows become named records and named
    /// records can be encoded.
    pub fn fields<I, S>(&mut self, names: I) -> &mut ConfigBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// The character encoding, by name.
    ///
    /// The default is `utf-8`.
    pub fn chars_encoding(&mut self, name: &str) -> &mut ConfigBuilder {
        self.charset = Some(name.to_string());
        self
    }

    /// The character encoding.
    pub fn charset(&mut self, charset: Charset) -> &mut ConfigBuilder {
        self.charset = Some(charset.name().to_string());
        self
    }

    /// Whether a blank line produces an empty record.
    ///
    /// This is disabled by default, which means blank lines are skipped.
    pub fn emit_empty_rows(&mut self, yes: bool) -> &mut ConfigBuilder {
        self.emit_empty_rows = yes;
        self
    }

    /// The quoting style to use when encoding.
    pub fn quote_style(&mut self, style: QuoteStyle) -> &mut ConfigBuilder {
        self.quote_style = style;
        self
    }

    /// When enabled, only a separator may follow a closing quote.
    ///
    /// This is disabled by default, in which case anything after a closing
    /// quote is appended to the field.
    pub fn strict_quotes(&mut self, yes: bool) -> &mut ConfigBuilder {
        self.strict_quotes = yes;
        self
    }
}

/// A single token or a list of tokens, as found in loosely typed options.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum OneOrMany {
    /// A bare token.
    One(String),
    /// An ordered list of tokens.
    Many(Vec<String>),
}

impl IntoTokens for OneOrMany {
    fn into_tokens(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => s.into_tokens(),
            OneOrMany::Many(v) => v,
        }
    }
}

/// Loosely typed options, using the conventional option names.
///
/// Every option is optional. `Options::resolve` validates them into a
/// `Config`.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct Options {
    /// Field separators (`sep`).
    pub sep: Option<OneOrMany>,
    /// Line separators (`linesep`).
    pub linesep: Option<OneOrMany>,
    /// Quote tokens (`quote`, or `quotes`).
    #[cfg_attr(feature = "serde", serde(alias = "quotes"))]
    pub quote: Option<OneOrMany>,
    /// Escape prefixes (`esc`).
    pub esc: Option<OneOrMany>,
    /// Tokens escaped when encoding (`toEsc`, or `escapedCharacters`).
    #[cfg_attr(feature = "serde", serde(alias = "escapedCharacters"))]
    pub to_esc: Option<OneOrMany>,
    /// Tokens that force quoting (`toQuote`, or `quoteTriggers`).
    #[cfg_attr(feature = "serde", serde(alias = "quoteTriggers"))]
    pub to_quote: Option<OneOrMany>,
    /// Field names for map records (`fields`).
    pub fields: Option<Vec<String>>,
    /// Character encoding name (`charsEncoding`).
    pub chars_encoding: Option<String>,
    /// Emit blank lines as empty records (`emitEmptyRows`).
    pub emit_empty_rows: Option<bool>,
    /// Quoting style when encoding (`quoteStyle`).
    pub quote_style: Option<QuoteStyle>,
    /// Reject text after a closing quote (`strictQuotes`).
    pub strict_quotes: Option<bool>,
}

impl Options {
    /// Convert these options into a builder.
    pub fn builder(&self) -> ConfigBuilder {
        let mut b = ConfigBuilder::new();
        b.sep = self.sep.clone().map(IntoTokens::into_tokens);
        b.linesep = self.linesep.clone().map(IntoTokens::into_tokens);
        b.quote = self.quote.clone().map(IntoTokens::into_tokens);
        b.esc = self.esc.clone().map(IntoTokens::into_tokens);
        b.to_esc = self.to_esc.clone().map(IntoTokens::into_tokens);
        b.to_quote = self.to_quote.clone().map(IntoTokens::into_tokens);
        b.fields = self.fields.clone();
        b.charset = self.chars_encoding.clone();
        b.emit_empty_rows = self.emit_empty_rows.unwrap_or(false);
        b.quote_style = self.quote_style.unwrap_or_default();
        b.strict_quotes = self.strict_quotes.unwrap_or(false);
        b
    }

    /// Validate these options into a `Config`.
    pub fn resolve(&self) -> Result<Config, ConfigError> {
        self.builder().build()
    }
}
