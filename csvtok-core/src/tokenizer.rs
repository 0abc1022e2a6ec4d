use std::collections::VecDeque;
use std::mem;

use log::{debug, trace};

use crate::config::Config;
use crate::error::ParseError;
use crate::matcher::Probe;
use crate::record::{Assembler, Record};

/// The primary mode of the tokenizer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Mode {
    /// Accumulating unquoted field content.
    Field,
    /// Inside a quoted field that was opened by the quote token at this
    /// index. Only the same token closes it.
    Quoted(usize),
    /// A quoted field was closed and the field has not ended yet.
    Closed,
}

/// What to do with the characters at the front of the pending window.
enum Action {
    /// Not enough input to decide.
    Wait,
    /// Open a quoted field with the given quote token.
    OpenQuote { index: usize, len: usize },
    /// Close the current quoted field.
    CloseQuote { len: usize },
    /// Append the escaped token at `index` to the field.
    Escaped { index: usize, len: usize },
    /// End the current line.
    LineSep { len: usize },
    /// End the current field.
    FieldSep { len: usize },
    /// Append the first pending character to the field.
    Literal,
}

/// An incremental tokenizer for delimited text.
///
/// The tokenizer is fed characters in chunks of any size and calls back
/// with every record that completes. Chunk boundaries may fall anywhere,
/// including in the middle of a multi-character token: characters that
/// could still be part of a token are held in a small window until they can
/// be resolved, so the records produced never depend on how the input was
/// split.
///
/// At each position the rules are tried in a fixed order:
///
/// 1. A quote token, only at the very start of a field.
/// 2. An escape token followed by an escaped token.
/// 3. Inside a quoted field, the token that opened it. Nothing else is
///    recognized inside a quoted field.
/// 4. A line separator.
/// 5. A field separator.
/// 6. Any other character is literal field content.
///
/// When a rule fails part way through a token, none of the characters it
/// looked at are consumed and the next rule is tried at the same position.
///
/// Parse errors are terminal: once an error is returned, every subsequent
/// call returns the same error until `reset` is called.
#[derive(Clone, Debug)]
pub struct Tokenizer {
    config: Config,
    assembler: Assembler,
    mode: Mode,
    /// Characters received but not yet consumed.
    pending: VecDeque<char>,
    field: String,
    row: Vec<String>,
    /// Whether any character has been consumed for the current field.
    field_started: bool,
    /// Whether any character has been consumed on the current line.
    line_started: bool,
    line: u64,
    column: u64,
    /// Line and column of the quote that opened the current quoted field.
    quote_at: (u64, u64),
    failed: Option<ParseError>,
}

impl Tokenizer {
    /// Create a tokenizer with the given configuration.
    pub fn new(config: Config) -> Tokenizer {
        let assembler = Assembler::new(config.fields().map(|f| f.to_vec()));
        let window = config.escapes().max_len()
            + config.escaped().max_len()
            + config.line_separators().max_len();
        Tokenizer {
            config,
            assembler,
            mode: Mode::Field,
            pending: VecDeque::with_capacity(window + 1),
            field: String::new(),
            row: vec![],
            field_started: false,
            line_started: false,
            line: 1,
            column: 0,
            quote_at: (1, 0),
            failed: None,
        }
    }

    /// The configuration used by this tokenizer.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The current line number, starting at `1`.
    ///
    /// Lines are counted by line separators outside of quoted fields.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// The number of characters consumed on the current line.
    pub fn column(&self) -> u64 {
        self.column
    }

    /// Returns true if the tokenizer is inside a quoted field.
    pub fn is_quoted(&self) -> bool {
        match self.mode {
            Mode::Quoted(_) => true,
            Mode::Field | Mode::Closed => false,
        }
    }

    /// Reset the tokenizer such that it behaves as if it had never been
    /// used. This also clears a previous parse error.
    pub fn reset(&mut self) {
        self.mode = Mode::Field;
        self.pending.clear();
        self.field.clear();
        self.row.clear();
        self.field_started = false;
        self.line_started = false;
        self.line = 1;
        self.column = 0;
        self.quote_at = (1, 0);
        self.failed = None;
    }

    /// Feed a chunk of text, calling `emit` for every completed record.
    pub fn feed<F>(&mut self, chunk: &str, emit: F) -> Result<(), ParseError>
    where
        F: FnMut(Record),
    {
        self.feed_chars(chunk.chars(), emit)
    }

    /// Feed a chunk of characters, calling `emit` for every completed record.
    pub fn feed_chars<I, F>(
        &mut self,
        chars: I,
        mut emit: F,
    ) -> Result<(), ParseError>
    where
        I: IntoIterator<Item = char>,
        F: FnMut(Record),
    {
        if let Some(ref err) = self.failed {
            return Err(err.clone());
        }
        let mut count = 0u64;
        for ch in chars {
            count += 1;
            self.pending.push_back(ch);
            self.run(false, &mut emit)?;
        }
        trace!("fed {} character(s), {} pending", count, self.pending.len());
        Ok(())
    }

    /// Signal the end of input.
    ///
    /// Pending characters are resolved and a trailing record without a line
    /// separator is emitted. If the input ended inside a quoted field, this
    /// returns `ParseError::UnclosedQuotedField` instead.
    pub fn finish<F>(&mut self, mut emit: F) -> Result<(), ParseError>
    where
        F: FnMut(Record),
    {
        if let Some(ref err) = self.failed {
            return Err(err.clone());
        }
        self.run(true, &mut emit)?;
        if let Mode::Quoted(index) = self.mode {
            let (line, column) = self.quote_at;
            let quote =
                self.config.quotes().get(index).unwrap_or("").to_string();
            return Err(self.fail(ParseError::UnclosedQuotedField {
                line,
                column,
                quote,
            }));
        }
        if self.line_started {
            self.end_line(false, &mut emit);
        }
        debug!("end of input at line {}", self.line);
        Ok(())
    }

    fn fail(&mut self, err: ParseError) -> ParseError {
        debug!("parse error: {}", err);
        self.failed = Some(err.clone());
        err
    }

    /// Consume pending characters until the window is empty or more input
    /// is needed.
    fn run<F>(&mut self, eof: bool, emit: &mut F) -> Result<(), ParseError>
    where
        F: FnMut(Record),
    {
        while !self.pending.is_empty() {
            let action = match self.next_action(eof) {
                Ok(action) => action,
                Err(err) => return Err(self.fail(err)),
            };
            match action {
                Action::Wait => return Ok(()),
                Action::OpenQuote { index, len } => {
                    self.quote_at = (self.line, self.column);
                    self.mode = Mode::Quoted(index);
                    self.advance(len);
                }
                Action::CloseQuote { len } => {
                    self.mode = Mode::Closed;
                    self.advance(len);
                }
                Action::Escaped { index, len } => {
                    let tok = self.config.escaped().get(index).unwrap_or("");
                    self.field.push_str(tok);
                    self.advance(len);
                }
                Action::LineSep { len } => {
                    let blank = !self.line_started;
                    self.advance(len);
                    self.end_line(blank, emit);
                }
                Action::FieldSep { len } => {
                    self.advance(len);
                    self.end_field();
                }
                Action::Literal => {
                    if let Some(ch) = self.pending.front() {
                        self.field.push(*ch);
                    }
                    self.advance(1);
                }
            }
        }
        Ok(())
    }

    fn next_action(&self, eof: bool) -> Result<Action, ParseError> {
        let cfg = &self.config;
        let window = &self.pending;

        if let Mode::Quoted(index) = self.mode {
            match self.probe_escape(eof) {
                Probe::Match { index, len } => {
                    return Ok(Action::Escaped { index, len })
                }
                Probe::Incomplete => return Ok(Action::Wait),
                Probe::NoMatch => {}
            }
            return Ok(match cfg.quotes().probe_token(index, window, 0, eof) {
                Probe::Match { len, .. } => Action::CloseQuote { len },
                Probe::Incomplete => Action::Wait,
                Probe::NoMatch => Action::Literal,
            });
        }

        if self.mode == Mode::Field && !self.field_started && cfg.is_quoting()
        {
            match cfg.quotes().probe(window, 0, eof) {
                Probe::Match { index, len } => {
                    return Ok(Action::OpenQuote { index, len })
                }
                Probe::Incomplete => return Ok(Action::Wait),
                Probe::NoMatch => {}
            }
        }

        let strict = self.mode == Mode::Closed && cfg.strict_quotes();
        if !strict {
            match self.probe_escape(eof) {
                Probe::Match { index, len } => {
                    return Ok(Action::Escaped { index, len })
                }
                Probe::Incomplete => return Ok(Action::Wait),
                Probe::NoMatch => {}
            }
        }

        match cfg.line_separators().probe(window, 0, eof) {
            Probe::Match { len, .. } => return Ok(Action::LineSep { len }),
            Probe::Incomplete => return Ok(Action::Wait),
            Probe::NoMatch => {}
        }

        match cfg.field_separators().probe(window, 0, eof) {
            Probe::Match { len, .. } => return Ok(Action::FieldSep { len }),
            Probe::Incomplete => return Ok(Action::Wait),
            Probe::NoMatch => {}
        }

        if strict {
            if let Some(&found) = window.front() {
                return Err(ParseError::UnexpectedCharacter {
                    line: self.line,
                    column: self.column,
                    found,
                });
            }
        }
        Ok(Action::Literal)
    }

    /// Probe for an escape token followed by an escaped token.
    ///
    /// On a match, `index` refers to the escaped token and `len` spans both
    /// tokens.
    fn probe_escape(&self, eof: bool) -> Probe {
        let cfg = &self.config;
        if !cfg.is_escaping() {
            return Probe::NoMatch;
        }
        let prefix = match cfg.escapes().probe(&self.pending, 0, eof) {
            Probe::Match { len, .. } => len,
            other => return other,
        };
        match cfg.escaped().probe(&self.pending, prefix, eof) {
            Probe::Match { index, len } => {
                Probe::Match { index, len: prefix + len }
            }
            other => other,
        }
    }

    fn advance(&mut self, n: usize) {
        let n = n.min(self.pending.len());
        self.pending.drain(..n);
        self.column += n as u64;
        self.field_started = true;
        self.line_started = true;
    }

    fn end_field(&mut self) {
        let field = mem::replace(&mut self.field, String::new());
        self.row.push(field);
        self.field_started = false;
        self.mode = Mode::Field;
    }

    fn end_line<F>(&mut self, blank: bool, emit: &mut F)
    where
        F: FnMut(Record),
    {
        if blank {
            if self.config.emit_empty_rows() {
                trace!("line {}: empty record", self.line);
                emit(self.assembler.assemble(vec![]));
            }
        } else {
            self.end_field();
            let row = mem::replace(&mut self.row, vec![]);
            trace!("line {}: record with {} field(s)", self.line, row.len());
            emit(self.assembler.assemble(row));
        }
        self.line += 1;
        self.column = 0;
        self.field_started = false;
        self.line_started = false;
        self.mode = Mode::Field;
    }
}

#[cfg(test)]
mod tests {
    use super::Tokenizer;
    use crate::config::{Config, ConfigBuilder, CSV, CSV_QUOTED, RFC4180, TSV};
    use crate::error::ParseError;
    use crate::record::Record;

    type Csv = Vec<Vec<String>>;

    macro_rules! csv {
        ($([$($field:expr),*]),*) => {{
            #[allow(unused_mut)]
            fn x() -> Csv {
                let mut csv = Csv::new();
                $(
                    #[allow(unused_mut)]
                    let mut row: Vec<String> = Vec::new();
                    $(
                        row.push($field.to_string());
                    )*
                    csv.push(row);
                )*
                csv
            }
            x()
        }}
    }

    fn parse_chunks(config: &Config, chunks: &[&str]) -> Csv {
        let mut tok = Tokenizer::new(config.clone());
        let mut csv = Csv::new();
        for chunk in chunks {
            tok.feed(chunk, |r| csv.push(r.into_list())).unwrap();
        }
        tok.finish(|r| csv.push(r.into_list())).unwrap();
        csv
    }

    fn parse_one_by_one(config: &Config, data: &str) -> Csv {
        let chunks: Vec<String> = data.chars().map(String::from).collect();
        let chunks: Vec<&str> = chunks.iter().map(|s| &**s).collect();
        parse_chunks(config, &chunks)
    }

    fn parse_err(config: Config, data: &str) -> ParseError {
        let mut tok = Tokenizer::new(config);
        let res = tok.feed(data, |_| {}).and_then(|_| tok.finish(|_| {}));
        res.unwrap_err()
    }

    macro_rules! parses_to {
        ($name:ident, $data:expr, $expected:expr) => {
            parses_to!($name, $data, $expected, |builder| builder);
        };
        ($name:ident, $data:expr, $expected:expr, $config:expr) => {
            #[test]
            fn $name() {
                let mut builder = ConfigBuilder::new();
                $config(&mut builder);
                let config = builder.build().unwrap();
                let expected = $expected;

                let got = parse_chunks(&config, &[$data]);
                assert_eq!(expected, got, "single chunk");

                let got = parse_one_by_one(&config, $data);
                assert_eq!(expected, got, "one character at a time");
            }
        };
    }

    fn preset(p: &crate::config::Preset) -> impl Fn(&mut ConfigBuilder) + '_ {
        move |b: &mut ConfigBuilder| *b = ConfigBuilder::from_preset(p)
    }

    parses_to!(one_row_one_field, "a", csv![["a"]]);
    parses_to!(one_row_many_fields, "a,b,c", csv![["a", "b", "c"]]);
    parses_to!(one_row_trailing_comma, "a,b,", csv![["a", "b", ""]]);
    parses_to!(one_row_one_field_lf, "a\n", csv![["a"]]);
    parses_to!(one_row_many_fields_crlf, "a,b,c\r\n", csv![["a", "b", "c"]]);
    parses_to!(one_row_trailing_comma_cr, "a,b,\r", csv![["a", "b", ""]]);
    parses_to!(
        many_rows_crlf,
        "1,test1,another test1\r\n2,test2,another test2\r\n",
        csv![["1", "test1", "another test1"], ["2", "test2", "another test2"]]
    );
    parses_to!(
        many_rows_mixed_terminators,
        "a,b\rx,y\nm,n\r\n",
        csv![["a", "b"], ["x", "y"], ["m", "n"]]
    );
    parses_to!(
        empty_first_column,
        ",test1,another test1\r\n",
        csv![["", "test1", "another test1"]]
    );
    parses_to!(empty, "", csv![]);
    parses_to!(empty_lines, "\n\n\r\n\r", csv![]);
    parses_to!(
        empty_lines_interspersed,
        "\n\na,b\n\n\nx,y\n\n",
        csv![["a", "b"], ["x", "y"]]
    );
    parses_to!(
        empty_rows_emitted,
        "a\n\nb\n",
        csv![["a"], [], ["b"]],
        |b: &mut ConfigBuilder| {
            b.emit_empty_rows(true);
        }
    );
    parses_to!(lone_separator_line, ",\n", csv![["", ""]]);

    parses_to!(
        escaped_separator,
        "1,te\\,st1,anot\\,her test1\n",
        csv![["1", "te,st1", "anot,her test1"]]
    );
    parses_to!(
        escaped_crlf_as_one_token,
        "a\\\r\nb\r\n",
        csv![["a\r\nb"]]
    );
    parses_to!(
        escape_not_followed_by_escaped,
        "a\\b,c",
        csv![["a\\b", "c"]]
    );
    parses_to!(trailing_escape, "a\\", csv![["a\\"]]);

    parses_to!(
        tsv_rows,
        "1\ttest1\tanother test1\r\n2\ttest2\tanother test2\n",
        csv![["1", "test1", "another test1"], ["2", "test2", "another test2"]],
        preset(&TSV)
    );

    parses_to!(
        multichar_tokens,
        "1bbbbtest1bbbbanobbther test1aaaa\
         2bbbbtest2bbbbanoccccbbbbther test2aaaa",
        csv![
            ["1", "test1", "anobbther test1"],
            ["2", "test2", "anobbbbther test2"]
        ],
        |b: &mut ConfigBuilder| {
            b.linesep("aaaa").sep("bbbb").esc("cccc").quote("dddd");
        }
    );
    parses_to!(
        multichar_quote,
        "ddddxbbbbyddddbbbbz",
        csv![["xbbbby", "z"]],
        |b: &mut ConfigBuilder| {
            b.linesep("aaaa").sep("bbbb").esc("cccc").quote("dddd");
        }
    );
    parses_to!(
        overlapping_separators_longest_wins,
        "xaaybz",
        csv![["x", "y", "z"]],
        |b: &mut ConfigBuilder| {
            b.sep(vec!["a", "aa", "b"]);
        }
    );
    parses_to!(
        overlapping_separators_first_declared,
        "xay",
        csv![["x", "y"]],
        |b: &mut ConfigBuilder| {
            b.sep(vec!["a", "a"]);
        }
    );
    parses_to!(
        separator_prefix_fails,
        "abxabc",
        csv![["abx", ""]],
        |b: &mut ConfigBuilder| {
            b.sep("abc");
        }
    );

    parses_to!(
        quoted_with_backslash,
        "1,\"test1\",\"an \\\"other\\\" test1\"\r\n",
        csv![["1", "test1", "an \"other\" test1"]],
        preset(&CSV_QUOTED)
    );
    parses_to!(
        rfc_doubled_quotes,
        "1,\"test1\",\"an \"\"other\"\" test1\"\r\n",
        csv![["1", "test1", "an \"other\" test1"]],
        preset(&RFC4180)
    );
    parses_to!(
        rfc_no_final_newline,
        "4,\"test4\",\"an \"\"other\"\" test4\"",
        csv![["4", "test4", "an \"other\" test4"]],
        preset(&RFC4180)
    );
    parses_to!(
        rfc_separators_inside_quotes,
        "\"a,b\",\"c\r\nd\"\r\n",
        csv![["a,b", "c\r\nd"]],
        preset(&RFC4180)
    );
    parses_to!(rfc_empty_quoted, "\"\",x", csv![["", "x"]], preset(&RFC4180));
    parses_to!(rfc_only_quotes, "\"\"\"\"", csv![["\""]], preset(&RFC4180));
    parses_to!(rfc_single_empty_field, "\"\"\r\n", csv![[""]], preset(&RFC4180));
    parses_to!(
        quote_only_at_field_start,
        "a\"b\",c",
        csv![["a\"b\"", "c"]],
        preset(&CSV_QUOTED)
    );
    parses_to!(
        text_after_closing_quote,
        "\"ab\"cd,e",
        csv![["abcd", "e"]],
        preset(&CSV_QUOTED)
    );
    parses_to!(
        quote_closed_by_opener_only,
        "'a\"b',c",
        csv![["a\"b", "c"]],
        |b: &mut ConfigBuilder| {
            b.quote(vec!["\"", "'"]);
        }
    );
    parses_to!(
        no_quoting_by_default,
        "\"a\",b",
        csv![["\"a\"", "b"]],
        preset(&CSV)
    );

    #[test]
    fn field_names() {
        let config = ConfigBuilder::new().fields(vec!["id", "label"]).build();
        let mut tok = Tokenizer::new(config.unwrap());
        let mut recs = vec![];
        tok.feed("1,x,y\n2\n", |r| recs.push(r)).unwrap();
        tok.finish(|r| recs.push(r)).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].get_by_name("id"), Some("1"));
        assert_eq!(recs[0].get_by_name("label"), Some("x"));
        assert_eq!(recs[0].len(), 2);
        assert_eq!(recs[1].get_by_name("id"), Some("2"));
        assert_eq!(recs[1].get_by_name("label"), None);
    }

    #[test]
    fn unclosed_quote() {
        let err = parse_err(
            Config::from_preset(&RFC4180),
            "1,\"test1\",\"an \"\"other\"\" test1\r\n2,test2,x\r\n",
        );
        assert_eq!(
            err,
            ParseError::UnclosedQuotedField {
                line: 1,
                column: 10,
                quote: "\"".to_string(),
            }
        );
    }

    #[test]
    fn mismatched_quote_is_unclosed() {
        let config = ConfigBuilder::new().quote(vec!["\"", "'"]).build();
        let err = parse_err(config.unwrap(), "1,\"test1\"\r\n2,\"test2',x\r\n");
        match err {
            ParseError::UnclosedQuotedField { line, ref quote, .. } => {
                assert_eq!(line, 2);
                assert_eq!(quote, "\"");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn strict_quotes() {
        let mut builder = ConfigBuilder::from_preset(&CSV_QUOTED);
        builder.strict_quotes(true);
        let err = parse_err(builder.build().unwrap(), "x\n\"ab\"cd,e");
        assert_eq!(
            err,
            ParseError::UnexpectedCharacter { line: 2, column: 4, found: 'c' }
        );

        let mut tok = Tokenizer::new(builder.build().unwrap());
        let mut recs = vec![];
        tok.feed("\"ab\",\"c\"\n", |r| recs.push(r)).unwrap();
        assert_eq!(recs, vec![Record::from(vec!["ab", "c"])]);
    }

    #[test]
    fn errors_are_terminal() {
        let mut tok = Tokenizer::new(Config::from_preset(&RFC4180));
        tok.feed("\"abc", |_| {}).unwrap();
        let err = tok.finish(|_| {}).unwrap_err();
        assert_eq!(tok.feed("x\n", |_| {}), Err(err.clone()));
        assert_eq!(tok.finish(|_| {}), Err(err));

        tok.reset();
        let mut recs = vec![];
        tok.feed("x\n", |r| recs.push(r)).unwrap();
        assert_eq!(recs, vec![Record::from(vec!["x"])]);
    }

    #[test]
    fn records_emitted_as_lines_complete() {
        let mut tok = Tokenizer::new(Config::default());
        let mut recs = vec![];
        tok.feed("a,b\r", |r| recs.push(r)).unwrap();
        // `\r` may still be the start of `\r\n`.
        assert!(recs.is_empty());
        tok.feed("\nc", |r| recs.push(r)).unwrap();
        assert_eq!(recs, vec![Record::from(vec!["a", "b"])]);
        tok.finish(|r| recs.push(r)).unwrap();
        assert_eq!(recs[1], Record::from(vec!["c"]));
    }

    #[test]
    fn line_numbers() {
        let mut tok = Tokenizer::new(Config::from_preset(&RFC4180));
        assert_eq!(tok.line(), 1);
        tok.feed("\n\n\"a\nb\",c\nfoo", |_| {}).unwrap();
        assert_eq!(tok.line(), 4);
        assert_eq!(tok.column(), 3);
    }
}
