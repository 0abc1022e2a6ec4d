use crate::config::{Config, QuoteStyle};
use crate::error::EncodeError;
use crate::record::Record;

/// Encodes records as delimited text.
///
/// An encoder holds no per-record state, so a single encoder can be shared
/// between threads and used for any number of records.
///
/// For each field, every occurrence of an escaped token is prefixed with the
/// first escape token. A field is then wrapped in the first quote token if
/// quoting is enabled and the quoting style asks for it. Fields are joined
/// with the first field separator and the record ends with the first line
/// separator.
#[derive(Clone, Debug)]
pub struct Encoder {
    config: Config,
}

impl Encoder {
    /// Create an encoder with the given configuration.
    pub fn new(config: Config) -> Encoder {
        Encoder { config }
    }

    /// The configuration used by this encoder.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Encode a record in the configured character encoding.
    ///
    /// Named records are flattened in field name order. A name without a
    /// value in the record produces an empty field. If no field names are
    /// configured, this returns `EncodeError::MissingFieldMapping`.
    pub fn encode(&self, record: &Record) -> Result<Vec<u8>, EncodeError> {
        let mut out = vec![];
        self.encode_into(record, &mut out)?;
        Ok(out)
    }

    /// Like `encode`, but appends to `out`.
    pub fn encode_into(
        &self,
        record: &Record,
        out: &mut Vec<u8>,
    ) -> Result<(), EncodeError> {
        let text = self.encode_to_string(record)?;
        self.config.charset().encode_into(&text, out)
    }

    /// Encode a record as text, before character encoding.
    pub fn encode_to_string(
        &self,
        record: &Record,
    ) -> Result<String, EncodeError> {
        match *record {
            Record::List(ref fields) => Ok(self.fields_to_string(fields)),
            Record::Map(ref map) => {
                let names = self
                    .config
                    .fields()
                    .ok_or(EncodeError::MissingFieldMapping)?;
                let fields: Vec<&str> = names
                    .iter()
                    .map(|name| map.get(name).map(|v| &**v).unwrap_or(""))
                    .collect();
                Ok(self.fields_to_string(&fields))
            }
        }
    }

    /// Encode a sequence of fields in the configured character encoding.
    pub fn encode_fields<I, S>(&self, fields: I) -> Result<Vec<u8>, EncodeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fields: Vec<S> = fields.into_iter().collect();
        let text = self.fields_to_string(&fields);
        self.config.charset().encode(&text)
    }

    fn fields_to_string<S: AsRef<str>>(&self, fields: &[S]) -> String {
        let cfg = &self.config;
        let sep = cfg.field_separators().first().unwrap_or(",");
        let term = cfg.line_separators().first().unwrap_or("\r\n");

        let mut out = String::new();
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                out.push_str(sep);
            }
            let field = field.as_ref();
            match cfg.quotes().first() {
                Some(quote) if self.should_quote(field, fields.len()) => {
                    out.push_str(quote);
                    self.escape_into(field, &mut out);
                    out.push_str(quote);
                }
                _ => self.escape_into(field, &mut out),
            }
        }
        out.push_str(term);
        out
    }

    /// A record made of one empty field is quoted so that it is not
    /// written as a blank line.
    fn should_quote(&self, field: &str, nfields: usize) -> bool {
        match self.config.quote_style() {
            QuoteStyle::Always => true,
            QuoteStyle::Necessary => {
                (nfields == 1 && field.is_empty())
                    || self.config.quote_triggers().contains_any(field)
            }
            QuoteStyle::Never => false,
        }
    }

    fn escape_into(&self, field: &str, out: &mut String) {
        let cfg = &self.config;
        let esc = match cfg.escapes().first() {
            Some(esc) if cfg.escaped().contains_any(field) => esc,
            _ => {
                out.push_str(field);
                return;
            }
        };
        let (mut pos, mut last) = (0, 0);
        while pos < field.len() {
            match cfg.escaped().match_at(field, pos) {
                Some(len) => {
                    out.push_str(&field[last..pos]);
                    out.push_str(esc);
                    out.push_str(&field[pos..pos + len]);
                    pos += len;
                    last = pos;
                }
                None => {
                    pos += field[pos..].chars().next().map_or(1, char::len_utf8);
                }
            }
        }
        out.push_str(&field[last..]);
    }
}

#[cfg(test)]
mod tests {
    use super::Encoder;
    use crate::config::{
        Config, ConfigBuilder, QuoteStyle, CSV, CSV_QUOTED, RFC4180, TSV,
    };
    use crate::error::EncodeError;
    use crate::record::Record;

    fn encode(config: Config, fields: &[&str]) -> String {
        let enc = Encoder::new(config);
        String::from_utf8(enc.encode(&Record::from(fields.to_vec())).unwrap())
            .unwrap()
    }

    macro_rules! encodes_to {
        ($name:ident, $fields:expr, $expected:expr) => {
            encodes_to!($name, $fields, $expected, Config::default());
        };
        ($name:ident, $fields:expr, $expected:expr, $config:expr) => {
            #[test]
            fn $name() {
                assert_eq!(encode($config, &$fields), $expected);
            }
        };
    }

    encodes_to!(
        simple,
        ["1", "test1", "another test1"],
        "1,test1,another test1\r\n"
    );
    encodes_to!(one_field, ["another test1"], "another test1\r\n");
    encodes_to!(
        escapes_separators,
        ["1", "te,st1", "ano,ther ,test1"],
        "1,te\\,st1,ano\\,ther \\,test1\r\n"
    );
    encodes_to!(
        tsv_escapes_line_separators_greedily,
        ["1", "te\tst1\n", "\r\nano\tther\r \ttest1"],
        "1\tte\\\tst1\\\n\t\\\r\nano\\\tther\\\r \\\ttest1\r\n",
        Config::from_preset(&TSV)
    );
    encodes_to!(
        rfc_doubles_quotes,
        ["1", "tu", "\"peux\"", "pas"],
        "1,tu,\"\"\"peux\"\"\",pas\r\n",
        Config::from_preset(&RFC4180)
    );
    encodes_to!(
        rfc_quotes_separators,
        ["a,b", "c\r\nd", ""],
        "\"a,b\",\"c\r\nd\",\r\n",
        Config::from_preset(&RFC4180)
    );
    encodes_to!(
        lone_empty_field_is_quoted,
        [""],
        "\"\"\r\n",
        Config::from_preset(&RFC4180)
    );
    encodes_to!(
        lone_empty_field_without_quotes,
        [""],
        "\r\n",
        Config::from_preset(&CSV)
    );
    encodes_to!(
        quoted_with_backslash,
        ["\"tu", "peux", "test\""],
        "\"\\\"tu\",peux,\"test\\\"\"\r\n",
        Config::from_preset(&CSV_QUOTED)
    );
    encodes_to!(
        always_quote,
        ["1", "\"tu", "peux"],
        "\"1\",\"\\\"tu\",\"peux\"\n",
        ConfigBuilder::new()
            .quote("\"")
            .linesep("\n")
            .quote_style(QuoteStyle::Always)
            .build()
            .unwrap()
    );
    encodes_to!(
        never_quote,
        ["a,b"],
        "a\\,b\r\n",
        ConfigBuilder::from_preset(&CSV_QUOTED)
            .quote_style(QuoteStyle::Never)
            .build()
            .unwrap()
    );
    encodes_to!(
        never_quote_lone_empty_field,
        [""],
        "\r\n",
        ConfigBuilder::from_preset(&CSV_QUOTED)
            .quote_style(QuoteStyle::Never)
            .build()
            .unwrap()
    );
    encodes_to!(
        exotic_tokens,
        ["1", "t~u", "péux", "p€s", "tàst"],
        "1é~t€~u~é~p€éux~ép€€sé~t€àst~à",
        ConfigBuilder::new()
            .quote("~")
            .sep("é")
            .esc("€")
            .linesep("à")
            .build()
            .unwrap()
    );
    encodes_to!(
        longest_escape_trigger_wins,
        ["xaay"],
        "x\\aay\n",
        ConfigBuilder::new()
            .sep(vec!["a", "aa"])
            .linesep("\n")
            .to_quote(vec!["z"])
            .build()
            .unwrap()
    );

    #[test]
    fn named_records() {
        let config = ConfigBuilder::new()
            .fields(vec!["id", "label", "description"])
            .build()
            .unwrap();
        let enc = Encoder::new(config);
        let mut map = indexmap::IndexMap::new();
        map.insert("label".to_string(), "te,st1".to_string());
        map.insert("id".to_string(), "1".to_string());
        let got = enc.encode_to_string(&Record::Map(map)).unwrap();
        assert_eq!(got, "1,te\\,st1,\r\n");
    }

    #[test]
    fn named_records_need_field_names() {
        let enc = Encoder::new(Config::default());
        let rec = Record::Map(indexmap::IndexMap::new());
        assert_eq!(enc.encode(&rec), Err(EncodeError::MissingFieldMapping));
    }

    #[test]
    fn charset_applied() {
        let config = ConfigBuilder::new()
            .chars_encoding("utf-16le")
            .build()
            .unwrap();
        let enc = Encoder::new(config);
        assert_eq!(enc.encode_fields(&["a", "é"]).unwrap(), b"a\0,\0\xE9\0\r\0\n\0");

        let config =
            ConfigBuilder::new().chars_encoding("ascii").build().unwrap();
        let enc = Encoder::new(config);
        assert!(enc.encode_fields(&["é"]).is_err());
    }
}
