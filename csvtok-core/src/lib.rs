/*!
`csvtok-core` provides an incremental tokenizer and an encoder for delimited
text where every separator, quote and escape may be a multi-character token,
and where each of them may be given as a set of alternatives.

This crate does no I/O. Text is pushed into a [`Tokenizer`] in chunks of any
size and records come out through a callback as soon as they complete. The
[`Encoder`] turns records back into bytes in the configured character
encoding. The `csvtok` crate builds readers and writers on top of these.

# Example

```
use csvtok_core::{ConfigBuilder, Encoder, Record, Tokenizer};

let config = ConfigBuilder::new()
    .sep("bbbb")
    .linesep("aaaa")
    .esc("cccc")
    .build()
    .unwrap();

let mut tok = Tokenizer::new(config.clone());
let mut records = vec![];
tok.feed("1bbbbte", |r| records.push(r)).unwrap();
tok.feed("st1ccccbbbbxaaaa", |r| records.push(r)).unwrap();
tok.finish(|r| records.push(r)).unwrap();
assert_eq!(records, vec![Record::from(vec!["1", "test1bbbbx"])]);

let enc = Encoder::new(config);
let out = enc.encode(&records[0]).unwrap();
assert_eq!(out, b"1bbbbtest1ccccbbbbxaaaa");
```
*/

pub use crate::charset::{Charset, Decoder};
pub use crate::config::{
    Config, ConfigBuilder, IntoTokens, OneOrMany, Options, Preset, QuoteStyle,
    CSV, CSV_QUOTED, RFC4180, TSV,
};
pub use crate::encoder::Encoder;
pub use crate::error::{ConfigError, EncodeError, ParseError};
pub use crate::matcher::{Probe, TokenSet};
pub use crate::record::{Assembler, Record};
pub use crate::tokenizer::Tokenizer;

mod charset;
mod config;
mod encoder;
mod error;
mod matcher;
mod record;
mod tokenizer;
