/*!
The `csvtok` crate reads and writes delimited text where separators, quotes
and escapes are arbitrary, possibly multi-character, tokens.

Every token option accepts a set of alternatives. When several tokens could
match at the same position, the longest one wins, and among tokens of the
same length the one declared first wins. Input is consumed in bounded chunks
and the records produced never depend on where the chunk boundaries fall.

The tokenizer and encoder live in the `csvtok-core` crate, which does no
I/O; this crate adds buffered readers and writers, Serde serialization and a
spreadsheet compatibility adapter.

# Example

```
use std::error::Error;
use csvtok::{ConfigBuilder, ReaderBuilder, Record, WriterBuilder};

# fn main() { example().unwrap(); }
fn example() -> Result<(), Box<dyn Error>> {
    let config = ConfigBuilder::new()
        .sep(vec![";", "::"])
        .quote("\"")
        .build()?;

    let data = "a;b::c\r\n\"x;y\";z\r\n";
    let mut rdr = ReaderBuilder::from_config(config.clone())
        .from_reader(data.as_bytes());
    let mut records = vec![];
    for result in rdr.records() {
        records.push(result?);
    }
    assert_eq!(records[0], Record::from(vec!["a", "b", "c"]));
    assert_eq!(records[1], Record::from(vec!["x;y", "z"]));

    let mut wtr = WriterBuilder::from_config(config).from_writer(vec![]);
    for record in &records {
        wtr.write_record(record)?;
    }
    let out = String::from_utf8(wtr.into_inner()?)?;
    assert_eq!(out, "a;b;c\r\n\"x\\;y\";z\r\n");
    Ok(())
}
```
*/

pub use csvtok_core::{
    Charset, Config, ConfigBuilder, ConfigError, Decoder, EncodeError,
    Encoder, OneOrMany, Options, ParseError, Preset, QuoteStyle, Record,
    Tokenizer, CSV, CSV_QUOTED, RFC4180, TSV,
};

pub use crate::error::{Error, Result};
pub use crate::reader::{Reader, ReaderBuilder, RecordsIntoIter, RecordsIter};
#[cfg(feature = "serde")]
pub use crate::serializer::to_record;
pub use crate::writer::{Writer, WriterBuilder};

pub mod compat;
mod error;
mod reader;
#[cfg(feature = "serde")]
mod serializer;
mod writer;
