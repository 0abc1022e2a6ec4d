/*!
Adapters for consumers with their own expectations about the bytes they
receive.
*/

use std::io;

use csvtok_core::{Charset, Decoder};
use log::debug;

const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];

/// A writer that re-encodes delimited text for spreadsheet applications.
///
/// Bytes written to it are taken verbatim in the `source` charset, decoded
/// and written to the underlying writer as UTF-16LE. A little endian byte
/// order mark is written once, before anything else.
///
/// This is meant to sit between a `Writer` and its destination:
///
/// ```
/// use std::error::Error;
/// use csvtok::{Charset, Writer};
/// use csvtok::compat::SpreadsheetWriter;
///
/// # fn main() { example().unwrap(); }
/// fn example() -> Result<(), Box<dyn Error>> {
///     let sheet = SpreadsheetWriter::new(vec![], Charset::Utf8);
///     let mut wtr = Writer::from_writer(sheet);
///     wtr.write_fields(&["a", "é"])?;
///     let out = wtr.into_inner()?.finish()?;
///     assert_eq!(out, b"\xFF\xFEa\0,\0\xE9\0\r\0\n\0");
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct SpreadsheetWriter<W: io::Write> {
    wtr: W,
    decoder: Decoder,
    wrote_bom: bool,
    text: String,
    out: Vec<u8>,
}

impl<W: io::Write> SpreadsheetWriter<W> {
    /// Create a new spreadsheet writer whose input is in `source`.
    pub fn new(wtr: W, source: Charset) -> SpreadsheetWriter<W> {
        SpreadsheetWriter {
            wtr,
            decoder: source.decoder(),
            wrote_bom: false,
            text: String::new(),
            out: vec![],
        }
    }

    /// Signal the end of input and return the underlying writer.
    ///
    /// An incomplete sequence at the end of the input is written as
    /// U+FFFD. The byte order mark is written even if nothing else was.
    pub fn finish(mut self) -> io::Result<W> {
        self.text.clear();
        self.decoder.finish(&mut self.text);
        self.write_text()?;
        self.wtr.flush()?;
        debug!("spreadsheet output finished");
        Ok(self.wtr)
    }

    /// Returns a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.wtr
    }

    fn write_bom(&mut self) -> io::Result<()> {
        if !self.wrote_bom {
            self.wtr.write_all(UTF16LE_BOM)?;
            self.wrote_bom = true;
        }
        Ok(())
    }

    fn write_text(&mut self) -> io::Result<()> {
        self.write_bom()?;
        self.out.clear();
        Charset::Utf16Le
            .encode_into(&self.text, &mut self.out)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        self.wtr.write_all(&self.out)
    }
}

impl<W: io::Write> io::Write for SpreadsheetWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.text.clear();
        self.decoder.decode(buf, &mut self.text);
        self.write_text()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.write_bom()?;
        self.wtr.flush()
    }
}
