use std::fs::File;
use std::io;
use std::path::Path;

use csvtok_core::{Config, Encoder, Options, Record};
use log::debug;
#[cfg(feature = "serde")]
use serde::Serialize;

use crate::error::Result;
#[cfg(feature = "serde")]
use crate::serializer::to_record;

const DEFAULT_CAPACITY: usize = 8 * (1 << 10);

/// Builds a delimited text writer with various configuration knobs.
///
/// This builder can be used to tweak the tokens written, the quoting style
/// and the character encoding of the output. Once a writer is built, its
/// configuration cannot be changed.
#[derive(Debug)]
pub struct WriterBuilder {
    config: Config,
    capacity: usize,
}

impl Default for WriterBuilder {
    fn default() -> WriterBuilder {
        WriterBuilder { config: Config::default(), capacity: DEFAULT_CAPACITY }
    }
}

impl WriterBuilder {
    /// Create a new builder for configuring writing.
    pub fn new() -> WriterBuilder {
        WriterBuilder::default()
    }

    /// Create a builder for the given resolved configuration.
    pub fn from_config(config: Config) -> WriterBuilder {
        WriterBuilder { config, ..WriterBuilder::default() }
    }

    /// Create a builder by resolving loosely typed options.
    pub fn from_options(options: &Options) -> Result<WriterBuilder> {
        Ok(WriterBuilder::from_config(options.resolve()?))
    }

    /// Set the configuration used to encode records.
    pub fn config(&mut self, config: Config) -> &mut WriterBuilder {
        self.config = config;
        self
    }

    /// Set the capacity, in bytes, of the internal buffer.
    pub fn capacity(&mut self, capacity: usize) -> &mut WriterBuilder {
        self.capacity = capacity;
        self
    }

    /// Build a writer from this configuration that writes data to `wtr`.
    ///
    /// The writer is buffered automatically.
    pub fn from_writer<W: io::Write>(&self, wtr: W) -> Writer<W> {
        Writer::new(self, wtr)
    }

    /// Build a writer from this configuration that writes data to the file
    /// at `path`. The file is created if it does not exist and truncated
    /// otherwise.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Writer<File>> {
        Ok(Writer::new(self, File::create(path)?))
    }
}

/// A writer of delimited text.
///
/// Every record written is encoded in full before any of it reaches the
/// underlying writer, so an encoding error never leaves a partial record
/// behind.
///
/// The buffer is flushed when the writer is dropped. Errors that occur then
/// are ignored; call `flush` to observe them.
///
/// # Example
///
/// ```
/// use std::error::Error;
/// use csvtok::{Record, Writer};
///
/// # fn main() { example().unwrap(); }
/// fn example() -> Result<(), Box<dyn Error>> {
///     let mut wtr = Writer::from_writer(vec![]);
///     wtr.write_fields(&["1", "te,st1", "another test1"])?;
///     wtr.write_record(&Record::from(vec!["2", "test2"]))?;
///
///     let data = String::from_utf8(wtr.into_inner()?)?;
///     assert_eq!(data, "1,te\\,st1,another test1\r\n2,test2\r\n");
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Writer<W: io::Write> {
    wtr: Option<W>,
    encoder: Encoder,
    buf: Vec<u8>,
    capacity: usize,
    records: u64,
    // True while `wtr` is being written to. `Drop` must not flush then.
    panicked: bool,
}

impl<W: io::Write> Drop for Writer<W> {
    fn drop(&mut self) {
        if self.wtr.is_some() && !self.panicked {
            let _ = self.flush();
        }
    }
}

impl Writer<File> {
    /// Create a new writer with a default configuration for the file at
    /// `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Writer<File>> {
        WriterBuilder::new().from_path(path)
    }
}

impl<W: io::Write> Writer<W> {
    fn new(builder: &WriterBuilder, wtr: W) -> Writer<W> {
        Writer {
            wtr: Some(wtr),
            encoder: Encoder::new(builder.config.clone()),
            buf: Vec::with_capacity(builder.capacity),
            capacity: builder.capacity,
            records: 0,
            panicked: false,
        }
    }

    /// Create a new writer with a default configuration that writes to
    /// `wtr`.
    pub fn from_writer(wtr: W) -> Writer<W> {
        WriterBuilder::new().from_writer(wtr)
    }

    /// The configuration of this writer.
    pub fn config(&self) -> &Config {
        self.encoder.config()
    }

    /// The number of records written so far.
    pub fn records_written(&self) -> u64 {
        self.records
    }

    /// Write a single record.
    ///
    /// Named records are written in the order of the configured field
    /// names; without field names this returns an encoding error.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        let start = self.buf.len();
        if let Err(err) = self.encoder.encode_into(record, &mut self.buf) {
            self.buf.truncate(start);
            return Err(err.into());
        }
        self.wrote_record()
    }

    /// Write a single record given as a sequence of fields.
    pub fn write_fields<I, S>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let bytes = self.encoder.encode_fields(fields)?;
        self.buf.extend_from_slice(&bytes);
        self.wrote_record()
    }

    /// Serialize a single record using Serde.
    ///
    /// Sequences, tuples and tuple structs are written as positional
    /// records. Structs and maps are written as named records: in the order
    /// of the configured field names if there are any, and in the order
    /// their fields are serialized otherwise.
    ///
    /// # Example
    ///
    /// ```
    /// use std::error::Error;
    /// use csvtok::Writer;
    /// use serde::Serialize;
    ///
    /// #[derive(Serialize)]
    /// struct Row<'a> {
    ///     city: &'a str,
    ///     population: Option<u64>,
    /// }
    ///
    /// # fn main() { example().unwrap(); }
    /// fn example() -> Result<(), Box<dyn Error>> {
    ///     let mut wtr = Writer::from_writer(vec![]);
    ///     wtr.serialize(Row { city: "Boston", population: Some(4628910) })?;
    ///     wtr.serialize(Row { city: "Concord", population: None })?;
    ///     wtr.serialize(("a", 1.5, true))?;
    ///
    ///     let data = String::from_utf8(wtr.into_inner()?)?;
    ///     assert_eq!(data, "Boston,4628910\r\nConcord,\r\na,1.5,true\r\n");
    ///     Ok(())
    /// }
    /// ```
    #[cfg(feature = "serde")]
    pub fn serialize<S: Serialize>(&mut self, record: S) -> Result<()> {
        let record = to_record(&record)?;
        if record.is_map() && self.config().fields().is_none() {
            return self.write_fields(record.into_list());
        }
        self.write_record(&record)
    }

    /// Flush the contents of the internal buffer to the underlying writer,
    /// and then flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.flush_buf()?;
        match self.wtr {
            Some(ref mut wtr) => wtr.flush(),
            None => Ok(()),
        }
    }

    /// Flush the internal buffer and return the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        debug!("writer finished after {} record(s)", self.records);
        match self.wtr.take() {
            Some(wtr) => Ok(wtr),
            None => Err(io::Error::new(
                io::ErrorKind::Other,
                "writer was already taken",
            )
            .into()),
        }
    }

    /// Returns a reference to the underlying writer.
    pub fn get_ref(&self) -> Option<&W> {
        self.wtr.as_ref()
    }

    fn wrote_record(&mut self) -> Result<()> {
        self.records += 1;
        if self.buf.len() >= self.capacity {
            self.flush_buf()?;
        }
        Ok(())
    }

    fn flush_buf(&mut self) -> io::Result<()> {
        let wtr = match self.wtr {
            Some(ref mut wtr) => wtr,
            None => return Ok(()),
        };
        self.panicked = true;
        let result = wtr.write_all(&self.buf);
        self.panicked = false;
        result?;
        self.buf.clear();
        Ok(())
    }
}
