use std::collections::VecDeque;
use std::fs::File;
use std::io;
use std::path::Path;

use csvtok_core::{Config, Decoder, Options, ParseError, Record, Tokenizer};
use log::{debug, trace};

use crate::error::Result;

const DEFAULT_CAPACITY: usize = 8 * (1 << 10);

/// Builds a delimited text reader with various configuration knobs.
///
/// This builder can be used to tweak the tokens used by the tokenizer, the
/// character encoding of the input and the size of the chunks read from the
/// underlying reader. Once a reader is built, its configuration cannot be
/// changed.
#[derive(Debug)]
pub struct ReaderBuilder {
    config: Config,
    capacity: usize,
}

impl Default for ReaderBuilder {
    fn default() -> ReaderBuilder {
        ReaderBuilder { config: Config::default(), capacity: DEFAULT_CAPACITY }
    }
}

impl ReaderBuilder {
    /// Create a new builder for configuring reading.
    ///
    /// # Example
    ///
    /// ```
    /// use std::error::Error;
    /// use csvtok::ReaderBuilder;
    ///
    /// # fn main() { example().unwrap(); }
    /// fn example() -> Result<(), Box<dyn Error>> {
    ///     let data = "city,country\r\nBoston,United States\r\n";
    ///     let mut rdr = ReaderBuilder::new().from_reader(data.as_bytes());
    ///     let mut count = 0;
    ///     for result in rdr.records() {
    ///         let record = result?;
    ///         assert_eq!(record.len(), 2);
    ///         count += 1;
    ///     }
    ///     assert_eq!(count, 2);
    ///     Ok(())
    /// }
    /// ```
    pub fn new() -> ReaderBuilder {
        ReaderBuilder::default()
    }

    /// Create a builder for the given resolved configuration.
    pub fn from_config(config: Config) -> ReaderBuilder {
        ReaderBuilder { config, ..ReaderBuilder::default() }
    }

    /// Create a builder by resolving loosely typed options.
    pub fn from_options(options: &Options) -> Result<ReaderBuilder> {
        Ok(ReaderBuilder::from_config(options.resolve()?))
    }

    /// Set the configuration used to tokenize the input.
    pub fn config(&mut self, config: Config) -> &mut ReaderBuilder {
        self.config = config;
        self
    }

    /// Set the size, in bytes, of the chunks read from the underlying
    /// reader.
    ///
    /// A chunk is only read when every record produced by the previous one
    /// has been consumed.
    pub fn capacity(&mut self, capacity: usize) -> &mut ReaderBuilder {
        self.capacity = capacity.max(1);
        self
    }

    /// Build a reader from this configuration that reads data from `rdr`.
    pub fn from_reader<R: io::Read>(&self, rdr: R) -> Reader<R> {
        Reader::new(self, rdr)
    }

    /// Build a reader from this configuration that reads data from the
    /// file at `path`.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Reader<File>> {
        Ok(Reader::new(self, File::open(path)?))
    }
}

/// A reader of delimited text.
///
/// The reader pulls bounded chunks of bytes from the underlying reader,
/// decodes them with the configured character encoding and tokenizes them
/// into records. A new chunk is only read once every record produced so far
/// has been handed out.
#[derive(Debug)]
pub struct Reader<R> {
    rdr: R,
    buf: Vec<u8>,
    text: String,
    decoder: Decoder,
    tokenizer: Tokenizer,
    queue: VecDeque<Record>,
    failed: Option<ParseError>,
    eof: bool,
}

impl Reader<File> {
    /// Create a new reader with a default configuration for the file at
    /// `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Reader<File>> {
        ReaderBuilder::new().from_path(path)
    }
}

impl<R: io::Read> Reader<R> {
    fn new(builder: &ReaderBuilder, rdr: R) -> Reader<R> {
        Reader {
            rdr,
            buf: vec![0; builder.capacity],
            text: String::with_capacity(builder.capacity),
            decoder: builder.config.charset().decoder(),
            tokenizer: Tokenizer::new(builder.config.clone()),
            queue: VecDeque::new(),
            failed: None,
            eof: false,
        }
    }

    /// Create a new reader with a default configuration for the given
    /// reader.
    pub fn from_reader(rdr: R) -> Reader<R> {
        ReaderBuilder::new().from_reader(rdr)
    }

    /// The configuration of this reader.
    pub fn config(&self) -> &Config {
        self.tokenizer.config()
    }

    /// The line the tokenizer has reached, starting at `1`.
    pub fn line(&self) -> u64 {
        self.tokenizer.line()
    }

    /// Returns true once the underlying reader is exhausted and every
    /// record has been read.
    pub fn is_done(&self) -> bool {
        self.eof && self.queue.is_empty()
    }

    /// Read the next record.
    ///
    /// This returns `None` at the end of the input. A parse error is only
    /// returned after every record completed before it has been read, and
    /// it is returned again on every later call.
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        loop {
            if let Some(record) = self.queue.pop_front() {
                return Ok(Some(record));
            }
            if let Some(ref err) = self.failed {
                return Err(err.clone().into());
            }
            if self.eof {
                return Ok(None);
            }
            self.fill()?;
        }
    }

    /// Returns a borrowed iterator over all records.
    ///
    /// The iterator stops after yielding an error.
    pub fn records(&mut self) -> RecordsIter<R> {
        RecordsIter { rdr: self, done: false }
    }

    /// Returns an owned iterator over all records.
    pub fn into_records(self) -> RecordsIntoIter<R> {
        RecordsIntoIter { rdr: self, done: false }
    }

    /// Unwraps this reader, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.rdr
    }

    fn fill(&mut self) -> Result<()> {
        let n = loop {
            match self.rdr.read(&mut self.buf) {
                Ok(n) => break n,
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err.into()),
            }
        };
        self.text.clear();
        let queue = &mut self.queue;
        let result = if n == 0 {
            self.eof = true;
            self.decoder.finish(&mut self.text);
            let tok = &mut self.tokenizer;
            tok.feed(&self.text, |r| queue.push_back(r))
                .and_then(|_| tok.finish(|r| queue.push_back(r)))
        } else {
            self.decoder.decode(&self.buf[..n], &mut self.text);
            self.tokenizer.feed(&self.text, |r| queue.push_back(r))
        };
        trace!("read {} byte(s), {} record(s) queued", n, queue.len());
        if let Err(err) = result {
            debug!("stopping after parse error: {}", err);
            self.failed = Some(err);
        } else if self.eof {
            debug!("end of input at line {}", self.tokenizer.line());
        }
        Ok(())
    }
}

/// A borrowed iterator over records.
pub struct RecordsIter<'r, R: 'r> {
    rdr: &'r mut Reader<R>,
    done: bool,
}

impl<'r, R: io::Read> Iterator for RecordsIter<'r, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Result<Record>> {
        if self.done {
            return None;
        }
        match self.rdr.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// An owned iterator over records.
pub struct RecordsIntoIter<R> {
    rdr: Reader<R>,
    done: bool,
}

impl<R: io::Read> RecordsIntoIter<R> {
    /// Return a reference to the underlying reader.
    pub fn reader(&self) -> &Reader<R> {
        &self.rdr
    }

    /// Drop this iterator and return the underlying reader.
    pub fn into_reader(self) -> Reader<R> {
        self.rdr
    }
}

impl<R: io::Read> Iterator for RecordsIntoIter<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Result<Record>> {
        if self.done {
            return None;
        }
        match self.rdr.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use csvtok_core::{Config, ConfigBuilder, Record, RFC4180};

    use super::ReaderBuilder;
    use crate::error::Error;

    fn b(s: &str) -> &[u8] {
        s.as_bytes()
    }

    /// A reader that hands out at most one byte per call.
    struct Trickle<'a>(&'a [u8]);

    impl<'a> io::Read for Trickle<'a> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0.is_empty() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.0[0];
            self.0 = &self.0[1..];
            Ok(1)
        }
    }

    #[test]
    fn read_all() {
        let mut rdr = ReaderBuilder::new()
            .from_reader(b("1,test1,another test1\r\n2,test2,another test2\r\n"));
        let recs: Vec<Record> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(
            recs,
            vec![
                Record::from(vec!["1", "test1", "another test1"]),
                Record::from(vec!["2", "test2", "another test2"]),
            ]
        );
        assert!(rdr.is_done());
    }

    #[test]
    fn into_records_stops_after_error() {
        let rdr = ReaderBuilder::from_config(Config::from_preset(&RFC4180))
            .from_reader(b("a,b\r\n\"c"));
        let mut it = rdr.into_records();
        assert_eq!(
            it.next().map(|r| r.unwrap()),
            Some(Record::from(vec!["a", "b"]))
        );
        match it.next() {
            Some(Err(Error::Parse(_))) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(it.next().is_none());
    }

    #[test]
    fn tiny_chunks() {
        let data = "é,\"a\"\"b\"\r\nx,\"multi\r\nline\"";
        let config = Config::from_preset(&RFC4180);
        let mut rdr = ReaderBuilder::from_config(config.clone())
            .capacity(1)
            .from_reader(Trickle(b(data)));
        let recs: Vec<Record> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(
            recs,
            vec![
                Record::from(vec!["é", "a\"b"]),
                Record::from(vec!["x", "multi\r\nline"]),
            ]
        );
    }

    #[test]
    fn pulls_one_chunk_at_a_time() {
        let mut builder = ReaderBuilder::new();
        builder.capacity(4);
        let mut rdr = builder.from_reader(b("a\nb\nc\nd\n"));
        assert_eq!(rdr.read_record().unwrap(), Some(Record::from(vec!["a"])));
        assert_eq!(rdr.read_record().unwrap(), Some(Record::from(vec!["b"])));
        assert!(!rdr.is_done());
        assert_eq!(rdr.line(), 3);
    }

    #[test]
    fn records_before_error_come_first() {
        let mut rdr = ReaderBuilder::from_config(Config::from_preset(&RFC4180))
            .from_reader(b("a,b\n\"c"));
        assert_eq!(
            rdr.read_record().unwrap(),
            Some(Record::from(vec!["a", "b"]))
        );
        match rdr.read_record() {
            Err(Error::Parse(err)) => assert_eq!(err.line(), 2),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(rdr.read_record().is_err());
    }

    #[test]
    fn decodes_latin1() {
        let config =
            ConfigBuilder::new().chars_encoding("latin1").build().unwrap();
        let mut rdr =
            ReaderBuilder::from_config(config).from_reader(&[0xE9, b',', b'x'][..]);
        assert_eq!(
            rdr.read_record().unwrap(),
            Some(Record::from(vec!["é", "x"]))
        );
        assert_eq!(rdr.read_record().unwrap(), None);
    }
}
