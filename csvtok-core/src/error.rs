use thiserror::Error;

/// An error that occurs when resolving a configuration.
///
/// These are raised synchronously while building a `Config` and are never
/// recoverable without supplying different options.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ConfigError {
    /// The field separator set resolved to nothing.
    #[error("at least one field separator is required")]
    MissingFieldSeparator,
    /// The line separator set resolved to nothing.
    #[error("at least one line separator is required")]
    MissingLineSeparator,
    /// A token list contained the empty string.
    #[error("option `{option}` contains an empty token")]
    EmptyToken {
        /// The name of the offending option.
        option: &'static str,
    },
    /// The character encoding name is not one that is supported.
    #[error("unknown character encoding `{name}`")]
    UnknownEncoding {
        /// The name that was given.
        name: String,
    },
}

/// An error that occurs while tokenizing a stream.
///
/// A parse error is terminal for the tokenizer that raised it.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ParseError {
    /// A character that no rule accepts was found. This only happens after
    /// a closing quote when strict quoting is enabled.
    #[error(
        "unexpected character {found:?} at line {line}, column {column}"
    )]
    UnexpectedCharacter {
        /// The line on which the character was found, starting at `1`.
        line: u64,
        /// The character offset within the line, starting at `0`.
        column: u64,
        /// The offending character.
        found: char,
    },
    /// The input ended inside a quoted field.
    #[error(
        "unclosed quoted field opened with {quote:?} \
         at line {line}, column {column}"
    )]
    UnclosedQuotedField {
        /// The line on which the quoted field was opened.
        line: u64,
        /// The character offset within that line of the opening quote.
        column: u64,
        /// The quote token that opened the field.
        quote: String,
    },
}

impl ParseError {
    /// The line number associated with this error.
    pub fn line(&self) -> u64 {
        match *self {
            ParseError::UnexpectedCharacter { line, .. }
            | ParseError::UnclosedQuotedField { line, .. } => line,
        }
    }

    /// The character offset within the line associated with this error.
    pub fn column(&self) -> u64 {
        match *self {
            ParseError::UnexpectedCharacter { column, .. }
            | ParseError::UnclosedQuotedField { column, .. } => column,
        }
    }
}

/// An error that occurs while encoding a record.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum EncodeError {
    /// A named record was given but no field names are configured, so it
    /// cannot be flattened into positional fields.
    #[error("cannot flatten a named record: no field names are configured")]
    MissingFieldMapping,
    /// The output character encoding cannot represent a character.
    #[error("character {ch:?} cannot be represented in {charset}")]
    Unrepresentable {
        /// The character that failed to encode.
        ch: char,
        /// The name of the target encoding.
        charset: &'static str,
    },
}
