use indexmap::IndexMap;

/// A single logical row.
///
/// Rows are ordered lists of fields, unless field names are configured, in
/// which case the tokenizer produces named records.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Record {
    /// Fields in positional order.
    List(Vec<String>),
    /// Field values keyed by field name, in field name order.
    Map(IndexMap<String, String>),
}

impl Default for Record {
    fn default() -> Record {
        Record::List(vec![])
    }
}

impl Record {
    /// Returns the number of fields in this record.
    pub fn len(&self) -> usize {
        match *self {
            Record::List(ref fields) => fields.len(),
            Record::Map(ref map) => map.len(),
        }
    }

    /// Returns true if this record has no fields.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if this is a named record.
    pub fn is_map(&self) -> bool {
        match *self {
            Record::List(_) => false,
            Record::Map(_) => true,
        }
    }

    /// Return the field at position `i`.
    pub fn get(&self, i: usize) -> Option<&str> {
        match *self {
            Record::List(ref fields) => fields.get(i).map(|f| &**f),
            Record::Map(ref map) => map.get_index(i).map(|(_, v)| &**v),
        }
    }

    /// Return the field named `name`. Positional records have no names.
    pub fn get_by_name(&self, name: &str) -> Option<&str> {
        match *self {
            Record::List(_) => None,
            Record::Map(ref map) => map.get(name).map(|v| &**v),
        }
    }

    /// Iterate over the field values in order.
    pub fn iter(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match *self {
            Record::List(ref fields) => Box::new(fields.iter().map(|f| &**f)),
            Record::Map(ref map) => Box::new(map.values().map(|v| &**v)),
        }
    }

    /// Convert this record into its field values, dropping any names.
    pub fn into_list(self) -> Vec<String> {
        match self {
            Record::List(fields) => fields,
            Record::Map(map) => map.into_iter().map(|(_, v)| v).collect(),
        }
    }
}

impl<S: Into<String>> From<Vec<S>> for Record {
    fn from(fields: Vec<S>) -> Record {
        Record::List(fields.into_iter().map(Into::into).collect())
    }
}

impl From<IndexMap<String, String>> for Record {
    fn from(map: IndexMap<String, String>) -> Record {
        Record::Map(map)
    }
}

/// Turns completed rows into records.
///
/// With field names, values are zipped to names positionally: values past
/// the last name are dropped, and names past the last value are left out of
/// the record.
#[derive(Clone, Debug, Default)]
pub struct Assembler {
    names: Option<Vec<String>>,
}

impl Assembler {
    /// Create an assembler for the given field names.
    pub fn new(names: Option<Vec<String>>) -> Assembler {
        Assembler { names }
    }

    /// Build a record from a completed row.
    pub fn assemble(&self, row: Vec<String>) -> Record {
        match self.names {
            None => Record::List(row),
            Some(ref names) => Record::Map(
                names.iter().cloned().zip(row.into_iter()).collect(),
            ),
        }
    }
}
