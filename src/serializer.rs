use indexmap::IndexMap;
use serde::ser::{
    Error as SerdeError, Impossible, Serialize, SerializeMap, SerializeSeq,
    SerializeStruct, SerializeStructVariant, SerializeTuple,
    SerializeTupleStruct, SerializeTupleVariant, Serializer,
};

use csvtok_core::Record;

use crate::error::{Error, Result};

/// Serialize the given value into a record.
///
/// Sequences, tuples and tuple structs become positional records. Structs
/// and maps become named records in the order their fields are serialized.
/// Any other value becomes a record with a single field.
///
/// Fields must be scalars: nested containers are an error.
pub fn to_record<T: ?Sized + Serialize>(value: &T) -> Result<Record> {
    let mut ser = SeRecord { fields: vec![], names: None };
    value.serialize(&mut ser)?;
    Ok(ser.into_record())
}

struct SeRecord {
    fields: Vec<String>,
    names: Option<Vec<String>>,
}

impl SeRecord {
    fn into_record(self) -> Record {
        match self.names {
            None => Record::List(self.fields),
            Some(names) => {
                let map: IndexMap<String, String> =
                    names.into_iter().zip(self.fields).collect();
                Record::Map(map)
            }
        }
    }

    fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        let field = value.serialize(SeField)?;
        self.fields.push(field);
        Ok(())
    }

    fn push_named<T: ?Sized + Serialize>(
        &mut self,
        name: &str,
        value: &T,
    ) -> Result<()> {
        self.push(value)?;
        self.names.get_or_insert_with(Vec::new).push(name.to_string());
        Ok(())
    }
}

macro_rules! scalar_fields {
    ($($method:ident($ty:ty)),* $(,)?) => {
        $(
            fn $method(self, v: $ty) -> Result<()> {
                self.push(&v)
            }
        )*
    };
}

impl<'a> Serializer for &'a mut SeRecord {
    type Ok = ();
    type Error = Error;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    scalar_fields!(
        serialize_bool(bool),
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_i128(i128),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_u128(u128),
        serialize_f32(f32),
        serialize_f64(f64),
        serialize_char(char),
    );

    fn serialize_str(self, value: &str) -> Result<()> {
        self.push(value)
    }

    fn serialize_bytes(self, value: &[u8]) -> Result<()> {
        let field = SeField.serialize_bytes(value)?;
        self.fields.push(field);
        Ok(())
    }

    fn serialize_none(self) -> Result<()> {
        self.fields.push(String::new());
        Ok(())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        self.serialize_none()
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<()> {
        self.push(name)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        self.push(variant)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self> {
        Ok(self)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self> {
        Ok(self)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self> {
        Ok(self)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self> {
        self.names = Some(vec![]);
        Ok(self)
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self> {
        self.names = Some(vec![]);
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self> {
        self.names = Some(vec![]);
        Ok(self)
    }
}

impl<'a> SerializeSeq for &'a mut SeRecord {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(
        &mut self,
        value: &T,
    ) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a> SerializeTuple for &'a mut SeRecord {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(
        &mut self,
        value: &T,
    ) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a> SerializeTupleStruct for &'a mut SeRecord {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        value: &T,
    ) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a> SerializeTupleVariant for &'a mut SeRecord {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        value: &T,
    ) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a> SerializeMap for &'a mut SeRecord {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<()> {
        let name = key.serialize(SeField)?;
        self.names.get_or_insert_with(Vec::new).push(name);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(
        &mut self,
        value: &T,
    ) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a> SerializeStruct for &'a mut SeRecord {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<()> {
        self.push_named(key, value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

impl<'a> SerializeStructVariant for &'a mut SeRecord {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<()> {
        self.push_named(key, value)
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

/// Serializes a single scalar into field text.
struct SeField;

fn nested() -> Error {
    Error::custom("cannot serialize a container inside a field")
}

/// Integral floats that fit in an `i64` are written without a fraction.
fn whole(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        Some(v as i64)
    } else {
        None
    }
}

macro_rules! integer_fields {
    ($($method:ident($ty:ty)),* $(,)?) => {
        $(
            fn $method(self, v: $ty) -> Result<String> {
                Ok(itoa::Buffer::new().format(v).to_string())
            }
        )*
    };
}

impl Serializer for SeField {
    type Ok = String;
    type Error = Error;
    type SerializeSeq = Impossible<String, Error>;
    type SerializeTuple = Impossible<String, Error>;
    type SerializeTupleStruct = Impossible<String, Error>;
    type SerializeTupleVariant = Impossible<String, Error>;
    type SerializeMap = Impossible<String, Error>;
    type SerializeStruct = Impossible<String, Error>;
    type SerializeStructVariant = Impossible<String, Error>;

    fn serialize_bool(self, v: bool) -> Result<String> {
        Ok(if v { "true" } else { "false" }.to_string())
    }

    integer_fields!(
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_i128(i128),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_u128(u128),
    );

    fn serialize_f32(self, v: f32) -> Result<String> {
        match whole(v as f64) {
            Some(n) => self.serialize_i64(n),
            None => Ok(ryu::Buffer::new().format(v).to_string()),
        }
    }

    fn serialize_f64(self, v: f64) -> Result<String> {
        match whole(v) {
            Some(n) => self.serialize_i64(n),
            None => Ok(ryu::Buffer::new().format(v).to_string()),
        }
    }

    fn serialize_char(self, v: char) -> Result<String> {
        Ok(v.to_string())
    }

    fn serialize_str(self, value: &str) -> Result<String> {
        Ok(value.to_string())
    }

    fn serialize_bytes(self, value: &[u8]) -> Result<String> {
        String::from_utf8(value.to_vec()).map_err(Error::custom)
    }

    fn serialize_none(self) -> Result<String> {
        Ok(String::new())
    }

    fn serialize_some<T: ?Sized + Serialize>(
        self,
        value: &T,
    ) -> Result<String> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<String> {
        Ok(String::new())
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<String> {
        Ok(name.to_string())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<String> {
        Ok(variant.to_string())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<String> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<String> {
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(nested())
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(nested())
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(nested())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(nested())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(nested())
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct> {
        Err(nested())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(nested())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use csvtok_core::Record;
    use serde::Serialize;

    use super::to_record;
    use crate::error::Error;

    fn fields<T: Serialize>(value: T) -> Vec<String> {
        match to_record(&value).unwrap() {
            Record::List(fields) => fields,
            Record::Map(map) => panic!("expected a list record, got {:?}", map),
        }
    }

    fn named<T: Serialize>(value: T) -> Vec<(String, String)> {
        match to_record(&value).unwrap() {
            Record::Map(map) => map.into_iter().collect(),
            Record::List(l) => panic!("expected a named record, got {:?}", l),
        }
    }

    fn pairs(ps: &[(&str, &str)]) -> Vec<(String, String)> {
        ps.iter().map(|&(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn scalars() {
        assert_eq!(fields(true), vec!["true"]);
        assert_eq!(fields(-42i32), vec!["-42"]);
        assert_eq!(fields(u64::MAX), vec!["18446744073709551615"]);
        assert_eq!(fields(1.5f64), vec!["1.5"]);
        assert_eq!(fields(3.0f64), vec!["3"]);
        assert_eq!(fields(0.1f32), vec!["0.1"]);
        assert_eq!(fields('x'), vec!["x"]);
        assert_eq!(fields("foo"), vec!["foo"]);
    }

    #[test]
    fn options_and_units() {
        assert_eq!(fields(None::<i32>), vec![""]);
        assert_eq!(fields(Some(5)), vec!["5"]);
        assert_eq!(fields(()), vec![""]);
        assert_eq!(fields((1, None::<u8>, "x")), vec!["1", "", "x"]);
    }

    #[test]
    fn sequences() {
        assert_eq!(fields(vec!["a", "b"]), vec!["a", "b"]);
        assert_eq!(fields(("a", 1, 2.5)), vec!["a", "1", "2.5"]);

        #[derive(Serialize)]
        struct Pair(&'static str, u8);
        assert_eq!(fields(Pair("x", 7)), vec!["x", "7"]);
    }

    #[test]
    fn enums() {
        #[derive(Serialize)]
        enum Kind {
            Small,
            Sized(u32),
            Pair(u8, u8),
        }
        assert_eq!(fields(Kind::Small), vec!["Small"]);
        assert_eq!(fields(Kind::Sized(9)), vec!["9"]);
        assert_eq!(fields(Kind::Pair(1, 2)), vec!["1", "2"]);
        assert_eq!(fields(vec![Kind::Small, Kind::Sized(3)]), vec!["Small", "3"]);
    }

    #[test]
    fn structs() {
        #[derive(Serialize)]
        struct Row {
            id: u32,
            label: &'static str,
            description: Option<String>,
        }
        let row = Row { id: 1, label: "te,st1", description: None };
        assert_eq!(
            named(row),
            pairs(&[("id", "1"), ("label", "te,st1"), ("description", "")])
        );
    }

    #[test]
    fn maps() {
        let mut map = BTreeMap::new();
        map.insert(2, "b");
        map.insert(1, "a");
        assert_eq!(named(map), pairs(&[("1", "a"), ("2", "b")]));
    }

    #[test]
    fn nested_containers_fail() {
        let err = to_record(&vec![vec![1, 2]]).unwrap_err();
        match err {
            Error::Serialize(ref msg) => assert!(msg.contains("container")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
