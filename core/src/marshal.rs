//! Flattens a typed request into URL query parameters.
//!
//! # Design
//! [`to_params`] drives a request's `Serialize` impl through a purpose-built
//! serializer, so the field-to-key mapping is declared once on the struct
//! with ordinary serde attributes: `rename` picks the wire key, `skip` hides
//! a field from marshaling entirely, `flatten` folds an embedded struct's
//! fields into the parent map. There is no runtime reflection.
//!
//! Encoding rules:
//! - strings, integers, booleans and chars encode as their plain text form;
//! - sequences of scalars encode as a compact JSON array string, e.g.
//!   `["value 1","value 2"]` or `[1,2,3]`;
//! - `Option::None` fields are omitted;
//! - floats, maps and non-flattened nested structs are rejected with an
//!   error naming the offending field.
//!
//! Two fields resolving to the same key is a bug in the request definition;
//! the marshaler fails with [`MarshalError::DuplicateKey`] instead of
//! silently overwriting.

use std::collections::BTreeMap;

use serde::ser::{self, Impossible, Serialize};

use crate::error::MarshalError;

/// Flat parameter map produced by [`to_params`], keyed by wire name.
pub type Params = BTreeMap<String, String>;

/// Marshal `value` into a flat query-parameter map.
pub fn to_params<T>(value: &T) -> Result<Params, MarshalError>
where
    T: Serialize + ?Sized,
{
    let mut params = Params::new();
    value.serialize(TopSerializer {
        params: &mut params,
    })?;
    Ok(params)
}

fn insert_param(params: &mut Params, key: &str, value: String) -> Result<(), MarshalError> {
    if params.contains_key(key) {
        return Err(MarshalError::DuplicateKey(key.to_string()));
    }
    params.insert(key.to_string(), value);
    Ok(())
}

/// Accepts the request struct itself. Only structs (and maps, which is how
/// serde drives structs containing `flatten` fields) are valid at this level.
struct TopSerializer<'a> {
    params: &'a mut Params,
}

macro_rules! top_level_scalar {
    ($method:ident, $ty:ty, $kind:literal) => {
        fn $method(self, _v: $ty) -> Result<(), MarshalError> {
            Err(MarshalError::NotAStruct($kind))
        }
    };
}

impl<'a> ser::Serializer for TopSerializer<'a> {
    type Ok = ();
    type Error = MarshalError;

    type SerializeSeq = Impossible<(), MarshalError>;
    type SerializeTuple = Impossible<(), MarshalError>;
    type SerializeTupleStruct = Impossible<(), MarshalError>;
    type SerializeTupleVariant = Impossible<(), MarshalError>;
    type SerializeMap = MapCollector<'a>;
    type SerializeStruct = StructCollector<'a>;
    type SerializeStructVariant = Impossible<(), MarshalError>;

    top_level_scalar!(serialize_bool, bool, "a bool");
    top_level_scalar!(serialize_i8, i8, "an integer");
    top_level_scalar!(serialize_i16, i16, "an integer");
    top_level_scalar!(serialize_i32, i32, "an integer");
    top_level_scalar!(serialize_i64, i64, "an integer");
    top_level_scalar!(serialize_u8, u8, "an integer");
    top_level_scalar!(serialize_u16, u16, "an integer");
    top_level_scalar!(serialize_u32, u32, "an integer");
    top_level_scalar!(serialize_u64, u64, "an integer");
    top_level_scalar!(serialize_f32, f32, "a float");
    top_level_scalar!(serialize_f64, f64, "a float");
    top_level_scalar!(serialize_char, char, "a char");

    fn serialize_str(self, _v: &str) -> Result<(), MarshalError> {
        Err(MarshalError::NotAStruct("a string"))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<(), MarshalError> {
        Err(MarshalError::NotAStruct("raw bytes"))
    }

    fn serialize_none(self) -> Result<(), MarshalError> {
        Err(MarshalError::NotAStruct("an option"))
    }

    fn serialize_some<T>(self, value: &T) -> Result<(), MarshalError>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), MarshalError> {
        Err(MarshalError::NotAStruct("a unit"))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), MarshalError> {
        // a request without parameters marshals to an empty map
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
    ) -> Result<(), MarshalError> {
        Err(MarshalError::NotAStruct("an enum variant"))
    }

    fn serialize_newtype_struct<T>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), MarshalError>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<(), MarshalError>
    where
        T: Serialize + ?Sized,
    {
        Err(MarshalError::NotAStruct("an enum variant"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, MarshalError> {
        Err(MarshalError::NotAStruct("a sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, MarshalError> {
        Err(MarshalError::NotAStruct("a tuple"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, MarshalError> {
        Err(MarshalError::NotAStruct("a tuple struct"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, MarshalError> {
        Err(MarshalError::NotAStruct("an enum variant"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, MarshalError> {
        Ok(MapCollector {
            params: self.params,
            pending_key: None,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, MarshalError> {
        Ok(StructCollector {
            params: self.params,
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, MarshalError> {
        Err(MarshalError::NotAStruct("an enum variant"))
    }
}

struct StructCollector<'a> {
    params: &'a mut Params,
}

impl ser::SerializeStruct for StructCollector<'_> {
    type Ok = ();
    type Error = MarshalError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), MarshalError>
    where
        T: Serialize + ?Sized,
    {
        if let Some(encoded) = value.serialize(ValueSerializer { field: key })? {
            insert_param(self.params, key, encoded)?;
        }
        Ok(())
    }

    fn end(self) -> Result<(), MarshalError> {
        Ok(())
    }
}

/// Entry collector for the `serialize_map` path, which serde uses for any
/// struct containing a `flatten` field.
struct MapCollector<'a> {
    params: &'a mut Params,
    pending_key: Option<String>,
}

impl ser::SerializeMap for MapCollector<'_> {
    type Ok = ();
    type Error = MarshalError;

    fn serialize_key<T>(&mut self, key: &T) -> Result<(), MarshalError>
    where
        T: Serialize + ?Sized,
    {
        self.pending_key = Some(key.serialize(KeySerializer)?);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<(), MarshalError>
    where
        T: Serialize + ?Sized,
    {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| MarshalError::Message("map value emitted before its key".to_string()))?;
        if let Some(encoded) = value.serialize(ValueSerializer { field: &key })? {
            insert_param(self.params, &key, encoded)?;
        }
        Ok(())
    }

    fn end(self) -> Result<(), MarshalError> {
        Ok(())
    }
}

/// Keys can only be plain strings (struct field names after `rename`).
struct KeySerializer;

macro_rules! reject_key {
    ($method:ident, $ty:ty) => {
        fn $method(self, _v: $ty) -> Result<String, MarshalError> {
            Err(MarshalError::Message(
                "parameter keys must be strings".to_string(),
            ))
        }
    };
}

impl ser::Serializer for KeySerializer {
    type Ok = String;
    type Error = MarshalError;

    type SerializeSeq = Impossible<String, MarshalError>;
    type SerializeTuple = Impossible<String, MarshalError>;
    type SerializeTupleStruct = Impossible<String, MarshalError>;
    type SerializeTupleVariant = Impossible<String, MarshalError>;
    type SerializeMap = Impossible<String, MarshalError>;
    type SerializeStruct = Impossible<String, MarshalError>;
    type SerializeStructVariant = Impossible<String, MarshalError>;

    fn serialize_str(self, v: &str) -> Result<String, MarshalError> {
        Ok(v.to_string())
    }

    reject_key!(serialize_bool, bool);
    reject_key!(serialize_i8, i8);
    reject_key!(serialize_i16, i16);
    reject_key!(serialize_i32, i32);
    reject_key!(serialize_i64, i64);
    reject_key!(serialize_u8, u8);
    reject_key!(serialize_u16, u16);
    reject_key!(serialize_u32, u32);
    reject_key!(serialize_u64, u64);
    reject_key!(serialize_f32, f32);
    reject_key!(serialize_f64, f64);
    reject_key!(serialize_char, char);

    fn serialize_bytes(self, _v: &[u8]) -> Result<String, MarshalError> {
        Err(MarshalError::Message(
            "parameter keys must be strings".to_string(),
        ))
    }

    fn serialize_none(self) -> Result<String, MarshalError> {
        Err(MarshalError::Message(
            "parameter keys must be strings".to_string(),
        ))
    }

    fn serialize_some<T>(self, value: &T) -> Result<String, MarshalError>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<String, MarshalError> {
        Err(MarshalError::Message(
            "parameter keys must be strings".to_string(),
        ))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<String, MarshalError> {
        Err(MarshalError::Message(
            "parameter keys must be strings".to_string(),
        ))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<String, MarshalError> {
        Ok(variant.to_string())
    }

    fn serialize_newtype_struct<T>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<String, MarshalError>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String, MarshalError>
    where
        T: Serialize + ?Sized,
    {
        Err(MarshalError::Message(
            "parameter keys must be strings".to_string(),
        ))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, MarshalError> {
        Err(MarshalError::Message(
            "parameter keys must be strings".to_string(),
        ))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, MarshalError> {
        Err(MarshalError::Message(
            "parameter keys must be strings".to_string(),
        ))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, MarshalError> {
        Err(MarshalError::Message(
            "parameter keys must be strings".to_string(),
        ))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, MarshalError> {
        Err(MarshalError::Message(
            "parameter keys must be strings".to_string(),
        ))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, MarshalError> {
        Err(MarshalError::Message(
            "parameter keys must be strings".to_string(),
        ))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, MarshalError> {
        Err(MarshalError::Message(
            "parameter keys must be strings".to_string(),
        ))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, MarshalError> {
        Err(MarshalError::Message(
            "parameter keys must be strings".to_string(),
        ))
    }
}

/// Encodes a single field value. `Ok(None)` means "omit this field".
struct ValueSerializer<'a> {
    field: &'a str,
}

impl ValueSerializer<'_> {
    fn unsupported(&self, kind: &'static str) -> MarshalError {
        MarshalError::Unsupported {
            field: self.field.to_string(),
            kind,
        }
    }
}

macro_rules! value_to_string {
    ($method:ident, $ty:ty) => {
        fn $method(self, v: $ty) -> Result<Option<String>, MarshalError> {
            Ok(Some(v.to_string()))
        }
    };
}

impl<'a> ser::Serializer for ValueSerializer<'a> {
    type Ok = Option<String>;
    type Error = MarshalError;

    type SerializeSeq = SeqCollector<'a>;
    type SerializeTuple = Impossible<Option<String>, MarshalError>;
    type SerializeTupleStruct = Impossible<Option<String>, MarshalError>;
    type SerializeTupleVariant = Impossible<Option<String>, MarshalError>;
    type SerializeMap = Impossible<Option<String>, MarshalError>;
    type SerializeStruct = Impossible<Option<String>, MarshalError>;
    type SerializeStructVariant = Impossible<Option<String>, MarshalError>;

    value_to_string!(serialize_bool, bool);
    value_to_string!(serialize_i8, i8);
    value_to_string!(serialize_i16, i16);
    value_to_string!(serialize_i32, i32);
    value_to_string!(serialize_i64, i64);
    value_to_string!(serialize_u8, u8);
    value_to_string!(serialize_u16, u16);
    value_to_string!(serialize_u32, u32);
    value_to_string!(serialize_u64, u64);
    value_to_string!(serialize_char, char);

    fn serialize_f32(self, _v: f32) -> Result<Option<String>, MarshalError> {
        Err(self.unsupported("a floating point value"))
    }

    fn serialize_f64(self, _v: f64) -> Result<Option<String>, MarshalError> {
        Err(self.unsupported("a floating point value"))
    }

    fn serialize_str(self, v: &str) -> Result<Option<String>, MarshalError> {
        Ok(Some(v.to_string()))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<Option<String>, MarshalError> {
        Err(self.unsupported("raw bytes"))
    }

    fn serialize_none(self) -> Result<Option<String>, MarshalError> {
        Ok(None)
    }

    fn serialize_some<T>(self, value: &T) -> Result<Option<String>, MarshalError>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Option<String>, MarshalError> {
        Err(self.unsupported("a unit value"))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Option<String>, MarshalError> {
        Err(self.unsupported("a unit struct"))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Option<String>, MarshalError> {
        Ok(Some(variant.to_string()))
    }

    fn serialize_newtype_struct<T>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Option<String>, MarshalError>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Option<String>, MarshalError>
    where
        T: Serialize + ?Sized,
    {
        Err(self.unsupported("an enum variant"))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq, MarshalError> {
        Ok(SeqCollector {
            field: self.field,
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, MarshalError> {
        Err(self.unsupported("a tuple"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, MarshalError> {
        Err(self.unsupported("a tuple struct"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, MarshalError> {
        Err(self.unsupported("an enum variant"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, MarshalError> {
        Err(self.unsupported("a nested map"))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, MarshalError> {
        Err(self.unsupported("a nested struct"))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, MarshalError> {
        Err(self.unsupported("an enum variant"))
    }
}

/// Collects sequence elements as JSON scalars and renders the whole sequence
/// as one compact JSON array string.
struct SeqCollector<'a> {
    field: &'a str,
    items: Vec<serde_json::Value>,
}

impl ser::SerializeSeq for SeqCollector<'_> {
    type Ok = Option<String>;
    type Error = MarshalError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), MarshalError>
    where
        T: Serialize + ?Sized,
    {
        self.items.push(value.serialize(ScalarSerializer {
            field: self.field,
        })?);
        Ok(())
    }

    fn end(self) -> Result<Option<String>, MarshalError> {
        let rendered = serde_json::to_string(&self.items)
            .map_err(|err| MarshalError::Message(err.to_string()))?;
        Ok(Some(rendered))
    }
}

/// Sequence elements must be scalars; anything else has no defined wire form.
struct ScalarSerializer<'a> {
    field: &'a str,
}

impl ScalarSerializer<'_> {
    fn reject(&self) -> MarshalError {
        MarshalError::Unsupported {
            field: self.field.to_string(),
            kind: "a sequence of non-scalar elements",
        }
    }
}

macro_rules! scalar_to_json {
    ($method:ident, $ty:ty) => {
        fn $method(self, v: $ty) -> Result<serde_json::Value, MarshalError> {
            Ok(serde_json::Value::from(v))
        }
    };
}

impl ser::Serializer for ScalarSerializer<'_> {
    type Ok = serde_json::Value;
    type Error = MarshalError;

    type SerializeSeq = Impossible<serde_json::Value, MarshalError>;
    type SerializeTuple = Impossible<serde_json::Value, MarshalError>;
    type SerializeTupleStruct = Impossible<serde_json::Value, MarshalError>;
    type SerializeTupleVariant = Impossible<serde_json::Value, MarshalError>;
    type SerializeMap = Impossible<serde_json::Value, MarshalError>;
    type SerializeStruct = Impossible<serde_json::Value, MarshalError>;
    type SerializeStructVariant = Impossible<serde_json::Value, MarshalError>;

    scalar_to_json!(serialize_bool, bool);
    scalar_to_json!(serialize_i8, i8);
    scalar_to_json!(serialize_i16, i16);
    scalar_to_json!(serialize_i32, i32);
    scalar_to_json!(serialize_i64, i64);
    scalar_to_json!(serialize_u8, u8);
    scalar_to_json!(serialize_u16, u16);
    scalar_to_json!(serialize_u32, u32);
    scalar_to_json!(serialize_u64, u64);

    fn serialize_f32(self, _v: f32) -> Result<serde_json::Value, MarshalError> {
        Err(self.reject())
    }

    fn serialize_f64(self, _v: f64) -> Result<serde_json::Value, MarshalError> {
        Err(self.reject())
    }

    fn serialize_char(self, v: char) -> Result<serde_json::Value, MarshalError> {
        Ok(serde_json::Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<serde_json::Value, MarshalError> {
        Ok(serde_json::Value::String(v.to_string()))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<serde_json::Value, MarshalError> {
        Err(self.reject())
    }

    fn serialize_none(self) -> Result<serde_json::Value, MarshalError> {
        Err(self.reject())
    }

    fn serialize_some<T>(self, value: &T) -> Result<serde_json::Value, MarshalError>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<serde_json::Value, MarshalError> {
        Err(self.reject())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<serde_json::Value, MarshalError> {
        Err(self.reject())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<serde_json::Value, MarshalError> {
        Ok(serde_json::Value::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<serde_json::Value, MarshalError>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<serde_json::Value, MarshalError>
    where
        T: Serialize + ?Sized,
    {
        Err(self.reject())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, MarshalError> {
        Err(self.reject())
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, MarshalError> {
        Err(self.reject())
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, MarshalError> {
        Err(self.reject())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, MarshalError> {
        Err(self.reject())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, MarshalError> {
        Err(self.reject())
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, MarshalError> {
        Err(self.reject())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, MarshalError> {
        Err(self.reject())
    }
}
