//! Streaming JSON events.
//!
//! [`drive`] walks a JSON byte stream once, in document order, and reports
//! what it sees to a [`DocumentBuilder`]: a container starting at some
//! nesting depth, a scalar, and a finished value being attached to its parent
//! under a key (objects) or positionally (arrays). The builder decides what
//! each value means; the driver never materializes a generic JSON tree.

use std::fmt;
use std::io::{BufReader, Read};

use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};

use super::error::ScanError;

/// Key under which serde_json (with `arbitrary_precision`) hands a number
/// to `visit_map`; the value is the number's source text.
const NUMBER_TOKEN: &str = "$serde_json::private::Number";

/// Kind of container being opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Object,
    Array,
}

/// A decoded scalar. Numbers keep their source text exactly (`1.0`, `1e2`,
/// and integers of any length).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar<'a> {
    String(&'a str),
    Number(&'a str),
    Bool(bool),
    Null,
}

/// Consumer of the event stream produced by [`drive`].
pub trait DocumentBuilder {
    /// Opaque handle for a value under construction.
    type Node;

    /// A container opens at `depth` (the root value is depth 0).
    fn begin(&mut self, depth: usize, shape: Shape) -> Self::Node;

    /// A scalar was read. Returning `None` drops the value.
    fn scalar(&mut self, value: Scalar<'_>) -> Option<Self::Node>;

    /// A completed child is attached to `parent`, under `key` for object
    /// members and without a key for array elements. An error stops the
    /// walk and is returned from [`drive`] unchanged.
    fn attach(
        &mut self,
        parent: &mut Self::Node,
        key: Option<&str>,
        value: Option<Self::Node>,
    ) -> Result<(), ScanError>;
}

/// Feed the JSON document in `reader` to `builder`, returning the handle of
/// the root value. Trailing content after the root value is an error.
pub fn drive<R, B>(reader: R, builder: &mut B) -> Result<Option<B::Node>, ScanError>
where
    R: Read,
    B: DocumentBuilder,
{
    let mut failure = None;
    let mut de = serde_json::Deserializer::from_reader(BufReader::new(reader));

    let seed = NodeSeed {
        builder,
        failure: &mut failure,
        depth: 0,
    };
    let root = match seed.deserialize(&mut de) {
        Ok(root) => root,
        Err(err) => return Err(failure.unwrap_or_else(|| classify(err))),
    };
    de.end().map_err(classify)?;

    Ok(root)
}

fn classify(err: serde_json::Error) -> ScanError {
    if err.is_io() {
        ScanError::BodyRead(err.into())
    } else {
        ScanError::MalformedResponse(err)
    }
}

struct NodeSeed<'a, B> {
    builder: &'a mut B,
    failure: &'a mut Option<ScanError>,
    depth: usize,
}

impl<'a, B: DocumentBuilder> NodeSeed<'a, B> {
    fn child(&mut self) -> NodeSeed<'_, B> {
        NodeSeed {
            builder: &mut *self.builder,
            failure: &mut *self.failure,
            depth: self.depth + 1,
        }
    }

    fn attach<E: de::Error>(
        &mut self,
        parent: &mut B::Node,
        key: Option<&str>,
        value: Option<B::Node>,
    ) -> Result<(), E> {
        self.builder.attach(parent, key, value).map_err(|err| {
            *self.failure = Some(err);
            E::custom("document builder rejected a value")
        })
    }
}

impl<'de, 'a, B: DocumentBuilder> DeserializeSeed<'de> for NodeSeed<'a, B> {
    type Value = Option<B::Node>;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

impl<'de, 'a, B: DocumentBuilder> Visitor<'de> for NodeSeed<'a, B> {
    type Value = Option<B::Node>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E> {
        Ok(self.builder.scalar(Scalar::Bool(v)))
    }

    // Plain integers that fit 64 bits still arrive typed; their text is
    // unchanged by the round trip. Everything else comes through visit_map.
    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
        Ok(self.builder.scalar(Scalar::Number(&v.to_string())))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
        Ok(self.builder.scalar(Scalar::Number(&v.to_string())))
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> {
        Ok(self.builder.scalar(Scalar::String(v)))
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(self.builder.scalar(Scalar::Null))
    }

    fn visit_map<A>(mut self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut key = map.next_key::<String>()?;
        if key.as_deref() == Some(NUMBER_TOKEN) {
            let text: String = map.next_value()?;
            return Ok(self.builder.scalar(Scalar::Number(&text)));
        }

        let mut node = self.builder.begin(self.depth, Shape::Object);
        while let Some(name) = key {
            let value = map.next_value_seed(self.child())?;
            self.attach(&mut node, Some(&name), value)?;
            key = map.next_key()?;
        }
        Ok(Some(node))
    }

    fn visit_seq<A>(mut self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut node = self.builder.begin(self.depth, Shape::Array);
        while let Some(value) = seq.next_element_seed(self.child())? {
            self.attach(&mut node, None, value)?;
        }
        Ok(Some(node))
    }
}
