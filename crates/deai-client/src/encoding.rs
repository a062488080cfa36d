//! Candid encoding of loosely typed call arguments.
//!
//! Arguments arrive as `tag:payload` pairs, e.g. `text:Where is Poland?` or
//! `nat8:5`, and are turned into [`IDLValue`]s before being serialized.

use crate::error::{Error, Result};
use candid::parser::value::{IDLArgs, IDLValue};
use candid::{Int, Nat, Principal};
use log::trace;
use std::fmt::Display;
use std::str::FromStr;
use strum::VariantNames as _;
use strum::{Display as StrumDisplay, EnumString, EnumVariantNames};

#[derive(Clone, Copy, Debug, Eq, PartialEq, StrumDisplay, EnumString, EnumVariantNames)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Tag {
    Null,
    Bool,
    Nat,
    Int,
    Nat8,
    Nat16,
    Nat32,
    Nat64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Text,
    Principal,
    Reserved,
    Empty,
}

impl Tag {
    /// Parses a tag name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Result<Self> {
        Self::from_str(name.trim()).map_err(|_| {
            Error::InvalidArgument(format!(
                "unknown type tag {:?}, expected one of: {}",
                name,
                Self::VARIANTS.join(", ")
            ))
        })
    }

    /// Whether values of this tag are written without a payload.
    pub fn is_unit(self) -> bool {
        matches!(self, Tag::Null | Tag::Reserved)
    }

    /// Whether a decoded value inhabits this tag.
    pub fn matches(self, value: &IDLValue) -> bool {
        matches!(
            (self, value),
            (Tag::Null, IDLValue::Null)
                | (Tag::Bool, IDLValue::Bool(_))
                | (Tag::Nat, IDLValue::Nat(_))
                | (Tag::Int, IDLValue::Int(_))
                | (Tag::Nat8, IDLValue::Nat8(_))
                | (Tag::Nat16, IDLValue::Nat16(_))
                | (Tag::Nat32, IDLValue::Nat32(_))
                | (Tag::Nat64, IDLValue::Nat64(_))
                | (Tag::Int8, IDLValue::Int8(_))
                | (Tag::Int16, IDLValue::Int16(_))
                | (Tag::Int32, IDLValue::Int32(_))
                | (Tag::Int64, IDLValue::Int64(_))
                | (Tag::Float32, IDLValue::Float32(_))
                | (Tag::Float64, IDLValue::Float64(_))
                | (Tag::Text, IDLValue::Text(_))
                | (Tag::Principal, IDLValue::Principal(_))
                | (Tag::Reserved, IDLValue::Reserved)
        )
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TaggedValue {
    pub tag: Tag,
    pub value: Option<String>,
}

impl TaggedValue {
    pub fn new(tag: Tag, value: impl Into<String>) -> Self {
        Self {
            tag,
            value: Some(value.into()),
        }
    }

    pub fn unit(tag: Tag) -> Self {
        Self { tag, value: None }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::new(Tag::Text, value)
    }

    /// Parses `tag:payload`. Only the first `:` separates, so text payloads
    /// may contain colons.
    pub fn parse(input: &str) -> Result<Self> {
        let (tag, value) = match input.split_once(':') {
            Some((tag, value)) => (tag, Some(value.to_string())),
            None => (input, None),
        };

        let tag = Tag::from_name(tag)?;

        match (tag.is_unit(), value) {
            (true, Some(value)) if !value.is_empty() => Err(Error::InvalidArgument(format!(
                "{} does not take a value, got {:?}",
                tag, value
            ))),
            (true, _) => Ok(Self::unit(tag)),
            (false, Some(value)) => Ok(Self::new(tag, value)),
            (false, None) => Err(Error::InvalidArgument(format!("{} requires a value", tag))),
        }
    }

    pub fn to_idl_value(&self) -> Result<IDLValue> {
        let payload = || {
            self.value
                .as_deref()
                .ok_or_else(|| Error::InvalidArgument(format!("{} requires a value", self.tag)))
        };

        let value = match self.tag {
            Tag::Null => IDLValue::Null,
            Tag::Reserved => IDLValue::Reserved,
            Tag::Empty => {
                return Err(Error::InvalidArgument(
                    "empty has no values and cannot be encoded".to_string(),
                ))
            }
            Tag::Bool => IDLValue::Bool(number(self.tag, payload()?)?),
            Tag::Nat => IDLValue::Nat(number::<Nat>(self.tag, payload()?)?),
            Tag::Int => IDLValue::Int(number::<Int>(self.tag, payload()?)?),
            Tag::Nat8 => IDLValue::Nat8(number(self.tag, payload()?)?),
            Tag::Nat16 => IDLValue::Nat16(number(self.tag, payload()?)?),
            Tag::Nat32 => IDLValue::Nat32(number(self.tag, payload()?)?),
            Tag::Nat64 => IDLValue::Nat64(number(self.tag, payload()?)?),
            Tag::Int8 => IDLValue::Int8(number(self.tag, payload()?)?),
            Tag::Int16 => IDLValue::Int16(number(self.tag, payload()?)?),
            Tag::Int32 => IDLValue::Int32(number(self.tag, payload()?)?),
            Tag::Int64 => IDLValue::Int64(number(self.tag, payload()?)?),
            Tag::Float32 => IDLValue::Float32(number(self.tag, payload()?)?),
            Tag::Float64 => IDLValue::Float64(number(self.tag, payload()?)?),
            Tag::Text => IDLValue::Text(payload()?.to_string()),
            Tag::Principal => {
                let text = payload()?;
                let principal = Principal::from_text(text).map_err(|err| Error::Principal {
                    text: text.to_string(),
                    reason: err.to_string(),
                })?;
                IDLValue::Principal(principal)
            }
        };

        Ok(value)
    }
}

impl FromStr for TaggedValue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn number<T>(tag: Tag, payload: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    payload
        .trim()
        .parse::<T>()
        .map_err(|err| Error::InvalidArgument(format!("invalid {} {:?}: {}", tag, payload, err)))
}

/// Serializes the argument tuple. An empty slice yields the encoding of `()`.
pub fn encode(values: &[TaggedValue]) -> Result<Vec<u8>> {
    let values = values
        .iter()
        .map(TaggedValue::to_idl_value)
        .collect::<Result<Vec<_>>>()?;

    let args = IDLArgs::new(&values);
    trace!("encode: {}", args);

    Ok(args.to_bytes()?)
}

/// Deserializes a reply, checking it against `return_types` when given.
///
/// The single return type `empty` stands for a reply without values.
pub fn decode(bytes: &[u8], return_types: Option<&[Tag]>) -> Result<IDLArgs> {
    let args = IDLArgs::from_bytes(bytes)?;
    trace!("decode: {}", args);

    if let Some(return_types) = return_types {
        check(&args, return_types)?;
    }

    Ok(args)
}

fn check(args: &IDLArgs, return_types: &[Tag]) -> Result<()> {
    if matches!(return_types, [Tag::Empty]) {
        return if args.args.is_empty() {
            Ok(())
        } else {
            Err(Error::UnexpectedReturn(format!("expected no values, got {}", args)))
        };
    }

    if args.args.len() != return_types.len() {
        return Err(Error::UnexpectedReturn(format!(
            "expected {} value(s), got {}",
            return_types.len(),
            args
        )));
    }

    return_types
        .iter()
        .zip(&args.args)
        .try_for_each(|(tag, value)| {
            if tag.matches(value) {
                Ok(())
            } else {
                Err(Error::UnexpectedReturn(format!("expected {}, got {}", tag, value)))
            }
        })
}
