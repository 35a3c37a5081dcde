//! The binary codec: marshals [`Value`]s to and from the exact byte layout
//! described by a [`BpfType`].
//!
//! Buffers use the native byte order, matching what the kernel side writes
//! into shared maps on the same machine. Every encode zero-initializes the
//! target region first, so padding and unused union bytes are always zero.

#[cfg(test)]
mod tests;

use crate::layout::{BpfType, EnumType, IntType, IntWidth, StrType, StructType, UnionType};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::trace;

/// A host-side value to marshal. The variant must match the kind of the
/// [`BpfType`] it is encoded against.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Signed(i64),
    Unsigned(u64),
    Str(String),
    Array(Vec<Value>),
    /// Struct member values in declaration order.
    Struct(Vec<Value>),
    Union(UnionValue),
    /// An enumerator referenced by name.
    Enum(String),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Value {
        Value::Str(s.into())
    }

    pub fn enumerator(name: impl Into<String>) -> Value {
        Value::Enum(name.into())
    }

    pub fn as_signed(&self) -> Option<i64> {
        match self {
            Value::Signed(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_unsigned(&self) -> Option<u64> {
        match self {
            Value::Unsigned(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Signed(_) => "signed integer",
            Value::Unsigned(_) => "unsigned integer",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
            Value::Union(_) => "union",
            Value::Enum(_) => "enumerator",
        }
    }
}

/// The value of a union: per-member values plus the member selected for
/// encoding. Decoding fills in every member that parses and leaves the
/// selection empty, since the bytes alone cannot tell which alternative was
/// written.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnionValue {
    members: BTreeMap<String, Value>,
    current: Option<String>,
}

impl UnionValue {
    pub fn new() -> UnionValue {
        UnionValue::default()
    }

    /// A union value with a single member, selected for encoding.
    pub fn of(name: impl Into<String>, value: Value) -> UnionValue {
        let name = name.into();
        let mut members = BTreeMap::new();
        members.insert(name.clone(), value);
        UnionValue {
            members,
            current: Some(name),
        }
    }

    /// Stores a member value and selects it for encoding.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        self.members.insert(name.clone(), value);
        self.current = Some(name);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.members.get(name)
    }

    /// The member selected for encoding, if any.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn members(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.members.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// An error raised while encoding or decoding a value.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("value {value} is out of range for `{type_name}`")]
    OutOfRange { type_name: String, value: String },
    #[error("invalid encoding for `{type_name}`: {reason}")]
    InvalidEncoding { type_name: String, reason: String },
    #[error("type mismatch for `{type_name}`: expected {expected}, found {found}")]
    TypeMismatch {
        type_name: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("buffer for `{type_name}` must be {expected} bytes, found {found}")]
    BufferSize {
        type_name: String,
        expected: usize,
        found: usize,
    },
    #[error("array for `{type_name}` must have {expected} elements, found {found}")]
    LengthMismatch {
        type_name: String,
        expected: usize,
        found: usize,
    },
    #[error("union `{type_name}` has no member selected for encoding")]
    NoActiveMember { type_name: String },
    #[error("`{type_name}` has no member `{member}`")]
    UnknownMember { type_name: String, member: String },
    #[error("no value provided for member `{member}` of `{type_name}`")]
    MissingMember { type_name: String, member: String },
}

impl BpfType {
    /// Encodes `value` into a freshly allocated buffer of exactly
    /// [`BpfType::size`] bytes.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        encode(self, value)
    }

    /// Decodes a buffer of exactly [`BpfType::size`] bytes.
    pub fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        decode(self, bytes)
    }
}

/// Encodes `value` into a freshly allocated buffer of exactly `ty.size()`
/// bytes.
pub fn encode(ty: &BpfType, value: &Value) -> Result<Vec<u8>, CodecError> {
    let mut buf = vec![0u8; ty.size()];
    encode_into(ty, value, &mut buf)?;
    Ok(buf)
}

/// Encodes `value` into `buf`, which must be exactly `ty.size()` bytes. The
/// whole buffer is zeroed before writing, so padding bytes are deterministic.
pub fn encode_into(ty: &BpfType, value: &Value, buf: &mut [u8]) -> Result<(), CodecError> {
    if buf.len() != ty.size() {
        return Err(CodecError::BufferSize {
            type_name: ty.name(),
            expected: ty.size(),
            found: buf.len(),
        });
    }
    trace!(type_name = %ty.name(), size = ty.size(), "encoding value");
    buf.fill(0);
    write_value(ty, value, buf)
}

/// Decodes a buffer of exactly `ty.size()` bytes into a [`Value`].
pub fn decode(ty: &BpfType, bytes: &[u8]) -> Result<Value, CodecError> {
    if bytes.len() != ty.size() {
        return Err(CodecError::BufferSize {
            type_name: ty.name(),
            expected: ty.size(),
            found: bytes.len(),
        });
    }
    trace!(type_name = %ty.name(), size = ty.size(), "decoding value");
    read_value(ty, bytes)
}

fn write_value(ty: &BpfType, value: &Value, buf: &mut [u8]) -> Result<(), CodecError> {
    match ty {
        BpfType::Int(int) => write_int(ty, int, value, buf),
        BpfType::Str(s) => write_str(ty, s, value, buf),
        BpfType::Array(arr) => match value {
            Value::Array(items) => {
                if items.len() != arr.len() {
                    return Err(CodecError::LengthMismatch {
                        type_name: ty.name(),
                        expected: arr.len(),
                        found: items.len(),
                    });
                }
                let elem_size = arr.elem().size();
                for (index, item) in items.iter().enumerate() {
                    let offset = arr.offset_at(index);
                    write_value(arr.elem(), item, &mut buf[offset..offset + elem_size])?;
                }
                Ok(())
            }
            other => Err(mismatch(ty, "array", other)),
        },
        BpfType::Struct(st) => write_struct(ty, st, value, buf),
        BpfType::Union(un) => write_union(ty, un, value, buf),
        BpfType::Typedef(td) => write_value(td.inner(), value, buf),
        BpfType::Enum(en) => write_enum(ty, en, value, buf),
    }
}

fn read_value(ty: &BpfType, bytes: &[u8]) -> Result<Value, CodecError> {
    match ty {
        BpfType::Int(int) => Ok(read_int(int, bytes)),
        BpfType::Str(s) => read_str(ty, s, bytes),
        BpfType::Array(arr) => {
            let elem_size = arr.elem().size();
            let mut items = Vec::with_capacity(arr.len());
            for index in 0..arr.len() {
                let offset = arr.offset_at(index);
                items.push(read_value(arr.elem(), &bytes[offset..offset + elem_size])?);
            }
            Ok(Value::Array(items))
        }
        BpfType::Struct(st) => read_struct(st, bytes),
        BpfType::Union(un) => Ok(read_union(un, bytes)),
        BpfType::Typedef(td) => read_value(td.inner(), bytes),
        BpfType::Enum(en) => read_enum(ty, en, bytes),
    }
}

fn mismatch(ty: &BpfType, expected: &'static str, found: &Value) -> CodecError {
    CodecError::TypeMismatch {
        type_name: ty.name(),
        expected,
        found: found.kind(),
    }
}

fn write_int(ty: &BpfType, int: &IntType, value: &Value, buf: &mut [u8]) -> Result<(), CodecError> {
    if int.signed() {
        let v = match value {
            Value::Signed(v) => *v,
            other => return Err(mismatch(ty, "signed integer", other)),
        };
        if v < int.min_signed() || v > int.max_unsigned() as i64 {
            return Err(CodecError::OutOfRange {
                type_name: ty.name(),
                value: v.to_string(),
            });
        }
        match int.width() {
            IntWidth::W8 => buf.copy_from_slice(&(v as i8).to_ne_bytes()),
            IntWidth::W16 => buf.copy_from_slice(&(v as i16).to_ne_bytes()),
            IntWidth::W32 => buf.copy_from_slice(&(v as i32).to_ne_bytes()),
            IntWidth::W64 => buf.copy_from_slice(&v.to_ne_bytes()),
        }
    } else {
        let v = match value {
            Value::Unsigned(v) => *v,
            other => return Err(mismatch(ty, "unsigned integer", other)),
        };
        if v > int.max_unsigned() {
            return Err(CodecError::OutOfRange {
                type_name: ty.name(),
                value: v.to_string(),
            });
        }
        match int.width() {
            IntWidth::W8 => buf.copy_from_slice(&(v as u8).to_ne_bytes()),
            IntWidth::W16 => buf.copy_from_slice(&(v as u16).to_ne_bytes()),
            IntWidth::W32 => buf.copy_from_slice(&(v as u32).to_ne_bytes()),
            IntWidth::W64 => buf.copy_from_slice(&v.to_ne_bytes()),
        }
    }
    Ok(())
}

fn read_int(int: &IntType, bytes: &[u8]) -> Value {
    if int.signed() {
        let v = match int.width() {
            IntWidth::W8 => i8::from_ne_bytes(read_array(bytes)) as i64,
            IntWidth::W16 => i16::from_ne_bytes(read_array(bytes)) as i64,
            IntWidth::W32 => i32::from_ne_bytes(read_array(bytes)) as i64,
            IntWidth::W64 => i64::from_ne_bytes(read_array(bytes)),
        };
        Value::Signed(v)
    } else {
        let v = match int.width() {
            IntWidth::W8 => u8::from_ne_bytes(read_array(bytes)) as u64,
            IntWidth::W16 => u16::from_ne_bytes(read_array(bytes)) as u64,
            IntWidth::W32 => u32::from_ne_bytes(read_array(bytes)) as u64,
            IntWidth::W64 => u64::from_ne_bytes(read_array(bytes)),
        };
        Value::Unsigned(v)
    }
}

fn read_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

fn write_str(ty: &BpfType, s: &StrType, value: &Value, buf: &mut [u8]) -> Result<(), CodecError> {
    let text = match value {
        Value::Str(text) => text,
        other => return Err(mismatch(ty, "string", other)),
    };
    // Keep the last byte for the terminator; longer content is truncated.
    let limit = s.capacity() - 1;
    let copy = text.as_bytes().len().min(limit);
    buf[..copy].copy_from_slice(&text.as_bytes()[..copy]);
    Ok(())
}

fn read_str(ty: &BpfType, s: &StrType, bytes: &[u8]) -> Result<Value, CodecError> {
    let end = bytes
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(s.capacity());
    let text = std::str::from_utf8(&bytes[..end]).map_err(|err| CodecError::InvalidEncoding {
        type_name: ty.name(),
        reason: err.to_string(),
    })?;
    Ok(Value::Str(text.to_string()))
}

fn write_struct(
    ty: &BpfType,
    st: &StructType,
    value: &Value,
    buf: &mut [u8],
) -> Result<(), CodecError> {
    for (index, member) in st.members().iter().enumerate() {
        let member_value = match member.accessor() {
            Some(accessor) => accessor(value).ok_or_else(|| CodecError::MissingMember {
                type_name: ty.name(),
                member: member.name.clone(),
            })?,
            None => match value {
                Value::Struct(fields) => {
                    fields.get(index).cloned().ok_or_else(|| CodecError::MissingMember {
                        type_name: ty.name(),
                        member: member.name.clone(),
                    })?
                }
                other => return Err(mismatch(ty, "struct", other)),
            },
        };
        let size = member.ty.size();
        write_value(
            &member.ty,
            &member_value,
            &mut buf[member.offset..member.offset + size],
        )?;
    }
    Ok(())
}

fn read_struct(st: &StructType, bytes: &[u8]) -> Result<Value, CodecError> {
    let mut fields = Vec::with_capacity(st.members().len());
    for member in st.members() {
        let size = member.ty.size();
        fields.push(read_value(
            &member.ty,
            &bytes[member.offset..member.offset + size],
        )?);
    }
    match st.constructor() {
        Some(constructor) => Ok(constructor(fields)),
        None => Ok(Value::Struct(fields)),
    }
}

fn write_union(
    ty: &BpfType,
    un: &UnionType,
    value: &Value,
    buf: &mut [u8],
) -> Result<(), CodecError> {
    let union_value = match value {
        Value::Union(u) => u,
        other => return Err(mismatch(ty, "union", other)),
    };
    let current = union_value
        .current()
        .ok_or_else(|| CodecError::NoActiveMember {
            type_name: ty.name(),
        })?;
    let member = un.member(current).ok_or_else(|| CodecError::UnknownMember {
        type_name: ty.name(),
        member: current.to_string(),
    })?;
    let member_value = union_value
        .get(current)
        .ok_or_else(|| CodecError::MissingMember {
            type_name: ty.name(),
            member: current.to_string(),
        })?;
    let size = member.ty.size();
    write_value(&member.ty, member_value, &mut buf[..size])
}

fn read_union(un: &UnionType, bytes: &[u8]) -> Value {
    // Every alternative that parses is reported; undecodable ones are
    // skipped rather than failing the whole union.
    let mut out = UnionValue::new();
    for member in un.members() {
        let size = member.ty.size();
        if let Ok(value) = read_value(&member.ty, &bytes[..size]) {
            out.members.insert(member.name.clone(), value);
        }
    }
    out.current = None;
    Value::Union(out)
}

fn write_enum(ty: &BpfType, en: &EnumType, value: &Value, buf: &mut [u8]) -> Result<(), CodecError> {
    let name = match value {
        Value::Enum(name) => name,
        other => return Err(mismatch(ty, "enumerator", other)),
    };
    let raw = en.value_of(name).ok_or_else(|| CodecError::OutOfRange {
        type_name: ty.name(),
        value: format!("`{name}`"),
    })?;
    let backing_value = if en.backing().signed() {
        Value::Signed(raw)
    } else {
        Value::Unsigned(raw as u64)
    };
    write_int(ty, en.backing(), &backing_value, buf)
}

fn read_enum(ty: &BpfType, en: &EnumType, bytes: &[u8]) -> Result<Value, CodecError> {
    let raw = match read_int(en.backing(), bytes) {
        Value::Signed(v) => v,
        Value::Unsigned(v) => v as i64,
        _ => unreachable!("integers decode to integer values"),
    };
    let name = en.name_of(raw).ok_or_else(|| CodecError::InvalidEncoding {
        type_name: ty.name(),
        reason: format!("no enumerator with value {raw}"),
    })?;
    Ok(Value::Enum(name.to_string()))
}
