//! # Primitive Formatters
//!
//! Byte-level codecs for values that are not objects: scalars, strings,
//! enums and one-dimensional arrays of scalars.
//!
//! Layout (all integers little-endian):
//! - fixed-width scalars: their `to_le_bytes` form
//! - `bool`: one byte, `0` or `1`
//! - `char`: its scalar value as `u32`
//! - `string`: `[len u32][utf-8 bytes]`
//! - enums: the value at the width of the underlying integral type
//! - numeric arrays: `[len u32]` followed by ONE contiguous block
//! - string arrays: `[len u32]` followed by `len` strings
//!
//! Formatters are selected once per type per session through
//! `FormatterCache`.

use crate::constants::{MAX_ARRAY_LENGTH, MAX_STRING_LENGTH};
use crate::hash::HashCode;
use crate::types::TypeDescriptor;
use crate::value::{EnumValue, Primitive, PrimitiveArray, PrimitiveKind, primitive_array_kind};
use crate::DriftError;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::io::{Read, Write};

// =============================================================================
// LOW-LEVEL HELPERS
// =============================================================================

/// Write a length prefix.
pub(crate) fn write_len(writer: &mut dyn Write, len: usize) -> Result<(), DriftError> {
    let len = u32::try_from(len).map_err(|_| {
        DriftError::SerializationError(format!("length {} exceeds the wire limit", len))
    })?;
    writer.write_all(&len.to_le_bytes())?;
    Ok(())
}

/// Read a length prefix and check it against `limit`.
pub(crate) fn read_len(reader: &mut dyn Read, limit: usize, what: &str) -> Result<usize, DriftError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    let len = u32::from_le_bytes(buf) as usize;
    if len > limit {
        return Err(DriftError::Format(format!(
            "{} length {} exceeds maximum {}",
            what, len, limit
        )));
    }
    Ok(len)
}

/// Read exactly `len` bytes without trusting `len` for the allocation.
fn read_block(reader: &mut dyn Read, len: usize) -> Result<Vec<u8>, DriftError> {
    let mut block = Vec::new();
    reader.take(len as u64).read_to_end(&mut block)?;
    if block.len() != len {
        return Err(DriftError::Format("truncated stream".to_string()));
    }
    Ok(block)
}

fn write_string(writer: &mut dyn Write, value: &str) -> Result<(), DriftError> {
    write_len(writer, value.len())?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}

fn read_string(reader: &mut dyn Read) -> Result<String, DriftError> {
    let len = read_len(reader, MAX_STRING_LENGTH, "string")?;
    let bytes = read_block(reader, len)?;
    String::from_utf8(bytes).map_err(|_| DriftError::Format("string is not valid UTF-8".to_string()))
}

fn decode_bool(byte: u8) -> Result<bool, DriftError> {
    match byte {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(DriftError::Format(format!("invalid bool byte {:#04x}", other))),
    }
}

fn decode_char(code: u32) -> Result<char, DriftError> {
    char::from_u32(code)
        .ok_or_else(|| DriftError::Format(format!("invalid char scalar {:#x}", code)))
}

/// Scalars with a fixed little-endian width.
trait FixedWidth: Sized + Copy {
    const WIDTH: usize;

    fn put(self, out: &mut Vec<u8>);

    fn read_from(reader: &mut dyn Read) -> Result<Self, DriftError>;

    /// Decode a block of exactly `n * WIDTH` bytes.
    fn from_block(block: &[u8]) -> Vec<Self>;
}

macro_rules! impl_fixed_width {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FixedWidth for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                fn put(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn read_from(reader: &mut dyn Read) -> Result<Self, DriftError> {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    reader.read_exact(&mut buf)?;
                    Ok(<$ty>::from_le_bytes(buf))
                }

                fn from_block(block: &[u8]) -> Vec<Self> {
                    block
                        .chunks_exact(Self::WIDTH)
                        .map(|chunk| {
                            let mut buf = [0u8; std::mem::size_of::<$ty>()];
                            buf.copy_from_slice(chunk);
                            <$ty>::from_le_bytes(buf)
                        })
                        .collect()
                }
            }
        )*
    };
}

impl_fixed_width!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

fn write_fixed_array<T: FixedWidth>(writer: &mut dyn Write, values: &[T]) -> Result<(), DriftError> {
    write_len(writer, values.len())?;
    let mut block = Vec::with_capacity(values.len().saturating_mul(T::WIDTH));
    for value in values {
        value.put(&mut block);
    }
    writer.write_all(&block)?;
    Ok(())
}

fn read_fixed_array<T: FixedWidth>(reader: &mut dyn Read) -> Result<Vec<T>, DriftError> {
    let len = read_len(reader, MAX_ARRAY_LENGTH, "array")?;
    let block = read_block(reader, len.saturating_mul(T::WIDTH))?;
    Ok(T::from_block(&block))
}

fn mismatch(expected: &str, found: &Primitive) -> DriftError {
    DriftError::SerializationError(format!(
        "formatter for {} cannot write {}",
        expected,
        found.descriptor()
    ))
}

// =============================================================================
// FORMATTER TRAIT
// =============================================================================

/// Writes and reads one primitive type.
pub trait Formatter: Send + Sync {
    /// Write `value`. Fails if `value` is not of this formatter's type.
    fn write(&self, writer: &mut dyn Write, value: &Primitive) -> Result<(), DriftError>;

    /// Read one value.
    fn read(&self, reader: &mut dyn Read) -> Result<Primitive, DriftError>;
}

/// Built-in scalars.
#[derive(Debug, Clone, Copy)]
pub struct ScalarFormatter(PrimitiveKind);

impl Formatter for ScalarFormatter {
    fn write(&self, writer: &mut dyn Write, value: &Primitive) -> Result<(), DriftError> {
        if value.scalar_kind() != Some(self.0) {
            return Err(mismatch(self.0.name(), value));
        }
        let mut out = Vec::with_capacity(8);
        match value {
            Primitive::Bool(v) => out.push(u8::from(*v)),
            Primitive::I8(v) => v.put(&mut out),
            Primitive::I16(v) => v.put(&mut out),
            Primitive::I32(v) => v.put(&mut out),
            Primitive::I64(v) => v.put(&mut out),
            Primitive::U8(v) => v.put(&mut out),
            Primitive::U16(v) => v.put(&mut out),
            Primitive::U32(v) => v.put(&mut out),
            Primitive::U64(v) => v.put(&mut out),
            Primitive::F32(v) => v.put(&mut out),
            Primitive::F64(v) => v.put(&mut out),
            Primitive::Char(v) => u32::from(*v).put(&mut out),
            Primitive::String(v) => return write_string(writer, v),
            Primitive::Enum(_) | Primitive::Array(_) => return Err(mismatch(self.0.name(), value)),
        }
        writer.write_all(&out)?;
        Ok(())
    }

    fn read(&self, reader: &mut dyn Read) -> Result<Primitive, DriftError> {
        Ok(match self.0 {
            PrimitiveKind::Bool => Primitive::Bool(decode_bool(u8::read_from(reader)?)?),
            PrimitiveKind::I8 => Primitive::I8(i8::read_from(reader)?),
            PrimitiveKind::I16 => Primitive::I16(i16::read_from(reader)?),
            PrimitiveKind::I32 => Primitive::I32(i32::read_from(reader)?),
            PrimitiveKind::I64 => Primitive::I64(i64::read_from(reader)?),
            PrimitiveKind::U8 => Primitive::U8(u8::read_from(reader)?),
            PrimitiveKind::U16 => Primitive::U16(u16::read_from(reader)?),
            PrimitiveKind::U32 => Primitive::U32(u32::read_from(reader)?),
            PrimitiveKind::U64 => Primitive::U64(u64::read_from(reader)?),
            PrimitiveKind::F32 => Primitive::F32(f32::read_from(reader)?),
            PrimitiveKind::F64 => Primitive::F64(f64::read_from(reader)?),
            PrimitiveKind::Char => Primitive::Char(decode_char(u32::read_from(reader)?)?),
            PrimitiveKind::String => Primitive::String(read_string(reader)?),
        })
    }
}

/// One-dimensional arrays of a built-in scalar.
#[derive(Debug, Clone, Copy)]
pub struct ArrayFormatter(PrimitiveKind);

impl Formatter for ArrayFormatter {
    fn write(&self, writer: &mut dyn Write, value: &Primitive) -> Result<(), DriftError> {
        let Primitive::Array(array) = value else {
            return Err(mismatch("array", value));
        };
        if array.kind() != self.0 {
            return Err(mismatch(self.0.name(), value));
        }
        match array {
            PrimitiveArray::Bool(values) => {
                write_len(writer, values.len())?;
                let block: Vec<u8> = values.iter().map(|v| u8::from(*v)).collect();
                writer.write_all(&block)?;
            }
            PrimitiveArray::I8(values) => write_fixed_array(writer, values)?,
            PrimitiveArray::I16(values) => write_fixed_array(writer, values)?,
            PrimitiveArray::I32(values) => write_fixed_array(writer, values)?,
            PrimitiveArray::I64(values) => write_fixed_array(writer, values)?,
            PrimitiveArray::U8(values) => write_fixed_array(writer, values)?,
            PrimitiveArray::U16(values) => write_fixed_array(writer, values)?,
            PrimitiveArray::U32(values) => write_fixed_array(writer, values)?,
            PrimitiveArray::U64(values) => write_fixed_array(writer, values)?,
            PrimitiveArray::F32(values) => write_fixed_array(writer, values)?,
            PrimitiveArray::F64(values) => write_fixed_array(writer, values)?,
            PrimitiveArray::Char(values) => {
                let codes: Vec<u32> = values.iter().map(|c| u32::from(*c)).collect();
                write_fixed_array(writer, &codes)?;
            }
            PrimitiveArray::String(values) => {
                write_len(writer, values.len())?;
                for value in values {
                    write_string(writer, value)?;
                }
            }
        }
        Ok(())
    }

    fn read(&self, reader: &mut dyn Read) -> Result<Primitive, DriftError> {
        let array = match self.0 {
            PrimitiveKind::Bool => {
                let bytes: Vec<u8> = read_fixed_array(reader)?;
                PrimitiveArray::Bool(bytes.into_iter().map(decode_bool).collect::<Result<_, _>>()?)
            }
            PrimitiveKind::I8 => PrimitiveArray::I8(read_fixed_array(reader)?),
            PrimitiveKind::I16 => PrimitiveArray::I16(read_fixed_array(reader)?),
            PrimitiveKind::I32 => PrimitiveArray::I32(read_fixed_array(reader)?),
            PrimitiveKind::I64 => PrimitiveArray::I64(read_fixed_array(reader)?),
            PrimitiveKind::U8 => PrimitiveArray::U8(read_fixed_array(reader)?),
            PrimitiveKind::U16 => PrimitiveArray::U16(read_fixed_array(reader)?),
            PrimitiveKind::U32 => PrimitiveArray::U32(read_fixed_array(reader)?),
            PrimitiveKind::U64 => PrimitiveArray::U64(read_fixed_array(reader)?),
            PrimitiveKind::F32 => PrimitiveArray::F32(read_fixed_array(reader)?),
            PrimitiveKind::F64 => PrimitiveArray::F64(read_fixed_array(reader)?),
            PrimitiveKind::Char => {
                let codes: Vec<u32> = read_fixed_array(reader)?;
                PrimitiveArray::Char(codes.into_iter().map(decode_char).collect::<Result<_, _>>()?)
            }
            PrimitiveKind::String => {
                let len = read_len(reader, MAX_ARRAY_LENGTH, "array")?;
                let mut values = Vec::new();
                for _ in 0..len {
                    values.push(read_string(reader)?);
                }
                PrimitiveArray::String(values)
            }
        };
        Ok(Primitive::Array(array))
    }
}

/// Enums, written at the width of their underlying integral type.
#[derive(Debug, Clone)]
pub struct EnumFormatter {
    descriptor: TypeDescriptor,
    underlying: PrimitiveKind,
}

impl EnumFormatter {
    fn narrow(&self, value: i64) -> Result<Primitive, DriftError> {
        let out_of_range = || {
            DriftError::SerializationError(format!(
                "enum value {} of {} does not fit {}",
                value,
                self.descriptor,
                self.underlying.name()
            ))
        };
        Ok(match self.underlying {
            PrimitiveKind::I8 => Primitive::I8(i8::try_from(value).map_err(|_| out_of_range())?),
            PrimitiveKind::I16 => Primitive::I16(i16::try_from(value).map_err(|_| out_of_range())?),
            PrimitiveKind::I32 => Primitive::I32(i32::try_from(value).map_err(|_| out_of_range())?),
            PrimitiveKind::U8 => Primitive::U8(u8::try_from(value).map_err(|_| out_of_range())?),
            PrimitiveKind::U16 => Primitive::U16(u16::try_from(value).map_err(|_| out_of_range())?),
            PrimitiveKind::U32 => Primitive::U32(u32::try_from(value).map_err(|_| out_of_range())?),
            PrimitiveKind::U64 => Primitive::U64(u64::try_from(value).map_err(|_| out_of_range())?),
            _ => Primitive::I64(value),
        })
    }

    fn widen(&self, raw: Primitive) -> Result<i64, DriftError> {
        Ok(match raw {
            Primitive::I8(v) => i64::from(v),
            Primitive::I16(v) => i64::from(v),
            Primitive::I32(v) => i64::from(v),
            Primitive::I64(v) => v,
            Primitive::U8(v) => i64::from(v),
            Primitive::U16(v) => i64::from(v),
            Primitive::U32(v) => i64::from(v),
            Primitive::U64(v) => i64::try_from(v).map_err(|_| {
                DriftError::Format(format!("enum value {} of {} out of range", v, self.descriptor))
            })?,
            other => {
                return Err(DriftError::Format(format!(
                    "enum {} backed by non-integral {}",
                    self.descriptor,
                    other.descriptor()
                )));
            }
        })
    }
}

impl Formatter for EnumFormatter {
    fn write(&self, writer: &mut dyn Write, value: &Primitive) -> Result<(), DriftError> {
        let Primitive::Enum(enum_value) = value else {
            return Err(mismatch("enum", value));
        };
        let raw = self.narrow(enum_value.value())?;
        ScalarFormatter(self.underlying).write(writer, &raw)
    }

    fn read(&self, reader: &mut dyn Read) -> Result<Primitive, DriftError> {
        let raw = ScalarFormatter(self.underlying).read(reader)?;
        Ok(Primitive::Enum(EnumValue::new(
            self.descriptor.clone(),
            self.widen(raw)?,
        )))
    }
}

/// Pick the formatter for a type, or fail if it is not a primitive type.
pub fn formatter_for(descriptor: &TypeDescriptor) -> Result<Box<dyn Formatter>, DriftError> {
    if let Some(kind) = PrimitiveKind::of(descriptor) {
        return Ok(Box::new(ScalarFormatter(kind)));
    }
    if descriptor.is_enum() {
        let underlying = PrimitiveKind::of(descriptor.enum_underlying_type())
            .filter(|kind| kind.is_integral())
            .ok_or_else(|| {
                DriftError::InvalidDescriptor(format!(
                    "enum {} has non-integral underlying type {}",
                    descriptor,
                    descriptor.enum_underlying_type()
                ))
            })?;
        return Ok(Box::new(EnumFormatter {
            descriptor: descriptor.clone(),
            underlying,
        }));
    }
    if let Some(kind) = primitive_array_kind(descriptor) {
        return Ok(Box::new(ArrayFormatter(kind)));
    }
    Err(DriftError::Format(format!("no formatter for {}", descriptor)))
}

// =============================================================================
// FORMATTER CACHE
// =============================================================================

/// Per-session formatter lookup, keyed by type hash.
///
/// Owned by a single encode or decode call, so no locking is needed.
#[derive(Default)]
pub struct FormatterCache {
    formatters: BTreeMap<HashCode, Box<dyn Formatter>>,
}

impl FormatterCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The formatter for `descriptor`, created on first use.
    pub fn formatter(&mut self, descriptor: &TypeDescriptor) -> Result<&dyn Formatter, DriftError> {
        let formatter = match self.formatters.entry(descriptor.hash()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(formatter_for(descriptor)?),
        };
        Ok(&**formatter)
    }

    /// Number of formatters created so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.formatters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.formatters.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================
