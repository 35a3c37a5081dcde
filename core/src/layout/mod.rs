//! The typed layout model: a closed set of kernel-side type kinds with exact
//! size, alignment, and member-offset arithmetic.
//!
//! Layouts are fully determined at construction time and immutable afterwards,
//! so the byte layout the codec marshals against can never drift from the C
//! declarations derived in [`crate::cgen`]. All types are cheap value objects
//! that can be shared freely across threads.


use crate::codec::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

/// Reconstructs a host value from the ordered member values decoded from a
/// struct, mirroring the member order fixed at construction.
pub type Constructor = Arc<dyn Fn(Vec<Value>) -> Value + Send + Sync>;

/// Extracts one member's value from a host value when encoding a struct.
/// Returning `None` reports the member as missing.
pub type Accessor = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

/// An error raised while constructing a layout.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("invalid layout for `{type_name}`: {reason}")]
    InvalidLayout { type_name: String, reason: String },
    #[error("duplicate member `{member}` in `{type_name}`")]
    DuplicateMember { type_name: String, member: String },
}

/// Rounds `size` up to the next multiple of `alignment`.
pub fn pad_size(size: usize, alignment: usize) -> usize {
    size.div_ceil(alignment) * alignment
}

fn check_unique_names<'a>(
    type_name: &str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), LayoutError> {
    let mut seen = Vec::new();
    for name in names {
        if name.is_empty() {
            return Err(LayoutError::InvalidLayout {
                type_name: type_name.to_string(),
                reason: "empty member name".to_string(),
            });
        }
        if seen.contains(&name) {
            return Err(LayoutError::DuplicateMember {
                type_name: type_name.to_string(),
                member: name.to_string(),
            });
        }
        seen.push(name);
    }
    Ok(())
}

/// Integer width in bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

impl IntWidth {
    pub fn bits(self) -> u32 {
        match self {
            IntWidth::W8 => 8,
            IntWidth::W16 => 16,
            IntWidth::W32 => 32,
            IntWidth::W64 => 64,
        }
    }

    pub fn bytes(self) -> usize {
        (self.bits() / 8) as usize
    }
}

/// A fixed-width integer type. Alignment equals size, per the BPF target ABI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntType {
    name: String,
    width: IntWidth,
    signed: bool,
}

impl IntType {
    /// Creates an integer type with the conventional BPF name (`s32`, `u64`, ...).
    pub fn new(width: IntWidth, signed: bool) -> IntType {
        let name = format!("{}{}", if signed { "s" } else { "u" }, width.bits());
        IntType {
            name,
            width,
            signed,
        }
    }

    /// Creates an integer type spelled differently in generated C, such as
    /// `bool` or `char` for the unsigned 8-bit flavors.
    pub fn named(name: impl Into<String>, width: IntWidth, signed: bool) -> IntType {
        IntType {
            name: name.into(),
            width,
            signed,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> IntWidth {
        self.width
    }

    pub fn signed(&self) -> bool {
        self.signed
    }

    pub fn size(&self) -> usize {
        self.width.bytes()
    }

    /// The smallest representable value. Zero for unsigned types.
    pub fn min_signed(&self) -> i64 {
        if !self.signed {
            return 0;
        }
        match self.width {
            IntWidth::W8 => i8::MIN as i64,
            IntWidth::W16 => i16::MIN as i64,
            IntWidth::W32 => i32::MIN as i64,
            IntWidth::W64 => i64::MIN,
        }
    }

    /// The largest representable value, as an unsigned number.
    pub fn max_unsigned(&self) -> u64 {
        match (self.signed, self.width) {
            (true, IntWidth::W8) => i8::MAX as u64,
            (true, IntWidth::W16) => i16::MAX as u64,
            (true, IntWidth::W32) => i32::MAX as u64,
            (true, IntWidth::W64) => i64::MAX as u64,
            (false, IntWidth::W8) => u8::MAX as u64,
            (false, IntWidth::W16) => u16::MAX as u64,
            (false, IntWidth::W32) => u32::MAX as u64,
            (false, IntWidth::W64) => u64::MAX,
        }
    }
}

/// A fixed-capacity, null-terminated string (`char[N]`). At most `N - 1`
/// content bytes are stored; the final byte is reserved for the terminator
/// when the content would otherwise fill the capacity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StrType {
    capacity: usize,
}

impl StrType {
    pub fn new(capacity: usize) -> Result<StrType, LayoutError> {
        if capacity == 0 {
            return Err(LayoutError::InvalidLayout {
                type_name: "char[0]".to_string(),
                reason: "string capacity must be at least 1".to_string(),
            });
        }
        Ok(StrType { capacity })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn name(&self) -> String {
        format!("char[{}]", self.capacity)
    }
}

/// A fixed-length array. Elements are laid out back to back at the element's
/// padded size, so the stride matches the generated C array.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayType {
    elem: Box<BpfType>,
    len: usize,
}

impl ArrayType {
    pub fn new(elem: BpfType, len: usize) -> Result<ArrayType, LayoutError> {
        if len == 0 {
            return Err(LayoutError::InvalidLayout {
                type_name: format!("{}[0]", elem.name()),
                reason: "array length must be at least 1".to_string(),
            });
        }
        Ok(ArrayType {
            elem: Box::new(elem),
            len,
        })
    }

    pub fn elem(&self) -> &BpfType {
        &self.elem
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn name(&self) -> String {
        format!("{}[{}]", self.elem.name(), self.len)
    }

    /// Distance in bytes between consecutive elements.
    pub fn stride(&self) -> usize {
        self.elem.size_padded()
    }

    /// Byte offset of the element at `index`.
    pub fn offset_at(&self, index: usize) -> usize {
        index * self.stride()
    }
}

/// A struct member positioned at an explicit byte offset.
#[derive(Clone)]
pub struct StructMember {
    pub name: String,
    pub ty: BpfType,
    pub offset: usize,
    accessor: Option<Accessor>,
}

impl StructMember {
    pub fn new(name: impl Into<String>, ty: BpfType, offset: usize) -> StructMember {
        StructMember {
            name: name.into(),
            ty,
            offset,
            accessor: None,
        }
    }

    /// Attaches the closure that extracts this member from a host value on
    /// encode. Without one, members are read positionally from
    /// [`Value::Struct`].
    pub fn with_accessor(mut self, accessor: Accessor) -> StructMember {
        self.accessor = Some(accessor);
        self
    }

    pub fn accessor(&self) -> Option<&Accessor> {
        self.accessor.as_ref()
    }
}

impl fmt::Debug for StructMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructMember")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("offset", &self.offset)
            .field("accessor", &self.accessor.is_some())
            .finish()
    }
}

impl PartialEq for StructMember {
    fn eq(&self, other: &StructMember) -> bool {
        self.name == other.name && self.ty == other.ty && self.offset == other.offset
    }
}

/// A struct member whose offset has not been assigned yet. Used with
/// [`StructType::auto_layout`] and [`StructType::packed`].
#[derive(Clone)]
pub struct UnpositionedMember {
    pub name: String,
    pub ty: BpfType,
    accessor: Option<Accessor>,
}

impl UnpositionedMember {
    pub fn new(name: impl Into<String>, ty: BpfType) -> UnpositionedMember {
        UnpositionedMember {
            name: name.into(),
            ty,
            accessor: None,
        }
    }

    pub fn with_accessor(mut self, accessor: Accessor) -> UnpositionedMember {
        self.accessor = Some(accessor);
        self
    }

    fn at(self, offset: usize) -> StructMember {
        StructMember {
            name: self.name,
            ty: self.ty,
            offset,
            accessor: self.accessor,
        }
    }
}

/// A struct with named, offset-positioned members.
#[derive(Clone)]
pub struct StructType {
    name: String,
    members: Vec<StructMember>,
    size: usize,
    alignment: usize,
    constructor: Option<Constructor>,
}

impl StructType {
    /// Lays the members out by the default ABI rule: each offset is aligned
    /// up to its member's alignment, and the struct's alignment is the
    /// maximum member alignment.
    pub fn auto_layout(
        name: impl Into<String>,
        members: Vec<UnpositionedMember>,
    ) -> Result<StructType, LayoutError> {
        let name = name.into();
        let mut positioned = Vec::with_capacity(members.len());
        let mut offset = 0;
        for member in members {
            offset = pad_size(offset, member.ty.alignment());
            trace!(
                struct_name = %name,
                member = %member.name,
                offset,
                "placed struct member"
            );
            let size = member.ty.size();
            positioned.push(member.at(offset));
            offset += size;
        }
        StructType::with_offsets(name, positioned)
    }

    /// Lays the members out back to back with no padding; the struct's
    /// alignment is forced to 1.
    pub fn packed(
        name: impl Into<String>,
        members: Vec<UnpositionedMember>,
    ) -> Result<StructType, LayoutError> {
        let mut positioned = Vec::with_capacity(members.len());
        let mut offset = 0;
        for member in members {
            let size = member.ty.size();
            positioned.push(member.at(offset));
            offset += size;
        }
        let mut built = StructType::with_offsets(name, positioned)?;
        built.alignment = 1;
        Ok(built)
    }

    /// Builds a struct from explicitly positioned members. The offsets are
    /// authoritative and never auto-corrected; overlapping offsets are
    /// accepted as an escape hatch for union-like aliasing.
    pub fn with_offsets(
        name: impl Into<String>,
        members: Vec<StructMember>,
    ) -> Result<StructType, LayoutError> {
        let name = name.into();
        check_unique_names(&name, members.iter().map(|m| m.name.as_str()))?;
        let size = members
            .iter()
            .map(|m| m.offset + m.ty.size())
            .max()
            .unwrap_or(0);
        let alignment = members
            .iter()
            .map(|m| m.ty.alignment())
            .max()
            .unwrap_or(1);
        Ok(StructType {
            name,
            members,
            size,
            alignment,
            constructor: None,
        })
    }

    /// Attaches the closure that rebuilds a host value from the ordered
    /// decoded member values. Without one, decoding yields [`Value::Struct`]
    /// with the members in declaration order.
    pub fn with_constructor(mut self, constructor: Constructor) -> StructType {
        self.constructor = Some(constructor);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    pub fn members(&self) -> &[StructMember] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&StructMember> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Byte offset of the named member.
    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.member(name).map(|m| m.offset)
    }

    pub fn constructor(&self) -> Option<&Constructor> {
        self.constructor.as_ref()
    }
}

impl fmt::Debug for StructType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructType")
            .field("name", &self.name)
            .field("members", &self.members)
            .field("size", &self.size)
            .field("alignment", &self.alignment)
            .field("constructor", &self.constructor.is_some())
            .finish()
    }
}

impl PartialEq for StructType {
    fn eq(&self, other: &StructType) -> bool {
        self.name == other.name
            && self.members == other.members
            && self.size == other.size
            && self.alignment == other.alignment
    }
}

/// One alternative of a union. All members share offset 0.
#[derive(Clone, Debug, PartialEq)]
pub struct UnionMember {
    pub name: String,
    pub ty: BpfType,
}

impl UnionMember {
    pub fn new(name: impl Into<String>, ty: BpfType) -> UnionMember {
        UnionMember {
            name: name.into(),
            ty,
        }
    }
}

/// A union: the size is the largest member size rounded up to the union's
/// alignment (the largest member alignment).
#[derive(Clone, Debug, PartialEq)]
pub struct UnionType {
    name: String,
    members: Vec<UnionMember>,
    size: usize,
    alignment: usize,
}

impl UnionType {
    pub fn new(
        name: impl Into<String>,
        members: Vec<UnionMember>,
    ) -> Result<UnionType, LayoutError> {
        let name = name.into();
        check_unique_names(&name, members.iter().map(|m| m.name.as_str()))?;
        if members.is_empty() {
            return Err(LayoutError::InvalidLayout {
                type_name: name,
                reason: "union must have at least one member".to_string(),
            });
        }
        let alignment = members
            .iter()
            .map(|m| m.ty.alignment())
            .max()
            .unwrap_or(1);
        let size = pad_size(
            members.iter().map(|m| m.ty.size()).max().unwrap_or(0),
            alignment,
        );
        Ok(UnionType {
            name,
            members,
            size,
            alignment,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    pub fn members(&self) -> &[UnionMember] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&UnionMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// A name bound to exactly one underlying type; layout and codec behavior
/// delegate entirely to the inner type.
#[derive(Clone, Debug, PartialEq)]
pub struct TypedefType {
    name: String,
    inner: Box<BpfType>,
}

impl TypedefType {
    pub fn new(name: impl Into<String>, inner: BpfType) -> TypedefType {
        TypedefType {
            name: name.into(),
            inner: Box::new(inner),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inner(&self) -> &BpfType {
        &self.inner
    }
}

/// A named integer enumeration with a fixed backing width.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumType {
    name: String,
    backing: IntType,
    enumerators: Vec<(String, i64)>,
}

impl EnumType {
    pub fn new(
        name: impl Into<String>,
        backing: IntType,
        enumerators: Vec<(String, i64)>,
    ) -> Result<EnumType, LayoutError> {
        let name = name.into();
        check_unique_names(&name, enumerators.iter().map(|(n, _)| n.as_str()))?;
        for (enumerator, value) in &enumerators {
            let fits = if backing.signed() {
                *value >= backing.min_signed() && *value <= backing.max_unsigned() as i64
            } else {
                *value >= 0 && (*value as u64) <= backing.max_unsigned()
            };
            if !fits {
                return Err(LayoutError::InvalidLayout {
                    type_name: name,
                    reason: format!(
                        "enumerator `{enumerator}` value {value} does not fit backing type `{}`",
                        backing.name()
                    ),
                });
            }
        }
        Ok(EnumType {
            name,
            backing,
            enumerators,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backing(&self) -> &IntType {
        &self.backing
    }

    pub fn enumerators(&self) -> &[(String, i64)] {
        &self.enumerators
    }

    pub fn value_of(&self, name: &str) -> Option<i64> {
        self.enumerators
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn name_of(&self, value: i64) -> Option<&str> {
        self.enumerators
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(n, _)| n.as_str())
    }
}

/// The closed set of representable type kinds. The codec and the C bridge
/// match on every kind, so adding one is a compile-time-checked update.
#[derive(Clone, Debug, PartialEq)]
pub enum BpfType {
    Int(IntType),
    Str(StrType),
    Array(ArrayType),
    Struct(StructType),
    Union(UnionType),
    Typedef(TypedefType),
    Enum(EnumType),
}

impl BpfType {
    pub fn s8() -> BpfType {
        BpfType::Int(IntType::new(IntWidth::W8, true))
    }

    pub fn u8() -> BpfType {
        BpfType::Int(IntType::new(IntWidth::W8, false))
    }

    pub fn s16() -> BpfType {
        BpfType::Int(IntType::new(IntWidth::W16, true))
    }

    pub fn u16() -> BpfType {
        BpfType::Int(IntType::new(IntWidth::W16, false))
    }

    pub fn s32() -> BpfType {
        BpfType::Int(IntType::new(IntWidth::W32, true))
    }

    pub fn u32() -> BpfType {
        BpfType::Int(IntType::new(IntWidth::W32, false))
    }

    pub fn s64() -> BpfType {
        BpfType::Int(IntType::new(IntWidth::W64, true))
    }

    pub fn u64() -> BpfType {
        BpfType::Int(IntType::new(IntWidth::W64, false))
    }

    /// `bool`, stored as an unsigned byte.
    pub fn bool_t() -> BpfType {
        BpfType::Int(IntType::named("bool", IntWidth::W8, false))
    }

    /// `char`, stored as an unsigned byte.
    pub fn char_t() -> BpfType {
        BpfType::Int(IntType::named("char", IntWidth::W8, false))
    }

    /// A fixed-capacity string, `char[capacity]`.
    pub fn string(capacity: usize) -> Result<BpfType, LayoutError> {
        Ok(BpfType::Str(StrType::new(capacity)?))
    }

    pub fn array(elem: BpfType, len: usize) -> Result<BpfType, LayoutError> {
        Ok(BpfType::Array(ArrayType::new(elem, len)?))
    }

    pub fn typedef(name: impl Into<String>, inner: BpfType) -> BpfType {
        BpfType::Typedef(TypedefType::new(name, inner))
    }

    /// The type's name as spelled in generated C.
    pub fn name(&self) -> String {
        match self {
            BpfType::Int(t) => t.name().to_string(),
            BpfType::Str(t) => t.name(),
            BpfType::Array(t) => t.name(),
            BpfType::Struct(t) => t.name().to_string(),
            BpfType::Union(t) => t.name().to_string(),
            BpfType::Typedef(t) => t.name().to_string(),
            BpfType::Enum(t) => t.name().to_string(),
        }
    }

    /// Size of the type in bytes.
    pub fn size(&self) -> usize {
        match self {
            BpfType::Int(t) => t.size(),
            BpfType::Str(t) => t.capacity(),
            BpfType::Array(t) => t.stride() * t.len(),
            BpfType::Struct(t) => t.size(),
            BpfType::Union(t) => t.size(),
            BpfType::Typedef(t) => t.inner().size(),
            BpfType::Enum(t) => t.backing().size(),
        }
    }

    /// Alignment of the type in bytes.
    pub fn alignment(&self) -> usize {
        match self {
            BpfType::Int(t) => t.size(),
            BpfType::Str(_) => 1,
            BpfType::Array(t) => t.elem().alignment(),
            BpfType::Struct(t) => t.alignment(),
            BpfType::Union(t) => t.alignment(),
            BpfType::Typedef(t) => t.inner().alignment(),
            BpfType::Enum(t) => t.backing().size(),
        }
    }

    /// Size rounded up to the alignment; the stride used for array index
    /// arithmetic.
    pub fn size_padded(&self) -> usize {
        pad_size(self.size(), self.alignment())
    }
}

impl fmt::Display for BpfType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
