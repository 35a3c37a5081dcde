//! Core data-layout model for bpfgen.
//!
//! This crate computes the exact in-kernel binary layout of described types
//! ([`layout`]), marshals values across the user/kernel boundary without
//! layout drift ([`codec`]), and derives C declarations whose memory layout
//! matches the model bit-for-bit ([`cgen`]). Program loading, probe
//! attachment, and buffer polling live elsewhere and consume these types.

pub mod cgen;
pub mod codec;
pub mod layout;
pub mod logging;

pub use codec::{CodecError, UnionValue, Value};
pub use layout::{
    ArrayType, BpfType, EnumType, IntType, IntWidth, LayoutError, StrType, StructMember,
    StructType, TypedefType, UnionMember, UnionType, UnpositionedMember,
};
