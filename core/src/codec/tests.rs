use super::*;
use crate::layout::{StructMember, StructType, UnionMember, UnpositionedMember};
use std::sync::Arc;

/// Integers survive an encode/decode round trip at both ends of their range.
#[test]
fn int_round_trip_at_bounds() {
    let cases = [
        (BpfType::s8(), Value::Signed(-128)),
        (BpfType::s8(), Value::Signed(127)),
        (BpfType::u8(), Value::Unsigned(255)),
        (BpfType::s32(), Value::Signed(i32::MIN as i64)),
        (BpfType::u32(), Value::Unsigned(u32::MAX as u64)),
        (BpfType::s64(), Value::Signed(i64::MIN)),
        (BpfType::s64(), Value::Signed(i64::MAX)),
        (BpfType::u64(), Value::Unsigned(u64::MAX)),
    ];
    for (ty, value) in cases {
        let bytes = ty.encode(&value).unwrap();
        assert_eq!(bytes.len(), ty.size());
        assert_eq!(ty.decode(&bytes).unwrap(), value);
    }
}

/// Values outside the integer's range are rejected rather than wrapped.
#[test]
fn int_out_of_range_is_rejected() {
    assert!(matches!(
        BpfType::s8().encode(&Value::Signed(128)),
        Err(CodecError::OutOfRange { .. })
    ));
    assert!(matches!(
        BpfType::s8().encode(&Value::Signed(-129)),
        Err(CodecError::OutOfRange { .. })
    ));
    assert!(matches!(
        BpfType::u16().encode(&Value::Unsigned(65536)),
        Err(CodecError::OutOfRange { .. })
    ));
}

/// A signed type refuses an unsigned value and vice versa.
#[test]
fn int_kind_mismatch_is_rejected() {
    assert!(matches!(
        BpfType::s32().encode(&Value::Unsigned(1)),
        Err(CodecError::TypeMismatch { .. })
    ));
    assert!(matches!(
        BpfType::u32().encode(&Value::Signed(1)),
        Err(CodecError::TypeMismatch { .. })
    ));
}

/// The buffer handed to encode_into or decode must match the type's size
/// exactly.
#[test]
fn buffer_size_is_checked() {
    let ty = BpfType::u32();
    let mut short = [0u8; 3];
    assert!(matches!(
        encode_into(&ty, &Value::Unsigned(1), &mut short),
        Err(CodecError::BufferSize { expected: 4, found: 3, .. })
    ));
    assert!(matches!(
        ty.decode(&[0u8; 5]),
        Err(CodecError::BufferSize { expected: 4, found: 5, .. })
    ));
}

/// Strings shorter than the capacity round-trip unchanged and the tail is
/// zero filled.
#[test]
fn short_string_round_trip() {
    let ty = BpfType::string(8).unwrap();
    let bytes = ty.encode(&Value::str("hi")).unwrap();
    assert_eq!(&bytes, b"hi\0\0\0\0\0\0");
    assert_eq!(ty.decode(&bytes).unwrap(), Value::str("hi"));
}

/// Content at or beyond the capacity is truncated to capacity - 1 bytes so
/// the terminator always fits.
#[test]
fn long_string_is_truncated() {
    let ty = BpfType::string(4).unwrap();
    let bytes = ty.encode(&Value::str("abcdef")).unwrap();
    assert_eq!(&bytes, b"abc\0");
    assert_eq!(ty.decode(&bytes).unwrap(), Value::str("abc"));
}

/// A buffer with no terminator decodes to the full capacity.
#[test]
fn unterminated_string_decodes_fully() {
    let ty = BpfType::string(4).unwrap();
    assert_eq!(ty.decode(b"abcd").unwrap(), Value::str("abcd"));
}

/// Invalid UTF-8 in a string buffer is an encoding error, not a panic.
#[test]
fn non_utf8_string_is_rejected() {
    let ty = BpfType::string(4).unwrap();
    assert!(matches!(
        ty.decode(&[0xff, 0xfe, 0x00, 0x00]),
        Err(CodecError::InvalidEncoding { .. })
    ));
}

/// Array elements land at stride offsets and round-trip in order.
#[test]
fn array_round_trip() {
    let ty = BpfType::array(BpfType::u16(), 3).unwrap();
    let value = Value::Array(vec![
        Value::Unsigned(1),
        Value::Unsigned(2),
        Value::Unsigned(3),
    ]);
    let bytes = ty.encode(&value).unwrap();
    assert_eq!(bytes.len(), 6);
    assert_eq!(ty.decode(&bytes).unwrap(), value);
}

#[test]
fn array_length_mismatch_is_rejected() {
    let ty = BpfType::array(BpfType::u8(), 2).unwrap();
    assert!(matches!(
        ty.encode(&Value::Array(vec![Value::Unsigned(1)])),
        Err(CodecError::LengthMismatch { expected: 2, found: 1, .. })
    ));
}

fn event_type() -> BpfType {
    BpfType::Struct(
        StructType::auto_layout(
            "event",
            vec![
                UnpositionedMember::new("id", BpfType::u32()),
                UnpositionedMember::new("name", BpfType::string(8).unwrap()),
                UnpositionedMember::new("ts", BpfType::u64()),
            ],
        )
        .unwrap(),
    )
}

/// Struct members are written at their computed offsets; padding stays zero.
#[test]
fn struct_round_trip_with_padding() {
    let ty = event_type();
    assert_eq!(ty.size(), 24);
    let value = Value::Struct(vec![
        Value::Unsigned(7),
        Value::str("probe"),
        Value::Unsigned(99),
    ]);
    let bytes = ty.encode(&value).unwrap();
    // 4 bytes of padding between the name and the 8-aligned timestamp.
    assert_eq!(&bytes[12..16], &[0, 0, 0, 0]);
    assert_eq!(ty.decode(&bytes).unwrap(), value);
}

#[test]
fn struct_with_too_few_fields_is_rejected() {
    let ty = event_type();
    assert!(matches!(
        ty.encode(&Value::Struct(vec![Value::Unsigned(7)])),
        Err(CodecError::MissingMember { .. })
    ));
}

/// Member accessors pull values out of an arbitrary host representation and
/// a constructor rebuilds it on decode.
#[test]
fn struct_with_accessors_and_constructor() {
    let point = StructType::with_offsets(
        "point",
        vec![
            StructMember::new("x", BpfType::s32(), 0).with_accessor(Arc::new(|v: &Value| {
                v.as_str().and_then(|s| s.split(',').next()).and_then(|s| {
                    s.parse().ok().map(Value::Signed)
                })
            })),
            StructMember::new("y", BpfType::s32(), 4).with_accessor(Arc::new(|v: &Value| {
                v.as_str().and_then(|s| s.split(',').nth(1)).and_then(|s| {
                    s.parse().ok().map(Value::Signed)
                })
            })),
        ],
    )
    .unwrap()
    .with_constructor(Arc::new(|fields: Vec<Value>| {
        let x = fields[0].as_signed().unwrap_or(0);
        let y = fields[1].as_signed().unwrap_or(0);
        Value::str(format!("{x},{y}"))
    }));
    let ty = BpfType::Struct(point);

    let bytes = ty.encode(&Value::str("3,-4")).unwrap();
    assert_eq!(ty.decode(&bytes).unwrap(), Value::str("3,-4"));
}

#[test]
fn struct_accessor_returning_none_is_missing_member() {
    let ty = BpfType::Struct(
        StructType::with_offsets(
            "opaque",
            vec![StructMember::new("x", BpfType::s32(), 0)
                .with_accessor(Arc::new(|_: &Value| None))],
        )
        .unwrap(),
    );
    assert!(matches!(
        ty.encode(&Value::Struct(vec![])),
        Err(CodecError::MissingMember { .. })
    ));
}

fn sample_union() -> BpfType {
    BpfType::Union(
        crate::layout::UnionType::new(
            "payload",
            vec![
                UnionMember::new("word", BpfType::u32()),
                UnionMember::new("bytes", BpfType::array(BpfType::u8(), 4).unwrap()),
            ],
        )
        .unwrap(),
    )
}

/// Encoding a union writes the selected member and zero fills the rest;
/// decoding reports every alternative with no selection.
#[test]
fn union_encode_and_decode() {
    let ty = sample_union();
    let bytes = ty
        .encode(&Value::Union(UnionValue::of("word", Value::Unsigned(0x01020304))))
        .unwrap();
    assert_eq!(bytes.len(), 4);

    let decoded = match ty.decode(&bytes).unwrap() {
        Value::Union(u) => u,
        other => panic!("expected union, got {other:?}"),
    };
    assert_eq!(decoded.current(), None);
    assert_eq!(decoded.get("word"), Some(&Value::Unsigned(0x01020304)));
    assert!(decoded.get("bytes").is_some());
}

#[test]
fn union_without_selection_is_rejected() {
    let ty = sample_union();
    assert!(matches!(
        ty.encode(&Value::Union(UnionValue::new())),
        Err(CodecError::NoActiveMember { .. })
    ));
}

#[test]
fn union_with_unknown_member_is_rejected() {
    let ty = sample_union();
    assert!(matches!(
        ty.encode(&Value::Union(UnionValue::of("nope", Value::Unsigned(1)))),
        Err(CodecError::UnknownMember { .. })
    ));
}

fn state_enum() -> BpfType {
    BpfType::Enum(
        crate::layout::EnumType::new(
            "state",
            crate::layout::IntType::new(crate::layout::IntWidth::W32, false),
            vec![("IDLE".to_string(), 0), ("RUNNING".to_string(), 1)],
        )
        .unwrap(),
    )
}

/// Enums encode by enumerator name and decode back to it.
#[test]
fn enum_round_trip() {
    let ty = state_enum();
    let bytes = ty.encode(&Value::enumerator("RUNNING")).unwrap();
    assert_eq!(bytes.len(), 4);
    assert_eq!(ty.decode(&bytes).unwrap(), Value::enumerator("RUNNING"));
}

#[test]
fn unknown_enumerator_name_is_rejected() {
    let ty = state_enum();
    assert!(matches!(
        ty.encode(&Value::enumerator("GONE")),
        Err(CodecError::OutOfRange { .. })
    ));
}

/// Bytes holding a value with no enumerator fail to decode.
#[test]
fn unmapped_enum_value_is_rejected() {
    let ty = state_enum();
    assert!(matches!(
        ty.decode(&7u32.to_ne_bytes()),
        Err(CodecError::InvalidEncoding { .. })
    ));
}

/// Typedefs marshal exactly like their inner type.
#[test]
fn typedef_delegates_to_inner() {
    let ty = BpfType::typedef("pid_t", BpfType::s32());
    let bytes = ty.encode(&Value::Signed(-42)).unwrap();
    assert_eq!(ty.decode(&bytes).unwrap(), Value::Signed(-42));
}

/// Nested aggregates round-trip through every level.
#[test]
fn nested_struct_round_trip() {
    let inner = BpfType::Struct(
        StructType::auto_layout(
            "point",
            vec![
                UnpositionedMember::new("x", BpfType::s32()),
                UnpositionedMember::new("y", BpfType::s32()),
            ],
        )
        .unwrap(),
    );
    let outer = BpfType::Struct(
        StructType::auto_layout(
            "segment",
            vec![
                UnpositionedMember::new("from", inner.clone()),
                UnpositionedMember::new("to", inner),
                UnpositionedMember::new("id", BpfType::u64()),
            ],
        )
        .unwrap(),
    );
    let value = Value::Struct(vec![
        Value::Struct(vec![Value::Signed(1), Value::Signed(2)]),
        Value::Struct(vec![Value::Signed(-3), Value::Signed(4)]),
        Value::Unsigned(9),
    ]);
    let bytes = outer.encode(&value).unwrap();
    assert_eq!(bytes.len(), outer.size());
    assert_eq!(outer.decode(&bytes).unwrap(), value);
}

/// encode_into reuses a caller buffer and clears stale contents first.
#[test]
fn encode_into_zeroes_stale_bytes() {
    let ty = BpfType::string(6).unwrap();
    let mut buf = [0xffu8; 6];
    encode_into(&ty, &Value::str("ab"), &mut buf).unwrap();
    assert_eq!(&buf, b"ab\0\0\0\0");
}
