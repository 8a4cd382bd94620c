//! Type tags for stored values, bodies and container headers.

use pongo_core::ContainerKind;

/// Null
pub const NULL: u8 = 0x00;
/// Bool (1 byte)
pub const BOOL: u8 = 0x01;
/// Int (i64 LE)
pub const INT: u8 = 0x02;
/// DateTime (i64 LE unix microseconds)
pub const DATETIME: u8 = 0x03;
/// Uuid (16 bytes)
pub const UUID: u8 = 0x04;
/// Float (f64 LE)
pub const FLOAT: u8 = 0x05;
/// String (u32 LE length + UTF-8)
pub const STRING: u8 = 0x07;
/// Ref (location u64, generation u64, header tag u8)
pub const REF: u8 = 0x80;

/// List container header
pub const HEADER_LIST: u8 = 0x81;
/// Dict container header
pub const HEADER_DICT: u8 = 0x82;
/// Collection container header
pub const HEADER_COLLECTION: u8 = 0x83;

/// List body
pub const BODY_LIST: u8 = 0xC1;
/// Dict body
pub const BODY_DICT: u8 = 0xC2;
/// Collection body
pub const BODY_COLLECTION: u8 = 0xC3;

/// Header tag for a container kind
pub fn header_tag(kind: ContainerKind) -> u8 {
    match kind {
        ContainerKind::List => HEADER_LIST,
        ContainerKind::Dict => HEADER_DICT,
        ContainerKind::Collection => HEADER_COLLECTION,
    }
}

/// Container kind for a header tag
pub fn kind_from_header_tag(tag: u8) -> Option<ContainerKind> {
    match tag {
        HEADER_LIST => Some(ContainerKind::List),
        HEADER_DICT => Some(ContainerKind::Dict),
        HEADER_COLLECTION => Some(ContainerKind::Collection),
        _ => None,
    }
}

/// Body tag for a container kind
pub fn body_tag(kind: ContainerKind) -> u8 {
    match kind {
        ContainerKind::List => BODY_LIST,
        ContainerKind::Dict => BODY_DICT,
        ContainerKind::Collection => BODY_COLLECTION,
    }
}

/// Container kind for a body tag
pub fn kind_from_body_tag(tag: u8) -> Option<ContainerKind> {
    match tag {
        BODY_LIST => Some(ContainerKind::List),
        BODY_DICT => Some(ContainerKind::Dict),
        BODY_COLLECTION => Some(ContainerKind::Collection),
        _ => None,
    }
}
