//! Constant-buffer packing.
//!
//! HLSL packing rules: members are laid out in declaration order in 16-byte
//! registers. Scalars align to 4 bytes, vectors may not straddle a register
//! boundary, and matrices, arrays and structs start on a fresh register. An
//! array of `N` elements takes `16 * (N - 1)` bytes plus one element. The block
//! size is rounded up to a whole register.

use std::collections::HashMap;

use super::parse::Member;

const REGISTER: u32 = 16;

/// Struct definitions visible to the layout, by name.
pub type StructTable<'a> = HashMap<&'a str, &'a [Member]>;

/// Size in bytes of a constant buffer holding `members`.
pub fn block_size(members: &[Member], structs: &StructTable<'_>) -> Result<u32, String> {
    Ok(round_up(packed_size(members, structs, 0)?, REGISTER))
}

/// Size of `ty` when used as a buffer element, e.g. `RegularBuffer<float4>`.
pub fn element_size(ty: &str, structs: &StructTable<'_>) -> Result<u32, String> {
    if let Some(size) = numeric_size(ty, false) {
        return Ok(size);
    }
    match structs.get(ty) {
        Some(members) => packed_size(members, structs, 0),
        None => Err(format!("unknown type '{ty}'")),
    }
}

fn packed_size(members: &[Member], structs: &StructTable<'_>, depth: u32) -> Result<u32, String> {
    if depth > 16 {
        return Err("struct nesting too deep".into());
    }
    let mut offset = 0;
    for member in members {
        let row_major = member.has_qualifier("row_major");
        let (size, fresh_register) = match numeric_size(&member.ty, row_major) {
            Some(size) => (size, is_matrix(&member.ty)),
            None => match structs.get(member.ty.as_str()) {
                Some(inner) => (packed_size(inner, structs, depth + 1)?, true),
                None => {
                    return Err(format!(
                        "unknown type '{}' for member '{}'",
                        member.ty, member.name
                    ));
                }
            },
        };

        let (size, fresh_register) = match member.count {
            Some(0) => return Err(format!("zero-sized array '{}'", member.name)),
            Some(count) => (REGISTER * (count - 1) + size, true),
            None => (size, fresh_register),
        };

        offset = if fresh_register {
            round_up(offset, REGISTER)
        } else if offset % REGISTER + size > REGISTER {
            round_up(offset, REGISTER)
        } else {
            round_up(offset, 4)
        };
        offset += size;
    }
    Ok(offset)
}

/// Size of a scalar, vector or matrix type name.
fn numeric_size(ty: &str, row_major: bool) -> Option<u32> {
    let base_len = ty.find(|c: char| c.is_ascii_digit()).unwrap_or(ty.len());
    let (base, dims) = ty.split_at(base_len);
    let scalar = match base {
        "bool" | "int" | "uint" | "dword" | "float" | "half" => 4,
        "double" => 8,
        _ => return None,
    };
    let digits: Vec<u32> = dims
        .split('x')
        .filter(|d| !d.is_empty())
        .map(|d| d.parse().ok().filter(|n| (1..=4).contains(n)))
        .collect::<Option<_>>()?;
    match digits.as_slice() {
        [] => Some(scalar),
        [n] => Some(scalar * n),
        // floatRxC: R rows of C columns
        [rows, columns] => {
            let (registers, width) = if row_major {
                (*rows, *columns)
            } else {
                (*columns, *rows)
            };
            Some(REGISTER * (registers - 1) + scalar * width)
        }
        _ => None,
    }
}

fn is_matrix(ty: &str) -> bool {
    ty.contains(|c: char| c.is_ascii_digit()) && ty.contains('x')
}

fn round_up(value: u32, align: u32) -> u32 {
    value.div_ceil(align) * align
}
