//! Parsers for the binary model inputs.
//!
//! All tables are little-endian with fixed-width records:
//! - `typestates.bin`: concatenated bitsets of `ceil(n_types / 8)` bytes each
//! - `interflows.bin` / `direct_invokes.bin`: `{src: u32, dst: u32}` pairs
//! - `typeflow_methods.bin`: one tagged [`ContainingMethod`] word per
//!   typeflow (index 0 is the white-hole and unused)
//! - `typeflow_filters.bin`: one filter index per typeflow
//!
//! Name tables (`types.txt`, `methods.txt`) are newline-separated, line `i`
//! naming id `i`. Shape errors are reported as [`InputError`] and abort the
//! model build; there is nothing to recover.

use thiserror::Error;

use crate::bitset::Bitset;
use crate::ids::{ContainingMethod, Edge, FilterId, MethodId, TypeflowId};

#[derive(Debug, Error)]
pub enum InputError {
    #[error("{table}: length {len} is not a multiple of the {record_size}-byte record size")]
    Truncated {
        table: &'static str,
        len: usize,
        record_size: usize,
    },
    #[error("{table}: expected {expected} records (one per typeflow), found {actual}")]
    LengthMismatch {
        table: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{table}: id {id} is out of range (limit {limit})")]
    IdOutOfRange {
        table: &'static str,
        id: u32,
        limit: usize,
    },
    #[error("interflows: typeflow edge {0} -> {0} has identical endpoints")]
    SelfLoop(u32),
    #[error("typeflow {flow}: filter index {filter} is out of range ({n_filters} filters)")]
    FilterOutOfRange {
        flow: usize,
        filter: u32,
        n_filters: usize,
    },
}

/// Raw model tables, parsed but not yet cross-validated.
#[derive(Debug, Default)]
pub struct ModelData {
    pub type_names: Vec<String>,
    pub method_names: Vec<String>,
    pub typestates: Vec<Bitset>,
    pub interflows: Vec<Edge<TypeflowId>>,
    pub direct_invokes: Vec<Edge<MethodId>>,
    pub typeflow_methods: Vec<ContainingMethod>,
    pub typeflow_filters: Vec<FilterId>,
}

/// Parse a newline-separated name table; line `i` names id `i`.
pub fn parse_names(text: &str) -> Vec<String> {
    text.lines().map(str::to_owned).collect()
}

/// Parse `typestates.bin`: fixed-size bitsets over `n_types` types.
pub fn parse_typestates(n_types: usize, bytes: &[u8]) -> Result<Vec<Bitset>, InputError> {
    let record_size = n_types.div_ceil(8);
    if record_size == 0 {
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        return Err(InputError::Truncated {
            table: "typestates",
            len: bytes.len(),
            record_size,
        });
    }
    if bytes.len() % record_size != 0 {
        return Err(InputError::Truncated {
            table: "typestates",
            len: bytes.len(),
            record_size,
        });
    }
    Ok(bytes
        .chunks_exact(record_size)
        .map(|chunk| Bitset::from_bytes(n_types, chunk))
        .collect())
}

fn parse_u32_pairs(table: &'static str, bytes: &[u8]) -> Result<Vec<(u32, u32)>, InputError> {
    if bytes.len() % 8 != 0 {
        return Err(InputError::Truncated {
            table,
            len: bytes.len(),
            record_size: 8,
        });
    }
    Ok(bytes
        .chunks_exact(8)
        .map(|c| {
            (
                u32::from_le_bytes([c[0], c[1], c[2], c[3]]),
                u32::from_le_bytes([c[4], c[5], c[6], c[7]]),
            )
        })
        .collect())
}

fn parse_u32s(table: &'static str, bytes: &[u8]) -> Result<Vec<u32>, InputError> {
    if bytes.len() % 4 != 0 {
        return Err(InputError::Truncated {
            table,
            len: bytes.len(),
            record_size: 4,
        });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Parse `interflows.bin`.
pub fn parse_typeflow_edges(bytes: &[u8]) -> Result<Vec<Edge<TypeflowId>>, InputError> {
    Ok(parse_u32_pairs("interflows", bytes)?
        .into_iter()
        .map(|(src, dst)| Edge::new(TypeflowId(src), TypeflowId(dst)))
        .collect())
}

/// Parse `direct_invokes.bin`.
pub fn parse_method_edges(bytes: &[u8]) -> Result<Vec<Edge<MethodId>>, InputError> {
    Ok(parse_u32_pairs("direct_invokes", bytes)?
        .into_iter()
        .map(|(src, dst)| Edge::new(MethodId(src), MethodId(dst)))
        .collect())
}

/// Parse `typeflow_methods.bin`; the record count defines `n_typeflows`.
pub fn parse_typeflow_methods(bytes: &[u8]) -> Result<Vec<ContainingMethod>, InputError> {
    Ok(parse_u32s("typeflow_methods", bytes)?
        .into_iter()
        .map(ContainingMethod::from_raw)
        .collect())
}

/// Parse `typeflow_filters.bin`.
pub fn parse_typeflow_filters(bytes: &[u8]) -> Result<Vec<FilterId>, InputError> {
    Ok(parse_u32s("typeflow_filters", bytes)?
        .into_iter()
        .map(FilterId)
        .collect())
}

#[cfg(test)]
#[path = "../tests/input.rs"]
mod tests;
