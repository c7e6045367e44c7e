//! Method-spec resolution.
//!
//! A spec is an exact method name, a `prefix*` pattern selecting every
//! method whose name starts with the prefix, or a bare decimal id. Unknown
//! names are the one recoverable error in the system and are reported here.

use anyhow::{Result, bail};
use rustc_hash::FxHashSet;

use causq_model::{MethodId, Model};

/// Resolve a list of method specs against the model's name table.
/// Duplicates are dropped; order of first mention is preserved.
pub fn resolve_methods(model: &Model, specs: &[String]) -> Result<Vec<MethodId>> {
    let mut out = Vec::new();
    let mut seen = FxHashSet::default();
    for spec in specs {
        let spec = spec.trim();
        if spec.is_empty() {
            continue;
        }
        if let Some(prefix) = spec.strip_suffix('*') {
            let mut matched = false;
            for (i, name) in model.method_names.iter().enumerate() {
                if i != 0 && name.starts_with(prefix) {
                    matched = true;
                    let mid = MethodId(i as u32);
                    if seen.insert(mid) {
                        out.push(mid);
                    }
                }
            }
            if !matched {
                bail!("no method matches the pattern {spec:?}");
            }
        } else if let Some(&mid) = model.method_ids_by_name.get(spec) {
            if seen.insert(mid) {
                out.push(mid);
            }
        } else if let Ok(id) = spec.parse::<u32>() {
            if (id as usize) >= model.adj.n_methods() {
                bail!("method id {id} is out of range");
            }
            let mid = MethodId(id);
            if seen.insert(mid) {
                out.push(mid);
            }
        } else {
            bail!("method {spec:?} doesn't exist");
        }
    }
    Ok(out)
}

/// Resolve exactly one method.
pub fn resolve_method(model: &Model, spec: &str) -> Result<MethodId> {
    let resolved = resolve_methods(model, std::slice::from_ref(&spec.to_owned()))?;
    match resolved.as_slice() {
        [one] => Ok(*one),
        [] => bail!("method {spec:?} doesn't exist"),
        many => bail!("{spec:?} is ambiguous: {} methods match", many.len()),
    }
}

#[cfg(test)]
#[path = "../tests/resolve.rs"]
mod tests;
