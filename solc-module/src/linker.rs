//! Resolution of library address placeholders in hex-encoded bytecode.
//!
//! Unlinked bytecode carries a 40-character placeholder wherever a library address belongs. Two
//! styles have been emitted over time:
//!
//! * the legacy label `__<name>____…__`, the library name truncated to 36 characters and padded
//!   with underscores;
//! * the hashed label `__$<hash>$__`, where `<hash>` is the first 34 hex characters of the
//!   keccak256 digest of the fully qualified library name.

use crate::error::Error;
use crate::libraries::LibraryMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::collections::BTreeMap;

/// Length of a placeholder, in hex characters.
pub const PLACEHOLDER_LEN: usize = 40;

/// Length of a library address, in bytes.
pub const ADDRESS_BYTES: usize = 20;

const LABEL_NAME_LEN: usize = PLACEHOLDER_LEN - 4;
const HASH_PREFIX_LEN: usize = 34;

lazy_static! {
    static ref LINK_REFERENCE: Regex = Regex::new(r"__(.{36})__").unwrap();
}

/// A location in bytecode where a library address still has to be inserted.
///
/// `start` and `length` are in bytes of the decoded binary, not hex characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkReference {
    pub start: usize,
    pub length: usize,
}

/// Unresolved references keyed by library name, in order of appearance.
pub type LinkReferences = BTreeMap<String, Vec<LinkReference>>;

/// The legacy fixed-width placeholder for `name`.
pub fn library_label_placeholder(name: &str) -> String {
    let truncated: String = name.chars().take(LABEL_NAME_LEN).collect();
    let padding = LABEL_NAME_LEN - truncated.chars().count();
    format!("__{}{}__", truncated, "_".repeat(padding))
}

/// The hashed placeholder for `name`.
pub fn library_hash_placeholder(name: &str) -> String {
    let digest = hex::encode(Keccak256::digest(name.as_bytes()));
    format!("__${}$__", &digest[..HASH_PREFIX_LEN])
}

/// Check that `address` is `0x` followed by at most 40 hex digits, and left-pad it to 40 digits.
fn normalize_address(name: &str, address: &str) -> Result<String, Error> {
    let invalid = || Error::InvalidLibraryAddress {
        name: name.to_owned(),
    };
    let digits = address.strip_prefix("0x").ok_or_else(invalid)?;
    if digits.len() > ADDRESS_BYTES * 2 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    Ok(format!("{:0>width$}", digits, width = ADDRESS_BYTES * 2))
}

fn replace_all(bytecode: &mut String, label: &str, address: &str) {
    // every replacement removes underscores, so this terminates
    while bytecode.contains(label) {
        *bytecode = bytecode.replacen(label, address, 1);
    }
}

/// Replace every placeholder for every library in `libraries` with the library's address.
///
/// Fails without partial output if any address in the mapping is malformed.
pub fn link_bytecode(bytecode: &str, libraries: &LibraryMap) -> Result<String, Error> {
    let mut linked = bytecode.to_owned();
    for (name, address) in libraries.iter() {
        let address = normalize_address(name, address)?;
        replace_all(&mut linked, &library_label_placeholder(name), &address);
        replace_all(&mut linked, &library_hash_placeholder(name), &address);
    }
    Ok(linked)
}

/// Find the placeholders remaining in `bytecode`.
///
/// The library name is recovered from the placeholder by trimming trailing underscores, so a name
/// that itself ends in underscores cannot be told apart from its padding.
pub fn find_link_references(bytecode: &str) -> LinkReferences {
    let mut refs = LinkReferences::new();
    let mut offset = 0;
    let mut rest = bytecode;
    while let Some(caps) = LINK_REFERENCE.captures(rest) {
        let found = caps.get(0).expect("group 0 is the whole match");
        let name = caps[1].trim_end_matches('_');
        refs.entry(name.to_owned())
            .or_insert_with(Vec::new)
            .push(LinkReference {
                start: (offset + found.start()) / 2,
                length: ADDRESS_BYTES,
            });
        offset += found.end();
        rest = &rest[found.end()..];
    }
    refs
}
