use crate::error::Error;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::iter::FromIterator;

lazy_static! {
    static ref QUALIFIED_NAME: Regex = Regex::new(r"^([^:]+):(.+)$").unwrap();
}

/// A flat mapping from library identifier to `0x`-prefixed address, as consumed by the linker.
///
/// Compilers have used three ways of naming a library over time: a bare name (`L`), a legacy
/// qualified name (`file.sol:L`), and the standard JSON nesting (`{"file.sol": {"L": ..}}`).
/// [`LibraryMap::from_json`] flattens all three so that a placeholder written in either the bare
/// or the qualified style resolves.
///
/// Addresses are stored as given; they are validated when they are used for linking.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LibraryMap {
    entries: BTreeMap<String, String>,
}

impl LibraryMap {
    pub fn new() -> Self {
        LibraryMap::default()
    }

    /// Flatten a JSON library mapping.
    ///
    /// Accepts `{name: address}`, `{"file:name": address}` and `{file: {name: address}}`, in any
    /// combination. Both the bare and the qualified form of every entry are registered.
    pub fn from_json(value: &Value) -> Result<Self, Error> {
        let obj = value.as_object().ok_or(Error::ParseJsonObjError)?;
        let mut map = LibraryMap::new();
        for (key, entry) in obj {
            match entry {
                Value::Object(nested) => {
                    for (lib, address) in nested {
                        let address = address.as_str().ok_or_else(|| {
                            Error::InvalidLibraryMapping {
                                name: format!("{}:{}", key, lib),
                            }
                        })?;
                        map.insert(lib.clone(), address);
                        map.insert(format!("{}:{}", key, lib), address);
                    }
                }
                Value::String(address) => {
                    if let Some(caps) = QUALIFIED_NAME.captures(key) {
                        map.insert(caps[2].to_owned(), address.as_str());
                    }
                    map.insert(key.clone(), address.as_str());
                }
                _ => return Err(Error::InvalidLibraryMapping { name: key.clone() }),
            }
        }
        Ok(map)
    }

    pub fn insert<N: Into<String>, A: Into<String>>(&mut self, name: N, address: A) {
        self.entries.insert(name.into(), address.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, A: Into<String>> FromIterator<(N, A)> for LibraryMap {
    fn from_iter<I: IntoIterator<Item = (N, A)>>(iter: I) -> Self {
        let mut map = LibraryMap::new();
        for (name, address) in iter {
            map.insert(name, address);
        }
        map
    }
}
