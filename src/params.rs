use std::{borrow::Cow, collections::HashSet, convert::TryFrom, ops::Deref};

use serde::Deserialize;

use crate::{Error, Type, Value};

/// A named tuple field: a function or event parameter, or a struct member.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "ParamEntry")]
pub struct Param {
    /// Field name, possibly empty.
    pub name: String,
    /// Field type.
    pub type_: Type,
    /// Whether the field is stored in a log topic. Only meaningful for
    /// event inputs.
    pub indexed: bool,
}

impl Param {
    pub fn new(name: impl Into<String>, type_: Type) -> Param {
        Param {
            name: name.into(),
            type_,
            indexed: false,
        }
    }

    pub fn indexed(name: impl Into<String>, type_: Type) -> Param {
        Param {
            name: name.into(),
            type_,
            indexed: true,
        }
    }
}

// Descriptor form of a parameter. `tuple` types carry their fields in
// `components` and may have array suffixes, e.g. `tuple[2][]`.
#[derive(Deserialize)]
struct ParamEntry {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    type_: String,
    #[serde(default)]
    indexed: bool,
    #[serde(default)]
    components: Vec<Param>,
}

impl TryFrom<ParamEntry> for Param {
    type Error = Error;

    fn try_from(entry: ParamEntry) -> Result<Self, Self::Error> {
        let type_ = match entry.type_.strip_prefix("tuple") {
            Some(suffix) => {
                if entry.components.is_empty() {
                    return Err(Error::parse(format!(
                        "tuple `{}` has no components",
                        entry.name
                    )));
                }

                if !has_unique_names(&entry.components) {
                    return Err(Error::parse(format!(
                        "duplicate component names in `{}`",
                        entry.name
                    )));
                }

                Type::Tuple(entry.components).with_array_suffix(suffix)?
            }
            None => entry.type_.parse()?,
        };

        Ok(Param {
            name: entry.name,
            type_,
            indexed: entry.indexed,
        })
    }
}

/// Whether every non-empty name in `params` is distinct.
pub(crate) fn has_unique_names(params: &[Param]) -> bool {
    let mut seen = HashSet::new();

    params
        .iter()
        .filter(|param| !param.name.is_empty())
        .all(|param| seen.insert(param.name.as_str()))
}

/// A decoded value together with the parameter it was decoded for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedParam {
    pub param: Param,
    pub value: Value,
}

/// Ordered result of a decode, keyed by parameter name.
///
/// Unnamed parameters are keyed by their position, so the output of
/// `balanceOf` can be read with `params.get("0")`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecodedParams(Vec<DecodedParam>);

impl DecodedParams {
    /// Returns the value decoded for the parameter named `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0
            .iter()
            .enumerate()
            .find(|(i, decoded)| key(*i, &decoded.param) == name)
            .map(|(_, decoded)| &decoded.value)
    }

    /// Parameter keys in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = Cow<'_, str>> {
        self.0
            .iter()
            .enumerate()
            .map(|(i, decoded)| key(i, &decoded.param))
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.0.iter().map(|decoded| &decoded.value)
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0.into_iter().map(|decoded| decoded.value).collect()
    }
}

fn key(index: usize, param: &Param) -> Cow<'_, str> {
    if param.name.is_empty() {
        Cow::Owned(index.to_string())
    } else {
        Cow::Borrowed(&param.name)
    }
}

impl Deref for DecodedParams {
    type Target = [DecodedParam];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl IntoIterator for DecodedParams {
    type Item = DecodedParam;
    type IntoIter = std::vec::IntoIter<DecodedParam>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<Vec<(Param, Value)>> for DecodedParams {
    fn from(v: Vec<(Param, Value)>) -> Self {
        Self(
            v.into_iter()
                .map(|(param, value)| DecodedParam { param, value })
                .collect(),
        )
    }
}
