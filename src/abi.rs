use std::{collections::BTreeMap, str::FromStr};

use ethereum_types::H256;
use regex::Regex;
use serde::{de::Visitor, Deserialize};

use crate::{
    decode::decode, encode::encode, params::has_unique_names, signature, types::Signature,
    DecodedParams, Error, Event, Log, Param, Result, Value,
};

// Function, event and error names must be valid identifiers since they are
// hashed into selectors verbatim.
const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_$][A-Za-z0-9_$]*$";

/// Contract ABI, keyed by name. Overloaded names keep their last declaration.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Abi {
    pub constructor: Option<Constructor>,
    pub functions: BTreeMap<String, Function>,
    pub events: BTreeMap<String, Event>,
    pub errors: BTreeMap<String, ContractError>,
    pub has_receive: bool,
    pub has_fallback: bool,
}

impl Abi {
    pub fn from_reader<R>(rdr: R) -> Result<Abi>
    where
        R: std::io::Read,
    {
        serde_json::from_reader(rdr).map_err(Error::from)
    }

    /// Parses a descriptor known to be valid, such as one embedded in the
    /// program.
    ///
    /// # Panics
    ///
    /// Panics if `s` is not a valid ABI descriptor.
    pub fn from_static(s: &'static str) -> Abi {
        s.parse()
            .unwrap_or_else(|err| panic!("invalid static ABI descriptor: {}", err))
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn event(&self, name: &str) -> Option<&Event> {
        self.events.get(name)
    }

    /// Encodes a call to the function `name`.
    pub fn encode_call(&self, name: &str, args: &[Value]) -> Result<Vec<u8>> {
        self.function(name)
            .ok_or_else(|| Error::encode(format!("function `{}` not found", name)))?
            .encode_call(args)
    }

    /// Decode function input from slice, dispatching on its selector.
    pub fn decode_input_from_slice<'a>(
        &'a self,
        input: &[u8],
    ) -> Result<(&'a Function, DecodedParams)> {
        let selector = input
            .get(0..4)
            .ok_or_else(|| Error::decode("input is shorter than a selector"))?;

        let func = self
            .functions
            .values()
            .find(|func| func.method_id()[..] == *selector)
            .ok_or_else(|| {
                Error::decode(format!("no function with selector 0x{}", hex::encode(selector)))
            })?;

        let decoded = decode(&input[4..], &func.inputs)?;

        Ok((func, decoded))
    }

    /// Decode function input from a hex string, with or without `0x` prefix.
    pub fn decode_input_from_hex<'a>(
        &'a self,
        input: &str,
    ) -> Result<(&'a Function, DecodedParams)> {
        let input = input.trim();
        let bytes = hex::decode(input.strip_prefix("0x").unwrap_or(input))?;

        self.decode_input_from_slice(&bytes)
    }

    /// Decode log data, dispatching on the first topic. Anonymous events
    /// cannot be found this way.
    pub fn decode_log_from_slice<'a>(
        &'a self,
        topics: &[H256],
        data: &[u8],
    ) -> Result<(&'a Event, DecodedParams)> {
        let event_topic = topics
            .first()
            .ok_or_else(|| Error::decode("missing event topic"))?;

        let event = self
            .events
            .values()
            .find(|event| !event.anonymous && event.topic() == *event_topic)
            .ok_or_else(|| Error::decode(format!("no event with topic {:?}", event_topic)))?;

        let decoded = event.decode_data_from_slice(topics, data)?;

        Ok((event, decoded))
    }

    pub fn decode_log<'a>(&'a self, log: &Log) -> Result<(&'a Event, DecodedParams)> {
        self.decode_log_from_slice(&log.topics, &log.data)
    }

    /// Decode revert data into one of the contract's custom errors.
    pub fn decode_error<'a>(&'a self, data: &[u8]) -> Result<(&'a ContractError, DecodedParams)> {
        let selector = data
            .get(0..4)
            .ok_or_else(|| Error::decode("revert data is shorter than a selector"))?;

        let error = self
            .errors
            .values()
            .find(|error| error.selector()[..] == *selector)
            .ok_or_else(|| {
                Error::decode(format!("no error with selector 0x{}", hex::encode(selector)))
            })?;

        let decoded = decode(&data[4..], &error.inputs)?;

        Ok((error, decoded))
    }
}

impl FromStr for Abi {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(Error::from)
    }
}

impl<'de> Deserialize<'de> for Abi {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(AbiVisitor)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AbiEntry {
    #[serde(rename = "type", default)]
    type_: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<Param>,
    #[serde(default)]
    outputs: Vec<Param>,
    state_mutability: Option<StateMutability>,
    #[serde(default)]
    constant: bool,
    #[serde(default)]
    payable: bool,
    #[serde(default)]
    anonymous: bool,
}

impl AbiEntry {
    // Descriptors predating `stateMutability` only carry the `constant` and
    // `payable` flags.
    fn state_mutability(&self) -> StateMutability {
        match self.state_mutability {
            Some(state_mutability) => state_mutability,
            None if self.constant => StateMutability::View,
            None if self.payable => StateMutability::Payable,
            None => StateMutability::NonPayable,
        }
    }

    // A `constant` flag still counts when `stateMutability` disagrees.
    fn constant(&self) -> bool {
        self.constant
            || matches!(
                self.state_mutability(),
                StateMutability::View | StateMutability::Pure
            )
    }
}

/// Contract constructor definition.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Constructor {
    pub inputs: Vec<Param>,
    pub state_mutability: StateMutability,
}

impl Constructor {
    /// Appends the encoded constructor arguments to the contract bytecode.
    pub fn encode_input(&self, code: &[u8], args: &[Value]) -> Result<Vec<u8>> {
        let mut out = code.to_vec();
        out.extend(encode(args, &self.inputs)?);

        Ok(out)
    }
}

/// Contract function definition.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Function {
    pub name: String,
    pub inputs: Vec<Param>,
    pub outputs: Vec<Param>,
    pub state_mutability: StateMutability,
    /// Whether calling the function cannot modify state: it is `view` or
    /// `pure`, or its descriptor carries the legacy `constant` flag.
    pub constant: bool,
}

impl Function {
    /// Parses a declaration like `balanceOf(address owner) returns (uint256)`.
    /// The function is taken as non payable.
    pub fn from_signature(s: &str) -> Result<Function> {
        let sig: Signature = s.parse()?;

        if sig.anonymous {
            return Err(Error::parse(format!(
                "function `{}` cannot be anonymous",
                sig.name
            )));
        }

        Ok(Function {
            name: sig.name,
            inputs: sig.inputs,
            outputs: sig.outputs.unwrap_or_default(),
            state_mutability: StateMutability::NonPayable,
            constant: false,
        })
    }

    pub fn method_id(&self) -> [u8; 4] {
        signature::function_selector(&self.signature())
    }

    pub fn signature(&self) -> String {
        signature::signature(&self.name, &self.inputs)
    }

    /// Call data: the selector followed by the encoded arguments.
    pub fn encode_call(&self, args: &[Value]) -> Result<Vec<u8>> {
        let mut out = self.method_id().to_vec();

        if !self.inputs.is_empty() || !args.is_empty() {
            out.extend(encode(args, &self.inputs)?);
        }

        Ok(out)
    }

    /// Decodes call data produced by [`Function::encode_call`].
    pub fn decode_input(&self, input: &[u8]) -> Result<DecodedParams> {
        let method_id = self.method_id();
        let selector = input.get(0..4).unwrap_or(input);

        if selector != &method_id[..] {
            return Err(Error::selector_mismatch(&method_id, selector));
        }

        decode(&input[4..], &self.inputs)
    }

    /// Decodes the data returned by a call to the function.
    pub fn decode_output(&self, output: &[u8]) -> Result<DecodedParams> {
        decode(output, &self.outputs)
    }
}

impl FromStr for Function {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Function::from_signature(s)
    }
}

/// Contract custom error definition.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ContractError {
    pub name: String,
    pub inputs: Vec<Param>,
}

impl ContractError {
    pub fn signature(&self) -> String {
        signature::signature(&self.name, &self.inputs)
    }

    pub fn selector(&self) -> [u8; 4] {
        signature::function_selector(&self.signature())
    }

    /// Decodes revert data raised with this error.
    pub fn decode(&self, data: &[u8]) -> Result<DecodedParams> {
        let selector = self.selector();
        let found = data.get(0..4).unwrap_or(data);

        if found != &selector[..] {
            return Err(Error::selector_mismatch(&selector, found));
        }

        decode(&data[4..], &self.inputs)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    Payable,
    NonPayable,
    View,
    Pure,
}

struct AbiVisitor;

impl AbiVisitor {
    fn check_entry(identifier: &Regex, entry: &AbiEntry) -> std::result::Result<(), String> {
        if !identifier.is_match(&entry.name) {
            return Err(format!("invalid {} name `{}`", entry.type_, entry.name));
        }

        if !has_unique_names(&entry.inputs) || !has_unique_names(&entry.outputs) {
            return Err(format!("duplicate parameter names in `{}`", entry.name));
        }

        Ok(())
    }
}

impl<'de> Visitor<'de> for AbiVisitor {
    type Value = Abi;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "ABI")
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        let identifier =
            Regex::new(IDENTIFIER_PATTERN).map_err(<A::Error as serde::de::Error>::custom)?;

        let mut abi = Abi::default();

        while let Some(entry) = seq.next_element::<AbiEntry>()? {
            match entry.type_.as_str() {
                "receive" => abi.has_receive = true,

                "fallback" => abi.has_fallback = true,

                "constructor" => {
                    if abi.constructor.is_some() {
                        return Err(serde::de::Error::custom("multiple constructor declarations"));
                    }

                    if !has_unique_names(&entry.inputs) {
                        return Err(serde::de::Error::custom(
                            "duplicate constructor parameter names",
                        ));
                    }

                    let state_mutability = entry.state_mutability();

                    abi.constructor = Some(Constructor {
                        inputs: entry.inputs,
                        state_mutability,
                    });
                }

                "function" | "" => {
                    Self::check_entry(&identifier, &entry)
                        .map_err(<A::Error as serde::de::Error>::custom)?;

                    let state_mutability = entry.state_mutability();
                    let constant = entry.constant();

                    abi.functions.insert(
                        entry.name.clone(),
                        Function {
                            name: entry.name,
                            inputs: entry.inputs,
                            outputs: entry.outputs,
                            state_mutability,
                            constant,
                        },
                    );
                }

                "event" => {
                    Self::check_entry(&identifier, &entry)
                        .map_err(<A::Error as serde::de::Error>::custom)?;

                    abi.events.insert(
                        entry.name.clone(),
                        Event {
                            name: entry.name,
                            inputs: entry.inputs,
                            anonymous: entry.anonymous,
                        },
                    );
                }

                "error" => {
                    Self::check_entry(&identifier, &entry)
                        .map_err(<A::Error as serde::de::Error>::custom)?;

                    abi.errors.insert(
                        entry.name.clone(),
                        ContractError {
                            name: entry.name,
                            inputs: entry.inputs,
                        },
                    );
                }

                _ => {
                    return Err(serde::de::Error::custom(format!(
                        "invalid ABI entry type: {}",
                        entry.type_
                    )))
                }
            }
        }

        log::debug!(
            "loaded ABI with {} functions, {} events and {} errors",
            abi.functions.len(),
            abi.events.len(),
            abi.errors.len()
        );

        Ok(abi)
    }
}
