use std::str::FromStr;

use ethereum_types::H256;

use crate::{
    decode::decode, signature, topics, types::Signature, DecodedParams, Error, Param, Result,
    Value,
};

/// A log record emitted by a contract.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Log {
    pub topics: Vec<H256>,
    pub data: Vec<u8>,
}

/// Contract event definition.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Event {
    /// Event name.
    pub name: String,
    /// Event inputs.
    pub inputs: Vec<Param>,
    /// Whether the event is anonymous or not.
    pub anonymous: bool,
}

impl Event {
    /// Parses a declaration like
    /// `Transfer(address indexed from, address indexed to, uint256 value)`.
    pub fn from_signature(s: &str) -> Result<Event> {
        let sig: Signature = s.parse()?;

        if sig.outputs.is_some() {
            return Err(Error::parse(format!("event `{}` cannot return values", sig.name)));
        }

        Ok(Event {
            name: sig.name,
            inputs: sig.inputs,
            anonymous: sig.anonymous,
        })
    }

    /// Returns the event's signature.
    pub fn signature(&self) -> String {
        signature::signature(&self.name, &self.inputs)
    }

    /// Compute the event's topic hash
    pub fn topic(&self) -> H256 {
        signature::event_topic(&self.signature())
    }

    pub fn indexed_inputs(&self) -> impl Iterator<Item = &Param> {
        self.inputs.iter().filter(|input| input.indexed)
    }

    pub fn non_indexed_inputs(&self) -> impl Iterator<Item = &Param> {
        self.inputs.iter().filter(|input| !input.indexed)
    }

    /// Whether `log` was emitted by this event, i.e. its first topic is the
    /// event's topic hash. Anonymous events have no such topic and never
    /// match.
    pub fn matches(&self, log: &Log) -> bool {
        !self.anonymous && log.topics.first() == Some(&self.topic())
    }

    /// Encodes the topics a log of this event carries for the given indexed
    /// values, topic hash first unless the event is anonymous.
    pub fn encode_topics(&self, indexed: &[Value]) -> Result<Vec<H256>> {
        let params: Vec<_> = self.indexed_inputs().collect();

        if params.len() != indexed.len() {
            return Err(Error::encode(format!(
                "expected {} indexed values, got {}",
                params.len(),
                indexed.len()
            )));
        }

        let mut out = vec![];
        if !self.anonymous {
            out.push(self.topic());
        }

        for (param, value) in params.into_iter().zip(indexed) {
            out.push(topics::encode_topic(&param.type_, value)?);
        }

        Ok(out)
    }

    /// Decodes the indexed inputs from `topics`, which must hold exactly one
    /// topic per indexed input (topic hash excluded).
    ///
    /// Inputs stored as a hash are returned as their 32 byte hash in a
    /// `Value::FixedBytes`.
    pub fn parse_topics(&self, topics: &[H256]) -> Result<Vec<Value>> {
        let params: Vec<_> = self.indexed_inputs().collect();

        if params.len() != topics.len() {
            return Err(Error::decode(format!(
                "event {} has {} indexed inputs, got {} topics",
                self.name,
                params.len(),
                topics.len()
            )));
        }

        params
            .into_iter()
            .zip(topics)
            .map(|(param, topic)| {
                if topics::is_hashed_topic(&param.type_) {
                    Ok(Value::FixedBytes(topic.as_bytes().to_vec()))
                } else {
                    topics::decode_topic(&param.type_, topic)
                }
            })
            .collect()
    }

    /// Parses a log emitted by this event into its inputs, in declaration
    /// order.
    ///
    /// Anonymous events have no topic hash to check, so their logs are
    /// parsed without a selector check even though [`Event::matches`]
    /// never accepts them.
    pub fn parse_log(&self, log: &Log) -> Result<DecodedParams> {
        if !self.anonymous && !self.matches(log) {
            log::trace!("log does not match event {}", self.name);

            let found = log.topics.first().map(H256::as_bytes).unwrap_or_default();
            return Err(Error::selector_mismatch(self.topic().as_bytes(), found));
        }

        self.decode_data_from_slice(&log.topics, &log.data)
    }

    /// Decode event params from a log's topics and data.
    ///
    /// The first topic is skipped for non anonymous events without being
    /// checked against the event's topic hash.
    pub fn decode_data_from_slice(&self, mut topics: &[H256], data: &[u8]) -> Result<DecodedParams> {
        // strip event topic from the topics array
        // so that we end up with only the values we
        // need to decode
        if !self.anonymous {
            topics = topics
                .get(1..)
                .ok_or_else(|| Error::decode("missing event topic"))?;
        }

        let non_indexed: Vec<_> = self.non_indexed_inputs().cloned().collect();

        let mut data_values = decode(data, &non_indexed)?.into_values().into_iter();
        let mut topics_values = self.parse_topics(topics)?.into_iter();

        let mut decoded = vec![];
        for input in self.inputs.iter().cloned() {
            let value = if input.indexed {
                topics_values.next()
            } else {
                data_values.next()
            };

            // Both sides were decoded from the same partition of the inputs.
            let value = value.ok_or_else(|| Error::decode("insufficient decoded values"))?;

            decoded.push((input, value));
        }

        Ok(DecodedParams::from(decoded))
    }
}

impl FromStr for Event {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Event::from_signature(s)
    }
}
