//! Function and event definitions

use ethkit_primitives::{Address, H256};
use ethkit_types::{Log, LogFilter};

use super::decode::decode;
use super::encode::{encode_params, event_topic, function_selector};
use super::parse::{matching_paren, parse_params, split_signature};
use super::types::{ParamType, Token};
use crate::SdkError;

/// Whether a function reads or writes state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateMutability {
    Pure,
    View,
    #[default]
    NonPayable,
    Payable,
}

impl StateMutability {
    /// Pure and view functions never need a transaction
    pub fn is_read_only(self) -> bool {
        matches!(self, StateMutability::Pure | StateMutability::View)
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "pure" => Some(StateMutability::Pure),
            "view" | "constant" => Some(StateMutability::View),
            "nonpayable" => Some(StateMutability::NonPayable),
            "payable" => Some(StateMutability::Payable),
            _ => None,
        }
    }
}

/// A contract function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub name: String,
    pub inputs: Vec<ParamType>,
    pub outputs: Vec<ParamType>,
    pub mutability: StateMutability,
}

impl FunctionDef {
    pub fn new(name: impl Into<String>, inputs: Vec<ParamType>, outputs: Vec<ParamType>) -> Self {
        Self {
            name: name.into(),
            inputs,
            outputs,
            mutability: StateMutability::default(),
        }
    }

    /// Parse `name(inputs) [mutability] [returns (outputs)]`, e.g.
    /// `"getCount() view returns (uint256)"`
    pub fn parse(sig: &str) -> Result<Self, SdkError> {
        let (name, inputs, mut rest) = split_signature(sig)?;
        let inputs = parse_params(inputs)?.into_iter().map(|p| p.kind).collect();

        let mut mutability = StateMutability::default();
        let mut outputs = Vec::new();
        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix("returns") {
                let after = after.trim_start();
                if !after.starts_with('(') {
                    return Err(SdkError::InvalidArgument(format!(
                        "expected '(' after returns in {sig:?}"
                    )));
                }
                let close = matching_paren(after, 0)?;
                outputs = parse_params(&after[1..close])?
                    .into_iter()
                    .map(|p| p.kind)
                    .collect();
                rest = after[close + 1..].trim_start();
                continue;
            }
            let (word, tail) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            match StateMutability::parse(word) {
                Some(m) => mutability = m,
                None if matches!(word, "external" | "public") => {}
                None => {
                    return Err(SdkError::InvalidArgument(format!(
                        "unexpected {word:?} in {sig:?}"
                    )))
                }
            }
            rest = tail.trim_start();
        }

        Ok(Self {
            name: name.to_string(),
            inputs,
            outputs,
            mutability,
        })
    }

    /// Canonical `name(type,...)`
    pub fn signature(&self) -> String {
        canonical(&self.name, self.inputs.iter())
    }

    pub fn selector(&self) -> [u8; 4] {
        function_selector(&self.signature())
    }

    /// Selector plus arguments, checked against the declared inputs
    pub fn encode_input(&self, args: &[Token]) -> Result<Vec<u8>, SdkError> {
        let mut out = self.selector().to_vec();
        out.extend(encode_params(&self.inputs, args).map_err(|e| match e {
            SdkError::InvalidArgument(msg) => {
                SdkError::InvalidArgument(format!("{}: {msg}", self.name))
            }
            other => other,
        })?);
        Ok(out)
    }

    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<Token>, SdkError> {
        if data.is_empty() && !self.outputs.is_empty() {
            return Err(SdkError::Decode(format!(
                "{} returned no data; is a contract deployed at this address?",
                self.name
            )));
        }
        decode(&self.outputs, data)
    }
}

/// One event parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventParam {
    pub name: String,
    pub kind: ParamType,
    pub indexed: bool,
}

/// A contract event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDef {
    pub name: String,
    pub inputs: Vec<EventParam>,
    pub anonymous: bool,
}

impl EventDef {
    pub fn new(name: impl Into<String>, inputs: Vec<EventParam>) -> Self {
        Self {
            name: name.into(),
            inputs,
            anonymous: false,
        }
    }

    /// Parse `Name(type [indexed] [name], ...) [anonymous]`
    pub fn parse(sig: &str) -> Result<Self, SdkError> {
        let (name, params, rest) = split_signature(sig)?;
        let anonymous = match rest {
            "" => false,
            "anonymous" => true,
            other => {
                return Err(SdkError::InvalidArgument(format!(
                    "unexpected {other:?} in {sig:?}"
                )))
            }
        };
        let inputs = parse_params(params)?
            .into_iter()
            .map(|p| EventParam {
                name: p.name,
                kind: p.kind,
                indexed: p.indexed,
            })
            .collect();
        Ok(Self {
            name: name.to_string(),
            inputs,
            anonymous,
        })
    }

    pub fn signature(&self) -> String {
        canonical(&self.name, self.inputs.iter().map(|p| &p.kind))
    }

    /// topic0
    pub fn topic(&self) -> H256 {
        event_topic(&self.signature())
    }

    /// Filter for this event emitted by `address`
    pub fn filter(&self, address: Address) -> LogFilter {
        let filter = LogFilter::new().address(address);
        if self.anonymous {
            filter
        } else {
            filter.event(self.topic())
        }
    }

    /// Decode a log into values in declaration order.
    ///
    /// Indexed static values come from topics. Indexed dynamic values are only
    /// present as their hash and decode as `FixedBytes`.
    pub fn decode_log(&self, log: &Log) -> Result<Vec<Token>, SdkError> {
        let mut topics = log.topics.iter();
        if !self.anonymous {
            match topics.next() {
                Some(topic0) if *topic0 == self.topic() => {}
                Some(topic0) => {
                    return Err(SdkError::Decode(format!(
                        "log topic {topic0} is not {}",
                        self.signature()
                    )))
                }
                None => return Err(SdkError::Decode(format!("log has no topics for {}", self.name))),
            }
        }

        let indexed = self.inputs.iter().filter(|p| p.indexed).count();
        if topics.len() != indexed {
            return Err(SdkError::Decode(format!(
                "{} expects {indexed} indexed topics, log has {}",
                self.name,
                topics.len()
            )));
        }

        let data_types: Vec<ParamType> = self
            .inputs
            .iter()
            .filter(|p| !p.indexed)
            .map(|p| p.kind.clone())
            .collect();
        let mut data_values = decode(&data_types, &log.data)?.into_iter();

        self.inputs
            .iter()
            .map(|param| {
                if !param.indexed {
                    return data_values
                        .next()
                        .ok_or_else(|| SdkError::Decode("missing data value".to_string()));
                }
                let topic = topics
                    .next()
                    .ok_or_else(|| SdkError::Decode("missing topic".to_string()))?;
                if param.kind.is_dynamic() {
                    Ok(Token::FixedBytes(topic.as_bytes().to_vec()))
                } else {
                    decode(std::slice::from_ref(&param.kind), topic.as_bytes())?
                        .pop()
                        .ok_or_else(|| SdkError::Decode("empty topic value".to_string()))
                }
            })
            .collect()
    }
}

fn canonical<'a>(name: &str, types: impl Iterator<Item = &'a ParamType>) -> String {
    let types: Vec<String> = types.map(ToString::to_string).collect();
    format!("{}({})", name, types.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::encode;
    use ethkit_primitives::U256;

    #[test]
    fn test_function_parse() {
        let f = FunctionDef::parse("getCount() view returns (uint256)").unwrap();
        assert_eq!(f.name, "getCount");
        assert_eq!(f.outputs, vec![ParamType::Uint(256)]);
        assert!(f.mutability.is_read_only());
        assert_eq!(f.selector(), [0xa8, 0x7d, 0x94, 0x2c]);

        let f = FunctionDef::parse("setCount(uint256 newCount)").unwrap();
        assert_eq!(f.signature(), "setCount(uint256)");
        assert_eq!(f.mutability, StateMutability::NonPayable);
    }

    #[test]
    fn test_encode_input_checks_arity() {
        let f = FunctionDef::parse("setCount(uint256)").unwrap();
        assert!(matches!(f.encode_input(&[]), Err(SdkError::InvalidArgument(_))));

        let data = f.encode_input(&[Token::uint(9u64)]).unwrap();
        assert_eq!(data.len(), 36);
        assert_eq!(data[35], 9);
    }

    #[test]
    fn test_decode_output_empty_data() {
        let f = FunctionDef::parse("getCount() view returns (uint256)").unwrap();
        assert!(matches!(f.decode_output(&[]), Err(SdkError::Decode(_))));
    }

    #[test]
    fn test_event_decode_mixed() {
        let event =
            EventDef::parse("Transfer(address indexed from, address indexed to, uint256 value)")
                .unwrap();
        assert_eq!(
            event.topic().to_hex(),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );

        let from = Address::from_bytes([0x01; 20]);
        let to = Address::from_bytes([0x02; 20]);
        let log = Log {
            topics: vec![event.topic(), from.into_word(), to.into_word()],
            data: encode(&[Token::uint(500u64)]).into(),
            ..Default::default()
        };
        assert_eq!(
            event.decode_log(&log).unwrap(),
            vec![
                Token::Address(from),
                Token::Address(to),
                Token::Uint(U256::from(500))
            ]
        );
    }

    #[test]
    fn test_event_indexed_dynamic_is_hash() {
        let event = EventDef::parse("Named(string indexed name)").unwrap();
        let hash = H256::from_bytes([0x33; 32]);
        let log = Log {
            topics: vec![event.topic(), hash],
            ..Default::default()
        };
        assert_eq!(event.decode_log(&log).unwrap(), vec![Token::bytes32(hash)]);
    }

    #[test]
    fn test_event_rejects_foreign_log() {
        let event = EventDef::parse("CountReset()").unwrap();
        let other = EventDef::parse("CountIncremented(uint256)").unwrap();
        let log = Log {
            topics: vec![other.topic()],
            ..Default::default()
        };
        assert!(matches!(event.decode_log(&log), Err(SdkError::Decode(_))));
    }
}
