//! Solidity JSON ABI loading

use serde::Deserialize;

use super::item::{EventDef, EventParam, FunctionDef, StateMutability};
use super::parse::parse_type;
use super::types::ParamType;
use crate::SdkError;

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum JsonItem {
    Function {
        name: String,
        #[serde(default)]
        inputs: Vec<JsonParam>,
        #[serde(default)]
        outputs: Vec<JsonParam>,
        #[serde(default, rename = "stateMutability")]
        state_mutability: Option<String>,
        #[serde(default)]
        constant: bool,
    },
    Event {
        name: String,
        #[serde(default)]
        inputs: Vec<JsonParam>,
        #[serde(default)]
        anonymous: bool,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct JsonParam {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    indexed: bool,
    #[serde(default)]
    components: Vec<JsonParam>,
}

impl JsonParam {
    fn param_type(&self) -> Result<ParamType, SdkError> {
        match self.kind.strip_prefix("tuple") {
            Some(suffix) => {
                let members = self
                    .components
                    .iter()
                    .map(|c| c.param_type().map(|t| t.to_string()))
                    .collect::<Result<Vec<_>, _>>()?;
                parse_type(&format!("({}){}", members.join(","), suffix))
            }
            None => parse_type(&self.kind),
        }
    }
}

/// Functions and events of a contract interface
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Abi {
    pub functions: Vec<FunctionDef>,
    pub events: Vec<EventDef>,
}

impl Abi {
    /// Load a `solc --abi` style JSON array. Constructors, errors and fallbacks are skipped.
    pub fn from_json(json: &str) -> Result<Self, SdkError> {
        let items: Vec<JsonItem> = serde_json::from_str(json)
            .map_err(|e| SdkError::InvalidArgument(format!("invalid ABI JSON: {e}")))?;

        let mut abi = Abi::default();
        for item in items {
            match item {
                JsonItem::Function {
                    name,
                    inputs,
                    outputs,
                    state_mutability,
                    constant,
                } => {
                    let mutability = match state_mutability.as_deref() {
                        Some(s) => StateMutability::parse(s).ok_or_else(|| {
                            SdkError::InvalidArgument(format!("unknown state mutability {s:?}"))
                        })?,
                        None if constant => StateMutability::View,
                        None => StateMutability::NonPayable,
                    };
                    abi.functions.push(FunctionDef {
                        name,
                        inputs: types_of(&inputs)?,
                        outputs: types_of(&outputs)?,
                        mutability,
                    });
                }
                JsonItem::Event {
                    name,
                    inputs,
                    anonymous,
                } => {
                    let inputs = inputs
                        .iter()
                        .map(|p| {
                            Ok(EventParam {
                                name: p.name.clone(),
                                kind: p.param_type()?,
                                indexed: p.indexed,
                            })
                        })
                        .collect::<Result<_, SdkError>>()?;
                    abi.events.push(EventDef {
                        name,
                        inputs,
                        anonymous,
                    });
                }
                JsonItem::Other => {}
            }
        }
        Ok(abi)
    }

    /// First function called `name`
    pub fn function(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// First event called `name`
    pub fn event(&self, name: &str) -> Option<&EventDef> {
        self.events.iter().find(|e| e.name == name)
    }
}

fn types_of(params: &[JsonParam]) -> Result<Vec<ParamType>, SdkError> {
    params.iter().map(JsonParam::param_type).collect()
}
