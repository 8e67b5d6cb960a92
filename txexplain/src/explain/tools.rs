//! Retrieval functions offered to the model.

use crate::core::is_address;
use crate::errors::RetrievalError;
use crate::knowledge::{KnowledgeIndex, RecordType, SearchResponse};
use crate::llm::{ToolCall, ToolDefinition};
use serde_json::{json, Value};
use tracing::{debug, warn};

/// The callable retrieval functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetrievalFunction {
    /// `search_protocols{query}`
    SearchProtocols,
    /// `search_tokens{address_or_symbol}`
    SearchTokens,
    /// `search_addresses{address}`
    SearchAddresses,
}

impl RetrievalFunction {
    /// All functions, in declaration order.
    pub const ALL: [Self; 3] = [
        Self::SearchProtocols,
        Self::SearchTokens,
        Self::SearchAddresses,
    ];

    /// Looks a function up by its wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Wire name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SearchProtocols => "search_protocols",
            Self::SearchTokens => "search_tokens",
            Self::SearchAddresses => "search_addresses",
        }
    }

    /// Name of the single string argument.
    #[must_use]
    pub const fn argument(self) -> &'static str {
        match self {
            Self::SearchProtocols => "query",
            Self::SearchTokens => "address_or_symbol",
            Self::SearchAddresses => "address",
        }
    }

    /// The record type searched.
    #[must_use]
    pub const fn record_type(self) -> RecordType {
        match self {
            Self::SearchProtocols => RecordType::Protocol,
            Self::SearchTokens => RecordType::Token,
            Self::SearchAddresses => RecordType::Address,
        }
    }

    const fn description(self) -> &'static str {
        match self {
            Self::SearchProtocols => {
                "Search the knowledge base for DeFi protocols and applications by name or description"
            }
            Self::SearchTokens => "Search the knowledge base for tokens by contract address or symbol",
            Self::SearchAddresses => {
                "Search the knowledge base for well-known addresses such as routers, exchanges and bridges"
            }
        }
    }

    const fn argument_description(self) -> &'static str {
        match self {
            Self::SearchProtocols => "Protocol name or keywords, e.g. 'uniswap' or 'lending'",
            Self::SearchTokens => "Token contract address (0x...) or symbol, e.g. 'USDC'",
            Self::SearchAddresses => "Address to look up (0x...)",
        }
    }

    /// The tool definition sent to the model.
    #[must_use]
    pub fn definition(self) -> ToolDefinition {
        let arg = self.argument();
        ToolDefinition::function(
            self.name(),
            self.description(),
            json!({
                "type": "object",
                "properties": {
                    arg: {
                        "type": "string",
                        "description": self.argument_description(),
                    }
                },
                "required": [arg],
            }),
        )
    }
}

/// Definitions of all retrieval functions.
#[must_use]
pub fn retrieval_tools() -> Vec<ToolDefinition> {
    RetrievalFunction::ALL
        .into_iter()
        .map(RetrievalFunction::definition)
        .collect()
}

/// The outcome of one tool call. `response` is always sent back to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolExecution {
    /// Search payload, possibly empty with an `error` annotation.
    pub response: SearchResponse,
    /// The failure, if the call did not succeed.
    pub error: Option<RetrievalError>,
}

fn parse_argument(function: RetrievalFunction, arguments: &str) -> Result<String, RetrievalError> {
    let invalid = |reason: String| RetrievalError::InvalidArguments {
        function: function.name().to_string(),
        reason,
    };
    let value: Value = serde_json::from_str(arguments).map_err(|e| invalid(e.to_string()))?;
    let arg = value
        .get(function.argument())
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(format!("missing string argument '{}'", function.argument())))?;

    if is_address(arg) {
        Ok(arg.to_lowercase())
    } else {
        Ok(arg.to_string())
    }
}

fn raw_query(arguments: &str, function: Option<RetrievalFunction>) -> String {
    function
        .and_then(|f| {
            serde_json::from_str::<Value>(arguments)
                .ok()?
                .get(f.argument())?
                .as_str()
                .map(str::to_string)
        })
        .unwrap_or_default()
}

fn run_call(index: &dyn KnowledgeIndex, call: &ToolCall) -> Result<SearchResponse, RetrievalError> {
    let function = RetrievalFunction::from_name(&call.function.name).ok_or_else(|| {
        RetrievalError::UnknownFunction {
            name: call.function.name.clone(),
        }
    })?;
    let query = parse_argument(function, &call.function.arguments)?;
    index.search(function.record_type(), &query)
}

/// Executes one model-requested call against the index.
///
/// Never fails: an unknown function, bad arguments or a backend error
/// produce an empty response annotated with the error.
pub fn execute_call(index: &dyn KnowledgeIndex, call: &ToolCall) -> ToolExecution {
    match run_call(index, call) {
        Ok(response) => {
            debug!(tool = %call.function.name, found = response.found, "Retrieval call succeeded");
            ToolExecution {
                response,
                error: None,
            }
        }
        Err(error) => {
            warn!(tool = %call.function.name, "Retrieval call failed: {}", error);
            let function = RetrievalFunction::from_name(&call.function.name);
            ToolExecution {
                response: SearchResponse::failed(
                    raw_query(&call.function.arguments, function),
                    error.to_string(),
                ),
                error: Some(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{KnowledgeRecord, KnowledgeStore};
    use crate::testing::FailingIndex;
    use pretty_assertions::assert_eq;

    fn store() -> KnowledgeStore {
        KnowledgeStore::from_records(vec![
            KnowledgeRecord::new("token:usdc", RecordType::Token, "USD Coin (USDC)", "Stablecoin")
                .with_metadata("address", "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"),
            KnowledgeRecord::new("protocol:aave", RecordType::Protocol, "Aave", "Lending protocol"),
        ])
    }

    #[test]
    fn test_schemas_are_exact() {
        let tools = serde_json::to_value(retrieval_tools()).unwrap();
        let names: Vec<&str> = tools
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["function"]["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["search_protocols", "search_tokens", "search_addresses"]);

        assert_eq!(tools[0]["type"], "function");
        assert_eq!(tools[0]["function"]["parameters"]["required"], json!(["query"]));
        assert_eq!(
            tools[1]["function"]["parameters"]["properties"]["address_or_symbol"]["type"],
            "string"
        );
        assert_eq!(tools[2]["function"]["parameters"]["required"], json!(["address"]));
        assert_eq!(tools[2]["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn test_dispatches_to_record_type() {
        let index = store();
        let call = ToolCall::function("c1", "search_protocols", r#"{"query":"aave"}"#);
        let exec = execute_call(&index, &call);
        assert!(exec.error.is_none());
        assert_eq!(exec.response.found, 1);
        assert_eq!(exec.response.results[0].id, "protocol:aave");

        let call = ToolCall::function("c2", "search_tokens", r#"{"address_or_symbol":"aave"}"#);
        assert_eq!(execute_call(&index, &call).response.found, 0);
    }

    #[test]
    fn test_checksummed_address_is_normalized() {
        let index = store();
        let call = ToolCall::function(
            "c1",
            "search_tokens",
            r#"{"address_or_symbol":"0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"}"#,
        );
        let exec = execute_call(&index, &call);
        assert_eq!(exec.response.query, "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
        assert_eq!(exec.response.found, 1);
    }

    #[test]
    fn test_unknown_function_degrades() {
        let exec = execute_call(&store(), &ToolCall::function("c1", "search_nfts", "{}"));
        assert_eq!(
            exec.error,
            Some(RetrievalError::UnknownFunction {
                name: "search_nfts".to_string()
            })
        );
        assert_eq!(exec.response.found, 0);
        assert!(exec.response.error.is_some());
    }

    #[test]
    fn test_bad_arguments_degrade() {
        let exec = execute_call(
            &store(),
            &ToolCall::function("c1", "search_addresses", r#"{"query":"0x1"}"#),
        );
        assert!(matches!(
            exec.error,
            Some(RetrievalError::InvalidArguments { ref function, .. }) if function == "search_addresses"
        ));

        let exec = execute_call(&store(), &ToolCall::function("c1", "search_tokens", "not json"));
        assert!(exec.error.is_some());
        assert!(exec.response.results.is_empty());
    }

    #[test]
    fn test_argument_passed_through_untrimmed() {
        let index = store();
        let call = ToolCall::function("c1", "search_protocols", r#"{"query":"aave "}"#);
        let exec = execute_call(&index, &call);
        assert_eq!(exec.response.query, "aave ");
        assert_eq!(exec.response.found, 1);
        assert!((exec.response.results[0].raw_score() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_backend_failure_keeps_query() {
        let call = ToolCall::function("c1", "search_protocols", r#"{"query":"curve"}"#);
        let exec = execute_call(&FailingIndex::new("index offline"), &call);
        assert_eq!(exec.response.query, "curve");
        assert!(exec.response.error.as_deref().unwrap().contains("index offline"));
    }
}
