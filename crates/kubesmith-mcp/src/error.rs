use kubesmith::SmithError;
use rmcp::model::ErrorData;

pub type McpError = ErrorData;

pub fn to_mcp_error(err: SmithError) -> McpError {
    ErrorData::internal_error(err.to_string(), None)
}

pub fn invalid_params(message: impl Into<String>) -> McpError {
    ErrorData::invalid_params(message.into(), None)
}
