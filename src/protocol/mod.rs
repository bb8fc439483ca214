pub mod request;
pub mod response;

pub use request::{
    ClientInfo, ComponentDocsParams, InitializeParams, JsonRpcRequest, ListComponentsParams, RpcId,
    RunStoryTestsParams, ToolCallParams,
};
pub use response::{
    JsonRpcError, JsonRpcResponse, McpError, McpErrorCode, McpErrorResponse, ToolResult,
    ToolResultContent,
};
