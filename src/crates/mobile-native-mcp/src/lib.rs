//! Mobile Native MCP
//!
//! An MCP server whose `sfmobile-native-project-manager` tool walks a calling agent through
//! creating a native mobile app one tool call at a time. Workflow progress lives in a checkpoint
//! store that survives server restarts between calls.
//!
//! # Usage as Library
//!
//! ```rust,no_run
//! use mobile_native_mcp::MobileNativeMcpServer;
//! use rmcp::ServiceExt;
//! use workflow_state::WorkflowConfig;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let server = MobileNativeMcpServer::from_config(&WorkflowConfig::from_env()?).await?;
//! server.serve(rmcp::transport::stdio()).await?.waiting().await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod init;
pub mod params;
pub mod server;
pub mod workflow;

pub use cli::Cli;
pub use init::{init_tracing, log_filter, LOG_TARGETS};
pub use params::{ProjectManagerParams, ResetWorkflowOutput};
pub use server::MobileNativeMcpServer;
pub use workflow::{MobileNativeWorkflow, ORCHESTRATOR_TOOL};
