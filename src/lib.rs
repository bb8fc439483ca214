//! MCP server for UI component libraries.
//!
//! Exposes validated component manifests (`list-all-components`,
//! `get-component-documentation`) and story test runs (`run-story-tests`)
//! over JSON-RPC 2.0 stdio transport, compatible with any MCP-aware AI agent.
//!
//! The two cores are usable without the server: [`schema::validate`] with
//! [`manifest::ManifestResolver`], and [`testrun::RunCoordinator`] with any
//! [`testrun::TestRunChannel`].

pub mod config;
pub mod handlers;
pub mod manifest;
pub mod protocol;
pub mod schema;
pub mod server;
pub mod state;
pub mod testrun;
