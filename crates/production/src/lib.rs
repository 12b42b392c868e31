//! Production shell for the execution book.
//!
//! - [`NodeConfig`]: TOML node configuration
//! - [`SequencerIngress`]: transport-agnostic submission entry point
//! - [`rpc`]: HTTP server exposing the ingress
//!
//! The `execbook` binary ties these together.

mod config;
mod ingress;
pub mod rpc;

pub use config::{BookSection, ConfigError, NodeConfig, RpcSection, SequencerEntry};
pub use ingress::{
    GetStatsResponse, IngressError, RequestContext, SequencerIngress, SubmitSequencerTxRequest,
    SubmitSequencerTxResponse,
};
