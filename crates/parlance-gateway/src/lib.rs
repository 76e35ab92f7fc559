//! HTTP gateway — transport boundary for the planner.
//!
//! The gateway decodes requests, hands the planner a validated
//! [`Conversation`], and encodes the resulting [`ChatResponse`]. It owns
//! authentication-adjacent concerns (CORS, TLS); the planner stays agnostic
//! to transport encoding.
//!
//! [`Conversation`]: parlance_core::types::Conversation
//! [`ChatResponse`]: parlance_core::types::ChatResponse

pub mod server;
pub mod state;

pub use server::start_gateway;
pub use state::GatewayState;
