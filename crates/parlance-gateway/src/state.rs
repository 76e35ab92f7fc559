use std::sync::Arc;

use parlance_core::config::Config;
use parlance_planner::Planner;
use parlance_ports::{Synthesizer, Transcriber};

/// Shared state for the gateway. Read-only after startup — each request runs
/// its own planner invocation against these shared, immutable handles.
pub struct GatewayState {
    pub config: Arc<Config>,
    pub planner: Arc<Planner>,
    pub transcriber: Arc<dyn Transcriber>,
    pub synthesizer: Arc<dyn Synthesizer>,
}
