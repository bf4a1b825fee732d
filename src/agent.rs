use std::sync::Arc;

use browse_session::{BrowseTempo, SessionLoop};
use command_dispatcher::{CommandExecutor, Dispatcher, RelayTransport};
use page_adapter::PageAdapter;
use relay_scheduler::TokioClock;
use tracing::info;

use crate::config::AgentConfig;

/// Assemble a dispatcher, with its own browse session, over `transport`
/// and `adapter`.
pub fn build_dispatcher(
    config: &AgentConfig,
    transport: Arc<dyn RelayTransport>,
    adapter: Arc<dyn PageAdapter>,
) -> Dispatcher {
    let tempo = match config.seed {
        Some(seed) => {
            info!(seed, "using seeded browse tempo");
            BrowseTempo::seeded(seed)
        }
        None => BrowseTempo::from_entropy(),
    };
    let session = Arc::new(SessionLoop::new(
        Arc::clone(&adapter),
        Arc::new(TokioClock),
        tempo,
    ));
    let executor = CommandExecutor::new(adapter, session, config.durations());
    Dispatcher::new(transport, executor, config.poll_interval())
}
