/// NexusCorr Client - Shared Library
///
/// Session logic behind the `nexuscorr` terminal client, which displays a live pairwise
/// correlation matrix for up to five user-selected tickers.
///
/// The library includes:
/// - Connection state machine for the streaming channel to the correlation server
/// - Ticker validation against an external symbol registry
/// - Matrix store turning inbound snapshots into a renderable grid
pub mod shared;

// Re-export commonly used types for convenience
pub use shared::config::ClientConfig;
pub use shared::error::{ConfigError, MatrixError, RegistryError, SessionError};
pub use shared::logging::init_logging;
pub use shared::registry::{HttpSymbolRegistry, SymbolRegistry};
pub use shared::session::{
    PassReport, PassResult, SlotError, SymbolSink, TickerSlot, ValidationPass, ValidationSession,
    MIN_TICKERS, SLOT_COUNT,
};
pub use shared::store::MatrixStore;
pub use shared::types::{Cell, CorrelationMatrix};
pub use shared::validator::{SymbolValidator, ValidationOutcome, QUOTE_SUFFIX};
pub use shared::websocket::{ChannelEvent, ConnectionManager, ConnectionState, ConnectionTracker};
