//! Decision context snapshots and the providers that gather them.

pub mod file;
pub mod provider;
pub mod simulated;
pub mod store;
pub mod types;

pub use file::{CONTEXT_CSV_HEADER, FileContextProvider};
pub use provider::{ContextProvider, ProviderError};
pub use simulated::SimulatedContextProvider;
pub use store::{
    GridDataKind, GridReading, ReadingStore, SensorKind, SensorReading, StoreContextProvider,
};
pub use types::{Context, ContextBuilder, SourceStatus, SourceStatuses, Weather};
