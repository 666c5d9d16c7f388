pub mod events;
pub mod root_hints;
pub mod update_signals;
pub mod zone_catalog;

pub use events::{EngineEvent, EventBus};
pub use root_hints::{root_servers, RootServer, ROOT_HINT_TTL};
pub use update_signals::UpdateSignals;
pub use zone_catalog::{DomainNode, ZoneCatalog};
