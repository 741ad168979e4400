pub mod config;
pub mod error;
pub mod journal;
pub mod types;

pub use error::{JournalError, VfsError, VfsResult};
pub use journal::{PinStateWriter, SyncJournal};
pub use types::{
    AvailabilityError, AvailabilityResult, HydrationFacts, ItemType, Mode, PinState,
    VfsItemAvailability,
};
