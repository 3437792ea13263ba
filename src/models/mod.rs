mod category;
mod garment;
mod outfit;
mod pending_change;
mod sync_state;

pub use category::Category;
pub use garment::Garment;
pub use outfit::{Outfit, OutfitLayer};
pub use pending_change::{EntityKind, Operation, PendingChange};
pub use sync_state::SyncState;
