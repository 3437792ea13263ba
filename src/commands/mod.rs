mod config_cmd;
mod garment;
mod outfit;
mod sync_cmd;

pub use config_cmd::ConfigCommand;
pub use garment::GarmentCommand;
pub use outfit::OutfitCommand;
pub use sync_cmd::SyncCommand;
