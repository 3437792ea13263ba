mod connectivity;
mod http_remote;
mod protocol;
mod remote;
mod service;

pub use connectivity::{spawn_probe, Connectivity};
pub use http_remote::{check_server, HttpRemote};
pub use protocol::{Change, PullResponse};
pub use remote::{RemoteApi, RemoteError};
pub use service::{StoreEvent, SyncReport, SyncService, SyncServiceError};
