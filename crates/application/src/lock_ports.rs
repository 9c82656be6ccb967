mod backend;
mod clock;
mod store;

pub use backend::LockBackend;
pub use clock::{Clock, SystemClock};
pub use store::LockStore;
