mod deploy;
mod devices;
mod inventory;

pub use deploy::*;
pub use devices::*;
pub use inventory::*;
