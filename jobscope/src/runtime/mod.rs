pub mod constants;
pub mod layout;
pub mod lock;
pub mod options;

mod core;

pub use core::ResourceManager;
pub use layout::FilesystemLayout;
pub use lock::StoreLock;
pub use options::ManagerOptions;
