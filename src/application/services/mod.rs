//! Application services - core components other than storage

pub mod auth;
pub mod command_service;
pub mod communication;
pub mod task_manager;

pub use auth::Auth;
pub use command_service::CommandService;
pub use communication::Communication;
pub use task_manager::TaskManager;
