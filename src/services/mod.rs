pub mod autoload_service;
pub mod fetch_service;
pub mod merge_service;
