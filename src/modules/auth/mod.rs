pub mod controller;
pub mod crud;
pub mod extractors;
pub mod interface;
pub mod memory;
pub mod model;
pub mod routes;
pub mod schema;
pub mod service;
pub mod store;

pub use routes::auth_routes;
pub use service::AuthService;
pub use store::CredentialStore;
