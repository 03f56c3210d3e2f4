mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod import;
    pub mod pagination;
    pub mod pool;
    pub mod schema;
    pub mod validation;
}
mod authentication {
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
pub mod config;
mod constants;
pub mod routes;

pub use authentication::*;
pub use constants::*;
pub use database::actions::*;
pub use database::*;
pub use database::pool::*;
