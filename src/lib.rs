mod database {
    pub mod actions;
    pub mod connect;
    pub mod error;
    pub mod pagination;
    pub mod schema;
}
mod authentication {
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod recipes {
    pub mod linker;
    pub mod shopping_list;
    pub mod validation;
}
pub mod config;
mod constants;

pub use authentication::*;
pub use constants::*;
pub use database::*;
pub use recipes::*;
