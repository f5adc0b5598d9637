pub mod archetype;
pub mod chess;
pub mod config;
pub mod error;
pub mod fetch;
pub mod formula;
pub mod http_client;
pub mod hystats;
pub mod logging;
pub mod parse;
pub mod pipeline;
pub mod resolver;
pub mod table;
