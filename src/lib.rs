pub mod config;
pub mod engine;
pub mod feed;
pub mod http_client;
pub mod match_fetch;
pub mod matcher;
pub mod poller;
pub mod render;
pub mod scheduler;
pub mod slots;
pub mod state;
pub mod status;
