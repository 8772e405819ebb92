// Line-delimited JSON command server.

pub mod dto;
pub mod server;
