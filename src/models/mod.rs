pub mod chat;
pub mod legal;
pub mod websocket;
