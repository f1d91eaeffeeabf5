pub mod config;
pub mod core;
pub mod handlers;
pub mod matching;
pub mod message_queue;
pub mod messenger;
pub mod reaper;
pub mod session;
pub mod storage;
