pub mod browse;
pub mod favorites;
pub mod matching;
pub mod notification;
pub mod session;
