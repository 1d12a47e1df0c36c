pub mod chat;
pub mod estimate;
pub mod upload;
pub mod wage;
