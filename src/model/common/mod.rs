pub mod access;
pub mod slug;
