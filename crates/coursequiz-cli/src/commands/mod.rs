pub mod init;
pub mod play;
pub mod summary;
pub mod validate;
