pub mod credentials;
pub mod dashboard;
pub mod init;
pub mod timeline;
pub mod warehouse;
