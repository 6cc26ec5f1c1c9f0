pub mod auth;
pub mod check_auth;
pub mod deploy;
pub mod fix;
pub mod init;
pub mod install;
pub mod logout;
pub mod networks;
