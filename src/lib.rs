pub mod error;

pub mod account;
pub mod config;
pub mod credentials_file;
pub mod duration;
pub mod exchange;
pub mod idp;
pub mod saml;
pub mod secret;
pub mod store;
pub mod sts;

pub mod cmd;

#[cfg(test)]
pub(crate) mod dev;
