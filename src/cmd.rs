pub mod exchange;
pub mod resolve_roles;
