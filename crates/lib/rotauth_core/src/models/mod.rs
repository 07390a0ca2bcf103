//! Domain models shared by the coordinator and the stores.

pub mod account;
