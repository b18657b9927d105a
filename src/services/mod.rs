// Service module exports

pub mod api;
pub mod countdown;
pub mod notification;
pub mod policy_sync;
pub mod settings;
pub mod worker;
