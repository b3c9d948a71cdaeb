// src/models/mod.rs

pub mod analytics;
pub mod chat;
pub mod favorite;
pub mod gig;
pub mod inquiry;
pub mod order;
pub mod profile;
pub mod review;
pub mod user;
