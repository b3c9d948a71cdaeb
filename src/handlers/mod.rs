// src/handlers/mod.rs

pub mod analytics;
pub mod auth;
pub mod chats;
pub mod favorites;
pub mod gigs;
pub mod inquiries;
pub mod orders;
pub mod profiles;
pub mod reviews;
pub mod uploads;
