pub mod contact_service;
pub mod favorite_service;
pub mod message_service;
