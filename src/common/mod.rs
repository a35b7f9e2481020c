pub mod api_client;
pub mod image_utils;
pub mod settings;
