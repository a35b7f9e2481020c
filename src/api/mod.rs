pub mod similarity_api;
pub mod similarity_structs;
