pub mod config;
pub mod error;
pub mod gemini;
pub mod multipart;
pub mod orchestrator;
pub mod routes;
pub mod types;
pub mod utils;

#[cfg(test)]
mod test_utils;
