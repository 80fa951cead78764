pub mod api;
pub mod types;

#[cfg(test)]
pub mod fake;
