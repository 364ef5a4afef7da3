pub mod generate;
pub mod loader;
pub mod serialized;

#[cfg(test)]
mod generate_test;
