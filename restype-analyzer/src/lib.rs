pub mod registrar;
pub mod schema;
pub mod types;

#[cfg(test)]
mod test_util;
