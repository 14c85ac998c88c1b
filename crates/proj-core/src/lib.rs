//! Core state store, registry and time tracking for the proj terminal hub.

pub mod ai;
pub mod audit;
pub mod config;
pub mod demo;
pub mod facade;
pub mod import;
pub mod registry;
pub mod render;
pub mod report;
pub mod store;
pub mod timer;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}


#[cfg(test)]
mod tests {
    use super::version;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
