pub mod fixtures;
pub mod proxy_sink;

#[allow(unused_imports)]
pub use proxy_sink::ProxySink;
