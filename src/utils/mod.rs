pub mod http;
pub(crate) mod logging;
