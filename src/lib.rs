pub mod audio;
pub mod comments;
pub mod config;
pub mod event;
pub mod http;
pub mod lyrics;
pub mod model;
pub mod util;
