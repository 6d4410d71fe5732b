//! Dispatch configuration: Telegram connection, logging, encoder settings. Loaded from env.

mod dispatch_config;


pub use dispatch_config::DispatchConfig;
