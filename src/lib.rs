#![forbid(unsafe_code)]

pub mod background;
pub mod color;
pub mod composite;
pub mod config;
pub mod context;
pub mod error;
pub mod fetch;
pub mod mpris;
pub mod pipeline;
pub mod processors;
pub mod template;
pub mod vars;

pub use config::{Config, Layer, LayerId, LogLevel, ProcessorCall};
pub use context::{Context, Screen, TrackMetadata};
pub use error::{ArtwallError, ArtwallResult};
pub use pipeline::{process_image, process_layer};
pub use processors::{ProcessorArgs, ProcessorRegistry};
pub use template::VarSet;
pub use vars::ProviderRegistry;
