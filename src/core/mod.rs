pub mod compilation;
pub mod dev_server;
pub mod dispatch;
pub mod error;
pub mod etag;
pub mod graph;
pub mod optimize;
pub mod pipeline;
pub mod plugin;
pub mod resource;

pub use compilation::{Compilation, CompilationBuilder, CompilationContext, RunMode};
pub use dev_server::DevServer;
pub use dispatch::SiteServer;
pub use error::{PipelineError, PipelineResult};
pub use graph::{ApiManifest, PageNode, RouteGraph};
pub use optimize::optimize_output;
pub use pipeline::ResourcePipeline;
pub use plugin::{PluginContext, ResourcePlugin, ResourcePluginDescriptor};
pub use resource::{Body, ResourceRequest, ResourceResponse};
