//! Built-in resource plugins.
//!
//! Registration order matters: resolvers rewrite before any server runs, and
//! among servers the first claim wins, so page handling precedes the asset
//! families and the dev proxy comes last.
use std::path::PathBuf;

use url::Url;

use crate::core::plugin::ResourcePluginDescriptor;

pub mod dev_proxy;
pub mod node_modules;
pub mod response_headers;
pub mod standard_html;
pub mod standard_static;
pub mod user_workspace;

pub use dev_proxy::DEV_PROXY_PLUGIN;

/// Descriptors for every built-in plugin, in pipeline order.
pub fn default_plugins() -> Vec<ResourcePluginDescriptor> {
    vec![
        user_workspace::descriptor(),
        node_modules::descriptor(),
        standard_html::descriptor(),
        standard_static::css(),
        standard_static::javascript(),
        standard_static::json(),
        standard_static::image(),
        standard_static::font(),
        dev_proxy::descriptor(),
        response_headers::descriptor(),
    ]
}

/// Filesystem path of a `file:` URL.
pub(crate) fn file_path(url: &Url) -> eyre::Result<PathBuf> {
    if url.scheme() != "file" {
        eyre::bail!("{url} is not a file URL");
    }
    url.to_file_path()
        .map_err(|()| eyre::eyre!("{url} has no local file path"))
}
