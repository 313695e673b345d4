//! Resolves `/node_modules/...` requests to the project's installed packages.
use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use url::Url;

use crate::{
    core::{
        plugin::{PluginResult, ResourcePlugin, ResourcePluginDescriptor, Resolver},
        resource::ResourceRequest,
    },
    ports::file_system::{FileSystem, confine},
};

const PREFIX: &str = "/node_modules/";

pub struct NodeModulesResolver {
    project_dir: PathBuf,
    file_system: Arc<dyn FileSystem>,
}

#[async_trait]
impl Resolver for NodeModulesResolver {
    async fn should_resolve(&self, url: &Url, _request: &ResourceRequest) -> PluginResult<bool> {
        if url.scheme() != "http" || !url.path().starts_with(PREFIX) {
            return Ok(false);
        }
        Ok(match confine(&self.project_dir, url.path()) {
            Ok(path) => self.file_system.exists(&path).await,
            Err(_) => false,
        })
    }

    async fn resolve(&self, url: &Url, request: ResourceRequest) -> PluginResult<ResourceRequest> {
        let path = confine(&self.project_dir, url.path())?;
        let file = Url::from_file_path(&path)
            .map_err(|()| eyre::eyre!("Cannot express {} as a file URL", path.display()))?;
        Ok(request.with_url(file))
    }
}

pub fn descriptor() -> ResourcePluginDescriptor {
    ResourcePluginDescriptor::resource("plugin-node-modules", |context| {
        Ok(ResourcePlugin::builder("plugin-node-modules")
            .resolver(Arc::new(NodeModulesResolver {
                project_dir: context.compilation.context.project_dir.clone(),
                file_system: context.file_system.clone(),
            }))
            .build())
    })
    .default_plugin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::FileSystemAdapter;

    #[tokio::test]
    async fn resolves_installed_package_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let package = dir.path().join("node_modules/lit");
        std::fs::create_dir_all(&package).unwrap();
        std::fs::write(package.join("index.js"), "export {}").unwrap();
        let resolver = NodeModulesResolver {
            project_dir: dir.path().to_path_buf(),
            file_system: Arc::new(FileSystemAdapter::new()),
        };

        let url = Url::parse("http://localhost:1984/node_modules/lit/index.js").unwrap();
        let request = ResourceRequest::get(url.clone());
        assert!(resolver.should_resolve(&url, &request).await.unwrap());
        let resolved = resolver.resolve(&url, request).await.unwrap();
        assert!(resolved.url.path().ends_with("node_modules/lit/index.js"));

        let other = Url::parse("http://localhost:1984/lit/index.js").unwrap();
        assert!(
            !resolver
                .should_resolve(&other, &ResourceRequest::get(other.clone()))
                .await
                .unwrap()
        );
    }
}
