//! Resolves request paths to files inside the user workspace.
use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use url::Url;

use crate::{
    core::{
        plugin::{PluginResult, ResourcePlugin, ResourcePluginDescriptor, Resolver},
        resource::{ResourceRequest, url_extension},
    },
    ports::file_system::{FileSystem, confine},
};

pub struct UserWorkspaceResolver {
    workspace: PathBuf,
    file_system: Arc<dyn FileSystem>,
}

impl UserWorkspaceResolver {
    fn candidate(&self, url: &Url) -> Option<PathBuf> {
        if url.scheme() != "http" || url_extension(url).is_none() {
            return None;
        }
        confine(&self.workspace, url.path()).ok()
    }
}

#[async_trait]
impl Resolver for UserWorkspaceResolver {
    async fn should_resolve(&self, url: &Url, _request: &ResourceRequest) -> PluginResult<bool> {
        Ok(match self.candidate(url) {
            Some(path) => self.file_system.exists(&path).await,
            None => false,
        })
    }

    async fn resolve(&self, url: &Url, request: ResourceRequest) -> PluginResult<ResourceRequest> {
        let path = self
            .candidate(url)
            .ok_or_else(|| eyre::eyre!("{url} does not map into the user workspace"))?;
        let mut file = Url::from_file_path(&path)
            .map_err(|()| eyre::eyre!("Cannot express {} as a file URL", path.display()))?;
        file.set_query(url.query());
        Ok(request.with_url(file))
    }
}

pub fn descriptor() -> ResourcePluginDescriptor {
    ResourcePluginDescriptor::resource("plugin-user-workspace", |context| {
        Ok(ResourcePlugin::builder("plugin-user-workspace")
            .resolver(Arc::new(UserWorkspaceResolver {
                workspace: context.compilation.context.user_workspace.clone(),
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
    async fn maps_existing_workspace_files() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("styles")).unwrap();
        std::fs::write(dir.path().join("styles/main.css"), "*{}").unwrap();
        let resolver = UserWorkspaceResolver {
            workspace: dir.path().to_path_buf(),
            file_system: Arc::new(FileSystemAdapter::new()),
        };

        let url = Url::parse("http://localhost:1984/styles/main.css?v=2").unwrap();
        let request = ResourceRequest::get(url.clone());
        assert!(resolver.should_resolve(&url, &request).await.unwrap());

        let resolved = resolver.resolve(&url, request).await.unwrap();
        assert_eq!(resolved.url.scheme(), "file");
        assert!(resolved.url.path().ends_with("/styles/main.css"));
        assert_eq!(resolved.url.query(), Some("v=2"));

        let missing = Url::parse("http://localhost:1984/styles/other.css").unwrap();
        assert!(
            !resolver
                .should_resolve(&missing, &ResourceRequest::get(missing.clone()))
                .await
                .unwrap()
        );
        let route = Url::parse("http://localhost:1984/styles/").unwrap();
        assert!(
            !resolver
                .should_resolve(&route, &ResourceRequest::get(route.clone()))
                .await
                .unwrap()
        );
    }
}
