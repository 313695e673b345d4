use crate::core::resource::{ResourceRequest, ResourceResponse};

/// ResourceServer defines the port the HTTP adapter drives: one complete
/// response per request, errors already mapped to a status.
pub trait ResourceServer: Send + Sync + 'static {
    fn handle(
        &self,
        request: ResourceRequest,
    ) -> impl std::future::Future<Output = ResourceResponse> + Send;
}
