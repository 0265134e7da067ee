use std::sync::{Arc, Mutex};

use idr_resolver::IdentityResolver;
use idr_store::ContactStore;
use idr_types::{ConsolidatedContact, Identifier};

use crate::error::{ServerError, ServerResult};

/// Shared handler state.
#[derive(Clone, Debug)]
pub struct AppState {
    resolver: IdentityResolver<dyn ContactStore>,
    /// Present when resolves must run one at a time.
    gate: Option<Arc<Mutex<()>>>,
}

impl AppState {
    pub fn new(store: Arc<dyn ContactStore>, serialize_requests: bool) -> Self {
        Self {
            resolver: IdentityResolver::new(store),
            gate: serialize_requests.then(|| Arc::new(Mutex::new(()))),
        }
    }

    pub fn resolver(&self) -> &IdentityResolver<dyn ContactStore> {
        &self.resolver
    }

    /// Run the resolver on the blocking pool; store calls may touch disk.
    pub async fn resolve(&self, identifier: Identifier) -> ServerResult<ConsolidatedContact> {
        let resolver = self.resolver.clone();
        let gate = self.gate.clone();
        tokio::task::spawn_blocking(move || {
            let _guard = gate
                .as_ref()
                .map(|g| g.lock())
                .transpose()
                .map_err(|e| ServerError::Internal(format!("resolve gate poisoned: {e}")))?;
            resolver.resolve(&identifier).map_err(ServerError::from)
        })
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
    }
}
