// Dispatch client contract: a request in, a cancellable stream of partial responses out.

use futures_util::stream::BoxStream;
use std::sync::Arc;

use crate::error::QueryError;
use crate::models::{DataSource, QueryRequest, QueryResponse};

/// Partial responses, ending with completion (`None`) or an error item.
/// Dropping the stream cancels the request and frees its resources.
pub type QueryResponseStream = BoxStream<'static, Result<QueryResponse, QueryError>>;

pub trait QueryClient: Send + Sync {
    fn query(&self, request: QueryRequest) -> QueryResponseStream;
}

/// Builds a dispatch client for a stored datasource.
pub trait QueryClientFactory: Send + Sync {
    fn client_for(&self, datasource: &DataSource) -> Result<Arc<dyn QueryClient>, QueryError>;
}
