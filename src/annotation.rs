use tracing::{error, info};

use crate::apollo::ApolloClient;
use crate::domain::OrganismName;

/// Bulk GFF3 export for `organism`.
///
/// Transport failures are logged and reported as `None`; nothing is retried.
pub fn fetch_annotation<C: ApolloClient + ?Sized>(
    client: &C,
    organism: &OrganismName,
) -> Option<String> {
    match client.write_annotation(organism) {
        Ok(text) => {
            info!(organism = %organism, bytes = text.len(), "retrieved GFF from Apollo");
            Some(text)
        }
        Err(err) => {
            error!(
                organism = %organism,
                kind = %err.kind,
                url = %err.url,
                "failed to retrieve GFF from Apollo: {}",
                err.message
            );
            None
        }
    }
}
