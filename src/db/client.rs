use helix_rs::{HelixDB, HelixDBClient, HelixError};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, info};


#[derive(Debug, Error)]
pub enum HelixClientError {
    #[error("Query {query} failed: {source}")]
    Query {
        query: String,
        #[source]
        source: HelixError,
    },
}

/// Thin HelixDB handle. Queries run exactly once; callers decide how a
/// failure degrades.
pub struct HelixClient {

    inner: HelixDB,

    base_url: String,
}

impl HelixClient {

    pub fn new(host: &str, port: u16) -> Self {
        let endpoint = format!("http://{}", host);
        let base_url = format!("http://{}:{}", host, port);

        let inner = <HelixDB as HelixDBClient>::new(Some(&endpoint), Some(port), None);

        info!("HelixClient created for {}", base_url);

        Self {
            inner,
            base_url,
        }
    }


    pub async fn execute_query<T, P>(&self, query_name: &str, params: &P) -> Result<T, HelixClientError>
    where
        T: DeserializeOwned,
        P: Serialize + Sync,
    {
        debug!("Executing query: {}", query_name);

        match self.inner.query::<P, T>(query_name, params).await {
            Ok(result) => {
                debug!("Query {} succeeded", query_name);
                Ok(result)
            }
            Err(e) => {
                debug!("Query {} failed: {}", query_name, e);
                Err(HelixClientError::Query {
                    query: query_name.to_string(),
                    source: e,
                })
            }
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
