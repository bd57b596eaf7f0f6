use anyhow::{Context as _, Result, anyhow, bail};
use rackstat_sdk::{AllocationRecord, ListingSource, ShardRecord};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{ElasticSettings, build_http_client};

/// `_cat` API client with host failover and optional basic auth.
pub struct ElasticClient {
    http: Client,
    hosts: Vec<String>,
    username: Option<String>,
    password: Option<String>,
}

impl ElasticClient {
    pub fn new(settings: &ElasticSettings) -> Result<Self> {
        if settings.hosts.is_empty() {
            bail!("no elasticsearch hosts configured");
        }
        Ok(Self {
            http: build_http_client(settings.timeout_secs)?,
            hosts: settings
                .hosts
                .iter()
                .map(|host| host.trim_end_matches('/').to_string())
                .collect(),
            username: settings.username.clone(),
            password: settings.password.clone(),
        })
    }

    fn cat<T: DeserializeOwned>(&self, api: &str) -> Result<Vec<T>> {
        let mut last_error = None;

        for host in &self.hosts {
            let url = cat_url(host, api);
            debug!(%url, "requesting cat listing");

            let mut request = self.http.get(&url);
            if let Some(username) = &self.username {
                request = request.basic_auth(username, self.password.as_ref());
            }

            match request.send().and_then(|response| response.error_for_status()) {
                Ok(response) => {
                    return response
                        .json::<Vec<T>>()
                        .with_context(|| format!("invalid _cat/{api} payload from {host}"));
                }
                Err(error) => {
                    warn!(host = %host, api, error = %error, "elasticsearch host failed");
                    last_error = Some(error);
                }
            }
        }

        Err(match last_error {
            Some(error) => anyhow!(error).context(format!("_cat/{api} failed on every host")),
            None => anyhow!("no elasticsearch hosts configured"),
        })
    }
}

impl ListingSource for ElasticClient {
    fn allocation(&self) -> Result<Vec<AllocationRecord>> {
        self.cat("allocation")
    }

    fn shards(&self) -> Result<Vec<ShardRecord>> {
        self.cat("shards")
    }
}

fn cat_url(host: &str, api: &str) -> String {
    format!("{host}/_cat/{api}?format=json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_dropped_from_hosts() {
        let client = ElasticClient::new(&ElasticSettings {
            hosts: vec!["http://es-1:9200/".to_string(), "http://es-2:9200".to_string()],
            ..ElasticSettings::default()
        })
        .expect("client");
        assert_eq!(
            cat_url(&client.hosts[0], "allocation"),
            "http://es-1:9200/_cat/allocation?format=json"
        );
        assert_eq!(client.hosts[1], "http://es-2:9200");
    }

    #[test]
    fn empty_host_list_is_rejected() {
        let settings = ElasticSettings {
            hosts: Vec::new(),
            ..ElasticSettings::default()
        };
        assert!(ElasticClient::new(&settings).is_err());
    }
}
