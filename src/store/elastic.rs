use std::{thread::sleep, time::Duration};

use rand::random;
use reqwest::{
    blocking::{Client, Response},
    Method, StatusCode,
};
use serde_json::{json, Value};
use url::Url;

use crate::config::{Credentials, StoreConfig, DEFAULT_DOCUMENT_TYPE};

use super::{AliasTable, DocumentStore, StoreError, StoreResult};

/// [`DocumentStore`] backed by the Elasticsearch REST API.
pub struct ElasticStore {
    client: Client,
    endpoint: Url,
    credentials: Option<Credentials>,
    max_retries: u8,
    mapping_type: String,
}

impl ElasticStore {
    pub fn new(config: &StoreConfig) -> StoreResult<Self> {
        let mut endpoint = Url::parse(&config.endpoint)
            .map_err(|err| StoreError::InvalidEndpoint(format!("{}: {err}", config.endpoint)))?;

        // keep path prefixes (proxies) when joining
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(ElasticStore {
            client,
            endpoint,
            credentials: config.credentials.clone(),
            max_retries: config.max_retries,
            mapping_type: DEFAULT_DOCUMENT_TYPE.to_string(),
        })
    }

    /// Document type the `date_added` mapping is declared under.
    pub fn with_document_type(mut self, doc_type: &str) -> Self {
        self.mapping_type = doc_type.to_string();
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn url(&self, path: &str) -> StoreResult<Url> {
        self.endpoint
            .join(path)
            .map_err(|err| StoreError::InvalidEndpoint(format!("{}{path}: {err}", self.endpoint)))
    }

    fn send(&self, method: Method, path: &str, body: Option<&Value>) -> StoreResult<Response> {
        let url = self.url(path)?;
        let mut attempt = 0u8;

        loop {
            log::debug!("{method} {url}");
            let mut request = self.client.request(method.clone(), url.clone());
            if let Some(credentials) = &self.credentials {
                request = request.basic_auth(&credentials.username, credentials.password.as_ref());
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let result = request.send().map_err(StoreError::from).and_then(check_status);

            match result {
                Err(err) if attempt < self.max_retries && may_repeat(&method, &err) => {
                    attempt += 1;
                    let delay_ms = 100 * 2u64.pow(attempt as u32 - 1) + rand_jitter();
                    log::info!(
                        "{method} {url}: retrying (attempt {}/{}) after error: {}, backoff {}ms",
                        attempt,
                        self.max_retries,
                        err,
                        delay_ms
                    );
                    sleep(Duration::from_millis(delay_ms));
                }
                Err(err) if err.is_retryable() && method == Method::POST => {
                    log::warn!("{method} {url}: not repeated, it may have been applied: {err}");
                    return Err(err);
                }
                other => return other,
            }
        }
    }

    fn send_json(&self, method: Method, path: &str, body: Option<&Value>) -> StoreResult<Value> {
        let response = self.send(method, path, body)?;
        Ok(response.json::<Value>()?)
    }

    fn alias_action(&self, action: &str, index: &str, alias: &str) -> StoreResult<bool> {
        let body = json!({
            "actions": [
                { action: { "index": index, "alias": alias } }
            ]
        });
        let response = self.send_json(Method::POST, "_aliases", Some(&body))?;
        Ok(acknowledged(&response))
    }
}

/// POST is not idempotent here (documents get server assigned ids, alias
/// actions fail when replayed), so it is only repeated when it never left
/// the client.
fn may_repeat(method: &Method, err: &StoreError) -> bool {
    err.is_retryable() && (*method != Method::POST || err.is_connect())
}

fn rand_jitter() -> u64 {
    random::<u64>() % 250
}

fn check_status(response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        let target = response.url().path().trim_matches('/').to_string();
        return Err(StoreError::NotFound(target));
    }
    if !status.is_success() {
        return Err(StoreError::Rejected {
            status: status.as_u16(),
            body: response.text().unwrap_or_default(),
        });
    }
    Ok(response)
}

/// Mapping sent on index creation so `date_added` is typed as a date.
pub fn create_index_body(doc_type: &str) -> Value {
    let properties = json!({
        "properties": {
            "date_added": { "type": "date" },
            "url": { "type": "keyword" },
        }
    });

    // typeless mappings for engines without document types
    if doc_type == "_doc" {
        json!({ "mappings": properties })
    } else {
        json!({ "mappings": { doc_type: properties } })
    }
}

/// Whether an engine reporting `version` rejects typed mappings (7.0 on).
pub fn requires_typeless(version: &str) -> bool {
    version
        .split('.')
        .next()
        .and_then(|major| major.parse::<u32>().ok())
        .is_some_and(|major| major >= 7)
}

pub fn acknowledged(response: &Value) -> bool {
    response
        .get("acknowledged")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Normalizes a `GET /_alias` response into index -> sorted alias names.
pub fn parse_alias_table(response: &Value) -> StoreResult<AliasTable> {
    let indices = response
        .as_object()
        .ok_or_else(|| StoreError::UnexpectedResponse(format!("alias listing: {response}")))?;

    let mut table = AliasTable::new();
    for (index, info) in indices {
        let mut aliases = info
            .get("aliases")
            .and_then(Value::as_object)
            .map(|aliases| aliases.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        aliases.sort();
        table.insert(index.clone(), aliases);
    }

    Ok(table)
}

pub fn parse_index_names(response: &Value) -> StoreResult<Vec<String>> {
    let rows = response
        .as_array()
        .ok_or_else(|| StoreError::UnexpectedResponse(format!("index listing: {response}")))?;

    let mut names = rows
        .iter()
        .filter_map(|row| row.get("index").and_then(Value::as_str))
        .filter(|name| !name.starts_with('.'))
        .map(String::from)
        .collect::<Vec<_>>();
    names.sort();

    Ok(names)
}

pub fn parse_count(response: &Value) -> StoreResult<u64> {
    response
        .get("count")
        .and_then(Value::as_u64)
        .ok_or_else(|| StoreError::UnexpectedResponse(format!("count: {response}")))
}

pub fn parse_version(response: &Value) -> StoreResult<String> {
    response
        .pointer("/version/number")
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| StoreError::UnexpectedResponse(format!("version: {response}")))
}

impl DocumentStore for ElasticStore {
    fn index_exists(&self, index: &str) -> StoreResult<bool> {
        match self.send(Method::HEAD, index, None) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn create_index(&self, index: &str) -> StoreResult<()> {
        let body = create_index_body(&self.mapping_type);
        let response = self.send_json(Method::PUT, index, Some(&body))?;
        if !acknowledged(&response) {
            return Err(StoreError::UnexpectedResponse(format!(
                "creation of {index} was not acknowledged"
            )));
        }
        Ok(())
    }

    fn index_document(&self, index: &str, doc_type: &str, body: &Value) -> StoreResult<()> {
        self.send(Method::POST, &format!("{index}/{doc_type}"), Some(body))?;
        Ok(())
    }

    fn delete_index(&self, index: &str) -> StoreResult<()> {
        match self.send(Method::DELETE, index, None) {
            Ok(_) => Ok(()),
            Err(StoreError::NotFound(_)) => Err(StoreError::NotFound(index.to_string())),
            Err(err) => Err(err),
        }
    }

    fn index_names(&self) -> StoreResult<Vec<String>> {
        let response = self.send_json(Method::GET, "_cat/indices?format=json&h=index", None)?;
        parse_index_names(&response)
    }

    fn list_aliases(&self) -> StoreResult<AliasTable> {
        let response = self.send_json(Method::GET, "_alias", None)?;
        parse_alias_table(&response)
    }

    fn add_alias(&self, index: &str, alias: &str) -> StoreResult<bool> {
        self.alias_action("add", index, alias)
    }

    fn remove_alias(&self, index: &str, alias: &str) -> StoreResult<bool> {
        self.alias_action("remove", index, alias)
    }

    fn count(&self, index: &str) -> StoreResult<u64> {
        let response = self.send_json(Method::GET, &format!("{index}/_count"), None)?;
        parse_count(&response)
    }

    fn health(&self) -> StoreResult<Value> {
        self.send_json(Method::GET, "_cluster/health", None)
    }

    fn version(&self) -> StoreResult<String> {
        let response = self.send_json(Method::GET, "", None)?;
        parse_version(&response)
    }
}
