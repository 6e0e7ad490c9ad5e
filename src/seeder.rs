use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{info, warn};

/// What to do when the portal API rejects a seeding request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log the rejection and keep going; the UI check may still be useful.
    Continue,
    /// Stop the scenario; nothing downstream makes sense without this record.
    Abort,
}

#[derive(Debug, Clone)]
pub struct SeedStep {
    /// Short human label used in log lines, e.g. "create client".
    pub label: String,
    pub method: Method,
    /// API path, may reference earlier captures as `{name.id}` / `{name.token}`.
    pub path: String,
    /// Flat field map sent as the JSON request body.
    pub record: Value,
    pub policy: FailurePolicy,
    /// Name under which the response entity is kept for later steps.
    pub save_as: Option<String>,
}

impl SeedStep {
    pub fn post(label: &str, path: &str, record: Value) -> Self {
        Self {
            label: label.to_string(),
            method: Method::POST,
            path: path.to_string(),
            record,
            policy: FailurePolicy::Continue,
            save_as: None,
        }
    }

    pub fn must_succeed(mut self) -> Self {
        self.policy = FailurePolicy::Abort;
        self
    }

    pub fn save_as(mut self, name: &str) -> Self {
        self.save_as = Some(name.to_string());
        self
    }
}

/// Identifier and portal token captured from a successful seeding response.
///
/// The token is opaque: it is carried through into URLs exactly as the server
/// returned it, never parsed or re-encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatedEntity {
    pub id: Option<String>,
    pub token: Option<String>,
}

impl CreatedEntity {
    pub fn from_response(body: &Value) -> Self {
        let id = match body.get("id") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let token = body
            .get("token")
            .and_then(Value::as_str)
            .map(str::to_string);
        Self { id, token }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "id" => self.id.as_deref(),
            "token" => self.token.as_deref(),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ExpandError {
    #[error("unclosed placeholder in `{0}`")]
    Unclosed(String),
    #[error("malformed placeholder `{{{0}}}`, expected `{{name.field}}`")]
    Malformed(String),
    #[error("placeholder `{{{0}.{1}}}` has no captured value")]
    Missing(String, String),
}

/// Substitutes `{name.field}` references with values captured from earlier
/// seeding responses. Substitution is plain byte splicing so captured tokens
/// survive unmodified.
pub fn expand(
    template: &str,
    entities: &HashMap<String, CreatedEntity>,
) -> Result<String, ExpandError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .ok_or_else(|| ExpandError::Unclosed(template.to_string()))?;
        let inner = &after[..end];
        let (name, field) = inner
            .split_once('.')
            .ok_or_else(|| ExpandError::Malformed(inner.to_string()))?;
        let value = entities
            .get(name)
            .and_then(|e| e.field(field))
            .ok_or_else(|| ExpandError::Missing(name.to_string(), field.to_string()))?;
        out.push_str(value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Expands placeholders inside every string value of a JSON record.
pub fn expand_record(
    record: &Value,
    entities: &HashMap<String, CreatedEntity>,
) -> Result<Value, ExpandError> {
    Ok(match record {
        Value::String(s) => Value::String(expand(s, entities)?),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), expand_record(v, entities)?);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| expand_record(v, entities))
                .collect::<Result<_, _>>()?,
        ),
        other => other.clone(),
    })
}

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("{label} request failed: {source}")]
    Transport {
        label: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{label} rejected with status {status}: {body}")]
    Rejected {
        label: String,
        status: StatusCode,
        body: String,
    },
    #[error(transparent)]
    Expand(#[from] ExpandError),
}

/// Issues the fixture-creating API calls for a scenario.
///
/// No retries and no idempotency keys: every run creates fresh records in the
/// target system, the same way the verification scripts always have.
pub struct Seeder {
    http: Client,
    base_url: String,
}

impl Seeder {
    pub fn new(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Runs one seeding call. Returns the captured entity on success, `None`
    /// when a `Continue`-policy step was rejected.
    pub async fn seed(
        &self,
        step: &SeedStep,
        entities: &HashMap<String, CreatedEntity>,
    ) -> Result<Option<CreatedEntity>, SeedError> {
        let path = expand(&step.path, entities)?;
        let record = expand_record(&step.record, entities)?;
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .request(step.method.clone(), url.as_str())
            .json(&record)
            .send()
            .await
            .map_err(|e| SeedError::Transport {
                label: step.label.clone(),
                source: e,
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            match step.policy {
                FailurePolicy::Abort => {
                    return Err(SeedError::Rejected {
                        label: step.label.clone(),
                        status,
                        body,
                    });
                }
                FailurePolicy::Continue => {
                    warn!("Failed to {}: {} {}", step.label, status, body);
                    return Ok(None);
                }
            }
        }

        let entity = serde_json::from_str::<Value>(&body)
            .map(|v| CreatedEntity::from_response(&v))
            .unwrap_or_default();
        match (&entity.id, &entity.token) {
            (Some(id), Some(token)) => {
                info!("{}: created id {} with portal token {}", step.label, id, token)
            }
            (Some(id), None) => info!("{}: created id {}", step.label, id),
            _ => info!("{}: done ({})", step.label, status),
        }
        Ok(Some(entity))
    }

    /// Runs an ordered list of seeding steps, capturing entities under their
    /// `save_as` names. An `Abort`-policy rejection stops the run before any
    /// later step is issued.
    pub async fn apply(
        &self,
        steps: &[SeedStep],
    ) -> Result<HashMap<String, CreatedEntity>, SeedError> {
        let mut entities = HashMap::new();
        for step in steps {
            let created = self.seed(step, &entities).await?;
            if let (Some(name), Some(entity)) = (&step.save_as, created) {
                entities.insert(name.clone(), entity);
            }
        }
        Ok(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entities_with(name: &str, id: &str, token: &str) -> HashMap<String, CreatedEntity> {
        let mut entities = HashMap::new();
        entities.insert(
            name.to_string(),
            CreatedEntity {
                id: Some(id.to_string()),
                token: Some(token.to_string()),
            },
        );
        entities
    }

    #[test]
    fn entity_extraction_accepts_string_and_numeric_ids() {
        let entity = CreatedEntity::from_response(&json!({"id": "abc-1", "token": "t0k"}));
        assert_eq!(entity.id.as_deref(), Some("abc-1"));
        assert_eq!(entity.token.as_deref(), Some("t0k"));

        let entity = CreatedEntity::from_response(&json!({"id": 42, "name": "x"}));
        assert_eq!(entity.id.as_deref(), Some("42"));
        assert_eq!(entity.token, None);
    }

    #[test]
    fn expand_splices_token_byte_for_byte() {
        let entities = entities_with("client", "7", "oP-aque_%7e.TOKEN");
        let url = expand("/portal/{client.token}", &entities).unwrap();
        assert_eq!(url, "/portal/oP-aque_%7e.TOKEN");
    }

    #[test]
    fn expand_handles_multiple_references() {
        let entities = entities_with("client", "c9", "tk");
        let path = expand("/api/clients/{client.id}/resources", &entities).unwrap();
        assert_eq!(path, "/api/clients/c9/resources");
        let both = expand("{client.id}:{client.token}", &entities).unwrap();
        assert_eq!(both, "c9:tk");
    }

    #[test]
    fn expand_rejects_unknown_and_malformed_placeholders() {
        let entities = entities_with("client", "c9", "tk");
        assert!(matches!(
            expand("/x/{client.nope}", &entities),
            Err(ExpandError::Missing(_, _))
        ));
        assert!(matches!(
            expand("/x/{missing.id}", &entities),
            Err(ExpandError::Missing(_, _))
        ));
        assert!(matches!(
            expand("/x/{client}", &entities),
            Err(ExpandError::Malformed(_))
        ));
        assert!(matches!(
            expand("/x/{client.id", &entities),
            Err(ExpandError::Unclosed(_))
        ));
    }

    #[test]
    fn expand_record_rewrites_nested_string_values_only() {
        let entities = entities_with("client", "c9", "tk");
        let record = json!({
            "title": "Test Resource Video",
            "clientId": "{client.id}",
            "meta": {"owner": "{client.id}"},
            "count": 3
        });
        let expanded = expand_record(&record, &entities).unwrap();
        assert_eq!(expanded["clientId"], "c9");
        assert_eq!(expanded["meta"]["owner"], "c9");
        assert_eq!(expanded["title"], "Test Resource Video");
        assert_eq!(expanded["count"], 3);
    }
}
