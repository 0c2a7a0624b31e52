//! Request parameter assembly.
//!
//! A [`ParamMap`] is built fresh by the invoking command executor and
//! consumed once by the transport. Absent values are dropped at insertion
//! time; a map never contains nulls.

use serde_json::{Map, Value};

use crate::error::Error;

/// Ordered field-name/value mapping sent as a request body or query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamMap(Map<String, Value>);

impl ParamMap {
    /// Empty map.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Insert a field, dropping nulls.
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        if !value.is_null() {
            self.0.insert(key.to_string(), value);
        }
    }

    /// Insert a field when present; absent values are never sent.
    pub fn insert_opt(&mut self, key: &str, value: Option<impl Into<Value>>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    /// Merge trailing `KEY=VALUE` attribute tokens.
    ///
    /// # Errors
    ///
    /// Returns a usage error naming the first token without a `=`.
    pub fn extend_attrs(&mut self, attrs: &[String]) -> Result<(), Error> {
        for token in attrs {
            let (key, value) = token
                .split_once('=')
                .ok_or_else(|| Error::usage("ATTR", &format!("expected KEY=VALUE, got `{token}`")))?;
            self.insert(key, value);
        }
        Ok(())
    }

    /// Split a `OBJECT/LABEL` backup reference into `backup` + `label`.
    ///
    /// The object part may itself contain `/`; the split is on the last one.
    /// A reference without a label populates `backup` only.
    pub fn insert_backup_ref(&mut self, reference: &str) {
        match reference.rsplit_once('/') {
            Some((object, label)) => {
                self.insert("backup", object);
                self.insert("label", label);
            }
            None => self.insert("backup", reference),
        }
    }

    /// Whether no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The underlying map.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// The map as a JSON body value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// The map as query parameters, scalars stringified.
    #[must_use]
    pub fn to_query(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(key, value)| {
                let text = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), text)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_values_are_dropped() {
        let mut params = ParamMap::new();
        params.insert_opt("name", Some("v1"));
        params.insert_opt("iops", None::<u64>);
        params.insert("profile", Value::Null);

        assert_eq!(params.as_map().len(), 1);
        assert_eq!(params.as_map()["name"], "v1");
    }

    #[test]
    fn nil_dropping_is_idempotent() {
        let mut params = ParamMap::new();
        params.insert("name", "v1");
        params.insert("capacity", 1_073_741_824_u64);

        let body = params.clone().into_value();
        let decoded: Map<String, Value> =
            serde_json::from_str(&body.to_string()).expect("round trip");

        let mut rebuilt = ParamMap::new();
        for (key, value) in decoded {
            rebuilt.insert(&key, value);
        }
        assert_eq!(rebuilt, params);
    }

    #[test]
    fn attrs_merge_as_fields() {
        let mut params = ParamMap::new();
        params
            .extend_attrs(&["tier=gold".into(), "replicas=3".into()])
            .expect("valid attrs");
        assert_eq!(params.as_map()["tier"], "gold");
        assert_eq!(params.as_map()["replicas"], "3");
    }

    #[test]
    fn malformed_attr_is_a_usage_error() {
        let mut params = ParamMap::new();
        let err = params.extend_attrs(&["oops".into()]).expect_err("no =");
        assert!(err.to_string().contains("oops"));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn backup_ref_splits_on_last_slash() {
        let mut params = ParamMap::new();
        params.insert_backup_ref("pool/vol1/nightly");
        assert_eq!(params.as_map()["backup"], "pool/vol1");
        assert_eq!(params.as_map()["label"], "nightly");
    }

    #[test]
    fn backup_ref_without_label() {
        let mut params = ParamMap::new();
        params.insert_backup_ref("vol1");
        assert_eq!(params.as_map()["backup"], "vol1");
        assert!(!params.as_map().contains_key("label"));
    }

    #[test]
    fn query_stringifies_scalars() {
        let mut params = ParamMap::new();
        params.insert("profile", "gold");
        params.insert("limit", 10_u64);

        let query = params.to_query();
        assert_eq!(
            query,
            vec![
                ("limit".to_string(), "10".to_string()),
                ("profile".to_string(), "gold".to_string()),
            ]
        );
    }
}
