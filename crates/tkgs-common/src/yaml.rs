//! YAML parsing utilities using yaml-rust2
//!
//! Cluster configuration files are parsed with yaml-rust2 and converted to
//! `serde_json::Value` so classification can walk them without typed schemas.

use serde_json::{Map, Number, Value};
use yaml_rust2::{Yaml, YamlLoader};

/// Error type for YAML parsing
#[derive(Debug, Clone)]
pub struct YamlError(String);

impl std::fmt::Display for YamlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for YamlError {}

/// Parse a multi-document YAML string into a Vec of serde_json::Values.
///
/// Each YAML document separated by `---` becomes a separate Value.
/// Empty documents are dropped.
pub fn parse_yaml_multi(input: &str) -> Result<Vec<Value>, YamlError> {
    let docs = YamlLoader::load_from_str(input).map_err(|e| YamlError(e.to_string()))?;
    docs.into_iter()
        .map(yaml_to_json)
        .filter(|doc| !matches!(doc, Ok(Value::Null)))
        .collect()
}

/// Render a scalar value as the string a config variable would hold.
///
/// Returns `None` for nulls, arrays and mappings.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Convert a yaml_rust2::Yaml value to serde_json::Value
fn yaml_to_json(yaml: Yaml) -> Result<Value, YamlError> {
    match yaml {
        Yaml::Null => Ok(Value::Null),
        Yaml::Boolean(b) => Ok(Value::Bool(b)),
        Yaml::Integer(i) => Ok(Value::Number(i.into())),
        Yaml::Real(s) => {
            let f: f64 = s
                .parse()
                .map_err(|e: std::num::ParseFloatError| YamlError(e.to_string()))?;
            Ok(Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null))
        }
        Yaml::String(s) => Ok(Value::String(s)),
        Yaml::Array(arr) => arr
            .into_iter()
            .map(yaml_to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Yaml::Hash(map) => map
            .into_iter()
            .map(|(k, v)| {
                let key = match k {
                    Yaml::String(s) => s,
                    Yaml::Integer(i) => i.to_string(),
                    Yaml::Real(r) => r,
                    Yaml::Boolean(b) => b.to_string(),
                    Yaml::Null => "null".to_string(),
                    _ => return Err(YamlError("unsupported YAML key type".to_string())),
                };
                yaml_to_json(v).map(|v| (key, v))
            })
            .collect::<Result<Map<String, Value>, _>>()
            .map(Value::Object),
        Yaml::Alias(_) => Err(YamlError("YAML aliases not supported".to_string())),
        Yaml::BadValue => Err(YamlError("bad YAML value".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flat_variables_file() {
        let yaml = r#"
CLUSTER_NAME: tkc-e2e-ab12
NAMESPACE: default
CONTROL_PLANE_MACHINE_COUNT: 3
KUBERNETES_VERSION: v1.21.2+vmware.1-tkg.1
"#;
        let docs = parse_yaml_multi(yaml).unwrap();
        assert_eq!(docs.len(), 1);
        let result = &docs[0];
        assert_eq!(result["CLUSTER_NAME"], "tkc-e2e-ab12");
        assert_eq!(result["CONTROL_PLANE_MACHINE_COUNT"], 3);
        assert_eq!(result["KUBERNETES_VERSION"], "v1.21.2+vmware.1-tkg.1");
    }

    #[test]
    fn test_parse_yaml_multi_doc_skips_empty_documents() {
        let yaml = r#"
---
apiVersion: v1
kind: Secret
---
---
apiVersion: cluster.x-k8s.io/v1beta1
kind: Cluster
"#;
        let results = parse_yaml_multi(yaml).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["kind"], "Secret");
        assert_eq!(results[1]["kind"], "Cluster");
    }

    #[test]
    fn test_parse_yaml_empty() {
        assert!(parse_yaml_multi("").unwrap().is_empty());
        assert!(parse_yaml_multi("---\n---\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_yaml_invalid() {
        assert!(parse_yaml_multi("not: valid: yaml: {{").is_err());
    }

    #[test]
    fn test_parse_yaml_nested_manifest() {
        let yaml = r#"
apiVersion: cluster.x-k8s.io/v1beta1
kind: Cluster
metadata:
  name: cc-01
spec:
  topology:
    class: tanzukubernetescluster
    workers:
      machineDeployments:
        - class: node-pool
          replicas: 2
"#;
        let docs = parse_yaml_multi(yaml).unwrap();
        let result = &docs[0];
        assert_eq!(result["spec"]["topology"]["class"], "tanzukubernetescluster");
        let mds = result["spec"]["topology"]["workers"]["machineDeployments"]
            .as_array()
            .unwrap();
        assert_eq!(mds[0]["replicas"], 2);
    }

    #[test]
    fn test_parse_yaml_float() {
        let docs = parse_yaml_multi("value: 1.5").unwrap();
        let value = docs[0]["value"].as_f64().unwrap();
        assert!((value - 1.5).abs() < 0.0001);
    }

    #[test]
    fn scalar_to_string_covers_scalars_only() {
        assert_eq!(
            scalar_to_string(&Value::String("dev".into())).as_deref(),
            Some("dev")
        );
        assert_eq!(scalar_to_string(&serde_json::json!(3)).as_deref(), Some("3"));
        assert_eq!(
            scalar_to_string(&serde_json::json!(true)).as_deref(),
            Some("true")
        );
        assert_eq!(scalar_to_string(&Value::Null), None);
        assert_eq!(scalar_to_string(&serde_json::json!(["a"])), None);
        assert_eq!(scalar_to_string(&serde_json::json!({"a": 1})), None);
    }
}
