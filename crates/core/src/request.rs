//! Building job submissions from the configured template and per-item
//! overrides.
//!
//! A [`JobTemplate`] holds everything that is identical across the jobs a
//! manager submits: job type, base arguments, job settings, units and the
//! tags inherited by children. [`JobTemplate::build`] merges a per-item
//! override on top and produces the [`JobRequest`] handed to the
//! job-queue client.

use serde_json::Value;

use crate::error::CoreError;
use crate::types::ParamMap;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Key of a parameter item that selects a different job type.
pub const JOB_TYPE_OVERRIDE_KEY: &str = "spider";

/// Key under which the job settings map is embedded in the parameters.
pub const JOB_SETTINGS_KEY: &str = "job_settings";

/// Tag prefix scoping jobs to a run/flow.
pub const FLOW_ID_TAG: &str = "FLOW_ID";

/// Tag prefix naming the manager that submitted a job.
pub const PARENT_NAME_TAG: &str = "PARENT_NAME";

// ---------------------------------------------------------------------------
// JobRequest
// ---------------------------------------------------------------------------

/// A fully resolved submission.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    pub job_type: String,
    pub params: ParamMap,
    pub units: Option<u32>,
    pub tags: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// JobTemplate
// ---------------------------------------------------------------------------

/// Submission settings shared by every job of a run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobTemplate {
    pub job_type: String,
    pub job_args: ParamMap,
    pub job_settings: ParamMap,
    pub units: Option<u32>,
    pub children_tags: Vec<String>,
    pub flow_id: Option<String>,
    pub name: Option<String>,
}

impl JobTemplate {
    pub fn new(job_type: impl Into<String>) -> Self {
        Self {
            job_type: job_type.into(),
            ..Default::default()
        }
    }

    pub fn with_args(mut self, args: ParamMap) -> Self {
        self.job_args = args;
        self
    }

    pub fn with_settings(mut self, settings: ParamMap) -> Self {
        self.job_settings = settings;
        self
    }

    pub fn with_flow_id(mut self, flow_id: impl Into<String>) -> Self {
        self.flow_id = Some(flow_id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Tag identifying jobs of this run, if a flow id is set.
    pub fn flow_tag(&self) -> Option<String> {
        self.flow_id.as_deref().map(flow_tag)
    }

    /// Resolve a submission.
    ///
    /// `job_type` replaces the template's job type when given; the
    /// entries of `args_override` replace same-named base arguments.
    pub fn build(&self, job_type: Option<String>, args_override: Option<&ParamMap>) -> JobRequest {
        let mut params = merge_params(&self.job_args, args_override);
        params.insert(
            JOB_SETTINGS_KEY.to_string(),
            Value::Object(self.job_settings.clone()),
        );

        JobRequest {
            job_type: job_type.unwrap_or_else(|| self.job_type.clone()),
            params,
            units: self.units,
            tags: children_tags(
                &self.children_tags,
                self.flow_id.as_deref(),
                self.name.as_deref(),
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `FLOW_ID=<flow_id>`
pub fn flow_tag(flow_id: &str) -> String {
    format!("{FLOW_ID_TAG}={flow_id}")
}

/// Compute the tags added to every child job.
///
/// Extra tags, plus the flow tag and (only within a flow) the parent
/// name tag. The result is sorted and de-duplicated; `None` when empty.
pub fn children_tags(
    extra: &[String],
    flow_id: Option<&str>,
    name: Option<&str>,
) -> Option<Vec<String>> {
    let mut tags: Vec<String> = extra.to_vec();
    if let Some(flow_id) = flow_id {
        tags.push(flow_tag(flow_id));
        if let Some(name) = name {
            tags.push(format!("{PARENT_NAME_TAG}={name}"));
        }
    }
    tags.sort();
    tags.dedup();
    if tags.is_empty() {
        None
    } else {
        Some(tags)
    }
}

/// Copy `base` and apply `overrides` on top of it.
pub fn merge_params(base: &ParamMap, overrides: Option<&ParamMap>) -> ParamMap {
    let mut merged = base.clone();
    if let Some(overrides) = overrides {
        for (key, value) in overrides {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Remove the job-type override from a parameter item.
///
/// Fails if the override is present but not a string.
pub fn take_job_type_override(params: &mut ParamMap) -> Result<Option<String>, CoreError> {
    match params.remove(JOB_TYPE_OVERRIDE_KEY) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(job_type)) => Ok(Some(job_type)),
        Some(other) => Err(CoreError::MalformedParameters(format!(
            "\"{JOB_TYPE_OVERRIDE_KEY}\" must be a string, got {other}"
        ))),
    }
}

/// Interpret a JSON value as a parameter map.
pub fn params_from_value(value: Value) -> Result<ParamMap, CoreError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(CoreError::MalformedParameters(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

/// Parse a JSON object given as text, e.g. a configuration value.
pub fn parse_param_map(raw: &str, field: &str) -> Result<ParamMap, CoreError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| CoreError::Validation(format!("{field} is not valid JSON: {e}")))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(CoreError::Validation(format!(
            "{field} must be a JSON object"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn map(value: Value) -> ParamMap {
        params_from_value(value).unwrap()
    }

    // -- children_tags --

    #[test]
    fn children_tags_empty_is_none() {
        assert_eq!(children_tags(&[], None, None), None);
    }

    #[test]
    fn children_tags_include_flow_and_parent() {
        let tags = children_tags(&["zeta".to_string()], Some("abc"), Some("daily"));
        assert_eq!(
            tags,
            Some(vec![
                "FLOW_ID=abc".to_string(),
                "PARENT_NAME=daily".to_string(),
                "zeta".to_string(),
            ])
        );
    }

    #[test]
    fn parent_name_requires_flow_id() {
        let tags = children_tags(&[], None, Some("daily"));
        assert_eq!(tags, None);
    }

    #[test]
    fn children_tags_are_deduplicated() {
        let extra = vec!["a".to_string(), "a".to_string(), "FLOW_ID=x".to_string()];
        let tags = children_tags(&extra, Some("x"), None);
        assert_eq!(tags, Some(vec!["FLOW_ID=x".to_string(), "a".to_string()]));
    }

    // -- JobTemplate::build --

    #[test]
    fn build_merges_overrides_and_embeds_settings() {
        let template = JobTemplate::new("products")
            .with_args(map(json!({"region": "us", "pages": 10})))
            .with_settings(map(json!({"CONCURRENT_REQUESTS": 4})))
            .with_flow_id("f1");

        let request = template.build(None, Some(&map(json!({"region": "de"}))));

        assert_eq!(request.job_type, "products");
        assert_eq!(request.params["region"], "de");
        assert_eq!(request.params["pages"], 10);
        assert_eq!(request.params[JOB_SETTINGS_KEY]["CONCURRENT_REQUESTS"], 4);
        assert_eq!(request.tags, Some(vec!["FLOW_ID=f1".to_string()]));
    }

    #[test]
    fn build_applies_job_type_override() {
        let template = JobTemplate::new("products");
        let request = template.build(Some("reviews".to_string()), None);
        assert_eq!(request.job_type, "reviews");
    }

    // -- take_job_type_override --

    #[test]
    fn override_is_removed_from_params() {
        let mut params = map(json!({"spider": "reviews", "page": 2}));
        let job_type = take_job_type_override(&mut params).unwrap();
        assert_eq!(job_type.as_deref(), Some("reviews"));
        assert!(!params.contains_key(JOB_TYPE_OVERRIDE_KEY));
        assert_eq!(params["page"], 2);
    }

    #[test]
    fn missing_override_is_none() {
        let mut params = map(json!({"page": 2}));
        assert_eq!(take_job_type_override(&mut params).unwrap(), None);
    }

    #[test]
    fn non_string_override_is_malformed() {
        let mut params = map(json!({"spider": 7}));
        assert_matches!(
            take_job_type_override(&mut params),
            Err(CoreError::MalformedParameters(_))
        );
    }

    // -- parsing --

    #[test]
    fn params_from_non_object_is_malformed() {
        assert_matches!(
            params_from_value(json!([1, 2])),
            Err(CoreError::MalformedParameters(_))
        );
    }

    #[test]
    fn parse_param_map_rejects_invalid_json() {
        assert_matches!(
            parse_param_map("{not json", "SPIDER_ARGS"),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            parse_param_map("[]", "SPIDER_ARGS"),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn parse_param_map_accepts_object() {
        let parsed = parse_param_map(r#"{"a": 1}"#, "SPIDER_ARGS").unwrap();
        assert_eq!(parsed["a"], 1);
    }
}
