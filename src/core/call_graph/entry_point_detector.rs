// src/core/call_graph/entry_point_detector.rs
use std::collections::BTreeMap;
use std::fmt;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Deserialize};
use tracing::debug;

use super::super::markers::{clean_attribute_value, MarkerRole, MarkerTable, ROUTE_MAPPINGS};
use super::super::parser::{Annotated, AnnotationRecord, ClassRecord, MethodRecord};

static DUPLICATE_SLASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"/+").expect("valid regex"));

/// Classifies methods of a parsed class as service entry points
pub struct EntryPointDetector {
    markers: MarkerTable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    pub entry_type: EntryType,
    /// Route, interface name, cron expression or queue tag
    pub path: Option<String>,
    pub http_method: Option<String>,
    /// Fully-qualified owning class
    pub class_name: String,
    pub method_name: String,
    pub method_signature: String,
    /// Call expressions of the method, copied for convenience
    pub direct_calls: Vec<String>,
    /// Free-form metadata (`module` is set by the project scanner)
    pub annotations: BTreeMap<String, String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    /// HTTP route on a controller
    Http,
    /// Remotely exposed service method
    Rpc,
    /// Scheduled job
    Scheduled,
    /// Message queue consumer
    Mq,
    Other,
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntryType::Http => "HTTP",
            EntryType::Rpc => "RPC",
            EntryType::Scheduled => "SCHEDULED",
            EntryType::Mq => "MQ",
            EntryType::Other => "OTHER",
        };
        f.write_str(label)
    }
}

impl EntryPoint {
    fn for_method(entry_type: EntryType, class: &ClassRecord, method: &MethodRecord) -> Self {
        Self {
            entry_type,
            path: None,
            http_method: None,
            class_name: class.full_class_name.clone(),
            method_name: method.name.clone(),
            method_signature: method.signature.clone(),
            direct_calls: method.called_methods.clone(),
            annotations: BTreeMap::new(),
            description: None,
        }
    }

    /// Short label used in logs and documents, e.g. `GET /orders/{id}`
    pub fn display_name(&self) -> String {
        match (&self.http_method, &self.path) {
            (Some(verb), Some(path)) => format!("{} {}", verb, path),
            (None, Some(path)) => format!("{} {}", self.entry_type, path),
            _ => format!("{} {}.{}", self.entry_type, self.class_name, self.method_name),
        }
    }
}

impl EntryPointDetector {
    pub fn new(markers: MarkerTable) -> Self {
        Self { markers }
    }

    /// Detect all entry points declared by a class.
    ///
    /// The four rules are independent, so one class may yield entry points of
    /// several types. Only public methods are considered.
    pub fn detect_entry_points(&self, class: &ClassRecord) -> Vec<EntryPoint> {
        let mut entry_points = Vec::new();

        if self.markers.carries(class, MarkerRole::Controller) {
            entry_points.extend(self.detect_http_endpoints(class));
        }

        if self.markers.carries(class, MarkerRole::Provider) {
            entry_points.extend(self.detect_rpc_methods(class));
        }

        entry_points.extend(self.detect_scheduled_tasks(class));
        entry_points.extend(self.detect_mq_consumers(class));

        entry_points
    }

    fn detect_http_endpoints(&self, class: &ClassRecord) -> Vec<EntryPoint> {
        let class_path = class.find_annotation(&["RequestMapping"])
            .map(extract_route)
            .unwrap_or_default();

        let mut endpoints = Vec::new();

        for method in class.methods.iter().filter(|m| m.is_public) {
            let mut route: Option<(String, String)> = None;

            // A later mapping annotation overrides an earlier one
            for annotation in &method.annotations {
                for (name, verb) in ROUTE_MAPPINGS {
                    if !annotation.matches(name) {
                        continue;
                    }
                    let verb = match verb {
                        Some(v) => v.to_string(),
                        None => annotation.attribute("method")
                            .map(request_method_verb)
                            .unwrap_or_else(|| "GET".to_string()),
                    };
                    route = Some((extract_route(annotation), verb));
                }
            }

            if let Some((method_path, verb)) = route {
                let mut ep = EntryPoint::for_method(EntryType::Http, class, method);
                ep.path = Some(combine_path(&class_path, &method_path));
                ep.http_method = Some(verb);
                debug!("Detected HTTP entry point: {}", ep.display_name());
                endpoints.push(ep);
            }
        }

        endpoints
    }

    fn detect_rpc_methods(&self, class: &ClassRecord) -> Vec<EntryPoint> {
        class.methods.iter()
            .filter(|m| m.is_public)
            .map(|method| {
                let mut ep = EntryPoint::for_method(EntryType::Rpc, class, method);
                ep.path = Some(class.full_class_name.clone());
                debug!("Detected RPC entry point: {}.{}", class.class_name, method.name);
                ep
            })
            .collect()
    }

    fn detect_scheduled_tasks(&self, class: &ClassRecord) -> Vec<EntryPoint> {
        let mut endpoints = Vec::new();

        for method in class.methods.iter().filter(|m| m.is_public) {
            for annotation in method.annotations.iter().filter(|a| self.markers.is(a, MarkerRole::Scheduled)) {
                let mut ep = EntryPoint::for_method(EntryType::Scheduled, class, method);

                if let Some(cron) = annotation.attribute("cron") {
                    let cron = clean_attribute_value(cron);
                    ep.description = Some(format!("Cron: {}", cron));
                    ep.path = Some(cron);
                } else if let Some(rate) = annotation.attribute("fixedRate") {
                    ep.description = Some(format!("Fixed rate: {}", rate.trim()));
                } else if let Some(delay) = annotation.attribute("fixedDelay") {
                    ep.description = Some(format!("Fixed delay: {}", delay.trim()));
                }

                debug!("Detected scheduled task: {}.{}", class.class_name, method.name);
                endpoints.push(ep);
            }
        }

        endpoints
    }

    fn detect_mq_consumers(&self, class: &ClassRecord) -> Vec<EntryPoint> {
        let mut endpoints = Vec::new();

        for method in class.methods.iter().filter(|m| m.is_public) {
            for annotation in method.annotations.iter().filter(|a| self.markers.is(a, MarkerRole::MqListener)) {
                let mut ep = EntryPoint::for_method(EntryType::Mq, class, method);
                ep.path = mq_destination(annotation);
                ep.description = Some(annotation.simple_name().to_string());

                debug!("Detected MQ consumer: {}.{}", class.class_name, method.name);
                endpoints.push(ep);
            }
        }

        endpoints
    }
}

impl Default for EntryPointDetector {
    fn default() -> Self {
        Self::new(MarkerTable::default())
    }
}

/// Route from `value`, falling back to `path`
fn extract_route(annotation: &AnnotationRecord) -> String {
    annotation.attribute("value")
        .or_else(|| annotation.attribute("path"))
        .map(clean_attribute_value)
        .unwrap_or_default()
}

/// `RequestMethod.POST` -> `POST`
fn request_method_verb(raw: &str) -> String {
    clean_attribute_value(raw).replace("RequestMethod.", "")
}

/// Queue, topic or destination, tagged with which one was found
fn mq_destination(annotation: &AnnotationRecord) -> Option<String> {
    if let Some(queues) = annotation.attribute("queues") {
        Some(format!("Queue: {}", clean_attribute_value(queues)))
    } else if let Some(topics) = annotation.attribute("topics").or_else(|| annotation.attribute("topic")) {
        Some(format!("Topic: {}", clean_attribute_value(topics)))
    } else {
        annotation.attribute("destination")
            .map(|d| format!("Destination: {}", clean_attribute_value(d)))
    }
}

/// Join class and method routes into one normalized path
fn combine_path(class_path: &str, method_path: &str) -> String {
    let mut combined = String::new();
    for part in [class_path, method_path] {
        if part.is_empty() {
            continue;
        }
        if !part.starts_with('/') {
            combined.push('/');
        }
        combined.push_str(part);
    }

    let combined = DUPLICATE_SLASHES.replace_all(&combined, "/").into_owned();
    if combined.is_empty() {
        "/".to_string()
    } else {
        combined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn method(name: &str, is_public: bool, annotations: Vec<AnnotationRecord>) -> MethodRecord {
        MethodRecord {
            name: name.to_string(),
            parameters: vec![],
            return_type: "void".to_string(),
            annotations,
            called_methods: vec![format!("{}Helper", name)],
            is_public,
            is_static: false,
            signature: format!("{}()", name),
        }
    }

    fn class(annotations: Vec<AnnotationRecord>, methods: Vec<MethodRecord>) -> ClassRecord {
        ClassRecord {
            class_name: "FooController".to_string(),
            package_name: Some("com.acme".to_string()),
            full_class_name: "com.acme.FooController".to_string(),
            annotations,
            fields: vec![],
            methods,
            super_class: None,
            interfaces: vec![],
            is_interface: false,
            is_abstract: false,
            file_path: PathBuf::from("FooController.java"),
            content_hash: String::new(),
        }
    }

    #[test]
    fn test_http_class_prefix_and_get_mapping() {
        let class = class(
            vec![
                AnnotationRecord::new("RestController"),
                AnnotationRecord::new("RequestMapping").with_attribute("value", "\"/foo\""),
            ],
            vec![method("bar", true, vec![AnnotationRecord::new("GetMapping").with_attribute("value", "\"/bar\"")])],
        );

        let eps = EntryPointDetector::default().detect_entry_points(&class);
        assert_eq!(eps.len(), 1);
        assert_eq!(eps[0].entry_type, EntryType::Http);
        assert_eq!(eps[0].path.as_deref(), Some("/foo/bar"));
        assert_eq!(eps[0].http_method.as_deref(), Some("GET"));
        assert_eq!(eps[0].class_name, "com.acme.FooController");
        assert_eq!(eps[0].method_signature, "bar()");
        assert_eq!(eps[0].direct_calls, vec!["barHelper".to_string()]);
    }

    #[test]
    fn test_http_request_mapping_verbs_and_paths() {
        let class = class(
            vec![
                AnnotationRecord::new("Controller"),
                AnnotationRecord::new("RequestMapping").with_attribute("path", "\"api//\""),
            ],
            vec![
                method("create", true, vec![
                    AnnotationRecord::new("RequestMapping")
                        .with_attribute("value", "\"items\"")
                        .with_attribute("method", "RequestMethod.POST"),
                ]),
                method("list", true, vec![AnnotationRecord::new("RequestMapping").with_attribute("value", "{\"/all\"}")]),
                method("root", true, vec![AnnotationRecord::new("org.springframework.web.bind.annotation.PatchMapping")]),
                method("hidden", false, vec![AnnotationRecord::new("GetMapping")]),
                method("plain", true, vec![]),
            ],
        );

        let eps = EntryPointDetector::default().detect_entry_points(&class);
        let summary: Vec<_> = eps.iter().map(|e| e.display_name()).collect();
        assert_eq!(summary, vec!["POST /api/items", "GET /api/all", "PATCH /api/"]);
    }

    #[test]
    fn test_http_without_any_prefix_is_root() {
        let class = class(
            vec![AnnotationRecord::new("RestController")],
            vec![method("ping", true, vec![AnnotationRecord::new("GetMapping")])],
        );
        let eps = EntryPointDetector::default().detect_entry_points(&class);
        assert_eq!(eps[0].path.as_deref(), Some("/"));
    }

    #[test]
    fn test_mappings_ignored_without_controller_marker() {
        let class = class(
            vec![],
            vec![method("bar", true, vec![AnnotationRecord::new("GetMapping").with_attribute("value", "\"/bar\"")])],
        );
        assert!(EntryPointDetector::default().detect_entry_points(&class).is_empty());
    }

    #[test]
    fn test_rpc_provider_public_methods() {
        let class = class(
            vec![AnnotationRecord::new("DubboService")],
            vec![method("reserve", true, vec![]), method("internal", false, vec![])],
        );
        let eps = EntryPointDetector::default().detect_entry_points(&class);
        assert_eq!(eps.len(), 1);
        assert_eq!(eps[0].entry_type, EntryType::Rpc);
        assert_eq!(eps[0].path.as_deref(), Some("com.acme.FooController"));
        assert_eq!(eps[0].http_method, None);
    }

    #[test]
    fn test_scheduled_cron() {
        let class = class(
            vec![],
            vec![
                method("nightly", true, vec![AnnotationRecord::new("Scheduled").with_attribute("cron", "\"0 0 2 * * ?\"")]),
                method("poll", true, vec![AnnotationRecord::new("Scheduled").with_attribute("fixedRate", "5000")]),
                method("secret", false, vec![AnnotationRecord::new("Scheduled").with_attribute("cron", "\"* * * * * ?\"")]),
            ],
        );

        let eps = EntryPointDetector::default().detect_entry_points(&class);
        assert_eq!(eps.len(), 2);
        assert_eq!(eps[0].entry_type, EntryType::Scheduled);
        assert_eq!(eps[0].path.as_deref(), Some("0 0 2 * * ?"));
        assert_eq!(eps[0].description.as_deref(), Some("Cron: 0 0 2 * * ?"));
        assert_eq!(eps[1].path, None);
        assert_eq!(eps[1].description.as_deref(), Some("Fixed rate: 5000"));
    }

    #[test]
    fn test_mq_destination_priority() {
        let class = class(
            vec![],
            vec![
                method("onOrder", true, vec![
                    AnnotationRecord::new("RabbitListener")
                        .with_attribute("queues", "\"order.created\"")
                        .with_attribute("destination", "\"ignored\""),
                ]),
                method("onStock", true, vec![AnnotationRecord::new("KafkaListener").with_attribute("topics", "{\"stock\"}")]),
                method("onJms", true, vec![AnnotationRecord::new("JmsListener").with_attribute("destination", "\"mail\"")]),
                method("onNothing", true, vec![AnnotationRecord::new("RocketMQMessageListener")]),
            ],
        );

        let eps = EntryPointDetector::default().detect_entry_points(&class);
        let paths: Vec<_> = eps.iter().map(|e| e.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                Some("Queue: order.created".to_string()),
                Some("Topic: stock".to_string()),
                Some("Destination: mail".to_string()),
                None,
            ]
        );
        assert_eq!(eps[1].description.as_deref(), Some("KafkaListener"));
        assert!(eps.iter().all(|e| e.entry_type == EntryType::Mq));
    }

    #[test]
    fn test_one_class_multiple_types() {
        let class = class(
            vec![AnnotationRecord::new("RestController"), AnnotationRecord::new("Service")],
            vec![method("sync", true, vec![
                AnnotationRecord::new("PostMapping").with_attribute("value", "\"/sync\""),
                AnnotationRecord::new("Scheduled").with_attribute("cron", "\"0 * * * * ?\""),
            ])],
        );

        let types: Vec<_> = EntryPointDetector::default()
            .detect_entry_points(&class)
            .into_iter()
            .map(|e| e.entry_type)
            .collect();
        assert_eq!(types, vec![EntryType::Http, EntryType::Rpc, EntryType::Scheduled]);
    }

    #[test]
    fn test_combine_path() {
        assert_eq!(combine_path("", ""), "/");
        assert_eq!(combine_path("foo", "bar"), "/foo/bar");
        assert_eq!(combine_path("/foo/", "/bar"), "/foo/bar");
        assert_eq!(combine_path("", "bar"), "/bar");
    }
}
