// src/core/call_graph/entry_point_finder.rs
use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use super::entry_point_detector::EntryPoint;
use super::super::parser::{ClassRecord, MethodRecord};
use super::super::structure::ProjectStructure;

/// Matches scoring below this are dropped
pub const RELEVANCE_THRESHOLD: u32 = 15;

const CLASS_SCORE: u32 = 10;
const METHOD_SCORE: u32 = 20;
const PATH_SCORE: u32 = 15;
const DESCRIPTION_SCORE: u32 = 5;
const ANNOTATION_SCORE: u32 = 8;

/// An entry point that matched a keyword search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPointMatch {
    pub entry_point: EntryPoint,
    pub relevance_score: u32,
    /// One line per score contribution, e.g. `method name contains 'order' (+20)`
    pub match_reasons: Vec<String>,
    pub project_name: String,
}

/// Keyword search over detected entry points
pub struct EntryPointFinder {
    threshold: u32,
}

impl EntryPointFinder {
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    /// Score every entry point against `keywords`, keep those at or above the
    /// threshold, best first. Equal scores keep discovery order.
    pub fn find_by_keywords<S: AsRef<str>>(&self, keywords: &[S], structures: &[ProjectStructure]) -> Vec<EntryPointMatch> {
        info!("Searching entry points of {} projects for {} keywords", structures.len(), keywords.len());

        let mut matches = Vec::new();
        for structure in structures {
            for entry_point in structure.entry_points() {
                let Some(class) = structure.get_class(&entry_point.class_name) else {
                    continue;
                };
                let method = class.find_method(&entry_point.method_name);

                let (score, reasons) = score_entry_point(entry_point, class, method, keywords);
                if score < self.threshold {
                    continue;
                }

                debug!("{} scored {}", entry_point.display_name(), score);
                matches.push(EntryPointMatch {
                    entry_point: entry_point.clone(),
                    relevance_score: score,
                    match_reasons: reasons,
                    project_name: structure.project_name.clone(),
                });
            }
        }

        matches.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));

        info!("Found {} matching entry points", matches.len());
        matches
    }
}

impl Default for EntryPointFinder {
    fn default() -> Self {
        Self::new(RELEVANCE_THRESHOLD)
    }
}

fn score_entry_point<S: AsRef<str>>(
    entry_point: &EntryPoint,
    class: &ClassRecord,
    method: Option<&MethodRecord>,
    keywords: &[S],
) -> (u32, Vec<String>) {
    let mut score = 0;
    let mut reasons = Vec::new();
    let mut award = |points: u32, what: &str, keyword: &str| {
        score += points;
        reasons.push(format!("{} contains '{}' (+{})", what, keyword, points));
    };

    for keyword in keywords {
        let keyword = keyword.as_ref();
        let lower = keyword.to_lowercase();
        let contains = |text: &str| text.to_lowercase().contains(&lower);

        if contains(&class.class_name) || contains(&class.full_class_name) {
            award(CLASS_SCORE, "class name", keyword);
        }

        if contains(&entry_point.method_name) {
            award(METHOD_SCORE, "method name", keyword);
        }

        if entry_point.path.as_deref().map_or(false, contains) {
            award(PATH_SCORE, "path", keyword);
        }

        // case-sensitive on purpose; descriptions carry cron text and queue names
        if entry_point.description.as_deref().map_or(false, |d| d.contains(keyword)) {
            award(DESCRIPTION_SCORE, "description", keyword);
        }

        if entry_point.annotations.values().any(|v| contains(v)) {
            award(ANNOTATION_SCORE, "annotation value", keyword);
        }

        let method_annotation_hit = method.map_or(false, |m| {
            m.annotations.iter().any(|a| contains(&a.name) || a.attributes.values().any(|v| contains(v)))
        });
        if method_annotation_hit {
            award(ANNOTATION_SCORE, "method annotation", keyword);
        }
    }

    (score, reasons)
}

/// Keyword search with the default threshold
pub fn find_entry_points<S: AsRef<str>>(keywords: &[S], structures: &[ProjectStructure]) -> Vec<EntryPointMatch> {
    EntryPointFinder::default().find_by_keywords(keywords, structures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use proptest::prelude::*;
    use crate::core::call_graph::EntryType;
    use crate::core::parser::AnnotationRecord;

    fn method(name: &str, annotations: Vec<AnnotationRecord>) -> MethodRecord {
        MethodRecord {
            name: name.to_string(),
            parameters: vec![],
            return_type: "void".to_string(),
            annotations,
            called_methods: vec![],
            is_public: true,
            is_static: false,
            signature: format!("{}()", name),
        }
    }

    fn project(name: &str, entries: &[(&str, &str, Option<&str>, Option<&str>)]) -> ProjectStructure {
        let mut structure = ProjectStructure::new(name, format!("/work/{}", name));
        for (fqcn, method_name, _, _) in entries {
            let (package, class_name) = fqcn.rsplit_once('.').unwrap();
            let mut class = structure.get_class(fqcn).cloned().unwrap_or_else(|| ClassRecord {
                class_name: class_name.to_string(),
                package_name: Some(package.to_string()),
                full_class_name: fqcn.to_string(),
                annotations: vec![],
                fields: vec![],
                methods: vec![],
                super_class: None,
                interfaces: vec![],
                is_interface: false,
                is_abstract: false,
                file_path: PathBuf::from(format!("{}.java", class_name)),
                content_hash: String::new(),
            });
            class.methods.push(method(method_name, vec![AnnotationRecord::new("GetMapping").with_attribute("value", "\"/x\"")]));
            structure.add_class(class);
        }
        for (fqcn, method_name, path, description) in entries {
            structure.add_entry_point(EntryPoint {
                entry_type: EntryType::Http,
                path: path.map(str::to_string),
                http_method: Some("GET".to_string()),
                class_name: fqcn.to_string(),
                method_name: method_name.to_string(),
                method_signature: format!("{}()", method_name),
                direct_calls: vec![],
                annotations: BTreeMap::from([("module".to_string(), "core".to_string())]),
                description: description.map(str::to_string),
            });
        }
        structure
    }

    #[test]
    fn test_order_scores_at_least_35() {
        let structure = project("shop", &[
            ("com.shop.web.OrderController", "getOrder", Some("/orders"), None),
            ("com.shop.web.UserController", "login", Some("/login"), None),
        ]);

        let matches = find_entry_points(&["order"], &[structure]);
        assert_eq!(matches.len(), 1);

        let best = &matches[0];
        assert_eq!(best.entry_point.method_name, "getOrder");
        // class +10, method +20, path +15
        assert_eq!(best.relevance_score, 45);
        assert!(best.relevance_score >= 35);
        assert!(best.match_reasons.contains(&"method name contains 'order' (+20)".to_string()));
        assert_eq!(best.project_name, "shop");
    }

    #[test]
    fn test_description_is_case_sensitive() {
        let structure = project("jobs", &[
            ("com.shop.job.Nightly", "run", None, Some("Cron: Rebuild")),
        ]);
        let finder = EntryPointFinder::new(0);

        assert_eq!(finder.find_by_keywords(&["Rebuild"], std::slice::from_ref(&structure))[0].relevance_score, 5);
        assert_eq!(finder.find_by_keywords(&["rebuild"], std::slice::from_ref(&structure))[0].relevance_score, 0);
    }

    #[test]
    fn test_annotation_scores() {
        let structure = project("shop", &[("com.shop.web.Api", "x", None, None)]);
        let finder = EntryPointFinder::new(0);

        // module tag on the entry point
        let by_module = finder.find_by_keywords(&["core"], std::slice::from_ref(&structure));
        assert_eq!(by_module[0].relevance_score, 8);

        // method annotation name
        let by_name = finder.find_by_keywords(&["mapping"], std::slice::from_ref(&structure));
        assert_eq!(by_name[0].relevance_score, 8);
        assert_eq!(by_name[0].match_reasons, vec!["method annotation contains 'mapping' (+8)"]);
    }

    #[test]
    fn test_threshold_and_missing_class() {
        let mut structure = project("shop", &[("com.shop.web.Api", "ping", None, None)]);
        structure.add_entry_point(EntryPoint {
            entry_type: EntryType::Rpc,
            path: None,
            http_method: None,
            class_name: "com.shop.Ghost".to_string(),
            method_name: "ping".to_string(),
            method_signature: "ping()".to_string(),
            direct_calls: vec![],
            annotations: BTreeMap::new(),
            description: None,
        });

        let matches = find_entry_points(&["ping"], &[structure]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].entry_point.class_name, "com.shop.web.Api");

        let structure = project("shop", &[("com.shop.web.Api", "ping", None, None)]);
        assert!(find_entry_points(&["web"], &[structure]).is_empty());
    }

    #[test]
    fn test_stable_order_for_ties() {
        let structure = project("shop", &[
            ("com.shop.a.Alpha", "pay", None, None),
            ("com.shop.b.Beta", "pay", None, None),
        ]);
        let matches = find_entry_points(&["pay"], &[structure]);
        let classes: Vec<_> = matches.iter().map(|m| m.entry_point.class_name.as_str()).collect();
        assert_eq!(classes, vec!["com.shop.a.Alpha", "com.shop.b.Beta"]);
    }

    proptest! {
        #[test]
        fn prop_results_sorted_and_above_threshold(
            names in proptest::collection::vec("[a-z]{1,6}", 1..8),
            keyword in "[a-z]{1,3}",
            threshold in 0u32..40,
        ) {
            let entries: Vec<(String, String)> = names.iter().enumerate()
                .map(|(i, n)| (format!("com.p{}.C{}", i, n), n.clone()))
                .collect();
            let refs: Vec<(&str, &str, Option<&str>, Option<&str>)> = entries.iter()
                .map(|(c, m)| (c.as_str(), m.as_str(), Some(m.as_str()), None))
                .collect();
            let structure = project("p", &refs);

            let matches = EntryPointFinder::new(threshold).find_by_keywords(&[keyword], &[structure]);
            for m in &matches {
                prop_assert!(m.relevance_score >= threshold);
            }
            for pair in matches.windows(2) {
                prop_assert!(pair[0].relevance_score >= pair[1].relevance_score);
            }
        }
    }
}
