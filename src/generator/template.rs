//! `{key}` 形式的模板渲染，用于任务描述与智能体设定

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;

use crate::generator::types::Query;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex is valid")
});

#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error("template references unknown key `{0}`")]
    MissingKey(String),
}

/// 模板变量，目前为 topic 与 current_year
#[derive(Debug, Clone)]
pub struct TemplateInputs {
    values: BTreeMap<String, String>,
}

impl TemplateInputs {
    pub fn new(query: &Query, current_year: i32) -> Self {
        let values = BTreeMap::from([
            ("topic".to_string(), query.as_str().to_string()),
            ("current_year".to_string(), current_year.to_string()),
        ]);
        Self { values }
    }

    pub fn topic(&self) -> &str {
        self.values.get("topic").map(String::as_str).unwrap_or_default()
    }

    /// 渲染模板；任何未知的键都会导致整体失败，由调用方决定降级方式
    pub fn render(&self, template: &str) -> Result<String, TemplateError> {
        if let Some(missing) = PLACEHOLDER
            .captures_iter(template)
            .filter_map(|c| c.get(1))
            .find(|key| !self.values.contains_key(key.as_str()))
        {
            return Err(TemplateError::MissingKey(missing.as_str().to_string()));
        }

        Ok(PLACEHOLDER
            .replace_all(template, |caps: &regex::Captures| {
                self.values
                    .get(&caps[1])
                    .cloned()
                    .unwrap_or_default()
            })
            .trim()
            .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> TemplateInputs {
        TemplateInputs::new(&Query::new("Roman Empire").unwrap(), 2025)
    }

    #[test]
    fn test_render_known_keys() {
        let rendered = inputs()
            .render("Research {topic} up to {current_year}.")
            .unwrap();
        assert_eq!(rendered, "Research Roman Empire up to 2025.");
    }

    #[test]
    fn test_render_missing_key() {
        let err = inputs().render("Research {topic} in the {era}.").unwrap_err();
        assert_eq!(err, TemplateError::MissingKey("era".to_string()));
    }

    #[test]
    fn test_json_braces_are_not_placeholders() {
        let rendered = inputs()
            .render(r#"Return {"start_year": 1} for {topic}"#)
            .unwrap();
        assert_eq!(rendered, r#"Return {"start_year": 1} for Roman Empire"#);
    }

    #[test]
    fn test_topic_accessor() {
        assert_eq!(inputs().topic(), "Roman Empire");
    }
}
