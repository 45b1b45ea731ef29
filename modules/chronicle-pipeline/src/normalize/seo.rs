use std::collections::HashSet;

use chronicle_common::{FaqItem, SeoMetadata, Stage};
use serde_json::Value;

use super::fields::{array, field, text};
use super::{clip_chars, Normalizer};

const STAGE: Stage = Stage::Seo;
pub(crate) const MAX_TITLE_CHARS: usize = 60;
pub(crate) const MAX_DESCRIPTION_CHARS: usize = 160;
pub(crate) const MAX_KEYWORDS: usize = 12;

impl Normalizer<'_> {
    /// `fallback_title` is used when the model gives no title; usually the
    /// narrative page title.
    pub fn seo(&mut self, value: &Value, fallback_title: &str) -> SeoMetadata {
        let title = match text(value, &["metaTitle", "meta_title", "seoTitle", "title"]) {
            t if t.is_empty() => fallback_title.trim().to_string(),
            t => t,
        };
        let description = text(value, &["metaDescription", "meta_description", "description"]);

        SeoMetadata {
            meta_title: clip_chars(&title, MAX_TITLE_CHARS),
            meta_description: clip_chars(&description, MAX_DESCRIPTION_CHARS),
            keywords: self.keywords(value),
            faq: self.faq(value),
        }
    }

    /// Lowercased, deduplicated and capped. A comma-separated string is
    /// accepted in place of an array.
    fn keywords(&mut self, value: &Value) -> Vec<String> {
        let raw: Vec<String> = match field(value, &["keywords", "tags"]) {
            Some(Value::String(joined)) => joined.split(',').map(str::to_string).collect(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };

        let mut seen = HashSet::new();
        let mut keywords = Vec::new();
        for keyword in raw {
            let keyword = keyword.trim().to_lowercase();
            if keyword.is_empty() || !seen.insert(keyword.clone()) {
                continue;
            }
            if keywords.len() == MAX_KEYWORDS {
                self.drop_element(STAGE, "keywords", "keyword beyond limit");
                continue;
            }
            keywords.push(keyword);
        }
        keywords
    }

    fn faq(&mut self, value: &Value) -> Vec<FaqItem> {
        let mut faq = Vec::new();
        for (i, raw) in array(value, &["faq", "faqs", "questions"]).iter().enumerate() {
            let question = text(raw, &["question", "q"]);
            let answer = text(raw, &["answer", "a"]);
            if question.is_empty() || answer.is_empty() {
                self.drop_element(STAGE, format!("faq[{i}]"), "faq entry needs question and answer");
                continue;
            }
            faq.push(FaqItem { question, answer });
        }
        faq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_common::Seed;
    use serde_json::json;

    #[test]
    fn empty_input_falls_back_to_page_title() {
        let seed = Seed::new("Second Punic War", -218, -201);
        let mut n = Normalizer::new(&seed);
        let seo = n.seo(&json!(null), "Hannibal's War");
        assert_eq!(seo.meta_title, "Hannibal's War");
        assert_eq!(seo.meta_description, "");
        assert!(seo.keywords.is_empty());
        assert!(seo.faq.is_empty());
    }

    #[test]
    fn lengths_and_counts_are_capped() {
        let seed = Seed::new("Second Punic War", -218, -201);
        let mut n = Normalizer::new(&seed);
        let keywords: Vec<String> = (0..15).map(|i| format!("Keyword {i}")).collect();
        let seo = n.seo(
            &json!({
                "metaTitle": "x".repeat(80),
                "metaDescription": "y".repeat(200),
                "keywords": keywords,
                "faq": [{"question": "Who won?", "answer": "Rome."}, {"question": "Why?"}]
            }),
            "unused",
        );

        assert_eq!(seo.meta_title.chars().count(), MAX_TITLE_CHARS);
        assert_eq!(seo.meta_description.chars().count(), MAX_DESCRIPTION_CHARS);
        assert_eq!(seo.keywords.len(), MAX_KEYWORDS);
        assert_eq!(seo.keywords[0], "keyword 0");
        assert_eq!(seo.faq.len(), 1);
    }

    #[test]
    fn keyword_string_is_split_and_deduplicated() {
        let seed = Seed::new("Second Punic War", -218, -201);
        let mut n = Normalizer::new(&seed);
        let seo = n.seo(&json!({"keywords": "Hannibal, Rome, hannibal, , Carthage"}), "t");
        assert_eq!(seo.keywords, vec!["hannibal", "rome", "carthage"]);
    }
}
