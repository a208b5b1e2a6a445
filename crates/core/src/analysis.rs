use std::collections::BTreeMap;

use serde::Serialize;

use crate::classify::ClassifiedSpan;
use crate::role::Role;

/// Samples kept per role.
pub const SAMPLES_PER_ROLE: usize = 3;

/// Role histogram plus representative text of a classified document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    /// Number of spans per role. Roles with no spans are omitted.
    pub counts: BTreeMap<Role, usize>,
    /// The first few span texts of each role, in document order.
    pub samples: BTreeMap<Role, Vec<String>>,
    pub total_spans: usize,
}

pub fn analyze(spans: &[ClassifiedSpan]) -> Analysis {
    let mut counts: BTreeMap<Role, usize> = BTreeMap::new();
    let mut samples: BTreeMap<Role, Vec<String>> = BTreeMap::new();

    for span in spans {
        *counts.entry(span.role).or_insert(0) += 1;
        let bucket = samples.entry(span.role).or_default();
        if bucket.len() < SAMPLES_PER_ROLE {
            bucket.push(span.text.clone());
        }
    }

    Analysis {
        counts,
        samples,
        total_spans: spans.len(),
    }
}

/// Build the prompt handed to an advisory collaborator asking how this
/// document's structure should drive search.
///
/// Nothing in indexing or querying depends on the answer.
pub fn advisory_prompt(analysis: &Analysis) -> String {
    let mut prompt =
        String::from("I have extracted text from a PDF document and categorized it as follows:\n\n");

    for (role, count) in &analysis.counts {
        prompt.push_str(&format!("- {role}: {count} instances\n"));
    }

    prompt.push_str("\nHere are some samples from each category:\n\n");

    for (role, texts) in &analysis.samples {
        prompt.push_str(&format!("{}:\n", role.as_str().to_uppercase()));
        for text in texts {
            prompt.push_str(&format!("- \"{text}\"\n"));
        }
        prompt.push('\n');
    }

    prompt.push_str(
        "Based on these text categories and samples, please recommend:\n\
         1. The optimal way to structure this text for search functionality\n\
         2. How different text types should be weighted in search results\n\
         3. Any preprocessing steps that would improve search accuracy\n\
         4. The best approach for handling user queries against this document structure",
    );

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, role: Role) -> ClassifiedSpan {
        ClassifiedSpan {
            text: text.to_string(),
            font_size: 10.0,
            is_bold: false,
            page: 1,
            role,
        }
    }

    #[test]
    fn test_analyze_counts_and_samples() {
        let spans = vec![
            span("Guide", Role::Title),
            span("one", Role::Body),
            span("two", Role::Body),
            span("three", Role::Body),
            span("four", Role::Body),
            span("\u{2022} item", Role::Bullet),
        ];
        let analysis = analyze(&spans);

        assert_eq!(analysis.total_spans, 6);
        assert_eq!(analysis.counts[&Role::Body], 4);
        assert_eq!(analysis.counts[&Role::Title], 1);
        assert!(!analysis.counts.contains_key(&Role::Footnote));
        assert_eq!(analysis.samples[&Role::Body], vec!["one", "two", "three"]);
    }

    #[test]
    fn test_analyze_empty() {
        let analysis = analyze(&[]);
        assert!(analysis.counts.is_empty());
        assert!(analysis.samples.is_empty());
        assert_eq!(analysis.total_spans, 0);
    }

    #[test]
    fn test_advisory_prompt_lists_categories_and_samples() {
        let analysis = analyze(&[span("Guide", Role::Title), span("text", Role::Body)]);
        let prompt = advisory_prompt(&analysis);

        assert!(prompt.starts_with("I have extracted text from a PDF document"));
        assert!(prompt.contains("- title: 1 instances\n- body: 1 instances\n"));
        assert!(prompt.contains("TITLE:\n- \"Guide\"\n"));
        assert!(prompt.contains("BODY:\n- \"text\"\n"));
        assert!(prompt.ends_with("against this document structure"));
    }
}
