use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One magazine issue as produced by a site scraper.
///
/// Fields the engine does not know about are kept in `extra` and handed to
/// the renderer untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueContext {
    pub date: String,
    pub cover: String,
    pub articles: Vec<Article>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IssueContext {
    /// Display title: the site's `title` field when present, the date otherwise.
    pub fn title(&self) -> &str {
        self.extra
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or(self.date.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Unique within the issue; doubles as the image filename stem.
    pub idx: u32,
    pub subsection: String,
    #[serde(default)]
    pub image: Option<String>,
    pub title: String,
    #[serde(default)]
    pub byline: Option<String>,
    /// HTML fragment.
    #[serde(default)]
    pub body: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedSection<'a> {
    pub label: &'a str,
    pub articles: Vec<&'a Article>,
}

/// Splits `items` into maximal runs of consecutive elements sharing a key.
///
/// This is not a group-by: a key that reappears after a different one starts
/// a new run.
pub fn group_runs<'a, T, K, F>(items: &'a [T], key: F) -> Vec<(K, Vec<&'a T>)>
where
    K: PartialEq,
    F: Fn(&'a T) -> K,
{
    let mut runs: Vec<(K, Vec<&'a T>)> = Vec::new();
    for item in items {
        let item_key = key(item);
        if let Some((current, members)) = runs.last_mut() {
            if *current == item_key {
                members.push(item);
                continue;
            }
        }
        runs.push((item_key, vec![item]));
    }
    runs
}

pub fn group_by_subsection(articles: &[Article]) -> Vec<GroupedSection<'_>> {
    group_runs(articles, |article| article.subsection.as_str())
        .into_iter()
        .map(|(label, articles)| GroupedSection { label, articles })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(idx: u32, subsection: &str) -> Article {
        Article {
            idx,
            subsection: subsection.to_string(),
            image: None,
            title: format!("Article {idx}"),
            byline: None,
            body: String::new(),
            extra: Map::new(),
        }
    }

    #[test]
    fn runs_are_not_merged_across_gaps() {
        let input = [('A', 1), ('A', 2), ('B', 3), ('A', 4)];
        let runs: Vec<(char, Vec<i32>)> = group_runs(&input, |pair| pair.0)
            .into_iter()
            .map(|(key, members)| (key, members.into_iter().map(|pair| pair.1).collect()))
            .collect();

        assert_eq!(runs, vec![('A', vec![1, 2]), ('B', vec![3]), ('A', vec![4])]);
    }

    #[test]
    fn empty_input_has_no_runs() {
        let input: [(char, i32); 0] = [];
        assert!(group_runs(&input, |pair| pair.0).is_empty());
    }

    #[test]
    fn subsections_keep_article_order() {
        let articles = vec![
            article(1, "Leaders"),
            article(2, "Leaders"),
            article(3, "Science"),
            article(4, "Leaders"),
        ];
        let grouped = group_by_subsection(&articles);

        let labels: Vec<&str> = grouped.iter().map(|g| g.label).collect();
        assert_eq!(labels, vec!["Leaders", "Science", "Leaders"]);
        let ids: Vec<u32> = grouped[0].articles.iter().map(|a| a.idx).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(grouped[2].articles[0].idx, 4);
    }

    #[test]
    fn unknown_fields_survive_round_trip() {
        let json = r#"{
            "date": "March 2024",
            "cover": "https://example.com/cover.jpg",
            "title": "The Weekly",
            "articles": [
                {"idx": 1, "subsection": "News", "title": "T", "image": null, "kicker": "Breaking"}
            ]
        }"#;
        let issue: IssueContext = serde_json::from_str(json).unwrap();

        assert_eq!(issue.title(), "The Weekly");
        assert_eq!(issue.articles[0].extra["kicker"], "Breaking");
        assert_eq!(issue.articles[0].image, None);
        assert_eq!(issue.articles[0].body, "");
    }
}
