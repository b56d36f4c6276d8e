use std::collections::{HashMap, HashSet};

use crate::core::types::{SearchHit, UrlEntry};

/// Occurrence counts for URLs across search responses. Entries keep
/// insertion order so frequency ties resolve to the URL seen first.
#[derive(Debug, Default)]
pub struct UrlFrequencyRanker {
    entries: Vec<UrlEntry>,
    index: HashMap<String, usize>,
}

impl UrlFrequencyRanker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count each URL once per response, regardless of how many times the
    /// response repeats it.
    pub fn record_response(&mut self, hits: &[SearchHit]) {
        let mut seen_in_response: HashSet<&str> = HashSet::new();
        for hit in hits {
            if hit.url.is_empty() || !seen_in_response.insert(hit.url.as_str()) {
                continue;
            }
            match self.index.get(&hit.url) {
                Some(&i) => self.entries[i].frequency += 1,
                None => {
                    self.index.insert(hit.url.clone(), self.entries.len());
                    self.entries.push(UrlEntry {
                        url: hit.url.clone(),
                        frequency: 1,
                        title: (!hit.title.is_empty()).then(|| hit.title.clone()),
                    });
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn frequency_of(&self, url: &str) -> u32 {
        self.index
            .get(url)
            .map(|&i| self.entries[i].frequency)
            .unwrap_or(0)
    }

    /// Top `n` URLs by frequency (stable insertion-order tie-break),
    /// skipping anything already processed.
    pub fn select_top_unseen(&self, n: usize, processed: &HashSet<String>) -> Vec<String> {
        let mut ranked: Vec<&UrlEntry> = self.entries.iter().collect();
        ranked.sort_by(|a, b| b.frequency.cmp(&a.frequency));
        ranked
            .into_iter()
            .filter(|entry| !processed.contains(&entry.url))
            .take(n)
            .map(|entry| entry.url.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(url: &str) -> SearchHit {
        SearchHit {
            url: url.to_string(),
            title: format!("title of {}", url),
            description: String::new(),
        }
    }

    #[test]
    fn test_cross_query_frequency_ordering() {
        let mut ranker = UrlFrequencyRanker::new();
        ranker.record_response(&[hit("https://a.example"), hit("https://b.example"), hit("https://c.example")]);
        ranker.record_response(&[hit("https://b.example"), hit("https://c.example"), hit("https://d.example")]);

        assert_eq!(ranker.frequency_of("https://b.example"), 2);
        assert_eq!(ranker.frequency_of("https://a.example"), 1);

        let top = ranker.select_top_unseen(3, &HashSet::new());
        // b and c tie at 2 and keep insertion order; a precedes d at 1
        assert_eq!(top, vec!["https://b.example", "https://c.example", "https://a.example"]);
    }

    #[test]
    fn test_duplicate_urls_in_one_response_count_once() {
        let mut ranker = UrlFrequencyRanker::new();
        ranker.record_response(&[hit("https://a.example"), hit("https://a.example")]);
        assert_eq!(ranker.frequency_of("https://a.example"), 1);
    }

    #[test]
    fn test_processed_urls_never_reselected() {
        let mut ranker = UrlFrequencyRanker::new();
        ranker.record_response(&[hit("https://a.example"), hit("https://b.example")]);

        let mut processed = HashSet::new();
        for url in ranker.select_top_unseen(1, &processed) {
            processed.insert(url);
        }
        let next = ranker.select_top_unseen(2, &processed);
        assert_eq!(next, vec!["https://b.example"]);
        for url in next {
            processed.insert(url);
        }
        assert!(ranker.select_top_unseen(3, &processed).is_empty());
    }
}
