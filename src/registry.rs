//! Page registry: which pages are protected and which carry edits
//!
//! Protected entries are either full document keys or domains; a domain
//! entry also covers its subdomains. The edited list is what the backend
//! reports as pages with stored changes, so a page without edits can skip
//! the load entirely.

use crate::key::DocumentKey;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct PageRegistry {
    protected: Vec<String>,
    edited: BTreeSet<DocumentKey>,
}

impl PageRegistry {
    pub fn new(protected: Vec<String>) -> Self {
        Self {
            protected,
            edited: BTreeSet::new(),
        }
    }

    pub fn is_protected(&self, key: &DocumentKey) -> bool {
        self.protected.iter().any(|entry| entry == key.as_str())
            || key
                .domain()
                .is_some_and(|domain| self.is_protected_domain(&domain))
    }

    /// Whether `domain` or one of its parent domains is protected
    pub fn is_protected_domain(&self, domain: &str) -> bool {
        let domain = domain.to_ascii_lowercase();
        self.protected.iter().any(|entry| {
            let entry = entry.to_ascii_lowercase();
            domain == entry || domain.ends_with(&format!(".{}", entry))
        })
    }

    pub fn protect(&mut self, entry: impl Into<String>) {
        let entry = entry.into();
        if !self.protected.contains(&entry) {
            self.protected.push(entry);
        }
    }

    pub fn is_edited(&self, key: &DocumentKey) -> bool {
        self.edited.contains(key)
    }

    /// Returns whether the key was newly added
    pub fn mark_edited(&mut self, key: DocumentKey) -> bool {
        self.edited.insert(key)
    }

    pub fn unmark_edited(&mut self, key: &DocumentKey) -> bool {
        self.edited.remove(key)
    }

    /// Replace the edited list with a fresh one from the backend
    pub fn replace_edited<I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = DocumentKey>,
    {
        self.edited = keys.into_iter().collect();
    }

    pub fn edited(&self) -> impl Iterator<Item = &DocumentKey> {
        self.edited.iter()
    }

    pub fn edited_count(&self) -> usize {
        self.edited.len()
    }

    /// Pick an edited page from a roll in `[0, 1)`
    pub fn pick_edited(&self, roll: f64) -> Option<&DocumentKey> {
        if self.edited.is_empty() {
            return None;
        }
        let roll = if roll.is_finite() { roll.clamp(0.0, 1.0) } else { 0.0 };
        let index = ((roll * self.edited.len() as f64) as usize).min(self.edited.len() - 1);
        self.edited.iter().nth(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(url: &str) -> DocumentKey {
        DocumentKey::from_url(url).unwrap()
    }

    #[test]
    fn test_protected_domain_and_subdomain() {
        let registry = PageRegistry::new(vec!["bank.example".to_string()]);
        assert!(registry.is_protected(&key("https://bank.example/login")));
        assert!(registry.is_protected(&key("https://www.BANK.example/")));
        assert!(!registry.is_protected(&key("https://notbank.example/")));
        assert!(registry.is_protected_domain("mail.bank.example"));
        assert!(!registry.is_protected_domain("example"));
    }

    #[test]
    fn test_protected_exact_page() {
        let mut registry = PageRegistry::default();
        registry.protect("https://example.com/about");
        assert!(registry.is_protected(&key("https://example.com/about#team")));
        assert!(!registry.is_protected(&key("https://example.com/")));
    }

    #[test]
    fn test_edited_list() {
        let mut registry = PageRegistry::default();
        assert!(registry.mark_edited(key("https://a.example/")));
        assert!(!registry.mark_edited(key("https://a.example/#x")));
        assert!(registry.is_edited(&key("https://a.example/")));

        registry.replace_edited([key("https://b.example/"), key("https://c.example/")]);
        assert!(!registry.is_edited(&key("https://a.example/")));
        assert_eq!(registry.edited_count(), 2);
    }

    #[test]
    fn test_pick_edited() {
        let mut registry = PageRegistry::default();
        assert_eq!(registry.pick_edited(0.5), None);

        registry.replace_edited([key("https://b.example/"), key("https://c.example/")]);
        assert_eq!(registry.pick_edited(0.0).map(|k| k.as_str()), Some("https://b.example/"));
        assert_eq!(registry.pick_edited(0.99).map(|k| k.as_str()), Some("https://c.example/"));
        assert_eq!(registry.pick_edited(1.0).map(|k| k.as_str()), Some("https://c.example/"));
        assert!(registry.pick_edited(f64::NAN).is_some());
    }
}
