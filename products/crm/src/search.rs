//! Free-text deal filter used by the board's search box.

use crate::deal::Deal;

/// A non-blank search query, lower-cased but otherwise as typed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DealQuery {
    needle: String,
}

impl DealQuery {
    /// `None` for an empty or whitespace-only query, meaning "no filter".
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self {
                needle: raw.to_lowercase(),
            })
        }
    }

    /// Single-substring match against title, company name, or the contact's
    /// "first last" name.
    pub fn matches(&self, deal: &Deal) -> bool {
        let needle = self.needle.as_str();
        if deal.title.to_lowercase().contains(needle) {
            return true;
        }
        if deal
            .company
            .as_ref()
            .is_some_and(|company| company.name.to_lowercase().contains(needle))
        {
            return true;
        }
        deal.contact
            .as_ref()
            .is_some_and(|contact| contact.full_name().to_lowercase().contains(needle))
    }
}

/// Keep the deals matching `query`, in their original order.
pub fn filter_deals(query: &str, deals: &[Deal]) -> Vec<Deal> {
    match DealQuery::parse(query) {
        None => deals.to_vec(),
        Some(query) => deals
            .iter()
            .filter(|deal| query.matches(deal))
            .cloned()
            .collect(),
    }
}
