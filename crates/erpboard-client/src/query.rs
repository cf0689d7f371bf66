//! Query string construction for ERP list endpoints

use std::collections::BTreeMap;

/// Filters for a list request. Pagination parameters are added per page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Query {
    filters: BTreeMap<String, String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `filter[field]=value` parameter
    pub fn filter(mut self, field: &str, value: impl ToString) -> Self {
        self.filters.insert(field.to_string(), value.to_string());
        self
    }

    pub fn filters(&self) -> &BTreeMap<String, String> {
        &self.filters
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Query parameters for one page
    pub fn to_params(&self, page_size: usize, page_number: usize) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .filters
            .iter()
            .map(|(field, value)| (format!("filter[{}]", field), value.clone()))
            .collect();
        params.push(("page[size]".to_string(), page_size.to_string()));
        params.push(("page[number]".to_string(), page_number.to_string()));
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_include_filters_and_paging() {
        let params = Query::new()
            .filter("eje", 2024)
            .filter("art", "A-10")
            .to_params(500, 3);

        assert_eq!(
            params,
            vec![
                ("filter[art]".to_string(), "A-10".to_string()),
                ("filter[eje]".to_string(), "2024".to_string()),
                ("page[size]".to_string(), "500".to_string()),
                ("page[number]".to_string(), "3".to_string()),
            ]
        );
    }
}
