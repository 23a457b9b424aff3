use crate::models::Subscription;
use crate::services::{FilterSet, Pagination};
use serde::{Deserialize, Serialize};

/// Query string of `GET /subscriptions`.
///
/// Everything stays a string so that unparsable numbers fall back to
/// defaults instead of failing extraction.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub from: Option<String>,
    pub to: Option<String>,
    pub user_id: Option<String>,
    pub service_name: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl ListParams {
    pub fn filters(&self) -> FilterSet {
        filter_set(&self.from, &self.to, &self.user_id, &self.service_name)
    }

    pub fn pagination(&self) -> Pagination {
        Pagination::from_raw(self.limit.as_deref(), self.offset.as_deref())
    }
}

/// Query string of `GET /subscriptions/sum`.
#[derive(Debug, Default, Deserialize)]
pub struct SumParams {
    pub from: Option<String>,
    pub to: Option<String>,
    pub user_id: Option<String>,
    pub service_name: Option<String>,
}

impl SumParams {
    pub fn filters(&self) -> FilterSet {
        filter_set(&self.from, &self.to, &self.user_id, &self.service_name)
    }
}

fn filter_set(
    from: &Option<String>,
    to: &Option<String>,
    owner: &Option<String>,
    service_name: &Option<String>,
) -> FilterSet {
    FilterSet {
        from: from.clone().unwrap_or_default(),
        to: to.clone().unwrap_or_default(),
        owner: owner.clone().unwrap_or_default(),
        service_name: service_name.clone().unwrap_or_default(),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub list: Vec<Subscription>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SumResponse {
    pub sum: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_params_become_empty_filters() {
        let params = ListParams {
            from: Some("01-2024".to_string()),
            limit: Some("ten".to_string()),
            ..Default::default()
        };
        let filters = params.filters();
        assert_eq!(filters.from, "01-2024");
        assert!(filters.to.is_empty());
        assert!(filters.owner.is_empty());
        assert_eq!(params.pagination(), Pagination::default());
    }
}
