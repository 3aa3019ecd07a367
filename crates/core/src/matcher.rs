use crate::catalog::{ServiceCatalog, ServiceDefinition};

/// Deterministic keyword pass over the catalog. Iterates services in
/// declaration order and includes each at most once, on the first keyword
/// found as a substring of the lower-cased input. Never fails; an empty
/// result means no service matched.
pub fn match_services(catalog: &ServiceCatalog, text: &str) -> Vec<ServiceDefinition> {
    let lower = text.to_lowercase();

    catalog
        .services()
        .iter()
        .filter(|service| {
            service
                .keywords
                .iter()
                .any(|keyword| lower.contains(&keyword.to_lowercase()))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_disability_keyword() {
        let catalog = ServiceCatalog::builtin().unwrap();
        let matched = match_services(&catalog, "I have a disability and need exam help");

        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].key, "disability_support");
    }

    #[test]
    fn preserves_catalog_declaration_order() {
        let catalog = ServiceCatalog::builtin().unwrap();
        let matched = match_services(
            &catalog,
            "I'm stressed about tuition and my disability paperwork",
        );

        let keys: Vec<_> = matched.iter().map(|service| service.key.as_str()).collect();
        assert_eq!(keys, vec!["disability_support", "financial_aid", "counselling"]);
    }

    #[test]
    fn counts_a_service_once_despite_multiple_keyword_hits() {
        let catalog = ServiceCatalog::builtin().unwrap();
        let matched = match_services(&catalog, "tuition fees and rent money troubles");

        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].key, "financial_aid");
    }

    #[test]
    fn unmatched_text_yields_empty_result() {
        let catalog = ServiceCatalog::builtin().unwrap();
        assert!(match_services(&catalog, "hello there").is_empty());
    }
}
