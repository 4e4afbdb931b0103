//! Target list construction.

use tracing::debug;

use super::types::OrganizationTarget;

/// Where the batch gets its organization targets from.
///
/// Precedence: explicit single organization, then a supplied list, then
/// the numeric index range.
#[derive(Debug, Clone, Default)]
pub struct TargetSpec {
    /// One explicit organization name.
    pub organization: Option<String>,
    /// Raw contents of an organization list: a JSON array of names, or
    /// line-delimited names as fallback.
    pub list_content: Option<String>,
    /// First dropdown index of the range (inclusive).
    pub from: usize,
    /// Last dropdown index of the range (inclusive).
    pub to: usize,
}

/// Parse an organization list: JSON array first, one-name-per-line as
/// fallback when the content is not valid JSON.
pub fn parse_organization_list(content: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(content) {
        Ok(names) => names,
        Err(_) => {
            debug!("Organization list is not JSON, falling back to line-delimited parsing");
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect()
        }
    }
}

/// Build the ordered target list for a batch.
pub fn build_targets(spec: &TargetSpec, year: u16, state_code: u32) -> Vec<OrganizationTarget> {
    if let Some(name) = &spec.organization {
        return vec![OrganizationTarget::by_name(name.clone(), year, state_code)];
    }

    if let Some(content) = &spec.list_content {
        return parse_organization_list(content)
            .into_iter()
            .map(|name| OrganizationTarget::by_name(name, year, state_code))
            .collect();
    }

    (spec.from..=spec.to)
        .map(|index| OrganizationTarget::by_index(index, year, state_code))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::TargetId;

    #[test]
    fn test_range_builds_indices_in_order() {
        let spec = TargetSpec {
            from: 0,
            to: 2,
            ..TargetSpec::default()
        };
        let targets = build_targets(&spec, 2021, 1);
        let indices: Vec<_> = targets.iter().map(|t| t.id.clone()).collect();
        assert_eq!(
            indices,
            vec![TargetId::Index(0), TargetId::Index(1), TargetId::Index(2)]
        );
    }

    #[test]
    fn test_json_list_wins_over_range() {
        let spec = TargetSpec {
            list_content: Some(r#"["OrgX","OrgY"]"#.to_string()),
            from: 0,
            to: 100,
            ..TargetSpec::default()
        };
        let targets = build_targets(&spec, 2021, 1);
        let ids: Vec<_> = targets.iter().map(|t| t.id.clone()).collect();
        assert_eq!(
            ids,
            vec![
                TargetId::Name("OrgX".to_string()),
                TargetId::Name("OrgY".to_string())
            ]
        );
    }

    #[test]
    fn test_line_delimited_fallback() {
        let names = parse_organization_list("OrgA\nOrgB\n\n  OrgC  \n");
        assert_eq!(names, vec!["OrgA", "OrgB", "OrgC"]);
    }

    #[test]
    fn test_single_organization_wins_over_everything() {
        let spec = TargetSpec {
            organization: Some("Solo".to_string()),
            list_content: Some(r#"["OrgX"]"#.to_string()),
            from: 0,
            to: 5,
        };
        let targets = build_targets(&spec, 2024, 9);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].id, TargetId::Name("Solo".to_string()));
        assert_eq!(targets[0].year, 2024);
        assert_eq!(targets[0].state_code, 9);
    }

    #[test]
    fn test_degenerate_range_yields_one_target() {
        let spec = TargetSpec {
            from: 7,
            to: 7,
            ..TargetSpec::default()
        };
        let targets = build_targets(&spec, 2021, 1);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].id, TargetId::Index(7));
    }
}
