//! Order attribution

/// Partner code an order is attributed to, if any
///
/// A campaign containing the marketing-engine `marker` (case-insensitive)
/// belongs to `default_code`. Anything else is unattributed.
pub fn resolve_partner_code(campaign: Option<&str>, marker: &str, default_code: &str) -> Option<String> {
    let campaign = campaign?.trim();
    let marker = marker.trim();
    if campaign.is_empty() || marker.is_empty() {
        return None;
    }
    campaign
        .to_lowercase()
        .contains(&marker.to_lowercase())
        .then(|| default_code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_anywhere_in_campaign_attributes() {
        assert_eq!(
            resolve_partner_code(Some("spring-MKT-ENGINE-42"), "mkt-engine", "HOUSE"),
            Some("HOUSE".to_string())
        );
        assert_eq!(
            resolve_partner_code(Some("mkt-engine"), "mkt-engine", "HOUSE"),
            Some("HOUSE".to_string())
        );
    }

    #[test]
    fn no_marker_no_attribution() {
        assert_eq!(resolve_partner_code(Some("newsletter"), "mkt-engine", "HOUSE"), None);
        assert_eq!(resolve_partner_code(None, "mkt-engine", "HOUSE"), None);
        assert_eq!(resolve_partner_code(Some("   "), "mkt-engine", "HOUSE"), None);
        assert_eq!(resolve_partner_code(Some("anything"), "", "HOUSE"), None);
    }
}
