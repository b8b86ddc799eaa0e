//! Well-known resource groups that are never cleaned up

/// Groups created and owned by platform services or shared test infrastructure
pub const BUILTIN_RESERVED_NAMES: &[&str] = &[
    // well-known
    "NetworkWatcherRG",
    "AzSecPackAutoConfigRG",
    // public cloud
    "srprodcloudtestrg",
    // china cloud
    "SignalRServiceE2ETest",
    "srmccloudtestrg",
    "signalrdevmc",
    // us government cloud
    "srffcloudtestrg",
];

/// Prefixes of groups created on demand by platform features (Cloud Shell,
/// default workspaces)
pub const BUILTIN_RESERVED_PREFIXES: &[&str] = &["cloud-shell-storage-", "DefaultResourceGroup-"];

/// Reserved group names and prefixes, matched case-insensitively
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedGroups {
    prefixes: Vec<String>,
    names: Vec<String>,
}

impl ReservedGroups {
    /// Only the built-in lists
    pub fn builtin() -> Self {
        Self {
            prefixes: BUILTIN_RESERVED_PREFIXES.iter().map(|p| p.to_string()).collect(),
            names: BUILTIN_RESERVED_NAMES.iter().map(|n| n.to_string()).collect(),
        }
    }

    /// Built-in lists merged with caller-supplied names
    pub fn with_names<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut reserved = Self::builtin();
        for name in extra {
            let name = name.into().trim().to_string();
            if !name.is_empty() && !reserved.matches_name(&name) {
                reserved.names.push(name);
            }
        }
        reserved
    }

    pub fn matches_prefix(&self, group_name: &str) -> bool {
        self.prefixes
            .iter()
            .any(|prefix| starts_with_ignore_case(group_name, prefix))
    }

    pub fn matches_name(&self, group_name: &str) -> bool {
        self.names.iter().any(|name| name.eq_ignore_ascii_case(group_name))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

impl Default for ReservedGroups {
    fn default() -> Self {
        Self::builtin()
    }
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value.len() >= prefix.len()
        && value.is_char_boundary(prefix.len())
        && value[..prefix.len()].eq_ignore_ascii_case(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_prefixes_match() {
        let reserved = ReservedGroups::builtin();
        assert!(reserved.matches_prefix("cloud-shell-storage-eastus"));
        assert!(reserved.matches_prefix("DefaultResourceGroup-WEU"));
        assert!(reserved.matches_prefix("defaultresourcegroup-weu"));
        assert!(!reserved.matches_prefix("my-cloud-shell-storage-eastus"));
        assert!(!reserved.matches_prefix("cloud"));
    }

    #[test]
    fn builtin_names_match_exactly() {
        let reserved = ReservedGroups::builtin();
        assert!(reserved.matches_name("NetworkWatcherRG"));
        assert!(reserved.matches_name("networkwatcherrg"));
        assert!(!reserved.matches_name("NetworkWatcherRG-2"));
    }

    #[test]
    fn extra_names_are_merged_without_duplicates() {
        let reserved = ReservedGroups::with_names(["shared-infra", " NetworkWatcherRG ", ""]);
        assert!(reserved.matches_name("shared-infra"));
        assert_eq!(reserved.names().len(), BUILTIN_RESERVED_NAMES.len() + 1);
        assert_eq!(reserved.prefixes().len(), BUILTIN_RESERVED_PREFIXES.len());
    }

    #[test]
    fn prefix_check_is_safe_on_multibyte_names() {
        let reserved = ReservedGroups::builtin();
        assert!(!reserved.matches_prefix("clöud-shell-storage-x"));
    }
}
