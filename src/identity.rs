use crate::config::PageContext;
use crate::platform::{SiteClient, SiteHttp};
use log::{debug, warn};
use serde::Serialize;

/// Where the identity fields came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IdentitySource {
    /// `/_api/web/currentuser` answered.
    Remote,
    /// The REST call failed; fields were copied from the page context.
    Context,
}

/// The viewer, as far as the site could tell us.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewerIdentity {
    pub display_name: String,
    pub email: String,
    pub login_name: String,
    pub is_site_admin: bool,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub groups: Vec<String>,
    pub source: IdentitySource,
}

impl ViewerIdentity {
    pub fn from_context(context: &PageContext) -> Self {
        ViewerIdentity {
            display_name: context.user.display_name.clone(),
            email: context.user.email.clone(),
            login_name: context.user.login_name.clone(),
            is_site_admin: false,
            roles: Vec::new(),
            permissions: Vec::new(),
            groups: Vec::new(),
            source: IdentitySource::Context,
        }
    }

    /// Join key against the account column of the grade sheet.
    pub fn account_prefix(&self) -> &str {
        account_prefix(&self.email)
    }
}

/// Local part of an email address: everything before the first `@`, the
/// whole string when there is none.
pub fn account_prefix(email: &str) -> &str {
    let email = email.trim();
    match email.find('@') {
        Some(at) => &email[..at],
        None => email,
    }
}

/// Resolve the viewer. Never fails: every REST error degrades to the page
/// context or to an empty list.
pub async fn resolve_identity<H: SiteHttp>(
    client: &SiteClient<H>,
    context: &PageContext,
) -> ViewerIdentity {
    let (user, groups, permissions) = tokio::join!(
        client.current_user(),
        client.current_user_groups(),
        client.effective_permissions()
    );

    let mut identity = match user {
        Ok(user) => ViewerIdentity {
            display_name: user.title,
            email: user.email,
            login_name: user.login_name,
            is_site_admin: user.is_site_admin,
            roles: Vec::new(),
            permissions: Vec::new(),
            groups: Vec::new(),
            source: IdentitySource::Remote,
        },
        Err(e) => {
            warn!("current user lookup failed, using page context: {}", e);
            ViewerIdentity::from_context(context)
        }
    };

    // Some tenants return an empty Email for guests; the context usually has it.
    if identity.email.is_empty() {
        identity.email = context.user.email.clone();
    }

    match groups {
        Ok(groups) => identity.groups = groups.into_iter().map(|g| g.title).collect(),
        Err(e) => warn!("group lookup failed: {}", e),
    }

    match permissions.and_then(|p| p.halves()) {
        Ok((high, low)) => identity.permissions = decode_permissions(high, low),
        Err(e) => warn!("permission lookup failed: {}", e),
    }

    identity.roles = derive_roles(identity.is_site_admin, &identity.groups);
    debug!(
        "viewer {} ({:?}), roles {:?}",
        identity.display_name, identity.source, identity.roles
    );
    identity
}

/// SharePoint `PermissionKind` values. Kind `k` is granted when bit `k - 1`
/// of the 64-bit mask is set.
const PERMISSION_KINDS: &[(&str, u32)] = &[
    ("ViewListItems", 1),
    ("AddListItems", 2),
    ("EditListItems", 3),
    ("DeleteListItems", 4),
    ("ApproveItems", 5),
    ("OpenItems", 6),
    ("ViewVersions", 7),
    ("DeleteVersions", 8),
    ("CancelCheckout", 9),
    ("ManagePersonalViews", 10),
    ("ManageLists", 12),
    ("ViewFormPages", 13),
    ("AnonymousSearchAccessList", 14),
    ("Open", 17),
    ("ViewPages", 18),
    ("AddAndCustomizePages", 19),
    ("ApplyThemeAndBorder", 20),
    ("ApplyStyleSheets", 21),
    ("ViewUsageData", 22),
    ("CreateSSCSite", 23),
    ("ManageSubwebs", 24),
    ("CreateGroups", 25),
    ("ManagePermissions", 26),
    ("BrowseDirectories", 27),
    ("BrowseUserInfo", 28),
    ("AddDelPrivateWebParts", 29),
    ("UpdatePersonalWebParts", 30),
    ("ManageWeb", 31),
    ("AnonymousSearchAccessWebLists", 32),
    ("UseClientIntegration", 37),
    ("UseRemoteAPIs", 38),
    ("ManageAlerts", 39),
    ("CreateAlerts", 40),
    ("EditMyUserInfo", 41),
    ("EnumeratePermissions", 63),
];

/// Names of the permission kinds set in an effective permission mask.
pub fn decode_permissions(high: u32, low: u32) -> Vec<String> {
    let mask = ((high as u64) << 32) | low as u64;
    if mask == u64::MAX {
        return vec!["FullMask".to_string()];
    }
    PERMISSION_KINDS
        .iter()
        .filter(|(_, kind)| mask & (1u64 << (kind - 1)) != 0)
        .map(|(name, _)| name.to_string())
        .collect()
}

fn derive_roles(is_site_admin: bool, groups: &[String]) -> Vec<String> {
    let mut roles = Vec::new();
    if is_site_admin {
        roles.push("SiteAdmin".to_string());
    }
    for (suffix, role) in [("Owners", "Owner"), ("Members", "Member"), ("Visitors", "Visitor")] {
        if groups.iter().any(|g| g.trim_end().ends_with(suffix)) && !roles.iter().any(|r| r == role) {
            roles.push(role.to_string());
        }
    }
    roles
}
