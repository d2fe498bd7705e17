//! Post-to-role synchronization.
//!
//! When a shift starts, the free-text post label is classified against a
//! declarative rule table and the matching Discord role is found or created,
//! then granted to the member. When the shift ends, exactly the role recorded
//! at start time is removed.
//!
//! Classification is a deliberately fuzzy substring scan: the highest-priority
//! matching rule wins, and the first-declared rule breaks ties. Overlapping
//! keywords are expected ("co-patron" matches both the Co-Patron and Patron
//! rules; the Co-Patron rule carries the higher priority).
//!
//! All Discord mutations here are best effort. Failures are converted into a
//! warning string that the command layer appends to its reply; the shift
//! ledger mutation is never rolled back because a role edit failed.

use poise::serenity_prelude as serenity;

/// Role granted when no rule matches the post.
pub const FALLBACK_ROLE_NAME: &str = "🟢 En Service";
/// Colour of the fallback role.
pub const FALLBACK_ROLE_COLOUR: u32 = 0x2ECC71;
/// Sentinel post when the member supplies none and has no ranked role.
pub const UNSPECIFIED_POST: &str = "Non spécifié";

/// One classification rule: any keyword substring match makes the rule apply.
pub struct RoleRule {
    pub keywords: &'static [&'static str],
    pub role_name: &'static str,
    pub colour: u32,
    pub priority: u8,
}

/// Dealership post rules, in declaration (tie-break) order.
///
/// "co-patron" must outrank "patron" since the latter's keyword is a
/// substring of the former.
pub const ROLE_RULES: &[RoleRule] = &[
    RoleRule {
        keywords: &["co-patron", "copatron", "adjoint"],
        role_name: "🥈 Co-Patron",
        colour: 0xE67E22,
        priority: 100,
    },
    RoleRule {
        keywords: &["patron", "boss", "directeur", "gerant", "gérant"],
        role_name: "👑 Patron",
        colour: 0xF1C40F,
        priority: 90,
    },
    RoleRule {
        keywords: &["vendeur", "vente", "commercial"],
        role_name: "💰 Vendeur",
        colour: 0x3498DB,
        priority: 50,
    },
    RoleRule {
        keywords: &["mecanicien", "mécanicien", "meca", "méca", "atelier"],
        role_name: "🔧 Mécanicien",
        colour: 0xE74C3C,
        priority: 50,
    },
    RoleRule {
        keywords: &["secretaire", "secrétaire", "accueil", "administratif"],
        role_name: "📋 Secrétaire",
        colour: 0x9B59B6,
        priority: 40,
    },
];

/// Result of classifying a post label.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRole {
    pub name: &'static str,
    pub colour: u32,
    /// False when the fallback on-duty role was used.
    pub matched_rule: bool,
}

/// Classify a free-text post into a target role.
///
/// Highest priority wins; ties go to the first-declared rule. Case
/// insensitive substring matching.
pub fn resolve_role_for_post(post: &str) -> ResolvedRole {
    let lower = post.to_lowercase();

    let mut best: Option<&RoleRule> = None;
    for rule in ROLE_RULES {
        if !rule.keywords.iter().any(|k| lower.contains(k)) {
            continue;
        }
        // Strict > keeps the first-declared rule on equal priority
        match best {
            Some(current) if rule.priority > current.priority => best = Some(rule),
            None => best = Some(rule),
            _ => {}
        }
    }

    match best {
        Some(rule) => ResolvedRole {
            name: rule.role_name,
            colour: rule.colour,
            matched_rule: true,
        },
        None => ResolvedRole {
            name: FALLBACK_ROLE_NAME,
            colour: FALLBACK_ROLE_COLOUR,
            matched_rule: false,
        },
    }
}

/// Outcome of the best-effort role assignment around take-shift.
#[derive(Debug, Default)]
pub struct RoleOutcome {
    /// Role actually granted, to be recorded on the session.
    pub role_id: Option<u64>,
    /// Soft-failure description for the user-facing reply, if any.
    pub warning: Option<String>,
}

/// Find a role by exact name, creating it with the given colour if absent.
async fn find_or_create_role(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
    name: &str,
    colour: u32,
) -> serenity::Result<serenity::Role> {
    let roles = guild_id.roles(http).await?;
    if let Some(role) = roles.values().find(|r| r.name == name) {
        return Ok(role.clone());
    }

    guild_id
        .create_role(http, serenity::EditRole::new().name(name).colour(colour))
        .await
}

/// Resolve the post and grant the matching role to the member.
///
/// Never fails: Discord errors come back as a warning in the outcome.
pub async fn assign_for_post(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    post: &str,
) -> RoleOutcome {
    let resolved = resolve_role_for_post(post);

    let role = match find_or_create_role(http, guild_id, resolved.name, resolved.colour).await {
        Ok(role) => role,
        Err(e) => {
            return RoleOutcome {
                role_id: None,
                warning: Some(format!("rôle « {} » indisponible ({})", resolved.name, e)),
            };
        }
    };

    // Idempotent: skip the API call when the member already carries the role
    if let Ok(member) = guild_id.member(http, user_id).await {
        if member.roles.contains(&role.id) {
            return RoleOutcome { role_id: Some(role.id.get()), warning: None };
        }
    }

    match http.add_member_role(guild_id, user_id, role.id, None).await {
        Ok(()) => RoleOutcome { role_id: Some(role.id.get()), warning: None },
        Err(e) => RoleOutcome {
            // The role exists but could not be granted; don't record it as
            // assigned, there is nothing to remove at end-shift.
            role_id: None,
            warning: Some(format!("rôle « {} » non attribué ({})", resolved.name, e)),
        },
    }
}

/// Remove the role recorded at start-shift time. Returns a warning on failure.
pub async fn remove_assigned(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    role_id: u64,
) -> Option<String> {
    let role_id = serenity::RoleId::new(role_id);

    // Idempotent: nothing to do when the member no longer carries the role
    if let Ok(member) = guild_id.member(http, user_id).await {
        if !member.roles.contains(&role_id) {
            return None;
        }
    }

    match http.remove_member_role(guild_id, user_id, role_id, None).await {
        Ok(()) => None,
        Err(e) => Some(format!("rôle de service non retiré ({})", e)),
    }
}

/// Default post for a member: the name of their highest-positioned role.
pub async fn default_post_for_member(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
) -> String {
    let member = match guild_id.member(http, user_id).await {
        Ok(member) => member,
        Err(_) => return UNSPECIFIED_POST.to_string(),
    };
    let roles = match guild_id.roles(http).await {
        Ok(roles) => roles,
        Err(_) => return UNSPECIFIED_POST.to_string(),
    };

    member
        .roles
        .iter()
        .filter_map(|id| roles.get(id))
        .max_by_key(|role| role.position)
        .map(|role| role.name.clone())
        .unwrap_or_else(|| UNSPECIFIED_POST.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_basic_posts() {
        assert_eq!(resolve_role_for_post("Vendeur").name, "💰 Vendeur");
        assert_eq!(resolve_role_for_post("mécanicien atelier").name, "🔧 Mécanicien");
        assert_eq!(resolve_role_for_post("Secrétaire d'accueil").name, "📋 Secrétaire");
        assert_eq!(resolve_role_for_post("Patron").name, "👑 Patron");
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        assert_eq!(resolve_role_for_post("VENDEUR").name, "💰 Vendeur");
        assert_eq!(resolve_role_for_post("VeNte").name, "💰 Vendeur");
    }

    #[test]
    fn test_priority_beats_declaration_order() {
        // "co-patron" matches both the Co-Patron and Patron rules; the
        // higher priority wins.
        let resolved = resolve_role_for_post("co-patron du garage");
        assert_eq!(resolved.name, "🥈 Co-Patron");
    }

    #[test]
    fn test_equal_priority_ties_go_to_first_declared() {
        // "vendeur" and "mecanicien" rules share priority 50; a post matching
        // both resolves to the first-declared rule.
        let resolved = resolve_role_for_post("vendeur et mecanicien");
        assert_eq!(resolved.name, "💰 Vendeur");
    }

    #[test]
    fn test_unmatched_post_falls_back_to_on_duty_role() {
        let resolved = resolve_role_for_post("chauffeur de navette");
        assert_eq!(resolved.name, FALLBACK_ROLE_NAME);
        assert!(!resolved.matched_rule);

        let matched = resolve_role_for_post("vendeur");
        assert!(matched.matched_rule);
    }

    #[test]
    fn test_substring_matching_inside_longer_text() {
        assert_eq!(resolve_role_for_post("responsable des ventes").name, "💰 Vendeur");
        assert_eq!(resolve_role_for_post("chef d'atelier").name, "🔧 Mécanicien");
    }
}
