use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = true)]
    pub id: i64,

    /// Login identity.
    #[sea_orm(unique)]
    pub email: String,

    /// Path segment of the public portfolio URL.
    #[sea_orm(unique)]
    pub username: String,

    pub first_name: String,
    pub last_name: String,

    pub password_hash: String,

    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::profile::Entity")]
    Profile,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// "First Last", falling back to the username when both are blank.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// Usernames that collide with fixed top-level routes; the public portfolio
/// route matches any single segment, so these would never be reachable.
pub const RESERVED_USERNAMES: &[&str] = &[
    "accounts",
    "admin",
    "dashboard",
    "healthz",
    "media",
    "portfolio",
    "profile",
    "static",
];

/// Username rules: 1..=150 chars of letters, digits and `@.+-_`, not reserved.
pub fn username_problem(username: &str) -> Option<&'static str> {
    if username.is_empty() {
        return Some("This field is required.");
    }
    if username.chars().count() > 150 {
        return Some("Ensure this value has at most 150 characters.");
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Some("Enter a valid username. Letters, digits and @/./+/-/_ only.");
    }
    if RESERVED_USERNAMES.contains(&username.to_ascii_lowercase().as_str()) {
        return Some("This username is reserved.");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("somchai", None)]
    #[case("a.b+c-d_e@f", None)]
    #[case("", Some("This field is required."))]
    #[case("Dashboard", Some("This username is reserved."))]
    #[case("has space", Some("Enter a valid username. Letters, digits and @/./+/-/_ only."))]
    #[case("slash/y", Some("Enter a valid username. Letters, digits and @/./+/-/_ only."))]
    fn username_rules(#[case] name: &str, #[case] expected: Option<&str>) {
        assert_eq!(username_problem(name), expected);
    }
}
