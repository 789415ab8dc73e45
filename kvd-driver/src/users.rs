//! # User and ACL Administration
//!
//! Purpose: Manage store users and what they may run and touch.
//!
//! ## Grant Syntax
//! - categories: `+read`, `-dangerous` (sent as `+@read`, `-@dangerous`);
//!   `*` grants every category.
//! - commands: `+set`, `-flushall`; `*` grants every command.
//! - keys: glob patterns such as `session:*` (sent as `~session:*`).
//!
//! Grants are validated when the `ACL SETUSER` rules are built, so a bad
//! grant never reaches the store half-applied.

use kvd_client::DriverResult;

use crate::args;
use crate::handle::SharedHandle;
use crate::reply;

/// Grants needed for plain key/value work, in this order.
pub const BASIC_COMMANDS: [&str; 5] = ["+set", "+get", "+mset", "+mget", "+getdel"];

/// Largest entropy `ACL GENPASS` accepts.
pub const MAX_GENPASS_BITS: u32 = 4096;

/// A user and their permissions, as written by [`Users::add_user`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserRecord {
    pub username: String,
    pub enabled: bool,
    pub password: Option<String>,
    pub nopass: bool,
    pub categories: Vec<String>,
    pub commands: Vec<String>,
    pub keys: Vec<String>,
}

impl UserRecord {
    pub fn new(username: impl Into<String>, enabled: bool) -> Self {
        UserRecord {
            username: username.into(),
            enabled,
            ..UserRecord::default()
        }
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn nopass(mut self) -> Self {
        self.nopass = true;
        self
    }

    pub fn categories<I, S>(mut self, grants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories.extend(grants.into_iter().map(Into::into));
        self
    }

    pub fn commands<I, S>(mut self, grants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands.extend(grants.into_iter().map(Into::into));
        self
    }

    pub fn keys<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Builds the `ACL SETUSER` rule list (everything after the username).
    pub fn to_rules(&self) -> DriverResult<Vec<String>> {
        args::token("add_user", "username", self.username.as_bytes())?;

        let grants = self.categories.len() + self.commands.len() + self.keys.len();
        let mut rules = Vec::with_capacity(2 + grants);
        let state = if self.enabled { "on" } else { "off" };
        rules.push(state.to_string());

        match (&self.password, self.nopass) {
            (Some(_), true) => {
                return Err(args::reject(
                    "add_user",
                    "password and nopass are mutually exclusive".to_string(),
                ));
            }
            (Some(password), false) => {
                if password.is_empty() {
                    return Err(args::reject("add_user", "password must not be empty".to_string()));
                }
                rules.push(format!(">{}", password));
            }
            (None, true) => rules.push("nopass".to_string()),
            // A disabled user may be created without credentials and get them later.
            (None, false) if !self.enabled => {}
            (None, false) => {
                return Err(args::reject(
                    "add_user",
                    "an enabled user needs a password or nopass".to_string(),
                ));
            }
        }

        for grant in &self.categories {
            rules.push(category_rule(grant)?);
        }
        for grant in &self.commands {
            rules.push(command_rule(grant)?);
        }
        for pattern in &self.keys {
            rules.push(key_rule(pattern)?);
        }
        Ok(rules)
    }
}

fn category_rule(grant: &str) -> DriverResult<String> {
    if grant == "*" {
        return Ok("+@all".to_string());
    }
    let (sign, name) = split_grant("category", grant)?;
    let name = name.strip_prefix('@').unwrap_or(name);
    if name.is_empty() {
        return Err(args::reject("add_user", format!("category grant {:?} names nothing", grant)));
    }
    Ok(format!("{}@{}", sign, name))
}

fn command_rule(grant: &str) -> DriverResult<String> {
    if grant == "*" {
        return Ok("+@all".to_string());
    }
    let (sign, name) = split_grant("command", grant)?;
    if name.is_empty() {
        return Err(args::reject("add_user", format!("command grant {:?} names nothing", grant)));
    }
    Ok(format!("{}{}", sign, name))
}

fn key_rule(pattern: &str) -> DriverResult<String> {
    if pattern.is_empty() || pattern.chars().any(char::is_whitespace) {
        return Err(args::reject("add_user", format!("key pattern {:?} is not valid", pattern)));
    }
    // Already in ACL form: `~pattern` or a `%R~`/`%W~` selector.
    if pattern.starts_with('~') || pattern.starts_with('%') {
        return Ok(pattern.to_string());
    }
    Ok(format!("~{}", pattern))
}

fn split_grant<'a>(kind: &str, grant: &'a str) -> DriverResult<(char, &'a str)> {
    if grant.chars().any(char::is_whitespace) {
        return Err(args::reject("add_user", format!("{} grant {:?} contains spaces", kind, grant)));
    }
    let mut chars = grant.chars();
    match chars.next() {
        Some(sign @ ('+' | '-')) => Ok((sign, chars.as_str())),
        _ => Err(args::reject(
            "add_user",
            format!("{} grant {:?} must start with '+' or '-'", kind, grant),
        )),
    }
}

/// ACL facade over the shared handle.
#[derive(Clone)]
pub struct Users {
    handle: SharedHandle,
}

impl Users {
    pub(crate) fn new(handle: SharedHandle) -> Self {
        Users { handle }
    }

    /// A random password from the store's generator (256 bits, hex encoded).
    pub fn generate_password(&self) -> DriverResult<String> {
        self.handle.call(&[b"ACL", b"GENPASS"], reply::text)
    }

    /// A random password with `bits` of entropy.
    pub fn generate_password_bits(&self, bits: u32) -> DriverResult<String> {
        if bits == 0 || bits > MAX_GENPASS_BITS {
            return Err(args::reject(
                "generate_password",
                format!("bits must be within 1..={}", MAX_GENPASS_BITS),
            ));
        }
        let bits = bits.to_string();
        self.handle
            .call(&[b"ACL", b"GENPASS", bits.as_bytes()], reply::text)
    }

    /// Names of every registered user.
    pub fn users(&self) -> DriverResult<Vec<String>> {
        self.handle.call(&[b"ACL", b"USERS"], reply::text_list)
    }

    /// Every user's rules, one `user <name> ...` line each.
    pub fn users_list(&self) -> DriverResult<Vec<String>> {
        self.handle.call(&[b"ACL", b"LIST"], reply::text_list)
    }

    /// Creates or updates a user with the record's rules.
    pub fn add_user(&self, user: &UserRecord) -> DriverResult<()> {
        let rules = user.to_rules()?;
        let mut cmd: Vec<&[u8]> = Vec::with_capacity(3 + rules.len());
        cmd.push(b"ACL".as_slice());
        cmd.push(b"SETUSER".as_slice());
        cmd.push(user.username.as_bytes());
        cmd.extend(rules.iter().map(|rule| rule.as_bytes()));
        self.handle.call(&cmd, reply::ok)
    }

    /// All command categories, or the commands inside `category`.
    pub fn categories_list(&self, category: Option<&str>) -> DriverResult<Vec<String>> {
        match category {
            Some(category) => {
                let category = args::token("categories_list", "category", category.as_bytes())?;
                self.handle
                    .call(&[b"ACL", b"CAT", category.as_bytes()], reply::text_list)
            }
            None => self.handle.call(&[b"ACL", b"CAT"], reply::text_list),
        }
    }

    /// Deletes users by name. Returns how many existed and were removed.
    pub fn delete_users<S: AsRef<[u8]>>(&self, users: &[S]) -> DriverResult<i64> {
        args::non_empty("delete_users", "users", users)?;
        let mut cmd: Vec<&[u8]> = Vec::with_capacity(2 + users.len());
        cmd.push(b"ACL".as_slice());
        cmd.push(b"DELUSER".as_slice());
        for user in users {
            cmd.push(args::token("delete_users", "username", user.as_ref())?.as_bytes());
        }
        self.handle.call(&cmd, reply::integer)
    }

    /// The fixed [`BASIC_COMMANDS`] grant list.
    pub fn basic_commands(&self) -> Vec<String> {
        BASIC_COMMANDS.iter().map(|cmd| cmd.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvd_client::DriverError;

    #[test]
    fn builds_rules_for_full_record() {
        let user = UserRecord::new("alice", true)
            .password("s3cret")
            .categories(["+read", "-@dangerous"])
            .commands(BASIC_COMMANDS)
            .keys(["cache:*", "~session:*"]);
        assert_eq!(
            user.to_rules().unwrap(),
            vec![
                "on", ">s3cret", "+@read", "-@dangerous", "+set", "+get", "+mset", "+mget",
                "+getdel", "~cache:*", "~session:*",
            ]
        );
    }

    #[test]
    fn wildcards_expand_to_all() {
        let user = UserRecord::new("ops", false)
            .nopass()
            .categories(["*"])
            .commands(["*"])
            .keys(["*"]);
        assert_eq!(user.to_rules().unwrap(), vec!["off", "nopass", "+@all", "+@all", "~*"]);
    }

    #[test]
    fn disabled_user_without_credentials_is_allowed() {
        assert_eq!(UserRecord::new("parked", false).to_rules().unwrap(), vec!["off"]);
    }

    #[test]
    fn rejects_bad_records() {
        let cases = [
            UserRecord::new("bob", true),
            UserRecord::new("bob", true).password("x").nopass(),
            UserRecord::new("bob", true).password(""),
            UserRecord::new("two words", true).nopass(),
            UserRecord::new("bob", true).nopass().categories(["read"]),
            UserRecord::new("bob", true).nopass().commands(["+"]),
            UserRecord::new("bob", true).nopass().keys(["a b"]),
        ];
        for user in cases {
            assert!(
                matches!(user.to_rules(), Err(DriverError::InvalidArgument(_))),
                "accepted {:?}",
                user
            );
        }
    }
}
